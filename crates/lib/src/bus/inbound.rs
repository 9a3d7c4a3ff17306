//! Inbound message from the subscribed topic: delivered to the bridge worker.

/// A std_msgs/String payload received on the input topic. Consumed once, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
}
