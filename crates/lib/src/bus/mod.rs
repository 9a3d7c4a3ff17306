//! Message bus side of the node: rosbridge WebSocket connector and topic publishers.
//!
//! The bridge depends on the [`Publisher`] trait only; inbound messages arrive as
//! [`InboundMessage`] over an mpsc channel fed by the rosbridge reader task.

mod inbound;
mod protocol;
mod rosbridge;

pub use inbound::InboundMessage;
pub use protocol::{RosbridgeOp, StringMessage, STRING_MSG_TYPE};
pub use rosbridge::{RosbridgeClient, TopicPublisher};

use async_trait::async_trait;

/// Errors from the bus connector.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("rosbridge connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("rosbridge message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("rosbridge connection closed")]
    Closed,
}

/// Handle to an advertised topic. Shared read-only by the bridge after construction.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Topic name (e.g. "/gpt_output").
    fn topic(&self) -> &str;
    /// Publish one std_msgs/String payload.
    async fn publish(&self, text: &str) -> Result<(), BusError>;
}
