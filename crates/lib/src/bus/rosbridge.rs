//! rosbridge connector: one WebSocket connection, a writer task draining an outgoing queue,
//! and a reader task forwarding publishes on the subscribed topic to the bridge.

use crate::bus::inbound::InboundMessage;
use crate::bus::protocol::{RosbridgeOp, StringMessage};
use crate::bus::{BusError, Publisher};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OUTGOING_QUEUE: usize = 64;

/// Connection to a rosbridge server.
pub struct RosbridgeClient {
    node_name: String,
    outgoing: mpsc::Sender<Message>,
    incoming: Option<SplitStream<WsStream>>,
    writer: JoinHandle<()>,
}

impl RosbridgeClient {
    /// Open the WebSocket and start the writer task. No topics are registered yet.
    pub async fn connect(url: &str, node_name: &str) -> Result<Self, BusError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = ws.split();
        let (outgoing, rx) = mpsc::channel(OUTGOING_QUEUE);
        let writer = tokio::spawn(run_writer(sink, rx));
        log::info!("rosbridge: connected to {}", url);
        Ok(Self {
            node_name: node_name.to_string(),
            outgoing,
            incoming: Some(stream),
            writer,
        })
    }

    fn op_id(&self, op: &str, topic: &str) -> String {
        format!("{}:{}:{}", op, self.node_name, topic)
    }

    async fn send(&self, op: RosbridgeOp) -> Result<(), BusError> {
        send_op(&self.outgoing, &op).await
    }

    /// Advertise `topic` as std_msgs/String and return a publisher for it.
    pub async fn advertise(&self, topic: &str, queue_size: usize) -> Result<TopicPublisher, BusError> {
        self.send(RosbridgeOp::advertise(
            self.op_id("advertise", topic),
            topic,
            queue_size,
        ))
        .await?;
        log::debug!("rosbridge: advertised {}", topic);
        Ok(TopicPublisher {
            topic: topic.to_string(),
            outgoing: self.outgoing.clone(),
        })
    }

    /// Subscribe to `topic` and start the reader loop, forwarding each std_msgs/String payload to `inbound_tx`.
    /// The loop ends when the server closes the connection or the receiver is dropped.
    /// Can be called once per connection; later calls return [`BusError::Closed`].
    pub async fn subscribe(
        &mut self,
        topic: &str,
        queue_length: usize,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> Result<JoinHandle<()>, BusError> {
        let stream = self.incoming.take().ok_or(BusError::Closed)?;
        self.send(RosbridgeOp::subscribe(
            self.op_id("subscribe", topic),
            topic,
            queue_length,
        ))
        .await?;
        log::info!("rosbridge: subscribed to {}", topic);
        let topic = topic.to_string();
        Ok(tokio::spawn(async move {
            run_reader_loop(stream, topic, inbound_tx).await;
        }))
    }

    pub async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        self.send(RosbridgeOp::Unsubscribe {
            id: Some(self.op_id("subscribe", topic)),
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn unadvertise(&self, topic: &str) -> Result<(), BusError> {
        self.send(RosbridgeOp::Unadvertise {
            id: Some(self.op_id("advertise", topic)),
            topic: topic.to_string(),
        })
        .await
    }

    /// Send a close frame and wait for queued frames to flush.
    pub async fn close(self) {
        let _ = self.outgoing.send(Message::Close(None)).await;
        drop(self.outgoing);
        let _ = self.writer.await;
        log::debug!("rosbridge: connection closed");
    }
}

async fn send_op(outgoing: &mpsc::Sender<Message>, op: &RosbridgeOp) -> Result<(), BusError> {
    let text = op.to_json()?;
    outgoing
        .send(Message::Text(text))
        .await
        .map_err(|_| BusError::Closed)
}

async fn run_writer(mut sink: SplitSink<WsStream, Message>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if let Err(e) = sink.send(msg).await {
            log::warn!("rosbridge: send failed: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
}

async fn run_reader_loop(
    mut stream: SplitStream<WsStream>,
    topic: String,
    inbound_tx: mpsc::Sender<InboundMessage>,
) {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(t)) => t,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("rosbridge: read failed: {}", e);
                break;
            }
        };
        let Some(inbound) = parse_inbound(&text, &topic) else {
            continue;
        };
        if inbound_tx.send(inbound).await.is_err() {
            log::debug!("rosbridge: inbound channel closed, stopping reader");
            return;
        }
    }
    log::info!("rosbridge: reader loop stopped");
}

/// Decode one server frame. Returns the payload only for std_msgs/String publishes on `topic`.
fn parse_inbound(text: &str, topic: &str) -> Option<InboundMessage> {
    let op: RosbridgeOp = match serde_json::from_str(text) {
        Ok(op) => op,
        Err(e) => {
            log::debug!("rosbridge: ignoring frame: {}", e);
            return None;
        }
    };
    match op {
        RosbridgeOp::Publish { topic: t, msg, .. } if t == topic => {
            match serde_json::from_value::<StringMessage>(msg) {
                Ok(m) => Some(InboundMessage { text: m.data }),
                Err(e) => {
                    log::warn!("rosbridge: {} payload is not std_msgs/String: {}", topic, e);
                    None
                }
            }
        }
        RosbridgeOp::Status { level, msg, .. } => {
            let level = level.unwrap_or_default();
            let msg = msg.unwrap_or_default();
            if level == "error" {
                log::warn!("rosbridge status: {}", msg);
            } else {
                log::debug!("rosbridge status ({}): {}", level, msg);
            }
            None
        }
        _ => None,
    }
}

/// Publisher for one advertised topic. Cheap to clone; frames go through the connection's writer task.
#[derive(Clone)]
pub struct TopicPublisher {
    topic: String,
    outgoing: mpsc::Sender<Message>,
}

#[async_trait]
impl Publisher for TopicPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish(&self, text: &str) -> Result<(), BusError> {
        send_op(&self.outgoing, &RosbridgeOp::publish_string(&self.topic, text)).await
    }
}
