//! rosbridge v2 protocol frames (JSON over WebSocket), limited to the topic operations the node uses.

use serde::{Deserialize, Serialize};

/// ROS message type for both topics.
pub const STRING_MSG_TYPE: &str = "std_msgs/String";

/// Wire frame: `{ "op": "...", ... }`. Ops the node never uses fail to parse and are skipped by the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RosbridgeOp {
    Advertise {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        topic: String,
        #[serde(rename = "type")]
        typ: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        queue_size: Option<usize>,
    },
    Unadvertise {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        topic: String,
    },
    Publish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        topic: String,
        msg: serde_json::Value,
    },
    Subscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        topic: String,
        #[serde(rename = "type")]
        typ: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        queue_length: Option<usize>,
    },
    Unsubscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        topic: String,
    },
    /// Server status report (errors for malformed ops, warnings, etc.).
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        level: Option<String>,
        #[serde(default)]
        msg: Option<String>,
    },
}

/// std_msgs/String body: `{ "data": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringMessage {
    pub data: String,
}

impl RosbridgeOp {
    pub fn advertise(id: String, topic: &str, queue_size: usize) -> Self {
        Self::Advertise {
            id: Some(id),
            topic: topic.to_string(),
            typ: STRING_MSG_TYPE.to_string(),
            queue_size: Some(queue_size),
        }
    }

    pub fn subscribe(id: String, topic: &str, queue_length: usize) -> Self {
        Self::Subscribe {
            id: Some(id),
            topic: topic.to_string(),
            typ: STRING_MSG_TYPE.to_string(),
            queue_length: Some(queue_length),
        }
    }

    pub fn publish_string(topic: &str, data: &str) -> Self {
        Self::Publish {
            id: None,
            topic: topic.to_string(),
            msg: serde_json::json!({ "data": data }),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
