//! rosgpt core library: bridges a ROS text topic to an OpenAI chat completion endpoint
//! and publishes each reply on an output topic. Used by the `rosgpt` CLI.

pub mod bridge;
pub mod bus;
pub mod config;
pub mod init;
pub mod llm;
pub mod node;
