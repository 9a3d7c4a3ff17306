//! Bridge transaction: one inbound prompt -> one completion request -> one publish.
//!
//! Stateless between messages. Completion failures are logged and replaced by
//! [`ERROR_REPLY`]; nothing is retried and nothing propagates to the bus.

use crate::bus::{InboundMessage, Publisher};
use crate::llm::CompletionService;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Published in place of a completion when the remote call fails.
pub const ERROR_REPLY: &str = "Error: Could not retrieve response from OpenAI.";

/// Send `prompt` to `service` and return the trimmed reply, or [`ERROR_REPLY`] on any failure.
pub async fn query_completion(service: &dyn CompletionService, prompt: &str) -> String {
    match service.complete(prompt).await {
        Ok(content) => content.trim().to_string(),
        Err(e) => {
            log::error!("Error calling OpenAI API: {}", e);
            ERROR_REPLY.to_string()
        }
    }
}

/// Context for the transaction path: the completion service and the output topic publisher.
/// Both are read-only after construction.
#[derive(Clone)]
pub struct Bridge {
    completion: Arc<dyn CompletionService>,
    publisher: Arc<dyn Publisher>,
}

impl Bridge {
    pub fn new(completion: Arc<dyn CompletionService>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            completion,
            publisher,
        }
    }

    pub async fn query_completion(&self, prompt: &str) -> String {
        query_completion(self.completion.as_ref(), prompt).await
    }

    /// Handle one inbound message: query, then publish exactly once. Publish failures are logged.
    pub async fn handle_inbound(&self, text: &str) {
        log::info!("Received input: {}", text);
        let response = self.query_completion(text).await;
        match self.publisher.publish(&response).await {
            Ok(()) => log::info!("Published response: {}", response),
            Err(e) => log::warn!("publish to {} failed: {}", self.publisher.topic(), e),
        }
    }

    /// Drain `inbound_rx`, handling one message fully before taking the next. Returns when the sender side closes.
    pub async fn run(&self, mut inbound_rx: mpsc::Receiver<InboundMessage>) {
        while let Some(msg) = inbound_rx.recv().await {
            self.handle_inbound(&msg.text).await;
        }
        log::debug!("bridge: inbound channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusError;
    use crate::llm::RemoteCallError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedReply {
        reply: Option<String>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedReply {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for FixedReply {
        async fn complete(&self, prompt: &str) -> Result<String, RemoteCallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| RemoteCallError::Api("429 Too Many Requests".to_string()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        published: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for Recorder {
        fn topic(&self) -> &str {
            "/gpt_output"
        }

        async fn publish(&self, text: &str) -> Result<(), BusError> {
            self.published.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(BusError::Closed)
            } else {
                Ok(())
            }
        }
    }

    fn bridge(service: Arc<FixedReply>) -> (Bridge, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (Bridge::new(service, recorder.clone()), recorder)
    }

    #[tokio::test]
    async fn publishes_trimmed_reply_once() {
        let service = FixedReply::ok(" 4 ");
        let (b, rec) = bridge(service.clone());
        b.handle_inbound("What is 2+2?").await;
        assert_eq!(*rec.published.lock().unwrap(), vec!["4".to_string()]);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*service.prompts.lock().unwrap(), vec!["What is 2+2?".to_string()]);
    }

    #[tokio::test]
    async fn trims_surrounding_whitespace_and_newlines() {
        let (b, rec) = bridge(FixedReply::ok("  hello world  \n"));
        b.handle_inbound("greet").await;
        assert_eq!(*rec.published.lock().unwrap(), vec!["hello world".to_string()]);
    }

    #[tokio::test]
    async fn failure_publishes_fixed_error_string() {
        let (b, rec) = bridge(FixedReply::failing());
        b.handle_inbound("anything").await;
        let published = rec.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].as_bytes(), ERROR_REPLY.as_bytes());
    }

    #[tokio::test]
    async fn same_prompt_twice_gives_two_identical_publishes() {
        let service = FixedReply::ok("same answer");
        let (b, rec) = bridge(service.clone());
        b.handle_inbound("repeat").await;
        b.handle_inbound("repeat").await;
        assert_eq!(
            *rec.published.lock().unwrap(),
            vec!["same answer".to_string(), "same answer".to_string()]
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_prompt_is_forwarded_unvalidated() {
        let service = FixedReply::ok("ok");
        let (b, rec) = bridge(service.clone());
        b.handle_inbound("").await;
        assert_eq!(*service.prompts.lock().unwrap(), vec![String::new()]);
        assert_eq!(rec.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let recorder = Arc::new(Recorder {
            published: Mutex::new(Vec::new()),
            fail: true,
        });
        let b = Bridge::new(FixedReply::ok("x"), recorder.clone());
        b.handle_inbound("a").await;
        b.handle_inbound("b").await;
        assert_eq!(recorder.published.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_handles_messages_in_order_until_closed() {
        let service = FixedReply::ok("r");
        let (b, rec) = bridge(service.clone());
        let (tx, rx) = mpsc::channel(10);
        for text in ["one", "two", "three"] {
            tx.send(InboundMessage { text: text.into() }).await.unwrap();
        }
        drop(tx);
        b.run(rx).await;
        assert_eq!(
            *service.prompts.lock().unwrap(),
            vec!["one".to_string(), "two".to_string(), "three".to_string()]
        );
        assert_eq!(rec.published.lock().unwrap().len(), 3);
    }
}
