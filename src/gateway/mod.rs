//! Provider gateway for OpenRouter chat completions.
//!
//! One attempt per call: failures go straight back to the caller, and every
//! attempt is reported to the configured [`UsageSink`].

pub mod error;
pub mod openrouter;
pub mod pricing;
pub mod types;
pub mod usage;

use std::sync::Arc;

use openrouter::{ChatProvider, OpenRouterAdapter};
use usage::ProviderCallRecord;

pub use error::{ErrorContext, ProviderError};
pub use pricing::{chat_cost, get_pricing, ModelPricing};
pub use types::*;
pub use usage::{CallStatus, NoopUsageSink, TracingUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

pub struct ProviderGateway<U: UsageSink> {
    provider: Box<dyn ChatProvider>,
    usage_sink: Arc<U>,
}

#[async_trait::async_trait]
impl<U: UsageSink> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }
}

impl<U: UsageSink> ProviderGateway<U> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, ProviderError> {
        Ok(Self::new(OpenRouterAdapter::from_env()?, usage_sink))
    }

    pub fn new(provider: impl ChatProvider + 'static, usage_sink: Arc<U>) -> Self {
        Self {
            provider: Box::new(provider),
            usage_sink,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let started = std::time::Instant::now();
        let result = self.provider.chat(&req).await;

        let record = ProviderCallRecord::new(
            req.model.provider(),
            req.model.model_id(),
            req.attribution.caller,
        );

        let record = match &result {
            Ok(resp) => record
                .tokens(resp.input_tokens, resp.output_tokens)
                .cost(resp.cost_nanodollars)
                .latency(resp.latency.as_millis() as u64)
                .request_id(resp.request_id.clone()),
            Err(err) => record
                .latency(started.elapsed().as_millis() as u64)
                .request_id(err.request_id().map(str::to_string))
                .error(err.code()),
        };
        self.usage_sink.record(record).await;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedProvider {
        fail: bool,
    }

    #[async_trait]
    impl ChatProvider for FixedProvider {
        async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            if self.fail {
                return Err(ProviderError::provider("openrouter", "down"));
            }
            Ok(ChatResponse {
                content: "ok".into(),
                input_tokens: 5,
                output_tokens: 7,
                cost_nanodollars: 42,
                latency: Duration::from_millis(3),
                finish_reason: FinishReason::Stop,
                request_id: Some("r1".into()),
            })
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        records: Mutex<Vec<ProviderCallRecord>>,
    }

    #[async_trait]
    impl UsageSink for CollectingSink {
        async fn record(&self, record: ProviderCallRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new(
            ChatModel::openrouter("openai/gpt-4o-mini"),
            vec![Message::user("hi")],
            Attribution::new("test::gateway"),
        )
    }

    #[tokio::test]
    async fn records_successful_call() {
        let sink = Arc::new(CollectingSink::default());
        let gateway = ProviderGateway::new(FixedProvider { fail: false }, sink.clone());

        let resp = gateway.chat(request()).await.unwrap();
        assert_eq!(resp.content, "ok");

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CallStatus::Success);
        assert_eq!(records[0].cost_nanodollars, 42);
        assert_eq!(records[0].caller, "test::gateway");
        assert_eq!(records[0].request_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn records_failed_call_once_without_retrying() {
        let sink = Arc::new(CollectingSink::default());
        let gateway = ProviderGateway::new(FixedProvider { fail: true }, sink.clone());

        let err = gateway.chat(request()).await.unwrap_err();
        assert_eq!(err.code(), "provider_error");

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error_code.as_deref(), Some("provider_error"));
    }
}
