//! The language-model oracle: prompt in, schema-shaped JSON out.
//!
//! Pipelines only see the [`Oracle`] trait. [`GatewayOracle`] is the production
//! implementation on top of a [`ChatGateway`].

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::OracleSettings;
use crate::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, Message, ProviderError, ProviderGateway,
    TracingUsageSink,
};

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The reply held no parseable JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// The reply parsed but did not match the requested shape.
    #[error("response does not match {schema}: {message}")]
    Nonconforming { schema: String, message: String },

    #[error("schema error: {0}")]
    Schema(String),
}

/// A named JSON Schema describing the expected reply.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    pub fn of<T: JsonSchema>() -> Result<Self, OracleError> {
        let schema = serde_json::to_value(schemars::schema_for!(T))
            .map_err(|e| OracleError::Schema(e.to_string()))?;
        Ok(Self {
            name: sanitize_schema_name(T::schema_name()),
            schema,
        })
    }
}

/// Provider-side schema names must match `^[a-zA-Z0-9_-]+$`.
fn sanitize_schema_name(name: Cow<'static, str>) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Answer `prompt` with JSON shaped by `schema`.
    async fn invoke(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, OracleError>;

    /// Answer `prompt` with free text.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Invoke the oracle and decode the reply into `T`, using `T`'s JSON Schema.
pub async fn invoke_as<T>(oracle: &dyn Oracle, prompt: &str) -> Result<T, OracleError>
where
    T: DeserializeOwned + JsonSchema + Send,
{
    let schema = OutputSchema::of::<T>()?;
    let value = oracle.invoke(prompt, &schema).await?;
    serde_json::from_value(value).map_err(|e| OracleError::Nonconforming {
        schema: schema.name,
        message: e.to_string(),
    })
}

// =============================================================================
// Gateway-backed oracle
// =============================================================================

pub struct GatewayOracle {
    gateway: Arc<dyn ChatGateway>,
    settings: OracleSettings,
}

impl GatewayOracle {
    pub fn new(gateway: Arc<dyn ChatGateway>, settings: OracleSettings) -> Self {
        Self { gateway, settings }
    }

    /// OpenRouter-backed oracle configured from `OPENROUTER_*` variables,
    /// logging every provider call.
    pub fn from_env(settings: OracleSettings) -> Result<Self, ProviderError> {
        let gateway = ProviderGateway::from_env(Arc::new(TracingUsageSink))?;
        Ok(Self::new(Arc::new(gateway), settings))
    }

    fn request(&self, messages: Vec<Message>, caller: &'static str) -> ChatRequest {
        ChatRequest::new(
            ChatModel::openrouter(&self.settings.model),
            messages,
            Attribution::new(caller),
        )
        .temperature(self.settings.temperature)
        .max_tokens(self.settings.max_tokens)
    }
}

#[async_trait]
impl Oracle for GatewayOracle {
    async fn invoke(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, OracleError> {
        let schema_text = serde_json::to_string_pretty(&schema.schema)
            .map_err(|e| OracleError::Schema(e.to_string()))?;
        let system = format!(
            "Respond with a single JSON object that conforms to this JSON Schema. \
             Do not add any text before or after it.\n\n{schema_text}"
        );

        let mut req = self.request(
            vec![Message::system(system), Message::user(prompt)],
            "oracle::invoke",
        );
        req = if self.settings.schema_response_format {
            req.json_schema(&schema.name, schema.schema.clone())
        } else {
            req.json()
        };

        let response = self.gateway.chat(req).await?;
        debug!(
            schema = %schema.name,
            output_tokens = response.output_tokens,
            "oracle reply received"
        );

        let json = extract_json(&response.content)
            .ok_or_else(|| OracleError::Parse("no JSON object in response".into()))?;
        serde_json::from_str(json).map_err(|e| OracleError::Parse(e.to_string()))
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let req = self.request(vec![Message::user(prompt)], "oracle::complete");
        let response = self.gateway.chat(req).await?;
        Ok(response.content.trim().to_string())
    }
}

/// First balanced `{...}` in `raw`, skipping braces inside string literals.
///
/// Models wrap JSON in prose or code fences often enough that the whole reply
/// can't be parsed directly.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let body = &raw[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// Test double
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    type Handler = dyn Fn(&str, &str) -> Result<Value, OracleError> + Send + Sync;
    type Delay = dyn Fn(&str) -> Duration + Send + Sync;

    /// Oracle answering from a closure of `(prompt, schema_name)`.
    ///
    /// `complete` calls see an empty schema name and must return a JSON string.
    pub(crate) struct ScriptedOracle {
        handler: Box<Handler>,
        delay: Option<Box<Delay>>,
        pub(crate) calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedOracle {
        pub(crate) fn new(
            handler: impl Fn(&str, &str) -> Result<Value, OracleError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_delay(
            mut self,
            delay: impl Fn(&str) -> Duration + Send + Sync + 'static,
        ) -> Self {
            self.delay = Some(Box::new(delay));
            self
        }

        pub(crate) fn call_count(&self, schema_name: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, name)| name == schema_name)
                .count()
        }

        async fn answer(&self, prompt: &str, schema_name: &str) -> Result<Value, OracleError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), schema_name.to_string()));
            if let Some(delay) = &self.delay {
                tokio::time::sleep(delay(prompt)).await;
            }
            (self.handler)(prompt, schema_name)
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn invoke(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, OracleError> {
            self.answer(prompt, &schema.name).await
        }

        async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
            let value = self.answer(prompt, "").await?;
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| OracleError::Parse("expected a string".into()))
        }
    }
}
