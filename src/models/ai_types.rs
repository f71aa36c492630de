use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppResult;

/// Sampling parameters forwarded to the provider on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_output_tokens: 8000,
            temperature: 0.7,
        }
    }
}

/// One structured-output invocation: prompt plus the schema the output must satisfy.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub schema_name: String,
    pub schema: JsonValue,
    pub options: GenerationOptions,
}

/// Raw object returned by a provider, before contract validation.
#[derive(Debug, Clone)]
pub struct GeneratedObject {
    pub content: JsonValue,
    pub provider: AiProviderMetadata,
}

/// Metadata describing the provider that produced a response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AiProviderMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<HashMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonValue>,
}

impl AiProviderMetadata {
    pub fn correlation_id(&self) -> Option<&str> {
        self.extra
            .as_ref()
            .and_then(|extra| extra.get("correlationId"))
            .and_then(|value| value.as_str())
    }
}

/// Current connectivity status of the generation provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AiStatusDto {
    pub has_api_key: bool,
    pub last_checked_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AiProviderMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Black-box structured generation. Implementations return whatever the model
/// produced; shape enforcement happens in the caller.
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate_object(&self, request: &GenerationRequest) -> AppResult<GeneratedObject>;

    async fn ping(&self) -> AppResult<AiProviderMetadata>;
}
