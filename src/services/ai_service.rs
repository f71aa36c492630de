use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AiErrorCode, AppError, AppResult};
use crate::models::ai_types::{
    AiProvider, AiProviderMetadata, AiStatusDto, GeneratedObject, GenerationOptions,
    GenerationRequest,
};
use crate::models::plan_request::PlanRequest;
use crate::models::study_plan::StudyPlan;
use crate::services::plan_schema::{
    plan_advisories, study_plan_schema, validate_study_plan_with, STUDY_PLAN_SCHEMA_NAME,
};
use crate::services::prompt_templates::{build_plan_prompt, study_planner_system_prompt};
use crate::services::schedule_utils::DerivedParameters;
use crate::utils::redact::redact_sensitive_data;

const ENV_API_KEY: &str = "STUDYPLAN_AI_API_KEY";
const ENV_BASE_URL: &str = "STUDYPLAN_AI_BASE_URL";
const ENV_MODEL: &str = "STUDYPLAN_AI_MODEL";
const ENV_MAX_OUTPUT_TOKENS: &str = "STUDYPLAN_AI_MAX_OUTPUT_TOKENS";
const ENV_TEMPERATURE: &str = "STUDYPLAN_AI_TEMPERATURE";
const ENV_TIMEOUT_SECS: &str = "STUDYPLAN_AI_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const PROVIDER_ID: &str = "openai-compatible";

/// Turns a plan request into a validated study plan through one provider call.
#[derive(Clone)]
pub struct AiService {
    provider: Option<Arc<dyn AiProvider>>,
    options: GenerationOptions,
    schema: Arc<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct AiServiceConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub http_timeout: StdDuration,
    pub options: GenerationOptions,
}

impl AiService {
    pub fn from_config(config: &AiServiceConfig) -> AppResult<Self> {
        let provider = config.build_provider()?;
        Ok(Self {
            provider,
            options: config.options.clone(),
            schema: Arc::new(study_plan_schema()),
        })
    }

    pub fn from_env() -> AppResult<Self> {
        Self::from_config(&AiServiceConfig::from_env())
    }

    pub fn with_provider(provider: Arc<dyn AiProvider>, options: GenerationOptions) -> Self {
        Self {
            provider: Some(provider),
            options,
            schema: Arc::new(study_plan_schema()),
        }
    }

    /// Replace the output schema sent to the provider and used for validation.
    pub fn with_schema(mut self, schema: JsonValue) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub async fn generate_study_plan(&self, request: &PlanRequest) -> AppResult<StudyPlan> {
        self.generate_study_plan_at(request, Utc::now()).await
    }

    pub async fn generate_study_plan_at(
        &self,
        request: &PlanRequest,
        now: DateTime<Utc>,
    ) -> AppResult<StudyPlan> {
        request.validate()?;

        let params = DerivedParameters::compute(&request.study_preferences, now)?;
        if let Ok(payload) = serde_json::to_value(request) {
            let sanitized = redact_sensitive_data(&payload)
                .unwrap_or_else(|_| JsonValue::String("<redacted>".to_string()));
            debug!(
                target: "app::ai",
                payload = %sanitized,
                total_days = params.total_days,
                total_weeks = params.total_weeks,
                weekly_hours = params.weekly_hours,
                generated_weeks = params.generated_weeks,
                "generating study plan"
            );
        }

        let provider = self.current_provider()?;
        let generation = GenerationRequest {
            system_prompt: study_planner_system_prompt().to_string(),
            prompt: build_plan_prompt(request, &params),
            schema_name: STUDY_PLAN_SCHEMA_NAME.to_string(),
            schema: self.schema.as_ref().clone(),
            options: self.options.clone(),
        };

        let GeneratedObject { content, provider: metadata } =
            provider.generate_object(&generation).await?;
        let correlation_id = metadata.correlation_id();

        let plan = validate_study_plan_with(&self.schema, &content, &params, correlation_id)?;

        for advisory in plan_advisories(&plan, request) {
            warn!(
                target: "app::ai::schema",
                correlation_id = correlation_id.unwrap_or("-"),
                %advisory,
                "study plan advisory"
            );
        }

        info!(
            target: "app::ai",
            correlation_id = correlation_id.unwrap_or("-"),
            weeks = plan.week_count(),
            latency_ms = ?metadata.latency_ms,
            "study plan generated"
        );

        Ok(plan)
    }

    pub async fn status(&self) -> AppResult<AiStatusDto> {
        let last_checked_at = Utc::now().to_rfc3339();
        let Some(provider) = self.provider.as_ref() else {
            return Ok(AiStatusDto {
                has_api_key: false,
                last_checked_at,
                latency_ms: None,
                provider: None,
                message: Some("AI provider API key is not configured".to_string()),
            });
        };

        match provider.ping().await {
            Ok(metadata) => Ok(AiStatusDto {
                has_api_key: true,
                last_checked_at,
                latency_ms: metadata.latency_ms,
                provider: Some(metadata),
                message: None,
            }),
            Err(error) => {
                warn!(target: "app::ai", error = %error, "provider ping failed");
                Err(error)
            }
        }
    }

    fn current_provider(&self) -> AppResult<Arc<dyn AiProvider>> {
        self.provider.as_ref().cloned().ok_or_else(|| {
            AppError::ai(
                AiErrorCode::MissingApiKey,
                "AI provider API key is not configured",
            )
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(target: "app::config", key, value = %raw, "ignoring unparseable setting");
                default
            }
        },
        _ => default,
    }
}

impl AiServiceConfig {
    pub fn from_env() -> Self {
        let defaults = GenerationOptions::default();
        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            api_key,
            api_base_url: env_or(ENV_BASE_URL, DEFAULT_BASE_URL.to_string()),
            http_timeout: StdDuration::from_secs(env_or(ENV_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)),
            options: GenerationOptions {
                model: env_or(ENV_MODEL, defaults.model),
                max_output_tokens: env_or(ENV_MAX_OUTPUT_TOKENS, defaults.max_output_tokens),
                temperature: env_or(ENV_TEMPERATURE, defaults.temperature),
            },
        }
    }

    fn build_provider(&self) -> AppResult<Option<Arc<dyn AiProvider>>> {
        match &self.api_key {
            Some(api_key) => {
                let provider = ChatCompletionsProvider::try_new(self, api_key.clone())?;
                Ok(Some(Arc::new(provider)))
            }
            None => {
                warn!(target: "app::config", "{ENV_API_KEY} not set; plan generation disabled");
                Ok(None)
            }
        }
    }
}

/// Client for OpenAI-compatible chat completion APIs with JSON-schema output.
struct ChatCompletionsProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    endpoint: String,
    model: String,
}

impl ChatCompletionsProvider {
    fn try_new(config: &AiServiceConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build provider HTTP client: {err}")))?;

        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{}/v1/chat/completions", base_url);

        Ok(Self {
            client,
            api_key,
            base_url,
            endpoint,
            model: config.options.model.clone(),
        })
    }

    fn build_request_body(request: &GenerationRequest) -> JsonValue {
        json!({
            "model": request.options.model,
            "temperature": request.options.temperature,
            "max_tokens": request.options.max_output_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema
                }
            },
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.prompt }
            ]
        })
    }

    fn parse_content(content: &str, correlation_id: &str) -> AppResult<JsonValue> {
        let trimmed = content.trim();
        let cleaned = if trimmed.starts_with("```") {
            let without_prefix = trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```JSON")
                .trim_start_matches("```");
            without_prefix.trim_end_matches("```").trim().to_string()
        } else {
            trimmed.to_string()
        };

        serde_json::from_str(&cleaned).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("provider content is not JSON: {err}"),
                Some(correlation_id),
                Some(json!({ "reason": "invalid_json" })),
            )
        })
    }

    fn extract_tokens(body: &JsonValue) -> HashMap<String, u64> {
        let mut tokens = HashMap::new();

        if let Some(usage) = body.get("usage") {
            if let Some(value) = usage.get("prompt_tokens").and_then(|v| v.as_u64()) {
                tokens.insert("prompt".to_string(), value);
            }
            if let Some(value) = usage.get("completion_tokens").and_then(|v| v.as_u64()) {
                tokens.insert("completion".to_string(), value);
            }
            if let Some(value) = usage.get("total_tokens").and_then(|v| v.as_u64()) {
                tokens.insert("total".to_string(), value);
            }
        }

        tokens
    }

    fn build_provider_metadata(
        &self,
        model: &str,
        tokens_used: HashMap<String, u64>,
        latency_ms: u128,
        correlation_id: &str,
    ) -> AiProviderMetadata {
        AiProviderMetadata {
            provider_id: Some(PROVIDER_ID.to_string()),
            model: Some(model.to_string()),
            latency_ms: Some(latency_ms),
            tokens_used: if tokens_used.is_empty() {
                None
            } else {
                Some(tokens_used)
            },
            extra: Some(json!({ "correlationId": correlation_id })),
        }
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> AppError {
        let (code, message) = match status {
            StatusCode::UNAUTHORIZED => (
                AiErrorCode::MissingApiKey,
                "provider rejected the API key".to_string(),
            ),
            StatusCode::FORBIDDEN => (
                AiErrorCode::Forbidden,
                "provider denied access to the model".to_string(),
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                AiErrorCode::RateLimited,
                "provider rate limit reached, try again later".to_string(),
            ),
            status if status.is_server_error() => (
                AiErrorCode::ProviderUnavailable,
                format!("provider temporarily unavailable (status {})", status.as_u16()),
            ),
            StatusCode::BAD_REQUEST => (
                AiErrorCode::InvalidRequest,
                "provider rejected the request format".to_string(),
            ),
            StatusCode::NOT_FOUND => (
                AiErrorCode::InvalidRequest,
                "provider endpoint not found".to_string(),
            ),
            status => (
                AiErrorCode::Unknown,
                format!("provider returned status {}", status.as_u16()),
            ),
        };
        AppError::ai_with_details(code, message, Some(correlation_id), None)
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> AppError {
        if err.is_timeout() {
            AppError::ai_with_details(
                AiErrorCode::HttpTimeout,
                "provider request timed out",
                Some(correlation_id),
                None,
            )
        } else if err.is_connect() {
            AppError::ai_with_details(
                AiErrorCode::ProviderUnavailable,
                "could not connect to provider",
                Some(correlation_id),
                None,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            AppError::ai_with_details(
                AiErrorCode::Unknown,
                format!("provider request failed: {err}"),
                Some(correlation_id),
                None,
            )
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for ChatCompletionsProvider {
    async fn generate_object(&self, request: &GenerationRequest) -> AppResult<GeneratedObject> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_body = Self::build_request_body(request);

        debug!(
            target: "app::ai::provider",
            correlation_id = %correlation_id,
            model = %request.options.model,
            max_tokens = request.options.max_output_tokens,
            temperature = request.options.temperature,
            prompt_len = request.prompt.len(),
            "invoking provider"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    target: "app::ai::provider",
                    correlation_id = %correlation_id,
                    "provider request failed"
                );
                Self::error_from_reqwest(err, &correlation_id)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "app::ai::provider",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                "provider returned non-success status"
            );
            return Err(Self::map_http_error(status, &correlation_id));
        }

        let latency_ms = start.elapsed().as_millis();
        let body: JsonValue = response.json().await.map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                "failed to decode provider response",
                Some(correlation_id.as_str()),
                Some(json!({ "reason": err.to_string() })),
            )
        })?;

        debug!(
            target: "app::ai::provider",
            correlation_id = %correlation_id,
            latency_ms,
            "provider responded"
        );

        let content = body
            .pointer("/choices/0/message/content")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                AppError::ai_with_details(
                    AiErrorCode::InvalidResponse,
                    "provider response is missing message.content",
                    Some(correlation_id.as_str()),
                    Some(json!({ "reason": "missing_message_content" })),
                )
            })?;
        let content = Self::parse_content(content, &correlation_id)?;
        let tokens_used = Self::extract_tokens(&body);

        Ok(GeneratedObject {
            content,
            provider: self.build_provider_metadata(
                &request.options.model,
                tokens_used,
                latency_ms,
                &correlation_id,
            ),
        })
    }

    async fn ping(&self) -> AppResult<AiProviderMetadata> {
        let url = format!("{}/v1/models", self.base_url);
        let correlation_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| Self::error_from_reqwest(err, &correlation_id))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "app::ai::provider",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                "provider ping returned non-success status"
            );
            return Err(Self::map_http_error(status, &correlation_id));
        }

        Ok(self.build_provider_metadata(
            &self.model,
            HashMap::new(),
            start.elapsed().as_millis(),
            &correlation_id,
        ))
    }
}

/// Deterministic stand-ins for the provider, shared by unit and integration tests.
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Expose status mapping for integration tests without widening the public API surface.
    pub fn map_http_error(status: StatusCode) -> AppError {
        ChatCompletionsProvider::map_http_error(status, "test-correlation-id")
    }

    /// Build the HTTP provider against an arbitrary base URL.
    pub fn http_provider(
        base_url: &str,
        timeout: StdDuration,
        options: GenerationOptions,
    ) -> AppResult<Arc<dyn AiProvider>> {
        let config = AiServiceConfig {
            api_key: Some("test-key".to_string()),
            api_base_url: base_url.trim_end_matches('/').to_string(),
            http_timeout: timeout,
            options,
        };
        let provider = ChatCompletionsProvider::try_new(&config, "test-key".to_string())?;
        Ok(Arc::new(provider))
    }

    #[derive(Debug, Clone)]
    enum CannedReply {
        Object(JsonValue),
        Failure(AiErrorCode, String),
    }

    /// Provider returning a fixed reply and recording what it was asked.
    #[derive(Debug)]
    pub struct CannedProvider {
        reply: CannedReply,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl CannedProvider {
        pub fn returning(content: JsonValue) -> Arc<Self> {
            Arc::new(Self {
                reply: CannedReply::Object(content),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(code: AiErrorCode, message: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: CannedReply::Failure(code, message.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn requests(&self) -> Vec<GenerationRequest> {
            self.requests
                .lock()
                .expect("canned provider lock poisoned")
                .clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests
                .lock()
                .expect("canned provider lock poisoned")
                .len()
        }
    }

    #[async_trait::async_trait]
    impl AiProvider for CannedProvider {
        async fn generate_object(
            &self,
            request: &GenerationRequest,
        ) -> AppResult<GeneratedObject> {
            self.requests
                .lock()
                .expect("canned provider lock poisoned")
                .push(request.clone());

            match &self.reply {
                CannedReply::Object(content) => Ok(GeneratedObject {
                    content: content.clone(),
                    provider: AiProviderMetadata {
                        provider_id: Some("canned".to_string()),
                        model: Some(request.options.model.clone()),
                        extra: Some(json!({ "correlationId": "canned-correlation-id" })),
                        ..AiProviderMetadata::default()
                    },
                }),
                CannedReply::Failure(code, message) => Err(AppError::ai_with_details(
                    *code,
                    message.clone(),
                    Some("canned-correlation-id"),
                    None,
                )),
            }
        }

        async fn ping(&self) -> AppResult<AiProviderMetadata> {
            Ok(AiProviderMetadata {
                provider_id: Some("canned".to_string()),
                latency_ms: Some(0),
                ..AiProviderMetadata::default()
            })
        }
    }

    const DAYS: [&str; 7] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];

    fn session(subject: &str, topic: &str, kind: &str, load: &str) -> JsonValue {
        json!({
            "subject": subject,
            "topic": topic,
            "durationMinutes": 90,
            "type": kind,
            "cognitiveLoad": load
        })
    }

    /// A plan that satisfies the schema and contract for `weeks` detailed
    /// weeks. Daily minutes match the default 3h weekday / 6h weekend budget.
    pub fn canned_study_plan(weeks: usize) -> JsonValue {
        let weekly_plans: Vec<JsonValue> = (1..=weeks)
            .map(|week| {
                let days: Vec<JsonValue> = DAYS
                    .iter()
                    .enumerate()
                    .map(|(index, day)| {
                        let mut sessions = vec![
                            session("Data Structures", "Graphs", "learning", "high"),
                            session("Operating Systems", "Paging", "practice", "medium"),
                        ];
                        if index >= 5 {
                            sessions.push(session("Data Structures", "Trees", "revision", "low"));
                            sessions.push(session("Operating Systems", "Spillover", "buffer", "low"));
                        }
                        json!({ "day": day, "sessions": sessions })
                    })
                    .collect();
                json!({
                    "weekNumber": week,
                    "weekLabel": format!("Week {week}"),
                    "dailySchedule": days,
                    "goals": ["Close prerequisite gaps", "Finish one practice set"]
                })
            })
            .collect();

        let focus: Vec<JsonValue> = DAYS
            .iter()
            .map(|day| {
                json!({
                    "day": day,
                    "focus": "Graph traversal",
                    "tasks": ["Read notes", "Solve 5 problems"]
                })
            })
            .collect();

        json!({
            "totalWeeks": weeks,
            "totalStudyHours": 27 * weeks,
            "weeklyPlans": weekly_plans,
            "subjectAllocations": [
                {
                    "subject": "Data Structures",
                    "totalHours": 16.2,
                    "percentage": 60,
                    "justification": "Low confidence and higher credits"
                },
                {
                    "subject": "Operating Systems",
                    "totalHours": 10.8,
                    "percentage": 40,
                    "justification": "Solid base, weak on paging"
                }
            ],
            "nextSevenDaysFocus": focus,
            "smartInsights": [
                {
                    "title": "Prerequisite gap",
                    "description": "Revise recursion before trees",
                    "priority": "high"
                },
                {
                    "title": "Rebalance",
                    "description": "Shift one OS session to the weekend",
                    "priority": "low"
                }
            ],
            "outcomeSummary": {
                "estimatedCompletionDate": "2026-12-20",
                "totalStudyHours": 27 * weeks,
                "confidenceProjections": [
                    { "subject": "Data Structures", "currentLevel": 2, "projectedLevel": 4 },
                    { "subject": "Operating Systems", "currentLevel": 4, "projectedLevel": 4.5 }
                ],
                "keyBenefits": ["Weak areas covered first", "Buffer time every weekend"]
            }
        })
    }
}
