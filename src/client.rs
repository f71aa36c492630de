use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::plan_request::{FormStep, PlanRequest};
use crate::models::study_plan::{StudyPlan, StudyPlanEnvelope};
use crate::services::schedule_utils::DerivedParameters;

pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate study plan. Please try again.";

#[derive(Debug, Error)]
pub enum PlanClientError {
    #[error("form step \"{}\" is incomplete", .0.title())]
    Incomplete(FormStep),

    #[error("a study plan is already being generated")]
    Busy,

    #[error("{message}")]
    GenerationFailed { message: String },

    #[error("failed to build HTTP client: {0}")]
    Setup(String),
}

impl PlanClientError {
    fn generation_failed() -> Self {
        PlanClientError::GenerationFailed {
            message: GENERATION_FAILED_MESSAGE.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratePlanPayload<'a> {
    form_data: &'a PlanRequest,
}

/// Submits a completed form to the plan endpoint, one request at a time.
pub struct PlanClient {
    http: reqwest::Client,
    endpoint: String,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PlanClient {
    pub fn new(base_url: &str, timeout: StdDuration) -> Result<Self, PlanClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlanClientError::Setup(err.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/generate-plan", base_url.trim_end_matches('/')),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Preview numbers for the review step, computed the same way the server does.
    pub fn derived_parameters(request: &PlanRequest) -> AppResult<DerivedParameters> {
        DerivedParameters::compute(&request.study_preferences, Utc::now())
    }

    pub async fn submit(&self, request: &PlanRequest) -> Result<StudyPlan, PlanClientError> {
        if let Some(step) = request.first_incomplete_step() {
            return Err(PlanClientError::Incomplete(step));
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PlanClientError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        debug!(
            target: "app::client",
            endpoint = %self.endpoint,
            subjects = request.subjects.len(),
            "submitting plan request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&GeneratePlanPayload { form_data: request })
            .send()
            .await
            .map_err(|err| {
                warn!(target: "app::client", error = %err, "plan request failed");
                PlanClientError::generation_failed()
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "app::client",
                status = status.as_u16(),
                "plan endpoint returned non-success status"
            );
            return Err(PlanClientError::generation_failed());
        }

        let envelope: StudyPlanEnvelope = response.json().await.map_err(|err| {
            warn!(target: "app::client", error = %err, "plan response could not be decoded");
            PlanClientError::generation_failed()
        })?;

        Ok(envelope.study_plan)
    }
}
