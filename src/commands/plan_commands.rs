use axum::extract::State;
use axum::Json;
use tracing::{debug, info, warn};

use crate::models::ai_types::AiStatusDto;
use crate::models::plan_request::GeneratePlanBody;
use crate::models::study_plan::StudyPlanEnvelope;

use super::{AppState, CommandError, CommandResult};

pub(crate) async fn generate_plan_impl(
    app_state: &AppState,
    body: GeneratePlanBody,
) -> CommandResult<StudyPlanEnvelope> {
    let request = body.form_data;
    debug!(
        target: "app::command",
        subjects = request.subjects.len(),
        preferred_time = request.study_preferences.preferred_time.as_str(),
        "generate_plan invoked"
    );

    let service = app_state.ai();
    match service.generate_study_plan(&request).await {
        Ok(study_plan) => {
            info!(
                target: "app::command",
                weeks = study_plan.week_count(),
                "generate_plan succeeded"
            );
            Ok(StudyPlanEnvelope { study_plan })
        }
        Err(error) => {
            warn!(
                target: "app::command",
                error = %error,
                "generate_plan failed"
            );
            Err(CommandError::from(error))
        }
    }
}

pub(crate) async fn ai_status_impl(app_state: &AppState) -> CommandResult<AiStatusDto> {
    debug!(target: "app::command", "ai_status invoked");

    let service = app_state.ai();
    match service.status().await {
        Ok(status) => Ok(status),
        Err(error) => {
            warn!(
                target: "app::command",
                error = %error,
                "ai_status failed"
            );
            Err(CommandError::from(error))
        }
    }
}

/// `POST /generate-plan`
pub async fn generate_plan(
    State(state): State<AppState>,
    Json(body): Json<GeneratePlanBody>,
) -> CommandResult<Json<StudyPlanEnvelope>> {
    generate_plan_impl(&state, body).await.map(Json)
}

/// `GET /ai/status`
pub async fn ai_status(State(state): State<AppState>) -> CommandResult<Json<AiStatusDto>> {
    ai_status_impl(&state).await.map(Json)
}

pub mod testing {
    use super::*;

    /// Internal helper exposed for integration testing of command logic.
    pub async fn generate_plan(
        app_state: &AppState,
        body: GeneratePlanBody,
    ) -> CommandResult<StudyPlanEnvelope> {
        generate_plan_impl(app_state, body).await
    }

    /// Internal helper exposed for integration testing of command logic.
    pub async fn ai_status(app_state: &AppState) -> CommandResult<AiStatusDto> {
        ai_status_impl(app_state).await
    }
}
