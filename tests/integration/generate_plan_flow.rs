use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use studyplan_app_lib::commands::plan_commands::testing as commands;
use studyplan_app_lib::commands::AppState;
use studyplan_app_lib::error::AiErrorCode;
use studyplan_app_lib::models::ai_types::{AiProvider, GenerationOptions};
use studyplan_app_lib::models::plan_request::{GeneratePlanBody, PlanRequest};
use studyplan_app_lib::server::build_router;
use studyplan_app_lib::services::ai_service::testing::{canned_study_plan, CannedProvider};
use studyplan_app_lib::services::ai_service::{AiService, AiServiceConfig};

fn form_data() -> JsonValue {
    json!({
        "studentDetails": {
            "name": "Aman",
            "college": "XYZ Institute",
            "branch": "CSE",
            "graduationYear": "2027",
            "email": "aman@example.com"
        },
        "subjects": [
            {
                "name": "Data Structures",
                "credits": 4,
                "strongAreas": "Arrays, Linked Lists",
                "weakAreas": "Graphs, DP",
                "confidenceLevel": 2
            }
        ],
        "studyPreferences": {
            "weekdayHours": 3,
            "weekendHours": 6,
            "preferredTime": "evening",
            "targetDate": (Utc::now() + Duration::days(10)).to_rfc3339()
        }
    })
}

fn state_with(provider: Arc<dyn AiProvider>) -> AppState {
    AppState::new(AiService::with_provider(
        provider,
        GenerationOptions::default(),
    ))
}

async fn post_plan(state: AppState, body: String) -> axum::response::Response {
    build_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/generate-plan")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> JsonValue {
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn valid_request_returns_wrapped_plan() {
    let provider = CannedProvider::returning(canned_study_plan(2));
    let state = state_with(provider.clone());

    let response = post_plan(state, json!({ "formData": form_data() }).to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let plan = &body["studyPlan"];
    assert_eq!(plan["weeklyPlans"].as_array().map(Vec::len), Some(2));
    assert_eq!(plan["nextSevenDaysFocus"].as_array().map(Vec::len), Some(7));
    assert_eq!(plan["weeklyPlans"][0]["dailySchedule"][0]["sessions"][0]["type"], "learning");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn legacy_field_names_are_accepted() {
    let provider = CannedProvider::returning(canned_study_plan(2));
    let state = state_with(provider.clone());

    let mut data = form_data();
    let details = data["studentDetails"].as_object_mut().unwrap();
    let college = details.remove("college").unwrap();
    let branch = details.remove("branch").unwrap();
    details.insert("institution".into(), college);
    details.insert("program".into(), branch);

    let response = post_plan(state, json!({ "formData": data }).to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(provider.requests()[0].prompt.contains("- College: XYZ Institute"));
}

#[tokio::test]
async fn invalid_model_output_becomes_bad_gateway() {
    let mut content = canned_study_plan(2);
    content["weeklyPlans"][0]["dailySchedule"][0]["sessions"][0]["cognitiveLoad"] =
        json!("extreme");
    let state = state_with(CannedProvider::returning(content));

    let response = post_plan(state, json!({ "formData": form_data() }).to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_RESPONSE");
    assert!(body.get("studyPlan").is_none());
    assert!(body["details"]["errors"].as_array().is_some_and(|errors| !errors.is_empty()));
    assert_eq!(body["details"]["correlationId"], "canned-correlation-id");
}

#[tokio::test]
async fn empty_subject_list_is_rejected_before_generation() {
    let provider = CannedProvider::returning(canned_study_plan(2));
    let state = state_with(provider.clone());

    let mut data = form_data();
    data["subjects"] = json!([]);

    let response = post_plan(state, json!({ "formData": data }).to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn out_of_range_credits_are_rejected() {
    let provider = CannedProvider::returning(canned_study_plan(2));
    let state = state_with(provider.clone());

    let mut data = form_data();
    data["subjects"][0]["credits"] = json!(9);

    let response = post_plan(state, json!({ "formData": data }).to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let provider = CannedProvider::returning(canned_study_plan(2));
    let state = state_with(provider.clone());

    let response = post_plan(state.clone(), "{not json".to_string()).await;
    assert!(response.status().is_client_error());

    let response = post_plan(state, json!({ "plan": {} }).to_string()).await;
    assert!(response.status().is_client_error());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn provider_failures_map_to_gateway_statuses() {
    let cases = [
        (AiErrorCode::HttpTimeout, StatusCode::GATEWAY_TIMEOUT),
        (AiErrorCode::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        (AiErrorCode::ProviderUnavailable, StatusCode::BAD_GATEWAY),
    ];

    for (code, status) in cases {
        let state = state_with(CannedProvider::failing(code, "provider failed"));
        let response = post_plan(state, json!({ "formData": form_data() }).to_string()).await;
        assert_eq!(response.status(), status, "{code}");
        assert_eq!(body_json(response).await["code"], code.as_str());
    }
}

#[tokio::test]
async fn missing_api_key_is_service_unavailable() {
    let config = AiServiceConfig {
        api_key: None,
        api_base_url: "http://127.0.0.1:9".into(),
        http_timeout: StdDuration::from_secs(1),
        options: GenerationOptions::default(),
    };
    let state = AppState::new(AiService::from_config(&config).unwrap());

    let response = post_plan(state.clone(), json!({ "formData": form_data() }).to_string()).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "MISSING_API_KEY");

    let status = commands::ai_status(&state).await.expect("status");
    assert!(!status.has_api_key);
}

#[tokio::test]
async fn status_route_reports_provider() {
    let state = state_with(CannedProvider::returning(canned_study_plan(1)));

    let response = build_router(state)
        .oneshot(Request::builder().uri("/ai/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["hasApiKey"], true);
    assert_eq!(body["provider"]["providerId"], "canned");
}

#[tokio::test]
async fn command_layer_wraps_plan() {
    let state = state_with(CannedProvider::returning(canned_study_plan(2)));
    let form: PlanRequest = serde_json::from_value(form_data()).unwrap();

    let envelope = commands::generate_plan(&state, GeneratePlanBody { form_data: form })
        .await
        .expect("plan generated");
    assert_eq!(envelope.study_plan.week_count(), 2);
}
