use std::time::Duration as StdDuration;

use httpmock::prelude::*;
use serde_json::json;

use studyplan_app_lib::client::{PlanClient, PlanClientError, GENERATION_FAILED_MESSAGE};
use studyplan_app_lib::models::plan_request::{FormStep, PlanRequest, PreferredTime};
use studyplan_app_lib::services::ai_service::testing::canned_study_plan;

fn completed_form() -> PlanRequest {
    let mut request = PlanRequest::default();
    request.student_details.name = "Aman".into();
    request.student_details.college = "XYZ Institute".into();
    request.student_details.branch = "CSE".into();
    request.student_details.graduation_year = "2027".into();
    request.student_details.email = "aman@example.com".into();

    let subject = &mut request.subjects[0];
    subject.name = "Data Structures".into();
    subject.weak_areas = "Graphs".into();

    request.study_preferences.preferred_time = PreferredTime::Morning;
    request.study_preferences.target_date = "2026-12-20".into();
    request
}

fn client_for(server: &MockServer) -> PlanClient {
    PlanClient::new(&server.base_url(), StdDuration::from_secs(2)).expect("client builds")
}

fn assert_generic_failure(error: PlanClientError) {
    match error {
        PlanClientError::GenerationFailed { message } => {
            assert_eq!(message, GENERATION_FAILED_MESSAGE)
        }
        other => panic!("expected generation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn incomplete_form_is_never_sent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/generate-plan");
            then.status(200);
        })
        .await;

    let client = client_for(&server);
    let error = client
        .submit(&PlanRequest::default())
        .await
        .expect_err("blank form refused");
    assert!(matches!(
        error,
        PlanClientError::Incomplete(FormStep::StudentDetails)
    ));

    let mut request = completed_form();
    request.subjects[0].name.clear();
    let error = client.submit(&request).await.expect_err("blank subject refused");
    assert!(matches!(error, PlanClientError::Incomplete(FormStep::Subjects)));

    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn submits_form_data_and_returns_plan() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/generate-plan")
                .json_body_partial(
                    r#"{
                        "formData": {
                            "studentDetails": { "name": "Aman" },
                            "studyPreferences": { "preferredTime": "morning" }
                        }
                    }"#,
                );
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "studyPlan": canned_study_plan(2) }));
        })
        .await;

    let client = client_for(&server);
    let plan = client.submit(&completed_form()).await.expect("plan returned");

    mock.assert_async().await;
    assert_eq!(plan.week_count(), 2);
    assert!(!client.is_busy());
}

#[tokio::test]
async fn non_success_status_collapses_to_generic_failure() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/generate-plan");
            then.status(502)
                .header("content-type", "application/json")
                .json_body(json!({ "code": "INVALID_RESPONSE", "message": "bad plan" }));
        })
        .await;

    let client = client_for(&server);
    let error = client.submit(&completed_form()).await.expect_err("failure");
    assert_generic_failure(error);
    mock.assert_hits_async(1).await;
    assert!(!client.is_busy());
}

#[tokio::test]
async fn missing_study_plan_collapses_to_generic_failure() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/generate-plan");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "result": "ok" }));
        })
        .await;

    let client = client_for(&server);
    let error = client.submit(&completed_form()).await.expect_err("failure");
    assert_generic_failure(error);
}

#[tokio::test]
async fn unreachable_server_collapses_to_generic_failure() {
    let client =
        PlanClient::new("http://127.0.0.1:9", StdDuration::from_millis(500)).expect("client");
    let error = client.submit(&completed_form()).await.expect_err("failure");
    assert_generic_failure(error);
}

#[tokio::test]
async fn second_submission_is_refused_while_first_is_in_flight() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/generate-plan");
            then.status(200)
                .delay(StdDuration::from_millis(200))
                .header("content-type", "application/json")
                .json_body(json!({ "studyPlan": canned_study_plan(1) }));
        })
        .await;

    let client = client_for(&server);
    let form = completed_form();

    let (first, second) = futures::join!(client.submit(&form), client.submit(&form));

    assert!(first.is_ok());
    assert!(matches!(second, Err(PlanClientError::Busy)));
    mock.assert_hits_async(1).await;

    assert!(!client.is_busy());
    client
        .submit(&form)
        .await
        .expect("flag released after completion");
}

#[test]
fn derived_parameters_match_server_computation() {
    let mut request = completed_form();
    request.study_preferences.target_date = "2020-01-01".into();

    let params = PlanClient::derived_parameters(&request).expect("params");
    assert_eq!(params.total_days, 7);
    assert_eq!(params.total_weeks, 1);
    assert_eq!(params.weekly_hours, 27.0);
    assert_eq!(params.generated_weeks, 1);
}
