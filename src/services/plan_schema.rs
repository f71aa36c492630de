use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::{AiErrorCode, AppError, AppResult};
use crate::models::plan_request::PlanRequest;
use crate::models::study_plan::{CognitiveLoad, InsightPriority, SessionType, StudyPlan};
use crate::services::schedule_utils::{DerivedParameters, DAYS_PER_WEEK, NEXT_DAYS_FOCUS_LEN};

pub const STUDY_PLAN_SCHEMA_NAME: &str = "study_plan";
pub const MIN_SESSION_MINUTES: u32 = 30;
pub const MAX_SESSION_MINUTES: u32 = 90;

const ALLOCATION_TOLERANCE_PERCENT: f64 = 5.0;
const DAILY_BUDGET_DRIFT_RATIO: f64 = 0.5;

fn object(properties: JsonValue) -> JsonValue {
    let required: Vec<String> = properties
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn array_of(items: JsonValue) -> JsonValue {
    json!({ "type": "array", "items": items })
}

fn string_enum(values: &[&str]) -> JsonValue {
    json!({ "type": "string", "enum": values })
}

/// JSON Schema of the plan returned by the model. Sent to the provider and
/// used for structural validation of its reply.
pub fn study_plan_schema() -> JsonValue {
    let session = object(json!({
        "subject": { "type": "string" },
        "topic": { "type": "string" },
        "durationMinutes": { "type": "integer" },
        "type": string_enum(&SessionType::VALUES),
        "cognitiveLoad": string_enum(&CognitiveLoad::VALUES),
    }));

    let day = object(json!({
        "day": { "type": "string" },
        "sessions": array_of(session),
    }));

    let week = object(json!({
        "weekNumber": { "type": "integer" },
        "weekLabel": { "type": "string" },
        "dailySchedule": array_of(day),
        "goals": array_of(json!({ "type": "string" })),
    }));

    let allocation = object(json!({
        "subject": { "type": "string" },
        "totalHours": { "type": "number" },
        "percentage": { "type": "number" },
        "justification": { "type": "string" },
    }));

    let focus = object(json!({
        "day": { "type": "string" },
        "focus": { "type": "string" },
        "tasks": array_of(json!({ "type": "string" })),
    }));

    let insight = object(json!({
        "title": { "type": "string" },
        "description": { "type": "string" },
        "priority": string_enum(&InsightPriority::VALUES),
    }));

    let projection = object(json!({
        "subject": { "type": "string" },
        "currentLevel": { "type": "number" },
        "projectedLevel": { "type": "number" },
    }));

    let outcome = object(json!({
        "estimatedCompletionDate": { "type": "string" },
        "totalStudyHours": { "type": "number" },
        "confidenceProjections": array_of(projection),
        "keyBenefits": array_of(json!({ "type": "string" })),
    }));

    object(json!({
        "totalWeeks": { "type": "integer" },
        "totalStudyHours": { "type": "number" },
        "weeklyPlans": array_of(week),
        "subjectAllocations": array_of(allocation),
        "nextSevenDaysFocus": array_of(focus),
        "smartInsights": array_of(insight),
        "outcomeSummary": outcome,
    }))
}

fn structural_violations(schema: &JsonValue, value: &JsonValue) -> AppResult<Vec<String>> {
    let compiled = jsonschema::JSONSchema::compile(schema)
        .map_err(|err| AppError::other(format!("invalid study plan schema: {err}")))?;

    let violations = match compiled.validate(value) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| {
                let path = e.instance_path.to_string();
                let path_display = if path.is_empty() {
                    "root".to_string()
                } else {
                    path
                };
                format!("{path_display}: {e}")
            })
            .collect(),
    };
    Ok(violations)
}

fn contract_violations(plan: &StudyPlan, params: &DerivedParameters) -> Vec<String> {
    let mut violations = Vec::new();

    let expected_weeks = params.generated_weeks as usize;
    if plan.weekly_plans.len() != expected_weeks {
        violations.push(format!(
            "/weeklyPlans: expected {expected_weeks} weeks, got {}",
            plan.weekly_plans.len()
        ));
    }

    for (week_index, week) in plan.weekly_plans.iter().enumerate() {
        if week.daily_schedule.len() != DAYS_PER_WEEK {
            violations.push(format!(
                "/weeklyPlans/{week_index}/dailySchedule: expected {DAYS_PER_WEEK} days, got {}",
                week.daily_schedule.len()
            ));
        }
        for (day_index, day) in week.daily_schedule.iter().enumerate() {
            for (session_index, session) in day.sessions.iter().enumerate() {
                if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES)
                    .contains(&session.duration_minutes)
                {
                    violations.push(format!(
                        "/weeklyPlans/{week_index}/dailySchedule/{day_index}/sessions/{session_index}/durationMinutes: {} is outside [{MIN_SESSION_MINUTES}, {MAX_SESSION_MINUTES}]",
                        session.duration_minutes
                    ));
                }
            }
        }
    }

    if plan.next_seven_days_focus.len() != NEXT_DAYS_FOCUS_LEN {
        violations.push(format!(
            "/nextSevenDaysFocus: expected {NEXT_DAYS_FOCUS_LEN} entries, got {}",
            plan.next_seven_days_focus.len()
        ));
    }

    violations
}

fn invalid_plan(violations: Vec<String>, correlation_id: Option<&str>) -> AppError {
    AppError::ai_with_details(
        AiErrorCode::InvalidResponse,
        format!(
            "generated study plan violates the response contract ({} issue(s))",
            violations.len()
        ),
        correlation_id,
        Some(json!({ "reason": "schema_violation", "errors": violations })),
    )
}

/// Strict validation of a model reply: schema, typed decode, then the
/// count and range guarantees callers rely on.
pub fn validate_study_plan(
    value: &JsonValue,
    params: &DerivedParameters,
    correlation_id: Option<&str>,
) -> AppResult<StudyPlan> {
    validate_study_plan_with(&study_plan_schema(), value, params, correlation_id)
}

/// Same as [`validate_study_plan`] with a caller-supplied schema.
pub fn validate_study_plan_with(
    schema: &JsonValue,
    value: &JsonValue,
    params: &DerivedParameters,
    correlation_id: Option<&str>,
) -> AppResult<StudyPlan> {
    let violations = structural_violations(schema, value)?;
    if !violations.is_empty() {
        return Err(invalid_plan(violations, correlation_id));
    }

    let plan: StudyPlan = serde_json::from_value(value.clone())
        .map_err(|err| invalid_plan(vec![format!("root: {err}")], correlation_id))?;

    let violations = contract_violations(&plan, params);
    if !violations.is_empty() {
        return Err(invalid_plan(violations, correlation_id));
    }

    debug!(
        target: "app::ai::schema",
        weeks = plan.weekly_plans.len(),
        sessions = plan.sessions().count(),
        "study plan passed validation"
    );
    Ok(plan)
}

fn is_weekend(day: &str) -> Option<bool> {
    let lower = day.trim().to_lowercase();
    const WEEKDAYS: [&str; 5] = ["mon", "tue", "wed", "thu", "fri"];
    if lower.starts_with("sat") || lower.starts_with("sun") {
        Some(true)
    } else if WEEKDAYS.iter().any(|prefix| lower.starts_with(prefix)) {
        Some(false)
    } else {
        None
    }
}

/// Soft checks the prompt asks for but the contract does not enforce.
pub fn plan_advisories(plan: &StudyPlan, request: &PlanRequest) -> Vec<String> {
    let mut advisories = Vec::new();

    if !plan.subject_allocations.is_empty() {
        let total: f64 = plan.allocation_percentages().iter().sum();
        if (total - 100.0).abs() > ALLOCATION_TOLERANCE_PERCENT {
            advisories.push(format!(
                "subject allocation percentages sum to {total:.1}, expected about 100"
            ));
        }
    }

    let prefs = &request.study_preferences;
    for week in &plan.weekly_plans {
        for day in &week.daily_schedule {
            let Some(weekend) = is_weekend(&day.day) else {
                continue;
            };
            let budget_hours = if weekend {
                prefs.weekend_hours
            } else {
                prefs.weekday_hours
            };
            let budget_minutes = budget_hours * 60.0;
            if budget_minutes <= 0.0 {
                continue;
            }
            let scheduled = day.total_minutes() as f64;
            let drift = (scheduled - budget_minutes).abs() / budget_minutes;
            if drift > DAILY_BUDGET_DRIFT_RATIO {
                advisories.push(format!(
                    "week {} {}: {scheduled:.0} minutes scheduled against a {budget_minutes:.0} minute budget",
                    week.week_number, day.day
                ));
            }
        }
    }

    advisories
}
