use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Whole numbers arrive from the model as either `45` or `45.0`.
fn integral_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(D::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        )))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Learning,
    Practice,
    Revision,
    Buffer,
}

impl SessionType {
    pub const VALUES: [&'static str; 4] = ["learning", "practice", "revision", "buffer"];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CognitiveLoad {
    High,
    Medium,
    Low,
}

impl CognitiveLoad {
    pub const VALUES: [&'static str; 3] = ["high", "medium", "low"];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
}

impl InsightPriority {
    pub const VALUES: [&'static str; 3] = ["high", "medium", "low"];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudySession {
    pub subject: String,
    pub topic: String,
    #[serde(deserialize_with = "integral_u32")]
    pub duration_minutes: u32,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub cognitive_load: CognitiveLoad,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DaySchedule {
    pub day: String,
    pub sessions: Vec<StudySession>,
}

impl DaySchedule {
    pub fn total_minutes(&self) -> u32 {
        self.sessions
            .iter()
            .map(|session| session.duration_minutes)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WeekPlan {
    #[serde(deserialize_with = "integral_u32")]
    pub week_number: u32,
    pub week_label: String,
    pub daily_schedule: Vec<DaySchedule>,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubjectAllocation {
    pub subject: String,
    pub total_hours: f64,
    pub percentage: f64,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DayFocus {
    pub day: String,
    pub focus: String,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SmartInsight {
    pub title: String,
    pub description: String,
    pub priority: InsightPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfidenceProjection {
    pub subject: String,
    pub current_level: f64,
    pub projected_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutcomeSummary {
    pub estimated_completion_date: String,
    pub total_study_hours: f64,
    pub confidence_projections: Vec<ConfidenceProjection>,
    pub key_benefits: Vec<String>,
}

/// Structured plan produced by the generative capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudyPlan {
    #[serde(deserialize_with = "integral_u32")]
    pub total_weeks: u32,
    pub total_study_hours: f64,
    pub weekly_plans: Vec<WeekPlan>,
    pub subject_allocations: Vec<SubjectAllocation>,
    pub next_seven_days_focus: Vec<DayFocus>,
    pub smart_insights: Vec<SmartInsight>,
    pub outcome_summary: OutcomeSummary,
}

impl StudyPlan {
    pub fn week_count(&self) -> usize {
        self.weekly_plans.len()
    }

    /// Session count for each day of the given week, in day order.
    pub fn sessions_per_day(&self, week_index: usize) -> Option<Vec<usize>> {
        self.weekly_plans.get(week_index).map(|week| {
            week.daily_schedule
                .iter()
                .map(|day| day.sessions.len())
                .collect()
        })
    }

    pub fn allocation_percentages(&self) -> Vec<f64> {
        self.subject_allocations
            .iter()
            .map(|allocation| allocation.percentage)
            .collect()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &StudySession> {
        self.weekly_plans
            .iter()
            .flat_map(|week| week.daily_schedule.iter())
            .flat_map(|day| day.sessions.iter())
    }
}

/// Success body of `POST /generate-plan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanEnvelope {
    pub study_plan: StudyPlan,
}
