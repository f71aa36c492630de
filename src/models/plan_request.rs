use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MIN_CREDITS: u8 = 1;
pub const MAX_CREDITS: u8 = 6;
pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetails {
    pub name: String,
    #[serde(alias = "institution")]
    pub college: String,
    #[serde(alias = "program")]
    pub branch: String,
    pub graduation_year: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub credits: u8,
    #[serde(default)]
    pub strong_areas: String,
    #[serde(default)]
    pub weak_areas: String,
    pub confidence_level: u8,
}

impl Subject {
    /// Blank subject as the wizard creates it.
    pub fn empty() -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            name: String::new(),
            credits: 3,
            strong_areas: String::new(),
            weak_areas: String::new(),
            confidence_level: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl PreferredTime {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferredTime::Morning => "morning",
            PreferredTime::Afternoon => "afternoon",
            PreferredTime::Evening => "evening",
            PreferredTime::Night => "night",
        }
    }
}

impl Default for PreferredTime {
    fn default() -> Self {
        PreferredTime::Night
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyPreferences {
    pub weekday_hours: f64,
    pub weekend_hours: f64,
    pub preferred_time: PreferredTime,
    pub target_date: String,
}

impl Default for StudyPreferences {
    fn default() -> Self {
        Self {
            weekday_hours: 3.0,
            weekend_hours: 6.0,
            preferred_time: PreferredTime::default(),
            target_date: String::new(),
        }
    }
}

impl StudyPreferences {
    /// Accepts a calendar date (read as midnight UTC) or an RFC 3339 timestamp.
    pub fn target_instant(&self) -> AppResult<DateTime<Utc>> {
        let raw = self.target_date.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc());
            }
        }

        DateTime::parse_from_rfc3339(raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(|err| {
                AppError::validation_with_details(
                    "targetDate must be YYYY-MM-DD or an RFC 3339 timestamp",
                    json!({ "value": raw, "error": err.to_string() }),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    StudentDetails,
    Subjects,
    StudyPreferences,
    Review,
}

impl FormStep {
    pub const ALL: [FormStep; 4] = [
        FormStep::StudentDetails,
        FormStep::Subjects,
        FormStep::StudyPreferences,
        FormStep::Review,
    ];

    pub fn title(self) -> &'static str {
        match self {
            FormStep::StudentDetails => "Student Details",
            FormStep::Subjects => "Subjects",
            FormStep::StudyPreferences => "Study Preferences",
            FormStep::Review => "Review",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub student_details: StudentDetails,
    pub subjects: Vec<Subject>,
    pub study_preferences: StudyPreferences,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            student_details: StudentDetails::default(),
            subjects: vec![Subject::empty()],
            study_preferences: StudyPreferences::default(),
        }
    }
}

/// Body accepted by `POST /generate-plan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanBody {
    pub form_data: PlanRequest,
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

impl PlanRequest {
    pub fn step_complete(&self, step: FormStep) -> bool {
        match step {
            FormStep::StudentDetails => {
                let details = &self.student_details;
                filled(&details.name)
                    && filled(&details.college)
                    && filled(&details.branch)
                    && filled(&details.graduation_year)
                    && filled(&details.email)
            }
            FormStep::Subjects => self
                .subjects
                .iter()
                .all(|subject| filled(&subject.name) && subject.credits > 0),
            FormStep::StudyPreferences => filled(&self.study_preferences.target_date),
            FormStep::Review => true,
        }
    }

    /// First step that still blocks advancement, if any.
    pub fn first_incomplete_step(&self) -> Option<FormStep> {
        FormStep::ALL
            .into_iter()
            .find(|step| !self.step_complete(*step))
    }

    pub fn is_submittable(&self) -> bool {
        self.first_incomplete_step().is_none()
    }

    pub fn add_subject(&mut self) -> &mut Subject {
        self.subjects.push(Subject::empty());
        let last = self.subjects.len() - 1;
        &mut self.subjects[last]
    }

    /// Removes a subject by id. The last remaining subject is never removed.
    pub fn remove_subject(&mut self, id: &str) -> bool {
        if self.subjects.len() <= 1 {
            return false;
        }
        let before = self.subjects.len();
        self.subjects
            .retain(|subject| subject.id.as_deref() != Some(id));
        self.subjects.len() != before
    }

    /// Checks what the endpoint needs before a prompt can be built.
    pub fn validate(&self) -> AppResult<()> {
        if self.subjects.is_empty() {
            return Err(AppError::validation("at least one subject is required"));
        }

        for (index, subject) in self.subjects.iter().enumerate() {
            if !filled(&subject.name) {
                return Err(AppError::validation_with_details(
                    "subject name must not be empty",
                    json!({ "index": index }),
                ));
            }
            if !(MIN_CREDITS..=MAX_CREDITS).contains(&subject.credits) {
                return Err(AppError::validation_with_details(
                    format!("credits must be between {MIN_CREDITS} and {MAX_CREDITS}"),
                    json!({ "index": index, "credits": subject.credits }),
                ));
            }
            if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&subject.confidence_level) {
                return Err(AppError::validation_with_details(
                    format!(
                        "confidenceLevel must be between {MIN_CONFIDENCE} and {MAX_CONFIDENCE}"
                    ),
                    json!({ "index": index, "confidenceLevel": subject.confidence_level }),
                ));
            }
        }

        let prefs = &self.study_preferences;
        for (field, value) in [
            ("weekdayHours", prefs.weekday_hours),
            ("weekendHours", prefs.weekend_hours),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AppError::validation_with_details(
                    format!("{field} must be a positive number"),
                    json!({ "field": field, "value": value }),
                ));
            }
        }

        prefs.target_instant()?;
        Ok(())
    }
}
