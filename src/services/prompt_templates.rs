use std::fmt::Write as _;

use crate::models::plan_request::{PlanRequest, Subject};
use crate::services::schedule_utils::{DerivedParameters, NEXT_DAYS_FOCUS_LEN};

const NONE_SPECIFIED: &str = "none specified";

/// System message for structured study-plan generation.
pub fn study_planner_system_prompt() -> &'static str {
    r#"You are a study planning assistant. Respond with a single JSON object that matches the
provided schema exactly. Do not wrap the response in markdown code blocks and do not add fields
that the schema does not define."#
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        NONE_SPECIFIED
    } else {
        value
    }
}

pub fn render_subject_line(subject: &Subject) -> String {
    format!(
        "- {} ({} credits): Strong in [{}], Weak in [{}], Confidence: {}/5",
        subject.name,
        subject.credits,
        or_placeholder(&subject.strong_areas),
        or_placeholder(&subject.weak_areas),
        subject.confidence_level
    )
}

/// Build the instruction block sent as the user message.
pub fn build_plan_prompt(request: &PlanRequest, params: &DerivedParameters) -> String {
    let details = &request.student_details;
    let prefs = &request.study_preferences;
    let preferred = prefs.preferred_time.as_str();

    let subjects = request
        .subjects
        .iter()
        .map(render_subject_line)
        .collect::<Vec<_>>()
        .join("\n");

    let rules = [
        "Allocate more time to subjects with lower confidence and higher credits.".to_string(),
        "Schedule weak/prerequisite-heavy topics EARLIER in the plan.".to_string(),
        format!("Place high-cognitive-load topics during preferred study time ({preferred})."),
        "Place lighter tasks (revision, notes) in non-preferred hours.".to_string(),
        "Include buffer time for spillovers.".to_string(),
        "Each session type should be one of: learning, practice, revision, buffer.".to_string(),
        "Cognitive load per session: high, medium, or low.".to_string(),
        format!(
            "Generate exactly {} weeks of detailed weekly plans (with 7 days each).",
            params.generated_weeks
        ),
        format!("Generate exactly {NEXT_DAYS_FOCUS_LEN} entries for nextSevenDaysFocus."),
        "Provide smart insights with prerequisite gap warnings and rebalancing suggestions."
            .to_string(),
        "Project confidence improvement for each subject.".to_string(),
        "Session durations should be realistic (30-90 minutes each).".to_string(),
        "Total daily session minutes should roughly match the available hours for that day type."
            .to_string(),
    ];

    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert AI study planner for engineering students. \
         Create a detailed, personalized study plan.\n\n",
    );

    prompt.push_str("STUDENT PROFILE:\n");
    let _ = writeln!(prompt, "- Name: {}", details.name);
    let _ = writeln!(prompt, "- College: {}", details.college);
    let _ = writeln!(prompt, "- Branch: {}", details.branch);
    let _ = writeln!(prompt, "- Graduation Year: {}", details.graduation_year);

    prompt.push_str("\nSUBJECTS:\n");
    prompt.push_str(&subjects);
    prompt.push('\n');

    prompt.push_str("\nSTUDY PREFERENCES:\n");
    let _ = writeln!(prompt, "- Weekday study hours: {} hours/day", prefs.weekday_hours);
    let _ = writeln!(prompt, "- Weekend study hours: {} hours/day", prefs.weekend_hours);
    let _ = writeln!(prompt, "- Preferred study time: {preferred}");
    let _ = writeln!(prompt, "- Total available weeks: {}", params.total_weeks);
    let _ = writeln!(prompt, "- Weekly study hours: {}", params.weekly_hours);
    let _ = writeln!(prompt, "- Target completion date: {}", prefs.target_date);

    prompt.push_str("\nPLANNING RULES:\n");
    for (index, rule) in rules.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", index + 1, rule);
    }

    prompt.push_str("\nCreate a comprehensive, actionable, and motivating study plan.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan_request::{PreferredTime, StudentDetails, StudyPreferences};

    fn request() -> PlanRequest {
        PlanRequest {
            student_details: StudentDetails {
                name: "Aman".into(),
                college: "XYZ Institute".into(),
                branch: "CSE".into(),
                graduation_year: "2027".into(),
                email: String::new(),
            },
            subjects: vec![
                Subject {
                    id: None,
                    name: "Data Structures".into(),
                    credits: 4,
                    strong_areas: "Arrays, Linked Lists".into(),
                    weak_areas: "   ".into(),
                    confidence_level: 2,
                },
                Subject {
                    id: None,
                    name: "Operating Systems".into(),
                    credits: 3,
                    strong_areas: String::new(),
                    weak_areas: "Paging".into(),
                    confidence_level: 4,
                },
            ],
            study_preferences: StudyPreferences {
                weekday_hours: 3.0,
                weekend_hours: 6.0,
                preferred_time: PreferredTime::Evening,
                target_date: "2026-12-20".into(),
            },
        }
    }

    fn params(generated_weeks: u32) -> DerivedParameters {
        DerivedParameters {
            total_days: 63,
            total_weeks: 9,
            weekly_hours: 27.0,
            generated_weeks,
        }
    }

    #[test]
    fn subject_lines_use_placeholder_for_blank_notes() {
        let request = request();
        assert_eq!(
            render_subject_line(&request.subjects[0]),
            "- Data Structures (4 credits): Strong in [Arrays, Linked Lists], Weak in [none specified], Confidence: 2/5"
        );
        assert_eq!(
            render_subject_line(&request.subjects[1]),
            "- Operating Systems (3 credits): Strong in [none specified], Weak in [Paging], Confidence: 4/5"
        );
    }

    #[test]
    fn non_blank_notes_are_passed_through_verbatim() {
        let mut subject = request().subjects.remove(0);
        subject.strong_areas = "  Arrays  ".into();
        subject.weak_areas = "\tTrees".into();
        assert_eq!(
            render_subject_line(&subject),
            "- Data Structures (4 credits): Strong in [  Arrays  ], Weak in [\tTrees], Confidence: 2/5"
        );
    }

    #[test]
    fn prompt_embeds_profile_preferences_and_rules() {
        let prompt = build_plan_prompt(&request(), &params(4));

        assert!(prompt.contains("- Name: Aman"));
        assert!(prompt.contains("- College: XYZ Institute"));
        assert!(prompt.contains("- Branch: CSE"));
        assert!(prompt.contains("- Graduation Year: 2027"));
        assert!(prompt.contains("- Weekday study hours: 3 hours/day"));
        assert!(prompt.contains("- Weekend study hours: 6 hours/day"));
        assert!(prompt.contains("- Preferred study time: evening"));
        assert!(prompt.contains("- Total available weeks: 9"));
        assert!(prompt.contains("- Weekly study hours: 27"));
        assert!(prompt.contains("- Target completion date: 2026-12-20"));
        assert!(prompt.contains("during preferred study time (evening)"));
        assert!(prompt.contains("8. Generate exactly 4 weeks of detailed weekly plans"));
        assert!(prompt.contains("9. Generate exactly 7 entries for nextSevenDaysFocus."));
        assert!(prompt.contains("12. Session durations should be realistic (30-90 minutes each)."));
        assert!(prompt.contains("13. Total daily session minutes"));
    }

    #[test]
    fn prompt_requests_generated_week_count() {
        let prompt = build_plan_prompt(&request(), &params(2));
        assert!(prompt.contains("Generate exactly 2 weeks of detailed weekly plans"));
    }

    #[test]
    fn fractional_hours_render_without_padding() {
        let mut request = request();
        request.study_preferences.weekday_hours = 2.5;
        let prompt = build_plan_prompt(&request, &params(1));
        assert!(prompt.contains("- Weekday study hours: 2.5 hours/day"));
    }
}
