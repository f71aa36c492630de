use serde::Serialize;

use crate::models::plan_request::PlanRequest;
use crate::models::study_plan::{StudyPlan, WeekPlan};

const CHART_LABEL_MAX_CHARS: usize = 12;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub total_weeks: u32,
    pub total_study_hours: f64,
    pub subject_count: usize,
    pub target_date: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSlice {
    pub name: String,
    pub value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBar {
    pub subject: String,
    pub current: f64,
    pub projected: f64,
}

/// Read-only view over a generated plan with clamped week navigation.
#[derive(Debug, Clone)]
pub struct PlanView {
    plan: StudyPlan,
    request: PlanRequest,
    selected_week: usize,
}

impl PlanView {
    pub fn new(plan: StudyPlan, request: PlanRequest) -> Self {
        Self {
            plan,
            request,
            selected_week: 0,
        }
    }

    pub fn plan(&self) -> &StudyPlan {
        &self.plan
    }

    pub fn request(&self) -> &PlanRequest {
        &self.request
    }

    pub fn selected_week(&self) -> usize {
        self.selected_week
    }

    fn last_week_index(&self) -> usize {
        self.plan.weekly_plans.len().saturating_sub(1)
    }

    pub fn select_week(&mut self, index: usize) -> usize {
        self.selected_week = index.min(self.last_week_index());
        self.selected_week
    }

    pub fn next_week(&mut self) -> usize {
        self.select_week(self.selected_week.saturating_add(1))
    }

    pub fn previous_week(&mut self) -> usize {
        self.select_week(self.selected_week.saturating_sub(1))
    }

    pub fn current_week(&self) -> Option<&WeekPlan> {
        self.plan.weekly_plans.get(self.selected_week)
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            total_weeks: self.plan.total_weeks,
            total_study_hours: self.plan.total_study_hours,
            subject_count: self.request.subjects.len(),
            target_date: self.request.study_preferences.target_date.clone(),
        }
    }

    pub fn allocation_chart(&self) -> Vec<AllocationSlice> {
        self.plan
            .subject_allocations
            .iter()
            .map(|allocation| AllocationSlice {
                name: allocation.subject.clone(),
                value: allocation.total_hours,
                percentage: allocation.percentage,
            })
            .collect()
    }

    pub fn confidence_chart(&self) -> Vec<ConfidenceBar> {
        self.plan
            .outcome_summary
            .confidence_projections
            .iter()
            .map(|projection| ConfidenceBar {
                subject: chart_label(&projection.subject),
                current: projection.current_level,
                projected: projection.projected_level,
            })
            .collect()
    }
}

fn chart_label(subject: &str) -> String {
    if subject.chars().count() > CHART_LABEL_MAX_CHARS {
        let head: String = subject.chars().take(CHART_LABEL_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        subject.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::testing::canned_study_plan;

    fn view(weeks: usize) -> PlanView {
        let plan: StudyPlan = serde_json::from_value(canned_study_plan(weeks)).expect("fixture");
        PlanView::new(plan, PlanRequest::default())
    }

    #[test]
    fn navigation_clamps_instead_of_wrapping() {
        let mut view = view(3);
        assert_eq!(view.previous_week(), 0);
        assert_eq!(view.next_week(), 1);
        assert_eq!(view.next_week(), 2);
        assert_eq!(view.next_week(), 2);
        assert_eq!(view.select_week(99), 2);
        assert_eq!(view.current_week().map(|week| week.week_number), Some(3));
        assert_eq!(view.previous_week(), 1);
    }

    #[test]
    fn single_week_plan_stays_on_first_week() {
        let mut view = view(1);
        assert_eq!(view.next_week(), 0);
        assert_eq!(view.previous_week(), 0);
    }

    #[test]
    fn confidence_labels_are_truncated() {
        assert_eq!(chart_label("Thermodynamics II"), "Thermodynami...");
        assert_eq!(chart_label("Circuits"), "Circuits");
        assert_eq!(chart_label("Twelve chars"), "Twelve chars");
    }

    #[test]
    fn summary_reads_from_request_and_plan() {
        let view = view(2);
        let summary = view.summary();
        assert_eq!(summary.total_weeks, view.plan().total_weeks);
        assert_eq!(summary.subject_count, 1);
        assert_eq!(view.allocation_chart().len(), view.plan().subject_allocations.len());
    }
}
