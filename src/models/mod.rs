pub mod ai_types;
pub mod plan_request;
pub mod plan_view;
pub mod study_plan;
