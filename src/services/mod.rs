pub mod ai_service;
pub mod plan_schema;
pub mod prompt_templates;
pub mod schedule_utils;
