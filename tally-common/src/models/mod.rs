pub mod budget;
pub mod budget_history;
pub mod category;
pub mod job_registry_item;
pub mod transaction;
