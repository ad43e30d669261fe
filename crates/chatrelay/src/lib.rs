pub mod errors;
pub mod marker;
pub mod models;
pub mod orchestrator;
pub mod parameters;
pub mod processor;
pub mod prompt_template;
pub mod providers;
pub mod schema;
pub mod tools;
