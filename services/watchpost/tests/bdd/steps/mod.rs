//! BDD step definitions for watchpost

pub mod classification_steps;
pub mod run_steps;
pub mod suppression_steps;
