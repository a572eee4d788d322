//! Symptom intake — the session engine behind a patient intake wizard.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod followup;
pub mod results;
pub mod search;
pub mod session;
pub mod view;
pub mod wizard;

pub use backend::{HttpBackend, IntakeBackend};
pub use config::IntakeConfig;
pub use engine::{Action, IntakeEngine};
pub use error::{Error, Result};
