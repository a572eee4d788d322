//! Intake wizard — the six-step state machine and its validation gates.

pub mod state;
pub mod validator;

pub use state::{Step, Wizard};
pub use validator::{MAX_AGE, MIN_AGE, validate};
