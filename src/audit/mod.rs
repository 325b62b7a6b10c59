//! Synthetic mobile audit: replays scripted scenarios under simulated
//! network and device profiles and scores the collected vitals.

pub mod catalogue;
mod driver;
mod runner;
pub mod scoring;

pub use catalogue::{default_audit_config, select_scenario};
pub use driver::{LoggingDriver, PageDriver, StepOutcome};
pub use runner::{AuditPhase, AuditRunner};
pub use scoring::{evaluate_metrics, generate_recommendations};
