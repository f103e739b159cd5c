//! Extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Asteroid lookup (stage 1, progress 20)
//! - Site elevation (stage 2, progress 40)
//! - Surface geology (stage 3, progress 60)
//! - Regional context (stage 4, progress 80)
//! - Impact-effect computation (stage 5, progress 100)
//!
//! Every fact is persisted as soon as its stage completes; the first stage
//! failure ends the run and marks the session failed.

pub mod orchestrator;
pub mod stage;

pub use orchestrator::ExtractionOrchestrator;
pub use stage::{fetch_fact, CompleteFacts, StageAccumulator};
