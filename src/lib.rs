//! learnpath - exercise grading and progress tracking for a learning platform
//!
//! A submission flows through four stages:
//!
//! 1. **Evaluator** grades the answer against the exercise's reference output
//!    with a rubric chosen by exercise kind.
//! 2. **Progress recorder** upserts the user's unique record for the exercise.
//! 3. **Points accumulator** credits the score with an atomic increment.
//! 4. **Badge evaluator** grants every catalog badge whose criterion now holds.
//!
//! [`SubmissionPipeline`] wires them together over a [`Store`]; the
//! [`server`] module exposes it over local HTTP.

pub mod achievements;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod scoring;
pub mod server;
pub mod store;

pub use domain::*;
pub use error::{LearnError, Result};
pub use pipeline::{SubmissionPipeline, SubmissionResult};
pub use store::{SqliteStore, Store};
