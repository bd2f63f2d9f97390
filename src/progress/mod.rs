//! Progress recording, points crediting and progress views

mod points;
mod recorder;
mod views;

pub use points::PointsAccumulator;
pub use recorder::{ProgressRecorder, Recorded};
pub use views::{ExerciseProgressView, ModuleDetail, ModuleProgress, ProgressViews};
