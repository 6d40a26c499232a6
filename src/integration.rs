//! Integration layer between detection backends and the tracking engine.
//!
//! The tracker itself never touches pixels; these traits and helpers are the
//! narrow contract through which an inference backend feeds it geometric
//! detection data.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use pipeline::{PipelineError, TrackerPipeline};
