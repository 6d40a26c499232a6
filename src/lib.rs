//! Multi-object tracking engine.
//!
//! Associates per-frame detections (box + score + class) with persistent
//! tracks using a two-stage IoU assignment over a constant-velocity Kalman
//! prediction, and manages the track lifecycle
//! (tentative → confirmed → lost).
//!
//! The engine is decoupled from pixels: it consumes geometric detection data
//! produced by any inference backend (see [`DetectionSource`]) and emits
//! [`TrackRecord`]s carrying id, box, velocity, state and class.
//!
//! A [`MotTracker`] is sequential and stateful: one instance per video
//! stream, frames fed in non-decreasing order. Independent instances may run
//! on separate threads; a shared instance needs external serialization.

pub mod integration;
pub mod tracker;

pub use integration::{
    DetectionBuilder, DetectionSource, IntoDetections, PipelineError, TrackerPipeline,
};
pub use tracker::{
    Detection, MotTracker, Rect, TrackError, TrackRecord, TrackState, TrackerConfig, TrackerKind,
};
