use thiserror::Error;

/// Errors surfaced by the tracking engine.
///
/// Malformed individual detections are not represented here: they are
/// dropped with a warning and the rest of the frame is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The caller fed a frame index lower than one already seen. The call
    /// fails before any tracker state is mutated.
    #[error("frame index {got} precedes previously seen frame index {last}")]
    NonMonotonicFrame { last: u64, got: u64 },

    /// A configuration value is outside its valid range. Raised at
    /// construction time, never during `track`.
    #[error("invalid tracker configuration: {0}")]
    Configuration(String),
}
