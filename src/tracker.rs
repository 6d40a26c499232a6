mod error;
mod kalman_filter;
mod matching;
mod mot_tracker;
mod rect;
mod track;
mod track_state;

pub use error::TrackError;
pub use matching::{AssignmentResult, Detection};
pub use mot_tracker::{MotTracker, TrackRecord, TrackerConfig, TrackerKind};
pub use rect::Rect;
pub use track::Track;
pub use track_state::TrackState;
