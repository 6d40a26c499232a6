//! TrackerPipeline for combining detection with tracking.

use thiserror::Error;

use crate::tracker::{MotTracker, TrackError, TrackRecord, TrackerConfig, TrackerKind};

use super::DetectionSource;

/// Error from an end-to-end pipeline step: either the detector or the
/// tracker failed.
#[derive(Debug, Error)]
pub enum PipelineError<E> {
    #[error("detection failed: {0}")]
    Detector(#[source] E),
    #[error(transparent)]
    Tracker(#[from] TrackError),
}

/// Bundles a detection backend with a [`MotTracker`] and a frame counter.
///
/// Frames are numbered internally, so callers that just push images never
/// have to manage frame indices themselves.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    tracker: MotTracker,
    next_frame: u64,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new tracking pipeline with the given detector and tracker
    /// configuration.
    pub fn new(
        detector: D,
        kind: TrackerKind,
        config: TrackerConfig,
    ) -> Result<Self, TrackError> {
        Ok(Self {
            detector,
            tracker: MotTracker::new(kind, config)?,
            next_frame: 0,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Self {
        Self {
            detector,
            tracker: MotTracker::new(TrackerKind::default(), TrackerConfig::default())
                .expect("default configuration is valid"),
            next_frame: 0,
        }
    }

    /// Run detection on one frame and update the tracker with the result.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<TrackRecord>, PipelineError<D::Error>> {
        let detections = self
            .detector
            .detect(input, width, height)
            .map_err(PipelineError::Detector)?;
        self.next_frame += 1;
        Ok(self.tracker.track(&detections, self.next_frame)?)
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &MotTracker {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut MotTracker {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Detection;

    struct MockDetector {
        detections: Vec<Detection>,
    }

    impl DetectionSource for MockDetector {
        type Error = std::convert::Infallible;

        fn detect(
            &mut self,
            _input: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<Detection>, Self::Error> {
            Ok(self.detections.clone())
        }
    }

    #[test]
    fn test_pipeline_tracks_across_frames() {
        let detector = MockDetector {
            detections: vec![Detection::new(10.0, 20.0, 50.0, 80.0, 0.9, 0)],
        };

        let mut pipeline = TrackerPipeline::with_default_config(detector);
        let first = pipeline.process_frame(&[], 640, 480).unwrap();
        assert_eq!(first.len(), 1);
        let id = first[0].track_id;

        let second = pipeline.process_frame(&[], 640, 480).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].track_id, id);
    }
}
