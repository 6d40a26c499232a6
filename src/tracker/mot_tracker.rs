//! Per-frame tracking orchestration: predict, associate, update, prune, emit.

use tracing::{debug, warn};

use crate::tracker::error::TrackError;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackState;

/// Tracks covering less than this fraction of their own area inside the
/// frame are pruned, when a frame size hint is set.
const BOUNDARY_COVERAGE_MIN: f32 = 0.5;

/// Association strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerKind {
    /// SORT-family tracking: constant-velocity Kalman prediction with
    /// two-stage (high/low confidence) IoU association.
    #[default]
    SortIou,
}

/// Configuration for the tracking engine. Validated at construction.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Consecutive unmatched frames a confirmed track survives before it is
    /// dropped.
    pub max_unmatched_times: u32,
    /// Consecutive matched frames required to promote a tentative track.
    pub track_confirmed_frames: u32,
    /// Score splitting detections into the high and low confidence buckets.
    pub high_score_thresh: f32,
    /// Maximum IoU distance accepted in the first (high confidence) stage.
    pub high_score_iou_dist_thresh: f32,
    /// Maximum IoU distance accepted in the second (low confidence) stage.
    /// Looser than the first stage to salvage occluded tracks.
    pub low_score_iou_dist_thresh: f32,
    /// Minimum score for an unmatched detection to spawn a new track.
    pub track_init_score_thresh: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_unmatched_times: 30,
            track_confirmed_frames: 3,
            high_score_thresh: 0.5,
            high_score_iou_dist_thresh: 0.7,
            low_score_iou_dist_thresh: 0.85,
            track_init_score_thresh: 0.6,
        }
    }
}

impl TrackerConfig {
    fn validate(&self) -> Result<(), TrackError> {
        let unit = |name: &str, v: f32| -> Result<(), TrackError> {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(TrackError::Configuration(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
            Ok(())
        };
        unit("high_score_thresh", self.high_score_thresh)?;
        unit("high_score_iou_dist_thresh", self.high_score_iou_dist_thresh)?;
        unit("low_score_iou_dist_thresh", self.low_score_iou_dist_thresh)?;
        unit("track_init_score_thresh", self.track_init_score_thresh)?;
        if self.track_confirmed_frames == 0 {
            return Err(TrackError::Configuration(
                "track_confirmed_frames must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Snapshot of one track emitted after a frame update.
#[derive(Debug, Clone)]
pub struct TrackRecord {
    pub track_id: u64,
    pub rect: Rect,
    /// Center velocity in pixels per frame.
    pub velocity: (f32, f32),
    pub state: TrackState,
    /// Category of the most recent matched detection.
    pub class_id: i32,
    /// Score of the most recent matched detection.
    pub score: f32,
    /// Index into the caller's detection slice, `None` for predicted-only
    /// emissions of confirmed tracks that missed this frame.
    pub det_idx: Option<usize>,
}

/// Multi-object tracker over one logical video stream.
///
/// Sequential and stateful: frames must arrive in non-decreasing order and a
/// single instance must not be driven from multiple threads without external
/// serialization. Independent instances (one per stream) are fully parallel.
pub struct MotTracker {
    kind: TrackerKind,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
    tracks: Vec<Track>,
    next_id: u64,
    last_frame: Option<u64>,
    frame_size: Option<(u32, u32)>,
}

impl MotTracker {
    pub fn new(kind: TrackerKind, config: TrackerConfig) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self {
            kind,
            config,
            kalman_filter: KalmanFilter::default(),
            tracks: Vec::new(),
            next_id: 0,
            last_frame: None,
            frame_size: None,
        })
    }

    pub fn kind(&self) -> TrackerKind {
        self.kind
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Advisory frame size hint. When set, tracks that drift mostly outside
    /// the frame are pruned; the matching math never depends on it.
    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        self.frame_size = Some((width, height));
    }

    /// Process one frame of detections.
    ///
    /// Predicts all tracks forward, associates detections in two confidence
    /// stages, updates matched tracks, ages unmatched ones, spawns tentative
    /// tracks for leftover detections and returns a record per track still
    /// alive. Malformed detections are dropped with a warning; a frame index
    /// lower than an already seen one fails without touching state.
    pub fn track(
        &mut self,
        detections: &[Detection],
        frame_index: u64,
    ) -> Result<Vec<TrackRecord>, TrackError> {
        if let Some(last) = self.last_frame {
            if frame_index < last {
                return Err(TrackError::NonMonotonicFrame {
                    last,
                    got: frame_index,
                });
            }
        }
        self.last_frame = Some(frame_index);

        // Split valid detections by score, keeping caller indices so emitted
        // records can point back into the input slice.
        let mut dets_high: Vec<(usize, &Detection)> = Vec::new();
        let mut dets_low: Vec<(usize, &Detection)> = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            if !det.is_valid() {
                warn!(
                    det_idx = idx,
                    bbox = ?det.bbox.to_tlbr(),
                    score = det.score,
                    "dropping malformed detection"
                );
                continue;
            }
            if det.score >= self.config.high_score_thresh {
                dets_high.push((idx, det));
            } else {
                dets_low.push((idx, det));
            }
        }

        debug!(
            frame = frame_index,
            tracks = self.tracks.len(),
            high = dets_high.len(),
            low = dets_low.len(),
            "frame update"
        );

        for track in &mut self.tracks {
            track.predict(&self.kalman_filter);
        }

        let track_rects: Vec<Rect> = self.tracks.iter().map(|t| t.rect()).collect();
        let streaks: Vec<u32> = self.tracks.iter().map(|t| t.hit_streak()).collect();

        // First stage: high confidence detections against all active tracks.
        let high_rects: Vec<Rect> = dets_high.iter().map(|(_, d)| d.bbox).collect();
        let dists = matching::iou_distance(&track_rects, &high_rects);
        let first =
            matching::linear_assignment(&dists, self.config.high_score_iou_dist_thresh, &streaks);

        let mut assigned: Vec<Option<usize>> = vec![None; self.tracks.len()];
        for &(ti, dj) in &first.matches {
            assigned[ti] = Some(dets_high[dj].0);
        }

        // Second stage: leftover tracks against low confidence detections,
        // with the looser threshold.
        let rem_tracks: Vec<usize> = first.unmatched_tracks;
        let rem_rects: Vec<Rect> = rem_tracks.iter().map(|&i| track_rects[i]).collect();
        let rem_streaks: Vec<u32> = rem_tracks.iter().map(|&i| streaks[i]).collect();
        let low_rects: Vec<Rect> = dets_low.iter().map(|(_, d)| d.bbox).collect();
        let dists_low = matching::iou_distance(&rem_rects, &low_rects);
        let second = matching::linear_assignment(
            &dists_low,
            self.config.low_score_iou_dist_thresh,
            &rem_streaks,
        );
        for (ri, dj) in second.matches {
            assigned[rem_tracks[ri]] = Some(dets_low[dj].0);
        }

        for (track, det_idx) in self.tracks.iter_mut().zip(&assigned) {
            match det_idx {
                Some(idx) => track.correct(
                    frame_index,
                    &detections[*idx],
                    &self.kalman_filter,
                    self.config.track_confirmed_frames,
                ),
                None => track.mark_missed(self.config.max_unmatched_times),
            }
        }

        // Spawn tentative tracks from leftover detections that clear the
        // init threshold. Low confidence leftovers rarely do.
        let spawn_candidates = first
            .unmatched_detections
            .iter()
            .map(|&dj| dets_high[dj])
            .chain(second.unmatched_detections.iter().map(|&dj| dets_low[dj]));
        for (idx, det) in spawn_candidates {
            if det.score < self.config.track_init_score_thresh {
                continue;
            }
            self.next_id += 1;
            debug!(
                track_id = self.next_id,
                det_idx = idx,
                class_id = det.class_id,
                "new track"
            );
            self.tracks.push(Track::new(
                self.next_id,
                frame_index,
                det,
                &self.kalman_filter,
                self.config.track_confirmed_frames,
            ));
            assigned.push(Some(idx));
        }

        if let Some((width, height)) = self.frame_size {
            let frame_rect = Rect::new(0.0, 0.0, width as f32, height as f32);
            for track in &mut self.tracks {
                if !track.is_lost() && track.rect().coverage(&frame_rect) < BOUNDARY_COVERAGE_MIN {
                    debug!(track_id = track.id(), "track left the frame");
                    track.mark_lost();
                }
            }
        }

        let records = self
            .tracks
            .iter()
            .zip(&assigned)
            .filter(|(track, _)| !track.is_lost())
            .map(|(track, det_idx)| TrackRecord {
                track_id: track.id(),
                rect: track.rect(),
                velocity: track.velocity(),
                state: track.state(),
                class_id: track.class_id(),
                score: track.score(),
                det_idx: *det_idx,
            })
            .collect();

        self.tracks.retain(|t| !t.is_lost());

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_config() {
        let config = TrackerConfig {
            high_score_iou_dist_thresh: 1.5,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            MotTracker::new(TrackerKind::SortIou, config),
            Err(TrackError::Configuration(_))
        ));

        let config = TrackerConfig {
            track_confirmed_frames: 0,
            ..TrackerConfig::default()
        };
        assert!(MotTracker::new(TrackerKind::SortIou, config).is_err());
    }

    #[test]
    fn test_rejects_non_monotonic_frame() {
        let mut tracker =
            MotTracker::new(TrackerKind::SortIou, TrackerConfig::default()).unwrap();
        let dets = vec![Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 1)];
        tracker.track(&dets, 5).unwrap();

        let err = tracker.track(&dets, 4).unwrap_err();
        assert_eq!(err, TrackError::NonMonotonicFrame { last: 5, got: 4 });

        // state untouched, the stream continues from frame 5
        let records = tracker.track(&dets, 5).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_malformed_detection_skipped_frame_continues() {
        let mut tracker =
            MotTracker::new(TrackerKind::SortIou, TrackerConfig::default()).unwrap();
        let dets = vec![
            Detection::new(50.0, 50.0, 20.0, 20.0, 0.9, 1), // inverted corners
            Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 1),
        ];
        let records = tracker.track(&dets, 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].det_idx, Some(1));
    }

    #[test]
    fn test_boundary_pruning_with_frame_size_hint() {
        let mut tracker =
            MotTracker::new(TrackerKind::SortIou, TrackerConfig::default()).unwrap();
        tracker.set_frame_size(100, 100);

        // mostly outside the 100x100 frame
        let dets = vec![Detection::new(90.0, 0.0, 130.0, 10.0, 0.9, 1)];
        let records = tracker.track(&dets, 1).unwrap();
        assert!(records.is_empty());

        // fully inside survives
        let dets = vec![Detection::new(10.0, 10.0, 30.0, 30.0, 0.9, 1)];
        let records = tracker.track(&dets, 2).unwrap();
        assert_eq!(records.len(), 1);
    }
}
