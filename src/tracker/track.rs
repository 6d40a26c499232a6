//! Single track entity: motion state, streak counters and lifecycle.

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Smoothing factor applied to each new raw velocity sample.
const VELOCITY_EMA_ALPHA: f64 = 0.1;

/// One tracked object. Owned exclusively by the tracker; persists across
/// frames until its state turns [`TrackState::Lost`].
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    state: TrackState,
    class_id: i32,
    score: f32,
    hit_streak: u32,
    miss_streak: u32,
    start_frame: u64,
    last_update_frame: u64,
    // EMA-smoothed center velocity in pixels per frame
    velocity: (f64, f64),
    prev_center: (f64, f64),
    mean: Array1<f64>,
    covariance: Array2<f64>,
}

impl Track {
    /// Spawn a track from an unmatched detection. The detection counts as
    /// the first hit; a confirmation threshold of 1 confirms immediately.
    pub fn new(
        id: u64,
        frame_id: u64,
        det: &Detection,
        kf: &KalmanFilter,
        track_confirmed_frames: u32,
    ) -> Self {
        let xyah = det.bbox.to_xyah();
        let (mean, covariance) = kf.initiate([
            xyah[0] as f64,
            xyah[1] as f64,
            xyah[2] as f64,
            xyah[3] as f64,
        ]);
        let (cx, cy) = det.bbox.center();

        let state = if 1 >= track_confirmed_frames {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        };

        Self {
            id,
            state,
            class_id: det.class_id,
            score: det.score,
            hit_streak: 1,
            miss_streak: 0,
            start_frame: frame_id,
            last_update_frame: frame_id,
            velocity: (0.0, 0.0),
            prev_center: (cx as f64, cy as f64),
            mean,
            covariance,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn hit_streak(&self) -> u32 {
        self.hit_streak
    }

    pub fn miss_streak(&self) -> u32 {
        self.miss_streak
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn is_lost(&self) -> bool {
        self.state == TrackState::Lost
    }

    /// Center velocity in pixels per frame.
    pub fn velocity(&self) -> (f32, f32) {
        (self.velocity.0 as f32, self.velocity.1 as f32)
    }

    /// Current box, derived from the filter state.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    /// Advance the motion state one step. Runs every frame for every track,
    /// matched or not.
    pub fn predict(&mut self, kf: &KalmanFilter) {
        let (mean, covariance) = kf.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
    }

    /// Correct the state toward a matched detection.
    pub fn correct(
        &mut self,
        frame_id: u64,
        det: &Detection,
        kf: &KalmanFilter,
        track_confirmed_frames: u32,
    ) {
        let xyah = det.bbox.to_xyah();
        match kf.update(
            &self.mean,
            &self.covariance,
            [
                xyah[0] as f64,
                xyah[1] as f64,
                xyah[2] as f64,
                xyah[3] as f64,
            ],
        ) {
            Some((mean, covariance)) => {
                self.mean = mean;
                self.covariance = covariance;
            }
            None => {
                warn!(track_id = self.id, "singular innovation covariance, keeping prediction");
            }
        }

        self.hit_streak += 1;
        self.miss_streak = 0;
        self.score = det.score;
        self.class_id = det.class_id;

        let frame_diff = frame_id.saturating_sub(self.last_update_frame).max(1) as f64;
        let cx = self.mean[0];
        let cy = self.mean[1];
        let raw_vx = (cx - self.prev_center.0) / frame_diff;
        let raw_vy = (cy - self.prev_center.1) / frame_diff;
        self.velocity.0 = (1.0 - VELOCITY_EMA_ALPHA) * self.velocity.0 + VELOCITY_EMA_ALPHA * raw_vx;
        self.velocity.1 = (1.0 - VELOCITY_EMA_ALPHA) * self.velocity.1 + VELOCITY_EMA_ALPHA * raw_vy;
        self.prev_center = (cx, cy);
        self.last_update_frame = frame_id;

        if self.state == TrackState::Tentative && self.hit_streak >= track_confirmed_frames {
            debug!(track_id = self.id, "track confirmed");
            self.state = TrackState::Confirmed;
        }
    }

    /// Register a frame with no matching detection. Tentative tracks are
    /// discarded outright; confirmed tracks survive until the miss streak
    /// exceeds `max_unmatched_times`.
    pub fn mark_missed(&mut self, max_unmatched_times: u32) {
        self.hit_streak = 0;
        self.miss_streak += 1;
        match self.state {
            TrackState::Tentative => {
                debug!(track_id = self.id, "tentative track dropped");
                self.state = TrackState::Lost;
            }
            TrackState::Confirmed => {
                if self.miss_streak > max_unmatched_times {
                    debug!(
                        track_id = self.id,
                        miss_streak = self.miss_streak,
                        "track lost"
                    );
                    self.state = TrackState::Lost;
                }
            }
            TrackState::Lost => {}
        }
    }

    /// Force the track out of the active set (boundary pruning).
    pub fn mark_lost(&mut self) {
        self.state = TrackState::Lost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(x1, y1, x2, y2, 0.9, 1)
    }

    #[test]
    fn test_confirmation_after_streak() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, 1, &det(0.0, 0.0, 10.0, 10.0), &kf, 3);
        assert_eq!(track.state(), TrackState::Tentative);

        track.predict(&kf);
        track.correct(2, &det(0.0, 0.0, 10.0, 10.0), &kf, 3);
        assert_eq!(track.state(), TrackState::Tentative);

        track.predict(&kf);
        track.correct(3, &det(0.0, 0.0, 10.0, 10.0), &kf, 3);
        assert_eq!(track.state(), TrackState::Confirmed);
    }

    #[test]
    fn test_confirmed_at_creation_with_threshold_one() {
        let kf = KalmanFilter::new();
        let track = Track::new(1, 1, &det(0.0, 0.0, 10.0, 10.0), &kf, 1);
        assert_eq!(track.state(), TrackState::Confirmed);
    }

    #[test]
    fn test_tentative_discarded_on_first_miss() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, 1, &det(0.0, 0.0, 10.0, 10.0), &kf, 3);
        track.predict(&kf);
        track.mark_missed(30);
        assert!(track.is_lost());
    }

    #[test]
    fn test_confirmed_survives_grace_period() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, 1, &det(0.0, 0.0, 10.0, 10.0), &kf, 1);
        for frame in 0..3 {
            track.predict(&kf);
            track.mark_missed(3);
            assert!(!track.is_lost(), "lost too early at miss {frame}");
        }
        track.predict(&kf);
        track.mark_missed(3);
        assert!(track.is_lost());
    }

    #[test]
    fn test_stationary_velocity_is_zero() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, 1, &det(0.0, 0.0, 10.0, 10.0), &kf, 1);
        for frame in 2..6 {
            track.predict(&kf);
            track.correct(frame, &det(0.0, 0.0, 10.0, 10.0), &kf, 1);
        }
        let (vx, vy) = track.velocity();
        assert!(vx.abs() < 1e-3);
        assert!(vy.abs() < 1e-3);
    }

    #[test]
    fn test_miss_resets_hit_streak() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, 1, &det(0.0, 0.0, 10.0, 10.0), &kf, 1);
        track.predict(&kf);
        track.correct(2, &det(0.0, 0.0, 10.0, 10.0), &kf, 1);
        assert_eq!(track.hit_streak(), 2);

        track.predict(&kf);
        track.mark_missed(5);
        assert_eq!(track.hit_streak(), 0);
        assert_eq!(track.miss_streak(), 1);
    }
}
