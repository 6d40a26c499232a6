//! Detection input type, IoU cost matrices and the assignment solver.

use ndarray::Array2;

use crate::tracker::rect::Rect;

/// Bias ceiling used to break equal-cost assignment ties in favor of longer
/// hit streaks. Must stay well below any meaningful IoU distance difference.
const TIE_BREAK_EPS: f64 = 1e-4;

/// One frame's raw model output for a candidate object.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Bounding box (caller supplies TLBR corners).
    pub bbox: Rect,
    /// Confidence score in [0, 1].
    pub score: f32,
    /// Category label, carried through to matched tracks unvalidated.
    pub class_id: i32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: i32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
            class_id,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32, class_id: i32) -> Self {
        Self {
            bbox,
            score,
            class_id,
        }
    }

    /// A detection is usable when its box has positive, finite extent and
    /// its score is a confidence in [0, 1].
    pub fn is_valid(&self) -> bool {
        self.bbox.is_valid() && self.score.is_finite() && (0.0..=1.0).contains(&self.score)
    }
}

/// Pairwise IoU distance, `1 - IoU`, between track boxes (rows) and
/// detection boxes (columns). Bounded in [0, 1]; degenerate boxes sit at the
/// maximal distance.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    let mut dists = Array2::zeros((track_boxes.len(), det_boxes.len()));
    for (i, t) in track_boxes.iter().enumerate() {
        for (j, d) in det_boxes.iter().enumerate() {
            dists[[i, j]] = 1.0 - t.iou(d);
        }
    }
    dists
}

/// Outcome of one assignment round. Indices refer to the rows and columns of
/// the cost matrix that was solved.
#[derive(Debug, Clone)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Solve a minimum-cost bipartite matching between tracks (rows) and
/// detections (columns), excluding any pair whose cost exceeds `thresh`.
///
/// `row_streaks` holds each row's hit streak; among equal-cost pairings the
/// longer-streak track wins the contested detection. The streak enters the
/// solver as a bounded sub-threshold discount on real cells only; padding
/// cells stay undiscounted so the bias survives row reduction.
pub fn linear_assignment(
    cost_matrix: &Array2<f32>,
    thresh: f32,
    row_streaks: &[u32],
) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();
    debug_assert_eq!(row_streaks.len(), num_rows);

    if num_rows == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: vec![],
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    if num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: vec![],
        };
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        let discount = streak_discount(row_streaks[i]);
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64 - discount;
        }
    }

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask: Vec<bool> = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate() {
                if row_idx >= num_rows {
                    continue;
                }
                if col_idx >= num_cols {
                    unmatched_tracks.push(row_idx);
                } else if cost_matrix[[row_idx, col_idx]] <= thresh {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                } else {
                    unmatched_tracks.push(row_idx);
                }
            }
        }
        Err(err) => {
            tracing::warn!(?err, "assignment solver failed, frame left unmatched");
            unmatched_tracks = (0..num_rows).collect();
        }
    }

    let unmatched_detections: Vec<usize> = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| u.then_some(i))
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}

/// Strictly increasing in the streak, bounded by `TIE_BREAK_EPS`.
fn streak_discount(streak: u32) -> f64 {
    let s = streak as f64;
    TIE_BREAK_EPS * (s / (s + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_iou_distance_bounds_and_symmetry() {
        let boxes = [
            Rect::from_tlbr(0.0, 0.0, 10.0, 10.0),
            Rect::from_tlbr(5.0, 5.0, 15.0, 15.0),
            Rect::from_tlbr(100.0, 100.0, 110.0, 110.0),
        ];
        let d_ab = iou_distance(&boxes, &boxes);
        for i in 0..boxes.len() {
            assert!((d_ab[[i, i]]).abs() < 1e-6);
            for j in 0..boxes.len() {
                assert!(d_ab[[i, j]] >= 0.0 && d_ab[[i, j]] <= 1.0);
                assert_eq!(d_ab[[i, j]], d_ab[[j, i]]);
            }
        }
    }

    #[test]
    fn test_assignment_simple_diagonal() {
        let cost = array![[0.1f32, 0.9], [0.9, 0.2]];
        let result = linear_assignment(&cost, 0.5, &[0, 0]);
        assert_eq!(result.matches, vec![(0, 0), (1, 1)]);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_assignment_threshold_filters_pairs() {
        let cost = array![[0.7f32]];
        let result = linear_assignment(&cost, 0.5, &[0]);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![0]);
        assert_eq!(result.unmatched_detections, vec![0]);
    }

    #[test]
    fn test_assignment_no_duplicate_columns() {
        // two rows, one column: exactly one match
        let cost = array![[0.3f32], [0.3]];
        let result = linear_assignment(&cost, 0.5, &[1, 1]);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.unmatched_tracks.len(), 1);
    }

    #[test]
    fn test_assignment_tie_break_prefers_longer_streak() {
        let cost = array![[0.3f32], [0.3]];
        // row 1 is the more established track
        let result = linear_assignment(&cost, 0.5, &[1, 7]);
        assert_eq!(result.matches, vec![(1, 0)]);

        // flipped streaks flip the winner
        let result = linear_assignment(&cost, 0.5, &[7, 1]);
        assert_eq!(result.matches, vec![(0, 0)]);
    }

    #[test]
    fn test_assignment_empty_inputs() {
        let cost = Array2::<f32>::zeros((0, 3));
        let result = linear_assignment(&cost, 0.5, &[]);
        assert_eq!(result.unmatched_detections, vec![0, 1, 2]);

        let cost = Array2::<f32>::zeros((2, 0));
        let result = linear_assignment(&cost, 0.5, &[0, 0]);
        assert_eq!(result.unmatched_tracks, vec![0, 1]);
    }

    #[test]
    fn test_detection_validity() {
        assert!(Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 1).is_valid());
        assert!(!Detection::new(10.0, 0.0, 0.0, 10.0, 0.9, 1).is_valid());
        assert!(!Detection::new(0.0, 0.0, 10.0, 10.0, 1.5, 1).is_valid());
        assert!(!Detection::new(0.0, f32::NAN, 10.0, 10.0, 0.9, 1).is_valid());
    }
}
