/// Axis-aligned bounding box with format conversion utilities.
///
/// Stored as TLWH (top-left corner plus size). Conversions cover the two
/// other formats the engine deals in:
/// - TLBR: top-left and bottom-right corners, the detection wire format
/// - XYAH: center, aspect ratio (w/h) and height, the Kalman state layout
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates (x1, y1, x2, y2).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Build from center, aspect ratio and height.
    #[inline]
    pub fn from_xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        let width = aspect_ratio * height;
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Corner coordinates: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Center, aspect ratio and height: (cx, cy, w/h, h).
    #[inline]
    pub fn to_xyah(&self) -> [f32; 4] {
        let (cx, cy) = self.center();
        let aspect_ratio = if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        };
        [cx, cy, aspect_ratio, self.height]
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// All four TLBR coordinates are finite and the box has positive extent.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    fn intersection_area(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);
        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }

    /// Intersection over union. Degenerate boxes yield 0, so their IoU
    /// distance is maximal and they are never matched.
    pub fn iou(&self, other: &Rect) -> f32 {
        if self.area() <= 0.0 || other.area() <= 0.0 {
            return 0.0;
        }
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }

    /// Fraction of this box's area covered by `other`.
    ///
    /// Asymmetric on purpose: used to test how much of a track still lies
    /// inside the frame when a size hint is set.
    pub fn coverage(&self, other: &Rect) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_roundtrip() {
        let rect = Rect::from_tlbr(10.0, 20.0, 40.0, 60.0);
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);

        let xyah = rect.to_xyah();
        assert_eq!(xyah[0], 25.0);
        assert_eq!(xyah[1], 40.0);
        assert!((xyah[2] - 0.75).abs() < 1e-6);
        assert_eq!(xyah[3], 40.0);

        let back = Rect::from_xyah(xyah[0], xyah[1], xyah[2], xyah[3]);
        assert!((back.x - 10.0).abs() < 1e-5);
        assert!((back.y - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        // intersection 25, union 175
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), b.iou(&a));
    }

    #[test]
    fn test_iou_identity_and_disjoint() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);

        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_degenerate_box() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let zero = Rect::new(5.0, 5.0, 0.0, 0.0);
        assert_eq!(a.iou(&zero), 0.0);
        assert_eq!(zero.iou(&a), 0.0);
    }

    #[test]
    fn test_coverage() {
        let inner = Rect::new(0.0, 0.0, 10.0, 10.0);
        let frame = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!((inner.coverage(&frame) - 1.0).abs() < 1e-6);

        let half_out = Rect::new(-5.0, 0.0, 10.0, 10.0);
        assert!((half_out.coverage(&frame) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_is_valid() {
        assert!(Rect::from_tlbr(0.0, 0.0, 10.0, 10.0).is_valid());
        assert!(!Rect::from_tlbr(10.0, 0.0, 0.0, 10.0).is_valid());
        assert!(!Rect::from_tlbr(0.0, 0.0, f32::NAN, 10.0).is_valid());
    }
}
