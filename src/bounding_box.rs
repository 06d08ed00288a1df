/// Tolerance applied to every face of a box when testing containment, so
/// points sitting on a face are not lost to floating point noise.
pub const BOX_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub lower_left: [f64; 3],
    pub upper_right: [f64; 3],
    pub center: [f64; 3],
    pub width: [f64; 3],
}

impl BoundingBox {
    pub fn new(lower_left: [f64; 3], upper_right: [f64; 3]) -> Self {
        let center = [
            0.5 * (lower_left[0] + upper_right[0]),
            0.5 * (lower_left[1] + upper_right[1]),
            0.5 * (lower_left[2] + upper_right[2]),
        ];
        let width = [
            upper_right[0] - lower_left[0],
            upper_right[1] - lower_left[1],
            upper_right[2] - lower_left[2],
        ];
        BoundingBox {
            lower_left,
            upper_right,
            center,
            width,
        }
    }

    /// Box `[point - half_width, point + half_width]` on each axis
    pub fn around(point: [f64; 3], half_width: [f64; 3]) -> Self {
        Self::new(
            [
                point[0] - half_width[0],
                point[1] - half_width[1],
                point[2] - half_width[2],
            ],
            [
                point[0] + half_width[0],
                point[1] + half_width[1],
                point[2] + half_width[2],
            ],
        )
    }

    /// Smallest box containing both points
    pub fn from_points(a: [f64; 3], b: [f64; 3]) -> Self {
        Self::new(
            [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        )
    }

    /// Grow the box by `amount` on both sides of each axis
    pub fn expanded(&self, amount: [f64; 3]) -> Self {
        Self::new(
            [
                self.lower_left[0] - amount[0],
                self.lower_left[1] - amount[1],
                self.lower_left[2] - amount[2],
            ],
            [
                self.upper_right[0] + amount[0],
                self.upper_right[1] + amount[1],
                self.upper_right[2] + amount[2],
            ],
        )
    }

    /// Inclusive containment test with `tolerance` on every face
    pub fn contains_within(&self, point: &[f64; 3], tolerance: f64) -> bool {
        (0..3).all(|i| {
            point[i] >= self.lower_left[i] - tolerance && point[i] <= self.upper_right[i] + tolerance
        })
    }

    /// Inclusive containment using [`BOX_TOLERANCE`]
    pub fn contains(&self, point: &[f64; 3]) -> bool {
        self.contains_within(point, BOX_TOLERANCE)
    }

    /// True if the two boxes overlap (faces touching counts)
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| {
            self.lower_left[i] <= other.upper_right[i] && other.lower_left[i] <= self.upper_right[i]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_center_and_width() {
        let bb = BoundingBox::new([-1.0, 0.0, 2.0], [1.0, 4.0, 3.0]);
        assert_eq!(bb.center, [0.0, 2.0, 2.5]);
        assert_eq!(bb.width, [2.0, 4.0, 1.0]);
    }

    #[test]
    fn test_around_and_from_points() {
        let bb = BoundingBox::around([1.0, 1.0, 1.0], [0.5, 1.0, 2.0]);
        assert_eq!(bb.lower_left, [0.5, 0.0, -1.0]);
        assert_eq!(bb.upper_right, [1.5, 2.0, 3.0]);

        let bb = BoundingBox::from_points([2.0, -1.0, 0.0], [-2.0, 1.0, 0.0]);
        assert_eq!(bb.lower_left, [-2.0, -1.0, 0.0]);
        assert_eq!(bb.upper_right, [2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_contains_is_inclusive_with_tolerance() {
        let bb = BoundingBox::new([0.0; 3], [1.0; 3]);
        assert!(bb.contains(&[1.0, 0.5, 0.5]));
        assert!(bb.contains(&[1.0 + 1e-13, 0.5, 0.5]));
        assert!(bb.contains(&[-1e-13, 0.5, 0.5]));
        assert!(!bb.contains(&[1.0 + 1e-6, 0.5, 0.5]));
        assert!(!bb.contains(&[0.5, -1e-6, 0.5]));
    }

    #[test]
    fn test_intersects() {
        let a = BoundingBox::new([0.0; 3], [1.0; 3]);
        let b = BoundingBox::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let c = BoundingBox::new([1.5, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
