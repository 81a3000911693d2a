//! # Target Selection
//!
//! Picks the marker to steer towards when a frame contains more than one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::marker::Detection;

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Select the detection with the largest bounding box area.
///
/// Ties go to the detection which appears first in `detections`. Returns `None` if there are no
/// detections.
pub fn select_target(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().fold(None, |best, det| match best {
        Some(b) if b.bbox.area() >= det.bbox.area() => Some(b),
        _ => Some(det),
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::marker::BoundingBox;

    fn det(x: i32, width: u32, height: u32, payload: &str) -> Detection {
        Detection::new(BoundingBox::new(x, 0, width, height), payload)
    }

    #[test]
    fn test_no_detections() {
        assert_eq!(select_target(&[]), None);
    }

    #[test]
    fn test_largest_area_wins() {
        let dets = vec![det(0, 2, 5, "a"), det(10, 5, 10, "b"), det(20, 10, 4, "c")];

        assert_eq!(select_target(&dets).map(|d| d.payload.as_str()), Some("b"));
    }

    #[test]
    fn test_ties_go_to_first() {
        // Areas 10, 50, 50
        let dets = vec![det(0, 2, 5, "small"), det(10, 5, 10, "first"), det(20, 10, 5, "second")];

        let target = select_target(&dets).unwrap();
        assert_eq!(target.payload, "first");
        assert!(std::ptr::eq(target, &dets[1]));
    }

    #[test]
    fn test_single_detection() {
        let dets = vec![det(5, 0, 0, "degenerate")];

        assert_eq!(select_target(&dets), Some(&dets[0]));
    }
}
