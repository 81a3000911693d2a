//! # Marker Interface
//!
//! Describes a single marker sighting within one camera frame. All coordinates are in pixels of
//! the frame the detector was run on, with the origin in the top left corner.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point in frame pixel coordinates.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

/// Axis-aligned bounding box of a marker.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Default)]
pub struct BoundingBox {
    /// Left edge of the box
    pub x: i32,

    /// Top edge of the box
    pub y: i32,

    /// Width of the box in pixels
    pub width: u32,

    /// Height of the box in pixels
    pub height: u32,
}

/// One marker located in a single frame.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct Detection {
    /// Axis aligned bounds of the marker
    pub bbox: BoundingBox,

    /// Text decoded from the marker
    pub payload: String,

    /// Corner polygon of the marker, only used for display
    pub corners: Option<[PixelPoint; 4]>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build the axis-aligned envelope of a set of points.
    ///
    /// Returns `None` if `points` is empty.
    pub fn from_corners(points: &[PixelPoint]) -> Option<Self> {
        let first = points.first()?;

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points.iter().skip(1) {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        Some(Self {
            x: min_x,
            y: min_y,
            width: (max_x as i64 - min_x as i64) as u32,
            height: (max_y as i64 - min_y as i64) as u32,
        })
    }

    /// Area of the box in square pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Horizontal centre of the box, rounded down to a whole pixel.
    pub fn centre_x(&self) -> i64 {
        self.x as i64 + (self.width / 2) as i64
    }

    /// Vertical centre of the box, rounded down to a whole pixel.
    pub fn centre_y(&self) -> i64 {
        self.y as i64 + (self.height / 2) as i64
    }
}

impl Detection {
    /// Create a detection with no corner polygon.
    pub fn new(bbox: BoundingBox, payload: &str) -> Self {
        Self {
            bbox,
            payload: payload.to_string(),
            corners: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_corners() {
        // Slightly rotated marker
        let corners = [
            PixelPoint::new(102, 40),
            PixelPoint::new(160, 44),
            PixelPoint::new(157, 101),
            PixelPoint::new(99, 97),
        ];

        assert_eq!(
            BoundingBox::from_corners(&corners),
            Some(BoundingBox::new(99, 40, 61, 61))
        );
        assert_eq!(BoundingBox::from_corners(&[]), None);
    }

    #[test]
    fn test_from_corners_extreme_coords() {
        let bbox = BoundingBox::from_corners(&[
            PixelPoint::new(i32::MIN, -5),
            PixelPoint::new(i32::MAX, 5),
        ])
        .unwrap();

        assert_eq!(bbox.x, i32::MIN);
        assert_eq!(bbox.width, u32::MAX);
        assert_eq!(bbox.height, 10);
    }

    #[test]
    fn test_centre_and_area() {
        let bbox = BoundingBox::new(280, 100, 40, 40);
        assert_eq!(bbox.centre_x(), 300);
        assert_eq!(bbox.centre_y(), 120);
        assert_eq!(bbox.area(), 1600);

        // Odd widths round down
        assert_eq!(BoundingBox::new(0, 0, 5, 3).centre_x(), 2);
    }

    #[test]
    fn test_serialize_detection() {
        let det = Detection::new(BoundingBox::new(1, 2, 3, 4), "ROBOT_TARGET");
        let json = serde_json::to_string(&det).unwrap();

        assert!(json.contains("\"payload\":\"ROBOT_TARGET\""));
        assert_eq!(serde_json::from_str::<Detection>(&json).unwrap(), det);
    }
}
