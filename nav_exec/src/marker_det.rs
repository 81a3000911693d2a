//! # Marker Detection
//!
//! Wraps a QR decoding backend behind the [`MarkerDetector`] trait. Detection is best effort: a
//! frame in which nothing can be decoded simply yields no detections.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::marker::{BoundingBox, Detection, PixelPoint};
use image::GrayImage;
use log::trace;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A marker decoding capability.
pub trait MarkerDetector {
    /// Find all decodable markers in a grayscale frame. Order is not significant.
    fn detect(&mut self, frame: &GrayImage) -> Vec<Detection>;

    /// Short name of the backend for logging.
    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Available detector backends.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Pure rust QR decoder
    Rqrr,

    /// Never reports a marker, the rover will hold STOP
    Disabled,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// QR code detector backed by `rqrr`.
#[derive(Default)]
pub struct RqrrDetector;

/// Detector which never finds anything.
#[derive(Default)]
pub struct NullDetector;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DetectorKind {
    fn default() -> Self {
        DetectorKind::Rqrr
    }
}

impl DetectorKind {
    /// Build the detector for this backend.
    pub fn build(self) -> Box<dyn MarkerDetector> {
        match self {
            DetectorKind::Rqrr => Box::new(RqrrDetector),
            DetectorKind::Disabled => Box::new(NullDetector),
        }
    }
}

impl MarkerDetector for RqrrDetector {
    fn detect(&mut self, frame: &GrayImage) -> Vec<Detection> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.get_pixel(x as u32, y as u32)[0],
        );

        let grids = prepared.detect_grids();
        let mut detections = Vec::with_capacity(grids.len());

        for grid in grids {
            // Grids which locate but don't decode are not usable sightings
            let payload = match grid.decode() {
                Ok((_, content)) => content,
                Err(e) => {
                    trace!("Located a grid which could not be decoded: {:?}", e);
                    continue;
                }
            };

            let corners = [
                PixelPoint::new(grid.bounds[0].x, grid.bounds[0].y),
                PixelPoint::new(grid.bounds[1].x, grid.bounds[1].y),
                PixelPoint::new(grid.bounds[2].x, grid.bounds[2].y),
                PixelPoint::new(grid.bounds[3].x, grid.bounds[3].y),
            ];

            if let Some(bbox) = BoundingBox::from_corners(&corners) {
                detections.push(Detection {
                    bbox,
                    payload,
                    corners: Some(corners),
                });
            }
        }

        detections
    }

    fn name(&self) -> &'static str {
        "rqrr"
    }
}

impl MarkerDetector for NullDetector {
    fn detect(&mut self, _frame: &GrayImage) -> Vec<Detection> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        marker_gen::{render_marker, MarkerSpec, DEFAULT_PAYLOAD},
        steer_ctrl::calc_steer,
        target_sel::select_target,
    };
    use comms_if::eqpt::drive::DriveCmd;

    #[test]
    fn test_blank_frame_has_no_detections() {
        let frame = GrayImage::from_pixel(64, 48, image::Luma([255]));

        assert!(RqrrDetector.detect(&frame).is_empty());
        assert!(DetectorKind::Disabled.build().detect(&frame).is_empty());
    }

    /// Paste a rendered marker onto a white 640x480 frame with its top left corner at `(x, y)`.
    fn frame_with_marker(x: u32, y: u32) -> (GrayImage, u32) {
        let marker = render_marker(&MarkerSpec {
            min_version: 1,
            module_px: 4,
            label: false,
            ..Default::default()
        })
        .unwrap();

        let mut frame = GrayImage::from_pixel(640, 480, image::Luma([255]));
        image::imageops::replace(&mut frame, &marker, x, y);

        (frame, marker.width())
    }

    #[test]
    fn test_decode_rendered_marker() {
        let (frame, marker_px) = frame_with_marker(480, 180);

        let detections = RqrrDetector.detect(&frame);
        assert_eq!(detections.len(), 1);

        let det = &detections[0];
        assert_eq!(det.payload, DEFAULT_PAYLOAD);
        assert!(det.corners.is_some());

        // The box lies within the pasted marker and covers most of the code inside its border
        let right = det.bbox.x as u32 + det.bbox.width;
        let bottom = det.bbox.y as u32 + det.bbox.height;
        assert!(det.bbox.x >= 480 && right <= 480 + marker_px);
        assert!(det.bbox.y >= 180 && bottom <= 180 + marker_px);
        assert!(det.bbox.width >= marker_px / 2);

        assert_eq!(
            calc_steer(select_target(&detections), 640).cmd,
            DriveCmd::Right
        );
    }

    #[test]
    fn test_decoded_marker_steering() {
        let (_, marker_px) = frame_with_marker(0, 0);

        let cases = [
            (10, DriveCmd::Left),
            (320 - marker_px / 2, DriveCmd::Forward),
            (640 - marker_px - 10, DriveCmd::Right),
        ];

        for (x, expected) in cases.iter() {
            let (frame, _) = frame_with_marker(*x, 100);
            let detections = RqrrDetector.detect(&frame);

            assert_eq!(
                calc_steer(select_target(&detections), 640).cmd,
                *expected,
                "marker at x = {}",
                x
            );
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DetectorKind::default().build().name(), "rqrr");
        assert_eq!(DetectorKind::Disabled.build().name(), "disabled");
    }
}
