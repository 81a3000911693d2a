//! In-memory equipment used by the unit tests.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use comms_if::eqpt::{cam::CamImage, drive::DriveCmd, marker::Detection};
use image::{DynamicImage, GrayImage, RgbImage};

use crate::{
    cam_client::{CaptureError, VideoSource},
    drive_client::{DriveLink, LinkError, LinkMode},
    marker_det::MarkerDetector,
};

/// Shared view of what happened to a piece of test equipment.
#[derive(Default, Debug)]
pub struct Record {
    pub sent: Vec<DriveCmd>,
    pub closed: bool,
    pub released: bool,
    pub frames_read: usize,
    pub frames_detected: Vec<(u32, u32)>,
}

pub type SharedRecord = Rc<RefCell<Record>>;

/// Link which records every command it is given.
pub struct RecordingLink {
    record: SharedRecord,
    mode: LinkMode,
}

/// Video source producing a fixed number of blank frames before failing.
pub struct ScriptedSource {
    record: SharedRecord,
    remaining: usize,
    width: u32,
    height: u32,
}

/// Detector returning a scripted detection set for each call.
pub struct ScriptedDetector {
    record: SharedRecord,
    script: VecDeque<Vec<Detection>>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::with_record(SharedRecord::default(), LinkMode::Serial)
    }

    pub fn with_record(record: SharedRecord, mode: LinkMode) -> Self {
        Self { record, mode }
    }

    pub fn sent(&self) -> Vec<DriveCmd> {
        self.record.borrow().sent.clone()
    }
}

impl DriveLink for RecordingLink {
    fn send(&mut self, cmd: DriveCmd) -> Result<(), LinkError> {
        let mut record = self.record.borrow_mut();
        if record.closed {
            return Err(LinkError::Closed);
        }
        if self.mode == LinkMode::Serial {
            record.sent.push(cmd);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.record.borrow_mut().closed = true;
    }

    fn mode(&self) -> LinkMode {
        self.mode
    }
}

impl ScriptedSource {
    pub fn new(record: SharedRecord, num_frames: usize, width: u32, height: u32) -> Self {
        Self {
            record,
            remaining: num_frames,
            width,
            height,
        }
    }
}

impl VideoSource for ScriptedSource {
    fn read_frame(&mut self) -> Result<CamImage, CaptureError> {
        if self.remaining == 0 {
            return Err(CaptureError::EndOfStream);
        }
        self.remaining -= 1;
        self.record.borrow_mut().frames_read += 1;

        Ok(CamImage::new(DynamicImage::ImageRgb8(RgbImage::new(
            self.width,
            self.height,
        ))))
    }

    fn release(&mut self) {
        self.record.borrow_mut().released = true;
    }

    fn describe(&self) -> String {
        String::from("scripted")
    }
}

impl ScriptedDetector {
    pub fn new(record: SharedRecord, script: Vec<Vec<Detection>>) -> Self {
        Self {
            record,
            script: script.into(),
        }
    }
}

impl MarkerDetector for ScriptedDetector {
    fn detect(&mut self, frame: &GrayImage) -> Vec<Detection> {
        self.record
            .borrow_mut()
            .frames_detected
            .push(frame.dimensions());
        self.script.pop_front().unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
