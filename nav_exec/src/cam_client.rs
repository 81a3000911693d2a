//! # Camera Client
//!
//! Provides frames to the navigation loop from one of several kinds of video source, chosen by a
//! connection string:
//!
//! - `0`, `1`, ... - the V4L2 device `/dev/video<N>`
//! - `/dev/videoN` - a V4L2 device by path
//! - `http://...`, `rtsp://...` - a network stream, decoded by a gstreamer pipeline
//! - a directory - replay of the images it contains, in file name order
//!
//! Both V4L2 devices and replayed directories skip up to `MAX_CONSEC_CORRUPT_FRAMES` undecodable
//! frames in a row before reporting a capture failure.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use chrono::Utc;
use comms_if::eqpt::cam::{CamFrame, CamImage, ImageFormat};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use image::{DynamicImage, RgbImage};
use log::{debug, info, warn};
use rscam::{Camera, Config};

use crate::params::CamParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of consecutive undecodable frames a source may produce before capture fails.
const MAX_CONSEC_CORRUPT_FRAMES: u32 = 5;

/// File extensions replayed from an image directory.
const REPLAY_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of video frames.
pub trait VideoSource {
    /// Read the next frame, blocking until one is available.
    ///
    /// An error means the source can no longer produce frames.
    fn read_frame(&mut self) -> Result<CamImage, CaptureError>;

    /// Release the underlying device. Calling this more than once has no effect.
    fn release(&mut self);

    /// Human readable description of the source.
    fn describe(&self) -> String;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A V4L2 camera delivering MJPG frames.
pub struct V4lCamera {
    device: String,
    camera: Option<Camera>,
}

/// A network stream decoded into raw RGB frames.
pub struct StreamSource {
    url: String,
    pipeline: Option<gstreamer::Element>,
    sink: AppSink,
    read_timeout_ms: u64,
}

/// Replays the images in a directory.
pub struct ImageDirSource {
    dir: PathBuf,
    files: VecDeque<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Parsed video source connection string.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SourceSpec {
    Device(String),
    Stream(String),
    ImageDir(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum CamOpenError {
    #[error("Video source \"{0}\" is not a device index, device path, URL or directory")]
    UnrecognisedSource(String),

    #[error("Could not open video device {0}: {1}")]
    DeviceOpenError(String, std::io::Error),

    #[error("Could not start capture on video device {0}: {1}")]
    DeviceStartError(String, rscam::Error),

    #[error("Failed to initialise gstreamer: {0}")]
    GstInitError(gstreamer::glib::Error),

    #[error("Could not parse the pipeline: {0}")]
    PipelineParseError(gstreamer::glib::Error),

    #[error("Couldn't change the pipeline state: {0}")]
    PipelineStateChangeError(gstreamer::StateChangeError),

    #[error("The pipeline has no frame sink")]
    NoSink,

    #[error("Could not read image directory {0:?}: {1}")]
    ReadDirError(PathBuf, std::io::Error),

    #[error("Image directory {0:?} contains no images")]
    EmptyDir(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Could not capture from the video device: {0}")]
    DeviceError(std::io::Error),

    #[error("Could not decode frame: {0}")]
    DecodeError(image::ImageError),

    #[error("No frame received within {0} ms")]
    Timeout(u64),

    #[error("Malformed frame from the stream: {0}")]
    MalformedFrame(String),

    #[error("The video source has no more frames")]
    EndOfStream,

    #[error("The video source has been released")]
    Released,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Open the video source described by the parameters.
pub fn open_source(params: &CamParams) -> Result<Box<dyn VideoSource>, CamOpenError> {
    let source: Box<dyn VideoSource> = match SourceSpec::parse(&params.source)? {
        SourceSpec::Device(device) => Box::new(V4lCamera::open(&device, params)?),
        SourceSpec::Stream(url) => Box::new(StreamSource::open(&url, params)?),
        SourceSpec::ImageDir(dir) => Box::new(ImageDirSource::open(&dir)?),
    };

    info!("Video source opened: {}", source.describe());

    Ok(source)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SourceSpec {
    /// Parse a connection string.
    pub fn parse(source: &str) -> Result<Self, CamOpenError> {
        let source = source.trim();

        if !source.is_empty() && source.chars().all(|c| c.is_ascii_digit()) {
            return Ok(SourceSpec::Device(format!("/dev/video{}", source)));
        }

        if source.starts_with("/dev/") {
            return Ok(SourceSpec::Device(source.to_string()));
        }

        if source.contains("://") {
            return Ok(SourceSpec::Stream(source.to_string()));
        }

        if !source.is_empty() && Path::new(source).is_dir() {
            return Ok(SourceSpec::ImageDir(PathBuf::from(source)));
        }

        Err(CamOpenError::UnrecognisedSource(source.to_string()))
    }
}

impl V4lCamera {
    pub fn open(device: &str, params: &CamParams) -> Result<Self, CamOpenError> {
        let mut camera = Camera::new(device)
            .map_err(|e| CamOpenError::DeviceOpenError(device.to_string(), e))?;

        camera
            .start(&Config {
                interval: (1, params.capture_fps.max(1)),
                resolution: (params.capture_width, params.capture_height),
                format: b"MJPG",
                ..Default::default()
            })
            .map_err(|e| CamOpenError::DeviceStartError(device.to_string(), e))?;

        Ok(Self {
            device: device.to_string(),
            camera: Some(camera),
        })
    }
}

impl VideoSource for V4lCamera {
    fn read_frame(&mut self) -> Result<CamImage, CaptureError> {
        let camera = self.camera.as_mut().ok_or(CaptureError::Released)?;

        let mut num_corrupt = 0;
        loop {
            let raw_frame = camera.capture().map_err(CaptureError::DeviceError)?;

            let cam_frame = CamFrame {
                timestamp: Utc::now(),
                format: ImageFormat::Jpeg,
                data: raw_frame.to_vec(),
            };

            // MJPG devices occasionally emit a truncated frame, usually just after starting
            match cam_frame.to_cam_image() {
                Ok(image) => return Ok(image),
                Err(e) if num_corrupt < MAX_CONSEC_CORRUPT_FRAMES => {
                    warn!("Dropping corrupt frame from {}: {}", self.device, e);
                    num_corrupt += 1;
                }
                Err(e) => return Err(CaptureError::DecodeError(e)),
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop() {
                warn!("Could not stop capture on {}: {}", self.device, e);
            }
            info!("Video device {} released", self.device);
        }
    }

    fn describe(&self) -> String {
        format!("V4L2 device {}", self.device)
    }
}

impl StreamSource {
    pub fn open(url: &str, params: &CamParams) -> Result<Self, CamOpenError> {
        gstreamer::init().map_err(CamOpenError::GstInitError)?;

        // Build the pipeline string
        let pipeline_spec = [
            format!("uridecodebin uri=\"{}\"", url),
            "videoconvert".into(),
            "video/x-raw,format=RGB".into(),
            "appsink name=sink max-buffers=1 drop=true sync=false".into(),
        ]
        .join(" ! ");

        info!("Gstreamer pipeline: {}", pipeline_spec.as_str());

        let pipeline = gstreamer::parse_launch(pipeline_spec.as_str())
            .map_err(CamOpenError::PipelineParseError)?;

        let sink = pipeline
            .clone()
            .dynamic_cast::<gstreamer::Bin>()
            .ok()
            .and_then(|bin| bin.get_by_name("sink"))
            .and_then(|sink| sink.dynamic_cast::<AppSink>().ok())
            .ok_or(CamOpenError::NoSink)?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(CamOpenError::PipelineStateChangeError)?;

        Ok(Self {
            url: url.to_string(),
            pipeline: Some(pipeline),
            sink,
            read_timeout_ms: params.read_timeout_ms,
        })
    }
}

impl VideoSource for StreamSource {
    fn read_frame(&mut self) -> Result<CamImage, CaptureError> {
        if self.pipeline.is_none() {
            return Err(CaptureError::Released);
        }

        let sample = match self
            .sink
            .try_pull_sample(gstreamer::ClockTime::from_mseconds(self.read_timeout_ms))
        {
            Some(s) => s,
            None if self.sink.is_eos() => return Err(CaptureError::EndOfStream),
            None => return Err(CaptureError::Timeout(self.read_timeout_ms)),
        };

        let (width, height) = sample
            .get_caps()
            .and_then(|caps| caps.get_structure(0))
            .and_then(|s| {
                let w = s.get_some::<i32>("width").ok()?;
                let h = s.get_some::<i32>("height").ok()?;
                Some((w as u32, h as u32))
            })
            .ok_or_else(|| CaptureError::MalformedFrame("sample has no frame size".into()))?;

        let buffer = sample
            .get_buffer()
            .ok_or_else(|| CaptureError::MalformedFrame("sample has no buffer".into()))?;
        let map = buffer
            .map_readable()
            .map_err(|e| CaptureError::MalformedFrame(e.to_string()))?;

        let image = rgb_from_strided(map.as_slice(), width, height).ok_or_else(|| {
            CaptureError::MalformedFrame(format!(
                "{} byte buffer is too small for a {}x{} frame",
                map.as_slice().len(),
                width,
                height
            ))
        })?;

        Ok(CamImage::new(DynamicImage::ImageRgb8(image)))
    }

    fn release(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Couldn't stop the stream pipeline: {}", e);
            }
            info!("Stream {} released", self.url);
        }
    }

    fn describe(&self) -> String {
        format!("stream {}", self.url)
    }
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self, CamOpenError> {
        let entries =
            std::fs::read_dir(dir).map_err(|e| CamOpenError::ReadDirError(dir.to_path_buf(), e))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| REPLAY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();

        if files.is_empty() {
            return Err(CamOpenError::EmptyDir(dir.to_path_buf()));
        }

        files.sort();
        debug!("Replaying {} images from {:?}", files.len(), dir);

        Ok(Self {
            dir: dir.to_path_buf(),
            files: files.into(),
        })
    }
}

impl VideoSource for ImageDirSource {
    fn read_frame(&mut self) -> Result<CamImage, CaptureError> {
        let mut num_corrupt = 0;
        loop {
            let path = self.files.pop_front().ok_or(CaptureError::EndOfStream)?;

            match image::open(&path) {
                Ok(image) => return Ok(CamImage::new(image)),
                Err(e) if num_corrupt < MAX_CONSEC_CORRUPT_FRAMES => {
                    warn!("Skipping unreadable image {:?}: {}", path, e);
                    num_corrupt += 1;
                }
                Err(e) => return Err(CaptureError::DecodeError(e)),
            }
        }
    }

    fn release(&mut self) {
        self.files.clear();
    }

    fn describe(&self) -> String {
        format!("image directory {:?}", self.dir)
    }
}

impl Drop for V4lCamera {
    fn drop(&mut self) {
        self.release();
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        self.release();
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Copy a raw RGB frame whose rows are padded to a multiple of 4 bytes into an image.
fn rgb_from_strided(data: &[u8], width: u32, height: u32) -> Option<RgbImage> {
    let row_len = width as usize * 3;
    let stride = (row_len + 3) & !3;

    if height == 0 || data.len() < stride * (height as usize - 1) + row_len {
        return None;
    }

    let mut packed = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        packed.extend_from_slice(&data[row * stride..row * stride + row_len]);
    }

    RgbImage::from_raw(width, height, packed)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            SourceSpec::parse("0").unwrap(),
            SourceSpec::Device("/dev/video0".into())
        );
        assert_eq!(
            SourceSpec::parse(" 12 ").unwrap(),
            SourceSpec::Device("/dev/video12".into())
        );
        assert_eq!(
            SourceSpec::parse("/dev/video2").unwrap(),
            SourceSpec::Device("/dev/video2".into())
        );
        assert_eq!(
            SourceSpec::parse("http://192.168.29.56:8080/video").unwrap(),
            SourceSpec::Stream("http://192.168.29.56:8080/video".into())
        );

        let dir = std::env::temp_dir();
        assert_eq!(
            SourceSpec::parse(dir.to_str().unwrap()).unwrap(),
            SourceSpec::ImageDir(dir.clone())
        );

        assert!(matches!(
            SourceSpec::parse("not a source"),
            Err(CamOpenError::UnrecognisedSource(_))
        ));
        assert!(SourceSpec::parse("").is_err());
    }

    #[test]
    fn test_rgb_from_strided() {
        // 2x2 frame, rows of 6 bytes padded to 8
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];

        let img = rgb_from_strided(&data, 2, 2).unwrap();
        assert_eq!(img.into_raw(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        // Final row padding may be missing
        assert!(rgb_from_strided(&data[..14], 2, 2).is_some());
        assert!(rgb_from_strided(&data[..13], 2, 2).is_none());
    }

    #[test]
    fn test_image_dir_replay() {
        let dir = std::env::temp_dir().join(format!("nav_exec_replay_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        RgbImage::new(8, 6).save(dir.join("b.png")).unwrap();
        RgbImage::new(4, 3).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not an image").unwrap();

        let mut source = ImageDirSource::open(&dir).unwrap();
        assert_eq!(source.read_frame().unwrap().width(), 4);
        assert_eq!(source.read_frame().unwrap().width(), 8);
        assert!(matches!(source.read_frame(), Err(CaptureError::EndOfStream)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_image_dir_skips_corrupt_files() {
        let dir = std::env::temp_dir().join(format!("nav_exec_corrupt_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        RgbImage::new(4, 3).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("b.png"), "truncated").unwrap();
        RgbImage::new(8, 6).save(dir.join("c.png")).unwrap();
        for i in 0..=MAX_CONSEC_CORRUPT_FRAMES {
            std::fs::write(dir.join(format!("d{}.png", i)), "truncated").unwrap();
        }

        let mut source = ImageDirSource::open(&dir).unwrap();
        assert_eq!(source.read_frame().unwrap().width(), 4);
        assert_eq!(source.read_frame().unwrap().width(), 8);

        // One more corrupt file than is tolerated
        assert!(matches!(
            source.read_frame(),
            Err(CaptureError::DecodeError(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
