//! # Navigation Control
//!
//! The navigation loop. Each cycle captures one frame and, if the frame scheduler selects it,
//! runs detection, target selection, steering and command debouncing on it.
//!
//! The loop moves through three phases:
//!
//! - INIT: [`NavCtrl::init`] opens the video source (failure is fatal) and the drive link
//!   (failure drops to simulation mode).
//! - RUNNING: [`NavCtrl::run`] repeats [`NavCtrl::cycle`] until a quit is requested or capture
//!   fails.
//! - SHUTDOWN: [`NavCtrl::shutdown`] sends a final STOP and releases the equipment. Dropping a
//!   `NavCtrl` which has not been shut down performs the shutdown.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;

use chrono::Utc;
use log::{error, info};

use crate::{
    cam_client::{self, CamOpenError, CaptureError, VideoSource},
    cmd_debounce,
    data_store::NavState,
    diag::CycleReport,
    drive_client::{self, DriveLink, LinkMode},
    frame_sched::{FrameAction, FrameScheduler},
    marker_det::MarkerDetector,
    params::{NavExecParams, NavParams},
    quit::QuitSignal,
    steer_ctrl, target_sel,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Navigation loop, owning the equipment and all session state.
pub struct NavCtrl {
    params: NavParams,

    sched: FrameScheduler,

    state: NavState,

    video: Box<dyn VideoSource>,

    link: Box<dyn DriveLink>,

    detector: Box<dyn MarkerDetector>,

    shut_down: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Could not open the video source: {0}")]
    CamOpenError(CamOpenError),
}

/// Reason the running loop ended.
#[derive(Debug)]
pub enum ShutdownCause {
    /// The operator asked to quit
    QuitRequested,

    /// The video source stopped producing frames
    CaptureFailed(CaptureError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavCtrl {
    /// Open the equipment described by the parameters.
    pub fn init(params: &NavExecParams) -> Result<Self, InitError> {
        let video = cam_client::open_source(&params.cam).map_err(InitError::CamOpenError)?;

        let link = drive_client::open_link(&params.link);

        let detector = params.det.kind.build();

        Ok(Self::from_eqpt(params.nav.clone(), video, link, detector))
    }

    /// Build the loop around already opened equipment.
    pub fn from_eqpt(
        params: NavParams,
        video: Box<dyn VideoSource>,
        link: Box<dyn DriveLink>,
        detector: Box<dyn MarkerDetector>,
    ) -> Self {
        let sched = FrameScheduler::new(params.skip_factor);

        info!("Navigation control initialised");
        info!("    Video source: {}", video.describe());
        info!("    Drive link: {:?}", link.mode());
        info!("    Detector: {}", detector.name());
        info!("    Processing width: {} px", params.processing_width);
        info!("    Processing every {} frame(s)", sched.skip_factor());

        Self {
            params,
            sched,
            state: NavState::new(Instant::now()),
            video,
            link,
            detector,
            shut_down: false,
        }
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn link_mode(&self) -> LinkMode {
        self.link.mode()
    }

    /// Run a single cycle.
    ///
    /// An error means the video source has failed and the loop must shut down.
    pub fn cycle(&mut self) -> Result<CycleReport, CaptureError> {
        let frame = self.video.read_frame()?;

        let frame_index = self.state.frame_index;
        self.state.frame_index += 1;
        let fps = self.state.fps.tick(Instant::now());

        let action = self.sched.action(frame_index);

        let mut report = CycleReport {
            frame_index,
            action,
            fps,
            frame_width: frame.width(),
            num_detections: 0,
            target: None,
            decision: None,
            dispatch: None,
        };

        if action == FrameAction::DisplayOnly {
            return Ok(report);
        }

        // ---- DETECTION ----

        let frame = frame.resized_to_width(self.params.processing_width);
        let detections = self.detector.detect(&frame.to_luma());

        // ---- STEERING ----

        let target = target_sel::select_target(&detections);
        let decision = steer_ctrl::calc_steer(target, frame.width());

        if let Some(t) = target {
            self.state.last_payload = Some(t.payload.clone());
        }

        // ---- COMMAND OUTPUT ----

        let dispatch = cmd_debounce::submit(
            &mut self.state.cmd_log,
            self.link.as_mut(),
            decision.cmd,
            Utc::now(),
        );

        report.frame_width = frame.width();
        report.num_detections = detections.len();
        report.target = target.cloned();
        report.decision = Some(decision);
        report.dispatch = Some(dispatch);

        Ok(report)
    }

    /// Cycle until a quit is requested or capture fails.
    ///
    /// `on_cycle` is called with the report of every completed cycle. The quit signal is checked
    /// after each cycle, so a cycle in progress always finishes.
    pub fn run<F>(&mut self, quit: &QuitSignal, mut on_cycle: F) -> ShutdownCause
    where
        F: FnMut(&CycleReport, &NavState),
    {
        info!("Entering navigation loop");

        loop {
            match self.cycle() {
                Ok(report) => on_cycle(&report, &self.state),
                Err(e) => {
                    error!("Failed to retrieve frame from the video source: {}", e);
                    return ShutdownCause::CaptureFailed(e);
                }
            }

            if quit.requested() {
                info!("Quit requested");
                return ShutdownCause::QuitRequested;
            }
        }
    }

    /// Stop the rover and release the equipment. Only the first call has any effect.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        info!("Shutting down, sending final stop");

        cmd_debounce::force_stop(&mut self.state.cmd_log, self.link.as_mut(), Utc::now());

        self.link.close();
        self.video.release();

        info!(
            "Navigation ended after {} frames and {} drive commands",
            self.state.frame_index,
            self.state.cmd_log.num_sent()
        );
    }
}

impl Drop for NavCtrl {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_eqpt::{RecordingLink, ScriptedDetector, ScriptedSource, SharedRecord};
    use comms_if::eqpt::{
        drive::DriveCmd::{self, *},
        marker::{BoundingBox, Detection},
    };

    fn marker_at(x: i32) -> Vec<Detection> {
        vec![Detection::new(BoundingBox::new(x, 100, 40, 40), "ROBOT_TARGET")]
    }

    fn build(
        num_frames: usize,
        frame_size: (u32, u32),
        skip_factor: u32,
        script: Vec<Vec<Detection>>,
        mode: LinkMode,
    ) -> (NavCtrl, SharedRecord) {
        let record = SharedRecord::default();

        let ctrl = NavCtrl::from_eqpt(
            NavParams {
                processing_width: 640,
                skip_factor,
            },
            Box::new(ScriptedSource::new(
                record.clone(),
                num_frames,
                frame_size.0,
                frame_size.1,
            )),
            Box::new(RecordingLink::with_record(record.clone(), mode)),
            Box::new(ScriptedDetector::new(record.clone(), script)),
        );

        (ctrl, record)
    }

    #[test]
    fn test_run_until_capture_fails() {
        let (mut ctrl, record) = build(
            5,
            (640, 480),
            2,
            vec![marker_at(280), marker_at(500), vec![]],
            LinkMode::Serial,
        );

        let mut reports = Vec::new();
        let cause = ctrl.run(&QuitSignal::new(), |r, _| reports.push(r.clone()));

        assert!(matches!(
            cause,
            ShutdownCause::CaptureFailed(CaptureError::EndOfStream)
        ));

        // Every frame is reported, only the even ones are processed
        let actions: Vec<FrameAction> = reports.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                FrameAction::Process,
                FrameAction::DisplayOnly,
                FrameAction::Process,
                FrameAction::DisplayOnly,
                FrameAction::Process
            ]
        );
        assert_eq!(record.borrow().frames_detected.len(), 3);
        assert!(reports[1].decision.is_none());
        assert_eq!(reports[0].decision.map(|d| d.offset_px), Some(Some(-20)));

        assert_eq!(record.borrow().sent, vec![Forward, Right, Stop]);
        assert_eq!(ctrl.state().last_payload.as_deref(), Some("ROBOT_TARGET"));

        ctrl.shutdown();
        let state = ctrl.state();

        let record = record.borrow();
        assert_eq!(record.sent, vec![Forward, Right, Stop, Stop]);
        assert!(record.closed);
        assert!(record.released);
        assert_eq!(state.cmd_log.history_cmds(), vec![Right, Stop, Stop]);
        assert_eq!(state.frame_index, 5);
    }

    #[test]
    fn test_quit_finishes_current_cycle() {
        let (mut ctrl, record) = build(10, (640, 480), 1, vec![marker_at(20)], LinkMode::Serial);

        let quit = QuitSignal::new();
        quit.request();

        let mut num_reports = 0;
        let cause = ctrl.run(&quit, |_, _| num_reports += 1);

        assert!(matches!(cause, ShutdownCause::QuitRequested));
        assert_eq!(num_reports, 1);
        assert_eq!(record.borrow().frames_read, 1);
        assert_eq!(record.borrow().sent, vec![Left]);
    }

    #[test]
    fn test_repeated_sightings_sent_once() {
        let script = (0..6).map(|_| marker_at(280)).collect();
        let (mut ctrl, record) = build(6, (640, 480), 1, script, LinkMode::Serial);

        let mut dispatches = Vec::new();
        ctrl.run(&QuitSignal::new(), |r, _| dispatches.push(r.dispatch));

        assert_eq!(record.borrow().sent, vec![Forward]);
        assert_eq!(
            dispatches
                .iter()
                .filter(|d| **d == Some(cmd_debounce::Dispatch::Suppressed))
                .count(),
            5
        );
    }

    #[test]
    fn test_frames_scaled_before_detection() {
        // Detections are in processed frame coordinates, so x = 500 is right of centre at 640 px
        let (mut ctrl, record) = build(1, (1280, 720), 1, vec![marker_at(500)], LinkMode::Serial);

        let report = ctrl.cycle().unwrap();

        assert_eq!(record.borrow().frames_detected, vec![(640, 360)]);
        assert_eq!(report.frame_width, 640);
        assert_eq!(report.decision.map(|d| d.cmd), Some(Right));
    }

    #[test]
    fn test_simulation_mode() {
        let (mut ctrl, record) = build(
            3,
            (640, 480),
            1,
            vec![marker_at(280), marker_at(20), vec![]],
            LinkMode::Simulated,
        );
        assert_eq!(ctrl.link_mode(), LinkMode::Simulated);

        ctrl.run(&QuitSignal::new(), |_, _| ());
        ctrl.shutdown();
        let state = ctrl.state();

        // Commands are still decided and recorded, but never reach the port
        assert!(record.borrow().sent.is_empty());
        let expected: Vec<DriveCmd> = vec![Left, Stop, Stop];
        assert_eq!(state.cmd_log.history_cmds(), expected);
        assert_eq!(state.cmd_log.num_sent(), 4);
    }

    #[test]
    fn test_shutdown_only_once() {
        let (mut ctrl, record) = build(2, (640, 480), 1, vec![marker_at(280)], LinkMode::Serial);

        ctrl.cycle().unwrap();
        ctrl.shutdown();
        ctrl.shutdown();
        drop(ctrl);

        assert_eq!(record.borrow().sent, vec![Forward, Stop]);
    }

    #[test]
    fn test_drop_stops_rover() {
        // Leaving early without an explicit shutdown still stops the rover
        let (mut ctrl, record) = build(2, (640, 480), 1, vec![marker_at(500)], LinkMode::Serial);

        ctrl.cycle().unwrap();
        drop(ctrl);

        let record = record.borrow();
        assert_eq!(record.sent, vec![Right, Stop]);
        assert!(record.closed);
        assert!(record.released);
    }
}
