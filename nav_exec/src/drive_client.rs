//! # Drive Client
//!
//! This module provides the link to the drive microcontroller. Commands are written as single
//! bytes over a serial port. When no port can be opened the client falls back to a simulated
//! link which accepts and discards every command, so that navigation can still be exercised.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{io::Write, thread, time::Duration};

use comms_if::eqpt::drive::DriveCmd;
use log::{debug, info, warn};
use serialport::SerialPort;

use crate::params::LinkParams;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A one way command channel to the drive controller.
pub trait DriveLink {
    /// Transmit a single command.
    fn send(&mut self, cmd: DriveCmd) -> Result<(), LinkError>;

    /// Close the link. Further sends will fail.
    fn close(&mut self);

    /// Whether commands actually reach a controller.
    fn mode(&self) -> LinkMode;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Link over a serial port.
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,

    port_name: String,

    post_write_delay: Duration,
}

/// Link which discards all commands.
#[derive(Default)]
pub struct SimLink {
    num_discarded: u64,

    closed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LinkMode {
    /// Commands are written to the drive controller
    Serial,

    /// Commands are computed but never transmitted
    Simulated,
}

#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    #[error("Could not open serial port {0}: {1}")]
    OpenError(String, serialport::Error),

    #[error("Could not write to the serial port: {0}")]
    WriteError(std::io::Error),

    #[error("The link has been closed")]
    Closed,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Open the serial link, falling back to a simulated link if the port is unavailable.
pub fn open_link(params: &LinkParams) -> Box<dyn DriveLink> {
    match SerialLink::open(params) {
        Ok(link) => Box::new(link),
        Err(e) => {
            warn!("{}", e);
            warn!("Running in simulation mode, drive commands will not be transmitted");
            Box::new(SimLink::default())
        }
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SerialLink {
    /// Open the port and wait for the controller to come up.
    pub fn open(params: &LinkParams) -> Result<Self, LinkError> {
        info!(
            "Connecting to drive controller on {} at {} baud",
            params.port, params.baud_rate
        );

        let port = serialport::new(params.port.as_str(), params.baud_rate)
            .timeout(Duration::from_millis(params.write_timeout_ms))
            .open()
            .map_err(|e| LinkError::OpenError(params.port.clone(), e))?;

        // Opening the port resets most boards, give it time to boot before the first command
        thread::sleep(Duration::from_millis(params.connect_settle_ms));

        info!("Connected to drive controller on {}", params.port);

        Ok(Self {
            port: Some(port),
            port_name: params.port.clone(),
            post_write_delay: Duration::from_millis(params.post_write_delay_ms),
        })
    }
}

impl DriveLink for SerialLink {
    fn send(&mut self, cmd: DriveCmd) -> Result<(), LinkError> {
        let port = self.port.as_mut().ok_or(LinkError::Closed)?;

        port.write_all(&[cmd.to_wire()])
            .and_then(|_| port.flush())
            .map_err(LinkError::WriteError)?;

        // Let the controller act on the byte before anything else is sent
        thread::sleep(self.post_write_delay);

        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Serial port {} closed", self.port_name);
        }
    }

    fn mode(&self) -> LinkMode {
        LinkMode::Serial
    }
}

impl SimLink {
    /// Number of commands accepted and discarded so far.
    pub fn num_discarded(&self) -> u64 {
        self.num_discarded
    }
}

impl DriveLink for SimLink {
    fn send(&mut self, cmd: DriveCmd) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }

        debug!("[sim] discarding drive command {}", cmd);
        self.num_discarded += 1;

        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            info!("Simulated link closed after discarding {} commands", self.num_discarded);
            self.closed = true;
        }
    }

    fn mode(&self) -> LinkMode {
        LinkMode::Simulated
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
