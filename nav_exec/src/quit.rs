//! # Quit Signal
//!
//! The operator ends a session either with an interrupt (Ctrl-C) or by entering `q` on stdin.
//! Both only raise a flag, which the navigation loop checks once per cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::BufRead,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use log::{info, warn};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared quit request flag.
#[derive(Clone, Default)]
pub struct QuitSignal {
    flag: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum QuitError {
    #[error("Could not install the interrupt handler: {0}")]
    HandlerError(ctrlc::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag on interrupt or when `q` is entered on stdin.
    pub fn install(&self) -> Result<(), QuitError> {
        let flag = self.flag.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .map_err(QuitError::HandlerError)?;

        let flag = self.flag.clone();
        thread::spawn(move || watch_stdin(flag));

        info!("Press Ctrl-C or enter 'q' to quit");

        Ok(())
    }

    /// Request the loop to stop.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once a quit has been requested.
    pub fn requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn watch_stdin(flag: Arc<AtomicBool>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(l) if l.trim().eq_ignore_ascii_case("q") => {
                flag.store(true, Ordering::Relaxed);
                return;
            }
            Ok(_) => (),
            Err(e) => {
                warn!("Stopped watching stdin for quit: {}", e);
                return;
            }
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
    fn test_request_is_shared() {
        let quit = QuitSignal::new();
        let other = quit.clone();

        assert!(!quit.requested());
        other.request();
        assert!(quit.requested());
    }
}
