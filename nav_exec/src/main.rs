//! # Navigation Executable
//!
//! Drives the robot towards the QR marker seen by the camera.
//!
//! The general execution methodology consists of:
//!
//!     - Load parameters and apply command line overrides
//!     - Open the video source and the drive link
//!     - Main loop, until quit is requested or the video source fails:
//!         - Capture a frame
//!         - Detect markers (on every `skip_factor`-th frame)
//!         - Select the target and decide the drive command
//!         - Send the command if it differs from the last one
//!     - Send a final STOP and release the equipment

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use chrono::Utc;
use color_eyre::{eyre::WrapErr, Result};
use log::{debug, info, log, log_enabled, warn, Level};
use structopt::StructOpt;

use nav_lib::{
    diag,
    frame_sched::FrameAction,
    nav_ctrl::{NavCtrl, ShutdownCause},
    params::NavExecParams,
    quit::QuitSignal,
};
use util::{
    host,
    logger::{logger_init, parse_level},
    params::LoadError,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command line options, each overriding the matching parameter.
#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec", about = "QR marker following navigation loop")]
struct Opt {
    /// Parameter file to use instead of `params/nav_exec.toml`
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Video source: camera index, /dev/ path, stream URL or image directory
    #[structopt(long)]
    source: Option<String>,

    /// Serial device of the drive controller
    #[structopt(long)]
    port: Option<String>,

    /// Serial baud rate
    #[structopt(long)]
    baud: Option<u32>,

    /// Width frames are scaled to before detection
    #[structopt(long)]
    width: Option<u32>,

    /// Process every Nth frame
    #[structopt(long)]
    skip: Option<u32>,

    /// Log level (info, debug or trace)
    #[structopt(long, default_value = "debug")]
    log_level: String,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = parse_level(&opt.log_level).wrap_err("Invalid log level")?;
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("QR Navigation Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params = load_params(&opt)?;

    info!("Parameters loaded");
    debug!("{:#?}", params);

    // ---- INITIALISE EQUIPMENT ----

    let quit = QuitSignal::new();
    quit.install()
        .wrap_err("Failed to install the quit signal")?;

    let mut nav_ctrl = NavCtrl::init(&params).wrap_err("Failed to initialise NavCtrl")?;

    info!("NavCtrl initialised");

    // ---- MAIN LOOP ----

    let cause = nav_ctrl.run(&quit, |report, state| {
        let level = match report.action {
            FrameAction::Process => Level::Debug,
            FrameAction::DisplayOnly => Level::Trace,
        };

        if !log_enabled!(level) {
            return;
        }

        let lines = diag::render(report, state, Utc::now());
        log!(level, "[frame {}] {}", report.frame_index, lines.join(" | "));
    });

    match &cause {
        ShutdownCause::QuitRequested => info!("Stopping on operator request"),
        ShutdownCause::CaptureFailed(e) => warn!("Stopping after capture failure: {}", e),
    }

    // ---- SHUTDOWN ----

    nav_ctrl.shutdown();

    info!(
        "Final drive command history: {:?}",
        nav_ctrl.state().cmd_log.history_cmds()
    );
    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load the parameters and apply the command line overrides.
///
/// A missing default parameter file is not an error, the built in defaults are used instead. A
/// missing file given with `--params` is.
fn load_params(opt: &Opt) -> Result<NavExecParams> {
    let mut params: NavExecParams = match &opt.params {
        Some(path) => util::params::load_from_path(path)
            .wrap_err_with(|| format!("Could not load parameters from {:?}", path))?,
        None => match util::params::load("nav_exec.toml") {
            Ok(p) => p,
            Err(LoadError::FileLoadError(e)) => {
                warn!("Could not read nav_exec.toml ({}), using defaults", e);
                NavExecParams::default()
            }
            Err(e) => return Err(e).wrap_err("Could not load nav_exec params"),
        },
    };

    if let Some(source) = &opt.source {
        params.cam.source = source.clone();
    }
    if let Some(port) = &opt.port {
        params.link.port = port.clone();
    }
    if let Some(baud) = opt.baud {
        params.link.baud_rate = baud;
    }
    if let Some(width) = opt.width {
        params.nav.processing_width = width;
    }
    if let Some(skip) = opt.skip {
        params.nav.skip_factor = skip;
    }

    Ok(params)
}
