mod config;
mod error;
mod files;

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Parser;
use dotmatrix_core::{
    gameboy::{GameBoy, MachineConfig},
    hardware::IoPolicy,
    scheduler::{
        Frame, Presenter, Scheduler, SchedulerConfig, ShutdownHandle, frame_channel,
        run_presenter,
    },
};
use log::{debug, error, info};

use crate::error::HostError;

#[derive(Parser)]
#[command(version, about = "Headless DMG emulator")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Path to host config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to boot ROM file
    #[arg(long)]
    boot_rom: Option<PathBuf>,

    /// Stop on accesses to serial, sound or unmapped I/O registers
    #[arg(long)]
    strict_io: bool,

    /// Number of frames to run before exiting
    #[arg(long)]
    frames: Option<u64>,

    /// Run as fast as possible instead of at the LCD refresh rate
    #[arg(long)]
    unthrottled: bool,

    /// Write the last presented frame to this PNG file
    #[arg(long)]
    dump_frame: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Keeps the newest frame around for an optional dump.
#[derive(Default)]
struct HeadlessPresenter {
    presented: u64,
    latest: Option<Frame>,
}

impl Presenter for HeadlessPresenter {
    fn present(&mut self, frame: &Frame) {
        self.presented += 1;
        if frame.number.is_multiple_of(60) {
            debug!("Presented frame {}", frame.number);
        }
        self.latest = Some(frame.clone());
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(args: Args) -> Result<(), HostError> {
    let config_path = args.config.unwrap_or_else(config::default_config_path);
    let cfg = config::load_from_file(&config_path);

    let cart = files::load_cartridge(&args.rom)?;
    let boot_rom = match args.boot_rom.or(cfg.boot_rom) {
        Some(path) => Some(files::load_boot_rom(&path)?),
        None => None,
    };
    let io_policy = if args.strict_io {
        IoPolicy::Strict
    } else {
        cfg.io_policy.into()
    };

    let mut gb = GameBoy::with_config(MachineConfig {
        io_policy,
        boot_rom,
    });
    gb.load_cart(cart);

    let scheduler_config = SchedulerConfig {
        frame_rate: cfg.frame_rate,
        unthrottled: args.unthrottled || cfg.unthrottled,
        max_frames: args.frames,
    };
    info!(
        "Starting emulation ({io_policy:?} I/O, {})",
        match scheduler_config.max_frames {
            Some(n) => format!("{n} frames"),
            None => "until stopped".to_string(),
        }
    );

    let (publisher, rx) = frame_channel();
    let shutdown = ShutdownHandle::new();
    let mut scheduler =
        Scheduler::new(gb, scheduler_config, publisher).with_shutdown(shutdown.clone());

    let finished = shutdown.clone();
    let worker = thread::Builder::new()
        .name("emulation".into())
        .spawn(move || {
            let result = scheduler.run();
            // release the presenter loop however the run ended
            finished.request();
            result
        })
        .map_err(HostError::Spawn)?;

    let mut presenter = HeadlessPresenter::default();
    run_presenter(&rx, &mut presenter, &shutdown);

    let frames = worker.join().map_err(|_| HostError::EmulationPanicked)??;
    if let Ok(frame) = rx.try_recv() {
        presenter.present(&frame);
    }
    info!(
        "Emulated {frames} frames, presented {}",
        presenter.presented
    );

    if let Some(path) = args.dump_frame {
        let frame = presenter.latest.as_ref().ok_or(HostError::NoFrame)?;
        files::write_png(&path, frame)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
