//! Wall-clock pacing and frame hand-off to a presenter thread.
//!
//! The machine runs on the scheduler's thread. Each completed frame is copied
//! out and sent over a single-slot channel; when the presenter has not taken
//! the previous frame yet it is replaced, so the presenter always sees the
//! newest complete frame and never a partially rendered one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as cb;
use log::{debug, info, trace};

use crate::{
    error::CoreError,
    gameboy::GameBoy,
    hardware::{BYTES_PER_PIXEL, FRAME_RATE, SCREEN_HEIGHT, SCREEN_WIDTH},
};

/// An owned copy of one completed frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Frame number as counted by the PPU
    pub number: u64,
    pixels: Box<[u8]>,
}

impl Frame {
    /// Copy the last frame the PPU finished, never the one being drawn.
    pub fn capture(gb: &GameBoy) -> Self {
        Self {
            number: gb.mmu.ppu.frames(),
            pixels: gb.framebuffer().into(),
        }
    }

    pub const fn width(&self) -> usize {
        SCREEN_WIDTH
    }

    pub const fn height(&self) -> usize {
        SCREEN_HEIGHT
    }

    /// RGBA8 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at (`x`, `y`), or `None` outside the screen.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return None;
        }
        let idx = (y * SCREEN_WIDTH + x) * BYTES_PER_PIXEL;
        let px = self.pixels.get(idx..idx + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Consumer of published frames.
pub trait Presenter {
    fn present(&mut self, frame: &Frame);
}

/// Producer end of the frame channel.
pub struct FramePublisher {
    tx: cb::Sender<Frame>,
    /// Used to evict a frame the presenter has not picked up yet
    evict: cb::Receiver<Frame>,
}

impl FramePublisher {
    /// Hand a frame to the presenter, replacing any frame still waiting.
    pub fn publish(&self, frame: Frame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(cb::TrySendError::Full(frame)) => {
                if let Ok(stale) = self.evict.try_recv() {
                    trace!("Presenter behind; dropping frame {}", stale.number);
                }
                if let Err(e) = self.tx.try_send(frame) {
                    trace!("Frame slot still busy; dropping frame {}", e.into_inner().number);
                }
            }
            Err(cb::TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Create the single-slot frame channel.
pub fn frame_channel() -> (FramePublisher, cb::Receiver<Frame>) {
    let (tx, rx) = cb::bounded(1);
    let publisher = FramePublisher {
        tx,
        evict: rx.clone(),
    };
    (publisher, rx)
}

/// Deliver frames from `rx` to `presenter` until every publisher is gone or
/// `shutdown` is requested. Returns the number of frames presented.
pub fn run_presenter<P: Presenter + ?Sized>(
    rx: &cb::Receiver<Frame>,
    presenter: &mut P,
    shutdown: &ShutdownHandle,
) -> u64 {
    let mut presented = 0;
    while !shutdown.is_requested() {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => {
                presenter.present(&frame);
                presented += 1;
            }
            Err(cb::RecvTimeoutError::Timeout) => continue,
            Err(cb::RecvTimeoutError::Disconnected) => break,
        }
    }
    presented
}

/// Cooperative stop flag shared between the scheduler and its host.
#[derive(Clone, Debug, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Target frames per second when throttled
    pub frame_rate: f64,
    /// Run as fast as possible, skipping the pacing sleep
    pub unthrottled: bool,
    /// Stop on its own after this many frames
    pub max_frames: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_rate: FRAME_RATE,
            unthrottled: false,
            max_frames: None,
        }
    }
}

impl SchedulerConfig {
    pub fn frame_period(&self) -> Duration {
        if self.frame_rate > 0.0 {
            Duration::from_secs_f64(1.0 / self.frame_rate)
        } else {
            Duration::from_secs_f64(1.0 / FRAME_RATE)
        }
    }
}

pub struct Scheduler {
    gb: GameBoy,
    config: SchedulerConfig,
    publisher: FramePublisher,
    shutdown: ShutdownHandle,
}

impl Scheduler {
    pub fn new(gb: GameBoy, config: SchedulerConfig, publisher: FramePublisher) -> Self {
        Self {
            gb,
            config,
            publisher,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Share an existing stop flag instead of the scheduler's own.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn machine(&self) -> &GameBoy {
        &self.gb
    }

    /// Run frames until shutdown is requested or the frame limit is hit.
    /// Returns the number of frames published.
    pub fn run(&mut self) -> Result<u64, CoreError> {
        let period = self.config.frame_period();
        let mut deadline = Instant::now() + period;
        let mut frames = 0u64;

        info!(
            "Scheduler started ({:.4} fps{})",
            self.config.frame_rate,
            if self.config.unthrottled { ", unthrottled" } else { "" }
        );

        while !self.shutdown.is_requested() {
            if self.config.max_frames.is_some_and(|max| frames >= max) {
                break;
            }

            self.gb.run_frame()?;

            if !self.config.unthrottled {
                let now = Instant::now();
                if now < deadline {
                    thread::sleep(deadline - now);
                    deadline += period;
                } else {
                    // fell behind; restart pacing from here
                    deadline = now + period;
                }
            }

            if self.gb.mmu.ppu.frame_ready() {
                self.gb.mmu.ppu.clear_frame_flag();
            } else {
                trace!("No new frame this period; republishing the last one");
            }
            self.publisher.publish(Frame::capture(&self.gb));
            frames += 1;
        }

        debug!("Scheduler stopped after {frames} frames");
        Ok(frames)
    }
}
