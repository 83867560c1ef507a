//! Frame buffer rasterization and display sinks for the gol workspace.
//!
//! The render pipeline runs below the compute task: it snapshots the shared
//! board under its lock, releases it, and only then rasterizes and pushes the
//! frame to the (potentially slow) display sink. Pixel data is RGB565,
//! row-major, high byte first, matching the display contract.

use gol_core::{Grid, SharedBoard};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const COLOR_ALIVE: u16 = 0xFFFF;
pub const COLOR_DEAD: u16 = 0x0000;

/// Errors raised by display sinks.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The sink could not be brought up. Fatal to the render path only: the
    /// pipeline is never constructed, other tasks are unaffected.
    #[error("display device not ready: {0}")]
    DeviceNotReady(String),
    #[error("display write failed")]
    Io(#[from] std::io::Error),
}

/// Owned device-sized pixel buffer: 2 bytes per pixel, RGB565, row-major,
/// high byte first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bytes: vec![0; width as usize * height as usize * 2],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in pixels.
    pub fn pitch(&self) -> u32 {
        self.width
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Writes one pixel; coordinates outside the buffer are silently
    /// discarded.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: u16) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y as usize * self.width as usize + x as usize) * 2;
        self.bytes[index] = (color >> 8) as u8;
        self.bytes[index + 1] = (color & 0xFF) as u8;
    }
}

/// Fills one grid cell's pixel block, leaving a one-pixel border on the
/// right and bottom edges so cell boundaries stay visible.
pub fn draw_cell(frame: &mut FrameBuffer, grid_x: u32, grid_y: u32, cell_size: u32, color: u16) {
    let start_x = grid_x * cell_size;
    let start_y = grid_y * cell_size;
    for y in 0..cell_size.saturating_sub(1) {
        for x in 0..cell_size.saturating_sub(1) {
            frame.put_pixel(start_x + x, start_y + y, color);
        }
    }
}

/// Rasterizes a grid snapshot into the frame buffer.
pub fn rasterize(grid: &Grid, cell_size: u32, frame: &mut FrameBuffer) {
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let color = match grid.get(x, y) {
                Some(0) | None => COLOR_DEAD,
                Some(_) => COLOR_ALIVE,
            };
            draw_cell(frame, x, y, cell_size, color);
        }
    }
}

/// Destination for finished frames. The call may be slow; the pipeline
/// guarantees it happens outside the board lock.
pub trait DisplaySink: Send {
    fn name(&self) -> &'static str;

    fn present(&mut self, frame: &FrameBuffer) -> Result<(), RenderError>;
}

/// Captures the most recent frame in memory; used by tests and headless runs.
#[derive(Default)]
pub struct MemorySink {
    shared: Arc<Mutex<MemoryFrame>>,
}

#[derive(Default)]
struct MemoryFrame {
    bytes: Vec<u8>,
    presented: u64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MemorySinkHandle {
        MemorySinkHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read side of a [`MemorySink`], usable after the sink moved into the
/// pipeline.
#[derive(Clone)]
pub struct MemorySinkHandle {
    shared: Arc<Mutex<MemoryFrame>>,
}

impl MemorySinkHandle {
    pub fn last_frame(&self) -> Vec<u8> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bytes
            .clone()
    }

    pub fn presented(&self) -> u64 {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .presented
    }
}

impl DisplaySink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn present(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.bytes.clear();
        shared.bytes.extend_from_slice(frame.as_bytes());
        shared.presented += 1;
        Ok(())
    }
}

/// Persists the latest raw frame to a file, overwriting on every present.
/// The host-side analogue of pushing the buffer to a display panel.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Opens the sink, probing that the path is writable. A failure here is
    /// the device-not-ready case: the render pipeline must not start.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let path = path.into();
        fs::write(&path, b"").map_err(|err| {
            RenderError::DeviceNotReady(format!("{}: {err}", path.display()))
        })?;
        Ok(Self { path })
    }
}

impl DisplaySink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn present(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        fs::write(&self.path, frame.as_bytes())?;
        Ok(())
    }
}

/// The render task: snapshot under lock, rasterize and present outside it,
/// then yield for a fixed frame interval.
pub struct RenderPipeline {
    board: Arc<SharedBoard>,
    sink: Box<dyn DisplaySink>,
    cell_size: u32,
    frame_interval: Duration,
    frame: FrameBuffer,
    snapshot: Grid,
}

impl RenderPipeline {
    pub fn new(
        board: Arc<SharedBoard>,
        sink: Box<dyn DisplaySink>,
        cell_size: u32,
        frame_interval: Duration,
    ) -> Self {
        let (grid_w, grid_h) = board.dimensions();
        let frame = FrameBuffer::new(grid_w * cell_size, grid_h * cell_size);
        let snapshot = board.new_scratch();
        Self {
            board,
            sink,
            cell_size,
            frame_interval,
            frame,
            snapshot,
        }
    }

    /// Renders one frame: bounded-latency snapshot, then slow work unlocked.
    pub fn render_once(&mut self) -> u64 {
        let generation = self.board.snapshot_into(&mut self.snapshot);
        rasterize(&self.snapshot, self.cell_size, &mut self.frame);
        if let Err(err) = self.sink.present(&self.frame) {
            // A failed present costs one frame, nothing else.
            warn!(%err, generation, "display present failed; frame skipped");
        }
        generation
    }

    /// Runs until `running` clears, sleeping the frame interval between
    /// cycles to yield the processor.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            sink = self.sink.name(),
            width = self.frame.width(),
            height = self.frame.height(),
            "render pipeline started"
        );
        while running.load(Ordering::Relaxed) {
            self.render_once();
            thread::sleep(self.frame_interval);
        }
        info!("render pipeline stopped");
    }
}
