//! Core simulation state shared across the gol workspace.
//!
//! This crate owns the cellular-automaton data model: the toroidal grid and
//! its update rule, the mutex-guarded shared board that the compute task
//! writes and the render task reads, the edge-triggered reset signal, and the
//! integer density math used by the status command.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised when validating configuration or constructing grids.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Runtime configuration for the simulation and its tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GolConfig {
    /// Display width in pixels.
    pub screen_width: u32,
    /// Display height in pixels.
    pub screen_height: u32,
    /// Edge length of one cell in pixels (must evenly divide both screen
    /// dimensions).
    pub cell_size: u32,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Period of the compute task in milliseconds.
    pub tick_interval_ms: u64,
    /// Delay between render frames in milliseconds.
    pub frame_interval_ms: u64,
    /// Capacity of the console message queue.
    pub log_queue_depth: usize,
}

impl Default for GolConfig {
    fn default() -> Self {
        Self {
            screen_width: 240,
            screen_height: 320,
            cell_size: 10,
            rng_seed: None,
            tick_interval_ms: 100,
            frame_interval_ms: 10,
            log_queue_depth: 32,
        }
    }
}

impl GolConfig {
    /// Validates the configuration, returning the derived grid dimensions.
    pub fn grid_dimensions(&self) -> Result<(u32, u32), ConfigError> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ConfigError::InvalidConfig(
                "screen dimensions must be non-zero",
            ));
        }
        if self.cell_size == 0 {
            return Err(ConfigError::InvalidConfig("cell_size must be non-zero"));
        }
        if !self.screen_width.is_multiple_of(self.cell_size)
            || !self.screen_height.is_multiple_of(self.cell_size)
        {
            return Err(ConfigError::InvalidConfig(
                "screen dimensions must be divisible by cell_size",
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "tick_interval_ms must be non-zero",
            ));
        }
        if self.log_queue_depth == 0 {
            return Err(ConfigError::InvalidConfig(
                "log_queue_depth must be non-zero",
            ));
        }
        Ok((
            self.screen_width / self.cell_size,
            self.screen_height / self.cell_size,
        ))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// A fixed-size toroidal grid of cell states stored row-major.
///
/// Coordinates outside the bounds wrap modulo the grid dimensions, so every
/// cell has exactly eight neighbors and the grid is borderless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        Ok(Self::blank(width, height))
    }

    fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn total_cells(&self) -> u32 {
        self.width * self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.cells[self.index(x, y)])
    }

    pub fn set(&mut self, x: u32, y: u32, state: u8) -> bool {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.cells[idx] = state;
            true
        } else {
            false
        }
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn fill(&mut self, state: u8) {
        self.cells.fill(state);
    }

    pub fn clear(&mut self) {
        self.fill(0);
    }

    pub fn alive_count(&self) -> u32 {
        self.cells.iter().map(|&cell| u32::from(cell != 0)).sum()
    }

    /// Seeds every cell uniformly at random (alive or dead).
    pub fn randomize(&mut self, rng: &mut dyn RngCore) {
        for cell in &mut self.cells {
            *cell = (rng.next_u32() & 1) as u8;
        }
    }

    /// Counts the live neighbors of `(x, y)` with toroidal wraparound.
    ///
    /// Only the center offset is skipped; on degenerate grids (width or
    /// height 1) a wrapped offset can land back on `(x, y)`, and the cell
    /// then counts as its own neighbor, once per such offset.
    pub fn count_neighbors(&self, x: u32, y: u32) -> u8 {
        let mut sum = 0;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let col = (x + (self.width as i32 + dx) as u32) % self.width;
                let row = (y + (self.height as i32 + dy) as u32) % self.height;
                sum += u8::from(self.cells[self.index(col, row)] != 0);
            }
        }
        sum
    }

    /// Computes the next generation into `next` without touching `self`.
    ///
    /// Pure and deterministic: the same input grid always produces the same
    /// output. Panics if the two grids differ in size.
    pub fn step_into(&self, next: &mut Grid) {
        assert_eq!(
            (self.width, self.height),
            (next.width, next.height),
            "generation buffers must share dimensions"
        );
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = self.index(x, y);
                let alive = self.cells[idx] != 0;
                let neighbors = self.count_neighbors(x, y);
                next.cells[idx] = match (alive, neighbors) {
                    (false, 3) => 1,
                    (true, n) if !(2..=3).contains(&n) => 0,
                    (state, _) => u8::from(state),
                };
            }
        }
    }

    fn copy_from(&mut self, other: &Grid) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.cells.copy_from_slice(&other.cells);
    }
}

struct BoardInner {
    committed: Grid,
    alive: u32,
    generation: u64,
}

/// The automaton state shared between the compute task (writer) and the
/// render task plus status queries (readers).
///
/// The mutex lives inside this object; callers share it through an
/// [`std::sync::Arc`]. Generation computation happens outside the lock into a
/// private buffer, so the critical section is only ever a fixed-size copy
/// plus a cached-count update. Readers therefore block for at most that copy,
/// regardless of how expensive a computation pass is.
pub struct SharedBoard {
    width: u32,
    height: u32,
    inner: Mutex<BoardInner>,
}

impl SharedBoard {
    pub fn new(initial: Grid) -> Self {
        let alive = initial.alive_count();
        Self {
            width: initial.width,
            height: initial.height,
            inner: Mutex::new(BoardInner {
                committed: initial,
                alive,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoardInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn total_cells(&self) -> u32 {
        self.width * self.height
    }

    /// Allocates a dead grid matching this board's dimensions, for use as a
    /// private working or snapshot buffer.
    pub fn new_scratch(&self) -> Grid {
        Grid::blank(self.width, self.height)
    }

    /// Publishes `next` as the committed grid and refreshes the cached alive
    /// count. The sole mutator of the committed grid besides [`reset`].
    ///
    /// Returns the new generation number.
    ///
    /// [`reset`]: SharedBoard::reset
    pub fn commit(&self, next: &Grid) -> u64 {
        let mut inner = self.lock();
        inner.committed.copy_from(next);
        inner.alive = next.alive_count();
        inner.generation += 1;
        inner.generation
    }

    /// Overwrites the committed grid with a fresh random seeding.
    ///
    /// Holds the same exclusive lock as [`commit`], so a reset and a commit
    /// can never interleave. Returns the alive count of the new seeding.
    ///
    /// [`commit`]: SharedBoard::commit
    pub fn reset(&self, rng: &mut dyn RngCore) -> u32 {
        let mut inner = self.lock();
        inner.committed.randomize(rng);
        inner.alive = inner.committed.alive_count();
        inner.generation += 1;
        inner.alive
    }

    /// Copies the committed grid into `dest` under the read lock and returns
    /// the generation it belongs to.
    ///
    /// The copy is always self-consistent: it reflects exactly one committed
    /// generation, never a mix.
    pub fn snapshot_into(&self, dest: &mut Grid) -> u64 {
        let inner = self.lock();
        dest.copy_from(&inner.committed);
        inner.generation
    }

    /// Cached alive count of the committed grid; consistent with the grid as
    /// of the last commit and never torn.
    pub fn alive_count(&self) -> u32 {
        self.lock().alive
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}

/// Edge-triggered one-shot reset event.
///
/// A post wakes at most one waiter and posting again before consumption is
/// equivalent to posting once; pending resets do not queue.
#[derive(Default)]
pub struct ResetSignal {
    pending: Mutex<bool>,
    cond: Condvar,
}

impl ResetSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts the event. Fire-and-forget; idempotent while already pending.
    pub fn post(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !*pending {
            *pending = true;
            self.cond.notify_one();
        }
    }

    /// Blocks until the event is posted or `timeout` elapses. Returns whether
    /// the event fired, consuming it if so.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut pending, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |pending| !*pending)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *pending)
    }

    /// Consumes a pending event without blocking.
    pub fn take(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *pending)
    }
}

/// Live-cell density in tenths of a percent, computed in integer math.
///
/// `alive * 1000 / total` truncated, split into a whole percentage and one
/// decimal digit, so the status path never touches floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityPermille(u32);

impl DensityPermille {
    pub fn new(alive: u32, total: u32) -> Self {
        if total == 0 {
            return Self(0);
        }
        Self((u64::from(alive) * 1000 / u64::from(total)) as u32)
    }

    pub fn whole(&self) -> u32 {
        self.0 / 10
    }

    pub fn tenths(&self) -> u32 {
        self.0 % 10
    }
}

impl fmt::Display for DensityPermille {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole(), self.tenths())
    }
}
