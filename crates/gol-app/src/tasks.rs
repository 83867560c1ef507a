//! Task bookkeeping and spawning.
//!
//! Threads are constructed and started explicitly from the initialization
//! routine, never as a side effect of declaration, so startup ordering stays
//! visible. Priority bands use RTOS-style numbering (lower is more urgent);
//! on a hosted OS they are advisory metadata carried for the `list-tasks`
//! diagnostics rather than a scheduling directive.

use std::io;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Compute task: most urgent, paces everything else.
pub const PRIO_COMPUTE: i8 = 1;
/// Console drain: interrupts rendering so shell output stays responsive.
pub const PRIO_CONSOLE: i8 = 4;
/// Render task: runs when nobody else needs the processor.
pub const PRIO_RENDER: i8 = 5;

pub const COMPUTE_STACK: usize = 64 * 1024;
pub const CONSOLE_STACK: usize = 64 * 1024;
pub const RENDER_STACK: usize = 256 * 1024;
/// The shell runs on the process main thread; this is the platform default
/// main-thread stack, recorded for diagnostics.
pub const SHELL_STACK: usize = 8 * 1024 * 1024;

/// Static description of a spawned task, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: &'static str,
    pub priority: i8,
    pub stack_size: usize,
}

/// Registry of every task the application spawned, in spawn order.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<Vec<TaskInfo>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, info: TaskInfo) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(info);
    }

    pub fn snapshot(&self) -> Vec<TaskInfo> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registers and launches a named task with an explicit stack size.
pub fn spawn_task<F>(
    registry: &TaskRegistry,
    name: &'static str,
    priority: i8,
    stack_size: usize,
    body: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    registry.register(TaskInfo {
        name,
        priority,
        stack_size,
    });
    thread::Builder::new()
        .name(name.into())
        .stack_size(stack_size)
        .spawn(body)
}
