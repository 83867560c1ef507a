//! Application plumbing for the gol simulation: the asynchronous console
//! pipeline, the periodic compute scheduler, the administrative shell, and
//! the task registry behind its diagnostics.

pub mod console;
pub mod sched;
pub mod shell;
pub mod tasks;

pub use console::{Console, MESSAGE_CAPACITY};
pub use sched::{Scheduler, next_deadline};
pub use shell::{Command, Shell};
pub use tasks::{
    PRIO_COMPUTE, PRIO_CONSOLE, PRIO_RENDER, TaskInfo, TaskRegistry, spawn_task,
};
