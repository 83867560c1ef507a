//! Administrative shell.
//!
//! A thin line-oriented dispatcher over the other components: it posts the
//! reset signal, reads the cached alive count, and enumerates tasks and drop
//! counts. Every verb routes its output through the console pipeline and
//! returns a status code; no verb can fail in a way that takes the process
//! down — the worst case is no output.

use gol_core::{DensityPermille, ResetSignal, SharedBoard};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::console::Console;
use crate::cprintln;
use crate::tasks::TaskRegistry;

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ResetGame,
    Status,
    ListTasks,
    ShowDrops,
    Echo(Vec<String>),
    Uptime,
    Help,
    Unknown(String),
    Empty,
}

/// Parses one input line into a command.
pub fn parse(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Command::Empty;
    };
    match verb {
        "reset-game" => Command::ResetGame,
        "status" => Command::Status,
        "list-tasks" => Command::ListTasks,
        "show-drops" => Command::ShowDrops,
        "echo" => Command::Echo(words.map(str::to_owned).collect()),
        "uptime" => Command::Uptime,
        "help" => Command::Help,
        other => Command::Unknown(other.to_owned()),
    }
}

pub struct Shell {
    board: Arc<SharedBoard>,
    reset: Arc<ResetSignal>,
    console: Arc<Console>,
    registry: Arc<TaskRegistry>,
    started: Instant,
}

impl Shell {
    pub fn new(
        board: Arc<SharedBoard>,
        reset: Arc<ResetSignal>,
        console: Arc<Console>,
        registry: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            board,
            reset,
            console,
            registry,
            started: Instant::now(),
        }
    }

    /// Parses and executes one line, returning the verb's status code.
    pub fn dispatch(&self, line: &str) -> i32 {
        let command = parse(line);
        debug!(?command, "shell dispatch");
        self.execute(command)
    }

    fn execute(&self, command: Command) -> i32 {
        match command {
            Command::ResetGame => {
                // Fire-and-forget; a still-pending post coalesces.
                self.reset.post();
                0
            }
            Command::Status => {
                let alive = self.board.alive_count();
                let total = self.board.total_cells();
                let density = DensityPermille::new(alive, total);
                cprintln!(self.console, "--- Conway's GoL Status ---");
                cprintln!(self.console, "Alive cells: {alive} / {total}");
                cprintln!(self.console, "Density: {density} %");
                cprintln!(
                    self.console,
                    "Generation: {}",
                    self.board.generation()
                );
                0
            }
            Command::ListTasks => {
                cprintln!(self.console, "--- Installed tasks ---");
                for task in self.registry.snapshot() {
                    cprintln!(
                        self.console,
                        "  {:<16} prio {:>2}  stack {} bytes",
                        task.name,
                        task.priority,
                        task.stack_size
                    );
                }
                0
            }
            Command::ShowDrops => {
                cprintln!(self.console, "Dropped messages: {}", self.console.dropped());
                0
            }
            Command::Echo(words) => {
                if words.is_empty() {
                    cprintln!(self.console, "Usage: echo <text>");
                } else {
                    cprintln!(self.console, "{}", words.join(" "));
                }
                0
            }
            Command::Uptime => {
                cprintln!(
                    self.console,
                    "Uptime: {} ms",
                    self.started.elapsed().as_millis()
                );
                0
            }
            Command::Help => {
                cprintln!(
                    self.console,
                    "Commands: reset-game status list-tasks show-drops echo uptime help"
                );
                0
            }
            Command::Unknown(verb) => {
                cprintln!(self.console, "Unknown command: {verb} (try 'help')");
                -1
            }
            Command::Empty => 0,
        }
    }

    /// Reads lines until EOF, dispatching each one.
    pub fn run(&self, input: impl BufRead) {
        for line in input.lines() {
            let Ok(line) = line else { break };
            self.dispatch(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gol_core::Grid;

    fn shell_fixture(depth: usize) -> Shell {
        let board = Arc::new(SharedBoard::new(Grid::new(8, 8).expect("grid")));
        Shell::new(
            board,
            Arc::new(ResetSignal::new()),
            Arc::new(Console::new(depth)),
            Arc::new(TaskRegistry::new()),
        )
    }

    #[test]
    fn parse_recognizes_all_verbs() {
        assert_eq!(parse("reset-game"), Command::ResetGame);
        assert_eq!(parse("  status "), Command::Status);
        assert_eq!(parse("list-tasks"), Command::ListTasks);
        assert_eq!(parse("show-drops"), Command::ShowDrops);
        assert_eq!(
            parse("echo hello world"),
            Command::Echo(vec!["hello".into(), "world".into()])
        );
        assert_eq!(parse("uptime"), Command::Uptime);
        assert_eq!(parse(""), Command::Empty);
        assert_eq!(parse("bogus"), Command::Unknown("bogus".into()));
    }

    #[test]
    fn reset_game_posts_the_signal() {
        let shell = shell_fixture(8);
        assert_eq!(shell.dispatch("reset-game"), 0);
        assert!(shell.reset.take());
    }

    #[test]
    fn unknown_verb_reports_failure_without_crashing() {
        let shell = shell_fixture(8);
        assert_eq!(shell.dispatch("frobnicate"), -1);
        assert_eq!(shell.dispatch("status"), 0);
    }

    #[test]
    fn verbs_survive_a_saturated_console() {
        // Queue depth 1 and no drain: output is shed, verbs still succeed.
        let shell = shell_fixture(1);
        assert_eq!(shell.dispatch("status"), 0);
        assert_eq!(shell.dispatch("uptime"), 0);
        assert!(shell.console.dropped() > 0);
    }
}
