//! End-to-end behavior across the board, scheduler, shell, and console.

use gol_app::{
    Console, PRIO_COMPUTE, PRIO_CONSOLE, PRIO_RENDER, Scheduler, Shell, TaskInfo, TaskRegistry,
    cprintln,
    tasks::{COMPUTE_STACK, CONSOLE_STACK, RENDER_STACK, SHELL_STACK},
};
use gol_core::{Grid, ResetSignal, SharedBoard};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PERIOD: Duration = Duration::from_millis(100);

fn blinker_board() -> Arc<SharedBoard> {
    let mut grid = Grid::new(6, 6).expect("grid");
    grid.set(1, 2, 1);
    grid.set(2, 2, 1);
    grid.set(3, 2, 1);
    Arc::new(SharedBoard::new(grid))
}

fn scheduler_for(board: &Arc<SharedBoard>, reset: &Arc<ResetSignal>) -> Scheduler {
    Scheduler::new(
        Arc::clone(board),
        Arc::clone(reset),
        Arc::new(Console::new(8)),
        SmallRng::seed_from_u64(1),
        PERIOD,
    )
}

#[test]
fn blinker_returns_after_two_generations() {
    let board = blinker_board();
    let reset = Arc::new(ResetSignal::new());
    let mut scheduler = scheduler_for(&board, &reset);

    let mut start = board.new_scratch();
    board.snapshot_into(&mut start);

    assert!(scheduler.step_once());
    let mut mid = board.new_scratch();
    assert_eq!(board.snapshot_into(&mut mid), 1);
    assert_eq!(mid.get(2, 1), Some(1));
    assert_eq!(mid.get(2, 2), Some(1));
    assert_eq!(mid.get(2, 3), Some(1));
    assert_eq!(board.alive_count(), 3);

    assert!(scheduler.step_once());
    let mut end = board.new_scratch();
    assert_eq!(board.snapshot_into(&mut end), 2);
    assert_eq!(end, start);
}

#[test]
fn reset_signaled_before_commit_wins_the_cycle() {
    let board = blinker_board();
    let reset = Arc::new(ResetSignal::new());
    let mut scheduler = scheduler_for(&board, &reset);

    let mut start = board.new_scratch();
    board.snapshot_into(&mut start);
    let mut computed_next = board.new_scratch();
    start.step_into(&mut computed_next);

    reset.post();
    // The computed generation must be discarded in favor of the reset.
    assert!(!scheduler.step_once());
    assert_eq!(board.generation(), 1);

    let mut snapshot = board.new_scratch();
    board.snapshot_into(&mut snapshot);
    assert_ne!(snapshot, computed_next, "stale generation was committed");
    assert_eq!(snapshot.alive_count(), board.alive_count());

    // The signal was consumed; the next cycle computes normally.
    assert!(scheduler.step_once());
    assert_eq!(board.generation(), 2);
}

#[test]
fn shell_output_flows_through_the_console_drain() {
    let board = blinker_board();
    let reset = Arc::new(ResetSignal::new());
    let console = Arc::new(Console::new(16));
    let registry = Arc::new(TaskRegistry::new());

    let shell = Shell::new(
        Arc::clone(&board),
        Arc::clone(&reset),
        Arc::clone(&console),
        Arc::clone(&registry),
    );
    assert_eq!(shell.dispatch("status"), 0);
    assert_eq!(shell.dispatch("echo cooperative tasks"), 0);
    assert_eq!(shell.dispatch("show-drops"), 0);
    cprintln!(console, "done");

    let sink = Arc::new(Mutex::new(Vec::new()));
    let drain = console.spawn_drain(Arc::clone(&sink)).expect("drain");
    drop(shell);
    drop(console);
    drain.join().expect("drain join");

    let output = sink.lock().expect("sink");
    let text = String::from_utf8_lossy(&output);
    // 3 alive out of 36 cells is 8.3% in fixed point.
    assert!(text.contains("Alive cells: 3 / 36"));
    assert!(text.contains("Density: 8.3 %"));
    assert!(text.contains("cooperative tasks"));
    assert!(text.contains("Dropped messages: 0"));
    assert!(text.ends_with("done\n"));
}

#[test]
fn queued_lines_survive_shutdown_join() {
    let console = Arc::new(Console::new(16));
    let shell = Shell::new(
        blinker_board(),
        Arc::new(ResetSignal::new()),
        Arc::clone(&console),
        Arc::new(TaskRegistry::new()),
    );
    assert_eq!(shell.dispatch("echo last words"), 0);

    // Shutdown order: producers go away first, then the drain is joined;
    // everything still enqueued must reach the sink.
    let sink = Arc::new(Mutex::new(Vec::new()));
    let drain = console.spawn_drain(Arc::clone(&sink)).expect("drain");
    drop(shell);
    drop(console);
    drain.join().expect("drain join");

    let output = sink.lock().expect("sink");
    assert_eq!(String::from_utf8_lossy(&output), "last words\n");
}

#[test]
fn list_tasks_covers_every_registered_thread() {
    let registry = Arc::new(TaskRegistry::new());
    for (name, priority, stack_size) in [
        ("console-drain", PRIO_CONSOLE, CONSOLE_STACK),
        ("compute", PRIO_COMPUTE, COMPUTE_STACK),
        ("render", PRIO_RENDER, RENDER_STACK),
        ("shell", PRIO_CONSOLE, SHELL_STACK),
    ] {
        registry.register(TaskInfo {
            name,
            priority,
            stack_size,
        });
    }

    let console = Arc::new(Console::new(16));
    let shell = Shell::new(
        blinker_board(),
        Arc::new(ResetSignal::new()),
        Arc::clone(&console),
        Arc::clone(&registry),
    );
    assert_eq!(shell.dispatch("list-tasks"), 0);

    let sink = Arc::new(Mutex::new(Vec::new()));
    let drain = console.spawn_drain(Arc::clone(&sink)).expect("drain");
    drop(shell);
    drop(console);
    drain.join().expect("drain join");

    let output = sink.lock().expect("sink");
    let text = String::from_utf8_lossy(&output);
    for name in ["console-drain", "compute", "render", "shell"] {
        assert!(text.contains(name), "missing task {name} in listing");
    }
}
