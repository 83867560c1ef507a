use anyhow::{Context, Result};
use gol_app::{
    Console, PRIO_COMPUTE, PRIO_CONSOLE, PRIO_RENDER, Scheduler, Shell, TaskInfo, TaskRegistry,
    cprintln, spawn_task,
    tasks::{COMPUTE_STACK, CONSOLE_STACK, RENDER_STACK, SHELL_STACK},
};
use gol_core::{GolConfig, Grid, ResetSignal, SharedBoard};
use gol_render::{FileSink, RenderPipeline};
use rand::{SeedableRng, rngs::SmallRng};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const FRAME_PATH: &str = "display.rgb565";

fn main() -> Result<()> {
    init_tracing();

    let config = GolConfig::default();
    let (grid_w, grid_h) = config
        .grid_dimensions()
        .context("invalid configuration")?;
    info!(grid_w, grid_h, "Starting Game of Life simulation");

    let mut rng = SmallRng::seed_from_u64(config.rng_seed.unwrap_or(0xC0FF_EE00_D15C_1A4E_u64));
    let mut seed_grid = Grid::new(grid_w, grid_h)?;
    seed_grid.randomize(&mut rng);

    let board = Arc::new(SharedBoard::new(seed_grid));
    let reset = Arc::new(ResetSignal::new());
    let console = Arc::new(Console::new(config.log_queue_depth));
    let registry = Arc::new(TaskRegistry::new());
    let running = Arc::new(AtomicBool::new(true));

    // Console drain comes up first so nothing logged during startup drops.
    let drain = console
        .spawn_drain(Arc::new(Mutex::new(io::stdout())))
        .context("failed to start console drain")?;
    registry.register(TaskInfo {
        name: "console-drain",
        priority: PRIO_CONSOLE,
        stack_size: CONSOLE_STACK,
    });

    let mut scheduler = Scheduler::new(
        Arc::clone(&board),
        Arc::clone(&reset),
        Arc::clone(&console),
        rng,
        config.tick_interval(),
    );
    let compute_flag = Arc::clone(&running);
    let compute = spawn_task(&registry, "compute", PRIO_COMPUTE, COMPUTE_STACK, move || {
        scheduler.run(&compute_flag)
    })
    .context("failed to start compute task")?;

    // A sink that cannot come up is fatal to the render path only.
    let render = match FileSink::create(FRAME_PATH) {
        Ok(sink) => {
            let mut pipeline = RenderPipeline::new(
                Arc::clone(&board),
                Box::new(sink),
                config.cell_size,
                config.frame_interval(),
            );
            let render_flag = Arc::clone(&running);
            Some(
                spawn_task(&registry, "render", PRIO_RENDER, RENDER_STACK, move || {
                    pipeline.run(&render_flag)
                })
                .context("failed to start render task")?,
            )
        }
        Err(err) => {
            warn!(%err, "display sink unavailable; render task not started");
            None
        }
    };

    cprintln!(console, "Terminal initialized (priority {PRIO_CONSOLE}).");

    // The shell occupies the main thread; record it so list-tasks sees it.
    registry.register(TaskInfo {
        name: "shell",
        priority: PRIO_CONSOLE,
        stack_size: SHELL_STACK,
    });
    let shell = Shell::new(
        Arc::clone(&board),
        Arc::clone(&reset),
        Arc::clone(&console),
        Arc::clone(&registry),
    );
    shell.run(io::stdin().lock());

    info!("shutting down");
    running.store(false, Ordering::Relaxed);
    compute.join().ok();
    if let Some(render) = render {
        render.join().ok();
    }
    // Joining compute released the scheduler's console handle; dropping the
    // remaining producers closes the queue so the drain flushes everything
    // still enqueued before it exits.
    drop(shell);
    drop(console);
    drain.join().ok();
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}
