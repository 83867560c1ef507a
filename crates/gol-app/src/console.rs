//! Asynchronous console pipeline.
//!
//! Producers on any task format into a fixed-capacity message and enqueue it
//! by value with a non-blocking send; when the bounded queue is full the
//! message is dropped and counted, never blocking the caller. A dedicated
//! drain thread is the only writer to the output sink, taking the sink mutex
//! per message so output from different producers is never interleaved
//! mid-message.

use crossfire::{MTx, Rx, TrySendError, detect_backoff_cfg, mpsc};
use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::tasks::CONSOLE_STACK;

/// Payload capacity of one console message in bytes.
pub const MESSAGE_CAPACITY: usize = 256;

/// A bounded-length text message, enqueued by value so the producer can
/// reuse its formatting state immediately after the send.
#[derive(Clone, Copy)]
pub struct ConsoleMessage {
    len: usize,
    payload: [u8; MESSAGE_CAPACITY],
}

impl ConsoleMessage {
    fn empty() -> Self {
        Self {
            len: 0,
            payload: [0; MESSAGE_CAPACITY],
        }
    }

    pub fn text(&self) -> &str {
        // The writer only ever appends on char boundaries.
        std::str::from_utf8(&self.payload[..self.len]).unwrap_or_default()
    }
}

/// `fmt::Write` adapter that truncates at the message capacity instead of
/// overflowing, backing off to a char boundary at the cut.
struct MessageWriter<'a> {
    msg: &'a mut ConsoleMessage,
}

impl fmt::Write for MessageWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = MESSAGE_CAPACITY - self.msg.len;
        if remaining == 0 {
            return Ok(());
        }
        let mut take = s.len().min(remaining);
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }
        self.msg.payload[self.msg.len..self.msg.len + take]
            .copy_from_slice(&s.as_bytes()[..take]);
        self.msg.len += take;
        Ok(())
    }
}

/// The shared producer side of the pipeline plus the drop counter.
pub struct Console {
    tx: MTx<ConsoleMessage>,
    rx: Mutex<Option<Rx<ConsoleMessage>>>,
    dropped: AtomicU64,
}

impl Console {
    /// Builds the pipeline with a fixed queue depth. The queue never grows;
    /// overflow is shed by dropping.
    pub fn new(depth: usize) -> Self {
        detect_backoff_cfg();
        let (tx, rx) = mpsc::bounded_blocking(depth);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Formats and enqueues a message. Never blocks: a full queue increments
    /// the drop counter and the call returns.
    pub fn say(&self, args: fmt::Arguments<'_>) {
        let mut msg = ConsoleMessage::empty();
        // The writer is infallible; truncation is not an error.
        let _ = MessageWriter { msg: &mut msg }.write_fmt(args);
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Messages rejected so far. Eventually consistent; no locking.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Starts the dedicated drain thread writing to `sink`. The thread
    /// suspends on an empty queue and exits once every producer handle is
    /// gone.
    pub fn spawn_drain<W>(&self, sink: Arc<Mutex<W>>) -> io::Result<JoinHandle<()>>
    where
        W: Write + Send + 'static,
    {
        let Some(rx) = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "console drain already running",
            ));
        };
        thread::Builder::new()
            .name("console-drain".into())
            .stack_size(CONSOLE_STACK)
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    let mut out = sink.lock().unwrap_or_else(PoisonError::into_inner);
                    if out
                        .write_all(msg.text().as_bytes())
                        .and_then(|()| out.flush())
                        .is_err()
                    {
                        break;
                    }
                }
            })
    }
}

/// Formats and enqueues one newline-terminated console line.
#[macro_export]
macro_rules! cprintln {
    ($console:expr, $($arg:tt)*) => {
        $console.say(::std::format_args!("{}\n", ::std::format_args!($($arg)*)))
    };
}
