//! Deferred release of foreign handles.
//!
//! A host-side [`ValueReference`] must release its foreign handle once
//! no host code can reach it anymore, but the release itself cannot run
//! on the dropping thread: the engine tolerates only one in-flight call
//! per context, and a value can be dropped on any thread, including one
//! that already holds the session lock. The monitor moves the release
//! onto a dedicated thread: each tracked value holds a [`DropGuard`]
//! whose `Drop` pushes the value's id onto a channel, and the monitor
//! loop consumes ids with a bounded wait and runs the registered
//! cleanup exactly once per id.
//!
//! The guard carries only the channel sender and the raw id, never the
//! cleanup or the tracked value, so tracking cannot keep a value alive.
//!
//! [`ValueReference`]: crate::ValueReference

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use pontoon_engine::{EngineError, EngineResult};
use tracing::{debug, error};

/// Release action registered alongside a tracked value. Must capture
/// the raw handle scalar, never the value itself.
pub type CleanUpAction = Box<dyn FnOnce() + Send>;

/// Default pause between wake-ups of the monitor loop when no
/// notification is pending.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

static MONITOR_ID: AtomicUsize = AtomicUsize::new(0);

/// One live-set entry: a monotonic session-scoped id paired with the
/// cleanup to run once the id's owner is dropped.
struct NativeReference {
    id: u64,
    clean_up: CleanUpAction,
}

impl NativeReference {
    /// Runs the cleanup, containing a panic to this one entry so the
    /// monitor loop survives a failing action.
    fn clean_up(self) {
        let id = self.id;
        if let Err(panic) = catch_unwind(AssertUnwindSafe(self.clean_up)) {
            let message = panic_message(&panic);
            error!(id, %message, "cleanup action failed; entry discarded");
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Dropped-value notification. Held by the tracked value; sending the
/// id is the only thing it ever does.
pub struct DropGuard {
    id: u64,
    tx: Sender<u64>,
}

impl DropGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        // Receiver gone means the monitor already drained; nothing to do.
        let _ = self.tx.send(self.id);
    }
}

struct MonitorShared {
    next_id: AtomicU64,
    interrupted: AtomicBool,
    live: Mutex<HashMap<u64, NativeReference>>,
}

impl MonitorShared {
    /// Removes and runs the entry for `id`. Removal is the at-most-once
    /// gate: a second notification for the same id finds nothing.
    fn clean(&self, id: u64) {
        let entry = self.live.lock().remove(&id);
        if let Some(entry) = entry {
            entry.clean_up();
        }
    }
}

/// Background worker that releases foreign handles for values the host
/// no longer reaches. One per session.
///
/// State machine: Created → Running → Interrupted → Stopped, never
/// back. [`track`] is legal in any state; after interruption the entry
/// is only released by the shutdown drain.
///
/// [`track`]: ReferenceMonitor::track
pub struct ReferenceMonitor {
    shared: Arc<MonitorShared>,
    tx: Sender<u64>,
    rx: Mutex<Option<Receiver<u64>>>,
    poll_interval: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ReferenceMonitor {
    /// Monitor with the default poll interval.
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// `poll_interval` bounds how long the loop sleeps with nothing
    /// pending, and therefore how promptly it observes an interrupt.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        let (tx, rx) = unbounded();
        Self {
            shared: Arc::new(MonitorShared {
                next_id: AtomicU64::new(0),
                interrupted: AtomicBool::new(false),
                live: Mutex::new(HashMap::new()),
            }),
            tx,
            rx: Mutex::new(Some(rx)),
            poll_interval,
            thread: Mutex::new(None),
        }
    }

    /// Spawns the monitor thread. Calling again after a successful
    /// start is a no-op.
    pub fn start(&self) -> EngineResult<()> {
        let Some(rx) = self.rx.lock().take() else {
            return Ok(());
        };
        let shared = self.shared.clone();
        let poll_interval = self.poll_interval;
        let name = format!(
            "reference-monitor-{}",
            MONITOR_ID.fetch_add(1, Ordering::Relaxed)
        );
        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || run(shared, rx, poll_interval))
            .map_err(|e| EngineError::Internal(format!("failed to spawn monitor thread: {e}")))?;
        *self.thread.lock() = Some(handle);
        Ok(())
    }

    /// Registers `clean_up` to run once the returned guard is dropped.
    /// Callable from any thread. The action must not reach back to the
    /// tracked value; capture the raw handle instead.
    pub fn track(&self, clean_up: CleanUpAction) -> DropGuard {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared
            .live
            .lock()
            .insert(id, NativeReference { id, clean_up });
        DropGuard {
            id,
            tx: self.tx.clone(),
        }
    }

    /// Signals the loop to stop. Idempotent; does not force cleanup of
    /// entries whose owners are still alive — those run in the shutdown
    /// drain when the loop observes the flag.
    pub fn interrupt(&self) {
        self.shared.interrupted.store(true, Ordering::SeqCst);
    }

    /// Waits for the loop to observe the interrupt and finish its
    /// drain. A panic on the monitor thread is swallowed: the caller is
    /// releasing the whole context regardless.
    pub fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            error!("monitor thread terminated abnormally");
        }
    }

    /// Number of tracked values whose cleanup has not run yet.
    pub fn live_count(&self) -> usize {
        self.shared.live.lock().len()
    }
}

impl Default for ReferenceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn run(shared: Arc<MonitorShared>, rx: Receiver<u64>, poll_interval: Duration) {
    debug!("reference monitor running");
    while !shared.interrupted.load(Ordering::SeqCst) {
        match rx.recv_timeout(poll_interval) {
            Ok(id) => shared.clean(id),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Shutdown drain: consume notifications already queued, then run
    // every remaining registered cleanup so the session never leaks
    // foreign handles on close.
    while let Ok(id) = rx.try_recv() {
        shared.clean(id);
    }
    let remaining: Vec<NativeReference> = {
        let mut live = shared.live.lock();
        live.drain().map(|(_, entry)| entry).collect()
    };
    let drained = remaining.len();
    for entry in remaining {
        entry.clean_up();
    }
    debug!(drained, "reference monitor stopped");
}
