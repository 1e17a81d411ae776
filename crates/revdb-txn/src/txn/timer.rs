//! Background thread for interval auto-commit.

use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use revdb_storage::record::NodeRecord;
use tracing::debug;

use super::write::WriterShared;

/// Calls the writer's commit every `interval` until stopped or the writer
/// goes away.
pub(crate) struct AutoCommitTimer {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl AutoCommitTimer {
    pub(crate) fn spawn<N: NodeRecord>(
        writer: Weak<WriterShared<N>>,
        interval: Duration,
    ) -> io::Result<Self> {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("revdb-auto-commit".to_string())
            .spawn(move || run(writer, interval, &signal))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub(crate) fn stop(&mut self) {
        let (flag, wake) = &*self.stop;
        *flag.lock() = true;
        wake.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AutoCommitTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<N: NodeRecord>(
    writer: Weak<WriterShared<N>>,
    interval: Duration,
    signal: &(Mutex<bool>, Condvar),
) {
    let (flag, wake) = signal;
    let mut stopped = flag.lock();
    while !*stopped {
        if !wake.wait_for(&mut stopped, interval).timed_out() {
            continue;
        }
        let alive = MutexGuard::unlocked(&mut stopped, || match writer.upgrade() {
            Some(writer) => {
                writer.commit_on_interval();
                true
            }
            None => false,
        });
        if !alive {
            break;
        }
    }
    debug!("auto-commit timer stopped");
}
