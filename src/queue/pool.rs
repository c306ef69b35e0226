//! Per-thread cursor pool
//!
//! Every calling thread gets its own write cursor, plain read cursor and
//! replay read cursor, created together on first use. Cursors never move
//! between threads. A thread's set lives until the thread exits, until
//! `release_current`, or until the pool is cleared on close.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::thread::{self, ThreadId};

use super::errors::{QueueError, QueueResult};
use crate::log::{Appender, Log, Tailer};

/// Cursors owned by one thread.
pub struct CursorSet {
    pub appender: Box<dyn Appender>,
    /// Sequential reader used by `consume`
    pub tailer: Box<dyn Tailer>,
    /// Reader used by `next`, `get(index)` and topic scans
    pub replay: Box<dyn Tailer>,
}

impl CursorSet {
    fn create(log: &dyn Log) -> QueueResult<Self> {
        Ok(Self {
            appender: log.create_appender()?,
            tailer: log.create_tailer()?,
            replay: log.create_tailer()?,
        })
    }
}

type SetTable = RwLock<HashMap<ThreadId, Arc<Mutex<CursorSet>>>>;

/// Removes a thread's entry from one pool when the thread exits.
struct ExitGuard {
    thread: ThreadId,
    sets: Weak<SetTable>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let Some(sets) = self.sets.upgrade() else {
            return;
        };
        let removed = match sets.write() {
            Ok(mut sets) => sets.remove(&self.thread),
            Err(_) => None,
        };
        drop(removed);
    }
}

thread_local! {
    static EXIT_GUARDS: RefCell<Vec<ExitGuard>> = RefCell::new(Vec::new());
}

/// Make sure the calling thread's entry in `sets` goes away with the thread.
fn register_exit_guard(thread: ThreadId, sets: &Arc<SetTable>) {
    let weak = Arc::downgrade(sets);
    // Fails only while this thread's locals are being torn down.
    let _ = EXIT_GUARDS.try_with(|guards| {
        let Ok(mut guards) = guards.try_borrow_mut() else {
            return;
        };
        guards.retain(|g| g.sets.strong_count() > 0);
        if !guards.iter().any(|g| Weak::ptr_eq(&g.sets, &weak)) {
            guards.push(ExitGuard {
                thread,
                sets: weak,
            });
        }
    });
}

/// Table of cursor sets keyed by thread.
pub struct CursorPool {
    log: Arc<dyn Log>,
    // The per-set mutex is only ever taken by the owning thread.
    sets: Arc<SetTable>,
}

impl CursorPool {
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self {
            log,
            sets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Run `f` with the calling thread's cursors.
    ///
    /// `f` must not call back into the pool.
    pub fn with_cursors<R>(
        &self,
        f: impl FnOnce(&mut CursorSet) -> QueueResult<R>,
    ) -> QueueResult<R> {
        let set = self.acquire()?;
        let mut cursors = set
            .lock()
            .map_err(|_| QueueError::Internal("Lock poisoned".into()))?;
        f(&mut cursors)
    }

    fn acquire(&self) -> QueueResult<Arc<Mutex<CursorSet>>> {
        let id = thread::current().id();
        {
            let sets = self
                .sets
                .read()
                .map_err(|_| QueueError::Internal("Lock poisoned".into()))?;
            if let Some(set) = sets.get(&id) {
                return Ok(Arc::clone(set));
            }
        }

        let created = Arc::new(Mutex::new(CursorSet::create(self.log.as_ref())?));
        let set = {
            let mut sets = self
                .sets
                .write()
                .map_err(|_| QueueError::Internal("Lock poisoned".into()))?;
            Arc::clone(sets.entry(id).or_insert(created))
        };
        register_exit_guard(id, &self.sets);
        Ok(set)
    }

    /// Drop the calling thread's cursors. Returns whether it had any.
    pub fn release_current(&self) -> bool {
        let id = thread::current().id();
        self.sets
            .write()
            .map(|mut sets| sets.remove(&id).is_some())
            .unwrap_or(false)
    }

    /// Drop every thread's cursors.
    pub fn clear(&self) {
        if let Ok(mut sets) = self.sets.write() {
            sets.clear();
        }
    }

    /// Number of threads holding cursors
    pub fn len(&self) -> usize {
        self.sets.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
