//! Advisory lock serializing file writes within one process.
//!
//! Two ways in:
//! - [`FileLock::enter`] is reentrant per thread. Nested calls on a thread that
//!   already holds the lock only bump a counter, so helpers can call each other
//!   while holding it (`Logger::log` -> `file_append`).
//! - [`FileLock::lock`] always waits for the underlying lock. Calling it from a
//!   thread that already holds any guard deadlocks.
//!
//! Nothing here coordinates with other processes.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// Counting wrapper over a single mutual-exclusion lock
#[derive(Debug, Default)]
pub struct FileLock {
    state: Mutex<LockState>,
    released: Condvar,
}

/// Held lock; releases one level on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FileGuard<'a> {
    lock: &'a FileLock,
}

impl FileLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        // the state is two plain fields, a panicking holder cannot corrupt it
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self, reentrant: bool) -> FileGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state();
        if reentrant && state.owner == Some(me) {
            state.depth += 1;
            return FileGuard { lock: self };
        }
        while state.owner.is_some() {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.owner = Some(me);
        state.depth = 1;
        FileGuard { lock: self }
    }

    /// Internal acquisition; nested calls on the owning thread do not block.
    pub fn enter(&self) -> FileGuard<'_> {
        self.acquire(true)
    }

    /// External acquisition; always takes the underlying lock.
    pub fn lock(&self) -> FileGuard<'_> {
        self.acquire(false)
    }

    /// Current nesting depth (0 when free).
    pub fn depth(&self) -> usize {
        self.state().depth
    }

    /// True when the calling thread holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state().owner == Some(thread::current().id())
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.state();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.lock.released.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_enter_is_reentrant() {
        let lock = FileLock::new();
        let outer = lock.enter();
        {
            let _inner = lock.enter();
            assert_eq!(lock.depth(), 2);
        }
        assert_eq!(lock.depth(), 1);
        assert!(lock.is_held_by_current_thread());
        drop(outer);
        assert_eq!(lock.depth(), 0);
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn test_enter_inside_external_lock() {
        let lock = FileLock::new();
        let _outer = lock.lock();
        let _inner = lock.enter();
        assert_eq!(lock.depth(), 2);
    }

    #[test]
    fn test_blocks_other_threads() {
        let lock = Arc::new(FileLock::new());
        let acquired = Arc::new(AtomicBool::new(false));

        let guard = lock.lock();
        let handle = {
            let lock = Arc::clone(&lock);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _guard = lock.enter();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(lock.depth(), 0);
    }
}
