//! Per-key read/write guard (RAII mode).
//!
//! A single status word per key: `0` free, `n > 0` held by `n` readers,
//! `-1` held by one writer. Acquisition never blocks; callers decide how many
//! times to retry.

use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

const WRITE_LOCKED: i32 = -1;

#[derive(Debug, Default)]
pub struct KeyLock {
    status: AtomicI32,
}

impl KeyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared acquisition; fails only while a writer holds the key.
    pub fn try_read(self: &Arc<Self>) -> Option<KeyReadGuard> {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if current == WRITE_LOCKED {
                return None;
            }
            match self.status.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(KeyReadGuard {
                        lock: Arc::clone(self),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Exclusive acquisition; fails while any reader or writer holds the key.
    pub fn try_write(self: &Arc<Self>) -> Option<KeyWriteGuard> {
        self.status
            .compare_exchange(0, WRITE_LOCKED, Ordering::AcqRel, Ordering::Relaxed)
            .ok()
            .map(|_| KeyWriteGuard {
                lock: Arc::clone(self),
            })
    }

    pub fn is_write_locked(&self) -> bool {
        self.status.load(Ordering::Acquire) == WRITE_LOCKED
    }

    pub fn reader_count(&self) -> i32 {
        self.status.load(Ordering::Acquire).max(0)
    }
}

/// Released on drop.
#[derive(Debug)]
pub struct KeyReadGuard {
    lock: Arc<KeyLock>,
}

impl Drop for KeyReadGuard {
    fn drop(&mut self) {
        self.lock.status.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Released on drop.
#[derive(Debug)]
pub struct KeyWriteGuard {
    lock: Arc<KeyLock>,
}

impl Drop for KeyWriteGuard {
    fn drop(&mut self) {
        self.lock.status.store(0, Ordering::Release);
    }
}
