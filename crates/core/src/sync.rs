//! Lock helpers.
//!
//! Shared state in this layer (knowledge base, threshold history, ledgers)
//! only ever holds plain data, so a lock poisoned by a panicking writer is
//! still structurally valid. These helpers recover the guard and log a
//! warning instead of propagating the panic into the next turn.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        tracing::warn!(lock = what, "Recovered poisoned read lock");
        poisoned.into_inner()
    })
}

pub fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        tracing::warn!(lock = what, "Recovered poisoned write lock");
        poisoned.into_inner()
    })
}

pub fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!(lock = what, "Recovered poisoned mutex");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn recovers_poisoned_mutex() {
        let shared = Arc::new(Mutex::new(1));
        let clone = shared.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(shared.is_poisoned());
        assert_eq!(*lock(&shared, "test"), 1);
    }

    #[test]
    fn read_and_write_roundtrip() {
        let lock_ = RwLock::new(vec![1]);
        write(&lock_, "test").push(2);
        assert_eq!(read(&lock_, "test").len(), 2);
    }
}
