use std::sync::{Mutex, MutexGuard};

/// Lock ignoring poisoning; every guarded value here stays consistent
/// between statements.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}
