//! Shared presentation state. Locks are short and never held across `.await`.

use parking_lot::Mutex;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Clone of the current value; readers never see a half-applied update.
pub fn snapshot<T: Clone>(state: &Shared<T>) -> T {
    state.lock().clone()
}

/// Swaps in `value` wholesale and returns the previous one.
pub fn replace<T>(state: &Shared<T>, value: T) -> T {
    std::mem::replace(&mut *state.lock(), value)
}
