//! Process-wide library state.
//!
//! The state is built by [`initialize`] and dropped by [`shutdown`]. Both
//! are idempotent and may be called from any thread in any order; every
//! export initializes lazily, so calling them is only needed to control
//! when the work happens.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{self, TypeTag};

pub(crate) struct State {
    native: HashMap<TypeTag, TypeTag>,
}

impl State {
    fn new() -> Self {
        Self {
            native: types::native_table(),
        }
    }

    pub(crate) fn native_type(&self, tag: TypeTag) -> TypeTag {
        self.native.get(&tag).copied().unwrap_or(tag)
    }
}

static STATE: Mutex<Option<State>> = Mutex::new(None);

fn lock() -> MutexGuard<'static, Option<State>> {
    // the state is rebuilt from constants, so a poisoned guard is still usable
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the library state if it does not exist yet.
pub fn initialize() {
    let mut state = lock();
    if state.is_none() {
        *state = Some(State::new());
        log::debug!("h5export library initialized");
    }
}

/// Drop the library state. A later export or [`initialize`] rebuilds it.
pub fn shutdown() {
    if lock().take().is_some() {
        log::debug!("h5export library shut down");
    }
}

pub fn is_initialized() -> bool {
    lock().is_some()
}

/// Run `f` against the state, initializing it first when needed.
pub(crate) fn with_state<R>(f: impl FnOnce(&State) -> R) -> R {
    let mut guard = lock();
    let state = guard.get_or_insert_with(State::new);
    f(state)
}
