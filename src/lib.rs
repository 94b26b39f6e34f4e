pub mod classifier;
pub mod commands;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod models;
pub mod overlay;
pub mod platform;
pub mod remote;
pub mod service;
pub mod status;
pub mod validation;
pub mod watcher;

mod test_utils;

use log::warn;
use std::sync::{Mutex, MutexGuard};

pub use error::GuardError;

/// Lock a mutex, recovering from poisoning if necessary
pub(crate) fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("{context} mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
