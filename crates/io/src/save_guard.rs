//! Non-reentrant save gate.
//!
//! A periodic auto-save and a manual save can race. Whoever takes the guard
//! first saves; anyone arriving while it is held is turned away instead of
//! queueing behind it.

use parking_lot::Mutex;

use crate::error::CodecError;

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome<T> {
    Saved(T),
    /// Another save held the guard; nothing was done.
    SaveSkipped,
}

impl<T> SaveOutcome<T> {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

#[derive(Debug, Default)]
pub struct SaveGuard {
    lock: Mutex<()>,
}

impl SaveGuard {
    pub fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }

    pub fn is_saving(&self) -> bool {
        self.lock.is_locked()
    }

    /// Run `save` unless another save is in flight.
    pub fn try_save<T, E>(&self, save: impl FnOnce() -> Result<T, E>) -> Result<SaveOutcome<T>, E> {
        let Some(_held) = self.lock.try_lock() else {
            log::debug!("save already in progress, skipping");
            return Ok(SaveOutcome::SaveSkipped);
        };
        save().map(SaveOutcome::Saved)
    }

    /// Like [`SaveGuard::try_save`], but a busy guard is an error. For
    /// user-initiated saves that must not silently do nothing.
    pub fn save_now<T>(&self, save: impl FnOnce() -> Result<T, CodecError>) -> Result<T, CodecError> {
        match self.try_save(save)? {
            SaveOutcome::Saved(value) => Ok(value),
            SaveOutcome::SaveSkipped => Err(CodecError::SaveInProgress),
        }
    }
}
