//! The append-only output tape.

use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Receives each tape entry as it is appended.
pub trait TapeSink: Send {
    /// Called once per write, in append order.
    fn emit(&mut self, bytes: &[u8]);
}

impl TapeSink for Sender<Vec<u8>> {
    fn emit(&mut self, bytes: &[u8]) {
        // A dropped receiver only stops streaming; the tape keeps the entry.
        let _ = self.send(bytes.to_vec());
    }
}

/// Ordered byte strings written by a run.
#[derive(Default)]
pub struct OutputTape {
    entries: Mutex<Vec<Vec<u8>>>,
    sink: Mutex<Option<Box<dyn TapeSink>>>,
}

impl std::fmt::Debug for OutputTape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputTape")
            .field("entries", &lock(&self.entries).len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl OutputTape {
    /// An empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tape that forwards every append to `sink`.
    pub fn streaming(sink: Box<dyn TapeSink>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Append one entry.
    pub fn append(&self, bytes: &[u8]) {
        trace!("Tape append: {:?}", String::from_utf8_lossy(bytes));
        let mut entries = lock(&self.entries);
        entries.push(bytes.to_vec());
        if let Some(sink) = lock(&self.sink).as_mut() {
            sink.emit(bytes);
        }
    }

    /// Everything appended so far.
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        lock(&self.entries).clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Check if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the entries, leaving the tape empty.
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *lock(&self.entries))
    }
}
