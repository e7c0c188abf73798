//! Shared append buffer feeding the raw report file.

use std::sync::Mutex;

use crate::observation::FlatObservation;

/// Concurrency-safe buffer of finished observations.
///
/// `append` may be called from any number of request tasks. `drain` takes
/// exactly the rows present when it acquires the lock; rows appended
/// afterwards stay in the buffer.
#[derive(Debug, Default)]
pub struct ObservationBuffer {
    rows: Mutex<Vec<FlatObservation>>,
}

impl ObservationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, row: FlatObservation) {
        self.rows.lock().expect("observation buffer mutex poisoned").push(row);
    }

    /// Remove and return every buffered row, oldest first.
    pub fn drain(&self) -> Vec<FlatObservation> {
        let mut rows = self.rows.lock().expect("observation buffer mutex poisoned");
        std::mem::take(&mut *rows)
    }

    /// Put rows back ahead of anything appended since they were drained.
    pub fn requeue(&self, mut rows: Vec<FlatObservation>) {
        if rows.is_empty() {
            return;
        }
        let mut current = self.rows.lock().expect("observation buffer mutex poisoned");
        rows.append(&mut current);
        *current = rows;
    }

    pub fn len(&self) -> usize {
        self.rows.lock().expect("observation buffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
