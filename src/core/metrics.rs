/*!
Operation metrics.

Every facade execution, successful or not, appends an entry to a bounded
ring so observers can inspect recent behavior without unbounded growth.
*/

use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded operation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct OperationMetrics {
    /// Operation kind, e.g. "generateKeyPair"
    pub operation: String,
    /// Name of the algorithm that served the operation
    pub algorithm_name: String,
    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,
    /// Whether the operation succeeded
    pub success: bool,
}

/// Bounded ring of recent operation metrics, oldest entries dropped first
#[derive(Debug)]
pub struct MetricsRing {
    entries: Mutex<VecDeque<OperationMetrics>>,
    capacity: usize,
}

impl MetricsRing {
    /// Create a ring holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest if the ring is full
    pub fn record(&self, metrics: OperationMetrics) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(metrics);
    }

    /// Snapshot of the recorded entries, oldest first
    pub fn snapshot(&self) -> Vec<OperationMetrics> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    /// Number of entries currently retained
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the ring is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
