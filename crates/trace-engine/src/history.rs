//! Bounded per-application capture history.

use std::collections::{HashMap, VecDeque};

use profd_trace_model::record::CaptureRecord;

/// Captures remembered per application before the oldest is overwritten.
pub const MAX_CAPTURES_PER_APP: usize = 10;

/// Fixed-capacity ring of capture records, oldest first.
#[derive(Debug, Clone)]
pub struct CaptureRing {
    records: VecDeque<CaptureRecord>,
    capacity: usize,
}

impl CaptureRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, silently evicting the oldest one when full.
    pub fn push(&mut self, record: CaptureRecord) -> &mut CaptureRecord {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    pub fn latest(&self) -> Option<&CaptureRecord> {
        self.records.back()
    }

    pub fn latest_mut(&mut self) -> Option<&mut CaptureRecord> {
        self.records.back_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptureRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Application name -> ring of its most recent captures.
///
/// Not synchronized; the trace manager owns it behind its lock.
#[derive(Debug, Clone)]
pub struct CaptureHistory {
    apps: HashMap<String, CaptureRing>,
    capacity: usize,
}

impl Default for CaptureHistory {
    fn default() -> Self {
        Self::with_capacity(MAX_CAPTURES_PER_APP)
    }
}

impl CaptureHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            apps: HashMap::new(),
            capacity,
        }
    }

    /// Record a new capture, creating the application's ring on first use.
    pub fn push(&mut self, record: CaptureRecord) -> &mut CaptureRecord {
        let capacity = self.capacity;
        self.apps
            .entry(record.app_name.clone())
            .or_insert_with(|| CaptureRing::new(capacity))
            .push(record)
    }

    pub fn ring(&self, app_name: &str) -> Option<&CaptureRing> {
        self.apps.get(app_name)
    }

    /// The most recent capture of `app_name` if it is still open.
    pub fn ongoing(&self, app_name: &str) -> Option<&CaptureRecord> {
        self.apps
            .get(app_name)
            .and_then(CaptureRing::latest)
            .filter(|record| record.is_open())
    }

    pub fn ongoing_mut(&mut self, app_name: &str) -> Option<&mut CaptureRecord> {
        self.apps
            .get_mut(app_name)
            .and_then(CaptureRing::latest_mut)
            .filter(|record| record.is_open())
    }

    pub fn find_mut(&mut self, app_name: &str, trace_id: i64) -> Option<&mut CaptureRecord> {
        self.apps
            .get_mut(app_name)?
            .records
            .iter_mut()
            .rev()
            .find(|record| record.trace_id == trace_id)
    }
}
