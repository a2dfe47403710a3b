//! The append-only request log backing `GET /api/cost/request/{request_id}`
//! (§6). An in-process, bounded-size ring buffer plus an index — the same
//! `Arc<Mutex<HashMap<...>>>` shape the teacher's kv-store example uses for
//! its own storage layer, sized for one gateway process rather than meant
//! to survive a restart.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

const MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub request_id: String,
    pub token_id: u64,
    pub user_id: u64,
    pub group: String,
    pub model: String,
    pub status: u16,
    pub cost: i64,
    pub succeeded: bool,
}

#[derive(Default)]
pub struct RequestLog {
    order: Mutex<VecDeque<String>>,
    entries: Mutex<HashMap<String, LogEntry>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: LogEntry) {
        let mut order = self.order.lock();
        let mut entries = self.entries.lock();

        order.push_back(entry.request_id.clone());
        entries.insert(entry.request_id.clone(), entry);

        while order.len() > MAX_ENTRIES {
            if let Some(oldest) = order.pop_front() {
                entries.remove(&oldest);
            }
        }
    }

    pub fn get(&self, request_id: &str) -> Option<LogEntry> {
        self.entries.lock().get(request_id).cloned()
    }
}
