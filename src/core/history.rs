//! Bounded ledger of past "apply schedule" outcomes.

use std::cmp::Ordering;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::model::{ScheduleVector, UNBOUNDED};

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub schedule: ScheduleVector,
    pub achieved_probability: f64,
    pub wasted_exp: f64,
    pub wasted_tuner: f64,
}

/// Which wasted-resource column the ledger is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySortKey {
    #[default]
    Exp,
    Tuner,
}

impl HistorySortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "exp" => Some(HistorySortKey::Exp),
            "b" | "tuner" => Some(HistorySortKey::Tuner),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            HistorySortKey::Exp => HistorySortKey::Tuner,
            HistorySortKey::Tuner => HistorySortKey::Exp,
        }
    }

    fn value(self, e: &HistoryEntry) -> f64 {
        match self {
            HistorySortKey::Exp => e.wasted_exp,
            HistorySortKey::Tuner => e.wasted_tuner,
        }
    }
}

/// Ascending order with the unbounded sentinel last. Two unbounded values
/// compare equal, and so do incomparable ones.
pub fn cmp_wasted(a: f64, b: f64) -> Ordering {
    match (a == UNBOUNDED, b == UNBOUNDED) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Newest-first ring of history entries, capped at [`HISTORY_CAPACITY`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    #[serde(default)]
    next_id: u64,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insertion order, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Record a new outcome at the head, evicting the oldest past capacity.
    /// Returns the assigned id.
    pub fn record(
        &mut self,
        schedule: ScheduleVector,
        achieved_probability: f64,
        wasted_exp: f64,
        wasted_tuner: f64,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_front(HistoryEntry {
            id,
            schedule,
            achieved_probability,
            wasted_exp,
            wasted_tuner,
        });
        self.entries.truncate(HISTORY_CAPACITY);
        tracing::debug!(id, len = self.entries.len(), "history entry recorded");
        id
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!(dropped = self.entries.len(), "history cleared");
        }
        self.entries.clear();
    }

    /// Entries ordered ascending by the chosen column, unbounded last. Stable,
    /// so ties keep newest-first order.
    pub fn sorted_view(&self, key: HistorySortKey) -> Vec<&HistoryEntry> {
        let mut view: Vec<&HistoryEntry> = self.entries.iter().collect();
        view.sort_by(|a, b| cmp_wasted(key.value(a), key.value(b)));
        view
    }
}
