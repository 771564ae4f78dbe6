//! Session data model: schedule and weight vectors, candidate profiles and
//! the analysis records the service attaches to them.

use std::ops::Index;

use echotune_geom::{clamp01, normalize3};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Number of level brackets covered by the discard schedule.
pub const BRACKETS: usize = 4;

/// Wasted-resource sentinel the service uses for "never reaches the target".
pub const UNBOUNDED: f64 = -1.0;

/// Display cutoff above which a wasted-resource figure is shown as unbounded.
pub const UNBOUNDED_DISPLAY_CUTOFF: f64 = 1e9;

/// Per-bracket discard thresholds, each kept in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; BRACKETS]", into = "[f64; BRACKETS]")]
pub struct ScheduleVector([f64; BRACKETS]);

impl From<[f64; BRACKETS]> for ScheduleVector {
    fn from(values: [f64; BRACKETS]) -> Self {
        Self::new(values)
    }
}

impl From<ScheduleVector> for [f64; BRACKETS] {
    fn from(s: ScheduleVector) -> Self {
        s.0
    }
}

impl ScheduleVector {
    pub fn new(values: [f64; BRACKETS]) -> Self {
        Self(values.map(clamp01))
    }

    pub fn uniform(value: f64) -> Self {
        Self::new([value; BRACKETS])
    }

    pub fn values(&self) -> [f64; BRACKETS] {
        self.0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// Write one threshold, clamped. `NaN` and out-of-range indices are ignored.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&mut self, index: usize, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let Some(slot) = self.0.get_mut(index) else {
            return false;
        };
        let v = clamp01(value);
        if *slot == v {
            return false;
        }
        *slot = v;
        true
    }

    pub fn set_all(&mut self, values: [f64; BRACKETS]) -> bool {
        let next = Self::new(values);
        let changed = next != *self;
        *self = next;
        changed
    }
}

impl Index<usize> for ScheduleVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// The three resources the optimizer can be asked to economize on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSlot {
    ItemCount,
    Experience,
    Tuner,
}

impl WeightSlot {
    pub const ALL: [WeightSlot; 3] = [WeightSlot::ItemCount, WeightSlot::Experience, WeightSlot::Tuner];

    pub fn index(self) -> usize {
        match self {
            WeightSlot::ItemCount => 0,
            WeightSlot::Experience => 1,
            WeightSlot::Tuner => 2,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            WeightSlot::ItemCount => "items",
            WeightSlot::Experience => "exp",
            WeightSlot::Tuner => "tuner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "items" | "item_count" | "num_echo" => Some(WeightSlot::ItemCount),
            "b" | "exp" | "experience" => Some(WeightSlot::Experience),
            "c" | "tuner" => Some(WeightSlot::Tuner),
            _ => None,
        }
    }
}

/// Normalized three-way apportionment of optimization priority.
///
/// Every constructor and mutator leaves the components nonnegative and summing
/// to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWeights", into = "RawWeights")]
pub struct WeightVector([f64; 3]);

#[derive(Serialize, Deserialize)]
struct RawWeights {
    #[serde(default)]
    item_count: f64,
    #[serde(default)]
    experience: f64,
    #[serde(default)]
    tuner: f64,
}

impl From<RawWeights> for WeightVector {
    fn from(r: RawWeights) -> Self {
        WeightVector::from_raw([r.item_count, r.experience, r.tuner])
    }
}

impl From<WeightVector> for RawWeights {
    fn from(w: WeightVector) -> Self {
        RawWeights {
            item_count: w.0[0],
            experience: w.0[1],
            tuner: w.0[2],
        }
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::from_raw([1.0, 1.0, 1.0])
    }
}

impl WeightVector {
    pub fn from_raw(raw: [f64; 3]) -> Self {
        Self(normalize3(raw))
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    pub fn get(&self, slot: WeightSlot) -> f64 {
        self.0[slot.index()]
    }

    /// Move `delta` of mass from the weight after `boundary` to the weight
    /// before it, starting from `start`.
    ///
    /// Boundary `k` separates slot `k` from slot `(k + 1) % 3`. Both touched
    /// components are clamped to `[0, 1]` before renormalizing.
    pub fn transferred(start: &WeightVector, boundary: usize, delta: f64) -> WeightVector {
        let before = boundary % 3;
        let after = (boundary + 1) % 3;
        let mut w = start.0;
        if delta.is_finite() {
            w[before] = clamp01(start.0[before] + delta);
            w[after] = clamp01(start.0[after] - delta);
        }
        Self::from_raw(w)
    }

    /// Set one component to `value`, rescaling the other two into the
    /// remaining mass in proportion to their current shares.
    ///
    /// If both others are empty the remainder is split equally between them.
    pub fn set_share(&mut self, slot: WeightSlot, value: f64) {
        if value.is_nan() {
            return;
        }
        let v = clamp01(value);
        let i = slot.index();
        let (j, k) = ((i + 1) % 3, (i + 2) % 3);
        let others = self.0[j] + self.0[k];
        let rest = 1.0 - v;
        let mut w = [0.0; 3];
        w[i] = v;
        if others <= echotune_geom::vector::EPSILON {
            w[j] = rest / 2.0;
            w[k] = rest / 2.0;
        } else {
            w[j] = self.0[j] / others * rest;
            w[k] = self.0[k] / others * rest;
        }
        self.0 = normalize3(w);
    }
}

/// A scanned item: its level plus the named entry values read off it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub level: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(flatten)]
    pub entries: HashMap<String, f64>,
}

impl Profile {
    pub fn at_level(level: u32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, key: &str, value: f64) -> Self {
        self.entries.insert(key.to_string(), value);
        self
    }

    /// Non-zero entries sorted by key, for display.
    pub fn sorted_entries(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = self
            .entries
            .iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

/// Per-candidate (or aggregate) result of a full analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Probability of reaching the score threshold at max level, ignoring discards.
    pub prob_above_threshold: f64,
    /// Probability of reaching the threshold when the discard schedule is followed.
    pub prob_above_threshold_with_discard: f64,
    /// Expected total wasted experience (resource A); `-1` when unbounded.
    #[serde(rename = "expected_total_wasted_exp")]
    pub wasted_exp: f64,
    /// Expected total wasted tuners (resource B); `-1` when unbounded.
    #[serde(rename = "expected_total_wasted_tuner")]
    pub wasted_tuner: f64,
    pub score: f64,
    pub expected_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BriefAnalysis {
    pub expected_score: f64,
    pub prob_above_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleProfile {
    pub profile: Profile,
    pub actual_prob: f64,
}

/// Display state of a candidate in the scanned list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStatus {
    /// No analysis yet.
    Pending,
    /// Being advanced by the automation loop.
    Active,
    Eligible,
    Discarded,
    Achieved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub profile: Profile,
    #[serde(skip)]
    pub analysis: Option<Analysis>,
}

impl Candidate {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            analysis: None,
        }
    }

    pub fn level(&self) -> u32 {
        self.profile.level
    }

    pub fn invalidate(&mut self) {
        self.analysis = None;
    }
}

/// Format a wasted-resource figure, mapping the sentinel and huge values to `∞`.
pub fn format_wasted(v: f64) -> String {
    if v == UNBOUNDED || !v.is_finite() || v > UNBOUNDED_DISPLAY_CUTOFF {
        "∞".to_string()
    } else {
        format!("{}", v.round() as i64)
    }
}
