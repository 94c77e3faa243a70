//! Analysis results: level series and statistical verdicts.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `f64` time key with a total order, so it can index a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
pub struct TimeKey(pub f64);

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for TimeKey {
    fn from(t: f64) -> Self {
        TimeKey(t)
    }
}

pub type Series = BTreeMap<TimeKey, f64>;

/// Per-variable time series produced by a simulation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelResult {
    series: BTreeMap<String, Series>,
    max: f64,
}

impl LevelResult {
    pub fn new(series: BTreeMap<String, Series>) -> Self {
        let max = series
            .values()
            .flat_map(|s| s.values().copied())
            .fold(0.0_f64, f64::max);
        Self { series, max }
    }

    /// Value at the greatest time `<= t`. `None` before the first point or
    /// for an unknown id.
    pub fn concentration(&self, id: &str, t: f64) -> Option<f64> {
        self.series
            .get(id)?
            .range(..=TimeKey(t))
            .next_back()
            .map(|(_, v)| *v)
    }

    /// Value recorded exactly at `t`, if any.
    pub fn concentration_if_available(&self, id: &str, t: f64) -> Option<f64> {
        self.series.get(id)?.get(&TimeKey(t)).copied()
    }

    /// Sorted union of every series' time keys.
    pub fn time_indices(&self) -> Vec<f64> {
        let keys: BTreeSet<TimeKey> = self
            .series
            .values()
            .flat_map(|s| s.keys().copied())
            .collect();
        keys.into_iter().map(|k| k.0).collect()
    }

    pub fn reactant_ids(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }

    pub fn series(&self, id: &str) -> Option<&Series> {
        self.series.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn maximum_value(&self) -> f64 {
        self.max
    }

    /// Keep only the series whose id is in `ids`.
    pub fn filter<S: AsRef<str>>(&self, ids: &[S]) -> LevelResult {
        let wanted: BTreeSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        let kept = self
            .series
            .iter()
            .filter(|(id, _)| wanted.contains(id.as_str()))
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();
        LevelResult::new(kept)
    }

    /// Split into `(primary, secondary)`: ids in `only_in_second` go to the
    /// secondary block, everything else to the primary one.
    pub fn split<S: AsRef<str>>(&self, only_in_second: &[S]) -> (LevelResult, LevelResult) {
        let second: BTreeSet<&str> = only_in_second.iter().map(AsRef::as_ref).collect();
        let (b, a): (BTreeMap<_, _>, BTreeMap<_, _>) = self
            .series
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .partition(|(id, _)| second.contains(id.as_str()));
        (LevelResult::new(a), LevelResult::new(b))
    }
}

impl Serialize for LevelResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat: BTreeMap<&str, Vec<(f64, f64)>> = self
            .series
            .iter()
            .map(|(id, s)| (id.as_str(), s.iter().map(|(t, v)| (t.0, *v)).collect()))
            .collect();
        flat.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LevelResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flat = BTreeMap::<String, Vec<(f64, f64)>>::deserialize(deserializer)?;
        let series = flat
            .into_iter()
            .map(|(id, points)| {
                let s = points.into_iter().map(|(t, v)| (TimeKey(t), v)).collect();
                (id, s)
            })
            .collect();
        Ok(LevelResult::new(series))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmcVerdict {
    Boolean(bool),
    Interval { lower: f64, upper: f64 },
}

/// Answer to a statistical query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmcResult {
    pub verdict: SmcVerdict,
    pub confidence: f64,
}

impl SmcResult {
    pub fn boolean(value: bool, confidence: f64) -> Self {
        Self {
            verdict: SmcVerdict::Boolean(value),
            confidence,
        }
    }

    pub fn interval(lower: f64, upper: f64, confidence: f64) -> Self {
        Self {
            verdict: SmcVerdict::Interval { lower, upper },
            confidence,
        }
    }
}

impl fmt::Display for SmcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            SmcVerdict::Boolean(true) => write!(f, "TRUE")?,
            SmcVerdict::Boolean(false) => write!(f, "FALSE")?,
            SmcVerdict::Interval { lower, upper } => write!(f, "Pr in [{lower}, {upper}]")?,
        }
        write!(f, " with confidence {}", self.confidence)
    }
}
