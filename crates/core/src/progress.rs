//! Progress snapshots reported by operations.

use serde::{Deserialize, Serialize};

/// A snapshot of how far an operation has advanced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Progress {
    /// The operation cannot tell how much work remains
    Indeterminate,
    /// Fraction of work done, in `[0.0, 1.0]`
    Fraction(f64),
}

impl Progress {
    /// Progress of finished work.
    pub fn completed() -> Self {
        Progress::Fraction(1.0)
    }

    /// Progress of work whose size is unknown.
    pub fn indeterminate() -> Self {
        Progress::Indeterminate
    }

    /// Progress at the given fraction. Out of range values are clamped and
    /// NaN is treated as indeterminate.
    pub fn of(fraction: f64) -> Self {
        if fraction.is_nan() {
            Progress::Indeterminate
        } else {
            Progress::Fraction(fraction.clamp(0.0, 1.0))
        }
    }

    /// Whether the snapshot reports finished work.
    pub fn is_completed(&self) -> bool {
        matches!(self, Progress::Fraction(f) if *f >= 1.0)
    }

    /// Whether the snapshot carries no fraction.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Progress::Indeterminate)
    }

    /// The fraction done, if known.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Progress::Indeterminate => None,
            Progress::Fraction(f) => Some(*f),
        }
    }

    /// Average of several snapshots, each weighted equally.
    ///
    /// Any indeterminate member makes the whole average indeterminate. An
    /// empty input counts as completed.
    pub fn average<I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = Progress>,
    {
        let mut total = 0.0;
        let mut count = 0usize;
        for snapshot in snapshots {
            match snapshot.fraction() {
                Some(f) => total += f,
                None => return Progress::Indeterminate,
            }
            count += 1;
        }

        if count == 0 {
            Progress::completed()
        } else {
            Progress::of(total / count as f64)
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Progress::Indeterminate
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Progress::Indeterminate => write!(f, "?"),
            Progress::Fraction(fraction) => write!(f, "{:.1}%", fraction * 100.0),
        }
    }
}
