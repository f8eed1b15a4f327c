//! LLC energy and ED²P.
//!
//! Event energies are in nJ, leakage power in W, time in s and total
//! energies in J. Unknown values are `NaN` and propagate through every
//! derived figure, except leakage which counts as zero for unknown time.

use super::constants::EnergyConstants;
use super::reconcile::ReconciledCounts;
use serde::Serialize;

pub const NJ_TO_J: f64 = 1e-9;

/// Fixed scope of every energy figure.
pub const ENERGY_SCOPE: &str = "LLC only";

/// How the energy of a run was derived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::IntoStaticStr, strum::Display,
)]
pub enum Provenance {
    /// Exact counts that were consistent.
    #[serde(rename = "exact")]
    #[strum(serialize = "exact")]
    Exact,
    /// No usable statistics store, bounds only.
    #[serde(rename = "bounds-only")]
    #[strum(serialize = "bounds-only")]
    BoundsOnly,
    /// Exact counts after reconciling unclassified hits.
    #[serde(rename = "exact-reconciled")]
    #[strum(serialize = "exact-reconciled")]
    ExactReconciled,
}

/// Consistency note of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    StoreMissing,
    /// The store lacks counters needed for exact figures.
    StoreIncomplete,
    Ok,
    Reconciled { gap: u64, coherency: u64, split: u64 },
    Surplus(u64),
}

impl Note {
    /// Note for reconciled counts, with mismatches up to `tolerance` hits
    /// considered consistent.
    #[must_use]
    pub fn for_counts(counts: &ReconciledCounts, tolerance: u64) -> Self {
        if counts.mismatch() <= tolerance {
            Self::Ok
        } else if counts.surplus > 0 {
            Self::Surplus(counts.surplus)
        } else {
            Self::Reconciled {
                gap: counts.gap,
                coherency: counts.coherency,
                split: counts.split,
            }
        }
    }

    #[must_use]
    pub fn provenance(&self) -> Provenance {
        match self {
            Self::StoreMissing | Self::StoreIncomplete => Provenance::BoundsOnly,
            Self::Ok => Provenance::Exact,
            Self::Reconciled { .. } | Self::Surplus(_) => Provenance::ExactReconciled,
        }
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::StoreMissing => write!(f, "store-missing"),
            Self::StoreIncomplete => write!(f, "store-incomplete"),
            Self::Ok => write!(f, "ok"),
            Self::Reconciled {
                gap,
                coherency,
                split,
            } => write!(f, "reconciled(gap={gap}, coherency={coherency}, split={split})"),
            Self::Surplus(surplus) => write!(f, "surplus({surplus})"),
        }
    }
}

/// A `(low, high)` pair with `low <= high`, or both `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    #[must_use]
    pub fn ordered(a: f64, b: f64) -> Self {
        if a.is_nan() || b.is_nan() {
            return Self::unknown();
        }
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self {
            low: f64::NAN,
            high: f64::NAN,
        }
    }

    #[must_use]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::ordered(f(self.low), f(self.high))
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

fn count(value: Option<u64>) -> f64 {
    value.map_or(f64::NAN, |value| value as f64)
}

/// Leakage energy in J, zero if the elapsed time is unknown.
#[must_use]
pub fn leakage_j(leakage_w: f64, time_s: f64) -> f64 {
    if time_s.is_nan() {
        0.0
    } else {
        leakage_w * time_s
    }
}

/// Energy-delay-squared product in J·s².
#[must_use]
pub fn ed2p(energy_j: f64, time_s: f64) -> f64 {
    if energy_j.is_nan() || time_s.is_nan() {
        return f64::NAN;
    }
    energy_j * time_s * time_s
}

/// Dynamic energy in nJ with every hit costed as a read and as a write.
#[must_use]
pub fn dynamic_bounds_nj(
    constants: &EnergyConstants,
    accesses: Option<u64>,
    misses: Option<u64>,
) -> Bounds {
    let hits = match (accesses, misses) {
        (Some(accesses), Some(misses)) => Some(accesses.saturating_sub(misses)),
        _ => None,
    };
    let (hits, misses) = (count(hits), count(misses));
    let hits_as_reads = constants.read_hit_nj * hits + constants.miss_nj * misses;
    let hits_as_writes = constants.write_hit_nj * hits + constants.miss_nj * misses;
    Bounds::ordered(hits_as_reads, hits_as_writes)
}

/// Dynamic energy in nJ of the reconciled counts.
#[must_use]
pub fn exact_dynamic_nj(constants: &EnergyConstants, hits: &ReconciledCounts, misses: u64) -> f64 {
    constants.read_hit_nj * hits.read_hits as f64
        + constants.write_hit_nj * hits.write_hits as f64
        + constants.miss_nj * misses as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exact {
    pub dynamic_nj: f64,
    pub total_j: f64,
    pub ed2p: f64,
}

/// Energy figures of one technology on one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyResult {
    pub time_s: f64,
    pub leakage_w: f64,
    pub leakage_j: f64,
    pub dynamic_nj: Bounds,
    pub total_j: Bounds,
    pub ed2p: Bounds,
    pub exact: Option<Exact>,
    #[serde(skip)]
    pub note: Note,
    pub provenance: Provenance,
}

/// Counts the energy model is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counts<'a> {
    /// Coarse report counts, either may be unknown.
    Coarse {
        accesses: Option<u64>,
        misses: Option<u64>,
    },
    /// Store counts that could not be reconciled, either may be unknown.
    Incomplete {
        accesses: Option<u64>,
        misses: Option<u64>,
    },
    /// Exact store counts with their reconciliation.
    Exact {
        accesses: u64,
        misses: u64,
        reconciled: &'a ReconciledCounts,
        note: Note,
    },
}

/// Evaluates the energy model for one run.
#[must_use]
pub fn estimate(constants: &EnergyConstants, time_s: f64, counts: Counts<'_>) -> EnergyResult {
    let leakage_j = leakage_j(constants.leakage_w, time_s);
    let (accesses, misses) = match counts {
        Counts::Coarse { accesses, misses } | Counts::Incomplete { accesses, misses } => {
            (accesses, misses)
        }
        Counts::Exact {
            accesses, misses, ..
        } => (Some(accesses), Some(misses)),
    };
    let dynamic_nj = dynamic_bounds_nj(constants, accesses, misses);
    let total_j = dynamic_nj.map(|dynamic| dynamic * NJ_TO_J + leakage_j);
    let ed2p_bounds = total_j.map(|energy| ed2p(energy, time_s));

    let (exact, note) = match counts {
        Counts::Coarse { .. } => (None, Note::StoreMissing),
        Counts::Incomplete { .. } => (None, Note::StoreIncomplete),
        Counts::Exact {
            misses,
            reconciled,
            note,
            ..
        } => {
            let dynamic_nj = exact_dynamic_nj(constants, reconciled, misses);
            let total_j = dynamic_nj * NJ_TO_J + leakage_j;
            let exact = Exact {
                dynamic_nj,
                total_j,
                ed2p: ed2p(total_j, time_s),
            };
            (Some(exact), note)
        }
    };

    EnergyResult {
        time_s,
        leakage_w: constants.leakage_w,
        leakage_j,
        dynamic_nj,
        total_j,
        ed2p: ed2p_bounds,
        exact,
        note,
        provenance: note.provenance(),
    }
}
