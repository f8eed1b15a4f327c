//! Average LLC hit latency from configured cycle costs.

use super::reconcile::ReconciledCounts;
use serde::Serialize;
use sniper::config::Config;
use stats::HitSplit;

/// Read and write hit costs of one access path, in core cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CycleCosts {
    pub read: Option<u32>,
    pub write: Option<u32>,
}

impl CycleCosts {
    fn from_config(config: &Config, prefix: &str) -> Self {
        Self {
            read: config.get_u32(&format!("{prefix}/read_hit_latency_cycles")),
            write: config.get_u32(&format!("{prefix}/write_hit_latency_cycles")),
        }
    }
}

/// Hit costs of the local LLC and of the forwarded (next read) path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct HitCycles {
    pub local: CycleCosts,
    pub forwarded: CycleCosts,
}

/// Hit-mix weighted cycle costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectiveCycles {
    pub read: f64,
    pub write: f64,
}

fn blend(local: Option<u32>, forwarded: Option<u32>, local_fraction: f64) -> Option<f64> {
    match (local, forwarded) {
        (Some(local), Some(forwarded)) => Some(
            local_fraction * f64::from(local) + (1.0 - local_fraction) * f64::from(forwarded),
        ),
        (Some(cycles), None) | (None, Some(cycles)) => Some(f64::from(cycles)),
        (None, None) => None,
    }
}

impl HitCycles {
    /// Reads `<namespace>/llc/*_hit_latency_cycles` and the forwarded
    /// variants under `<namespace>/next_read/`.
    #[must_use]
    pub fn from_config(config: &Config, namespace: &str) -> Self {
        Self {
            local: CycleCosts::from_config(config, &format!("{namespace}/llc")),
            forwarded: CycleCosts::from_config(config, &format!("{namespace}/next_read")),
        }
    }

    /// Cycle costs for the given hit mix, `None` if a read or write cost
    /// is not configured on any path.
    #[must_use]
    pub fn effective(&self, split: &HitSplit) -> Option<EffectiveCycles> {
        let local_fraction = split.local_fraction();
        Some(EffectiveCycles {
            read: blend(self.local.read, self.forwarded.read, local_fraction)?,
            write: blend(self.local.write, self.forwarded.write, local_fraction)?,
        })
    }
}

/// Average hit latency in ns.
///
/// Unknown without hits, without configured costs or without a core period.
#[must_use]
pub fn average_hit_latency_ns(
    cycles: &EffectiveCycles,
    hits: &ReconciledCounts,
    period_ns: Option<f64>,
) -> Option<f64> {
    let period_ns = period_ns.filter(|period| *period > 0.0)?;
    let total = hits.hits();
    if total == 0 {
        return None;
    }
    let weighted =
        hits.read_hits as f64 * cycles.read + hits.write_hits as f64 * cycles.write;
    Some(weighted * period_ns / total as f64)
}
