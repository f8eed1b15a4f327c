use serde::{Deserialize, Serialize};

/// Coarse per-level cache summary from the text report.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub accesses: Option<u64>,
    pub misses: Option<u64>,
    pub miss_rate_pct: Option<f64>,
}

impl Summary {
    /// Hits implied by the coarse counts, `None` if either count is unknown.
    #[must_use]
    pub fn hits(&self) -> Option<u64> {
        Some(self.accesses?.saturating_sub(self.misses?))
    }
}

/// Counter names of the LLC objects in the statistics store.
#[derive(
    Debug,
    strum::EnumIter,
    strum::IntoStaticStr,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum Metric {
    #[strum(serialize = "loads")]
    Loads,
    #[strum(serialize = "stores")]
    Stores,
    #[strum(serialize = "load-misses")]
    LoadMisses,
    #[strum(serialize = "store-misses")]
    StoreMisses,
    #[strum(serialize = "l3_read_hits")]
    ReadHits,
    #[strum(serialize = "l3_write_hits")]
    WriteHits,
    #[strum(serialize = "l3_writebacks")]
    Writebacks,
    #[strum(serialize = "l3_evictions")]
    Evictions,
    #[strum(serialize = "l3_misses")]
    SecondaryMisses,
    #[strum(serialize = "coherency-upgrades")]
    CoherencyUpgrades,
    #[strum(serialize = "hits-prefetch")]
    PrefetchHits,
    #[strum(serialize = "evict-prefetch")]
    PrefetchEvictions,
    #[strum(serialize = "total-latency")]
    TotalLatency,
    #[strum(serialize = "mshr-latency")]
    MshrLatency,
    #[strum(serialize = "snoop-latency")]
    SnoopLatency,
    #[strum(serialize = "qbs-query-latency")]
    QbsQueryLatency,
    #[strum(serialize = "uncore-requests")]
    UncoreRequests,
}

impl Metric {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Split of classified hits between the local LLC object and any
/// forwarded (remote) sub-slices.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitSplit {
    pub local_read_hits: u64,
    pub local_write_hits: u64,
    pub remote_read_hits: u64,
    pub remote_write_hits: u64,
}

impl HitSplit {
    #[must_use]
    pub fn local(&self) -> u64 {
        self.local_read_hits + self.local_write_hits
    }

    #[must_use]
    pub fn remote(&self) -> u64 {
        self.remote_read_hits + self.remote_write_hits
    }

    /// Fraction of classified hits served locally.
    ///
    /// Without any recorded hits everything counts as local.
    #[must_use]
    pub fn local_fraction(&self) -> f64 {
        let total = self.local() + self.remote();
        if total == 0 {
            1.0
        } else {
            self.local() as f64 / total as f64
        }
    }
}

/// Exact ROI event counts of the LLC.
///
/// Counters the store never recorded are `None`.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    /// loads + stores
    pub accesses: Option<u64>,
    /// load-misses + store-misses
    pub misses: Option<u64>,
    /// local + remote read hits
    pub read_hits: Option<u64>,
    /// local + remote write hits
    pub write_hits: Option<u64>,
    pub writebacks: Option<u64>,
    pub evictions: Option<u64>,
    pub secondary_misses: Option<u64>,
    pub coherency_upgrades: Option<u64>,
    pub prefetch_hits: Option<u64>,
    pub prefetch_evictions: Option<u64>,
    pub hit_split: HitSplit,
}

impl EventCounts {
    /// Total hits, `max(accesses - misses, 0)`.
    #[must_use]
    pub fn hits(&self) -> Option<u64> {
        Some(self.accesses?.saturating_sub(self.misses?))
    }

    /// Hits classified as ordinary read or write hits.
    #[must_use]
    pub fn classified_hits(&self) -> Option<u64> {
        Some(self.read_hits? + self.write_hits?)
    }
}

/// Latency and uncore time buckets of the LLC, summed over the ROI.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatencyBuckets {
    pub total_ns: Option<f64>,
    pub mshr_ns: Option<f64>,
    pub snoop_ns: Option<f64>,
    pub qbs_query_ns: Option<f64>,
    /// sum of all `uncore-time-*` counters
    pub uncore_time_ns: Option<f64>,
    pub uncore_requests: Option<u64>,
}

impl LatencyBuckets {
    #[must_use]
    pub fn avg_uncore_time_per_request_ns(&self) -> Option<f64> {
        match (self.uncore_time_ns, self.uncore_requests) {
            (Some(time), Some(requests)) if requests > 0 => Some(time / requests as f64),
            _ => None,
        }
    }
}
