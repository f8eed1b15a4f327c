pub mod cache;
pub mod dram;
pub mod sim;

pub use cache::{EventCounts, HitSplit, LatencyBuckets, Metric};
pub use dram::DRAM;
pub use sim::Sim;

use serde::{Deserialize, Serialize};

/// Fields extracted from one simulator text report.
///
/// Produced once per run and never mutated afterwards.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub sim: Sim,
    pub l3: cache::Summary,
    pub dram: DRAM,
}

/// Everything the statistics store yields for one run.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub counts: EventCounts,
    pub latency: LatencyBuckets,
}
