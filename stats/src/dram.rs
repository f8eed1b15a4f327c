use serde::{Deserialize, Serialize};

/// Average DRAM access latency exactly as the report states it.
///
/// The unit is kept verbatim, no conversion is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Latency {
    pub value: f64,
    pub unit: Option<String>,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct DRAM {
    pub accesses: Option<u64>,
    pub latency: Option<Latency>,
}
