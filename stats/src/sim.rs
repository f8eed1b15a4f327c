use serde::{Deserialize, Serialize};

/// Top-level timing of one simulated run, as printed in the report header.
///
/// Every field is optional: a label that is absent from the report stays
/// unknown and must never be read as zero.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sim {
    pub instructions: Option<u64>,
    pub cycles: Option<u64>,
    pub ipc: Option<f64>,
    pub time_ns: Option<f64>,
}

impl Sim {
    /// Elapsed simulated time in seconds, `NaN` when unknown.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.time_ns.map_or(f64::NAN, |ns| ns * 1e-9)
    }

    /// Core clock period in nanoseconds (elapsed time over cycle count).
    #[must_use]
    pub fn period_ns(&self) -> Option<f64> {
        match (self.time_ns, self.cycles) {
            (Some(time_ns), Some(cycles)) if cycles > 0 && time_ns > 0.0 => {
                Some(time_ns / cycles as f64)
            }
            _ => None,
        }
    }
}
