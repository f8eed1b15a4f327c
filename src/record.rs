//! Output rows, one per technology of a comparison.

use super::energy::{Provenance, ENERGY_SCOPE};
use super::{Error, Estimate};
use serde::Serialize;
use std::path::Path;

pub const ENERGY_FILE: &str = "energy_bounds.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

/// `None` for unknown (`NaN`) values, written as empty cells.
fn known(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyRecord {
    pub benchmark: String,
    pub size_m: Option<String>,
    pub technology: String,
    pub time_s: Option<f64>,
    pub l3_accesses: Option<u64>,
    pub l3_misses: Option<u64>,
    pub l3_read_hits: Option<u64>,
    pub l3_write_hits: Option<u64>,
    pub l3_hits_gap: Option<u64>,
    pub l3_writebacks: Option<u64>,
    pub l3_evictions: Option<u64>,
    pub leak_w: f64,
    pub leak_j: f64,
    pub dyn_exact_nj: Option<f64>,
    pub energy_exact_j: Option<f64>,
    pub ed2p_exact_j_s2: Option<f64>,
    pub dyn_lower_nj: Option<f64>,
    pub dyn_upper_nj: Option<f64>,
    pub energy_lower_j: Option<f64>,
    pub energy_upper_j: Option<f64>,
    pub ed2p_lower_j_s2: Option<f64>,
    pub ed2p_upper_j_s2: Option<f64>,
    pub energy_scope: &'static str,
    pub provenance: Provenance,
    pub constants_source: String,
    pub notes: String,
}

impl From<&Estimate> for EnergyRecord {
    fn from(estimate: &Estimate) -> Self {
        let energy = &estimate.energy;
        let counts = estimate.store.as_ref().map(|store| &store.counts);
        let exact = energy.exact.as_ref();
        Self {
            benchmark: estimate.name.benchmark.clone(),
            size_m: estimate.name.size.clone(),
            technology: estimate.technology.clone(),
            time_s: known(energy.time_s),
            l3_accesses: estimate.accesses(),
            l3_misses: estimate.misses(),
            l3_read_hits: estimate.reconciled.map(|hits| hits.read_hits),
            l3_write_hits: estimate.reconciled.map(|hits| hits.write_hits),
            l3_hits_gap: estimate.reconciled.map(|hits| hits.gap),
            l3_writebacks: counts.and_then(|counts| counts.writebacks),
            l3_evictions: counts.and_then(|counts| counts.evictions),
            leak_w: energy.leakage_w,
            leak_j: energy.leakage_j,
            dyn_exact_nj: exact.and_then(|exact| known(exact.dynamic_nj)),
            energy_exact_j: exact.and_then(|exact| known(exact.total_j)),
            ed2p_exact_j_s2: exact.and_then(|exact| known(exact.ed2p)),
            dyn_lower_nj: known(energy.dynamic_nj.low),
            dyn_upper_nj: known(energy.dynamic_nj.high),
            energy_lower_j: known(energy.total_j.low),
            energy_upper_j: known(energy.total_j.high),
            ed2p_lower_j_s2: known(energy.ed2p.low),
            ed2p_upper_j_s2: known(energy.ed2p.high),
            energy_scope: ENERGY_SCOPE,
            provenance: energy.provenance,
            constants_source: estimate.constants.origin.to_string(),
            notes: energy.note.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub benchmark: String,
    pub size_m: Option<String>,
    pub technology: String,
    pub run_dir: String,
    // report
    pub instructions: Option<u64>,
    pub cycles: Option<u64>,
    pub ipc: Option<f64>,
    pub time_ns: Option<f64>,
    pub l3_acc_report: Option<u64>,
    pub l3_miss_report: Option<u64>,
    pub l3_miss_rate_pct: Option<f64>,
    pub dram_acc: Option<u64>,
    pub dram_lat_value: Option<f64>,
    pub dram_lat_unit: Option<String>,
    // store
    pub l3_accesses_db: Option<u64>,
    pub l3_misses_db: Option<u64>,
    pub l3_read_hits_db: Option<u64>,
    pub l3_write_hits_db: Option<u64>,
    pub l3_remote_hits_db: Option<u64>,
    pub l3_writebacks: Option<u64>,
    pub l3_evictions: Option<u64>,
    pub l3_misses_secondary: Option<u64>,
    pub l3_coherency_upgrades: Option<u64>,
    pub l3_prefetch_hits: Option<u64>,
    pub l3_prefetch_evictions: Option<u64>,
    pub l3_total_latency_ns: Option<f64>,
    pub l3_mshr_latency_ns: Option<f64>,
    pub l3_snoop_latency_ns: Option<f64>,
    pub l3_qbs_latency_ns: Option<f64>,
    pub l3_uncore_time_ns: Option<f64>,
    pub l3_uncore_requests: Option<u64>,
    pub avg_uncore_time_ns: Option<f64>,
    // latency
    pub rd_hit_cycles: Option<u32>,
    pub wr_hit_cycles: Option<u32>,
    pub next_rd_hit_cycles: Option<u32>,
    pub next_wr_hit_cycles: Option<u32>,
    pub eff_rd_hit_cycles: Option<f64>,
    pub eff_wr_hit_cycles: Option<f64>,
    pub core_period_ns: Option<f64>,
    pub avg_l3_hit_ns: Option<f64>,
    // energy
    pub energy_lower_j: Option<f64>,
    pub energy_upper_j: Option<f64>,
    pub energy_exact_j: Option<f64>,
    pub provenance: Provenance,
    pub notes: String,
}

impl From<&Estimate> for SummaryRecord {
    fn from(estimate: &Estimate) -> Self {
        let report = &estimate.report;
        let counts = estimate.store.as_ref().map(|store| &store.counts);
        let latency = estimate.store.as_ref().map(|store| &store.latency);
        let dram_latency = report.dram.latency.as_ref();
        let cycles = &estimate.hit_cycles;
        let energy = &estimate.energy;
        Self {
            benchmark: estimate.name.benchmark.clone(),
            size_m: estimate.name.size.clone(),
            technology: estimate.technology.clone(),
            run_dir: estimate.run_dir.display().to_string(),
            instructions: report.sim.instructions,
            cycles: report.sim.cycles,
            ipc: report.sim.ipc,
            time_ns: report.sim.time_ns,
            l3_acc_report: report.l3.accesses,
            l3_miss_report: report.l3.misses,
            l3_miss_rate_pct: report.l3.miss_rate_pct,
            dram_acc: report.dram.accesses,
            dram_lat_value: dram_latency.map(|latency| latency.value),
            dram_lat_unit: dram_latency.and_then(|latency| latency.unit.clone()),
            l3_accesses_db: counts.and_then(|counts| counts.accesses),
            l3_misses_db: counts.and_then(|counts| counts.misses),
            l3_read_hits_db: counts.and_then(|counts| counts.read_hits),
            l3_write_hits_db: counts.and_then(|counts| counts.write_hits),
            l3_remote_hits_db: counts.map(|counts| counts.hit_split.remote()),
            l3_writebacks: counts.and_then(|counts| counts.writebacks),
            l3_evictions: counts.and_then(|counts| counts.evictions),
            l3_misses_secondary: counts.and_then(|counts| counts.secondary_misses),
            l3_coherency_upgrades: counts.and_then(|counts| counts.coherency_upgrades),
            l3_prefetch_hits: counts.and_then(|counts| counts.prefetch_hits),
            l3_prefetch_evictions: counts.and_then(|counts| counts.prefetch_evictions),
            l3_total_latency_ns: latency.and_then(|latency| latency.total_ns),
            l3_mshr_latency_ns: latency.and_then(|latency| latency.mshr_ns),
            l3_snoop_latency_ns: latency.and_then(|latency| latency.snoop_ns),
            l3_qbs_latency_ns: latency.and_then(|latency| latency.qbs_query_ns),
            l3_uncore_time_ns: latency.and_then(|latency| latency.uncore_time_ns),
            l3_uncore_requests: latency.and_then(|latency| latency.uncore_requests),
            avg_uncore_time_ns: latency.and_then(stats::LatencyBuckets::avg_uncore_time_per_request_ns),
            rd_hit_cycles: cycles.local.read,
            wr_hit_cycles: cycles.local.write,
            next_rd_hit_cycles: cycles.forwarded.read,
            next_wr_hit_cycles: cycles.forwarded.write,
            eff_rd_hit_cycles: estimate.effective_cycles.map(|cycles| cycles.read),
            eff_wr_hit_cycles: estimate.effective_cycles.map(|cycles| cycles.write),
            core_period_ns: estimate.period_ns,
            avg_l3_hit_ns: estimate.avg_hit_latency_ns,
            energy_lower_j: known(energy.total_j.low),
            energy_upper_j: known(energy.total_j.high),
            energy_exact_j: energy.exact.and_then(|exact| known(exact.total_j)),
            provenance: energy.provenance,
            notes: energy.note.to_string(),
        }
    }
}

pub fn write_csv_rows<R, T>(writer: impl std::io::Write, rows: R) -> Result<(), csv::Error>
where
    R: IntoIterator<Item = T>,
    T: Serialize,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_file<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), Error> {
    let writer = utils::fs::open_writable(path)?;
    write_csv_rows(writer, rows).map_err(|source| Error::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Writes `energy_bounds.csv` and `summary.csv` into `out_dir`,
/// replacing earlier results.
pub fn write(out_dir: &Path, estimates: &[Estimate]) -> Result<(), Error> {
    utils::fs::create_dirs(out_dir)?;
    write_file(
        &out_dir.join(ENERGY_FILE),
        estimates.iter().map(EnergyRecord::from),
    )?;
    write_file(
        &out_dir.join(SUMMARY_FILE),
        estimates.iter().map(SummaryRecord::from),
    )?;
    Ok(())
}
