#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions
)]

pub mod cache;
pub mod constants;
pub mod energy;
pub mod latency;
pub mod options;
pub mod reconcile;
pub mod record;
pub mod run;

#[cfg(test)]
pub mod testing;

pub use cache::RunCache;
pub use constants::{EnergyConstants, Resolved, Resolver, Technologies, Technology};
pub use energy::{EnergyResult, Note, Provenance};
pub use reconcile::{reconcile, ReconciledCounts};
pub use run::RunName;

use itertools::Itertools;
use latency::{EffectiveCycles, HitCycles};
use sniper::{db, parser};
use stats::{EventCounts, Report, Store};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Sniper(#[from] sniper::Error),

    #[error(transparent)]
    Fs(#[from] utils::fs::Error),

    #[error("unknown technology {label:?} (known: {known})")]
    UnknownTechnology { label: String, known: String },

    #[error("failed to parse technologies from {path:?}")]
    Technologies {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Everything derived for one technology on one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub technology: String,
    pub run_dir: PathBuf,
    pub name: RunName,
    pub report: Report,
    pub store: Option<Store>,
    pub reconciled: Option<ReconciledCounts>,
    pub constants: Resolved,
    pub hit_cycles: HitCycles,
    pub effective_cycles: Option<EffectiveCycles>,
    pub period_ns: Option<f64>,
    pub avg_hit_latency_ns: Option<f64>,
    pub energy: EnergyResult,
}

impl Estimate {
    /// LLC accesses the bounds were computed from.
    #[must_use]
    pub fn accesses(&self) -> Option<u64> {
        match self.store {
            Some(ref store) => store.counts.accesses,
            None => self.report.l3.accesses,
        }
    }

    /// LLC misses the bounds were computed from.
    #[must_use]
    pub fn misses(&self) -> Option<u64> {
        match self.store {
            Some(ref store) => store.counts.misses,
            None => self.report.l3.misses,
        }
    }
}

/// Baseline and alternative estimates of one benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub name: RunName,
    /// Default output directory, next to the baseline run.
    pub out_dir: PathBuf,
    pub estimates: Vec<Estimate>,
}

impl Comparison {
    pub fn write(&self, out_dir: Option<&Path>) -> Result<PathBuf, Error> {
        let out_dir = out_dir.unwrap_or(&self.out_dir);
        record::write(out_dir, &self.estimates)?;
        Ok(out_dir.to_path_buf())
    }
}

/// Run directory of a report path, or the path itself if it is a directory.
#[must_use]
pub fn run_dir(report_or_dir: &Path) -> PathBuf {
    if report_or_dir.is_dir() {
        return report_or_dir.to_path_buf();
    }
    match report_or_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// The LLC energy pipeline and its settings.
#[derive(Debug, Default)]
pub struct Estimator {
    pub technologies: Technologies,
    pub resolver: Resolver,
    pub report: parser::Options,
    pub store: db::Options,
    /// Hit count mismatches up to this size are reported as consistent.
    pub tolerance: u64,
}

impl Estimator {
    pub fn technology(&self, label: &str) -> Result<&Technology, Error> {
        self.technologies
            .get(label)
            .ok_or_else(|| Error::UnknownTechnology {
                label: label.to_string(),
                known: self.technologies.labels().join(", "),
            })
    }

    /// Estimates the LLC energy of `technology` on the run in `run_dir`.
    ///
    /// Fails if the run has no report. Without a statistics store only
    /// bounds from the coarse report counts are available.
    pub fn estimate(
        &self,
        cache: &mut RunCache,
        run_dir: &Path,
        technology: &Technology,
    ) -> Result<Estimate, Error> {
        let report = cache.report(run_dir, &self.report)?;
        let store = cache.store(run_dir, &self.store)?;
        let constants = cache.constants(run_dir, technology, &self.resolver)?;
        let hit_cycles = cache
            .config(run_dir)?
            .map(|config| HitCycles::from_config(&config, &technology.namespace))
            .unwrap_or_default();

        let time_s = report.sim.elapsed_seconds();
        let period_ns = report.sim.period_ns();

        let reconciled = store
            .as_ref()
            .and_then(|store| reconcile::reconcile(&store.counts));

        let store_counts = store.as_ref().map(|store| &store.counts);
        let counts = match (store_counts, &reconciled) {
            (
                Some(&EventCounts {
                    accesses: Some(accesses),
                    misses: Some(misses),
                    ..
                }),
                Some(reconciled),
            ) => {
                let note = Note::for_counts(reconciled, self.tolerance);
                if note != Note::Ok {
                    log::info!("{}: {note}", run_dir.display());
                }
                energy::Counts::Exact {
                    accesses,
                    misses,
                    reconciled,
                    note,
                }
            }
            (Some(counts), _) => {
                log::warn!(
                    "{}: statistics store lacks LLC counters, no exact estimate",
                    run_dir.display()
                );
                energy::Counts::Incomplete {
                    accesses: counts.accesses,
                    misses: counts.misses,
                }
            }
            (None, _) => {
                log::warn!(
                    "{}: no statistics store, estimating bounds only",
                    run_dir.display()
                );
                energy::Counts::Coarse {
                    accesses: report.l3.accesses,
                    misses: report.l3.misses,
                }
            }
        };
        let energy = energy::estimate(&constants.constants, time_s, counts);

        let effective_cycles = store
            .as_ref()
            .and_then(|store| hit_cycles.effective(&store.counts.hit_split));
        let avg_hit_latency_ns = match (&effective_cycles, &reconciled) {
            (Some(cycles), Some(hits)) => latency::average_hit_latency_ns(cycles, hits, period_ns),
            _ => None,
        };
        if effective_cycles.is_none() && store.is_some() {
            log::debug!(
                "{}: hit latency cycles not configured, average hit latency unknown",
                run_dir.display()
            );
        }

        Ok(Estimate {
            technology: technology.label.clone(),
            run_dir: run_dir.to_path_buf(),
            name: RunName::parse(run_dir, self.technologies.labels()),
            report,
            store,
            reconciled,
            constants,
            hit_cycles,
            effective_cycles,
            period_ns,
            avg_hit_latency_ns,
            energy,
        })
    }

    /// Estimates both technologies of a benchmark from their reports.
    ///
    /// Report paths may also be given as run directories. The benchmark
    /// name and default output directory follow the baseline run.
    pub fn compare(
        &self,
        cache: &mut RunCache,
        baseline: (&Path, &str),
        alternative: (&Path, &str),
    ) -> Result<Comparison, Error> {
        let mut estimates = Vec::with_capacity(2);
        for (report, label) in [baseline, alternative] {
            let technology = self.technology(label)?;
            let run_dir = run_dir(report);
            estimates.push(self.estimate(cache, &run_dir, technology)?);
        }
        let baseline_dir = run_dir(baseline.0);
        let name = RunName::parse(&baseline_dir, self.technologies.labels());
        let alternative_name = &estimates[1].name;
        if alternative_name.benchmark != name.benchmark {
            log::warn!(
                "comparing different benchmarks: {} vs {}",
                name.benchmark,
                alternative_name.benchmark
            );
        }
        Ok(Comparison {
            out_dir: run::output_dir(&baseline_dir, &name),
            name,
            estimates,
        })
    }
}
