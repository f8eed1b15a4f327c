use super::{init_logging, report, Counters, Run};
use crate::constants::{Origin, Resolver, Technology};
use crate::energy::{Note, Provenance};
use crate::{Estimator, ReconciledCounts, RunCache};
use color_eyre::eyre;
use similar_asserts as diff;
use std::path::Path;

const SCENARIO: Counters = Counters {
    loads: 800,
    stores: 200,
    load_misses: 80,
    store_misses: 20,
    read_hits: 700,
    write_hits: 150,
    coherency_upgrades: Some(50),
    remote_read_hits: None,
};

fn close(have: f64, want: f64) -> bool {
    (have - want).abs() <= 1e-9 * want.abs().max(1e-12)
}

fn estimate(run: &Run, technology: &Technology) -> eyre::Result<crate::Estimate> {
    let estimator = Estimator::default();
    Ok(estimator.estimate(&mut RunCache::new(), &run.dir, technology)?)
}

#[test]
fn test_reconciled_run_is_exact() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_sram_1M", &report(1_000_000, 2_500_000, 1000, 100))?;
    run.store(&SCENARIO)?;

    let sram = Technology::sram();
    let have = estimate(&run, &sram)?;
    diff::assert_eq!(
        have: have.reconciled,
        want: Some(ReconciledCounts {
            read_hits: 700,
            write_hits: 200,
            gap: 50,
            coherency: 50,
            split: 0,
            surplus: 0,
        })
    );
    assert_eq!(
        have.energy.note,
        Note::Reconciled {
            gap: 50,
            coherency: 50,
            split: 0
        }
    );
    assert_eq!(have.energy.provenance, Provenance::ExactReconciled);

    // 0.565 * 700 + 0.537 * 200 + 0.011 * 100
    let exact = have.energy.exact.unwrap();
    assert!(close(exact.dynamic_nj, 504.0), "{exact:?}");
    assert!(close(exact.total_j, 504.0e-9 + 3.438e-3), "{exact:?}");
    assert!(have.energy.dynamic_nj.contains(exact.dynamic_nj));
    assert!(have.energy.total_j.contains(exact.total_j));

    // re-deriving the dynamic energy from its components
    let hits = have.reconciled.unwrap();
    let constants = have.constants.constants;
    let rederived = constants.read_hit_nj * hits.read_hits as f64
        + constants.write_hit_nj * hits.write_hits as f64
        + constants.miss_nj * have.misses().unwrap() as f64;
    assert!(close(exact.total_j - have.energy.leakage_j, rederived * 1e-9));
    Ok(())
}

#[test]
fn test_store_without_access_counters_has_unknown_energy() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_sram_1M", &report(1_000_000, 2_500_000, 1000, 100))?;
    let store = sniper::db::testing::Builder::create(&run.dir)?;
    store
        .end("L3", "l3_read_hits", 700)?
        .end("L3", "l3_write_hits", 150)?;
    drop(store);

    let have = estimate(&run, &Technology::sram())?;
    assert!(have.store.is_some());
    assert_eq!(have.accesses(), None);
    assert_eq!(have.misses(), None);
    assert_eq!(have.reconciled, None);
    assert_eq!(have.energy.exact, None);
    assert_eq!(have.energy.note, Note::StoreIncomplete);
    assert_eq!(have.energy.provenance, Provenance::BoundsOnly);
    assert!(have.energy.dynamic_nj.low.is_nan() && have.energy.dynamic_nj.high.is_nan());
    assert!(have.energy.total_j.low.is_nan());
    assert!(close(have.energy.leakage_j, 3.438e-3));
    assert_eq!(have.avg_hit_latency_ns, None);
    Ok(())
}

#[test]
fn test_missing_store_gives_bounds_only() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_sram_1M", &report(1_000_000, 2_500_000, 1000, 100))?;

    let have = estimate(&run, &Technology::sram())?;
    assert_eq!(have.store, None);
    assert_eq!(have.reconciled, None);
    assert_eq!(have.energy.exact, None);
    assert_eq!(have.energy.note, Note::StoreMissing);
    assert_eq!(have.energy.provenance, Provenance::BoundsOnly);
    assert_eq!(have.avg_hit_latency_ns, None);

    // hits as writes 484.4 nJ, hits as reads 509.6 nJ, T = 1 ms
    let energy = have.energy;
    assert!(close(energy.time_s, 0.001));
    assert!(close(energy.leakage_j, 3.438e-3));
    assert!(close(energy.dynamic_nj.low, 484.4));
    assert!(close(energy.dynamic_nj.high, 509.6));
    assert!(close(energy.total_j.low, 484.4e-9 + 3.438e-3));
    assert!(close(energy.total_j.high, 509.6e-9 + 3.438e-3));
    assert!(close(energy.ed2p.low, (484.4e-9 + 3.438e-3) * 1e-6));
    Ok(())
}

#[test]
fn test_missing_report_is_fatal() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let estimator = Estimator::default();
    let err = estimator
        .estimate(&mut RunCache::new(), dir.path(), &Technology::jans())
        .unwrap_err();
    assert!(matches!(
        err,
        crate::Error::Sniper(sniper::Error::MissingReport(_))
    ));
    Ok(())
}

#[test]
fn test_partial_override_uses_defaults() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_jans_1M", &report(1_000_000, 2_500_000, 1000, 100))?;
    run.config(
        "sim.cfg",
        "[perf_model/l3_cache/llc]\ne_read_hit_pJ = 1\ne_write_hit_pJ = 2\ne_miss_pJ = 3\n",
    )?;

    let jans = Technology::jans();
    let have = estimate(&run, &jans)?;
    assert_eq!(have.constants.origin, Origin::Defaults);
    diff::assert_eq!(have: have.constants.constants, want: jans.defaults);

    // resolving has no side effects
    let resolver = Resolver::default();
    let first = resolver.resolve(&run.dir, &jans)?;
    let second = resolver.resolve(&run.dir, &jans)?;
    diff::assert_eq!(have: first, want: second);
    Ok(())
}

#[test]
fn test_complete_override_changes_energy() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_sram_1M", &report(2_000_000, 5_000_000, 1000, 100))?;
    run.config(
        "sim.info",
        "run-sniper -g --perf_model/l3_cache/llc/e_read_hit_pJ=1000 -g --perf_model/l3_cache/llc/e_write_hit_pJ=1000 \
         -g --perf_model/l3_cache/llc/e_miss_pJ=1000 -g --perf_model/l3_cache/llc/p_leak_mW=1000",
    )?;
    run.store(&Counters {
        coherency_upgrades: None,
        ..SCENARIO
    })?;

    let have = estimate(&run, &Technology::sram())?;
    assert_eq!(have.constants.origin, Origin::File(run.dir.join("sim.info")));
    // 1 nJ per event, 1 W for 2 ms
    let exact = have.energy.exact.unwrap();
    assert!(close(exact.dynamic_nj, 1000.0));
    assert!(close(exact.total_j, 1000.0e-9 + 2e-3));
    assert!(close(have.energy.total_j.low, have.energy.total_j.high));
    Ok(())
}

#[test]
fn test_tolerance_reports_ok() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_sram_1M", &report(1_000_000, 2_500_000, 1000, 100))?;
    run.store(&SCENARIO)?;

    let estimator = Estimator {
        tolerance: 50,
        ..Estimator::default()
    };
    let have = estimator.estimate(&mut RunCache::new(), &run.dir, &Technology::sram())?;
    assert_eq!(have.energy.note, Note::Ok);
    assert_eq!(have.energy.provenance, Provenance::Exact);
    // the arithmetic still runs
    assert_eq!(have.reconciled.map(|hits| hits.hits()), Some(900));
    Ok(())
}

#[test]
fn test_average_hit_latency() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    // period 0.4 ns
    let run = Run::create(dir.path(), "bench_sram_1M", &report(1_000_000, 2_500_000, 1000, 100))?;
    run.config(
        "sim.cfg",
        "[perf_model/l3_cache/llc]\nread_hit_latency_cycles = 10\nwrite_hit_latency_cycles = 20\n\
         [perf_model/l3_cache/next_read]\nread_hit_latency_cycles = 30\n",
    )?;
    run.store(&Counters {
        loads: 1000,
        stores: 0,
        load_misses: 0,
        store_misses: 0,
        read_hits: 600,
        write_hits: 200,
        coherency_upgrades: None,
        remote_read_hits: Some(200),
    })?;

    let have = estimate(&run, &Technology::sram())?;
    assert_eq!(have.energy.note, Note::Ok);
    let period = have.period_ns.unwrap();
    assert!(close(period, 0.4));

    // 80% local: reads blend to 14 cycles, writes stay at 20
    let cycles = have.effective_cycles.unwrap();
    assert!(close(cycles.read, 14.0), "{cycles:?}");
    assert!(close(cycles.write, 20.0), "{cycles:?}");
    let latency = have.avg_hit_latency_ns.unwrap();
    assert!(close(latency, (800.0 * 14.0 + 200.0 * 20.0) * 0.4 / 1000.0));

    let local_only = Estimator {
        store: sniper::db::Options {
            scope: sniper::db::Scope::Local,
            ..sniper::db::Options::default()
        },
        ..Estimator::default()
    };
    let have = local_only.estimate(&mut RunCache::new(), &run.dir, &Technology::sram())?;
    // the forwarded hits are now unclassified and split 3:1
    assert_eq!(
        have.reconciled.map(|hits| (hits.read_hits, hits.write_hits)),
        Some((750, 250))
    );
    Ok(())
}

#[test]
fn test_missing_latency_config_is_unknown() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_sram_1M", &report(1_000_000, 2_500_000, 1000, 100))?;
    run.store(&SCENARIO)?;
    let have = estimate(&run, &Technology::sram())?;
    assert_eq!(have.effective_cycles, None);
    assert_eq!(have.avg_hit_latency_ns, None);
    assert!(have.period_ns.is_some());
    Ok(())
}

fn read_csv(path: &Path) -> eyre::Result<Vec<csv::StringRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = vec![reader.headers()?.clone()];
    for row in reader.records() {
        rows.push(row?);
    }
    Ok(rows)
}

fn column<'a>(rows: &'a [csv::StringRecord], row: usize, name: &str) -> Option<&'a str> {
    let index = rows[0].iter().position(|header| header == name)?;
    rows[row].get(index)
}

#[test]
fn test_compare_writes_outputs() -> eyre::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let sram = Run::create(
        dir.path(),
        "541_leela_r_sram_100M",
        &report(1_000_000, 2_500_000, 1000, 100),
    )?;
    sram.store(&SCENARIO)?;
    let jans = Run::create(
        dir.path(),
        "541_leela_r_jans_100M",
        &report(1_200_000, 3_000_000, 1000, 100),
    )?;

    let estimator = Estimator::default();
    let mut cache = RunCache::new();
    let comparison = estimator.compare(
        &mut cache,
        (&sram.sim_out(), "SRAM"),
        (&jans.sim_out(), "jans"),
    )?;
    assert_eq!(comparison.name.benchmark, "541_leela_r");
    assert_eq!(comparison.name.size.as_deref(), Some("100"));
    assert_eq!(comparison.out_dir, dir.path().join("output_541_leela_r"));

    let out_dir = comparison.write(None)?;
    let energy = read_csv(&out_dir.join(crate::record::ENERGY_FILE))?;
    assert_eq!(energy.len(), 3);
    assert_eq!(column(&energy, 1, "benchmark"), Some("541_leela_r"));
    assert_eq!(column(&energy, 1, "size_m"), Some("100"));
    assert_eq!(column(&energy, 1, "technology"), Some("SRAM"));
    assert_eq!(column(&energy, 1, "provenance"), Some("exact-reconciled"));
    assert_eq!(column(&energy, 1, "energy_scope"), Some("LLC only"));
    assert_eq!(column(&energy, 1, "l3_write_hits"), Some("200"));
    assert_eq!(
        column(&energy, 1, "notes"),
        Some("reconciled(gap=50, coherency=50, split=0)")
    );
    assert_eq!(column(&energy, 2, "technology"), Some("JanS"));
    assert_eq!(column(&energy, 2, "provenance"), Some("bounds-only"));
    assert_eq!(column(&energy, 2, "notes"), Some("store-missing"));
    assert_eq!(column(&energy, 2, "energy_exact_j"), Some(""));
    assert_eq!(column(&energy, 2, "l3_read_hits"), Some(""));
    assert_eq!(column(&energy, 2, "l3_accesses"), Some("1000"));
    assert_eq!(column(&energy, 2, "constants_source"), Some("defaults"));

    let summary = read_csv(&out_dir.join(crate::record::SUMMARY_FILE))?;
    assert_eq!(summary.len(), 3);
    assert_eq!(column(&summary, 1, "l3_read_hits_db"), Some("700"));
    assert_eq!(column(&summary, 1, "l3_coherency_upgrades"), Some("50"));
    assert_eq!(column(&summary, 2, "l3_read_hits_db"), Some(""));
    assert_eq!(column(&summary, 2, "dram_lat_unit"), Some("ns"));
    assert_eq!(column(&summary, 2, "time_ns"), Some("1200000.0"));

    // overwriting into a custom directory
    let custom = dir.path().join("custom");
    comparison.write(Some(&custom))?;
    assert!(custom.join(crate::record::ENERGY_FILE).is_file());
    Ok(())
}

#[test]
fn test_compare_rejects_unknown_technology() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let run = Run::create(dir.path(), "bench_sram_1M", &report(1, 1, 1, 1))?;
    let err = Estimator::default()
        .compare(&mut RunCache::new(), (&run.dir, "SRAM"), (&run.dir, "RRAM"))
        .unwrap_err();
    assert!(matches!(err, crate::Error::UnknownTechnology { .. }));
    Ok(())
}
