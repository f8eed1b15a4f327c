use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use console::style;
use llc_energy::{options::Options, Estimate, Provenance, RunCache};
use std::time::Instant;

fn joules(value: f64) -> String {
    if value.is_nan() {
        "?".to_string()
    } else {
        format!("{value:.6}")
    }
}

fn print_summary(estimate: &Estimate) {
    let energy = &estimate.energy;
    let counts = match (estimate.accesses(), estimate.misses()) {
        (Some(accesses), Some(misses)) => format!("{accesses}/{misses}"),
        _ => "?/?".to_string(),
    };
    let exact = match energy.exact {
        Some(exact) => format!("  |  E_exact={} J", joules(exact.total_j)),
        None => String::new(),
    };
    let note = match energy.provenance {
        Provenance::Exact => style(energy.note.to_string()).green(),
        Provenance::ExactReconciled => style(energy.note.to_string()).yellow(),
        Provenance::BoundsOnly => style(energy.note.to_string()).red(),
    };
    println!(
        "{}: time={}s  L3 acc/miss={counts}  -> E_bounds={}..{} J  (leak={} J){exact}  [{note}]",
        style(&estimate.technology).bold(),
        joules(if energy.time_s.is_nan() { 0.0 } else { energy.time_s }),
        joules(energy.total_j.low),
        joules(energy.total_j.high),
        joules(energy.leakage_j),
    );
    if let Some(latency) = estimate.avg_hit_latency_ns {
        println!("    avg L3 hit latency {latency:.3} ns");
    }
    println!("    constants from {}", estimate.constants.origin);
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let start = Instant::now();
    let options = Options::parse();
    log::debug!("options: {:#?}", &options);

    let estimator = options.estimator()?;
    let mut cache = RunCache::new();
    let comparison = estimator
        .compare(
            &mut cache,
            (&options.baseline_sim_out, &options.baseline),
            (&options.alternative_sim_out, &options.alternative),
        )
        .wrap_err_with(|| {
            format!(
                "failed to compare {} and {}",
                options.baseline_sim_out.display(),
                options.alternative_sim_out.display()
            )
        })?;
    let out_dir = comparison.write(options.out_dir.as_deref())?;

    if !options.quiet {
        println!(
            "\n==== LLC energy: {} ====",
            style(comparison.name.to_string()).cyan()
        );
        for estimate in &comparison.estimates {
            print_summary(estimate);
        }
        println!("wrote results to {}", out_dir.display());
    }
    log::info!("done after {:?}", start.elapsed());
    Ok(())
}
