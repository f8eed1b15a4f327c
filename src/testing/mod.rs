//! Run directory fixtures shared by the pipeline tests.

pub mod pipeline;

use color_eyre::eyre;
use sniper::db::testing::Builder;
use std::path::{Path, PathBuf};

static LOGGER: std::sync::Once = std::sync::Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        env_logger::builder().is_test(true).init();
    });
}

/// Report of a run with the given timing and coarse LLC counts.
#[must_use]
pub fn report(time_ns: u64, cycles: u64, accesses: u64, misses: u64) -> String {
    let miss_rate = if accesses == 0 {
        0.0
    } else {
        100.0 * misses as f64 / accesses as f64
    };
    format!(
        "\
                                     | Core 0
  Instructions                       | 100000000
  Cycles                             | {cycles}
  IPC                                | 0.80
  Time (ns)                          | {time_ns}
Cache Summary                        |
  Cache L2                           |
    num cache accesses               | 999999
    num cache misses                 | 999
    miss rate                        | 0.10%
  Cache L3                           |
    num cache accesses               | {accesses}
    num cache misses                 | {misses}
    miss rate                        | {miss_rate:.2}%
DRAM summary                         |
    num dram accesses                | {misses}
    average dram access latency (ns) | 85.30
"
    )
}

/// Exact LLC counters recorded at `roi-end`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub loads: i64,
    pub stores: i64,
    pub load_misses: i64,
    pub store_misses: i64,
    pub read_hits: i64,
    pub write_hits: i64,
    pub coherency_upgrades: Option<i64>,
    pub remote_read_hits: Option<i64>,
}

pub struct Run {
    pub dir: PathBuf,
}

impl Run {
    pub fn create(root: &Path, name: &str, report: &str) -> eyre::Result<Self> {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(sniper::REPORT_FILE), report)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn sim_out(&self) -> PathBuf {
        self.dir.join(sniper::REPORT_FILE)
    }

    pub fn config(&self, file: &str, text: &str) -> eyre::Result<&Self> {
        std::fs::write(self.dir.join(file), text)?;
        Ok(self)
    }

    pub fn store(&self, counters: &Counters) -> eyre::Result<&Self> {
        let store = Builder::create(&self.dir)?;
        store
            .end("L3", "loads", counters.loads)?
            .end("L3", "stores", counters.stores)?
            .end("L3", "load-misses", counters.load_misses)?
            .end("L3", "store-misses", counters.store_misses)?
            .end("L3", "l3_read_hits", counters.read_hits)?
            .end("L3", "l3_write_hits", counters.write_hits)?;
        if let Some(upgrades) = counters.coherency_upgrades {
            store.end("L3", "coherency-upgrades", upgrades)?;
        }
        if let Some(hits) = counters.remote_read_hits {
            store.end("L3-remote", "l3_read_hits", hits)?;
        }
        Ok(self)
    }
}
