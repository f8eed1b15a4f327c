use super::constants::{Resolved, Resolver, Technology};
use super::Error;
use sniper::config::Config;
use sniper::{db, parser};
use stats::{Report, Store};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Memoised per-run inputs, keyed by absolute run directory.
///
/// Owned by the caller for one invocation or batch.
#[derive(Debug, Default)]
pub struct RunCache {
    reports: HashMap<PathBuf, Report>,
    stores: HashMap<(PathBuf, db::Options), Option<Store>>,
    configs: HashMap<PathBuf, Option<Config>>,
    constants: HashMap<(PathBuf, String), Resolved>,
}

fn key(run_dir: &Path) -> PathBuf {
    utils::fs::absolute_path(run_dir)
}

impl RunCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, run_dir: &Path, options: &parser::Options) -> Result<Report, Error> {
        let key = key(run_dir);
        if let Some(report) = self.reports.get(&key) {
            log::trace!("cached report for {}", key.display());
            return Ok(report.clone());
        }
        let report = parser::read_report(run_dir.join(sniper::REPORT_FILE), options)?;
        self.reports.insert(key, report.clone());
        Ok(report)
    }

    pub fn store(&mut self, run_dir: &Path, options: &db::Options) -> Result<Option<Store>, Error> {
        let key = (key(run_dir), options.clone());
        if let Some(store) = self.stores.get(&key) {
            return Ok(store.clone());
        }
        let store = db::read(run_dir, options)?;
        self.stores.insert(key, store.clone());
        Ok(store)
    }

    /// Run configuration (`sim.cfg`), `None` if the run has none.
    pub fn config(&mut self, run_dir: &Path) -> Result<Option<Config>, Error> {
        let key = key(run_dir);
        if let Some(config) = self.configs.get(&key) {
            return Ok(config.clone());
        }
        let config = Config::read(run_dir.join(sniper::config::CONFIG_FILE))?;
        self.configs.insert(key, config.clone());
        Ok(config)
    }

    pub fn constants(
        &mut self,
        run_dir: &Path,
        technology: &Technology,
        resolver: &Resolver,
    ) -> Result<Resolved, Error> {
        let key = (key(run_dir), technology.label.to_lowercase());
        if let Some(resolved) = self.constants.get(&key) {
            return Ok(resolved.clone());
        }
        let resolved = resolver.resolve(run_dir, technology)?;
        self.constants.insert(key, resolved.clone());
        Ok(resolved)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len() + self.stores.len() + self.configs.len() + self.constants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.reports.clear();
        self.stores.clear();
        self.configs.clear();
        self.constants.clear();
    }
}
