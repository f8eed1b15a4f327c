use super::Error;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sniper::config::{Config, CONFIG_FILE, INFO_FILES};
use std::path::{Path, PathBuf};

/// Key namespace of the LLC parameters in the run configuration.
pub const DEFAULT_NAMESPACE: &str = "perf_model/l3_cache";

/// Configured event energies are in pJ, leakage power in mW.
const FINE_UNITS_PER_UNIT: f64 = 1000.0;

/// Per-technology LLC cost model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyConstants {
    /// Energy per read hit in nJ.
    pub read_hit_nj: f64,
    /// Energy per write hit in nJ.
    pub write_hit_nj: f64,
    /// Energy per miss in nJ.
    pub miss_nj: f64,
    /// Leakage power in W.
    pub leakage_w: f64,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub label: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub defaults: EnergyConstants,
}

impl Technology {
    #[must_use]
    pub fn sram() -> Self {
        Self {
            label: "SRAM".to_string(),
            namespace: default_namespace(),
            defaults: EnergyConstants {
                read_hit_nj: 0.565,
                write_hit_nj: 0.537,
                miss_nj: 0.011,
                leakage_w: 3.438,
            },
        }
    }

    #[must_use]
    pub fn jans() -> Self {
        Self {
            label: "JanS".to_string(),
            namespace: default_namespace(),
            defaults: EnergyConstants {
                read_hit_nj: 0.188,
                write_hit_nj: 2.305,
                miss_nj: 0.077,
                leakage_w: 0.048,
            },
        }
    }

    #[must_use]
    pub fn key(&self, name: &str) -> String {
        format!("{}/llc/{name}", self.namespace)
    }

    /// Constants defined by `config`, `None` unless all four are present.
    #[must_use]
    pub fn constants_from(&self, config: &Config) -> Option<EnergyConstants> {
        let keys = ["e_read_hit_pJ", "e_write_hit_pJ", "e_miss_pJ", "p_leak_mW"];
        let values: Vec<Option<f64>> = keys
            .iter()
            .map(|name| config.get_f64(&self.key(name)))
            .collect();
        match values[..] {
            [Some(read_hit), Some(write_hit), Some(miss), Some(leakage)] => Some(EnergyConstants {
                read_hit_nj: read_hit / FINE_UNITS_PER_UNIT,
                write_hit_nj: write_hit / FINE_UNITS_PER_UNIT,
                miss_nj: miss / FINE_UNITS_PER_UNIT,
                leakage_w: leakage / FINE_UNITS_PER_UNIT,
            }),
            [None, None, None, None] => None,
            _ => {
                let missing = keys
                    .iter()
                    .zip(&values)
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| *name)
                    .join(", ");
                log::warn!("ignoring partial {} override: missing {missing}", self.label);
                None
            }
        }
    }
}

/// Known technologies, looked up by case-insensitive label.
#[derive(Debug, Clone, PartialEq)]
pub struct Technologies(IndexMap<String, Technology>);

impl Default for Technologies {
    fn default() -> Self {
        let mut technologies = Self(IndexMap::new());
        technologies.insert(Technology::sram());
        technologies.insert(Technology::jans());
        technologies
    }
}

impl Technologies {
    pub fn insert(&mut self, technology: Technology) -> Option<Technology> {
        self.0.insert(technology.label.to_lowercase(), technology)
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Technology> {
        self.0.get(&label.to_lowercase())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.values().map(|technology| technology.label.as_str())
    }

    /// Adds the technologies listed in a YAML file, replacing built-ins
    /// with the same label.
    ///
    /// ```yaml
    /// - label: FeFET
    ///   defaults: { read_hit_nj: 0.2, write_hit_nj: 1.1, miss_nj: 0.05, leakage_w: 0.1 }
    /// ```
    pub fn extend_from_yaml(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let reader = utils::fs::open_readable(path)?;
        let technologies: Vec<Technology> =
            serde_yaml::from_reader(reader).map_err(|source| Error::Technologies {
                path: path.to_path_buf(),
                source,
            })?;
        for technology in technologies {
            log::debug!("technology {} from {}", technology.label, path.display());
            self.insert(technology);
        }
        Ok(())
    }
}

/// Where a resolved constant set came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Origin {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub constants: EnergyConstants,
    pub origin: Origin,
}

/// One step of the constants fallback chain.
///
/// A source yields a complete constant set or nothing.
pub trait Source: std::fmt::Debug {
    fn lookup(&self, run_dir: &Path, technology: &Technology) -> Result<Option<Resolved>, Error>;
}

/// A configuration file inside the run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFile(pub String);

impl Source for RunFile {
    fn lookup(&self, run_dir: &Path, technology: &Technology) -> Result<Option<Resolved>, Error> {
        let path = run_dir.join(&self.0);
        let Some(config) = Config::read(&path)? else {
            return Ok(None);
        };
        Ok(technology
            .constants_from(&config)
            .map(|constants| Resolved {
                constants,
                origin: Origin::File(path),
            }))
    }
}

/// The technology's built-in constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults;

impl Source for Defaults {
    fn lookup(&self, _run_dir: &Path, technology: &Technology) -> Result<Option<Resolved>, Error> {
        Ok(Some(Resolved {
            constants: technology.defaults,
            origin: Origin::Defaults,
        }))
    }
}

/// Ordered constants sources, first complete set wins.
#[derive(Debug)]
pub struct Resolver {
    sources: Vec<Box<dyn Source>>,
}

impl Default for Resolver {
    /// `sim.cfg`, then `sim.info`, then `sim.inf`, then built-in defaults.
    fn default() -> Self {
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(RunFile(CONFIG_FILE.to_string()))];
        sources.extend(
            INFO_FILES
                .iter()
                .map(|file| Box::new(RunFile((*file).to_string())) as Box<dyn Source>),
        );
        sources.push(Box::new(Defaults));
        Self { sources }
    }
}

impl Resolver {
    pub fn resolve(
        &self,
        run_dir: impl AsRef<Path>,
        technology: &Technology,
    ) -> Result<Resolved, Error> {
        let run_dir = run_dir.as_ref();
        for source in &self.sources {
            if let Some(resolved) = source.lookup(run_dir, technology)? {
                log::debug!(
                    "{} constants for {} from {}",
                    technology.label,
                    run_dir.display(),
                    resolved.origin
                );
                return Ok(resolved);
            }
        }
        log::warn!(
            "no constants source matched for {}, using {} defaults",
            run_dir.display(),
            technology.label
        );
        Ok(Resolved {
            constants: technology.defaults,
            origin: Origin::Defaults,
        })
    }
}
