use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Benchmark identity of a run directory such as `541_leela_r_sram_100M`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct RunName {
    pub benchmark: String,
    /// Simulated instructions in millions, as written in the directory name.
    pub size: Option<String>,
}

static SIZE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(\d+)M$").unwrap());

impl RunName {
    /// Strips every `_<label>...` suffix of a known technology label and a
    /// trailing `_<N>M` size suffix from the leaf of `run_dir`.
    #[must_use]
    pub fn parse<'a>(run_dir: &Path, labels: impl IntoIterator<Item = &'a str>) -> Self {
        let leaf = run_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let size = SIZE_REGEX
            .captures(&leaf)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string());

        let labels: Vec<String> = labels.into_iter().map(regex::escape).collect();
        let benchmark = if labels.is_empty() {
            leaf.clone()
        } else {
            match Regex::new(&format!(r"(?i)_(?:{}).*$", labels.join("|"))) {
                Ok(technology_suffix) => technology_suffix.replace(&leaf, "").to_string(),
                Err(err) => {
                    log::warn!("cannot strip technology labels from {leaf:?}: {err}");
                    leaf.clone()
                }
            }
        };
        let benchmark = SIZE_REGEX.replace(&benchmark, "").to_string();

        Self {
            benchmark: if benchmark.is_empty() { leaf } else { benchmark },
            size,
        }
    }
}

impl std::fmt::Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.size {
            Some(ref size) => write!(f, "{} ({size}M)", self.benchmark),
            None => write!(f, "{}", self.benchmark),
        }
    }
}

/// `<parent of run_dir>/output_<benchmark>`
#[must_use]
pub fn output_dir(run_dir: &Path, name: &RunName) -> PathBuf {
    run_dir
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("output_{}", name.benchmark))
}
