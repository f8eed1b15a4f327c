use super::Error;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Run configuration written next to every report.
pub const CONFIG_FILE: &str = "sim.cfg";

/// Run summaries that repeat the command-line configuration overrides.
pub const INFO_FILES: [&str; 2] = ["sim.info", "sim.inf"];

static SECTION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\s*([^\]]+?)\s*\]").unwrap());

/// `key = value` with an unqualified key, relative to the current section.
static KEY_VALUE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][\w.\-]*)\s*=\s*(.*)$").unwrap());

/// Fully qualified `a/b/c = value` pairs anywhere on a line,
/// including command-line style `--a/b/c=value` arguments.
static QUALIFIED_REGEX: Lazy<Regex> = Lazy::new(|| {
    let key = r"([A-Za-z_][\w.\-]*(?:/[\w.\-]+)+)";
    let single_quoted_string = r"(?:'[^']*')";
    let double_quoted_string = r#"(?:"[^"]*")"#;
    let bare_value = r#"(?:[^\s#;,'"]+)"#;
    let pattern = [
        key,
        r"\s*=\s*(",
        single_quoted_string,
        "|",
        double_quoted_string,
        "|",
        bare_value,
        ")",
    ];
    Regex::new(&pattern.join("")).unwrap()
});

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

fn strip_comment(value: &str) -> &str {
    match value.find(|c| c == '#' || c == ';') {
        Some(idx) => &value[..idx],
        None => value,
    }
}

/// Flat view of a run configuration, keyed by fully qualified key.
///
/// Later definitions of a key win, as they do in the simulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config(IndexMap<String, String>);

impl Config {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = IndexMap::new();
        let mut section: Option<String> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = SECTION_REGEX
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
            {
                section = Some(name);
                continue;
            }
            if let Some(cap) = KEY_VALUE_REGEX.captures(line) {
                let (key, value) = (&cap[1], unquote(strip_comment(&cap[2])));
                let key = match section {
                    Some(ref section) => format!("{section}/{key}"),
                    None => key.to_string(),
                };
                entries.insert(key, value.to_string());
            }
            for cap in QUALIFIED_REGEX.captures_iter(line) {
                entries.insert(cap[1].to_string(), unquote(&cap[2]).to_string());
            }
        }
        Self(entries)
    }

    /// Reads the configuration at `path`, `None` if there is no such file.
    pub fn read(path: impl AsRef<Path>) -> Result<Option<Self>, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }
        let text = utils::fs::read_to_string_lossy(path)?;
        Ok(Some(Self::parse(&text)))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let value = self.get(key)?;
        match value.parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("ignoring non-numeric value {value:?} for {key}");
                None
            }
        }
    }

    #[must_use]
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        let value = self.get_f64(key)?;
        if value < 0.0 || value.fract() != 0.0 {
            log::warn!("ignoring {value} for {key}: expected a whole number");
            return None;
        }
        Some(value as u32)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use color_eyre::eyre;

    #[test]
    fn test_parse_sectioned() {
        let config = Config::parse(
            "
# general
[general]
total_cores = 4

[perf_model/l3_cache/llc]
read_hit_latency_cycles = 6 ; comment
write_hit_latency_cycles = \"17\"
e_read_hit_pJ = 397.5
",
        );
        assert_eq!(config.get("general/total_cores"), Some("4"));
        assert_eq!(
            config.get_u32("perf_model/l3_cache/llc/read_hit_latency_cycles"),
            Some(6)
        );
        assert_eq!(
            config.get_u32("perf_model/l3_cache/llc/write_hit_latency_cycles"),
            Some(17)
        );
        assert_eq!(
            config.get_f64("perf_model/l3_cache/llc/e_read_hit_pJ"),
            Some(397.5)
        );
    }

    #[test]
    fn test_parse_qualified_lines() {
        let config = Config::parse(
            "[perf_model/l3_cache]\nperf_model/l3_cache/llc/e_miss_pJ = 11\nperf_model/l3_cache/llc/e_miss_pJ=12\n",
        );
        assert_eq!(config.get_f64("perf_model/l3_cache/llc/e_miss_pJ"), Some(12.0));
    }

    #[test]
    fn test_parse_command_line_arguments() {
        let config = Config::parse(
            "cmdline = 'run-sniper -c gainestown -g --perf_model/l3_cache/llc/e_read_hit_pJ=188 -g --perf_model/l3_cache/llc/p_leak_mW=48 -- ./bench'",
        );
        assert_eq!(
            config.get_f64("perf_model/l3_cache/llc/e_read_hit_pJ"),
            Some(188.0)
        );
        assert_eq!(config.get_f64("perf_model/l3_cache/llc/p_leak_mW"), Some(48.0));
    }

    #[test]
    fn test_quoted_argument_lists() {
        let config = Config::parse(
            r#"cmdline = ['--perf_model/l3_cache/llc/e_miss_pJ=77', "--perf_model/l3_cache/llc/p_leak_mW=48", --general/label="x y"]"#,
        );
        assert_eq!(config.get("perf_model/l3_cache/llc/e_miss_pJ"), Some("77"));
        assert_eq!(config.get("perf_model/l3_cache/llc/p_leak_mW"), Some("48"));
        assert_eq!(config.get("general/label"), Some("x y"));
    }

    #[test]
    fn test_non_numeric_values_are_ignored() {
        let config = Config::parse("[perf_model/l3_cache/llc]\ne_miss_pJ = lots\n");
        assert_eq!(config.get("perf_model/l3_cache/llc/e_miss_pJ"), Some("lots"));
        assert_eq!(config.get_f64("perf_model/l3_cache/llc/e_miss_pJ"), None);
    }

    #[test]
    fn test_read_missing_file() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(Config::read(dir.path().join(super::CONFIG_FILE))?, None);
        Ok(())
    }
}
