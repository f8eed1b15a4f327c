use super::Error;
use once_cell::sync::Lazy;
use regex::Regex;
use stats::{cache, dram, Report, Sim, DRAM};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Options {
    /// Fail instead of leaving required fields unknown.
    pub strict: bool,
}

/// Unsigned number, optionally with thousands separators and a fraction.
const NUMBER: &str = r"([0-9][0-9,]*(?:\.[0-9]+)?)";

macro_rules! field {
    ($label:expr) => {
        Lazy::new(|| {
            Regex::new(&[r"(?im)^\s*", $label, r"\s*\|\s*", NUMBER].join("")).unwrap()
        })
    };
}

static INSTRUCTIONS_REGEX: Lazy<Regex> = field!(r"Instructions");
static CYCLES_REGEX: Lazy<Regex> = field!(r"Cycles");
static IPC_REGEX: Lazy<Regex> = field!(r"IPC");
static TIME_REGEX: Lazy<Regex> = field!(r"Time\s*\(ns\)");

static L3_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*Cache\s+L3\s*\|").unwrap());
static CACHE_ACCESSES_REGEX: Lazy<Regex> = field!(r"num\s+cache\s+access(?:es)?");
static CACHE_MISSES_REGEX: Lazy<Regex> = field!(r"num\s+cache\s+miss(?:es)?");
static MISS_RATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*miss\s+rate\s*\|\s*([0-9.]+)\s*%").unwrap());

static DRAM_HEADER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*DRAM\s+summary\s*\|").unwrap());
static DRAM_ACCESSES_REGEX: Lazy<Regex> = field!(r"num\s+dram\s+(?:accesses|requests)");
static DRAM_LATENCY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^\s*average\s+dram\s+access\s+latency(?:\s*\(([A-Za-z]+)\))?\s*\|\s*([0-9.]+)[ \t]*([A-Za-z]+)?",
    )
    .unwrap()
});

/// Any `label | ...` line, the shape of every report header.
static HEADER_LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[^\s|][^|]*\|").unwrap());

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Locates the block opened by the first line matching `header`.
///
/// The block extends until the next header line that is indented no deeper
/// than the opening header (or the end of the text), so labels of sibling
/// cache levels never leak into it.
pub fn block<'a>(text: &'a str, header: &Regex) -> Option<&'a str> {
    let mut offset = 0;
    let mut lines = text.split_inclusive('\n');
    let header_indent = loop {
        let line = lines.next()?;
        offset += line.len();
        if header.is_match(line) {
            break indentation(line);
        }
    };
    let start = offset;
    for line in lines {
        if !line.trim().is_empty()
            && indentation(line) <= header_indent
            && HEADER_LINE_REGEX.is_match(line)
        {
            return Some(&text[start..offset]);
        }
        offset += line.len();
    }
    Some(&text[start..])
}

fn first_match<'a>(text: &'a str, regex: &Regex) -> Option<&'a str> {
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Whole count, `None` for a fractional value.
fn parse_u64(raw: &str) -> Option<u64> {
    let raw = raw.replace(',', "");
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.fract() != 0.0 {
        log::warn!("ignoring count {raw}: expected a whole number");
        return None;
    }
    Some(value as u64)
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

fn parse_l3(text: &str) -> cache::Summary {
    let Some(body) = block(text, &L3_HEADER_REGEX) else {
        log::warn!("report has no LLC block");
        return cache::Summary::default();
    };
    cache::Summary {
        accesses: first_match(body, &CACHE_ACCESSES_REGEX).and_then(parse_u64),
        misses: first_match(body, &CACHE_MISSES_REGEX).and_then(parse_u64),
        miss_rate_pct: first_match(body, &MISS_RATE_REGEX).and_then(parse_f64),
    }
}

fn parse_dram(text: &str) -> DRAM {
    let Some(body) = block(text, &DRAM_HEADER_REGEX) else {
        log::debug!("report has no DRAM summary");
        return DRAM::default();
    };
    let latency = DRAM_LATENCY_REGEX.captures(body).and_then(|cap| {
        let value = parse_f64(cap.get(2)?.as_str())?;
        let unit = cap
            .get(3)
            .or_else(|| cap.get(1))
            .map(|m| m.as_str().to_string());
        Some(dram::Latency { value, unit })
    });
    DRAM {
        accesses: first_match(body, &DRAM_ACCESSES_REGEX).and_then(parse_u64),
        latency,
    }
}

/// Extracts timing, coarse LLC counts and the DRAM summary from report text.
pub fn parse_report(text: &str, options: &Options) -> Result<Report, Error> {
    let report = Report {
        sim: Sim {
            instructions: first_match(text, &INSTRUCTIONS_REGEX).and_then(parse_u64),
            cycles: first_match(text, &CYCLES_REGEX).and_then(parse_u64),
            ipc: first_match(text, &IPC_REGEX).and_then(parse_f64),
            time_ns: first_match(text, &TIME_REGEX).and_then(parse_f64),
        },
        l3: parse_l3(text),
        dram: parse_dram(text),
    };

    let required = [
        ("Instructions", report.sim.instructions.is_some()),
        ("Cycles", report.sim.cycles.is_some()),
        ("IPC", report.sim.ipc.is_some()),
        ("Time (ns)", report.sim.time_ns.is_some()),
        ("num cache accesses", report.l3.accesses.is_some()),
        ("num cache misses", report.l3.misses.is_some()),
        ("miss rate", report.l3.miss_rate_pct.is_some()),
    ];
    for (field, found) in required {
        if found {
            continue;
        }
        if options.strict {
            return Err(Error::MissingField { field });
        }
        log::warn!("report field {field:?} not found, leaving it unknown");
    }
    Ok(report)
}

/// Reads and parses the report at `path`.
///
/// A missing report is fatal for the run.
pub fn read_report(path: impl AsRef<Path>, options: &Options) -> Result<Report, Error> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingReport(path.to_path_buf()));
    }
    let text = utils::fs::read_to_string_lossy(path)?;
    parse_report(&text, options)
}
