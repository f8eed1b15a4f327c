//! ROI queries against the per-run statistics store (`sim.stats.sqlite3`).
//!
//! The store maps `(prefix, object, metric)` to a value per core. Prefixes
//! `roi-begin` and `roi-end` are checkpoints taken at the region of interest
//! boundaries. When a metric was recorded at both checkpoints its ROI value
//! is the difference, otherwise the `roi-end` value is used as is.

use super::Error;
use rusqlite::{Connection, OpenFlags};
use stats::{EventCounts, HitSplit, LatencyBuckets, Metric, Store};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const STORE_FILE: &str = "sim.stats.sqlite3";

pub const ROI_BEGIN: &str = "roi-begin";
pub const ROI_END: &str = "roi-end";

/// Metric name prefix of the per-component uncore time counters.
pub const UNCORE_TIME_PREFIX: &str = "uncore-time-";

/// Which objects contribute hit counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only the LLC object itself.
    Local,
    /// The LLC object plus every object sharing its name as a prefix
    /// (forwarded or remote slices).
    #[default]
    WithRemote,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Options {
    pub object: String,
    pub scope: Scope,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            object: "L3".to_string(),
            scope: Scope::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Objects {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metrics<'a> {
    Named(&'a [Metric]),
    Prefixed(&'a str),
}

/// Object, metric and core of one recorded counter.
type Key = (String, String, i64);

fn sum(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    Some(a? + b?)
}

struct Reader<'a> {
    conn: &'a Connection,
    path: &'a Path,
    options: &'a Options,
}

impl<'a> Reader<'a> {
    fn store_error(&self, source: rusqlite::Error) -> Error {
        Error::Store {
            path: self.path.to_path_buf(),
            source,
        }
    }

    /// Values at one checkpoint, summed per object, metric and core.
    fn checkpoint(
        &self,
        prefix: &str,
        objects: Objects,
        metrics: Metrics<'_>,
    ) -> Result<Vec<(Key, f64)>, Error> {
        let mut sql = String::from(
            r#"SELECT n.objectname, n.metricname, v.core, TOTAL(v.value)
            FROM "values" v
            JOIN names    n ON v.nameid   = n.nameid
            JOIN prefixes p ON v.prefixid = p.prefixid
            WHERE p.prefixname = ? AND v.value IS NOT NULL"#,
        );
        let mut params: Vec<String> = vec![prefix.to_string()];

        match objects {
            Objects::Local => {
                sql.push_str(" AND n.objectname = ?");
                params.push(self.options.object.clone());
            }
            Objects::Remote => {
                sql.push_str(" AND n.objectname LIKE ? AND n.objectname != ?");
                params.push(format!("{}%", self.options.object));
                params.push(self.options.object.clone());
            }
        }

        match metrics {
            Metrics::Named(names) => {
                let marks = vec!["?"; names.len()].join(",");
                sql.push_str(&format!(" AND n.metricname IN ({marks})"));
                params.extend(names.iter().map(|m| m.name().to_string()));
            }
            Metrics::Prefixed(prefix) => {
                sql.push_str(" AND n.metricname LIKE ?");
                params.push(format!("{prefix}%"));
            }
        }
        sql.push_str(
            " GROUP BY n.objectname, n.metricname, v.core ORDER BY n.objectname, n.metricname, v.core",
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|source| self.store_error(source))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(((row.get(0)?, row.get(1)?, row.get(2)?), row.get(3)?))
            })
            .map_err(|source| self.store_error(source))?
            .collect::<Result<Vec<(Key, f64)>, _>>()
            .map_err(|source| self.store_error(source))?;
        Ok(rows)
    }

    /// ROI value of the matching counters, `None` if none was recorded.
    ///
    /// Every counter is checked on its own before summing, so a decrease
    /// is never hidden by a sibling counter growing.
    fn roi(&self, objects: Objects, metrics: Metrics<'_>) -> Result<Option<f64>, Error> {
        let end = self.checkpoint(ROI_END, objects, metrics)?;
        if end.is_empty() {
            return Ok(None);
        }
        let begin: HashMap<Key, f64> = self
            .checkpoint(ROI_BEGIN, objects, metrics)?
            .into_iter()
            .collect();

        let mut total = 0.0;
        for (key, end) in end {
            match begin.get(&key).copied() {
                Some(begin) if end < begin => {
                    let (object, metric, core) = key;
                    log::error!(
                        "{object}/{metric} on core {core} decreased over the ROI ({begin} -> {end}) in {}",
                        self.path.display()
                    );
                    return Err(Error::NegativeDelta {
                        path: self.path.to_path_buf(),
                        object,
                        metric,
                        core,
                        begin: begin as i64,
                        end: end as i64,
                    });
                }
                Some(begin) => total += end - begin,
                None => total += end,
            }
        }
        Ok(Some(total))
    }

    fn count(&self, objects: Objects, metrics: &[Metric]) -> Result<Option<u64>, Error> {
        let value = self.roi(objects, Metrics::Named(metrics))?;
        Ok(value.map(|value| value.round() as u64))
    }

    /// Counter every well-formed store records, unknown if it is absent.
    fn required(&self, metric: Metric) -> Result<Option<u64>, Error> {
        let value = self.count(Objects::Local, &[metric])?;
        if value.is_none() {
            log::warn!(
                "{}/{} not recorded in {}, leaving it unknown",
                self.options.object,
                metric.name(),
                self.path.display()
            );
        }
        Ok(value)
    }

    /// Hits of forwarded or remote slices, zero if there are none.
    fn remote(&self, metric: Metric) -> Result<u64, Error> {
        match self.options.scope {
            Scope::Local => Ok(0),
            Scope::WithRemote => Ok(self.count(Objects::Remote, &[metric])?.unwrap_or(0)),
        }
    }

    fn optional(&self, metric: Metric) -> Result<Option<u64>, Error> {
        self.count(Objects::Local, &[metric])
    }

    fn time(&self, metrics: Metrics<'_>) -> Result<Option<f64>, Error> {
        self.roi(Objects::Local, metrics)
    }

    fn event_counts(&self) -> Result<EventCounts, Error> {
        let local_read_hits = self.required(Metric::ReadHits)?;
        let local_write_hits = self.required(Metric::WriteHits)?;
        let hit_split = HitSplit {
            local_read_hits: local_read_hits.unwrap_or(0),
            local_write_hits: local_write_hits.unwrap_or(0),
            remote_read_hits: self.remote(Metric::ReadHits)?,
            remote_write_hits: self.remote(Metric::WriteHits)?,
        };
        Ok(EventCounts {
            accesses: sum(self.required(Metric::Loads)?, self.required(Metric::Stores)?),
            misses: sum(
                self.required(Metric::LoadMisses)?,
                self.required(Metric::StoreMisses)?,
            ),
            read_hits: local_read_hits.map(|hits| hits + hit_split.remote_read_hits),
            write_hits: local_write_hits.map(|hits| hits + hit_split.remote_write_hits),
            writebacks: self.optional(Metric::Writebacks)?,
            evictions: self.optional(Metric::Evictions)?,
            secondary_misses: self.optional(Metric::SecondaryMisses)?,
            coherency_upgrades: self.optional(Metric::CoherencyUpgrades)?,
            prefetch_hits: self.optional(Metric::PrefetchHits)?,
            prefetch_evictions: self.optional(Metric::PrefetchEvictions)?,
            hit_split,
        })
    }

    fn latency(&self) -> Result<LatencyBuckets, Error> {
        Ok(LatencyBuckets {
            total_ns: self.time(Metrics::Named(&[Metric::TotalLatency]))?,
            mshr_ns: self.time(Metrics::Named(&[Metric::MshrLatency]))?,
            snoop_ns: self.time(Metrics::Named(&[Metric::SnoopLatency]))?,
            qbs_query_ns: self.time(Metrics::Named(&[Metric::QbsQueryLatency]))?,
            uncore_time_ns: self.time(Metrics::Prefixed(UNCORE_TIME_PREFIX))?,
            uncore_requests: self.optional(Metric::UncoreRequests)?,
        })
    }
}

#[must_use]
pub fn store_path(run_dir: impl AsRef<Path>) -> PathBuf {
    run_dir.as_ref().join(STORE_FILE)
}

/// Reads the exact LLC breakdown of the run in `run_dir`.
///
/// Returns `Ok(None)` when the run has no statistics store, which is an
/// expected state and not an error. The connection is closed before
/// returning.
pub fn read(run_dir: impl AsRef<Path>, options: &Options) -> Result<Option<Store>, Error> {
    let path = store_path(run_dir);
    if !path.is_file() {
        log::info!("no statistics store at {}", path.display());
        return Ok(None);
    }
    let conn = Connection::open_with_flags(
        &path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| Error::Store {
        path: path.clone(),
        source,
    })?;

    let reader = Reader {
        conn: &conn,
        path: &path,
        options,
    };
    let store = Store {
        counts: reader.event_counts()?,
        latency: reader.latency()?,
    };
    log::debug!("read {} from {}", options.object, path.display());
    Ok(Some(store))
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    //! Builds statistics stores with the simulator's schema.
    use rusqlite::Connection;
    use std::path::Path;

    pub struct Builder {
        conn: Connection,
    }

    impl Builder {
        pub fn create(run_dir: &Path) -> rusqlite::Result<Self> {
            let conn = Connection::open(super::store_path(run_dir))?;
            conn.execute_batch(
                r#"
                CREATE TABLE names (nameid INTEGER PRIMARY KEY, objectname TEXT, metricname TEXT);
                CREATE TABLE prefixes (prefixid INTEGER PRIMARY KEY, prefixname TEXT);
                CREATE TABLE "values" (prefixid INTEGER, nameid INTEGER, core INTEGER, value INTEGER);
                "#,
            )?;
            Ok(Self { conn })
        }

        fn id(&self, table: &str, column: &str, filter: &str, value: &str) -> rusqlite::Result<i64> {
            let existing = self.conn.query_row(
                &format!("SELECT {column} FROM {table} WHERE {filter} = ?"),
                [value],
                |row| row.get(0),
            );
            match existing {
                Ok(id) => Ok(id),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    self.conn.execute(
                        &format!("INSERT INTO {table} ({filter}) VALUES (?)"),
                        [value],
                    )?;
                    Ok(self.conn.last_insert_rowid())
                }
                Err(err) => Err(err),
            }
        }

        pub fn insert(
            &self,
            prefix: &str,
            object: &str,
            metric: &str,
            core: i64,
            value: i64,
        ) -> rusqlite::Result<&Self> {
            let prefix_id = self.id("prefixes", "prefixid", "prefixname", prefix)?;
            let name_id = match self.conn.query_row(
                "SELECT nameid FROM names WHERE objectname = ? AND metricname = ?",
                [object, metric],
                |row| row.get::<_, i64>(0),
            ) {
                Ok(id) => id,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    self.conn.execute(
                        "INSERT INTO names (objectname, metricname) VALUES (?, ?)",
                        [object, metric],
                    )?;
                    self.conn.last_insert_rowid()
                }
                Err(err) => return Err(err),
            };
            self.conn.execute(
                r#"INSERT INTO "values" (prefixid, nameid, core, value) VALUES (?, ?, ?, ?)"#,
                [prefix_id, name_id, core, value],
            )?;
            Ok(self)
        }

        /// Records `value` at `roi-end` only.
        pub fn end(&self, object: &str, metric: &str, value: i64) -> rusqlite::Result<&Self> {
            self.insert(super::ROI_END, object, metric, 0, value)
        }

        /// Records both ROI checkpoints.
        pub fn roi(
            &self,
            object: &str,
            metric: &str,
            begin: i64,
            end: i64,
        ) -> rusqlite::Result<&Self> {
            self.insert(super::ROI_BEGIN, object, metric, 0, begin)?;
            self.insert(super::ROI_END, object, metric, 0, end)
        }
    }
}
