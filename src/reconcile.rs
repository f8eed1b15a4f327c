use serde::Serialize;
use stats::EventCounts;

/// Read and write hits that add up to `accesses - misses`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ReconciledCounts {
    pub read_hits: u64,
    pub write_hits: u64,
    /// Hits missing from the classified counts before reconciliation.
    pub gap: u64,
    /// Part of the gap attributed to coherency upgrades (as write hits).
    pub coherency: u64,
    /// Part of the gap split in proportion to the classified hits.
    pub split: u64,
    /// Classified hits in excess of `accesses - misses`.
    pub surplus: u64,
}

impl ReconciledCounts {
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.read_hits + self.write_hits
    }

    /// Largest deviation of the classified hits from the total, either way.
    #[must_use]
    pub fn mismatch(&self) -> u64 {
        self.gap.max(self.surplus)
    }
}

/// `total * part / whole`, rounded down.
fn proportion(total: u64, part: u64, whole: u64) -> u64 {
    let share = u128::from(total) * u128::from(part) / u128::from(whole);
    // part <= whole, hence share <= total
    u64::try_from(share).unwrap_or(total)
}

/// Distributes unclassified hits so that read and write hits add up to
/// `max(accesses - misses, 0)`.
///
/// Unclassified hits are attributed to coherency upgrades first, which are
/// costed as write hits. The remainder is split in the ratio of the
/// classified read and write hits, or evenly if there are none.
///
/// Returns `None` if any of the accesses, misses, read or write hits
/// is unknown.
#[must_use]
pub fn reconcile(counts: &EventCounts) -> Option<ReconciledCounts> {
    let (Some(total), Some(read_hits), Some(write_hits)) =
        (counts.hits(), counts.read_hits, counts.write_hits)
    else {
        log::debug!("not reconciling incomplete counts {counts:?}");
        return None;
    };
    let counted = read_hits + write_hits;

    if counted >= total {
        let read_hits = read_hits.min(total);
        let surplus = counted - total;
        if surplus > 0 {
            log::debug!("clamping write hits: {surplus} classified hits in excess");
        }
        return Some(ReconciledCounts {
            read_hits,
            write_hits: total - read_hits,
            surplus,
            ..ReconciledCounts::default()
        });
    }

    let gap = total - counted;
    let coherency = gap.min(counts.coherency_upgrades.unwrap_or(0));
    let split = gap - coherency;

    let read_share = if counted == 0 {
        split / 2
    } else {
        proportion(split, read_hits, counted)
    };
    let write_share = split - read_share;

    log::debug!(
        "reconciling {gap} unclassified hits: {coherency} coherency, {read_share} read, {write_share} write"
    );
    Some(ReconciledCounts {
        read_hits: read_hits + read_share,
        write_hits: write_hits + coherency + write_share,
        gap,
        coherency,
        split,
        surplus: 0,
    })
}
