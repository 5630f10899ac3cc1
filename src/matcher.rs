use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::hashing::Landmark;
use crate::index::IndexReader;

/// One ranked identification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub track_id: u32,
    /// Fraction of distinct query landmarks that agree on `offset`, in [0, 1].
    pub score: f32,
    /// Dominant time alignment of the query into the track, in hop-size bins.
    /// Negative when the query starts before the indexed material.
    pub offset: i32,
    /// Absolute count behind `score`.
    pub aligned_hits: usize,
}

/// Rank candidate tracks by offset-aligned landmark agreement.
///
/// For every query landmark the index is consulted, and each returned posting
/// votes into a per-track histogram keyed by `anchor_time - query_time`. A
/// genuine match concentrates its votes on a single offset; a coincidental
/// one scatters them. The per-track score is the tallest histogram bin
/// divided by the distinct-query size, so a raw abundance of shared hashes
/// does not outrank temporal alignment.
///
/// Query records are de-duplicated before lookup; together with de-duplicated
/// postings this bounds every score by 1.0. Ordering is deterministic: score
/// descending, then track id ascending; within one track the smallest of the
/// equally-tall offsets wins. Tracks without a single hit are omitted rather
/// than reported with score zero. Index read failures surface unchanged.
pub fn match_landmarks(
    query: &[Landmark],
    index: &dyn IndexReader,
    config: &Config,
) -> Result<Vec<Match>> {
    let unique: HashSet<Landmark> = query.iter().copied().collect();
    if unique.is_empty() {
        return Ok(Vec::new());
    }
    let query_size = unique.len();

    let mut histograms: HashMap<u32, HashMap<i32, usize>> = HashMap::new();
    for landmark in &unique {
        for posting in index.lookup(landmark.hash)? {
            let offset = posting.anchor_time as i64 - i64::from(landmark.anchor_time);
            *histograms
                .entry(posting.track_id)
                .or_default()
                .entry(offset as i32)
                .or_insert(0) += 1;
        }
    }

    let mut matches = Vec::new();
    for (track_id, histogram) in histograms {
        let best = histogram
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)));
        if let Some((&offset, &aligned_hits)) = best {
            let score = aligned_hits as f32 / query_size as f32;
            if score >= config.match_threshold {
                matches.push(Match {
                    track_id,
                    score,
                    offset,
                    aligned_hits,
                });
            }
        }
    }

    matches.sort_by(|a, b| {
        b.aligned_hits
            .cmp(&a.aligned_hits)
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
    matches.truncate(config.max_results as usize);

    debug!(
        query_size,
        candidates = matches.len(),
        "ranked offset-aligned matches"
    );
    Ok(matches)
}
