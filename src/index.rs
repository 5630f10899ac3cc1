use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::hashing::Landmark;

/// One entry of a posting list: a track that contains the looked-up hash,
/// and where its anchor sits in that track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub track_id: u32,
    pub anchor_time: u32,
}

/// Read side of the inverted index.
///
/// `lookup` must return every posting previously inserted for `hash` under
/// any track, in unspecified order. Implementations may be called
/// concurrently; each call observes a point-in-time view.
pub trait IndexReader {
    fn lookup(&self, hash: u64) -> Result<Vec<Posting>>;
}

/// Write side of the inverted index.
///
/// `insert_track` must be atomic per track: a concurrent reader either sees
/// all of a track's postings or none of them. Re-inserting a track id
/// replaces its previous postings.
pub trait IndexWriter {
    fn insert_track(&mut self, track_id: u32, landmarks: &[Landmark]) -> Result<()>;
}

/// Process-local inverted index backed by a `HashMap`.
///
/// Suitable for tests and for embedders that keep their library in memory;
/// the durable counterpart is [`crate::database::TrackStore`]. Postings are
/// de-duplicated per `(track, hash, anchor_time)` on insert, matching the
/// SQLite store.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    postings: HashMap<u64, Vec<Posting>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posting_count(&self) -> usize {
        self.postings.values().map(Vec::len).sum()
    }
}

impl IndexWriter for MemoryIndex {
    fn insert_track(&mut self, track_id: u32, landmarks: &[Landmark]) -> Result<()> {
        for list in self.postings.values_mut() {
            list.retain(|p| p.track_id != track_id);
        }

        let mut seen = HashSet::with_capacity(landmarks.len());
        for lm in landmarks {
            if seen.insert((lm.hash, lm.anchor_time)) {
                self.postings.entry(lm.hash).or_default().push(Posting {
                    track_id,
                    anchor_time: lm.anchor_time,
                });
            }
        }
        Ok(())
    }
}

impl IndexReader for MemoryIndex {
    fn lookup(&self, hash: u64) -> Result<Vec<Posting>> {
        Ok(self.postings.get(&hash).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(hash: u64, anchor_time: u32) -> Landmark {
        Landmark { hash, anchor_time }
    }

    #[test]
    fn lookup_returns_postings_across_tracks() {
        let mut index = MemoryIndex::new();
        index.insert_track(1, &[lm(7, 0), lm(9, 4)]).unwrap();
        index.insert_track(2, &[lm(7, 11)]).unwrap();

        let mut hits = index.lookup(7).unwrap();
        hits.sort_by_key(|p| p.track_id);
        assert_eq!(
            hits,
            vec![
                Posting {
                    track_id: 1,
                    anchor_time: 0
                },
                Posting {
                    track_id: 2,
                    anchor_time: 11
                }
            ]
        );
        assert!(index.lookup(12345).unwrap().is_empty());
    }

    #[test]
    fn duplicate_records_collapse() {
        let mut index = MemoryIndex::new();
        index.insert_track(1, &[lm(7, 3), lm(7, 3), lm(7, 5)]).unwrap();
        assert_eq!(index.lookup(7).unwrap().len(), 2);
    }

    #[test]
    fn reinsert_replaces_previous_postings() {
        let mut index = MemoryIndex::new();
        index.insert_track(1, &[lm(7, 3), lm(8, 4)]).unwrap();
        index.insert_track(1, &[lm(9, 0)]).unwrap();

        assert!(index.lookup(7).unwrap().is_empty());
        assert!(index.lookup(8).unwrap().is_empty());
        assert_eq!(index.lookup(9).unwrap().len(), 1);
        assert_eq!(index.posting_count(), 1);
    }
}
