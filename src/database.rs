use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hashing::Landmark;
use crate::index::{IndexReader, IndexWriter, Posting};

/// Catalogue row for one indexed track. The matcher never consults this;
/// it exists for the surfaces that present results.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub track_id: u32,
    pub name: String,
    pub artist: Option<String>,
    pub duration_s: Option<f32>,
}

/// SQLite-backed inverted index plus track catalogue.
///
/// Layout follows the logical schema: `tracks` for metadata, `postings` for
/// the `hash -> (track_id, anchor_time)` relation with the hash column
/// covered by an index. Hashes are stored as `i64` via bit-cast and read
/// back the same way. All postings of one track are written in a single
/// transaction, so no reader ever observes a partially indexed track, and
/// `(hash, anchor_time)` pairs are de-duplicated per track on insert.
pub struct TrackStore {
    conn: Connection,
}

impl TrackStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(Error::index_write)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::index_write)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS tracks (
                 track_id INTEGER PRIMARY KEY,
                 name TEXT NOT NULL,
                 artist TEXT,
                 duration_s REAL,
                 created_at DATETIME DEFAULT CURRENT_TIMESTAMP
             );
             CREATE TABLE IF NOT EXISTS postings (
                 hash INTEGER NOT NULL,
                 track_id INTEGER NOT NULL,
                 anchor_time INTEGER NOT NULL,
                 FOREIGN KEY (track_id) REFERENCES tracks(track_id) ON DELETE CASCADE
             );
             CREATE INDEX IF NOT EXISTS idx_postings_hash ON postings (hash);
             CREATE INDEX IF NOT EXISTS idx_postings_track ON postings (track_id);",
        )
        .map_err(Error::index_write)?;
        Ok(TrackStore { conn })
    }

    /// Register a track and its landmarks in one transaction.
    ///
    /// Either the catalogue row and every posting land together, or nothing
    /// does; a partial fingerprint is never persisted.
    pub fn enroll_track(
        &mut self,
        name: &str,
        artist: Option<&str>,
        duration_s: Option<f32>,
        landmarks: &[Landmark],
    ) -> Result<u32> {
        let tx = self.conn.transaction().map_err(Error::index_write)?;
        tx.execute(
            "INSERT INTO tracks (name, artist, duration_s) VALUES (?1, ?2, ?3)",
            params![name, artist, duration_s],
        )
        .map_err(Error::index_write)?;
        let track_id = tx.last_insert_rowid() as u32;

        let inserted = insert_postings(&tx, track_id, landmarks)?;
        tx.commit().map_err(Error::index_write)?;

        info!(track_id, name, postings = inserted, "enrolled track");
        Ok(track_id)
    }

    pub fn track(&self, track_id: u32) -> Result<Option<TrackInfo>> {
        self.conn
            .query_row(
                "SELECT track_id, name, artist, duration_s FROM tracks WHERE track_id = ?1",
                params![track_id],
                |row| {
                    Ok(TrackInfo {
                        track_id: row.get::<_, i64>(0)? as u32,
                        name: row.get(1)?,
                        artist: row.get(2)?,
                        duration_s: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Error::index_read)
    }

    pub fn list_tracks(&self) -> Result<Vec<TrackInfo>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT track_id, name, artist, duration_s FROM tracks ORDER BY track_id",
            )
            .map_err(Error::index_read)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TrackInfo {
                    track_id: row.get::<_, i64>(0)? as u32,
                    name: row.get(1)?,
                    artist: row.get(2)?,
                    duration_s: row.get(3)?,
                })
            })
            .map_err(Error::index_read)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::index_read)
    }

    pub fn track_count(&self) -> Result<u64> {
        self.scalar("SELECT COUNT(*) FROM tracks")
    }

    pub fn posting_count(&self) -> Result<u64> {
        self.scalar("SELECT COUNT(*) FROM postings")
    }

    fn scalar(&self, sql: &str) -> Result<u64> {
        self.conn
            .query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(Error::index_read)
    }
}

fn insert_postings(
    tx: &rusqlite::Transaction<'_>,
    track_id: u32,
    landmarks: &[Landmark],
) -> Result<usize> {
    let mut stmt = tx
        .prepare_cached("INSERT INTO postings (hash, track_id, anchor_time) VALUES (?1, ?2, ?3)")
        .map_err(Error::index_write)?;

    let mut seen = HashSet::with_capacity(landmarks.len());
    let mut inserted = 0;
    for lm in landmarks {
        if seen.insert((lm.hash, lm.anchor_time)) {
            stmt.execute(params![lm.hash as i64, track_id, lm.anchor_time])
                .map_err(Error::index_write)?;
            inserted += 1;
        }
    }
    Ok(inserted)
}

impl IndexWriter for TrackStore {
    /// Replace the postings of an already catalogued track.
    fn insert_track(&mut self, track_id: u32, landmarks: &[Landmark]) -> Result<()> {
        let tx = self.conn.transaction().map_err(Error::index_write)?;
        tx.execute(
            "DELETE FROM postings WHERE track_id = ?1",
            params![track_id],
        )
        .map_err(Error::index_write)?;
        let inserted = insert_postings(&tx, track_id, landmarks)?;
        tx.commit().map_err(Error::index_write)?;

        debug!(track_id, postings = inserted, "reindexed track");
        Ok(())
    }
}

impl IndexReader for TrackStore {
    fn lookup(&self, hash: u64) -> Result<Vec<Posting>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT track_id, anchor_time FROM postings WHERE hash = ?1")
            .map_err(Error::index_read)?;
        let rows = stmt
            .query_map(params![hash as i64], |row| {
                Ok(Posting {
                    track_id: row.get::<_, i64>(0)? as u32,
                    anchor_time: row.get::<_, i64>(1)? as u32,
                })
            })
            .map_err(Error::index_read)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::index_read)
    }
}
