//! Veritas History Store
//!
//! SQLite persistence for finished verifications: the claim, the sources it
//! was checked against and the answer delivered.
//!
//! # Examples
//!
//! ```no_run
//! use veritas_domain::HistoryStore;
//! use veritas_store::SqliteHistoryStore;
//!
//! let store = SqliteHistoryStore::new("veritas.db").unwrap();
//! let recent = store.recent(10).unwrap();
//! ```

#![warn(missing_docs)]

use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use veritas_domain::{
    Answer, Citation, ClaimId, HistoryEntry, HistoryStore, Outcome, Rating, Source, Verdict,
};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Column value could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SQLite-backed [`HistoryStore`]
///
/// Recording a claim twice replaces the earlier entry. Connections are not
/// shared between threads; wrap the store in a mutex to share it.
pub struct SqliteHistoryStore {
    conn: Connection,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`
    ///
    /// Use `:memory:` for an in-memory database.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Number of recorded claims
    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM claims", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn load_sources(&self, claim_id: &str) -> Result<Vec<Source>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT url, domain, title, body, rank, score, topic, entities
             FROM sources WHERE claim_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![claim_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(url, domain, title, body, rank, score, topic, entities)| {
                let rating = match (rank, score) {
                    (Some(rank), Some(score)) => Rating::Rated { rank, score },
                    _ => Rating::Unrated,
                };
                Ok(Source {
                    url,
                    domain,
                    title,
                    body,
                    rating,
                    entities: serde_json::from_str(&entities)?,
                    topic,
                })
            })
            .collect()
    }
}

fn outcome_to_str(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Answered => "answered",
        Outcome::InsufficientEvidence => "insufficient_evidence",
    }
}

fn str_to_outcome(s: &str) -> Result<Outcome, StoreError> {
    match s {
        "answered" => Ok(Outcome::Answered),
        "insufficient_evidence" => Ok(Outcome::InsufficientEvidence),
        _ => Err(StoreError::InvalidData(format!("Unknown outcome: {}", s))),
    }
}

impl HistoryStore for SqliteHistoryStore {
    type Error = StoreError;

    fn record(&mut self, entry: &HistoryEntry) -> Result<(), Self::Error> {
        let id = entry.claim_id.to_string();
        let answer = &entry.answer;
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM claims WHERE id = ?1", params![&id])?;
        tx.execute(
            "INSERT INTO claims (id, text, title) VALUES (?1, ?2, ?3)",
            params![&id, &entry.claim, &entry.title],
        )?;
        tx.execute(
            "INSERT INTO answers (claim_id, verdict, explanation, outcome, citations, diagram, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &id,
                answer.verdict.to_string(),
                &answer.explanation,
                outcome_to_str(answer.outcome),
                serde_json::to_string(&answer.citations)?,
                &answer.diagram,
                i64::try_from(answer.created_at).unwrap_or(i64::MAX),
            ],
        )?;
        for (position, source) in entry.sources.iter().enumerate() {
            let (rank, score) = match &source.rating {
                Rating::Rated { rank, score } => (Some(rank.as_str()), Some(*score)),
                Rating::Unrated => (None, None),
            };
            tx.execute(
                "INSERT OR REPLACE INTO sources
                 (claim_id, position, url, domain, title, body, rank, score, topic, entities)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    &id,
                    position as i64,
                    &source.url,
                    &source.domain,
                    &source.title,
                    &source.body,
                    rank,
                    score,
                    &source.topic,
                    serde_json::to_string(&source.entities)?,
                ],
            )?;
        }
        tx.commit()?;

        debug!("Recorded claim {} with {} sources", id, entry.sources.len());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.text, c.title, a.verdict, a.explanation, a.outcome, a.citations,
                    a.diagram, a.created_at
             FROM claims c JOIN answers a ON a.claim_id = c.id
             ORDER BY a.created_at DESC, c.rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (id, text, title, verdict, explanation, outcome, citations, diagram, created_at) in rows {
            let claim_id = ClaimId::from_string(&id).map_err(StoreError::InvalidData)?;
            let verdict = Verdict::parse(&verdict)
                .ok_or_else(|| StoreError::InvalidData(format!("Unknown verdict: {}", verdict)))?;
            let citations: Vec<Citation> = serde_json::from_str(&citations)?;
            let sources = self.load_sources(&id)?;

            entries.push(HistoryEntry {
                claim_id,
                claim: text,
                title,
                sources,
                answer: Answer {
                    claim_id,
                    verdict,
                    explanation,
                    citations,
                    diagram,
                    outcome: str_to_outcome(&outcome)?,
                    created_at: u64::try_from(created_at).unwrap_or(0),
                },
            });
        }
        Ok(entries)
    }

    fn clear(&mut self) -> Result<usize, Self::Error> {
        let deleted = self.conn.execute("DELETE FROM claims", [])?;
        debug!("Cleared {} history entries", deleted);
        Ok(deleted)
    }
}
