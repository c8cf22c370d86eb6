//! High score leaderboard system
//!
//! Every finished run is recorded once. Entries are kept ordered by score,
//! highest first; capacity is a tuning value (`None` keeps every run).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persistence::{KeyValueStore, load_json, save_json};

/// A single finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Final score
    pub score: u64,
    /// Unix timestamp (ms) when the run ended
    pub timestamp: f64,
    /// Name the player entered (or "Player")
    #[serde(alias = "player")]
    pub player_name: String,
}

/// Ranked leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<ScoreEntry>,
    #[serde(skip)]
    capacity: Option<usize>,
}

impl HighScores {
    /// Create an empty leaderboard
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Check if a score would make it onto the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        match self.capacity {
            None => true,
            Some(cap) if self.entries.len() < cap => true,
            Some(_) => self.entries.last().map(|e| score > e.score).unwrap_or(true),
        }
    }

    /// Insert a run. Returns the 1-indexed rank, or None if it was cut.
    ///
    /// Ties rank below entries already present.
    pub fn add(&mut self, entry: ScoreEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }

        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);

        if let Some(cap) = self.capacity {
            self.entries.truncate(cap);
        }

        Some(pos + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Re-establish ordering and capacity on data read from storage
    fn normalize(&mut self) {
        // Stable sort keeps earlier entries first among equal scores
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        if let Some(cap) = self.capacity {
            self.entries.truncate(cap);
        }
    }
}

/// Score persistence collaborator
///
/// The frame driver calls `save_score` exactly once per completed run and
/// then re-reads the ordered table for display.
pub trait ScoreStore {
    /// Entries ordered by score, highest first
    fn load_scores(&self) -> Vec<ScoreEntry>;
    /// Record a run; returns the rank achieved if it was kept
    fn save_score(&mut self, entry: ScoreEntry) -> Result<Option<usize>>;
}

/// [`ScoreStore`] backed by a key-value store
pub struct KvScoreStore<S: KeyValueStore> {
    store: S,
    capacity: Option<usize>,
}

impl<S: KeyValueStore> KvScoreStore<S> {
    /// Storage key (shared with the web build's LocalStorage)
    pub const STORAGE_KEY: &'static str = "coffeeRushHighScores";

    pub fn new(store: S, capacity: Option<usize>) -> Self {
        Self { store, capacity }
    }

    fn read(&self) -> HighScores {
        let mut scores = HighScores::new(self.capacity);
        if let Some(entries) = load_json::<Vec<ScoreEntry>>(&self.store, Self::STORAGE_KEY) {
            scores.entries = entries;
            scores.normalize();
        }
        scores
    }
}

impl<S: KeyValueStore> ScoreStore for KvScoreStore<S> {
    fn load_scores(&self) -> Vec<ScoreEntry> {
        self.read().entries
    }

    fn save_score(&mut self, entry: ScoreEntry) -> Result<Option<usize>> {
        let mut scores = self.read();
        let rank = scores.add(entry);
        if rank.is_some() {
            save_json(&mut self.store, Self::STORAGE_KEY, &scores.entries)?;
            log::info!("High scores saved ({} entries)", scores.entries.len());
        }
        Ok(rank)
    }
}

/// Format a timestamp relative to `now` (both Unix ms)
pub fn format_relative(now: f64, timestamp: f64) -> String {
    let diff_mins = (now - timestamp) / 60_000.0;
    let diff_hours = diff_mins / 60.0;
    let diff_days = diff_hours / 24.0;

    if diff_days >= 1.0 {
        match diff_days.floor() as i64 {
            1 => "Yesterday".to_string(),
            days => format!("{} days ago", days),
        }
    } else if diff_hours >= 1.0 {
        match diff_hours.floor() as i64 {
            1 => "1 hour ago".to_string(),
            hours => format!("{} hours ago", hours),
        }
    } else if diff_mins >= 1.0 {
        match diff_mins.floor() as i64 {
            1 => "1 min ago".to_string(),
            mins => format!("{} mins ago", mins),
        }
    } else {
        "Just now".to_string()
    }
}
