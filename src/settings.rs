//! Player preferences
//!
//! Persisted separately from the leaderboard in the key-value store.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persistence::{KeyValueStore, load_json, save_json};

/// Name used when the player declines to enter one
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Longest name shown on the leaderboard
pub const MAX_NAME_CHARS: usize = 24;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name recorded with each score
    pub player_name: String,
    /// Whether the player has answered the name prompt
    pub name_chosen: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            name_chosen: false,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "coffeeRushSettings";

    /// Whether the name prompt should be shown
    pub fn needs_name(&self) -> bool {
        !self.name_chosen
    }

    /// Apply the name prompt's answer: trimmed, blank falls back to "Player"
    pub fn set_player_name(&mut self, input: Option<&str>) {
        self.player_name = normalize_player_name(input);
        self.name_chosen = true;
    }

    /// Load settings, falling back to defaults on missing or corrupt data
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match load_json::<Settings>(store, Self::STORAGE_KEY) {
            Some(settings) => {
                log::info!("Loaded settings for '{}'", settings.player_name);
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}

/// Trim and bound a player name; blank or missing becomes "Player"
pub fn normalize_player_name(input: Option<&str>) -> String {
    match input.map(str::trim) {
        Some(name) if !name.is_empty() => name.chars().take(MAX_NAME_CHARS).collect(),
        _ => DEFAULT_PLAYER_NAME.to_string(),
    }
}
