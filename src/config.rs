use crate::position_key::EnPassantPolicy;

use shakmaty::Color;
use std::collections::BTreeSet;

/// Usernames of the tracked player, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectSet {
    names: BTreeSet<String>,
}

impl SubjectSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list, e.g. `'senseidanya, ohmylands'`.
    pub fn parse(raw: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let subjects = Self::new(raw.split(','));
        if subjects.is_empty() {
            return Err(format!(
                "Invalid subjects value '{}'. Expected a comma-separated list of usernames.",
                raw.trim()
            )
            .into());
        }
        Ok(subjects)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The colour the subject plays in a game between `white` and `black`.
    /// White wins when both names match.
    pub fn color_in(&self, white: Option<&str>, black: Option<&str>) -> Option<Color> {
        if white.is_some_and(|name| self.contains(name)) {
            Some(Color::White)
        } else if black.is_some_and(|name| self.contains(name)) {
            Some(Color::Black)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(format!(
                "Invalid compression value '{}'. Supported values: 'zstd' or NULL/omitted.",
                normalized
            )
            .into())
        }
    }
}

/// Parse a boolean named parameter (`true`/`false`, as DuckDB renders them).
pub fn parse_flag(name: &str, raw: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!(
            "Invalid {} value '{}'. Supported values: true, false.",
            name, other
        )
        .into()),
    }
}

/// Settings for one `read_positions` or `export_positions` scan.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub subjects: SubjectSet,
    pub compression: CompressionMode,
    pub en_passant: EnPassantPolicy,
    /// Strip chess.com game links from video sets before emitting rows.
    pub purge_game_links: bool,
}

impl ExtractionConfig {
    pub fn new(subjects: SubjectSet) -> Self {
        Self {
            subjects,
            compression: CompressionMode::Plain,
            en_passant: EnPassantPolicy::Legal,
            purge_game_links: true,
        }
    }
}
