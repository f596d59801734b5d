use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons a single game is skipped. Errors stay local to one game: the
/// per-game positions are dropped and the batch moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("malformed game '{game_ref}': {reason}")]
    MalformedGame { game_ref: String, reason: String },
    #[error("illegal move in game '{game_ref}' at ply {ply}: '{san}' ({reason})")]
    IllegalMove {
        game_ref: String,
        ply: usize,
        san: String,
        reason: String,
    },
}

impl GameError {
    pub fn malformed(game_ref: &str, reason: impl Into<String>) -> Self {
        Self::MalformedGame {
            game_ref: game_ref.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedGame { .. } => "malformed_game",
            Self::IllegalMove { .. } => "illegal_move",
        }
    }
}

/// Failures reading game records from disk.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to initialize zstd decoder for '{path}': {source}")]
    Decoder { path: PathBuf, source: io::Error },
    #[error("invalid game records in '{path}': {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid path pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Failures writing the frontend export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to read titles from '{path}': {source}")]
    TitlesOpen { path: PathBuf, source: io::Error },
    #[error("invalid titles in '{path}': {source}")]
    Titles {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to create '{path}': {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionKeyError {
    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
}
