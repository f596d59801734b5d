//! Game records from matched-game JSON files.
//!
//! Each file holds an array of entries pairing a chess.com game (`api_game`)
//! with the video it was played in (`csv_game`). Entries whose game was never
//! found upstream have a null `api_game`.

use crate::config::{CompressionMode, SubjectSet};
use crate::error::{GameError, SourceError};
use crate::log;
use crate::types::GameRecord;
use crate::video;

use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

#[derive(Debug, Deserialize)]
struct MatchedEntry {
    #[serde(default)]
    api_game: Option<ApiGame>,
    #[serde(default)]
    csv_game: Option<CsvGame>,
    /// Older exports repeat the video fields at the top level.
    #[serde(default)]
    youtube_url: Option<String>,
    #[serde(default)]
    youtube_timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiGame {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    pgn: Option<String>,
    #[serde(default)]
    white: Option<Player>,
    #[serde(default)]
    black: Option<Player>,
}

#[derive(Debug, Deserialize)]
struct Player {
    username: String,
}

#[derive(Debug, Deserialize)]
struct CsvGame {
    #[serde(default)]
    youtube_url: Option<String>,
    #[serde(default)]
    youtube_timestamp: Option<u64>,
    #[serde(default)]
    chess_url: Option<String>,
}

/// Expand a single path or a glob pattern.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>, SourceError> {
    if pattern.contains('*') || pattern.contains('?') {
        let paths = glob::glob(pattern)
            .map_err(|source| SourceError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .collect();
        Ok(paths)
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

fn open_input_stream(
    path: &Path,
    compression: CompressionMode,
) -> Result<Box<dyn Read>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(BufReader::new(file))),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as Box<dyn Read>)
            .map_err(|source| SourceError::Decoder {
                path: path.to_path_buf(),
                source,
            }),
    }
}

/// Decode every entry of one file. Entries that cannot become a record are
/// returned as errors so the caller can count them.
pub fn read_records(
    path: &Path,
    compression: CompressionMode,
    subjects: &SubjectSet,
) -> Result<Vec<Result<GameRecord, GameError>>, SourceError> {
    let input = open_input_stream(path, compression)?;
    parse_records(input, path, subjects)
}

fn parse_records<R: Read>(
    input: R,
    path: &Path,
    subjects: &SubjectSet,
) -> Result<Vec<Result<GameRecord, GameError>>, SourceError> {
    let entries: Vec<MatchedEntry> =
        serde_json::from_reader(input).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let fallback_ref = format!("{}#{}", path.display(), idx + 1);
            to_record(entry, &fallback_ref, subjects)
        })
        .collect())
}

/// Read every path in order. With a single path a failure is returned; with
/// several, unreadable files are logged and skipped.
pub fn read_all(
    paths: &[PathBuf],
    compression: CompressionMode,
    subjects: &SubjectSet,
) -> Result<Vec<Result<GameRecord, GameError>>, SourceError> {
    let mut records = Vec::new();
    for path in paths {
        match read_records(path, compression, subjects) {
            Ok(mut batch) => records.append(&mut batch),
            Err(err) if paths.len() > 1 => log::warn(err.to_string()),
            Err(err) => return Err(err),
        }
    }
    Ok(records)
}

fn to_record(
    entry: MatchedEntry,
    fallback_ref: &str,
    subjects: &SubjectSet,
) -> Result<GameRecord, GameError> {
    let csv_game = entry.csv_game;
    let game_ref = entry
        .api_game
        .as_ref()
        .and_then(|game| game.url.clone())
        .or_else(|| csv_game.as_ref().and_then(|csv| csv.chess_url.clone()))
        .unwrap_or_else(|| fallback_ref.to_string());

    let Some(api_game) = entry.api_game else {
        return Err(GameError::malformed(&game_ref, "game was not found upstream"));
    };

    let video_url = csv_game
        .as_ref()
        .and_then(|csv| csv.youtube_url.clone())
        .or(entry.youtube_url)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| GameError::malformed(&game_ref, "missing video reference"))?;

    let pgn = api_game
        .pgn
        .filter(|pgn| !pgn.trim().is_empty())
        .ok_or_else(|| GameError::malformed(&game_ref, "missing PGN"))?;

    let white = api_game.white.as_ref().map(|p| p.username.as_str());
    let black = api_game.black.as_ref().map(|p| p.username.as_str());
    let subject = subjects.color_in(white, black).ok_or_else(|| {
        GameError::malformed(
            &game_ref,
            format!(
                "neither '{}' nor '{}' is a tracked player",
                white.unwrap_or("?"),
                black.unwrap_or("?")
            ),
        )
    })?;

    let base_offset = csv_game
        .as_ref()
        .and_then(|csv| csv.youtube_timestamp)
        .or(entry.youtube_timestamp)
        .or_else(|| video::start_offset(&video_url))
        .unwrap_or(0);

    Ok(GameRecord {
        game_ref,
        pgn,
        subject,
        video_url,
        base_offset,
    })
}
