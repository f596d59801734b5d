//! Frontend export of a position index.

use crate::aggregate::{PositionAggregate, PositionIndex};
use crate::error::ExportError;
use crate::video;

use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Looks up a human-readable title for a video id.
pub trait TitleResolver {
    fn title(&self, video_id: &str) -> Option<String>;
}

/// Resolver that never knows a title.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTitles;

impl TitleResolver for NoTitles {
    fn title(&self, _video_id: &str) -> Option<String> {
        None
    }
}

impl TitleResolver for HashMap<String, String> {
    fn title(&self, video_id: &str) -> Option<String> {
        self.get(video_id).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoEntry {
    pub url: String,
    pub video_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionEntry {
    pub fen: String,
    pub videos: Vec<VideoEntry>,
    pub next_by_subject: Vec<String>,
    pub next_faced: Vec<String>,
}

fn to_entry<R: TitleResolver + ?Sized>(
    fen: String,
    aggregate: &PositionAggregate,
    titles: &R,
) -> PositionEntry {
    let videos = aggregate
        .videos
        .iter()
        .map(|url| {
            let video_id = video::video_id(url).map(str::to_string);
            let title = video_id.as_deref().and_then(|id| titles.title(id));
            VideoEntry {
                url: url.clone(),
                video_id,
                title,
            }
        })
        .collect();

    PositionEntry {
        fen,
        videos,
        next_by_subject: aggregate.moves_by_subject.iter().cloned().collect(),
        next_faced: aggregate.moves_by_other.iter().cloned().collect(),
    }
}

/// Build export entries, ordered by position key.
pub fn entries<R>(index: &PositionIndex, titles: &R) -> Vec<PositionEntry>
where
    R: TitleResolver + ?Sized,
{
    index
        .iter()
        .map(|(key, aggregate)| to_entry(key.to_string(), aggregate, titles))
        .collect()
}

/// Write the index as a JSON array to `writer`.
pub fn export_json<W, R>(
    index: &PositionIndex,
    titles: &R,
    writer: W,
) -> Result<(), serde_json::Error>
where
    W: Write,
    R: TitleResolver + ?Sized,
{
    serde_json::to_writer_pretty(writer, &entries(index, titles))
}

/// Titles keyed by video id, from a JSON object such as
/// `{"dQw4w9WgXcQ": "Speedrun Episode 1"}`.
pub fn load_titles(path: &Path) -> Result<HashMap<String, String>, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::TitlesOpen {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ExportError::Titles {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the export to `path`, replacing any existing file.
pub fn write_file<R: TitleResolver + ?Sized>(
    index: &PositionIndex,
    titles: &R,
    path: &Path,
) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    export_json(index, titles, &mut writer)
        .and_then(|()| writer.flush().map_err(serde_json::Error::io))
        .map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GamePositions;
    use crate::position_key::PositionKey;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -";

    fn index() -> PositionIndex {
        let start: PositionKey = START.parse().unwrap();
        let mut game = GamePositions::new();
        game.record(start.clone(), "e4".into(), true, "https://youtu.be/bbbbbbbbbbb?t=5".into());
        game.record(start.clone(), "d4".into(), true, "https://youtu.be/aaaaaaaaaaa?t=2".into());
        game.record(start, "c4".into(), false, "https://www.twitch.tv/videos/1".into());
        PositionIndex::new().merge(game)
    }

    #[test]
    fn test_entries_are_sorted_and_resolved() {
        let mut titles = HashMap::new();
        titles.insert("aaaaaaaaaaa".to_string(), "Speedrun Episode 1".to_string());

        let entries = entries(&index(), &titles);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.fen, START);
        assert_eq!(entry.next_by_subject, vec!["d4", "e4"]);
        assert_eq!(entry.next_faced, vec!["c4"]);

        let ids: Vec<Option<&str>> = entry.videos.iter().map(|v| v.video_id.as_deref()).collect();
        assert_eq!(ids, vec![None, Some("aaaaaaaaaaa"), Some("bbbbbbbbbbb")]);
        assert_eq!(entry.videos[1].title.as_deref(), Some("Speedrun Episode 1"));
        assert_eq!(entry.videos[2].title, None);
    }

    #[test]
    fn test_export_json_field_names() {
        let mut out = Vec::new();
        export_json(&index(), &NoTitles, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let entry = &value[0];
        assert_eq!(entry["fen"], START);
        assert_eq!(entry["next_faced"][0], "c4");
        assert_eq!(entry["videos"][1]["video_id"], "aaaaaaaaaaa");
        assert!(entry["videos"][1]["title"].is_null());
    }

    #[test]
    fn test_empty_index_exports_empty_array() {
        let mut out = Vec::new();
        export_json(&PositionIndex::new(), &NoTitles, &mut out).unwrap();
        assert_eq!(out, b"[]");
    }

    #[test]
    fn test_write_file_and_load_titles() {
        let dir = std::env::temp_dir()
            .join(format!("chess_positions_export_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let titles_path = dir.join("titles.json");
        std::fs::write(&titles_path, r#"{"bbbbbbbbbbb": "Speedrun Episode 2"}"#).unwrap();
        let out_path = dir.join("positions.json");

        let titles = load_titles(&titles_path).unwrap();
        write_file(&index(), &titles, &out_path).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&out_path).unwrap()).unwrap();
        assert_eq!(value[0]["videos"][2]["title"], "Speedrun Episode 2");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_titles_file_is_reported() {
        let err = load_titles(Path::new("/nonexistent/titles.json")).unwrap_err();
        assert!(matches!(err, ExportError::TitlesOpen { .. }));
        assert!(err.to_string().contains("/nonexistent/titles.json"));
    }
}
