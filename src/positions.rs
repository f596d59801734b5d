//! `read_positions` table function: ingest matched-game files and emit the
//! aggregated position index, one row per position.

use crate::aggregate::{PositionAggregate, PositionIndex};
use crate::config::{self, CompressionMode, ExtractionConfig, SubjectSet};
use crate::ffi::bind_info::get_named_parameter_varchar;
use crate::log;
use crate::position_key::{EnPassantPolicy, PositionKey};
use crate::replay::{self, IngestSummary};
use crate::source;
use crate::video::GAME_LINK_RE;

use duckdb::{
    core::{DataChunkHandle, Inserter, LogicalTypeHandle, LogicalTypeId},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};
use std::collections::BTreeSet;
use std::error::Error;
use std::ffi::CString;
use std::path::PathBuf;
use std::sync::Mutex;

#[repr(C)]
pub struct ReadPositionsBindData {
    paths: Vec<PathBuf>,
    config: ExtractionConfig,
}

#[repr(C)]
pub struct ReadPositionsInitData {
    state: Mutex<ScanState>,
}

/// Rows are built on the first scan call and handed out in chunks.
#[derive(Default)]
struct ScanState {
    rows: Option<Vec<PositionRow>>,
    cursor: usize,
}

pub struct ReadPositionsVTab;

const PATH_PATTERN_PARAM_INDEX: u64 = 0;
const ROWS_PER_CHUNK: usize = 2048;
const READ_POSITIONS_COLUMNS: [&str; 4] = [
    "fen",
    "video_links",
    "next_moves_by_subject",
    "next_moves_faced",
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct PositionRow {
    fen: String,
    video_links: String,
    next_moves_by_subject: String,
    next_moves_faced: String,
}

impl PositionRow {
    fn new(key: &PositionKey, aggregate: &PositionAggregate) -> Result<Self, serde_json::Error> {
        Ok(Self {
            fen: key.to_string(),
            video_links: json_array(&aggregate.videos)?,
            next_moves_by_subject: json_array(&aggregate.moves_by_subject)?,
            next_moves_faced: json_array(&aggregate.moves_by_other)?,
        })
    }

    fn values(&self) -> [&str; 4] {
        [
            &self.fen,
            &self.video_links,
            &self.next_moves_by_subject,
            &self.next_moves_faced,
        ]
    }
}

fn json_array(values: &BTreeSet<String>) -> Result<String, serde_json::Error> {
    serde_json::to_string(values)
}

/// Read, replay and merge every game, then drop game links when configured.
pub(crate) fn build_index(
    paths: &[PathBuf],
    config: &ExtractionConfig,
) -> Result<(PositionIndex, IngestSummary), Box<dyn Error>> {
    let records = source::read_all(paths, config.compression, &config.subjects)?;
    let mut index = PositionIndex::new();
    let summary = replay::ingest(&mut index, records, config.en_passant);

    if config.purge_game_links {
        let removed = index.purge_videos(&GAME_LINK_RE);
        if removed > 0 {
            log::info(format!("removed {} game links from video lists", removed));
        }
    }
    Ok((index, summary))
}

fn build_rows(index: &PositionIndex) -> Result<Vec<PositionRow>, serde_json::Error> {
    index
        .iter()
        .map(|(key, aggregate)| PositionRow::new(key, aggregate))
        .collect()
}

/// Extraction settings from the named parameters shared by both table functions.
pub(crate) fn resolve_config(
    bind: &BindInfo,
    function: &str,
) -> Result<ExtractionConfig, Box<dyn Error>> {
    let subjects = match get_named_parameter_varchar(bind, "subjects")?.into_value() {
        Some(raw) => SubjectSet::parse(&raw)?,
        None => {
            return Err(format!(
                "{} requires subjects := '<username>[,<username>...]'",
                function
            )
            .into());
        }
    };

    let mut config = ExtractionConfig::new(subjects);
    if let Some(raw) = get_named_parameter_varchar(bind, "compression")?.into_value() {
        config.compression = CompressionMode::parse(&raw)?;
    }
    if let Some(raw) = get_named_parameter_varchar(bind, "en_passant")?.into_value() {
        config.en_passant = EnPassantPolicy::parse(&raw)?;
    }
    if let Some(raw) = get_named_parameter_varchar(bind, "purge_game_links")?.into_value() {
        config.purge_game_links = config::parse_flag("purge_game_links", &raw)?;
    }
    Ok(config)
}

/// Named parameters understood by [`resolve_config`].
pub(crate) fn extraction_parameters() -> Vec<(String, LogicalTypeHandle)> {
    [
        ("subjects", LogicalTypeId::Varchar),
        ("compression", LogicalTypeId::Varchar),
        ("en_passant", LogicalTypeId::Varchar),
        ("purge_game_links", LogicalTypeId::Boolean),
    ]
    .into_iter()
    .map(|(name, type_id)| (name.to_string(), LogicalTypeHandle::from(type_id)))
    .collect()
}

fn write_rows(output: &mut DataChunkHandle, rows: &[PositionRow]) -> Result<(), Box<dyn Error>> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (column, value) in row.values().into_iter().enumerate() {
            let vector = output.flat_vector(column);
            vector.insert(row_idx, CString::new(value.replace('\0', " "))?);
        }
    }
    output.set_len(rows.len());
    Ok(())
}

impl VTab for ReadPositionsVTab {
    type InitData = ReadPositionsInitData;
    type BindData = ReadPositionsBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let pattern = bind.get_parameter(PATH_PATTERN_PARAM_INDEX).to_string();
        let config = resolve_config(bind, "read_positions")?;
        let paths = source::expand_paths(&pattern)?;

        for name in READ_POSITIONS_COLUMNS {
            bind.add_result_column(name, LogicalTypeHandle::from(LogicalTypeId::Varchar));
        }

        Ok(ReadPositionsBindData { paths, config })
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(ReadPositionsInitData {
            state: Mutex::new(ScanState::default()),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init_data = func.get_init_data();
        let bind_data = func.get_bind_data();
        let mut state = init_data
            .state
            .lock()
            .map_err(|_| "read_positions scan state poisoned")?;

        if state.rows.is_none() {
            let (index, summary) = build_index(&bind_data.paths, &bind_data.config)?;
            log::info(format!(
                "read_positions: {} positions from {} games ({} skipped)",
                index.len(),
                summary.replayed,
                summary.skipped
            ));
            state.rows = Some(build_rows(&index)?);
        }

        let cursor = state.cursor;
        let rows = state.rows.as_deref().unwrap_or_default();
        let end = rows.len().min(cursor + ROWS_PER_CHUNK);
        write_rows(output, &rows[cursor..end])?;
        state.cursor = end;
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            LogicalTypeHandle::from(LogicalTypeId::Varchar), // path pattern (required)
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(extraction_parameters())
    }
}
