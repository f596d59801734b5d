//! `export_positions` table function: build the index like `read_positions`
//! and write the frontend JSON file, returning a one-row summary.

use crate::config::ExtractionConfig;
use crate::export::{self, NoTitles};
use crate::ffi::bind_info::get_named_parameter_varchar;
use crate::log;
use crate::positions::{build_index, extraction_parameters, resolve_config};
use crate::source;

use duckdb::{
    core::{DataChunkHandle, Inserter, LogicalTypeHandle, LogicalTypeId},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};
use std::error::Error;
use std::ffi::CString;
use std::path::PathBuf;
use std::sync::Mutex;

#[repr(C)]
pub struct ExportPositionsBindData {
    paths: Vec<PathBuf>,
    config: ExtractionConfig,
    output: PathBuf,
    titles: Option<PathBuf>,
}

#[repr(C)]
pub struct ExportPositionsInitData {
    done: Mutex<bool>,
}

pub struct ExportPositionsVTab;

const PATH_PATTERN_PARAM_INDEX: u64 = 0;
const EXPORT_POSITIONS_COLUMNS: [(&str, LogicalTypeId); 4] = [
    ("output", LogicalTypeId::Varchar),
    ("positions", LogicalTypeId::UBigint),
    ("games_replayed", LogicalTypeId::UBigint),
    ("games_skipped", LogicalTypeId::UBigint),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportSummary {
    output: String,
    positions: u64,
    games_replayed: u64,
    games_skipped: u64,
}

fn run_export(bind_data: &ExportPositionsBindData) -> Result<ExportSummary, Box<dyn Error>> {
    let (index, summary) = build_index(&bind_data.paths, &bind_data.config)?;

    let written = match &bind_data.titles {
        Some(path) => {
            let titles = export::load_titles(path)?;
            export::write_file(&index, &titles, &bind_data.output)
        }
        None => export::write_file(&index, &NoTitles, &bind_data.output),
    };
    if let Err(err) = written {
        log::error(err.to_string());
        return Err(err.into());
    }

    log::info(format!(
        "export_positions: wrote {} positions to '{}'",
        index.len(),
        bind_data.output.display()
    ));
    Ok(ExportSummary {
        output: bind_data.output.display().to_string(),
        positions: index.len() as u64,
        games_replayed: summary.replayed as u64,
        games_skipped: summary.skipped as u64,
    })
}

impl VTab for ExportPositionsVTab {
    type InitData = ExportPositionsInitData;
    type BindData = ExportPositionsBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let pattern = bind.get_parameter(PATH_PATTERN_PARAM_INDEX).to_string();
        let config = resolve_config(bind, "export_positions")?;
        let output = get_named_parameter_varchar(bind, "output")?
            .into_value()
            .map(PathBuf::from)
            .ok_or("export_positions requires output := '<path>.json'")?;
        let titles = get_named_parameter_varchar(bind, "titles")?
            .into_value()
            .map(PathBuf::from);
        let paths = source::expand_paths(&pattern)?;

        for (name, type_id) in EXPORT_POSITIONS_COLUMNS {
            bind.add_result_column(name, LogicalTypeHandle::from(type_id));
        }

        Ok(ExportPositionsBindData {
            paths,
            config,
            output,
            titles,
        })
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(ExportPositionsInitData {
            done: Mutex::new(false),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init_data = func.get_init_data();
        let mut done = init_data
            .done
            .lock()
            .map_err(|_| "export_positions scan state poisoned")?;

        if *done {
            output.set_len(0);
            return Ok(());
        }

        let summary = run_export(func.get_bind_data())?;
        output
            .flat_vector(0)
            .insert(0, CString::new(summary.output.replace('\0', " "))?);
        for (column, value) in [
            (1, summary.positions),
            (2, summary.games_replayed),
            (3, summary.games_skipped),
        ] {
            output.flat_vector(column).as_mut_slice::<u64>()[0] = value;
        }
        output.set_len(1);
        *done = true;
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            LogicalTypeHandle::from(LogicalTypeId::Varchar), // path pattern (required)
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        let mut parameters = extraction_parameters();
        for name in ["output", "titles"] {
            parameters.push((
                name.to_string(),
                LogicalTypeHandle::from(LogicalTypeId::Varchar),
            ));
        }
        Some(parameters)
    }
}
