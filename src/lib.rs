pub mod aggregate;
pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
mod export_table;
mod ffi;
pub mod log;
pub mod movetext;
pub mod position_key;
mod positions;
pub mod replay;
mod scalars;
pub mod source;
pub mod types;
pub mod video;

use duckdb::{Connection, Result};
use duckdb_ext_macros::duckdb_extension;
use export_table::ExportPositionsVTab;
use positions::ReadPositionsVTab;
use scalars::{ChessPositionKeyScalar, ChessVideoIdScalar};
use std::error::Error;

#[duckdb_extension(name = "chess_positions", api_version = "v1.0.0")]
pub unsafe fn extension_entrypoint(con: Connection) -> Result<(), Box<dyn Error>> {
    // Table functions
    con.register_table_function::<ReadPositionsVTab>("read_positions")?;
    con.register_table_function::<ExportPositionsVTab>("export_positions")?;

    // Scalar functions
    con.register_scalar_function::<ChessPositionKeyScalar>("chess_position_key")?;
    con.register_scalar_function::<ChessVideoIdScalar>("chess_video_id")?;

    Ok(())
}
