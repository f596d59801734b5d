use crate::ffi::scalar::{VarcharOutput, invoke_unary_varchar_to_varchar};
use crate::position_key::{EnPassantPolicy, PositionKey};
use crate::video;

use duckdb::{
    core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId},
    vscalar::{ScalarFunctionSignature, VScalar},
    vtab::arrow::WritableVector,
};
use std::error::Error;

/// Canonical key for a FEN, or `None` when the FEN does not parse.
pub fn position_key(fen: &str) -> Option<String> {
    PositionKey::from_fen(fen, EnPassantPolicy::Legal)
        .ok()
        .map(|key| key.to_string())
}

fn varchar_to_varchar() -> Vec<ScalarFunctionSignature> {
    vec![ScalarFunctionSignature::exact(
        vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)],
        LogicalTypeHandle::from(LogicalTypeId::Varchar),
    )]
}

/// `chess_position_key(fen)`
pub struct ChessPositionKeyScalar;

impl VScalar for ChessPositionKeyScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, |fen| position_key(fen).into())
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_to_varchar()
    }
}

/// `chess_video_id(url)`
pub struct ChessVideoIdScalar;

impl VScalar for ChessVideoIdScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, |url| match video::video_id(url) {
            Some(id) => VarcharOutput::Value(id.to_string()),
            None => VarcharOutput::Null,
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_to_varchar()
    }
}
