//! Shared scalar invoke helper.
//!
//! # Safety
//! Only call from inside a DuckDB scalar `invoke()` while its vectors are
//! valid, with `VARCHAR` input and output columns.

use std::error::Error;
use std::ffi::CString;

use duckdb::{
    core::{DataChunkHandle, FlatVector, Inserter, LogicalTypeId},
    vtab::arrow::WritableVector,
};
use libduckdb_sys::duckdb_string_t;

use super::string::decode_duckdb_string;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarcharOutput {
    Null,
    Value(String),
}

impl From<Option<String>> for VarcharOutput {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

fn ensure_type(
    vec: &FlatVector,
    expected: LogicalTypeId,
    label: &str,
) -> Result<(), Box<dyn Error>> {
    let actual = vec.logical_type().id();
    if actual != expected {
        return Err(format!(
            "scalar helper type mismatch: {label} expected {expected:?}, got {actual:?}"
        )
        .into());
    }
    Ok(())
}

/// Invoke a unary `VARCHAR -> VARCHAR` scalar. NULL rows stay NULL.
pub fn invoke_unary_varchar_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> VarcharOutput,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        match f(&val) {
            VarcharOutput::Null => output_vec.set_null(i),
            VarcharOutput::Value(v) => output_vec.insert(i, CString::new(v)?),
        }
    }

    Ok(())
}
