//! DuckDB C API interop shared by the table and scalar functions.

pub(crate) mod bind_info;
pub mod scalar;
pub mod string;
