//! basalt — single-file columnar dataset serialization.
//!
//! Writes a table of equally long typed columns (strings, factors, 32-bit
//! integers, 64-bit floats, tri-state booleans) to one binary file, and
//! reads back:
//!
//! - schema metadata without touching any column body,
//! - an arbitrary column projection selected by name,
//! - a contiguous 1-based row range, decoding only the row groups that
//!   overlap it.
//!
//! Files are little-endian throughout and only portable between
//! little-endian hosts. See `src/store.rs` for the file layout.

mod codec;
mod header;
mod io;
pub mod store;
pub mod table;
pub mod types;

pub use store::{ReadInfo, TableMeta, TableStore};
pub use table::Frame;
pub use types::{Column, ColumnRef, ColumnType, DestTable, SourceTable, StrColumn};

use std::path::PathBuf;

/// Storage engine error type
#[derive(Debug, thiserror::Error)]
pub enum BasaltError {
    #[error("error opening file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file is incomplete or damaged: {0}")]
    Corrupt(&'static str),

    #[error("not a basalt file (unrecognized file id)")]
    BadFileId,

    #[error("file was created by a newer version of basalt (file format {file}, supported up to {supported})")]
    VersionTooNew { file: u32, supported: u32 },

    #[error("dataset must contain at least one column and one row")]
    EmptyDataset,

    #[error("unknown column type {0}")]
    UnknownColumnType(u16),

    #[error("selected column '{0}' not found")]
    ColumnNotFound(String),

    #[error("{0}")]
    InvalidRowRange(&'static str),

    #[error("multiple chunk read is not implemented (file has {0} chunks)")]
    MultipleChunks(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BasaltError>;
