//! Write/read driver for the single-file table format.
//!
//! File Format:
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Table meta (24 bytes)                                       │
//! │   - Magic: "BASALT\0\0" (8 bytes)                           │
//! │   - Format version: u32                                     │
//! │   - Table class type: u32 (writer emits 1)                  │
//! │   - Key length K: i32                                       │
//! │   - Column count N: i32                                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Key column positions (4K bytes)                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Chunkset header (32 + 6N bytes)                             │
//! │   - nextHorzChunkSet / nextVertChunkSet: u64 (reserved, 0)  │
//! │   - Row count M: u64                                        │
//! │   - Format version duplicate: u32, N duplicate: i32         │
//! │   - colAttributesType: N × u16 (reserved, 0)                │
//! │   - colTypes: N × u16 (logical ids, decoder dispatch)       │
//! │   - colBaseTypes: N × u16 (physical ids)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Column-name block (string block, never compressed)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Chunk index (144 bytes)                                     │
//! │   - chunkPos[0..8], chunkRows[0..8]: reserved slots         │
//! │   - nrOfChunksPerIndexRow: u64 (1), nrOfChunks: u64 (1)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Position directory (8N bytes)                               │
//! │   - absolute file offset of each column body                │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Column bodies (row-grouped blocks, see codec)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The writer streams the bodies once, then seeks back and rewrites the
//! head region and the chunk index + directory with the final offsets.
//! `read_meta` stops after the column-name block; `read_range` continues
//! into the chunk index and decodes only the selected columns over the
//! requested row window.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::codec::{factor, primitive, strings, Compression};
use crate::header::{self, ChunkIndex, TableHeader, CHUNK_INDEX_SIZE};
use crate::types::{Column, ColumnRef, ColumnType, DestTable, SourceTable, StrColumn};
use crate::{BasaltError, Result};

/// Schema-level description of a stored table, as returned by
/// [`TableStore::read_meta`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableMeta {
    pub version: u32,
    pub nr_of_rows: u64,
    /// 0-based positions of the key columns, in key order.
    pub key_col_pos: Vec<usize>,
    /// Logical column type per column.
    pub col_types: Vec<ColumnType>,
    /// Physical type id per column.
    pub col_base_types: Vec<u16>,
    pub col_names: Vec<String>,
}

impl TableMeta {
    pub fn nr_of_cols(&self) -> usize {
        self.col_types.len()
    }

    pub fn key_length(&self) -> usize {
        self.key_col_pos.len()
    }
}

/// Outcome of a range read: which columns were produced (in projection
/// order) and where the stored key columns ended up in the projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadInfo {
    pub selected_cols: Vec<String>,
    /// Projection slots of the longest stored-key prefix present in the
    /// selection.
    pub key_index: Vec<usize>,
}

/// Handle to a table file on disk. No IO happens until a read or write;
/// the schema parsed by `read_meta` is cached for subsequent calls.
pub struct TableStore {
    path: PathBuf,
    meta: RwLock<Option<TableMeta>>,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            meta: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `table` to the store's path, replacing any existing
    /// file. `compression_level` ranges over 0-100: 0 stores raw, 1-50
    /// selects LZ4, 51-100 selects ZSTD at increasing levels. A failed
    /// write leaves the partial file as-is.
    pub fn write(&self, table: &dyn SourceTable, compression_level: u8) -> Result<()> {
        let nr_of_cols = table.nr_of_cols();
        let nr_of_rows = table.nr_of_rows();
        if nr_of_cols == 0 || nr_of_rows == 0 {
            return Err(BasaltError::EmptyDataset);
        }
        let compression = Compression::from_level(compression_level);

        let mut col_types = Vec::with_capacity(nr_of_cols);
        let mut col_base_types = Vec::with_capacity(nr_of_cols);
        for c in 0..nr_of_cols {
            let t = table.column(c).column_type();
            col_types.push(t as u16);
            col_base_types.push(t.base_id());
        }
        let table_header = TableHeader {
            key_col_pos: table.key_columns().iter().map(|&p| p as i32).collect(),
            nr_of_rows: nr_of_rows as u64,
            col_types,
            col_base_types,
        };

        let file = File::create(&self.path).map_err(|source| BasaltError::Open {
            path: self.path.clone(),
            source,
        })?;
        let mut w = BufWriter::new(file);

        table_header.write_to(&mut w)?;

        // Column names stay uncompressed so metadata reads never touch a
        // decompressor.
        let mut names = StrColumn::with_capacity(nr_of_cols);
        for c in 0..nr_of_cols {
            names.push(Some(table.col_name(c)));
        }
        strings::write_block(&mut w, &names, Compression::None)?;

        let mut index = ChunkIndex::placeholder(nr_of_rows as u64, nr_of_cols);
        let index_pos = w.stream_position()?;
        index.write_to(&mut w)?;

        for c in 0..nr_of_cols {
            index.position_data[c] = w.stream_position()?;
            match table.column(c) {
                ColumnRef::Character(col) => strings::write_block(&mut w, col, compression)?,
                ColumnRef::Factor { codes, levels } => {
                    factor::write_block(&mut w, codes, levels, compression)?
                }
                ColumnRef::Int32(v) => primitive::write_block(&mut w, v, compression)?,
                ColumnRef::Double64(v) => primitive::write_block(&mut w, v, compression)?,
                ColumnRef::Bool32(v) => primitive::write_block(&mut w, v, compression)?,
            }
        }

        index.chunk_pos[0] = index.position_data[0] - 8 * nr_of_cols as u64;
        debug_assert_eq!(index.chunk_pos[0], index_pos + CHUNK_INDEX_SIZE);

        // Patch the head region and the chunk index with the final
        // positions.
        w.seek(SeekFrom::Start(0))?;
        table_header.write_to(&mut w)?;
        w.seek(SeekFrom::Start(index.chunk_pos[0] - CHUNK_INDEX_SIZE))?;
        index.write_to(&mut w)?;
        w.flush()?;

        log::debug!(
            "wrote {} columns x {} rows to {}",
            nr_of_cols,
            nr_of_rows,
            self.path.display()
        );
        // cached schema no longer describes the file
        *self.meta.write() = None;
        Ok(())
    }

    /// Parse the file header and column names; column bodies, the chunk
    /// index and the position directory are never touched.
    pub fn read_meta(&self) -> Result<TableMeta> {
        if let Some(meta) = self.meta.read().as_ref() {
            return Ok(meta.clone());
        }
        let mut r = self.open_read()?;
        let (meta, _) = read_meta_from(&mut r)?;
        *self.meta.write() = Some(meta.clone());
        Ok(meta)
    }

    /// Decode the selected columns over rows `[start_row, end_row]` into
    /// `dest`. `start_row` is 1-based; `end_row = None` reads through the
    /// last row, and an `end_row` past the end is clamped. With no
    /// selection all columns are read in file order; otherwise columns
    /// are delivered in the order requested.
    pub fn read_range(
        &self,
        dest: &mut dyn DestTable,
        column_selection: Option<&[&str]>,
        start_row: u64,
        end_row: Option<u64>,
    ) -> Result<ReadInfo> {
        let mut r = self.open_read()?;
        let (meta, _) = read_meta_from(&mut r)?;
        let n = meta.nr_of_cols();

        // chunk index + position directory immediately follow the names
        let index = ChunkIndex::read_from(&mut r, n)?;
        if index.nr_of_chunks > 1 {
            return Err(BasaltError::MultipleChunks(index.nr_of_chunks));
        }
        if index.chunk_rows[0] != meta.nr_of_rows {
            return Err(BasaltError::Corrupt("chunk row count mismatch"));
        }
        let bodies_start = r.stream_position()?;
        if index.position_data[0] < bodies_start
            || !index.position_data.windows(2).all(|w| w[0] < w[1])
        {
            return Err(BasaltError::Corrupt("column positions out of order"));
        }

        // resolve the projection; first byte-equal match wins
        let col_index: Vec<usize> = match column_selection {
            None => (0..n).collect(),
            Some(requested) => {
                let mut resolved = Vec::with_capacity(requested.len());
                for &name in requested {
                    let found = meta
                        .col_names
                        .iter()
                        .position(|stored| stored == name)
                        .ok_or_else(|| BasaltError::ColumnNotFound(name.to_string()))?;
                    resolved.push(found);
                }
                resolved
            }
        };

        // resolve the row window (start_row is 1-based)
        let nr_of_rows = meta.nr_of_rows;
        if start_row == 0 {
            return Err(BasaltError::InvalidRowRange("from_row must be positive"));
        }
        let first_row = start_row - 1;
        if first_row >= nr_of_rows {
            return Err(BasaltError::InvalidRowRange("row selection is out of range"));
        }
        let length = match end_row {
            None => nr_of_rows - first_row,
            Some(end) => {
                if end <= first_row {
                    return Err(BasaltError::InvalidRowRange("incorrect row range"));
                }
                (end - first_row).min(nr_of_rows - first_row)
            }
        };

        dest.init(col_index.len(), length as usize);
        for (slot, &col) in col_index.iter().enumerate() {
            let pos = index.position_data[col];
            let column = match meta.col_types[col] {
                ColumnType::Character => Column::Character(strings::read_block_range(
                    &mut r, pos, first_row, length, nr_of_rows,
                )?),
                ColumnType::Factor => {
                    let (codes, levels) =
                        factor::read_block_range(&mut r, pos, first_row, length, nr_of_rows)?;
                    Column::Factor { codes, levels }
                }
                ColumnType::Int32 => Column::Int32(primitive::read_i32_range(
                    &mut r, pos, first_row, length, nr_of_rows,
                )?),
                ColumnType::Double64 => Column::Double64(primitive::read_f64_range(
                    &mut r, pos, first_row, length, nr_of_rows,
                )?),
                ColumnType::Bool32 => Column::Bool32(primitive::read_i32_range(
                    &mut r, pos, first_row, length, nr_of_rows,
                )?),
            };
            dest.set_column(slot, &meta.col_names[col], column);
        }

        // key columns survive only as the longest selected prefix
        let mut key_index = Vec::new();
        'keys: for &key_pos in &meta.key_col_pos {
            for (slot, &col) in col_index.iter().enumerate() {
                if col == key_pos {
                    key_index.push(slot);
                    continue 'keys;
                }
            }
            break;
        }

        let selected_cols = col_index
            .iter()
            .map(|&c| meta.col_names[c].clone())
            .collect();
        log::debug!(
            "read {} rows x {} columns from {}",
            length,
            col_index.len(),
            self.path.display()
        );
        Ok(ReadInfo {
            selected_cols,
            key_index,
        })
    }

    fn open_read(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.path).map_err(|source| BasaltError::Open {
            path: self.path.clone(),
            source,
        })?;
        Ok(BufReader::new(file))
    }
}

/// Shared metadata parse: prelude, chunkset header, column names.
/// Returns the metadata and the stream position just past the name block
/// (the chunk index starts there).
fn read_meta_from<R: Read + Seek>(r: &mut R) -> Result<(TableMeta, u64)> {
    let prelude = header::read_prelude(r)?;
    let table_header = header::read_header_body(r, &prelude)?;
    let n = table_header.nr_of_cols();

    let names_pos = r.stream_position()?;
    let names = strings::read_block_range(r, names_pos, 0, n as u64, n as u64)?;
    let mut col_names = Vec::with_capacity(n);
    for i in 0..n {
        match names.get(i) {
            Some(name) => col_names.push(name.to_string()),
            None => return Err(BasaltError::Corrupt("column name missing")),
        }
    }

    let mut col_types = Vec::with_capacity(n);
    for &t in &table_header.col_types {
        col_types.push(ColumnType::from_u16(t).ok_or(BasaltError::UnknownColumnType(t))?);
    }

    let meta = TableMeta {
        version: prelude.version,
        nr_of_rows: table_header.nr_of_rows,
        key_col_pos: table_header.key_col_pos.iter().map(|&p| p as usize).collect(),
        col_types,
        col_base_types: table_header.col_base_types,
        col_names,
    };
    let end = r.stream_position()?;
    Ok((meta, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Frame;
    use crate::types::{double64_missing, is_double64_missing, BOOL32_MISSING, INT32_MISSING};
    use std::fs::OpenOptions;
    use std::io::BufReader;
    use tempfile::tempdir;

    fn mixed_frame() -> Frame {
        let mut frame = Frame::new().with_key_columns(vec![0]);
        frame.push_column(
            "name",
            Column::Character(StrColumn::from_options(&[
                Some("alice"),
                None,
                Some(""),
                Some("d\0ave"),
            ])),
        );
        frame.push_column(
            "grade",
            Column::Factor {
                codes: vec![2, 1, INT32_MISSING, 2],
                levels: StrColumn::from_strs(&["pass", "fail"]),
            },
        );
        frame.push_column("age", Column::Int32(vec![25, INT32_MISSING, 35, 40]));
        frame.push_column(
            "score",
            Column::Double64(vec![85.5, double64_missing(), f64::NAN, -0.5]),
        );
        frame.push_column("active", Column::Bool32(vec![1, 0, BOOL32_MISSING, 1]));
        frame
    }

    fn assert_f64_bits_eq(got: &Column, want: &[f64]) {
        let Column::Double64(got) = got else {
            panic!("expected a double column, got {got:?}");
        };
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert_eq!(g.to_bits(), w.to_bits());
        }
    }

    #[test]
    fn roundtrip_all_types() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("mixed.basalt"));
        store.write(&mixed_frame(), 0).unwrap();

        let mut out = Frame::new();
        let info = store.read_range(&mut out, None, 1, None).unwrap();

        assert_eq!(info.selected_cols, vec!["name", "grade", "age", "score", "active"]);
        assert_eq!(info.key_index, vec![0]);
        assert_eq!(out.get("name"), mixed_frame().get("name"));
        assert_eq!(out.get("grade"), mixed_frame().get("grade"));
        assert_eq!(out.get("age"), Some(&Column::Int32(vec![25, INT32_MISSING, 35, 40])));
        assert_eq!(out.get("active"), Some(&Column::Bool32(vec![1, 0, BOOL32_MISSING, 1])));
        assert_f64_bits_eq(
            out.get("score").unwrap(),
            &[85.5, double64_missing(), f64::NAN, -0.5],
        );
    }

    #[test]
    fn single_int_column_layout_and_ranges() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("x.basalt"));
        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![10, 20, 30]));
        store.write(&frame, 0).unwrap();

        // fixed head-region bytes: magic, version, class type, K, N
        let bytes = std::fs::read(store.path()).unwrap();
        assert_eq!(&bytes[0..8], b"BASALT\0\0");
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 1);
        assert_eq!(i32::from_le_bytes(bytes[16..20].try_into().unwrap()), 0);
        assert_eq!(i32::from_le_bytes(bytes[20..24].try_into().unwrap()), 1);

        let meta = store.read_meta().unwrap();
        assert_eq!(meta.nr_of_rows, 3);
        assert_eq!(meta.col_names, vec!["x"]);
        assert_eq!(meta.col_types, vec![ColumnType::Int32]);
        assert_eq!(meta.col_base_types, vec![3]);
        assert!(meta.key_col_pos.is_empty());

        let mut out = Frame::new();
        store.read_range(&mut out, None, 1, None).unwrap();
        assert_eq!(out.get("x"), Some(&Column::Int32(vec![10, 20, 30])));

        let mut out = Frame::new();
        store.read_range(&mut out, None, 2, Some(2)).unwrap();
        assert_eq!(out.get("x"), Some(&Column::Int32(vec![20])));

        let mut out = Frame::new();
        store.read_range(&mut out, None, 2, Some(3)).unwrap();
        assert_eq!(out.get("x"), Some(&Column::Int32(vec![20, 30])));
    }

    #[test]
    fn key_survives_only_when_selected() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("kv.basalt"));
        let mut frame = Frame::new().with_key_columns(vec![0]);
        frame.push_column(
            "k",
            Column::Character(StrColumn::from_strs(&["a", "b", "a"])),
        );
        frame.push_column("v", Column::Double64(vec![1.5, 2.5, double64_missing()]));
        store.write(&frame, 0).unwrap();

        let mut out = Frame::new();
        let info = store.read_range(&mut out, Some(&["v"]), 1, Some(3)).unwrap();
        assert_eq!(info.selected_cols, vec!["v"]);
        assert!(info.key_index.is_empty());
        assert_eq!(out.nr_of_cols(), 1);
        assert_f64_bits_eq(out.get("v").unwrap(), &[1.5, 2.5, double64_missing()]);
        assert!(is_double64_missing(match out.get("v").unwrap() {
            Column::Double64(v) => v[2],
            _ => unreachable!(),
        }));

        let mut out = Frame::new();
        let info = store
            .read_range(&mut out, Some(&["k", "v"]), 1, Some(3))
            .unwrap();
        assert_eq!(info.selected_cols, vec!["k", "v"]);
        assert_eq!(info.key_index, vec![0]);
    }

    #[test]
    fn factor_range_read() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("f.basalt"));
        let mut frame = Frame::new();
        frame.push_column(
            "f",
            Column::Factor {
                codes: vec![3, 1, 2, 3, 1],
                levels: StrColumn::from_strs(&["r", "g", "b"]),
            },
        );
        store.write(&frame, 0).unwrap();

        let mut out = Frame::new();
        store.read_range(&mut out, Some(&["f"]), 2, Some(4)).unwrap();
        assert_eq!(
            out.get("f"),
            Some(&Column::Factor {
                codes: vec![1, 2, 3],
                levels: StrColumn::from_strs(&["r", "g", "b"]),
            })
        );
    }

    #[test]
    fn selecting_unknown_column_fails() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("ab.basalt"));
        let mut frame = Frame::new();
        frame.push_column("a", Column::Int32(vec![1]));
        frame.push_column("b", Column::Int32(vec![2]));
        store.write(&frame, 0).unwrap();

        let mut out = Frame::new();
        let err = store.read_range(&mut out, Some(&["c"]), 1, None).unwrap_err();
        assert!(matches!(err, BasaltError::ColumnNotFound(name) if name == "c"));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("empty.basalt"));

        let err = store.write(&Frame::new(), 0).unwrap_err();
        assert!(matches!(err, BasaltError::EmptyDataset));

        let mut no_rows = Frame::new();
        no_rows.push_column("x", Column::Int32(Vec::new()));
        let err = store.write(&no_rows, 0).unwrap_err();
        assert!(matches!(err, BasaltError::EmptyDataset));
        assert!(!store.path().exists());
    }

    #[test]
    fn zeroed_magic_fails_both_reads() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("m.basalt"));
        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![1, 2]));
        store.write(&frame, 0).unwrap();

        let mut file = OpenOptions::new().write(true).open(store.path()).unwrap();
        file.write_all(&[0u8; 8]).unwrap();
        drop(file);

        assert!(matches!(store.read_meta().unwrap_err(), BasaltError::BadFileId));
        let mut out = Frame::new();
        assert!(matches!(
            store.read_range(&mut out, None, 1, None).unwrap_err(),
            BasaltError::BadFileId
        ));
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("v.basalt"));
        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![1]));
        store.write(&frame, 0).unwrap();

        let mut file = OpenOptions::new().write(true).open(store.path()).unwrap();
        file.seek(SeekFrom::Start(8)).unwrap();
        file.write_all(&2u32.to_le_bytes()).unwrap();
        drop(file);

        assert!(matches!(
            store.read_meta().unwrap_err(),
            BasaltError::VersionTooNew { file: 2, supported: 1 }
        ));
    }

    #[test]
    fn row_range_semantics() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("r.basalt"));
        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![1, 2, 3]));
        store.write(&frame, 0).unwrap();

        let mut out = Frame::new();
        let err = store.read_range(&mut out, None, 0, None).unwrap_err();
        assert!(matches!(err, BasaltError::InvalidRowRange("from_row must be positive")));

        let err = store.read_range(&mut out, None, 4, None).unwrap_err();
        assert!(matches!(err, BasaltError::InvalidRowRange("row selection is out of range")));

        let err = store.read_range(&mut out, None, 2, Some(1)).unwrap_err();
        assert!(matches!(err, BasaltError::InvalidRowRange("incorrect row range")));

        // end_row past the last row is clamped
        store.read_range(&mut out, None, 2, Some(100)).unwrap();
        assert_eq!(out.get("x"), Some(&Column::Int32(vec![2, 3])));
    }

    #[test]
    fn projection_preserves_request_order() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("abc.basalt"));
        let mut frame = Frame::new().with_key_columns(vec![1, 2]);
        frame.push_column("a", Column::Int32(vec![1, 2]));
        frame.push_column("b", Column::Int32(vec![3, 4]));
        frame.push_column("c", Column::Int32(vec![5, 6]));
        store.write(&frame, 0).unwrap();

        let mut out = Frame::new();
        let info = store
            .read_range(&mut out, Some(&["c", "b"]), 1, None)
            .unwrap();
        assert_eq!(info.selected_cols, vec!["c", "b"]);
        assert_eq!(out.names(), vec!["c", "b"]);
        assert_eq!(out.column(0).len(), 2);
        // key prefix b,c maps to slots 1,0 of the projection
        assert_eq!(info.key_index, vec![1, 0]);

        // breaking the key prefix truncates the key index
        let mut out = Frame::new();
        let info = store.read_range(&mut out, Some(&["c"]), 1, None).unwrap();
        assert!(info.key_index.is_empty());
    }

    #[test]
    fn duplicate_names_resolve_to_first_match() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("dup.basalt"));
        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![1]));
        frame.push_column("x", Column::Int32(vec![2]));
        store.write(&frame, 0).unwrap();

        let mut out = Frame::new();
        store.read_range(&mut out, Some(&["x"]), 1, None).unwrap();
        assert_eq!(out.columns()[0].1, Column::Int32(vec![1]));
    }

    #[test]
    fn compression_levels_roundtrip_identically() {
        let dir = tempdir().unwrap();
        let rows = 10_000usize;
        let mut frame = Frame::new();
        frame.push_column(
            "i",
            Column::Int32((0..rows as i32).map(|i| i % 100).collect()),
        );
        frame.push_column(
            "s",
            Column::Character(StrColumn::from_options(
                &(0..rows)
                    .map(|i| if i % 13 == 0 { None } else { Some("shared tail") })
                    .collect::<Vec<_>>(),
            )),
        );
        frame.push_column(
            "f",
            Column::Factor {
                codes: (0..rows as i32).map(|i| i % 4 + 1).collect(),
                levels: StrColumn::from_strs(&["n", "e", "s", "w"]),
            },
        );

        for level in [0u8, 30, 85] {
            let store = TableStore::new(dir.path().join(format!("c{level}.basalt")));
            store.write(&frame, level).unwrap();

            let mut out = Frame::new();
            store.read_range(&mut out, None, 1, None).unwrap();
            assert_eq!(out.columns(), frame.columns(), "level {level}");

            // a window straddling both group sizes (2048 and 4096)
            let mut out = Frame::new();
            store.read_range(&mut out, None, 4_090, Some(4_200)).unwrap();
            assert_eq!(out.nr_of_rows(), 111);
            assert_eq!(
                out.get("i"),
                Some(&Column::Int32(
                    (4_089..4_200).map(|i| (i % 100) as i32).collect()
                ))
            );
        }
    }

    #[test]
    fn read_meta_never_touches_the_chunk_index() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("t.basalt"));
        store.write(&mixed_frame(), 50).unwrap();

        let mut r = BufReader::new(File::open(store.path()).unwrap());
        let (_, names_end) = read_meta_from(&mut r).unwrap();
        drop(r);

        // drop everything from the chunk index on; metadata stays readable
        let file = OpenOptions::new().write(true).open(store.path()).unwrap();
        file.set_len(names_end).unwrap();
        drop(file);

        let meta = store.read_meta().unwrap();
        assert_eq!(meta.nr_of_rows, 4);
        assert_eq!(meta.nr_of_cols(), 5);

        let mut out = Frame::new();
        assert!(store.read_range(&mut out, None, 1, None).is_err());
    }

    #[test]
    fn multi_chunk_files_are_rejected() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("mc.basalt"));
        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![1, 2]));
        store.write(&frame, 0).unwrap();

        let mut r = BufReader::new(File::open(store.path()).unwrap());
        let (_, names_end) = read_meta_from(&mut r).unwrap();
        drop(r);

        // nrOfChunks lives 136 bytes into the chunk index
        let mut file = OpenOptions::new().write(true).open(store.path()).unwrap();
        file.seek(SeekFrom::Start(names_end + 136)).unwrap();
        file.write_all(&2u64.to_le_bytes()).unwrap();
        drop(file);

        let mut out = Frame::new();
        assert!(matches!(
            store.read_range(&mut out, None, 1, None).unwrap_err(),
            BasaltError::MultipleChunks(2)
        ));
    }

    #[test]
    fn read_meta_cache_is_invalidated_by_write() {
        let dir = tempdir().unwrap();
        let store = TableStore::new(dir.path().join("cache.basalt"));
        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![1]));
        store.write(&frame, 0).unwrap();
        assert_eq!(store.read_meta().unwrap().nr_of_rows, 1);

        let mut frame = Frame::new();
        frame.push_column("x", Column::Int32(vec![1, 2, 3]));
        store.write(&frame, 0).unwrap();
        assert_eq!(store.read_meta().unwrap().nr_of_rows, 3);
    }
}
