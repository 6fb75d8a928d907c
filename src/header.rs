//! Fixed file framing: table meta, chunkset header, chunk index and the
//! column-position directory. All fields little-endian at documented
//! offsets; reserved fields are written with fixed values and ignored on
//! read.

use std::io::{self, Cursor, Read, Write};

use crate::io::{ReadLe, WriteLe};
use crate::{BasaltError, Result};

/// Magic constant identifying the format family, at file offset 0.
pub(crate) const FILE_MAGIC: &[u8; 8] = b"BASALT\0\0";

/// Current format version; readers reject anything newer.
pub(crate) const FORMAT_VERSION: u32 = 1;

/// Fixed leading bytes of the table-meta block (magic through column
/// count), before the key positions.
pub(crate) const TABLE_META_SIZE: u64 = 24;

/// Fixed size of the chunk index: 8 reserved chunk-position slots, 8
/// reserved chunk-row slots, chunks-per-index-row, chunk count.
pub(crate) const CHUNK_INDEX_SIZE: u64 = 144;

/// The only table class the writer emits. Parsed but not validated on
/// read.
const TABLE_CLASS_DEFAULT: u32 = 1;

// ============================================================================
// Head region: table meta + key positions + chunkset header
// ============================================================================

/// Decoded head region of a file, `24 + 4K + 32 + 6N` bytes on disk.
#[derive(Debug, Clone)]
pub(crate) struct TableHeader {
    pub key_col_pos: Vec<i32>,
    pub nr_of_rows: u64,
    /// Logical type id per column (decoder dispatch).
    pub col_types: Vec<u16>,
    /// Physical type id per column.
    pub col_base_types: Vec<u16>,
}

impl TableHeader {
    pub fn nr_of_cols(&self) -> usize {
        self.col_types.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let n = self.col_types.len();

        // Table meta
        w.write_all(FILE_MAGIC)?;
        w.write_u32_le(FORMAT_VERSION)?;
        w.write_u32_le(TABLE_CLASS_DEFAULT)?;
        w.write_i32_le(self.key_col_pos.len() as i32)?;
        w.write_i32_le(n as i32)?;
        for &p in &self.key_col_pos {
            w.write_i32_le(p)?;
        }

        // Chunkset header
        w.write_u64_le(0)?; // nextHorzChunkSet, reserved
        w.write_u64_le(0)?; // nextVertChunkSet, reserved
        w.write_u64_le(self.nr_of_rows)?;
        w.write_u32_le(FORMAT_VERSION)?;
        w.write_i32_le(n as i32)?;
        for _ in 0..n {
            w.write_u16_le(0)?; // colAttributesType, reserved
        }
        for &t in &self.col_types {
            w.write_u16_le(t)?;
        }
        for &t in &self.col_base_types {
            w.write_u16_le(t)?;
        }
        Ok(())
    }
}

/// First 24 bytes of the file, validated before anything else is parsed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Prelude {
    pub version: u32,
    #[allow(dead_code)]
    pub table_class_type: u32,
    pub key_length: i32,
    pub nr_of_cols: i32,
}

pub(crate) fn read_prelude<R: Read>(r: &mut R) -> Result<Prelude> {
    let mut buf = [0u8; TABLE_META_SIZE as usize];
    r.read_exact(&mut buf)
        .map_err(|_| BasaltError::Corrupt("file header is incomplete"))?;

    if &buf[0..8] != FILE_MAGIC {
        return Err(BasaltError::BadFileId);
    }
    let mut cur = Cursor::new(&buf[8..]);
    let version = cur.read_u32_le()?;
    if version > FORMAT_VERSION {
        return Err(BasaltError::VersionTooNew {
            file: version,
            supported: FORMAT_VERSION,
        });
    }
    let table_class_type = cur.read_u32_le()?;
    let key_length = cur.read_i32_le()?;
    let nr_of_cols = cur.read_i32_le()?;
    if key_length < 0 || nr_of_cols < 1 {
        return Err(BasaltError::Corrupt("header counts out of range"));
    }

    Ok(Prelude {
        version,
        table_class_type,
        key_length,
        nr_of_cols,
    })
}

/// Remainder of the head region: key positions plus the chunkset header.
/// The duplicated version and column-count fields inside the chunkset
/// header are not re-validated; the prelude values are authoritative.
pub(crate) fn read_header_body<R: Read>(r: &mut R, prelude: &Prelude) -> Result<TableHeader> {
    let k = prelude.key_length as usize;
    let n = prelude.nr_of_cols as usize;
    let buf = r
        .read_bytes(32 + 4 * k + 6 * n)
        .map_err(|_| BasaltError::Corrupt("table header is incomplete"))?;
    let mut cur = Cursor::new(&buf[..]);

    let mut key_col_pos = Vec::with_capacity(k);
    for _ in 0..k {
        let pos = cur.read_i32_le()?;
        if pos < 0 || pos as usize >= n {
            return Err(BasaltError::Corrupt("key column position out of range"));
        }
        key_col_pos.push(pos);
    }

    let _next_horz_chunk_set = cur.read_u64_le()?;
    let _next_vert_chunk_set = cur.read_u64_le()?;
    let nr_of_rows = cur.read_u64_le()?;
    if nr_of_rows == 0 {
        return Err(BasaltError::Corrupt("stored row count is zero"));
    }
    let _version_dup = cur.read_u32_le()?;
    let _nr_of_cols_dup = cur.read_i32_le()?;

    for _ in 0..n {
        let _col_attributes_type = cur.read_u16_le()?;
    }
    let mut col_types = Vec::with_capacity(n);
    for _ in 0..n {
        col_types.push(cur.read_u16_le()?);
    }
    let mut col_base_types = Vec::with_capacity(n);
    for _ in 0..n {
        col_base_types.push(cur.read_u16_le()?);
    }

    Ok(TableHeader {
        key_col_pos,
        nr_of_rows,
        col_types,
        col_base_types,
    })
}

// ============================================================================
// Chunk index + column-position directory
// ============================================================================

/// The 144-byte chunk index followed by the `8N`-byte position directory.
/// Only the first chunk slot is used; the remaining slots are reserved.
#[derive(Debug, Clone)]
pub(crate) struct ChunkIndex {
    pub chunk_pos: [u64; 8],
    pub chunk_rows: [u64; 8],
    pub chunks_per_index_row: u64,
    pub nr_of_chunks: u64,
    /// Absolute file offset of each column body.
    pub position_data: Vec<u64>,
}

impl ChunkIndex {
    /// Index as first written, before column positions are known.
    pub fn placeholder(nr_of_rows: u64, nr_of_cols: usize) -> Self {
        let mut chunk_rows = [0u64; 8];
        chunk_rows[0] = nr_of_rows;
        Self {
            chunk_pos: [0; 8],
            chunk_rows,
            chunks_per_index_row: 1,
            nr_of_chunks: 1,
            position_data: vec![0; nr_of_cols],
        }
    }

    pub fn byte_size(&self) -> u64 {
        CHUNK_INDEX_SIZE + 8 * self.position_data.len() as u64
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for &p in &self.chunk_pos {
            w.write_u64_le(p)?;
        }
        for &rows in &self.chunk_rows {
            w.write_u64_le(rows)?;
        }
        w.write_u64_le(self.chunks_per_index_row)?;
        w.write_u64_le(self.nr_of_chunks)?;
        for &p in &self.position_data {
            w.write_u64_le(p)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R, nr_of_cols: usize) -> Result<Self> {
        let buf = r
            .read_bytes((CHUNK_INDEX_SIZE + 8 * nr_of_cols as u64) as usize)
            .map_err(|_| BasaltError::Corrupt("chunk index is incomplete"))?;
        let mut cur = Cursor::new(&buf[..]);

        let mut chunk_pos = [0u64; 8];
        for slot in &mut chunk_pos {
            *slot = cur.read_u64_le()?;
        }
        let mut chunk_rows = [0u64; 8];
        for slot in &mut chunk_rows {
            *slot = cur.read_u64_le()?;
        }
        let chunks_per_index_row = cur.read_u64_le()?;
        let nr_of_chunks = cur.read_u64_le()?;
        let mut position_data = Vec::with_capacity(nr_of_cols);
        for _ in 0..nr_of_cols {
            position_data.push(cur.read_u64_le()?);
        }

        Ok(Self {
            chunk_pos,
            chunk_rows,
            chunks_per_index_row,
            nr_of_chunks,
            position_data,
        })
    }
}
