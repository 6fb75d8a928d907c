//! Row-group framing and compression shared by every column body.
//!
//! A column body is a *block*: a 16-byte block header, a directory of
//! group offsets, then the row groups themselves. Each group carries its
//! own sizes and codec so a range read can seek straight to the groups
//! overlapping the requested rows and decode nothing else.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Block header (16 bytes)                                  │
//! │   - rowCount: u64                                        │
//! │   - groupRows: u32 (rows per group, last may be short)   │
//! │   - codec: u8 (requested: 0 none / 1 lz4 / 2 zstd)       │
//! │   - reserved: 3 bytes                                    │
//! ├──────────────────────────────────────────────────────────┤
//! │ Group directory                                          │
//! │   - nGroups × u64 offsets relative to block start        │
//! │     (patched in place after the groups are streamed)     │
//! ├──────────────────────────────────────────────────────────┤
//! │ Row groups                                               │
//! │   Each starts with a 12-byte group header:               │
//! │   - rawLen: u32, storedLen: u32                          │
//! │   - codec: u8 (actual; 0 when compression didn't help)   │
//! │   - reserved: 3 bytes                                    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub(crate) mod factor;
pub(crate) mod primitive;
pub(crate) mod strings;

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::io::{ReadLe, WriteLe};
use crate::{BasaltError, Result};

pub(crate) const CODEC_NONE: u8 = 0;
pub(crate) const CODEC_LZ4: u8 = 1;
pub(crate) const CODEC_ZSTD: u8 = 2;

/// Rows per group for fixed-width bodies.
pub(crate) const PRIMITIVE_GROUP_ROWS: u32 = 4096;

/// Rows per group for string bodies.
pub(crate) const STRING_GROUP_ROWS: u32 = 2048;

/// Group bodies below this size are stored raw; compression overhead
/// exceeds savings.
const COMPRESS_MIN_BODY_SIZE: usize = 512;

/// Compression algorithm for row-group bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compression {
    None,
    Lz4,
    Zstd { level: i32 },
}

impl Compression {
    /// Map the caller-facing 0-100 level onto a codec: 0 stores raw,
    /// 1-50 selects LZ4, 51-100 selects ZSTD with the zstd level scaled
    /// linearly over 1..=19.
    pub fn from_level(level: u8) -> Self {
        match level.min(100) {
            0 => Compression::None,
            1..=50 => Compression::Lz4,
            l => Compression::Zstd {
                level: 1 + (i32::from(l) - 51) * 18 / 49,
            },
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Compression::None => CODEC_NONE,
            Compression::Lz4 => CODEC_LZ4,
            Compression::Zstd { .. } => CODEC_ZSTD,
        }
    }
}

/// Compress a group body, falling back to raw storage when the codec does
/// not actually shrink it. Returns the codec id as stored.
pub(crate) fn compress_group(body: Vec<u8>, compression: Compression) -> (u8, Vec<u8>) {
    if body.len() < COMPRESS_MIN_BODY_SIZE || compression == Compression::None {
        return (CODEC_NONE, body);
    }
    match compression {
        Compression::None => (CODEC_NONE, body),
        Compression::Lz4 => {
            let compressed = lz4_flex::compress(&body);
            if compressed.len() < body.len() {
                (CODEC_LZ4, compressed)
            } else {
                (CODEC_NONE, body)
            }
        }
        Compression::Zstd { level } => {
            if let Ok(compressed) = zstd::bulk::compress(&body, level) {
                if compressed.len() < body.len() {
                    return (CODEC_ZSTD, compressed);
                }
            }
            (CODEC_NONE, body)
        }
    }
}

/// Undo `compress_group`. `raw_len` comes from the group header and is
/// verified against the decoded output.
pub(crate) fn decompress_group(codec: u8, stored: Vec<u8>, raw_len: usize) -> Result<Vec<u8>> {
    let body = match codec {
        CODEC_NONE => stored,
        CODEC_LZ4 => lz4_flex::decompress(&stored, raw_len)
            .map_err(|_| BasaltError::Corrupt("lz4 row group failed to decompress"))?,
        CODEC_ZSTD => zstd::bulk::decompress(&stored, raw_len)
            .map_err(|_| BasaltError::Corrupt("zstd row group failed to decompress"))?,
        _ => return Err(BasaltError::Corrupt("unknown codec id in row group")),
    };
    if body.len() != raw_len {
        return Err(BasaltError::Corrupt("row group decompressed to wrong size"));
    }
    Ok(body)
}

// ============================================================================
// Block and group framing
// ============================================================================

/// 16-byte header leading every column block.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockHeader {
    pub rows: u64,
    pub group_rows: u32,
    #[allow(dead_code)]
    pub codec: u8,
}

impl BlockHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64_le(self.rows)?;
        w.write_u32_le(self.group_rows)?;
        w.write_all(&[self.codec, 0, 0, 0])
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let rows = r.read_u64_le()?;
        let group_rows = r.read_u32_le()?;
        let mut tail = [0u8; 4];
        r.read_exact(&mut tail)?;
        if group_rows == 0 {
            return Err(BasaltError::Corrupt("row group size of zero"));
        }
        Ok(Self {
            rows,
            group_rows,
            codec: tail[0],
        })
    }

    pub fn group_count(&self) -> u64 {
        let gr = self.group_rows as u64;
        (self.rows + gr - 1) / gr
    }
}

/// 12-byte header leading every row group.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupHeader {
    pub raw_len: u32,
    pub stored_len: u32,
    pub codec: u8,
}

impl GroupHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32_le(self.raw_len)?;
        w.write_u32_le(self.stored_len)?;
        w.write_all(&[self.codec, 0, 0, 0])
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let raw_len = r.read_u32_le()?;
        let stored_len = r.read_u32_le()?;
        let mut tail = [0u8; 4];
        r.read_exact(&mut tail)?;
        Ok(Self {
            raw_len,
            stored_len,
            codec: tail[0],
        })
    }
}

/// Group-offset directory of a block being written. A placeholder is laid
/// down up front; the real offsets are patched in place once the groups
/// have been streamed.
pub(crate) struct GroupDirectory {
    block_start: u64,
    dir_pos: u64,
    n_groups: usize,
    offsets: Vec<u64>,
}

impl GroupDirectory {
    pub fn begin<W: Write + Seek>(w: &mut W, block_start: u64, n_groups: usize) -> io::Result<Self> {
        let dir_pos = w.stream_position()?;
        w.write_all(&vec![0u8; 8 * n_groups])?;
        Ok(Self {
            block_start,
            dir_pos,
            n_groups,
            offsets: Vec::with_capacity(n_groups),
        })
    }

    /// Record the current stream position as the next group's offset.
    pub fn record<W: Write + Seek>(&mut self, w: &mut W) -> io::Result<()> {
        let pos = w.stream_position()?;
        self.offsets.push(pos - self.block_start);
        Ok(())
    }

    /// Patch the placeholder with the recorded offsets and restore the
    /// stream position to the block end.
    pub fn finish<W: Write + Seek>(self, w: &mut W) -> io::Result<()> {
        debug_assert_eq!(self.offsets.len(), self.n_groups);
        let end = w.stream_position()?;
        w.seek(SeekFrom::Start(self.dir_pos))?;
        for &off in &self.offsets {
            w.write_u64_le(off)?;
        }
        w.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

pub(crate) fn read_group_directory<R: Read>(r: &mut R, n_groups: usize) -> Result<Vec<u64>> {
    let mut offsets = Vec::with_capacity(n_groups);
    for _ in 0..n_groups {
        offsets.push(r.read_u64_le()?);
    }
    Ok(offsets)
}

/// Inclusive first/last group indices overlapping `[first, first + len)`.
/// `len` must be non-zero.
pub(crate) fn group_span(first: u64, len: u64, group_rows: u32) -> (usize, usize) {
    let gr = group_rows as u64;
    ((first / gr) as usize, ((first + len - 1) / gr) as usize)
}
