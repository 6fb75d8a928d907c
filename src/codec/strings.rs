//! String column bodies. Each row group is self-contained: a per-row
//! length table (with a sentinel separating missing from empty) followed
//! by the group's concatenated string bytes, possibly compressed. The
//! column-name block at the head of the file uses this codec with
//! compression disabled.

use std::io::{Read, Seek, SeekFrom, Write};

use super::{
    compress_group, decompress_group, group_span, read_group_directory, BlockHeader, Compression,
    GroupDirectory, GroupHeader, STRING_GROUP_ROWS,
};
use crate::io::{ReadLe, WriteLe};
use crate::types::StrColumn;
use crate::{BasaltError, Result};

/// Length-table sentinel for a missing string; 0 is the empty string.
pub(crate) const MISSING_LEN: u32 = u32::MAX;

pub(crate) fn write_block<W: Write + Seek>(
    w: &mut W,
    col: &StrColumn,
    compression: Compression,
) -> Result<()> {
    let block_start = w.stream_position()?;
    let header = BlockHeader {
        rows: col.len() as u64,
        group_rows: STRING_GROUP_ROWS,
        codec: compression.id(),
    };
    header.write_to(w)?;

    let gr = STRING_GROUP_ROWS as usize;
    let mut dir = GroupDirectory::begin(w, block_start, header.group_count() as usize)?;
    for lo in (0..col.len()).step_by(gr) {
        dir.record(w)?;
        let hi = (lo + gr).min(col.len());
        let mut lengths = Vec::with_capacity(hi - lo);
        let mut body: Vec<u8> = Vec::new();
        for i in lo..hi {
            match col.get(i) {
                Some(s) => {
                    lengths.push(s.len() as u32);
                    body.extend_from_slice(s.as_bytes());
                }
                None => lengths.push(MISSING_LEN),
            }
        }
        let raw_len = body.len();
        let (codec, stored) = compress_group(body, compression);
        GroupHeader {
            raw_len: raw_len as u32,
            stored_len: stored.len() as u32,
            codec,
        }
        .write_to(w)?;
        for &l in &lengths {
            w.write_u32_le(l)?;
        }
        w.write_all(&stored)?;
    }
    dir.finish(w)?;
    Ok(())
}

/// Decode rows `[first, first + len)`. Only the groups overlapping the
/// window are read; leading rows inside the first group are skipped via
/// the length table.
pub(crate) fn read_block_range<R: Read + Seek>(
    r: &mut R,
    block_pos: u64,
    first: u64,
    len: u64,
    rows: u64,
) -> Result<StrColumn> {
    if len == 0 {
        return Ok(StrColumn::new());
    }
    r.seek(SeekFrom::Start(block_pos))?;
    let header = BlockHeader::read_from(r)?;
    if header.rows != rows {
        return Err(BasaltError::Corrupt("string block row count mismatch"));
    }
    let offsets = read_group_directory(r, header.group_count() as usize)?;

    let gr = header.group_rows as u64;
    let (g0, g1) = group_span(first, len, header.group_rows);
    let mut out = StrColumn::with_capacity(len as usize);
    for (g, &offset) in offsets.iter().enumerate().take(g1 + 1).skip(g0) {
        r.seek(SeekFrom::Start(block_pos + offset))?;
        let gh = GroupHeader::read_from(r)?;

        let group_first = g as u64 * gr;
        let rows_here = gr.min(header.rows - group_first) as usize;
        let mut lengths = Vec::with_capacity(rows_here);
        for _ in 0..rows_here {
            lengths.push(r.read_u32_le()?);
        }
        let stored = r.read_bytes(gh.stored_len as usize)?;
        let body = decompress_group(gh.codec, stored, gh.raw_len as usize)?;
        let body = String::from_utf8(body)
            .map_err(|_| BasaltError::Corrupt("string data is not valid utf-8"))?;

        let lo = (first.max(group_first) - group_first) as usize;
        let hi = ((first + len).min(group_first + rows_here as u64) - group_first) as usize;
        let mut pos = 0usize;
        for &l in &lengths[..lo] {
            if l != MISSING_LEN {
                pos += l as usize;
            }
        }
        for &l in &lengths[lo..hi] {
            if l == MISSING_LEN {
                out.push(None);
                continue;
            }
            let end = pos + l as usize;
            let s = body
                .get(pos..end)
                .ok_or(BasaltError::Corrupt("string length table overruns payload"))?;
            out.push(Some(s));
            pos = end;
        }
    }
    Ok(out)
}

/// Decode a whole block whose row count is known only from its header
/// (used for factor levels).
pub(crate) fn read_block_full<R: Read + Seek>(r: &mut R, block_pos: u64) -> Result<StrColumn> {
    r.seek(SeekFrom::Start(block_pos))?;
    let header = BlockHeader::read_from(r)?;
    read_block_range(r, block_pos, 0, header.rows, header.rows)
}
