//! Factor column bodies: an int32 block of level codes followed by a
//! string block of level names, behind an 8-byte length prefix so the
//! levels are addressable without decoding the codes. Codes are
//! range-decoded like any primitive column; the levels block is always
//! read in full (level sets are small).

use std::io::{Read, Seek, SeekFrom, Write};

use super::{primitive, strings, Compression};
use crate::io::{ReadLe, WriteLe};
use crate::types::StrColumn;
use crate::Result;

pub(crate) fn write_block<W: Write + Seek>(
    w: &mut W,
    codes: &[i32],
    levels: &StrColumn,
    compression: Compression,
) -> Result<()> {
    let prefix_pos = w.stream_position()?;
    w.write_u64_le(0)?; // codes sub-block length, patched below

    let codes_start = w.stream_position()?;
    primitive::write_block(w, codes, compression)?;
    let codes_end = w.stream_position()?;

    strings::write_block(w, levels, compression)?;
    let block_end = w.stream_position()?;

    w.seek(SeekFrom::Start(prefix_pos))?;
    w.write_u64_le(codes_end - codes_start)?;
    w.seek(SeekFrom::Start(block_end))?;
    Ok(())
}

pub(crate) fn read_block_range<R: Read + Seek>(
    r: &mut R,
    block_pos: u64,
    first: u64,
    len: u64,
    rows: u64,
) -> Result<(Vec<i32>, StrColumn)> {
    r.seek(SeekFrom::Start(block_pos))?;
    let codes_len = r.read_u64_le()?;
    let codes_pos = block_pos + 8;

    let codes = primitive::read_i32_range(r, codes_pos, first, len, rows)?;
    let levels = strings::read_block_full(r, codes_pos + codes_len)?;
    Ok((codes, levels))
}
