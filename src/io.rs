//! Little-endian framing primitives.
//!
//! Every numeric field that reaches the file goes through these traits so
//! the byte-order decision lives in one place. No conversion is performed;
//! files only round-trip between little-endian hosts.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub(crate) trait ReadLe: Read {
    fn read_u16_le(&mut self) -> io::Result<u16> {
        self.read_u16::<LittleEndian>()
    }

    fn read_u32_le(&mut self) -> io::Result<u32> {
        self.read_u32::<LittleEndian>()
    }

    fn read_i32_le(&mut self) -> io::Result<i32> {
        self.read_i32::<LittleEndian>()
    }

    fn read_u64_le(&mut self) -> io::Result<u64> {
        self.read_u64::<LittleEndian>()
    }

    fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Read + ?Sized> ReadLe for R {}

pub(crate) trait WriteLe: Write {
    fn write_u16_le(&mut self, v: u16) -> io::Result<()> {
        self.write_u16::<LittleEndian>(v)
    }

    fn write_u32_le(&mut self, v: u32) -> io::Result<()> {
        self.write_u32::<LittleEndian>(v)
    }

    fn write_i32_le(&mut self, v: i32) -> io::Result<()> {
        self.write_i32::<LittleEndian>(v)
    }

    fn write_u64_le(&mut self, v: u64) -> io::Result<()> {
        self.write_u64::<LittleEndian>(v)
    }
}

impl<W: Write + ?Sized> WriteLe for W {}
