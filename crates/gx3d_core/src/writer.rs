//! Binary primitive writer
//!
//! Appends little-endian fixed-width scalars, length-prefixed blobs and strings,
//! vectors and column-major matrices to one seekable stream while tracking the
//! current write offset.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use gx3d_math::{Mat4, Vec3};

use crate::error::Result;

/// Little-endian producer flag written at the start of every container
pub const LITTLE_ENDIAN_FLAG: bool = true;

/// Append-only writer with an explicit cursor
///
/// The cursor only moves backwards through [`seek`](BinaryWriter::seek), which
/// the offset tables use to patch reserved rows.
pub struct BinaryWriter<W: Write + Seek> {
    stream: W,
    pos: u64,
    end: u64,
}

impl<W: Write + Seek> BinaryWriter<W> {
    /// Wrap a stream positioned at its start
    pub fn new(stream: W) -> Self {
        Self { stream, pos: 0, end: 0 }
    }

    /// Current write offset
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Offset one past the furthest byte written so far
    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    fn advance(&mut self, n: u64) {
        self.pos += n;
        self.end = self.end.max(self.pos);
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.stream.write_u8(v)?;
        self.advance(1);
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.stream.write_u16::<LittleEndian>(v)?;
        self.advance(2);
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.stream.write_u32::<LittleEndian>(v)?;
        self.advance(4);
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.stream.write_u64::<LittleEndian>(v)?;
        self.advance(8);
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.stream.write_f32::<LittleEndian>(v)?;
        self.advance(4);
        Ok(())
    }

    /// Raw bytes without a length prefix
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data)?;
        self.advance(data.len() as u64);
        Ok(())
    }

    /// `u64` length followed by the bytes
    pub fn write_blob(&mut self, data: &[u8]) -> Result<()> {
        self.write_u64(data.len() as u64)?;
        self.write_bytes(data)
    }

    /// `u64` byte length followed by UTF-8 bytes
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_blob(s.as_bytes())
    }

    pub fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32(v.x)?;
        self.write_f32(v.y)?;
        self.write_f32(v.z)
    }

    pub fn write_vec4(&mut self, v: [f32; 4]) -> Result<()> {
        for c in v {
            self.write_f32(c)?;
        }
        Ok(())
    }

    /// Matrix columns in order, each column top to bottom
    pub fn write_mat4(&mut self, m: &Mat4) -> Result<()> {
        for column in m {
            self.write_vec4(*column)?;
        }
        Ok(())
    }

    /// `u64` count followed by `u32` elements
    pub fn write_u32_array(&mut self, values: &[u32]) -> Result<()> {
        self.write_u64(values.len() as u64)?;
        for &v in values {
            self.write_u32(v)?;
        }
        Ok(())
    }

    /// `u64` count followed by `u64` elements
    pub fn write_u64_array(&mut self, values: &[u64]) -> Result<()> {
        self.write_u64(values.len() as u64)?;
        for &v in values {
            self.write_u64(v)?;
        }
        Ok(())
    }

    /// Move the cursor to an absolute offset that has already been written
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Move the cursor back to the end of the written data
    pub fn seek_end(&mut self) -> Result<()> {
        let end = self.end;
        self.seek(end)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }

    /// Flush and return the underlying stream
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.stream)
    }
}
