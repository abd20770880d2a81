//! Container reader
//!
//! Reads back the header and table block of a container. Bodies are not
//! decoded; a row's offset can be used to look at the subtype byte.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::category::Category;
use crate::error::{ExportError, Result};

/// Upper bound on a single table name, to reject garbage early
const MAX_NAME_LEN: u64 = 1 << 16;

/// One table row as stored in the container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    pub id: u64,
    pub offset: u64,
    pub name: String,
}

/// Header and tables of a container
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerHeader {
    pub little_endian: bool,
    /// Next free id when the container was written
    pub watermark: u64,
    /// Tables in schema order
    pub tables: Vec<(Category, Vec<TableRow>)>,
}

impl ContainerHeader {
    pub fn rows(&self, category: Category) -> &[TableRow] {
        self.tables
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, category: Category, name: &str) -> Option<&TableRow> {
        self.rows(category).iter().find(|r| r.name == name)
    }
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u64::<LittleEndian>()?;
    if len > MAX_NAME_LEN {
        return Err(ExportError::Format(format!("table name of {} bytes", len)));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| ExportError::Format(format!("table name is not UTF-8: {}", e)))
}

/// Read the header and every table from the start of `r`
pub fn read_header<R: Read>(r: &mut R) -> Result<ContainerHeader> {
    let little_endian = match r.read_u8()? {
        1 => true,
        0 => {
            return Err(ExportError::Format(
                "big-endian containers are not supported".to_string(),
            ))
        }
        other => return Err(ExportError::Format(format!("bad endianness flag {}", other))),
    };
    let watermark = r.read_u64::<LittleEndian>()?;

    let mut tables = Vec::with_capacity(Category::SCHEMA.len());
    for category in Category::SCHEMA {
        let count = r.read_u64::<LittleEndian>()?;
        let mut rows = Vec::new();
        for _ in 0..count {
            let id = r.read_u64::<LittleEndian>()?;
            let offset = r.read_u64::<LittleEndian>()?;
            let name = read_string(r)?;
            rows.push(TableRow { id, offset, name });
        }
        tables.push((category, rows));
    }

    Ok(ContainerHeader {
        little_endian,
        watermark,
        tables,
    })
}

/// Subtype byte of the body starting at `offset`
pub fn read_subtype<R: Read + Seek>(r: &mut R, offset: u64) -> Result<u8> {
    r.seek(SeekFrom::Start(offset))?;
    Ok(r.read_u8()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn empty_container() -> Vec<u8> {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&1024u64.to_le_bytes());
        for _ in Category::SCHEMA {
            bytes.extend_from_slice(&0u64.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_read_empty_container() {
        let header = read_header(&mut Cursor::new(empty_container())).unwrap();
        assert!(header.little_endian);
        assert_eq!(header.watermark, 1024);
        assert_eq!(header.tables.len(), 11);
        assert!(header.rows(Category::Mesh).is_empty());
    }

    #[test]
    fn test_bad_flag() {
        let mut bytes = empty_container();
        bytes[0] = 7;
        assert!(matches!(
            read_header(&mut Cursor::new(bytes)),
            Err(ExportError::Format(_))
        ));
    }

    #[test]
    fn test_truncated_is_io_error() {
        let bytes = empty_container();
        let truncated = bytes[..20].to_vec();
        assert!(matches!(
            read_header(&mut Cursor::new(truncated)),
            Err(ExportError::Io(_))
        ));
    }
}
