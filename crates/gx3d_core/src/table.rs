//! Two-pass offset tables
//!
//! Each category table is written twice at the same stream position: once with
//! placeholder offsets before any body is known (reserve), and once more with
//! the real offsets after the bodies are written (patch). Both passes must
//! produce exactly the same number of bytes.
//!
//! Per category the table walks `Empty -> Reserved -> BodiesWritten -> Patched`;
//! any other order is rejected with [`ExportError::TableOrder`].

use std::collections::{BTreeMap, HashSet};
use std::io::{Seek, Write};

use crate::category::Category;
use crate::entity::{Entity, EntityKey};
use crate::error::{ExportError, Result};
use crate::naming::reference_name;
use crate::registry::Registry;
use crate::writer::BinaryWriter;

/// Bytes of a row without its name: id, offset and name length
const ROW_FIXED_LEN: u64 = 24;

/// Where a reserved table lives and what it held
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Reservation {
    start: u64,
    byte_len: u64,
    rows: usize,
    bodies: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TableState {
    Empty,
    Reserved(Reservation),
    BodiesWritten(Reservation),
    Patched,
}

impl TableState {
    fn label(&self) -> &'static str {
        match self {
            TableState::Empty => "empty",
            TableState::Reserved(_) => "reserved",
            TableState::BodiesWritten(_) => "bodies written",
            TableState::Patched => "patched",
        }
    }
}

/// Public view of a table's progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableStage {
    Empty,
    Reserved,
    BodiesWritten,
    Patched,
}

struct Row<'a> {
    key: EntityKey,
    id: u64,
    name: &'a str,
}

fn rows<'a>(registry: &'a Registry, category: Category) -> Vec<Row<'a>> {
    registry
        .table_members(category)
        .into_iter()
        .filter_map(|key| {
            registry.get(key).map(|e| Row {
                key,
                id: e.id,
                name: reference_name(&e.name),
            })
        })
        .collect()
}

fn encoded_len(rows: &[Row<'_>]) -> u64 {
    8 + rows
        .iter()
        .map(|r| ROW_FIXED_LEN + r.name.len() as u64)
        .sum::<u64>()
}

/// Table state of every category in one container
#[derive(Debug, Default)]
pub struct OffsetTables {
    states: BTreeMap<Category, TableState>,
}

impl OffsetTables {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, category: Category) -> TableState {
        self.states.get(&category).copied().unwrap_or(TableState::Empty)
    }

    pub fn stage(&self, category: Category) -> TableStage {
        match self.state(category) {
            TableState::Empty => TableStage::Empty,
            TableState::Reserved(_) => TableStage::Reserved,
            TableState::BodiesWritten(_) => TableStage::BodiesWritten,
            TableState::Patched => TableStage::Patched,
        }
    }

    fn order_error(&self, category: Category, operation: &'static str) -> ExportError {
        ExportError::TableOrder {
            category,
            operation,
            state: self.state(category).label(),
        }
    }

    /// First pass: write the table with placeholder offsets
    ///
    /// Fails with [`ExportError::DuplicateIdentity`] before writing anything
    /// when two rows of the table carry the same name.
    pub fn reserve<W: Write + Seek>(
        &mut self,
        category: Category,
        registry: &Registry,
        w: &mut BinaryWriter<W>,
    ) -> Result<()> {
        if self.state(category) != TableState::Empty {
            return Err(self.order_error(category, "reserve"));
        }
        let rows = rows(registry, category);
        let mut names = HashSet::with_capacity(rows.len());
        if let Some(dup) = rows.iter().find(|r| !names.insert(r.name)) {
            return Err(ExportError::DuplicateIdentity {
                category,
                key: dup.name.to_string(),
            });
        }
        let start = w.position();
        w.write_u64(rows.len() as u64)?;
        for r in &rows {
            w.write_u64(r.id)?;
            w.write_u64(0)?;
            w.write_string(r.name)?;
        }
        let reservation = Reservation {
            start,
            byte_len: w.position() - start,
            rows: rows.len(),
            bodies: registry.origins(category).len(),
        };
        log::info!("Number of {} table rows: {}", category, rows.len());
        self.states.insert(category, TableState::Reserved(reservation));
        Ok(())
    }

    fn check_size(&self, category: Category, reserved: &Reservation, registry: &Registry) -> Result<()> {
        let current = rows(registry, category);
        let bodies = registry.origins(category).len();
        let byte_len = encoded_len(&current);
        if current.len() != reserved.rows || byte_len != reserved.byte_len || bodies != reserved.bodies {
            return Err(ExportError::TableSizeMismatch {
                category,
                reserved_rows: reserved.rows,
                actual_rows: current.len(),
                reserved_bytes: reserved.byte_len,
                actual_bytes: byte_len,
            });
        }
        Ok(())
    }

    /// Write the body of every non-alias entity, recording its offset
    ///
    /// Fails before writing anything if the category no longer matches what was
    /// reserved.
    pub fn write_bodies<W, F>(
        &mut self,
        category: Category,
        registry: &mut Registry,
        w: &mut BinaryWriter<W>,
        mut write: F,
    ) -> Result<()>
    where
        W: Write + Seek,
        F: FnMut(&Entity, &mut BinaryWriter<W>) -> Result<()>,
    {
        let reservation = match self.state(category) {
            TableState::Reserved(r) => r,
            _ => return Err(self.order_error(category, "write bodies")),
        };
        self.check_size(category, &reservation, registry)?;

        for key in registry.origins(category) {
            registry.set_offset(key, w.position())?;
            let entity = registry
                .get(key)
                .ok_or_else(|| ExportError::Format(format!("{} entity vanished", category)))?;
            write(entity, w)?;
        }
        self.states.insert(category, TableState::BodiesWritten(reservation));
        Ok(())
    }

    /// Second pass: rewrite the reserved table with resolved offsets
    pub fn patch<W: Write + Seek>(
        &mut self,
        category: Category,
        registry: &Registry,
        w: &mut BinaryWriter<W>,
    ) -> Result<()> {
        let reservation = match self.state(category) {
            TableState::BodiesWritten(r) => r,
            _ => return Err(self.order_error(category, "patch")),
        };
        self.check_size(category, &reservation, registry)?;

        let rows = rows(registry, category);
        w.seek(reservation.start)?;
        w.write_u64(rows.len() as u64)?;
        for r in &rows {
            let offset = registry.resolved_offset(r.key).ok_or_else(|| {
                ExportError::Format(format!("{} '{}' has no body offset", category, r.name))
            })?;
            w.write_u64(r.id)?;
            w.write_u64(offset)?;
            w.write_string(r.name)?;
            log::debug!("{} id: {} offset: {} name: {}", category, r.id, offset, r.name);
        }
        w.seek_end()?;
        self.states.insert(category, TableState::Patched);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{write_entity, Body, BodyContext, CameraBody};
    use crate::category::CategoryTag;
    use crate::registry::Registration;
    use std::io::Cursor;

    fn writer() -> BinaryWriter<Cursor<Vec<u8>>> {
        BinaryWriter::new(Cursor::new(Vec::new()))
    }

    fn add_camera(reg: &mut Registry, name: &str) {
        reg.register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, name), |_| {
            Ok(Body::Camera(CameraBody::default()))
        })
        .unwrap();
    }

    fn write_all(tables: &mut OffsetTables, reg: &mut Registry, w: &mut BinaryWriter<Cursor<Vec<u8>>>) -> Result<()> {
        let ctx = BodyContext::default();
        tables.write_bodies(Category::Camera, reg, w, |e, w| write_entity(e, w, &ctx))
    }

    #[test]
    fn test_reserve_writes_placeholders() {
        let mut reg = Registry::default();
        add_camera(&mut reg, "camera-perspective-main");
        let mut tables = OffsetTables::new();
        let mut w = writer();
        tables.reserve(Category::Camera, &reg, &mut w).unwrap();
        assert_eq!(tables.stage(Category::Camera), TableStage::Reserved);
        // count + id + offset + len + "main"
        assert_eq!(w.position(), 8 + 24 + 4);
        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(&bytes[16..24], &0u64.to_le_bytes());
    }

    #[test]
    fn test_full_cycle_patches_offsets() {
        let mut reg = Registry::default();
        add_camera(&mut reg, "camera-perspective-main");
        let mut tables = OffsetTables::new();
        let mut w = writer();
        tables.reserve(Category::Camera, &reg, &mut w).unwrap();
        let body_start = w.position();
        write_all(&mut tables, &mut reg, &mut w).unwrap();
        tables.patch(Category::Camera, &reg, &mut w).unwrap();
        assert_eq!(tables.stage(Category::Camera), TableStage::Patched);
        assert_eq!(w.position(), w.end());
        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(&bytes[16..24], &body_start.to_le_bytes());
        assert_eq!(bytes[body_start as usize], 1);
    }

    #[test]
    fn test_out_of_order_calls() {
        let mut reg = Registry::default();
        add_camera(&mut reg, "camera-perspective-main");
        let mut tables = OffsetTables::new();
        let mut w = writer();
        assert!(matches!(
            write_all(&mut tables, &mut reg, &mut w),
            Err(ExportError::TableOrder { operation: "write bodies", state: "empty", .. })
        ));
        assert!(matches!(
            tables.patch(Category::Camera, &reg, &mut w),
            Err(ExportError::TableOrder { operation: "patch", .. })
        ));
        tables.reserve(Category::Camera, &reg, &mut w).unwrap();
        assert!(matches!(
            tables.reserve(Category::Camera, &reg, &mut w),
            Err(ExportError::TableOrder { operation: "reserve", state: "reserved", .. })
        ));
        assert!(matches!(
            tables.patch(Category::Camera, &reg, &mut w),
            Err(ExportError::TableOrder { .. })
        ));
    }

    #[test]
    fn test_size_mismatch_before_any_write() {
        let mut reg = Registry::default();
        add_camera(&mut reg, "camera-perspective-a");
        add_camera(&mut reg, "camera-perspective-b");
        let mut tables = OffsetTables::new();
        let mut w = writer();
        tables.reserve(Category::Camera, &reg, &mut w).unwrap();
        let reserved_end = w.position();

        add_camera(&mut reg, "camera-perspective-c");
        let err = write_all(&mut tables, &mut reg, &mut w).unwrap_err();
        match err {
            ExportError::TableSizeMismatch { category, reserved_rows, actual_rows, .. } => {
                assert_eq!(category, Category::Camera);
                assert_eq!(reserved_rows, 2);
                assert_eq!(actual_rows, 3);
            }
            other => panic!("Expected TableSizeMismatch, got {:?}", other),
        }
        assert_eq!(w.position(), reserved_end);
        assert_eq!(w.end(), reserved_end);
    }

    #[test]
    fn test_duplicate_row_name_rejected_before_write() {
        let mut reg = Registry::default();
        add_camera(&mut reg, "camera-perspective-main");
        reg.register(Registration::named(CategoryTag::CAMERA_ORTHOGRAPHIC, "camera-orthographic-main"), |_| {
            Ok(Body::Camera(CameraBody::default()))
        })
        .unwrap();
        let mut tables = OffsetTables::new();
        let mut w = writer();
        let err = tables.reserve(Category::Camera, &reg, &mut w).unwrap_err();
        assert!(matches!(
            err,
            ExportError::DuplicateIdentity { category: Category::Camera, ref key } if key == "main"
        ));
        assert_eq!(w.end(), 0);
        assert_eq!(tables.stage(Category::Camera), TableStage::Empty);
    }

    #[test]
    fn test_empty_category_table() {
        let mut reg = Registry::default();
        let mut tables = OffsetTables::new();
        let mut w = writer();
        tables.reserve(Category::Scene, &reg, &mut w).unwrap();
        tables
            .write_bodies(Category::Scene, &mut reg, &mut w, |_, _| Ok(()))
            .unwrap();
        tables.patch(Category::Scene, &reg, &mut w).unwrap();
        assert_eq!(w.end(), 8);
    }
}
