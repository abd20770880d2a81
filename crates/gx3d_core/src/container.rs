//! Container writer
//!
//! Layout: endianness flag, id watermark, every category table (reserved),
//! every category's bodies, then the tables again in place with real offsets.

use std::collections::BTreeMap;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::body::write_entity;
use crate::category::Category;
use crate::constants::{companion_source, ConstantsLanguage};
use crate::context::ExportContext;
use crate::error::Result;
use crate::table::OffsetTables;
use crate::writer::{BinaryWriter, LITTLE_ENDIAN_FLAG};

/// What one export produced
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportSummary {
    /// Next free id at the time of writing
    pub watermark: u64,
    /// Container size in bytes
    pub bytes: u64,
    /// Table rows per category
    pub rows: BTreeMap<Category, usize>,
    /// Distinct shader variants
    pub variants: usize,
    /// Companion constant file, when one was written
    pub constants: Option<PathBuf>,
}

/// Write the whole container to `stream`
pub fn write_container<W: Write + Seek>(ctx: &mut ExportContext, stream: W) -> Result<(W, ExportSummary)> {
    let mut w = BinaryWriter::new(stream);
    w.write_bool(LITTLE_ENDIAN_FLAG)?;
    w.write_u64(ctx.registry.next_id())?;

    let mut tables = OffsetTables::new();
    for category in Category::SCHEMA {
        tables.reserve(category, &ctx.registry, &mut w)?;
    }

    let body_ctx = ctx.body_context();
    for category in Category::SCHEMA {
        tables.write_bodies(category, &mut ctx.registry, &mut w, |entity, w| {
            write_entity(entity, w, &body_ctx)
        })?;
    }

    let mut summary = ExportSummary {
        watermark: ctx.registry.next_id(),
        variants: ctx.variants.len(),
        ..Default::default()
    };
    for category in Category::SCHEMA {
        tables.patch(category, &ctx.registry, &mut w)?;
        summary
            .rows
            .insert(category, ctx.registry.table_members(category).len());
    }
    summary.bytes = w.end();
    log::info!("Number of shader variants: {}", summary.variants);

    Ok((w.into_inner()?, summary))
}

/// Write the container to `path` and the companion constant file next to it
///
/// Both files are staged next to their destination and only moved into place
/// once everything has been written, so a failed export leaves no output.
pub fn export(mut ctx: ExportContext, path: &Path, language: ConstantsLanguage) -> Result<ExportSummary> {
    let companion = match language.companion_path(path) {
        Some(companion) => companion_source(language, &ctx.registry, &ctx.variants)?
            .map(|source| (companion, source)),
        None => None,
    };

    let dir = staging_dir(path);
    let (file, mut summary) = write_container(&mut ctx, BufWriter::new(NamedTempFile::new_in(dir)?))?;
    let staged = file.into_inner().map_err(|e| e.into_error())?;
    staged.as_file().sync_all()?;

    let staged_companion = match companion {
        Some((companion, source)) => {
            let mut staged = NamedTempFile::new_in(dir)?;
            staged.write_all(source.as_bytes())?;
            Some((staged, companion))
        }
        None => None,
    };

    staged.persist(path).map_err(|e| e.error)?;
    log::info!("Wrote {} bytes to {}", summary.bytes, path.display());
    if let Some((staged, companion)) = staged_companion {
        staged.persist(&companion).map_err(|e| e.error)?;
        log::info!("Wrote constants to {}", companion.display());
        summary.constants = Some(companion);
    }
    Ok(summary)
}

fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
