//! gx3d - GX3D container exporter
//!
//! `gx3d export level.ron` walks a scene document and writes `level.gx3d`
//! plus its companion constants. `gx3d inspect level.gx3d` prints the tables
//! of an existing container.

use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use gx3d::config::ExportConfig;
use gx3d_core::reader::read_header;
use gx3d_core::{container, ConstantsLanguage, ExportContext};
use gx3d_scene::{SceneDocument, SceneWalker};

/// Extension of written containers
const CONTAINER_EXTENSION: &str = "gx3d";

#[derive(Parser)]
#[command(name = "gx3d", version, about = "Export scene documents to GX3D containers")]
struct Cli {
    /// Configuration directory holding default.toml and user.toml
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a scene document
    Export {
        /// Scene document (RON)
        document: PathBuf,
        /// Container path, defaults to the document path with a .gx3d extension
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Companion constants language (cpp, rust, none)
        #[arg(long, value_parser = parse_language)]
        constants: Option<ConstantsLanguage>,
    },
    /// Print the header and tables of a container
    Inspect {
        container: PathBuf,
    },
}

fn parse_language(s: &str) -> Result<ConstantsLanguage, String> {
    match s.to_ascii_lowercase().as_str() {
        "cpp" | "c++" => Ok(ConstantsLanguage::Cpp),
        "rust" => Ok(ConstantsLanguage::Rust),
        "none" => Ok(ConstantsLanguage::None),
        other => Err(format!("unknown constants language '{}'", other)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ExportConfig::load_from(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}. Using defaults.", e);
            ExportConfig::default()
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.debug.log_level.as_str()),
    )
    .init();

    let result = match cli.command {
        Command::Export { document, output, constants } => {
            export(&config, &document, output, constants)
        }
        Command::Inspect { container } => inspect(&container),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn export(
    config: &ExportConfig,
    document_path: &Path,
    output: Option<PathBuf>,
    constants: Option<ConstantsLanguage>,
) -> Result<(), Box<dyn Error>> {
    let document = SceneDocument::load(document_path)?;
    log::info!("Loaded {} with {} scenes", document_path.display(), document.scenes.len());

    let baker = config.ibl_baker();
    let mut ctx = ExportContext::new(config.ids.first_id);
    let scenes = SceneWalker::new(&document, &mut ctx)
        .with_baker(baker.as_ref())
        .walk()?;
    if scenes.is_empty() {
        log::warn!("No exportable scene in {}", document_path.display());
    }

    let path = output
        .or_else(|| config.output.path.clone())
        .unwrap_or_else(|| document_path.with_extension(CONTAINER_EXTENSION));
    let language = constants.unwrap_or(config.output.constants);

    let summary = container::export(ctx, &path, language)?;
    for (category, rows) in &summary.rows {
        log::debug!("{}: {} rows", category, rows);
    }
    log::info!(
        "Exported {} scenes, watermark {}, {} bytes",
        scenes.len(),
        summary.watermark,
        summary.bytes
    );
    Ok(())
}

fn inspect(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut reader = BufReader::new(File::open(path)?);
    let header = read_header(&mut reader)?;

    println!("{}", path.display());
    println!(
        "  endianness: {}",
        if header.little_endian { "little" } else { "big" }
    );
    println!("  watermark:  {}", header.watermark);
    for (category, rows) in &header.tables {
        println!("  {} ({} rows)", category, rows.len());
        for row in rows {
            println!("    {:>8}  @{:<10}  {}", row.id, row.offset, row.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!(parse_language("cpp"), Ok(ConstantsLanguage::Cpp));
        assert_eq!(parse_language("C++"), Ok(ConstantsLanguage::Cpp));
        assert_eq!(parse_language("Rust"), Ok(ConstantsLanguage::Rust));
        assert_eq!(parse_language("none"), Ok(ConstantsLanguage::None));
        assert!(parse_language("python").is_err());
    }

    #[test]
    fn test_cli_export_arguments() {
        let cli = Cli::try_parse_from([
            "gx3d", "export", "level.ron", "-o", "out/level.gx3d", "--constants", "rust",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, PathBuf::from("config"));
        match cli.command {
            Command::Export { document, output, constants } => {
                assert_eq!(document, PathBuf::from("level.ron"));
                assert_eq!(output, Some(PathBuf::from("out/level.gx3d")));
                assert_eq!(constants, Some(ConstantsLanguage::Rust));
            }
            Command::Inspect { .. } => panic!("expected export"),
        }
    }

    #[test]
    fn test_cli_inspect_with_config_dir() {
        let cli = Cli::try_parse_from(["gx3d", "inspect", "level.gx3d", "--config-dir", "/etc/gx3d"])
            .unwrap();
        assert_eq!(cli.config_dir, PathBuf::from("/etc/gx3d"));
        assert!(matches!(cli.command, Command::Inspect { .. }));
    }
}
