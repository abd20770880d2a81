//! Scratch files and external baking tools
//!
//! Scratch files exist only for the duration of one tool call: they are read
//! back into memory and removed on drop, including when the tool fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{ExportError, Result};

/// Temporary file handed to an external tool
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn new() -> Result<Self> {
        Ok(Self { file: NamedTempFile::new()? })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Whole content as written by the tool
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.path())?)
    }
}

/// Output resolutions of the image-based-lighting baker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeResolutions {
    pub baked_cube: u32,
    pub irradiance: u32,
    pub radiance: u32,
}

impl Default for BakeResolutions {
    fn default() -> Self {
        Self {
            baked_cube: 1024,
            irradiance: 128,
            radiance: 512,
        }
    }
}

/// Maps baked from one equirectangular environment
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakedEnvironment {
    pub cube: Vec<u8>,
    pub irradiance: Vec<u8>,
    pub radiance: Vec<u8>,
}

/// Runs the external image-based-lighting baker
#[derive(Clone, Debug)]
pub struct IblBaker {
    pub program: PathBuf,
    pub resolutions: BakeResolutions,
}

impl IblBaker {
    pub fn new(program: impl Into<PathBuf>, resolutions: BakeResolutions) -> Self {
        Self {
            program: program.into(),
            resolutions,
        }
    }

    /// Bake cube, irradiance and radiance maps for `environment`
    pub fn bake(&self, environment: &Path) -> Result<BakedEnvironment> {
        let cube = ScratchFile::new()?;
        let irradiance = ScratchFile::new()?;
        let radiance = ScratchFile::new()?;

        log::info!(
            "Baking image based lighting for {} with {}",
            environment.display(),
            self.program.display()
        );
        let status = Command::new(&self.program)
            .arg("--environment-file")
            .arg(environment)
            .arg("--baked-cube-file")
            .arg(cube.path())
            .arg("--baked-cube-resolution")
            .arg(self.resolutions.baked_cube.to_string())
            .arg("--irradiance-file")
            .arg(irradiance.path())
            .arg("--irradiance-resolution")
            .arg(self.resolutions.irradiance.to_string())
            .arg("--radiance-file")
            .arg(radiance.path())
            .arg("--radiance-resolution")
            .arg(self.resolutions.radiance.to_string())
            .status()
            .map_err(|err| self.tool_error(format!("could not start: {}", err)))?;

        if !status.success() {
            return Err(self.tool_error(format!("exited with status {:?}", status.code())));
        }

        Ok(BakedEnvironment {
            cube: cube.read()?,
            irradiance: irradiance.read()?,
            radiance: radiance.read()?,
        })
    }

    fn tool_error(&self, reason: String) -> ExportError {
        ExportError::ExternalTool {
            tool: self.program.display().to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_removed_on_drop() {
        let scratch = ScratchFile::new().unwrap();
        let path = scratch.path().to_path_buf();
        fs::write(&path, b"baked").unwrap();
        assert_eq!(scratch.read().unwrap(), b"baked");
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_default_resolutions() {
        let r = BakeResolutions::default();
        assert_eq!((r.baked_cube, r.irradiance, r.radiance), (1024, 128, 512));
    }

    #[test]
    fn test_missing_baker_is_external_tool_error() {
        let baker = IblBaker::new("/nonexistent/gx3d-ibl-baker", BakeResolutions::default());
        let err = baker.bake(Path::new("sky.hdr")).unwrap_err();
        match err {
            ExportError::ExternalTool { tool, reason } => {
                assert!(tool.contains("gx3d-ibl-baker"));
                assert!(reason.contains("could not start"));
            }
            other => panic!("Expected ExternalTool, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_baker_status() {
        let baker = IblBaker::new("false", BakeResolutions::default());
        let err = baker.bake(Path::new("sky.hdr")).unwrap_err();
        assert!(matches!(err, ExportError::ExternalTool { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_succeeding_baker_reads_outputs() {
        // `true` ignores its arguments and leaves the scratch files empty
        let baker = IblBaker::new("true", BakeResolutions::default());
        let baked = baker.bake(Path::new("sky.hdr")).unwrap();
        assert_eq!(baked, BakedEnvironment::default());
    }
}
