//! World files
//!
//! Six lines of decimal text: pixel width (a), row rotation (b), column
//! rotation (d), pixel height (e), then the origin x (c) and y (f). The
//! line order is what GIS readers expect and never changes.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::coordinate::AffineTransform;
use crate::tiff::errors::TiffError;

use super::errors::{ReprojectError, ReprojectResult};
use super::format::OutputFormat;

/// Result of asking for a world file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldFileOutcome {
    Written(PathBuf),
    /// The format embeds its own georeferencing
    SkippedNotApplicable,
}

impl WorldFileOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            WorldFileOutcome::Written(path) => Some(path),
            WorldFileOutcome::SkippedNotApplicable => None,
        }
    }
}

/// Sidecar path for `output`: same base name, the format's world extension
pub fn world_file_path(output: &Path, format: OutputFormat) -> PathBuf {
    output.with_extension(format.world_extension())
}

/// Renders the six world file lines
pub fn format_world_file(transform: &AffineTransform) -> String {
    let t = transform;
    [t.a, t.b, t.d, t.e, t.c, t.f]
        .iter()
        .map(|v| format!("{}\n", v))
        .collect()
}

/// Writes the world file for `output`, unless `format` embeds georeferencing
pub fn emit(output: &Path, transform: &AffineTransform, format: OutputFormat) -> ReprojectResult<WorldFileOutcome> {
    if format.embeds_georeferencing() {
        debug!("{} embeds georeferencing, no world file", format);
        return Ok(WorldFileOutcome::SkippedNotApplicable);
    }

    let path = world_file_path(output, format);
    fs::write(&path, format_world_file(transform))?;
    info!("Wrote world file {}", path.display());
    Ok(WorldFileOutcome::Written(path))
}

/// Reads a world file back into a transform
pub fn parse_world_file(text: &str) -> ReprojectResult<AffineTransform> {
    let values = text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.parse::<f64>().map_err(|_| {
            ReprojectError::Io(TiffError::CorruptData(format!("World file line '{}' is not a number", line)))
        }))
        .collect::<ReprojectResult<Vec<f64>>>()?;

    if values.len() != 6 {
        return Err(ReprojectError::Io(TiffError::CorruptData(format!(
            "World file holds {} values, expected 6", values.len()
        ))));
    }

    let (a, b, d, e, c, f) = (values[0], values[1], values[2], values[3], values[4], values[5]);
    Ok(AffineTransform::new(a, b, c, d, e, f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_order() {
        let transform = AffineTransform::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(format_world_file(&transform), "1\n2\n4\n5\n3\n6\n");
    }

    #[test]
    fn test_round_trip_exact() {
        let transform = AffineTransform::new(111330.79809717716, 0.0, 0.0, 0.0, -111330.79809717716, 222684.20850554388);
        let parsed = parse_world_file(&format_world_file(&transform)).unwrap();
        assert_eq!(parsed, transform);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_world_file("1\n2\n3\n").is_err());
        assert!(parse_world_file("1\n0\n0\n-1\nx\n2\n").is_err());
        assert!(parse_world_file(" 1 \r\n0\n0\n-1\n0\n2\n\n").is_ok());
    }

    #[test]
    fn test_emit_per_family() {
        let dir = tempfile::tempdir().unwrap();
        let transform = AffineTransform::from_origin(10.0, 20.0, 0.5, 0.5);

        let png = dir.path().join("scene_processed.png");
        let outcome = emit(&png, &transform, "png".parse().unwrap()).unwrap();
        assert_eq!(outcome.path(), Some(dir.path().join("scene_processed.jgw").as_path()));
        assert_eq!(fs::read_to_string(outcome.path().unwrap()).unwrap(), "0.5\n0\n0\n-0.5\n10\n20\n");

        let tif = dir.path().join("scene_processed.tif");
        assert_eq!(emit(&tif, &transform, "tif".parse().unwrap()).unwrap(), WorldFileOutcome::SkippedNotApplicable);
        assert!(!dir.path().join("scene_processed.tfw").exists());
    }
}
