//! Output container formats
//!
//! One static table decides, per format, which family it belongs to,
//! whether it embeds georeferencing and which world file extension it
//! takes. Every call site goes through it.

use std::fmt;
use std::str::FromStr;

use super::errors::ReprojectError;

/// Container family of an output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    Tiff,
    Jpeg,
    Png,
}

/// Static properties of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyTraits {
    pub family: FormatFamily,
    pub world_extension: &'static str,
    pub embeds_georeferencing: bool,
}

const FORMAT_TABLE: &[(&str, FamilyTraits)] = &[
    ("tif", FamilyTraits { family: FormatFamily::Tiff, world_extension: "tfw", embeds_georeferencing: true }),
    ("tiff", FamilyTraits { family: FormatFamily::Tiff, world_extension: "tfw", embeds_georeferencing: true }),
    ("jpg", FamilyTraits { family: FormatFamily::Jpeg, world_extension: "jgw", embeds_georeferencing: false }),
    ("jpeg", FamilyTraits { family: FormatFamily::Jpeg, world_extension: "jgw", embeds_georeferencing: false }),
    ("png", FamilyTraits { family: FormatFamily::Png, world_extension: "jgw", embeds_georeferencing: false }),
];

/// A requested output format, keeping the spelling it was requested with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    extension: &'static str,
    traits: FamilyTraits,
}

impl OutputFormat {
    /// Every accepted format name
    pub fn names() -> impl Iterator<Item = &'static str> {
        FORMAT_TABLE.iter().map(|(name, _)| *name)
    }

    /// File extension used for the primary output
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn family(&self) -> FormatFamily {
        self.traits.family
    }

    pub fn world_extension(&self) -> &'static str {
        self.traits.world_extension
    }

    pub fn embeds_georeferencing(&self) -> bool {
        self.traits.embeds_georeferencing
    }
}

impl FromStr for OutputFormat {
    type Err = ReprojectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        FORMAT_TABLE.iter()
            .find(|(name, _)| *name == wanted)
            .map(|(name, traits)| OutputFormat { extension: name, traits: *traits })
            .ok_or_else(|| ReprojectError::UnsupportedFormat(format!(
                "'{}' is not one of {}", s.trim(), Self::names().collect::<Vec<_>>().join(", ")
            )))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension)
    }
}
