//! Coordinate Reference System resolution
//!
//! Every CRS in this crate is identified by an EPSG code. A handful of
//! systems have native projection math (`CoordinateSystem`); all others
//! are looked up in the `crs-definitions` EPSG table and carried as a
//! PROJ.4 definition for `proj4rs`.

use std::fmt;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::reproject::errors::{ReprojectError, ReprojectResult};

lazy_static! {
    static ref EPSG_PREFIXED: Regex = Regex::new(r"(?i)^epsg:\s*(\d+)$").unwrap();
    static ref EPSG_URN: Regex = Regex::new(r"(?i)^urn:ogc:def:crs:epsg:[^:]*:(\d+)$").unwrap();
    static ref WKT_AUTHORITY: Regex =
        Regex::new(r#"(?i)(?:AUTHORITY\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]|ID\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\])"#).unwrap();
}

/// Identifier for coordinate systems with native projection math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// WGS 84 (EPSG:4326)
    WGS84,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM Zone (EPSG:326xx for northern hemisphere, 327xx for southern)
    UTM(u8, bool),
    /// Any other EPSG code, transformed through proj4rs
    Other(u32),
}

impl CoordinateSystem {
    /// Classify an EPSG code
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => CoordinateSystem::WGS84,
            3857 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::UTM((epsg - 32600) as u8, true),
            32701..=32760 => CoordinateSystem::UTM((epsg - 32700) as u8, false),
            _ => CoordinateSystem::Other(epsg),
        }
    }

    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> u32 {
        match self {
            CoordinateSystem::WGS84 => 4326,
            CoordinateSystem::WebMercator => 3857,
            CoordinateSystem::UTM(zone, is_northern) => {
                if *is_northern {
                    32600 + *zone as u32
                } else {
                    32700 + *zone as u32
                }
            },
            CoordinateSystem::Other(code) => *code,
        }
    }

    /// Whether the crate can project this system without proj4rs
    pub fn is_native(&self) -> bool {
        !matches!(self, CoordinateSystem::Other(_))
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::WGS84 => "WGS 84 (EPSG:4326)".to_string(),
            CoordinateSystem::WebMercator => "Web Mercator (EPSG:3857)".to_string(),
            CoordinateSystem::UTM(zone, is_northern) => {
                let hemisphere = if *is_northern { 'N' } else { 'S' };
                format!("UTM Zone {}{} (EPSG:{})", zone, hemisphere, self.epsg_code())
            },
            CoordinateSystem::Other(code) => format!("EPSG:{}", code),
        }
    }
}

/// A fully resolved CRS
///
/// Two values are interchangeable exactly when their EPSG codes match.
#[derive(Debug, Clone)]
pub struct Crs {
    system: CoordinateSystem,
    proj4: Option<&'static str>,
}

impl Crs {
    /// The coordinate system classification
    pub fn system(&self) -> CoordinateSystem {
        self.system
    }

    /// The EPSG code
    pub fn epsg_code(&self) -> u32 {
        self.system.epsg_code()
    }

    /// PROJ.4 definition from the EPSG table, when the code is listed there
    pub fn proj4_definition(&self) -> Option<&'static str> {
        self.proj4
    }

    /// Coordinates are longitude/latitude in degrees
    pub fn is_geographic(&self) -> bool {
        match self.system {
            CoordinateSystem::WGS84 => true,
            CoordinateSystem::WebMercator | CoordinateSystem::UTM(..) => false,
            CoordinateSystem::Other(_) => self.proj4.map_or(false, |def| def.contains("+proj=longlat")),
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        self.system.description()
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.epsg_code() == other.epsg_code()
    }
}

impl Eq for Crs {}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg_code())
    }
}

/// Resolves EPSG codes and CRS descriptor strings into `Crs` values
pub struct CrsResolver;

impl CrsResolver {
    /// Resolve an EPSG code
    ///
    /// Fails with `UnknownEpsg` when the code is not registered and with
    /// `InvalidCrs` when it is registered but its definition is unusable.
    pub fn resolve_epsg(code: u32) -> ReprojectResult<Crs> {
        if code == 0 {
            return Err(ReprojectError::InvalidCrs("EPSG code must be a positive integer".to_string()));
        }

        let system = CoordinateSystem::from_epsg(code);
        let proj4 = u16::try_from(code).ok()
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4);

        if !system.is_native() {
            let definition = proj4.ok_or(ReprojectError::UnknownEpsg(code))?;
            proj4rs::proj::Proj::from_proj_string(definition).map_err(|e| {
                ReprojectError::InvalidCrs(format!("EPSG:{} definition '{}' rejected: {:?}", code, definition, e))
            })?;
        }

        debug!("Resolved EPSG:{} as {}", code, system.description());
        Ok(Crs { system, proj4 })
    }

    /// Resolve a descriptor string
    ///
    /// Accepts `EPSG:<code>`, a bare code, `urn:ogc:def:crs:EPSG::<code>`
    /// and WKT whose outermost authority is EPSG.
    pub fn resolve(descriptor: &str) -> ReprojectResult<Crs> {
        let code = Self::parse_descriptor(descriptor)?;
        Self::resolve_epsg(code)
    }

    /// Extract the EPSG code a descriptor names
    pub fn parse_descriptor(descriptor: &str) -> ReprojectResult<u32> {
        let trimmed = descriptor.trim();
        let malformed = || ReprojectError::InvalidCrs(format!("Unrecognised CRS descriptor: '{}'", trimmed));

        if trimmed.is_empty() {
            return Err(ReprojectError::InvalidCrs("Empty CRS descriptor".to_string()));
        }

        let digits = if trimmed.chars().all(|c| c.is_ascii_digit()) {
            Some(trimmed.to_string())
        } else if let Some(caps) = EPSG_PREFIXED.captures(trimmed) {
            Some(caps[1].to_string())
        } else if let Some(caps) = EPSG_URN.captures(trimmed) {
            Some(caps[1].to_string())
        } else if trimmed.contains('[') {
            // The CRS's own authority closes the WKT, after those of its components
            WKT_AUTHORITY.captures_iter(trimmed)
                .last()
                .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
                .map(|m| m.as_str().to_string())
        } else {
            None
        };

        digits.ok_or_else(malformed)?
            .parse::<u32>()
            .map_err(|_| malformed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_systems() {
        assert_eq!(CoordinateSystem::from_epsg(4326), CoordinateSystem::WGS84);
        assert_eq!(CoordinateSystem::from_epsg(32633), CoordinateSystem::UTM(33, true));
        assert_eq!(CoordinateSystem::from_epsg(32718), CoordinateSystem::UTM(18, false));
        assert_eq!(CoordinateSystem::UTM(18, false).epsg_code(), 32718);
        assert!(!CoordinateSystem::from_epsg(2154).is_native());
    }

    #[test]
    fn test_resolve_epsg() {
        let crs = CrsResolver::resolve_epsg(3857).unwrap();
        assert_eq!(crs.to_string(), "EPSG:3857");
        assert!(!crs.is_geographic());
        assert!(CrsResolver::resolve_epsg(4326).unwrap().is_geographic());
    }

    #[test]
    fn test_resolve_table_code() {
        let crs = CrsResolver::resolve_epsg(2154).unwrap();
        assert_eq!(crs.system(), CoordinateSystem::Other(2154));
        assert!(crs.proj4_definition().is_some());
        assert!(!crs.is_geographic());
    }

    #[test]
    fn test_unknown_and_invalid_codes() {
        assert!(matches!(CrsResolver::resolve_epsg(999_999), Err(ReprojectError::UnknownEpsg(999_999))));
        assert!(matches!(CrsResolver::resolve_epsg(0), Err(ReprojectError::InvalidCrs(_))));
    }

    #[test]
    fn test_descriptor_forms() {
        assert_eq!(CrsResolver::parse_descriptor("EPSG:4326").unwrap(), 4326);
        assert_eq!(CrsResolver::parse_descriptor(" epsg:3857 ").unwrap(), 3857);
        assert_eq!(CrsResolver::parse_descriptor("32633").unwrap(), 32633);
        assert_eq!(CrsResolver::parse_descriptor("urn:ogc:def:crs:EPSG::4326").unwrap(), 4326);

        let wkt = r#"PROJCS["WGS 84 / UTM zone 33N",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","32633"]]"#;
        assert_eq!(CrsResolver::parse_descriptor(wkt).unwrap(), 32633);
    }

    #[test]
    fn test_malformed_descriptors() {
        for bad in ["", "EPSG:", "EPSG:abc", "+proj=longlat", "LOCAL_CS[\"nowhere\"]"] {
            assert!(matches!(CrsResolver::parse_descriptor(bad), Err(ReprojectError::InvalidCrs(_))), "{}", bad);
        }
    }

    #[test]
    fn test_equality_by_code() {
        let a = CrsResolver::resolve("EPSG:4326").unwrap();
        let b = CrsResolver::resolve_epsg(4326).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, CrsResolver::resolve_epsg(3857).unwrap());
    }
}
