//! Utility modules for common functionality
//!
//! Logging, progress display and the byte-level helpers shared by the
//! TIFF reader and writer.

pub mod logger;
pub mod progress;
pub(crate) mod write_utils;
pub(crate) mod string_utils;
pub(crate) mod tag_utils;
