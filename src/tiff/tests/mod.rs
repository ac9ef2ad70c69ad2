//! Container-level tests for reading and writing TIFF files

pub(crate) mod test_utils;
mod byte_order_tests;
mod types_tests;
mod reader_tests;
mod writer_tests;
