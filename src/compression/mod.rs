//! Compression handling for TIFF strips and tiles
//!
//! Each scheme is a `CompressionHandler` strategy; the factory maps
//! Compression tag values (reading) and names (writing) to handlers.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod lzw;
mod packbits;
mod zstd;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::DeflateHandler;
pub use factory::CompressionFactory;
pub use lzw::LzwHandler;
pub use packbits::PackBitsHandler;
pub use zstd::ZstdHandler;
