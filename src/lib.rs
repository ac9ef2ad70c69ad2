pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod coordinate;
pub mod raster;
pub mod reproject;
pub mod config;
pub mod store;
pub mod bundle;
pub mod service;
pub mod commands;

pub use config::ReprojectConfig;
pub use raster::{GeoTiffIo, RasterIo, RasterSink, RasterSource};
pub use reproject::{OutputFormat, PipelineFailure, ReprojectError, ReprojectRequest, Reprojector};
pub use service::{ReprojectionService, ServiceError, UploadRequest, UploadResponse};
