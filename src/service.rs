//! Upload-and-download front of the reprojection pipeline
//!
//! `ReprojectionService` validates a raw upload, stages it, runs the
//! `Reprojector`, and bundles whatever it produced into a ZIP archive that
//! is later fetched by name through `retrieve`.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{debug, info, warn};

use crate::bundle;
use crate::config::ReprojectConfig;
use crate::raster::{GeoTiffIo, RasterIo};
use crate::reproject::{
    CancellationToken, NoProgress, OutputFormat, PipelineFailure, ProgressListener, ReprojectError,
    ReprojectRequest, ReprojectionOutcome, Reprojector,
};
use crate::store::ArtifactStore;
use crate::utils::string_utils::sanitize_file_name;

/// URL prefix archives are served under
pub const DOWNLOAD_ROUTE: &str = "/download";

/// One upload with its form parameters, as received
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_name: String,
    pub contents: Vec<u8>,
    pub epsg_code: Option<String>,
    pub output_type: Option<String>,
}

/// What a successful submission hands back to the client
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub archive_name: String,
    pub archive_path: PathBuf,
    /// Retrieval URL, `/download/<archive_name>`
    pub file_url: String,
    pub outcome: ReprojectionOutcome,
}

#[derive(Debug)]
pub enum ServiceError {
    MissingParameter(&'static str),
    InvalidParameter(String),
    UnsupportedFormat(String),
    NotFound(String),
    /// Another request is producing the same artifacts
    Busy(PathBuf),
    Pipeline(PipelineFailure),
    Io(io::Error),
}

impl ServiceError {
    /// Whether the request itself was at fault rather than the processing
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::MissingParameter(_)
            | ServiceError::InvalidParameter(_)
            | ServiceError::UnsupportedFormat(_)
            | ServiceError::NotFound(_)
            | ServiceError::Busy(_) => true,
            ServiceError::Pipeline(failure) => matches!(
                failure.kind(),
                ReprojectError::InputTooLarge { .. }
                    | ReprojectError::UnknownEpsg(_)
                    | ReprojectError::UnsupportedFormat(_)
            ),
            ServiceError::Io(_) => false,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::MissingParameter(name) => write!(f, "Missing parameter: {}", name),
            ServiceError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ServiceError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            ServiceError::NotFound(id) => write!(f, "No such archive: {}", id),
            ServiceError::Busy(path) => write!(f, "{} is already being produced", path.display()),
            ServiceError::Pipeline(failure) => write!(f, "{}", failure),
            ServiceError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Pipeline(failure) => Some(failure),
            ServiceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ServiceError {
    fn from(error: io::Error) -> Self {
        ServiceError::Io(error)
    }
}

impl From<PipelineFailure> for ServiceError {
    fn from(failure: PipelineFailure) -> Self {
        ServiceError::Pipeline(failure)
    }
}

/// Paths held by a running request, released on drop
struct InFlight<'a> {
    registry: &'a Mutex<HashSet<PathBuf>>,
    paths: Vec<PathBuf>,
}

impl<'a> InFlight<'a> {
    fn claim(registry: &'a Mutex<HashSet<PathBuf>>, paths: Vec<PathBuf>) -> Result<Self, ServiceError> {
        let mut held = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(busy) = paths.iter().find(|p| held.contains(*p)) {
            return Err(ServiceError::Busy(busy.clone()));
        }
        held.extend(paths.iter().cloned());
        Ok(InFlight { registry, paths })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut held = self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for path in &self.paths {
            held.remove(path);
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ServiceError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ServiceError::MissingParameter(name)),
    }
}

fn parse_epsg(value: &str) -> Result<u32, ServiceError> {
    let code = value.strip_prefix("EPSG:").unwrap_or(value);
    match code.parse::<u32>() {
        Ok(code) if code > 0 => Ok(code),
        _ => Err(ServiceError::InvalidParameter(format!("EPSG code must be a positive integer, got '{}'", value))),
    }
}

/// Accepts uploads, runs them through the pipeline and serves the archives
pub struct ReprojectionService<I: RasterIo = GeoTiffIo> {
    reprojector: Reprojector<I>,
    store: ArtifactStore,
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl ReprojectionService<GeoTiffIo> {
    pub fn with_config(config: ReprojectConfig) -> Self {
        let store = ArtifactStore::from_config(&config);
        Self::new(Reprojector::with_config(config), store)
    }
}

impl<I: RasterIo> ReprojectionService<I> {
    pub fn new(reprojector: Reprojector<I>, store: ArtifactStore) -> Self {
        ReprojectionService { reprojector, store, in_flight: Mutex::new(HashSet::new()) }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn reprojector(&self) -> &Reprojector<I> {
        &self.reprojector
    }

    pub fn submit(&self, request: &UploadRequest) -> Result<UploadResponse, ServiceError> {
        self.submit_with(request, &NoProgress, &CancellationToken::new())
    }

    pub fn submit_with(
        &self,
        request: &UploadRequest,
        progress: &dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> Result<UploadResponse, ServiceError> {
        if request.file_name.trim().is_empty() {
            return Err(ServiceError::MissingParameter("file"));
        }
        let epsg_code = parse_epsg(required(&request.epsg_code, "epsg_code")?)?;
        let format: OutputFormat = required(&request.output_type, "output_type")?
            .parse()
            .map_err(|e: ReprojectError| ServiceError::UnsupportedFormat(e.to_string()))?;

        let file_name = sanitize_file_name(&request.file_name);
        let base = ArtifactStore::base_name(&file_name).to_string();
        if base.is_empty() {
            return Err(ServiceError::InvalidParameter(format!("Unusable file name '{}'", request.file_name)));
        }

        let primary = self.store.primary_path(&base, format);
        let archive_path = self.store.archive_path(epsg_code, &base);
        let _guard = InFlight::claim(&self.in_flight, self.claimed_paths(&file_name, &base, format, epsg_code))?;

        self.store.ensure_dirs()?;
        let input = self.store.stage_upload(&file_name, &request.contents)?;
        info!("Accepted {} ({} bytes) for EPSG:{} as {}", file_name, request.contents.len(), epsg_code, format);

        let reprojection = ReprojectRequest::new(input, epsg_code, format, primary);
        let outcome = match self.reprojector.run_with(&reprojection, progress, cancel) {
            Ok(outcome) => outcome,
            Err(failure) => {
                self.store.discard(&base, format, epsg_code);
                return Err(failure.into());
            },
        };

        if let Err(e) = bundle::write_archive(&archive_path, &outcome.artifacts()) {
            warn!("Bundling {} failed: {}", archive_path.display(), e);
            self.store.discard(&base, format, epsg_code);
            return Err(e.into());
        }

        let archive_name = ArtifactStore::archive_name(epsg_code, &base);
        debug!("Archive {} holds {:?}", archive_name, outcome.artifacts());
        Ok(UploadResponse {
            file_url: format!("{}/{}", DOWNLOAD_ROUTE, archive_name),
            archive_name,
            archive_path,
            outcome,
        })
    }

    /// Every path a request writes or may discard on failure
    fn claimed_paths(&self, file_name: &str, base: &str, format: OutputFormat, epsg_code: u32) -> Vec<PathBuf> {
        vec![
            self.store.upload_dir().join(file_name),
            self.store.primary_path(base, format),
            self.store.world_file_path(base, format),
            self.store.archive_path(epsg_code, base),
        ]
    }

    /// Location of a previously produced archive
    pub fn retrieve(&self, archive_id: &str) -> Result<PathBuf, ServiceError> {
        if !ArtifactStore::is_valid_artifact_id(archive_id) {
            return Err(ServiceError::InvalidParameter(format!("Illegal archive name '{}'", archive_id)));
        }
        self.store.locate(archive_id).ok_or_else(|| ServiceError::NotFound(archive_id.to_string()))
    }

    pub fn read_archive(&self, archive_id: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self.retrieve(archive_id)?;
        Ok(fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(dir: &std::path::Path) -> ReprojectionService {
        let config = ReprojectConfig {
            upload_dir: dir.join("uploads"),
            output_dir: dir.join("processed"),
            ..ReprojectConfig::default()
        };
        ReprojectionService::with_config(config)
    }

    fn upload(epsg: Option<&str>, output: Option<&str>) -> UploadRequest {
        UploadRequest {
            file_name: "scene.tif".to_string(),
            contents: b"II*\0".to_vec(),
            epsg_code: epsg.map(str::to_string),
            output_type: output.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let err = service.submit(&upload(None, Some("png"))).unwrap_err();
        assert!(matches!(err, ServiceError::MissingParameter("epsg_code")));
        assert!(err.is_client_error());

        let err = service.submit(&upload(Some("3857"), Some("  "))).unwrap_err();
        assert!(matches!(err, ServiceError::MissingParameter("output_type")));

        // Nothing is staged for rejected requests
        assert!(!dir.path().join("uploads/scene.tif").exists());
    }

    #[test]
    fn test_invalid_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        assert!(matches!(service.submit(&upload(Some("-5"), Some("png"))).unwrap_err(),
                         ServiceError::InvalidParameter(_)));
        assert!(matches!(service.submit(&upload(Some("abc"), Some("png"))).unwrap_err(),
                         ServiceError::InvalidParameter(_)));
        assert!(matches!(service.submit(&upload(Some("3857"), Some("bmp"))).unwrap_err(),
                         ServiceError::UnsupportedFormat(_)));
        assert_eq!(parse_epsg("EPSG:4326").unwrap(), 4326);
    }

    #[test]
    fn test_corrupt_upload_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let err = service.submit(&upload(Some("3857"), Some("png"))).unwrap_err();
        assert!(matches!(err, ServiceError::Pipeline(_)));
        assert!(!err.is_client_error());
        assert!(!dir.path().join("processed/EPSG_3857_scene_processed.zip").exists());
        assert!(!dir.path().join("processed/scene_processed.png").exists());
    }

    #[test]
    fn test_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        fs::create_dir_all(dir.path().join("processed")).unwrap();
        fs::write(dir.path().join("processed/EPSG_3857_a_processed.zip"), b"PK").unwrap();

        assert_eq!(service.read_archive("EPSG_3857_a_processed.zip").unwrap(), b"PK");
        assert!(matches!(service.retrieve("missing.zip").unwrap_err(), ServiceError::NotFound(_)));
        assert!(matches!(service.retrieve("../secret").unwrap_err(), ServiceError::InvalidParameter(_)));
    }

    #[test]
    fn test_shared_world_file_blocks_second_request() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let png: OutputFormat = "png".parse().unwrap();
        let jpg: OutputFormat = "jpg".parse().unwrap();

        // scene.tif as png and scene.tiff as jpg both write scene_processed.jgw
        let first = service.claimed_paths("scene.tif", "scene", png, 3857);
        let second = service.claimed_paths("scene.tiff", "scene", jpg, 4326);
        assert!(second.contains(&dir.path().join("processed/scene_processed.jgw")));

        let held = InFlight::claim(&service.in_flight, first).unwrap();
        assert!(matches!(InFlight::claim(&service.in_flight, second.clone()), Err(ServiceError::Busy(_))));
        drop(held);
        assert!(InFlight::claim(&service.in_flight, second).is_ok());
    }

    #[test]
    fn test_in_flight_guard() {
        let registry = Mutex::new(HashSet::new());
        let path = PathBuf::from("processed/a_processed.png");

        let first = InFlight::claim(&registry, vec![path.clone()]).unwrap();
        assert!(matches!(InFlight::claim(&registry, vec![path.clone()]), Err(ServiceError::Busy(_))));
        drop(first);
        assert!(InFlight::claim(&registry, vec![path]).is_ok());
    }
}
