//! Configuration types for evidence ingestion and dossier rendering.
//!
//! All pipeline behaviour is controlled through [`DossierConfig`], built via
//! its [`DossierConfigBuilder`]. The HTTP surface adds a small
//! [`ServerConfig`] on top. Keeping every knob in one struct makes it trivial
//! to share a config across request tasks behind an `Arc`.

use crate::error::DossierError;
use crate::progress::ProgressCallback;
use crate::report::GeoPoint;
use crate::store::validate_artifact_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default storage root, relative to the working directory.
pub const DEFAULT_STORAGE_ROOT: &str = "evidence_locker";

/// Default map link. `{lat}` and `{lon}` are substituted verbatim.
pub const DEFAULT_MAP_URL_TEMPLATE: &str = "https://www.google.com/maps?q={lat},{lon}";

/// Configuration for the ingestion pipeline and the dossier template.
///
/// Built via [`DossierConfig::builder()`] or using
/// [`DossierConfig::default()`].
///
/// # Example
/// ```rust
/// use evidence_dossier::{DossierConfig, PageSize};
///
/// let config = DossierConfig::builder()
///     .storage_root("/var/lib/dossier")
///     .page_size(PageSize::Letter)
///     .decode_concurrency(8)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct DossierConfig {
    /// Directory holding one sub-directory per case. Default: `evidence_locker`.
    pub storage_root: PathBuf,

    /// File name of the rendered document inside each case. Default: `dossier.pdf`.
    pub dossier_artifact: String,

    /// File name suggested to the client in `Content-Disposition`.
    /// Default: `evidence_dossier.pdf`.
    pub response_filename: String,

    /// First centered header line.
    pub title: String,

    /// Second centered header line.
    pub subtitle: String,

    /// Rotated, translucent stamp text drawn over the first page.
    pub stamp_text: String,

    /// Map link template; must contain `{lat}` and `{lon}`.
    pub map_url_template: String,

    /// Paper size. Default: [`PageSize::A4`].
    pub page_size: PageSize,

    /// Number of images decoded concurrently, on the blocking pool.
    /// Must be at least 1. Default: 4.
    ///
    /// Decoding order does not affect exhibit numbering; results are
    /// collected back in submission order.
    pub decode_concurrency: usize,

    /// Optional per-item event sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DossierConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            dossier_artifact: "dossier.pdf".to_string(),
            response_filename: "evidence_dossier.pdf".to_string(),
            title: "EVIDENCE DOSSIER".to_string(),
            subtitle: "Automated Capture Report".to_string(),
            stamp_text: "CONFIDENTIAL".to_string(),
            map_url_template: DEFAULT_MAP_URL_TEMPLATE.to_string(),
            page_size: PageSize::default(),
            decode_concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DossierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DossierConfig")
            .field("storage_root", &self.storage_root)
            .field("dossier_artifact", &self.dossier_artifact)
            .field("response_filename", &self.response_filename)
            .field("title", &self.title)
            .field("subtitle", &self.subtitle)
            .field("stamp_text", &self.stamp_text)
            .field("map_url_template", &self.map_url_template)
            .field("page_size", &self.page_size)
            .field("decode_concurrency", &self.decode_concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl DossierConfig {
    /// Create a new builder for `DossierConfig`.
    pub fn builder() -> DossierConfigBuilder {
        DossierConfigBuilder {
            config: Self::default(),
        }
    }

    /// Expand the map URL template for a location.
    pub fn map_url(&self, point: &GeoPoint) -> String {
        self.map_url_template
            .replace("{lat}", &point.lat.to_string())
            .replace("{lon}", &point.lon.to_string())
    }
}

/// Builder for [`DossierConfig`].
#[derive(Debug)]
pub struct DossierConfigBuilder {
    config: DossierConfig,
}

impl DossierConfigBuilder {
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.storage_root = root.into();
        self
    }

    pub fn dossier_artifact(mut self, name: impl Into<String>) -> Self {
        self.config.dossier_artifact = name.into();
        self
    }

    pub fn response_filename(mut self, name: impl Into<String>) -> Self {
        self.config.response_filename = name.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.config.subtitle = subtitle.into();
        self
    }

    pub fn stamp_text(mut self, text: impl Into<String>) -> Self {
        self.config.stamp_text = text.into();
        self
    }

    pub fn map_url_template(mut self, template: impl Into<String>) -> Self {
        self.config.map_url_template = template.into();
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn decode_concurrency(mut self, n: usize) -> Self {
        self.config.decode_concurrency = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DossierConfig, DossierError> {
        let c = &self.config;
        if c.storage_root.as_os_str().is_empty() {
            return Err(DossierError::InvalidConfig(
                "storage root must not be empty".into(),
            ));
        }
        validate_artifact_name(&c.dossier_artifact)
            .map_err(|e| DossierError::InvalidConfig(format!("dossier artifact: {e}")))?;
        if c.dossier_artifact.starts_with("evidence_") {
            return Err(DossierError::InvalidConfig(format!(
                "dossier artifact '{}' collides with the evidence_* namespace",
                c.dossier_artifact
            )));
        }
        if c.response_filename.is_empty() || c.response_filename.contains('"') {
            return Err(DossierError::InvalidConfig(
                "response filename must be non-empty and contain no quotes".into(),
            ));
        }
        if !c.map_url_template.contains("{lat}") || !c.map_url_template.contains("{lon}") {
            return Err(DossierError::InvalidConfig(format!(
                "map URL template must contain {{lat}} and {{lon}}, got '{}'",
                c.map_url_template
            )));
        }
        if c.decode_concurrency == 0 {
            return Err(DossierError::InvalidConfig(
                "Decode concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// HTTP listener settings for [`crate::server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address. Default: `0.0.0.0:3000`.
    pub bind_addr: SocketAddr,

    /// Maximum accepted request body in bytes. Default: 50 MiB.
    ///
    /// Reports carry base64 media inline, so the limit must cover every image
    /// plus the video after ~33 % base64 inflation.
    pub max_body_bytes: usize,

    /// Attach a permissive CORS layer. Default: true.
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_bytes: 50 * 1024 * 1024,
            permissive_cors: true,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Paper size of the generated dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// 595 × 842 pt (default).
    #[default]
    A4,
    /// 612 × 792 pt.
    Letter,
}

impl PageSize {
    /// Width and height in PDF points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}
