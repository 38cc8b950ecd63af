//! # evidence-dossier
//!
//! Ingest captured evidence bundles (still images, an optional video clip and
//! client metadata), archive the raw media per case and render a PDF dossier
//! that presents the metadata and embeds every image as a numbered exhibit.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Report (JSON)
//!  │
//!  ├─ 1. Case     allocate CASE_<millis> + its directory
//!  ├─ 2. Decode   data-URI → bytes, per image and for the video
//!  ├─ 3. Archive  evidence_video.<ext>, evidence_<n>.jpg
//!  ├─ 4. Layout   title, stamp, details, location/denial, video notice, exhibits
//!  ├─ 5. Render   lopdf object graph (CPU-bound, spawn_blocking)
//!  └─ 6. Seal     persist dossier.pdf, return the bytes
//! ```
//!
//! A malformed image or video is dropped with an [`ItemError`]; the rest of
//! the report is still processed. Only storage or serialisation failures
//! abort a request ([`DossierError`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evidence_dossier::{ingest, CaseStore, DossierConfig, Report, SubmissionContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DossierConfig::default();
//!     let store = CaseStore::open(&config.storage_root).await?;
//!
//!     let report: Report = serde_json::from_str(r#"{"images": []}"#)?;
//!     let output = ingest(report, SubmissionContext::now("127.0.0.1"), &store, &config).await?;
//!     eprintln!("{}: {} bytes, {} pages",
//!         output.case_id,
//!         output.dossier.len(),
//!         output.stats.page_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `dossierd` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library or the router in another service:
//! ```toml
//! evidence-dossier = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DossierConfig, DossierConfigBuilder, PageSize, ServerConfig};
pub use error::{DossierError, ItemError};
pub use ingest::{ingest, ingest_to_file};
pub use output::{IngestOutput, IngestStats};
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{GeoPoint, Report, ReportMeta, SubmissionContext};
pub use server::{router, serve, AppState};
pub use store::{ArtifactEntry, CaseHandle, CaseStore};
