//! Report ingestion: the orchestrator that turns one [`Report`] into a case.
//!
//! ## Sequence
//!
//! ```text
//! allocate case ─▶ video ─▶ images ─▶ render ─▶ persist dossier
//! ```
//!
//! Video and image payloads are decoded and persisted item by item. A bad
//! payload becomes an [`ItemError`] and the item is dropped; only storage
//! and serialisation failures abort the request.
//!
//! Base64 decoding runs on the blocking pool. Images are decoded with bounded
//! concurrency, but results are collected in submission order (`buffered`,
//! not `buffer_unordered`), so exhibit `n` is always the `n`-th submitted
//! image no matter which decode finished first.

use crate::config::DossierConfig;
use crate::error::{DossierError, ItemError};
use crate::output::{IngestOutput, IngestStats};
use crate::pipeline::decode::{decode_media, video_extension};
use crate::pipeline::layout::{DossierInput, ExhibitSource};
use crate::pipeline::render;
use crate::report::{Report, SubmissionContext};
use crate::store::{CaseHandle, CaseStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Ingest one report: persist its media, render and persist the dossier.
///
/// # Returns
/// `Ok(IngestOutput)` whenever the dossier was sealed and stored, even if
/// individual items were dropped (see `output.item_errors`).
///
/// # Errors
/// Returns `Err(DossierError)` only for fatal errors:
/// - the case directory could not be created
/// - an artifact could not be written
/// - the document could not be serialised
pub async fn ingest(
    report: Report,
    context: SubmissionContext,
    store: &CaseStore,
    config: &DossierConfig,
) -> Result<IngestOutput, DossierError> {
    let case = store.allocate(context.submitted_at).await?;
    let span = info_span!("case", case_id = %case.id());

    run(report, context, store, &case, config)
        .instrument(span)
        .await
}

/// Ingest a report and additionally write the dossier to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn ingest_to_file(
    report: Report,
    context: SubmissionContext,
    store: &CaseStore,
    config: &DossierConfig,
    output_path: impl AsRef<Path>,
) -> Result<IngestOutput, DossierError> {
    let output = ingest(report, context, store, config).await?;
    let path = output_path.as_ref();

    let write_failed = |e| DossierError::ArtifactWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.dossier)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;

    Ok(output)
}

async fn run(
    report: Report,
    context: SubmissionContext,
    store: &CaseStore,
    case: &CaseHandle,
    config: &DossierConfig,
) -> Result<IngestOutput, DossierError> {
    let total_start = Instant::now();
    let case_id = case.id().to_string();
    info!(
        "Ingesting report from {}: {} images, video {}",
        context.client_addr,
        report.images.len(),
        if report.has_video() { "present" } else { "absent" }
    );
    let video_present = report.has_video();
    let Report {
        images,
        video,
        meta,
    } = report;

    if let Some(ref cb) = config.progress_callback {
        cb.on_case_allocated(&case_id);
    }

    let mut artifacts = Vec::new();
    let mut item_errors = Vec::new();
    let images_submitted = images.len();

    // ── Step 1: Video ────────────────────────────────────────────────────
    let decode_start = Instant::now();
    let mut video_saved = false;
    if let Some(encoded) = video {
        match decode_off_runtime(move || decode_video(&encoded)).await? {
            Ok((artifact, bytes)) => {
                store.persist(case, &artifact, &bytes).await?;
                notify_saved(config, &case_id, &artifact, bytes.len());
                artifacts.push(artifact);
                video_saved = true;
            }
            Err(e) => {
                warn!("{}", e);
                notify_skipped(config, &case_id, &e);
                item_errors.push(e);
            }
        }
    }

    // ── Step 2: Images, in submission order ──────────────────────────────
    let pending: Vec<_> = images
        .into_iter()
        .enumerate()
        .map(|(idx, encoded)| archive_image(store, case, idx + 1, encoded))
        .collect();
    let outcomes: Vec<Result<ExhibitSource, ItemError>> = stream::iter(pending)
        .buffered(config.decode_concurrency)
        .try_collect()
        .await?;

    let mut exhibits = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(exhibit) => {
                let artifact = image_artifact(exhibit.number);
                notify_saved(config, &case_id, &artifact, exhibit.bytes.len());
                artifacts.push(artifact);
                exhibits.push(exhibit);
            }
            Err(e) => {
                warn!("{}", e);
                notify_skipped(config, &case_id, &e);
                item_errors.push(e);
            }
        }
    }
    let images_decoded = exhibits.len();
    let decode_duration_ms = decode_start.elapsed().as_millis() as u64;
    debug!(
        "Decoded {}/{} images in {}ms",
        images_decoded, images_submitted, decode_duration_ms
    );

    // ── Step 3: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let input = DossierInput {
        case_id: case_id.clone(),
        submitted_at: context.submitted_at,
        client_addr: context.client_addr,
        meta,
        video_present,
        exhibits,
    };
    let rendered = render::render_dossier(input, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    item_errors.extend(rendered.skipped);

    // ── Step 4: Persist the dossier ──────────────────────────────────────
    store
        .persist(case, &config.dossier_artifact, &rendered.bytes)
        .await?;
    notify_saved(
        config,
        &case_id,
        &config.dossier_artifact,
        rendered.bytes.len(),
    );
    artifacts.push(config.dossier_artifact.clone());

    if let Some(ref cb) = config.progress_callback {
        cb.on_dossier_sealed(&case_id, rendered.exhibits.len(), rendered.bytes.len());
    }

    let stats = IngestStats {
        images_submitted,
        images_decoded,
        exhibits_rendered: rendered.exhibits.len(),
        video_saved,
        page_count: rendered.page_count,
        dossier_bytes: rendered.bytes.len(),
        decode_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Case sealed: {}/{} exhibits, {} item errors, {}ms total",
        stats.exhibits_rendered,
        images_submitted,
        item_errors.len(),
        stats.total_duration_ms
    );

    Ok(IngestOutput {
        case_id,
        dossier: rendered.bytes,
        artifacts,
        item_errors,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn image_artifact(position: usize) -> String {
    format!("evidence_{position}.jpg")
}

/// Decode one image and, if it decoded, persist it.
///
/// The outer `Result` is fatal (storage), the inner one is per item.
async fn archive_image(
    store: &CaseStore,
    case: &CaseHandle,
    position: usize,
    encoded: String,
) -> Result<Result<ExhibitSource, ItemError>, DossierError> {
    let bytes = match decode_off_runtime(move || decode_image(position, &encoded)).await? {
        Ok(bytes) => bytes,
        Err(e) => return Ok(Err(e)),
    };
    store.persist(case, &image_artifact(position), &bytes).await?;
    Ok(Ok(ExhibitSource {
        number: position,
        bytes,
    }))
}

/// Run a base64 decode on the blocking pool.
async fn decode_off_runtime<T, F>(decode: F) -> Result<T, DossierError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(decode)
        .await
        .map_err(|e| DossierError::Internal(format!("Decode task panicked: {}", e)))
}

fn decode_image(position: usize, encoded: &str) -> Result<Vec<u8>, ItemError> {
    let media = decode_media(encoded).map_err(|e| ItemError::ImageDecode {
        position,
        detail: e.to_string(),
    })?;
    if media.bytes.is_empty() {
        return Err(ItemError::ImageEmpty { position });
    }
    Ok(media.bytes)
}

/// Decode the video and choose its artifact name.
fn decode_video(encoded: &str) -> Result<(String, Vec<u8>), ItemError> {
    let media = decode_media(encoded).map_err(|e| ItemError::VideoDecode {
        detail: e.to_string(),
    })?;
    if media.bytes.is_empty() {
        return Err(ItemError::VideoDecode {
            detail: "payload is empty".to_string(),
        });
    }
    let artifact = format!(
        "evidence_video.{}",
        video_extension(media.media_type.as_deref())
    );
    Ok((artifact, media.bytes))
}

fn notify_saved(config: &DossierConfig, case_id: &str, artifact: &str, bytes: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_artifact_saved(case_id, artifact, bytes);
    }
}

fn notify_skipped(config: &DossierConfig, case_id: &str, error: &ItemError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_item_skipped(case_id, error);
    }
}
