//! Case-scoped artifact storage.
//!
//! Every report gets its own directory under the storage root:
//!
//! ```text
//! <storage_root>/
//! └── CASE_<millis>/
//!     ├── evidence_video.webm   # only when the video decoded
//!     ├── evidence_1.jpg        # one per decoded image, 1-based position
//!     ├── evidence_3.jpg
//!     └── dossier.pdf           # the rendered document
//! ```
//!
//! # Identifiers
//!
//! A case id is `CASE_<millis since the Unix epoch>`. Two reports arriving in
//! the same millisecond would share a directory, so [`CaseStore::allocate`]
//! hands out strictly increasing millisecond values within a process: a
//! collision bumps the id to the next free millisecond. The scheme stays
//! human-readable and sortable.
//!
//! # Retrieval safety
//!
//! [`CaseStore::read`] takes both segments from an untrusted URL. Each must
//! be a single plain path component, the case id must match the `CASE_<n>`
//! shape, and the resolved (canonicalised) path must still lie under the
//! storage root, so neither `..` nor a symlink planted in a case directory
//! can reach outside it.

use crate::error::DossierError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};

/// Prefix of every case directory name.
pub const CASE_PREFIX: &str = "CASE_";

static CASE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^CASE_[0-9]{1,20}$").unwrap());

/// Storage root plus the in-process case id allocator.
#[derive(Debug)]
pub struct CaseStore {
    /// Canonicalised storage root.
    root: PathBuf,
    /// Last millisecond value handed out by [`CaseStore::allocate`].
    last_millis: AtomicI64,
}

/// An allocated case: its identifier and directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseHandle {
    id: String,
    dir: PathBuf,
}

impl CaseHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// One file inside a case directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub size_bytes: u64,
}

impl CaseStore {
    /// Open (creating if needed) the storage root.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, DossierError> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| DossierError::StorageUnavailable {
                path: root.to_path_buf(),
                source: e,
            })?;
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| DossierError::StorageUnavailable {
                path: root.to_path_buf(),
                source: e,
            })?;

        info!("Case store opened at {}", root.display());
        Ok(Self {
            root,
            last_millis: AtomicI64::new(0),
        })
    }

    /// The canonicalised storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a case for a submission made at `reference` and create its
    /// directory. An already existing directory is reused.
    pub async fn allocate(&self, reference: DateTime<Utc>) -> Result<CaseHandle, DossierError> {
        let millis = self.next_millis(reference.timestamp_millis());
        let id = format!("{CASE_PREFIX}{millis}");
        let dir = self.root.join(&id);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DossierError::CaseAllocationFailed {
                path: dir.clone(),
                source: e,
            })?;

        debug!("Allocated {} at {}", id, dir.display());
        Ok(CaseHandle { id, dir })
    }

    /// Write `bytes` as `artifact` inside the case, replacing any previous
    /// content.
    ///
    /// Written to a sibling temp file first and renamed into place, so a
    /// concurrent reader never sees a half-written artifact.
    pub async fn persist(
        &self,
        case: &CaseHandle,
        artifact: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, DossierError> {
        validate_artifact_name(artifact)?;
        let path = case.dir.join(artifact);
        let tmp_path = case.dir.join(format!(".{artifact}.tmp"));

        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| DossierError::ArtifactWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| DossierError::ArtifactWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Persisted {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Read an artifact by client-supplied case id and file name.
    pub async fn read(&self, case_id: &str, artifact: &str) -> Result<Vec<u8>, DossierError> {
        validate_case_id(case_id)?;
        validate_artifact_name(artifact)?;

        let not_found = || DossierError::ArtifactNotFound {
            case_id: case_id.to_string(),
            artifact: artifact.to_string(),
        };

        let candidate = self.root.join(case_id).join(artifact);
        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                return Err(DossierError::ArtifactReadFailed {
                    path: candidate,
                    source: e,
                })
            }
        };

        if !resolved.starts_with(self.root.join(case_id)) {
            return Err(DossierError::InvalidPathSegment {
                segment: artifact.to_string(),
                reason: "resolves outside the case directory",
            });
        }

        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(not_found()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                return Err(DossierError::ArtifactReadFailed {
                    path: resolved,
                    source: e,
                })
            }
        }

        tokio::fs::read(&resolved)
            .await
            .map_err(|e| DossierError::ArtifactReadFailed {
                path: resolved,
                source: e,
            })
    }

    /// List the artifacts of a case, sorted by name. Temp files are hidden.
    pub async fn list(&self, case_id: &str) -> Result<Vec<ArtifactEntry>, DossierError> {
        validate_case_id(case_id)?;
        let dir = self.root.join(case_id);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DossierError::CaseNotFound {
                    case_id: case_id.to_string(),
                })
            }
            Err(e) => {
                return Err(DossierError::ArtifactReadFailed { path: dir, source: e })
            }
        };

        let mut artifacts = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(DossierError::ArtifactReadFailed {
                        path: dir.clone(),
                        source: e,
                    })
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let meta = entry
                .metadata()
                .await
                .map_err(|e| DossierError::ArtifactReadFailed {
                    path: entry.path(),
                    source: e,
                })?;
            if meta.is_file() {
                artifacts.push(ArtifactEntry {
                    name,
                    size_bytes: meta.len(),
                });
            }
        }

        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artifacts)
    }

    /// Next strictly increasing millisecond value ≥ `reference`.
    fn next_millis(&self, reference: i64) -> i64 {
        let mut current = self.last_millis.load(Ordering::Acquire);
        loop {
            let candidate = reference.max(current.saturating_add(1));
            match self.last_millis.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Check that `case_id` has the `CASE_<digits>` shape.
pub fn validate_case_id(case_id: &str) -> Result<(), DossierError> {
    validate_segment(case_id)?;
    if !CASE_ID_RE.is_match(case_id) {
        return Err(DossierError::InvalidPathSegment {
            segment: case_id.to_string(),
            reason: "not a case identifier",
        });
    }
    Ok(())
}

/// Check that `name` is a plain file name: one normal path component, not
/// hidden, no separators.
pub fn validate_artifact_name(name: &str) -> Result<(), DossierError> {
    validate_segment(name)?;
    if name.starts_with('.') {
        return Err(DossierError::InvalidPathSegment {
            segment: name.to_string(),
            reason: "hidden file names are not served",
        });
    }
    Ok(())
}

fn validate_segment(segment: &str) -> Result<(), DossierError> {
    let invalid = |reason| DossierError::InvalidPathSegment {
        segment: segment.to_string(),
        reason,
    };

    if segment.is_empty() {
        return Err(invalid("empty segment"));
    }
    if segment.contains("..") {
        return Err(invalid("parent directory reference"));
    }
    if segment.contains(['/', '\\', '\0', ':']) {
        return Err(invalid("separator or reserved character"));
    }

    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("not a single relative component")),
    }
}
