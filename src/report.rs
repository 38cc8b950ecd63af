//! Inbound report payload and the per-request submission context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingestion request: encoded images, an optional encoded video and
/// optional client metadata. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Encoded images (`data:<mime>;base64,<payload>`), in submission order.
    #[serde(default)]
    pub images: Vec<String>,

    /// Encoded video clip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ReportMeta>,
}

impl Report {
    /// Whether the `video` field was supplied at all, regardless of whether
    /// its payload turns out to be decodable.
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }
}

/// Client-side context captured alongside the media.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    #[serde(default)]
    pub user_agent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// WGS84 coordinates reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Transport-level facts about a submission, captured before the case is
/// allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    pub submitted_at: DateTime<Utc>,
    /// Forwarded-for address if the request carried one, else the peer
    /// address.
    pub client_addr: String,
}

impl SubmissionContext {
    pub fn new(submitted_at: DateTime<Utc>, client_addr: impl Into<String>) -> Self {
        Self {
            submitted_at,
            client_addr: client_addr.into(),
        }
    }

    /// Context stamped with the current time.
    pub fn now(client_addr: impl Into<String>) -> Self {
        Self::new(Utc::now(), client_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_a_valid_report() {
        let report: Report = serde_json::from_str("{}").unwrap();
        assert!(report.images.is_empty());
        assert!(!report.has_video());
        assert!(report.meta.is_none());
    }

    #[test]
    fn camel_case_meta_fields() {
        let report: Report = serde_json::from_str(
            r#"{
                "images": ["data:image/jpeg;base64,AAAA"],
                "video": "data:video/webm;base64,AAAA",
                "meta": {"userAgent": "Mozilla/5.0", "location": {"lat": 1.0, "lon": 2.0}}
            }"#,
        )
        .unwrap();
        assert_eq!(report.images.len(), 1);
        assert!(report.has_video());
        let meta = report.meta.unwrap();
        assert_eq!(meta.user_agent, "Mozilla/5.0");
        assert_eq!(meta.location, Some(GeoPoint { lat: 1.0, lon: 2.0 }));
    }

    #[test]
    fn null_video_counts_as_absent() {
        let report: Report = serde_json::from_str(r#"{"video": null}"#).unwrap();
        assert!(!report.has_video());
    }
}
