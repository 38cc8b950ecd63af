//! Dossier layout: decide *what* goes on the pages, in which order.
//!
//! [`plan`] turns a [`DossierInput`] into an ordered list of
//! [`DossierBlock`]s. It makes every content decision (which of the location
//! / tracking-denied blocks appears, whether the video notice appears, exhibit
//! order and numbering) while knowing nothing about PDF. The writer in
//! [`super::render`] then draws the blocks one after another.

use crate::config::DossierConfig;
use crate::report::ReportMeta;
use chrono::{DateTime, Utc};

pub const EXHIBIT_HEADER_TEXT: &str = "PHOTOGRAPHIC EVIDENCE";
pub const TRACKING_DENIED_TEXT: &str = "LOCATION: TRACKING DENIED BY SUBJECT";
pub const VIDEO_NOTICE_TEXT: &str = "VIDEO EVIDENCE SUBMITTED - ARCHIVED WITH THIS CASE";
pub const UNKNOWN_PLATFORM: &str = "UNKNOWN";

/// Caption drawn under an exhibit.
pub fn exhibit_caption(number: usize) -> String {
    format!("EXHIBIT #{number} // SUSPECT CAPTURED")
}

/// Everything the renderer needs to know about one case.
#[derive(Debug, Clone)]
pub struct DossierInput {
    pub case_id: String,
    pub submitted_at: DateTime<Utc>,
    pub client_addr: String,
    pub meta: Option<ReportMeta>,
    /// The report carried a `video` field (decodable or not).
    pub video_present: bool,
    /// Successfully decoded images; `number` is the 1-based submission
    /// position.
    pub exhibits: Vec<ExhibitSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhibitSource {
    pub number: usize,
    pub bytes: Vec<u8>,
}

/// One labelled row of the detail block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLine {
    pub label: &'static str,
    pub value: String,
}

/// A layout unit, drawn top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum DossierBlock<'a> {
    /// Two centered lines and a rule.
    Title { title: &'a str, subtitle: &'a str },
    /// Rotated translucent overlay.
    Stamp { text: &'a str },
    Details { lines: Vec<DetailLine> },
    /// Plain coordinates plus a clickable map link.
    Location { coordinates: String, map_url: String },
    TrackingDenied,
    VideoNotice,
    ExhibitHeader,
    Exhibit { number: usize, bytes: &'a [u8] },
}

/// Lay out a dossier.
pub fn plan<'a>(input: &'a DossierInput, config: &'a DossierConfig) -> Vec<DossierBlock<'a>> {
    let mut blocks = Vec::with_capacity(6 + input.exhibits.len());

    blocks.push(DossierBlock::Title {
        title: &config.title,
        subtitle: &config.subtitle,
    });
    blocks.push(DossierBlock::Stamp {
        text: &config.stamp_text,
    });

    let platform = input
        .meta
        .as_ref()
        .map(|m| m.user_agent.trim())
        .filter(|ua| !ua.is_empty())
        .unwrap_or(UNKNOWN_PLATFORM);
    blocks.push(DossierBlock::Details {
        lines: vec![
            DetailLine {
                label: "CASE ID",
                value: input.case_id.clone(),
            },
            DetailLine {
                label: "TIMESTAMP",
                value: format_timestamp(&input.submitted_at),
            },
            DetailLine {
                label: "IP ADDRESS",
                value: input.client_addr.clone(),
            },
            DetailLine {
                label: "PLATFORM",
                value: platform.to_string(),
            },
        ],
    });

    match input.meta.as_ref().and_then(|m| m.location) {
        Some(point) => blocks.push(DossierBlock::Location {
            coordinates: format!("LAT {:.6}, LON {:.6}", point.lat, point.lon),
            map_url: config.map_url(&point),
        }),
        None => blocks.push(DossierBlock::TrackingDenied),
    }

    if input.video_present {
        blocks.push(DossierBlock::VideoNotice);
    }

    let mut exhibits: Vec<&ExhibitSource> = input.exhibits.iter().collect();
    exhibits.sort_by_key(|e| e.number);

    blocks.push(DossierBlock::ExhibitHeader);
    blocks.extend(exhibits.into_iter().map(|e| DossierBlock::Exhibit {
        number: e.number,
        bytes: &e.bytes,
    }));

    blocks
}

/// Human-readable submission time.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}
