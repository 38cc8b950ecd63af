//! Media decoding: `data:<mime>;base64,<payload>` → raw bytes.
//!
//! Browsers produce media as data-URIs (`canvas.toDataURL`,
//! `FileReader.readAsDataURL`). Only the part after the literal `;base64,`
//! marker is payload. A string without the marker is decoded whole on a
//! best-effort basis rather than rejected.
//!
//! Padding is optional and embedded ASCII whitespace (line-wrapped payloads)
//! is ignored; anything else that is not standard-alphabet base64 is an error
//! for that one item.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::debug;

/// Separator between the data-URI header and the payload.
pub const BASE64_MARKER: &str = ";base64,";

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Raw media bytes plus the media type announced by the data-URI header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMedia {
    /// e.g. `image/jpeg`; `None` when the string carried no header.
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Split an encoded media string into `(media_type, payload)`.
///
/// ```rust
/// use evidence_dossier::pipeline::decode::split_encoded;
///
/// assert_eq!(split_encoded("data:image/png;base64,QUJD"), (Some("image/png"), "QUJD"));
/// assert_eq!(split_encoded("QUJD"), (None, "QUJD"));
/// ```
pub fn split_encoded(encoded: &str) -> (Option<&str>, &str) {
    match encoded.split_once(BASE64_MARKER) {
        Some((header, payload)) => {
            let media_type = header.strip_prefix("data:").unwrap_or(header).trim();
            let media_type = (!media_type.is_empty()).then_some(media_type);
            (media_type, payload)
        }
        None => (None, encoded),
    }
}

/// Decode one encoded media string.
pub fn decode_media(encoded: &str) -> Result<DecodedMedia, base64::DecodeError> {
    let (media_type, payload) = split_encoded(encoded);

    let bytes = if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        LENIENT_STANDARD.decode(compact)?
    } else {
        LENIENT_STANDARD.decode(payload)?
    };

    debug!(
        "Decoded {} base64 chars → {} bytes ({})",
        payload.len(),
        bytes.len(),
        media_type.unwrap_or("untyped")
    );

    Ok(DecodedMedia {
        media_type: media_type.map(str::to_string),
        bytes,
    })
}

/// File extension for a decoded video, from its announced media type.
///
/// Browser `MediaRecorder` output is WebM unless it says otherwise.
pub fn video_extension(media_type: Option<&str>) -> &'static str {
    let essence = media_type
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("video/mp4") => "mp4",
        Some("video/quicktime") => "mov",
        Some("video/ogg") => "ogv",
        _ => "webm",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn decodes_data_uri() {
        let encoded = format!("data:image/jpeg;base64,{}", STANDARD.encode(b"\xff\xd8raw"));
        let media = decode_media(&encoded).expect("valid payload");
        assert_eq!(media.media_type.as_deref(), Some("image/jpeg"));
        assert_eq!(media.bytes, b"\xff\xd8raw");
    }

    #[test]
    fn missing_marker_decodes_whole_string() {
        let media = decode_media(&STANDARD.encode(b"hello")).expect("bare base64");
        assert_eq!(media.media_type, None);
        assert_eq!(media.bytes, b"hello");
    }

    #[test]
    fn tolerates_missing_padding_and_line_breaks() {
        let media = decode_media("data:text/plain;base64,aGVs\nbG8").expect("lenient");
        assert_eq!(media.bytes, b"hello");
    }

    #[test]
    fn rejects_non_alphabet_characters() {
        assert!(decode_media("data:video/webm;base64,@@@not-base64@@@").is_err());
    }

    #[test]
    fn codec_parameters_stay_in_media_type() {
        let (media_type, payload) = split_encoded("data:video/webm;codecs=vp8;base64,AAAA");
        assert_eq!(media_type, Some("video/webm;codecs=vp8"));
        assert_eq!(payload, "AAAA");
        assert_eq!(video_extension(media_type), "webm");
    }

    #[test]
    fn video_extensions() {
        assert_eq!(video_extension(Some("video/mp4")), "mp4");
        assert_eq!(video_extension(Some("VIDEO/QuickTime")), "mov");
        assert_eq!(video_extension(Some("application/octet-stream")), "webm");
        assert_eq!(video_extension(None), "webm");
    }
}
