//! Dossier rendering: layout blocks → a sealed PDF byte stream via lopdf.
//!
//! ## Why spawn_blocking?
//!
//! Exhibit preparation fully decodes every image and may re-encode it as
//! JPEG. That is CPU-bound work that would stall a Tokio worker thread, so
//! [`render_dossier`] moves the whole pass onto the blocking pool and awaits
//! the finished bytes.
//!
//! ## Sealing
//!
//! [`DossierWriter::finish`] consumes the writer: once the byte stream exists
//! there is no handle left to append content through, and nothing can read
//! the bytes before the trailer has been written.
//!
//! ## Graphics state
//!
//! Every block that changes stroke/fill colour, line width, opacity or the
//! transformation matrix wraps its operators in `q … Q`, so no block leaks
//! state into the next. The stamp relies on this for its rotation and its
//! 25 % opacity `ExtGState`.

use crate::config::{DossierConfig, PageSize};
use crate::error::{DossierError, ItemError};
use crate::pipeline::exhibit::{fit_within, prepare_exhibit, ExhibitImage};
use crate::pipeline::layout::{
    exhibit_caption, plan, DetailLine, DossierBlock, DossierInput, EXHIBIT_HEADER_TEXT,
    TRACKING_DENIED_TEXT, VIDEO_NOTICE_TEXT,
};
use crate::pipeline::text::{sanitize, text_width, wrap, Font};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, warn};

const MARGIN: f32 = 50.0;
const FRAME_WIDTH: f32 = 400.0;
const FRAME_HEIGHT: f32 = 300.0;
const FRAME_PADDING: f32 = 6.0;
const CAPTION_GAP: f32 = 18.0;
const EXHIBIT_SPACING: f32 = 28.0;
const DETAIL_LABEL_WIDTH: usize = 12;
const STAMP_ANGLE_DEG: f32 = 30.0;
const STAMP_OPACITY: f32 = 0.25;
const STAMP_STATE: &str = "GSStamp";

type Rgb = [f32; 3];
const BLACK: Rgb = [0.0, 0.0, 0.0];
const GREY: Rgb = [0.35, 0.35, 0.35];
const ALERT_RED: Rgb = [0.75, 0.0, 0.0];
const LINK_BLUE: Rgb = [0.0, 0.2, 0.8];
const HIGHLIGHT: Rgb = [1.0, 0.93, 0.6];

/// A finished dossier.
#[derive(Debug, Clone)]
pub struct RenderedDossier {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Exhibit numbers actually drawn, in document order.
    pub exhibits: Vec<usize>,
    /// Exhibits dropped because their image could not be prepared.
    pub skipped: Vec<ItemError>,
}

/// Render a dossier on the blocking pool.
pub async fn render_dossier(
    input: DossierInput,
    config: &DossierConfig,
) -> Result<RenderedDossier, DossierError> {
    let config = config.clone();

    tokio::task::spawn_blocking(move || render_dossier_blocking(&input, &config))
        .await
        .map_err(|e| DossierError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of dossier rendering.
pub fn render_dossier_blocking(
    input: &DossierInput,
    config: &DossierConfig,
) -> Result<RenderedDossier, DossierError> {
    let blocks = plan(input, config);
    let mut writer = DossierWriter::new(config.page_size);
    let mut exhibits = Vec::new();
    let mut skipped = Vec::new();

    for block in &blocks {
        match block {
            DossierBlock::Title { title, subtitle } => writer.title(title, subtitle)?,
            DossierBlock::Stamp { text } => writer.stamp(text),
            DossierBlock::Details { lines } => writer.details(lines)?,
            DossierBlock::Location {
                coordinates,
                map_url,
            } => writer.location(coordinates, map_url)?,
            DossierBlock::TrackingDenied => writer.highlight(TRACKING_DENIED_TEXT)?,
            DossierBlock::VideoNotice => writer.highlight(VIDEO_NOTICE_TEXT)?,
            DossierBlock::ExhibitHeader => writer.section_header(EXHIBIT_HEADER_TEXT)?,
            DossierBlock::Exhibit { number, bytes } => match prepare_exhibit(*number, bytes) {
                Ok(image) => {
                    writer.exhibit(*number, &image)?;
                    exhibits.push(*number);
                }
                Err(e) => {
                    warn!("{}: skipping exhibit: {}", input.case_id, e);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_item_skipped(&input.case_id, &e);
                    }
                    skipped.push(e);
                }
            },
        }
    }

    let page_count = writer.page_count();
    let info = DocumentInfo {
        title: format!("{} {}", config.title, input.case_id),
        subject: input.case_id.clone(),
        created: input.submitted_at.format("D:%Y%m%d%H%M%SZ").to_string(),
    };
    let bytes = writer.finish(&info)?;

    info!(
        "Rendered dossier {}: {} exhibits, {} pages, {} bytes",
        input.case_id,
        exhibits.len(),
        page_count,
        bytes.len()
    );

    Ok(RenderedDossier {
        bytes,
        page_count,
        exhibits,
        skipped,
    })
}

/// Metadata written to the document information dictionary.
struct DocumentInfo {
    title: String,
    subject: String,
    /// PDF date string.
    created: String,
}

/// Operators and resources of the page currently being filled.
#[derive(Default)]
struct PageState {
    ops: Vec<Operation>,
    xobjects: Dictionary,
    annots: Vec<Object>,
    uses_stamp_state: bool,
}

impl PageState {
    fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Top-down page writer. Tracks a vertical cursor and breaks pages when a
/// block does not fit.
struct DossierWriter {
    doc: Document,
    pages_id: ObjectId,
    fonts: Dictionary,
    page_ids: Vec<ObjectId>,
    page: PageState,
    width: f32,
    height: f32,
    /// Baseline budget: y coordinate of the top of the next block.
    cursor: f32,
    image_count: usize,
}

impl DossierWriter {
    fn new(page_size: PageSize) -> Self {
        let (width, height) = page_size.dimensions();
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in Font::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }

        Self {
            doc,
            pages_id,
            fonts,
            page_ids: Vec::new(),
            page: PageState::default(),
            width,
            height,
            cursor: height - MARGIN,
            image_count: 0,
        }
    }

    fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(!self.page.is_empty() || self.page_ids.is_empty())
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * MARGIN
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    fn title(&mut self, title: &str, subtitle: &str) -> Result<(), DossierError> {
        self.centered_line(Font::HelveticaBold, 22.0, title, BLACK)?;
        self.centered_line(Font::Helvetica, 12.0, subtitle, GREY)?;
        self.cursor -= 4.0;
        self.rule(1.5);
        self.cursor -= 14.0;
        Ok(())
    }

    /// Rotated translucent text at a fixed anchor on the current page.
    /// Does not move the cursor.
    fn stamp(&mut self, text: &str) {
        let text = sanitize(text);
        let (sin, cos) = STAMP_ANGLE_DEG.to_radians().sin_cos();
        let x = self.width / 2.0 - 150.0;
        let y = self.height - 340.0;

        self.page.uses_stamp_state = true;
        self.page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![STAMP_STATE.into()]),
            Operation::new(
                "cm",
                vec![real(cos), real(sin), real(-sin), real(cos), real(x), real(y)],
            ),
            Operation::new("BT", vec![]),
            fill_color(ALERT_RED),
            Operation::new("Tf", vec![Font::HelveticaBold.resource_name().into(), real(54.0)]),
            Operation::new("Td", vec![real(0.0), real(0.0)]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn details(&mut self, lines: &[DetailLine]) -> Result<(), DossierError> {
        const SIZE: f32 = 10.0;
        let indent = " ".repeat(DETAIL_LABEL_WIDTH);
        let value_width = self.content_width() - text_width(&indent, Font::Courier, SIZE);

        for line in lines {
            let label = format!("{}:", line.label);
            let wrapped = wrap(&sanitize(&line.value), Font::Courier, SIZE, value_width);
            for (i, part) in wrapped.iter().enumerate() {
                let text = if i == 0 {
                    format!("{label:<width$}{part}", width = DETAIL_LABEL_WIDTH)
                } else {
                    format!("{indent}{part}")
                };
                self.left_line(Font::Courier, SIZE, &text, BLACK)?;
            }
        }
        self.cursor -= 8.0;
        Ok(())
    }

    fn location(&mut self, coordinates: &str, map_url: &str) -> Result<(), DossierError> {
        const SIZE: f32 = 10.0;
        let label = format!("{:<width$}", "LOCATION:", width = DETAIL_LABEL_WIDTH);
        self.left_line(Font::Courier, SIZE, &format!("{label}{coordinates}"), BLACK)?;

        let url = sanitize(map_url);
        for part in wrap(&url, Font::Helvetica, SIZE, self.content_width()) {
            self.link_line(SIZE, &part, &url)?;
        }
        self.cursor -= 8.0;
        Ok(())
    }

    /// Red bold text on a highlighter band.
    fn highlight(&mut self, text: &str) -> Result<(), DossierError> {
        const SIZE: f32 = 11.0;
        let text = sanitize(text);
        self.ensure_space(SIZE * 2.0)?;

        let baseline = self.cursor - SIZE;
        let band_width = text_width(&text, Font::HelveticaBold, SIZE) + 8.0;
        self.page.ops.extend([
            Operation::new("q", vec![]),
            fill_color(HIGHLIGHT),
            Operation::new(
                "re",
                vec![
                    real(MARGIN - 4.0),
                    real(baseline - 4.0),
                    real(band_width),
                    real(SIZE + 6.0),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        self.show_text(Font::HelveticaBold, SIZE, MARGIN, baseline, &text, ALERT_RED);
        self.cursor -= SIZE * 2.0;
        Ok(())
    }

    fn section_header(&mut self, text: &str) -> Result<(), DossierError> {
        self.cursor -= 10.0;
        self.left_line(Font::HelveticaBold, 14.0, text, BLACK)?;
        self.rule(0.75);
        self.cursor -= 16.0;
        Ok(())
    }

    /// Bordered frame, image fitted inside it, caption underneath.
    fn exhibit(&mut self, number: usize, image: &ExhibitImage) -> Result<(), DossierError> {
        self.ensure_space(FRAME_HEIGHT + CAPTION_GAP + EXHIBIT_SPACING)?;

        let frame_x = (self.width - FRAME_WIDTH) / 2.0;
        let frame_y = self.cursor - FRAME_HEIGHT;

        self.page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![real(1.5)]),
            stroke_color(BLACK),
            Operation::new(
                "re",
                vec![
                    real(frame_x),
                    real(frame_y),
                    real(FRAME_WIDTH),
                    real(FRAME_HEIGHT),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        let (draw_w, draw_h) = fit_within(
            image.width,
            image.height,
            FRAME_WIDTH - 2.0 * FRAME_PADDING,
            FRAME_HEIGHT - 2.0 * FRAME_PADDING,
        );
        let image_x = frame_x + (FRAME_WIDTH - draw_w) / 2.0;
        let image_y = frame_y + (FRAME_HEIGHT - draw_h) / 2.0;

        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(i64::from(image.width)),
                "Height" => Object::Integer(i64::from(image.height)),
                "ColorSpace" => image.color_space.pdf_name(),
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "DCTDecode",
            },
            image.jpeg.clone(),
        ));
        self.page.xobjects.set(name.as_str(), image_id);

        self.page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(draw_w),
                    real(0.0),
                    real(0.0),
                    real(draw_h),
                    real(image_x),
                    real(image_y),
                ],
            ),
            Operation::new("Do", vec![name.as_str().into()]),
            Operation::new("Q", vec![]),
        ]);

        let caption = exhibit_caption(number);
        let caption_x =
            (self.width - text_width(&caption, Font::HelveticaBold, 11.0)) / 2.0;
        self.show_text(
            Font::HelveticaBold,
            11.0,
            caption_x,
            frame_y - CAPTION_GAP + 4.0,
            &caption,
            BLACK,
        );

        self.cursor = frame_y - CAPTION_GAP - EXHIBIT_SPACING;
        debug!("Exhibit #{} drawn as /{}", number, name);
        Ok(())
    }

    // ── Primitives ───────────────────────────────────────────────────────

    fn centered_line(
        &mut self,
        font: Font,
        size: f32,
        text: &str,
        color: Rgb,
    ) -> Result<(), DossierError> {
        let text = sanitize(text);
        self.ensure_space(size * 1.5)?;
        let x = (self.width - text_width(&text, font, size)) / 2.0;
        let baseline = self.cursor - size;
        self.show_text(font, size, x, baseline, &text, color);
        self.cursor -= size * 1.5;
        Ok(())
    }

    fn left_line(
        &mut self,
        font: Font,
        size: f32,
        text: &str,
        color: Rgb,
    ) -> Result<(), DossierError> {
        self.ensure_space(size * 1.5)?;
        let baseline = self.cursor - size;
        self.show_text(font, size, MARGIN, baseline, text, color);
        self.cursor -= size * 1.5;
        Ok(())
    }

    /// Underlined blue text with a URI link annotation over it.
    fn link_line(&mut self, size: f32, text: &str, url: &str) -> Result<(), DossierError> {
        self.ensure_space(size * 1.5)?;
        let baseline = self.cursor - size;
        let width = text_width(text, Font::Helvetica, size);

        self.show_text(Font::Helvetica, size, MARGIN, baseline, text, LINK_BLUE);
        self.page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![real(0.5)]),
            stroke_color(LINK_BLUE),
            Operation::new("m", vec![real(MARGIN), real(baseline - 1.5)]),
            Operation::new("l", vec![real(MARGIN + width), real(baseline - 1.5)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        let annot_id = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![
                real(MARGIN),
                real(baseline - 3.0),
                real(MARGIN + width),
                real(baseline + size),
            ],
            "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(url),
            },
        });
        self.page.annots.push(annot_id.into());

        self.cursor -= size * 1.5;
        Ok(())
    }

    fn rule(&mut self, line_width: f32) {
        let y = self.cursor;
        self.page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![real(line_width)]),
            stroke_color(BLACK),
            Operation::new("m", vec![real(MARGIN), real(y)]),
            Operation::new("l", vec![real(self.width - MARGIN), real(y)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn show_text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str, color: Rgb) {
        self.page.ops.extend([
            Operation::new("BT", vec![]),
            fill_color(color),
            Operation::new("Tf", vec![font.resource_name().into(), real(size)]),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);
    }

    // ── Pagination ───────────────────────────────────────────────────────

    /// Start a new page unless `needed` points still fit above the bottom
    /// margin. An empty page is never abandoned.
    fn ensure_space(&mut self, needed: f32) -> Result<(), DossierError> {
        if self.cursor - needed < MARGIN && !self.page.is_empty() {
            self.flush_page()?;
        }
        Ok(())
    }

    fn flush_page(&mut self) -> Result<(), DossierError> {
        let page = std::mem::take(&mut self.page);

        let content = Content {
            operations: page.ops,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut resources = dictionary! {
            "Font" => self.fonts.clone(),
        };
        if !page.xobjects.is_empty() {
            resources.set("XObject", page.xobjects);
        }
        if page.uses_stamp_state {
            resources.set(
                "ExtGState",
                dictionary! {
                    STAMP_STATE => dictionary! {
                        "Type" => "ExtGState",
                        "ca" => real(STAMP_OPACITY),
                        "CA" => real(STAMP_OPACITY),
                    },
                },
            );
        }

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(self.width), real(self.height)],
            "Contents" => content_id,
            "Resources" => resources,
        };
        if !page.annots.is_empty() {
            page_dict.set("Annots", page.annots);
        }

        let page_id = self.doc.add_object(page_dict);
        self.page_ids.push(page_id);
        self.cursor = self.height - MARGIN;
        debug!("Sealed page {}", self.page_ids.len());
        Ok(())
    }

    /// Seal the document and serialise it.
    fn finish(mut self, info: &DocumentInfo) -> Result<Vec<u8>, DossierError> {
        if !self.page.is_empty() || self.page_ids.is_empty() {
            self.flush_page()?;
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let page_count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(page_count),
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(sanitize(&info.title)),
            "Subject" => Object::string_literal(sanitize(&info.subject)),
            "Producer" => Object::string_literal(concat!("evidence-dossier ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(info.created.as_str()),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| DossierError::RenderFailed(e.to_string()))?;
        Ok(bytes)
    }
}

fn real(v: f32) -> Object {
    Object::Real(v.into())
}

fn fill_color([r, g, b]: Rgb) -> Operation {
    Operation::new("rg", vec![real(r), real(g), real(b)])
}

fn stroke_color([r, g, b]: Rgb) -> Operation {
    Operation::new("RG", vec![real(r), real(g), real(b)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::ExhibitSource;
    use crate::report::{GeoPoint, ReportMeta};
    use chrono::{TimeZone, Utc};
    use image::{DynamicImage, ImageFormat, Rgb as Pixel, RgbImage};
    use std::io::Cursor;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Pixel([30, 60, 90])))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    fn input(meta: Option<ReportMeta>, video_present: bool, exhibits: Vec<ExhibitSource>) -> DossierInput {
        DossierInput {
            case_id: "CASE_1700000000000".into(),
            submitted_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            client_addr: "198.51.100.4".into(),
            meta,
            video_present,
            exhibits,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn minimal_dossier_is_a_valid_single_page_pdf() {
        let config = DossierConfig::default();
        let rendered = render_dossier_blocking(&input(None, false, vec![]), &config).unwrap();

        assert!(rendered.bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(rendered.page_count, 1);
        assert!(rendered.exhibits.is_empty());

        let doc = Document::load_mem(&rendered.bytes).expect("parseable");
        assert_eq!(doc.get_pages().len(), 1);
        assert!(contains(&rendered.bytes, b"(EVIDENCE DOSSIER)"));
        assert!(contains(&rendered.bytes, b"(PHOTOGRAPHIC EVIDENCE)"));
        assert!(contains(&rendered.bytes, b"TRACKING DENIED"));
        assert!(!contains(&rendered.bytes, b"VIDEO EVIDENCE"));
    }

    #[test]
    fn stamp_is_scoped_in_saved_graphics_state() {
        let config = DossierConfig::default();
        let rendered = render_dossier_blocking(&input(None, false, vec![]), &config).unwrap();
        let doc = Document::load_mem(&rendered.bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let ops: Vec<&str> = content.operations.iter().map(|o| o.operator.as_str()).collect();

        let gs = ops.iter().position(|&o| o == "gs").expect("stamp sets opacity");
        assert_eq!(ops[gs - 1], "q");
        let restore = gs + ops[gs..].iter().position(|&o| o == "Q").unwrap();
        assert!(ops[gs..restore].contains(&"cm"));
        // Depth returns to zero by the end of the stream.
        let depth = ops.iter().fold(0i32, |d, &o| match o {
            "q" => d + 1,
            "Q" => d - 1,
            _ => d,
        });
        assert_eq!(depth, 0);
    }

    #[test]
    fn location_renders_link_annotation() {
        let config = DossierConfig::default();
        let meta = ReportMeta {
            user_agent: "TestAgent/1.0".into(),
            location: Some(GeoPoint { lat: 1.0, lon: 2.0 }),
        };
        let rendered = render_dossier_blocking(&input(Some(meta), true, vec![]), &config).unwrap();

        assert!(contains(&rendered.bytes, b"https://www.google.com/maps?q=1,2"));
        assert!(contains(&rendered.bytes, b"/Link"));
        assert!(!contains(&rendered.bytes, b"TRACKING DENIED"));
        assert!(contains(&rendered.bytes, b"VIDEO EVIDENCE SUBMITTED"));
        assert!(contains(&rendered.bytes, b"TestAgent/1.0"));
    }

    #[test]
    fn corrupt_exhibit_is_skipped_and_numbering_kept() {
        let config = DossierConfig::default();
        let exhibits = vec![
            ExhibitSource {
                number: 1,
                bytes: jpeg(32, 24),
            },
            ExhibitSource {
                number: 2,
                bytes: b"not an image".to_vec(),
            },
            ExhibitSource {
                number: 3,
                bytes: jpeg(24, 32),
            },
        ];
        let rendered = render_dossier_blocking(&input(None, false, exhibits), &config).unwrap();

        assert_eq!(rendered.exhibits, vec![1, 3]);
        assert_eq!(rendered.skipped.len(), 1);
        assert_eq!(rendered.skipped[0].position(), Some(2));
        assert!(contains(&rendered.bytes, b"(EXHIBIT #1 // SUSPECT CAPTURED)"));
        assert!(contains(&rendered.bytes, b"(EXHIBIT #3 // SUSPECT CAPTURED)"));
        assert!(!contains(&rendered.bytes, b"EXHIBIT #2"));
    }

    #[test]
    fn jpeg_bytes_are_embedded_verbatim() {
        let config = DossierConfig::default();
        let photo = jpeg(40, 30);
        let exhibits = vec![ExhibitSource {
            number: 1,
            bytes: photo.clone(),
        }];
        let rendered = render_dossier_blocking(&input(None, false, exhibits), &config).unwrap();
        assert!(contains(&rendered.bytes, &photo));
        assert!(contains(&rendered.bytes, b"/DCTDecode"));
    }

    #[test]
    fn many_exhibits_paginate() {
        let config = DossierConfig::default();
        let exhibits = (1..=4)
            .map(|number| ExhibitSource {
                number,
                bytes: jpeg(16, 16),
            })
            .collect();
        let rendered = render_dossier_blocking(&input(None, false, exhibits), &config).unwrap();

        assert_eq!(rendered.exhibits, vec![1, 2, 3, 4]);
        assert!(rendered.page_count >= 3, "pages: {}", rendered.page_count);
        let doc = Document::load_mem(&rendered.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), rendered.page_count);
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = DossierConfig::default();
        let a = render_dossier_blocking(&input(None, true, vec![]), &config).unwrap();
        let b = render_dossier_blocking(&input(None, true, vec![]), &config).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[tokio::test]
    async fn async_render_matches_blocking() {
        let config = DossierConfig::default();
        let blocking = render_dossier_blocking(&input(None, false, vec![]), &config).unwrap();
        let rendered = render_dossier(input(None, false, vec![]), &config).await.unwrap();
        assert_eq!(rendered.bytes, blocking.bytes);
    }
}
