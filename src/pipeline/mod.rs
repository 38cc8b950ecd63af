//! Pipeline stages for report ingestion and dossier rendering.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without touching the filesystem or the HTTP layer.
//!
//! ## Data Flow
//!
//! ```text
//! decode ──▶ layout ──▶ exhibit ──▶ render
//! (base64)   (blocks)   (JPEG)      (lopdf)
//! ```
//!
//! 1. [`decode`]  — split data-URIs and decode their base64 payload
//! 2. [`layout`]  — decide which blocks the dossier contains, in order
//! 3. [`exhibit`] — validate image bytes and make them embeddable as JPEG
//! 4. [`render`]  — draw the blocks onto pages; runs in `spawn_blocking`
//!    because image decoding is CPU-bound
//!
//! [`text`] holds the font metrics the renderer uses to center and wrap.

pub mod decode;
pub mod exhibit;
pub mod layout;
pub mod render;
pub mod text;
