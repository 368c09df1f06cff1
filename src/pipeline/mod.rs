//! Pipeline stages for protocol-to-synopsis extraction.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ chunk ──▶ llm ──▶ postprocess ──▶ schema ──▶ merge
//! (URL/path) (pdfium) (split)  (model)  (isolate JSON)  (validate)  (combine)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`text`]: read the PDF text layer; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`chunk`]: split the text on sentence boundaries into request-sized
//!    pieces
//! 4. [`llm`]: one request per chunk; the only stage with network I/O
//! 5. [`postprocess`]: strip fences and chatter around the JSON object
//! 6. [`merge`]: fold the per-chunk partial synopses into one
//!
//! Validation between 5 and 6 lives in [`crate::schema`].

pub mod chunk;
pub mod input;
pub mod llm;
pub mod merge;
pub mod postprocess;
pub mod text;
