//! Progress-callback trait for per-chunk extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the extractor works through the protocol.
//!
//! # Example
//!
//! ```rust
//! use edgequake_synopsis::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fields_filled: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Chunk {}/{} filled {} fields", chunk, total_chunks, fields_filled);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extractor as it processes each chunk.
///
/// Implementations must be `Send + Sync` so a config carrying one can move
/// into a spawned task. All methods have default no-op implementations so
/// callers only override what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once, after chunking and before the first model request.
    fn on_extraction_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the request for a chunk is sent.
    ///
    /// # Arguments
    /// * `chunk`: 1-indexed chunk number
    /// * `total_chunks`: number of chunks in the document
    fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
        let _ = (chunk, total_chunks);
    }

    /// Called when a chunk's reply validated.
    ///
    /// # Arguments
    /// * `fields_filled`: non-empty fields in this chunk's partial synopsis
    fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fields_filled: usize) {
        let _ = (chunk, total_chunks, fields_filled);
    }

    /// Called when a chunk fails. The extraction stops after this event.
    fn on_chunk_error(&self, chunk: usize, total_chunks: usize, error: String) {
        let _ = (chunk, total_chunks, error);
    }

    /// Called once after the last chunk has been attempted.
    ///
    /// # Arguments
    /// * `succeeded`: chunks whose replies validated
    fn on_extraction_complete(&self, total_chunks: usize, succeeded: usize) {
        let _ = (total_chunks, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, total_chunks: usize) {
            self.started_total.store(total_chunks, Ordering::SeqCst);
        }

        fn on_chunk_start(&self, _chunk: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _chunk: usize, _total: usize, _filled: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_error(&self, _chunk: usize, _total: usize, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_extraction_complete(&self, _total: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(3);
        cb.on_chunk_start(1, 3);
        cb.on_chunk_complete(1, 3, 12);
        cb.on_chunk_error(2, 3, "rate limited".to_string());
        cb.on_extraction_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_extraction_start(2);
        tracker.on_chunk_start(1, 2);
        tracker.on_chunk_complete(1, 2, 20);
        tracker.on_chunk_start(2, 2);
        tracker.on_chunk_error(2, 2, "missing required field 'arms'".to_string());
        tracker.on_extraction_complete(2, 1);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopProgressCallback>();
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_start(1);
    }
}
