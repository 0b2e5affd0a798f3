//! Progress-callback trait for per-block translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslatorConfigBuilder::progress_callback`], or pass one
//! straight to [`crate::translate::translate_document`].
//!
//! Any `Fn(f64)` closure is a callback: it receives the percentage of blocks
//! translated so far.
//!
//! ```rust
//! use edgequake_pdf_translator::{ProgressCallback, TranslationProgressCallback};
//! use std::sync::Arc;
//!
//! let cb: ProgressCallback = Arc::new(|percent: f64| eprintln!("{percent:.0}%"));
//! cb.on_progress(50.0);
//! ```

use std::sync::Arc;

/// Called synchronously by the translator as it walks the document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. None of them fire for a document with no blocks.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once before the first block.
    fn on_translation_start(&self, total_blocks: usize) {
        let _ = total_blocks;
    }

    /// Called just before the request for a block is sent.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed source page
    /// * `block_num`: 1-indexed position of the block in the whole document
    fn on_block_start(&self, page_num: usize, block_num: usize, total_blocks: usize) {
        let _ = (page_num, block_num, total_blocks);
    }

    /// Called after a block's reply is stored.
    fn on_block_complete(&self, page_num: usize, block_num: usize, succeeded: bool) {
        let _ = (page_num, block_num, succeeded);
    }

    /// Percentage of blocks translated so far, in `(0, 100]`. Fires exactly
    /// once per block, after [`Self::on_block_complete`].
    fn on_progress(&self, percent: f64) {
        let _ = percent;
    }

    /// Called once after every block has been attempted.
    fn on_translation_complete(&self, total_blocks: usize, succeeded: usize) {
        let _ = (total_blocks, succeeded);
    }
}

impl<F> TranslationProgressCallback for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_progress(&self, percent: f64) {
        self(percent)
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslatorConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        failures: AtomicUsize,
        percents: Mutex<Vec<f64>>,
    }

    impl TranslationProgressCallback for TrackingCallback {
        fn on_block_start(&self, _page_num: usize, _block_num: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_block_complete(&self, _page_num: usize, _block_num: usize, succeeded: bool) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            if !succeeded {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_progress(&self, percent: f64) {
            self.percents.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_translation_start(5);
        cb.on_block_start(1, 1, 5);
        cb.on_block_complete(1, 1, true);
        cb.on_progress(20.0);
        cb.on_translation_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            percents: Mutex::new(Vec::new()),
        };

        tracker.on_block_start(1, 1, 2);
        tracker.on_block_complete(1, 1, true);
        tracker.on_progress(50.0);
        tracker.on_block_start(1, 2, 2);
        tracker.on_block_complete(1, 2, false);
        tracker.on_progress(100.0);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.percents.lock().unwrap(), vec![50.0, 100.0]);
    }

    #[test]
    fn closure_is_a_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |p: f64| sink.lock().unwrap().push(p));

        cb.on_translation_start(2);
        cb.on_progress(50.0);
        cb.on_progress(100.0);

        assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);
    }
}
