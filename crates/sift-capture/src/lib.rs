//! Sift Capture crate - capture sources and the single-slot capture gate.
//!
//! Provides the CaptureService trait for delivering captured selections, a
//! MockCaptureService for tests, a QueuedCaptureService fed through a
//! channel, and the CaptureGate that keeps overlapping triggers from
//! racing on the shared clipboard.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use sift_core::types::{CapturedContent, CapturedInput};
use tokio::sync::{mpsc, Mutex};

/// Errors from a capture source.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("A capture is already in progress")]
    Busy,
    #[error("Capture failed: {0}")]
    Failed(String),
    #[error("Capture source closed")]
    Closed,
}

/// Source of captured selections.
///
/// Implementations talk to the platform (clipboard, file manager, stdin).
/// The trait abstracts over the mechanism so tests can use the mock.
pub trait CaptureService: Send + Sync {
    /// Capture the current selection.
    fn capture(&self) -> impl Future<Output = Result<CapturedInput, CaptureError>> + Send;
}

/// Mock capture service for testing.
///
/// Returns the same configured input on every capture.
#[derive(Debug, Clone)]
pub struct MockCaptureService {
    input: CapturedInput,
}

impl MockCaptureService {
    pub fn new() -> Self {
        Self::with_text("Mock captured text")
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            input: CapturedInput::text(text),
        }
    }

    pub fn with_files(paths: Vec<PathBuf>) -> Self {
        Self {
            input: CapturedInput::files(paths),
        }
    }

    /// A source whose captures always come back unsuccessful.
    pub fn failing() -> Self {
        Self {
            input: CapturedInput::empty(),
        }
    }
}

impl Default for MockCaptureService {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureService for MockCaptureService {
    async fn capture(&self) -> Result<CapturedInput, CaptureError> {
        Ok(self.input.clone())
    }
}

/// Capture source fed by a channel; each capture takes the next queued input.
pub struct QueuedCaptureService {
    receiver: Mutex<mpsc::Receiver<CapturedInput>>,
}

impl QueuedCaptureService {
    /// Create the service and the sender that feeds it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<CapturedInput>, Self) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (
            sender,
            Self {
                receiver: Mutex::new(receiver),
            },
        )
    }
}

impl CaptureService for QueuedCaptureService {
    async fn capture(&self) -> Result<CapturedInput, CaptureError> {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(CaptureError::Closed)
    }
}

/// Single-slot gate around a capture service.
///
/// Only one capture may be in flight. A trigger that arrives while the slot
/// is held is rejected with [`CaptureError::Busy`] instead of queueing.
pub struct CaptureGate<S> {
    service: S,
    slot: Mutex<()>,
    trim_whitespace: bool,
    captured: AtomicU64,
    rejected: AtomicU64,
}

impl<S: CaptureService> CaptureGate<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            slot: Mutex::new(()),
            trim_whitespace: false,
            captured: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Trim surrounding whitespace from captured text.
    pub fn with_trim(mut self, trim_whitespace: bool) -> Self {
        self.trim_whitespace = trim_whitespace;
        self
    }

    /// Run one capture if the slot is free.
    pub async fn trigger(&self) -> Result<CapturedInput, CaptureError> {
        let _slot = self.slot.try_lock().map_err(|_| {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Capture rejected; slot busy");
            CaptureError::Busy
        })?;

        let mut input = self.service.capture().await?;
        if self.trim_whitespace {
            if let CapturedContent::Text(text) = &mut input.content {
                let trimmed = text.trim();
                if trimmed.len() != text.len() {
                    *text = trimmed.to_string();
                }
            }
        }
        self.captured.fetch_add(1, Ordering::Relaxed);
        Ok(input)
    }

    /// Whether a capture is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }

    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
