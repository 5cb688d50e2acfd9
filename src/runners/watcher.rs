//! # Output watcher: append-only buffer with incremental marker detection.
//!
//! [`OutputWatcher`] wraps a child's combined stdout/stderr stream. The copy
//! tasks [`append`](OutputWatcher::append) bytes as they arrive; detection
//! logic registered via [`detect`](OutputWatcher::detect) fires a one-shot
//! notification the first time its marker appears as a substring of the
//! accumulated contents.
//!
//! ## Rules
//! - Bytes are never lost or reordered relative to the writer's call order
//!   (appends are serialized by the internal mutex).
//! - Detection is checked incrementally on every append, resuming from the
//!   last scanned offset, so it fires before the child terminates and long
//!   runs stay linear rather than quadratic.
//! - A fired detection cannot be un-done; the notification is one-shot.
//! - The watcher itself never fails. A marker that never appears simply never
//!   fires; deadlines are the process runner's responsibility.
//!
//! [`contents`](OutputWatcher::contents) returns the full buffer at call time
//! and is used for failure diagnostics.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::runners::runner::ReadyRx;

/// Buffers a process's combined output and scans it for markers.
///
/// Cheap to clone; clones share the same buffer.
#[derive(Clone, Default)]
pub struct OutputWatcher {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    buf: Vec<u8>,
    detects: Vec<Detect>,
    canceled: bool,
}

struct Detect {
    marker: Vec<u8>,
    /// Number of buffer bytes already scanned for this marker.
    scanned: usize,
    tx: Option<oneshot::Sender<()>>,
}

/// First occurrence of `needle` in `haystack`, if any.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl OutputWatcher {
    /// Creates an empty watcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes to the buffer and advances every pending detection.
    ///
    /// Safe to call concurrently with reads; a detection whose marker is
    /// completed by this write fires before `append` returns.
    pub fn append(&self, bytes: &[u8]) {
        let mut inner = self.lock();
        inner.buf.extend_from_slice(bytes);
        if inner.canceled || inner.detects.is_empty() {
            return;
        }

        let buf_len = inner.buf.len();
        let mut detects = std::mem::take(&mut inner.detects);
        detects.retain_mut(|d| {
            // Resume just far enough back to catch a marker split across writes.
            let overlap = d.marker.len().saturating_sub(1);
            let start = d.scanned.saturating_sub(overlap);
            if find(&inner.buf[start..], &d.marker).is_some() {
                if let Some(tx) = d.tx.take() {
                    let _ = tx.send(());
                }
                false
            } else {
                d.scanned = buf_len;
                true
            }
        });
        inner.detects = detects;
    }

    /// Registers a marker and returns its one-shot notification.
    ///
    /// Fires immediately if the marker is empty or already present in the
    /// accumulated contents. After [`cancel_detects`](Self::cancel_detects)
    /// the returned notification never fires.
    pub fn detect(&self, marker: &[u8]) -> ReadyRx {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();
        if inner.canceled {
            return rx;
        }
        if find(&inner.buf, marker).is_some() {
            let _ = tx.send(());
            return rx;
        }
        let scanned = inner.buf.len();
        inner.detects.push(Detect {
            marker: marker.to_vec(),
            scanned,
            tx: Some(tx),
        });
        rx
    }

    /// Stops all further detection work.
    ///
    /// Used once a marker has fired, so the remainder of the process lifetime
    /// costs no scanning. Pending notifications resolve as closed.
    pub fn cancel_detects(&self) {
        let mut inner = self.lock();
        inner.canceled = true;
        inner.detects.clear();
    }

    /// Returns the full buffer contents at call time.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().buf.clone()
    }

    /// Returns the buffer as a (lossy) string, for embedding in errors.
    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock().buf).into_owned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // The watcher never fails: recover the guard even if a writer panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_detects_marker_already_present() {
        let w = OutputWatcher::new();
        w.append(b"api server started on :8080\n");
        let mut rx = w.detect(b"started");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_detects_marker_on_completing_write() {
        let w = OutputWatcher::new();
        let mut rx = w.detect(b"ready");
        w.append(b"warming up\n");
        assert!(rx.try_recv().is_err());
        w.append(b"ready\n");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_detects_marker_split_across_writes() {
        let w = OutputWatcher::new();
        let mut rx = w.detect(b"started");
        w.append(b"sta");
        assert!(rx.try_recv().is_err());
        w.append(b"rted");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_empty_marker_fires_immediately() {
        let w = OutputWatcher::new();
        let mut rx = w.detect(b"");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_absent_marker_never_fires() {
        let w = OutputWatcher::new();
        let mut rx = w.detect(b"ready");
        w.append(b"nothing of interest\n");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_detects_closes_pending() {
        let w = OutputWatcher::new();
        let rx = w.detect(b"ready");
        w.cancel_detects();
        w.append(b"ready\n");
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_contents_preserves_write_order() {
        let w = OutputWatcher::new();
        w.append(b"first ");
        w.append(b"second ");
        w.append(b"third");
        assert_eq!(w.contents(), b"first second third".to_vec());
        assert_eq!(w.contents_lossy(), "first second third");
    }

    #[tokio::test]
    async fn test_multiple_markers_fire_independently() {
        let w = OutputWatcher::new();
        let mut a = w.detect(b"alpha");
        let mut b = w.detect(b"beta");
        w.append(b"alpha\n");
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_err());
        w.append(b"beta\n");
        assert!(b.try_recv().is_ok());
    }
}
