// SPDX-License-Identifier: GPL-3.0-only

//! Output stage of the capture session
//!
//! Every frame from the active video input passes through [`OutputStage`],
//! which fans it out to the preview, to pending photo requests and to the
//! movie writer of an in-flight recording. While a configuration transaction
//! is open, frames are dropped so no output ever sees a half-swapped input.

use crate::backends::camera::{CameraFrame, MovieWriter};
use crate::constants::timing;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

#[derive(Default)]
struct PhotoOutput {
    attached: bool,
    pending: Vec<oneshot::Sender<CameraFrame>>,
}

#[derive(Default)]
struct MovieOutput {
    attached: bool,
    writer: Option<Box<dyn MovieWriter>>,
    write_failures: u64,
}

pub struct OutputStage {
    configuring: AtomicBool,
    frames_published: AtomicU64,
    preview: watch::Sender<Option<CameraFrame>>,
    photo: Mutex<PhotoOutput>,
    movie: Mutex<MovieOutput>,
}

impl OutputStage {
    pub fn new() -> Self {
        let (preview, _) = watch::channel(None);
        Self {
            configuring: AtomicBool::new(false),
            frames_published: AtomicU64::new(0),
            preview,
            photo: Mutex::new(PhotoOutput::default()),
            movie: Mutex::new(MovieOutput::default()),
        }
    }

    /// Deliver a frame from the active video input to every output
    pub fn publish(&self, frame: CameraFrame) {
        if self.configuring.load(Ordering::Acquire) {
            return;
        }

        let count = self.frames_published.fetch_add(1, Ordering::Relaxed);
        if count % (timing::FRAME_LOG_INTERVAL * 10) == 0 {
            debug!(frame = count, width = frame.width, height = frame.height, "Publishing frame");
        }

        {
            let mut movie = self.movie_output();
            if let Some(writer) = movie.writer.as_mut()
                && let Err(e) = writer.write_frame(&frame)
            {
                movie.write_failures += 1;
                if movie.write_failures == 1 {
                    warn!(error = %e, "Failed to write frame to recording");
                }
            }
        }

        {
            let mut photo = self.photo_output();
            for request in photo.pending.drain(..).filter(|tx| !tx.is_closed()) {
                let _ = request.send(frame.clone());
            }
        }

        self.preview.send_replace(Some(frame));
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published.load(Ordering::Relaxed)
    }

    // ===== Configuration =====

    pub fn is_configuring(&self) -> bool {
        self.configuring.load(Ordering::Acquire)
    }

    fn begin_configuration(&self) {
        self.configuring.store(true, Ordering::Release);
    }

    fn commit_configuration(&self) {
        self.configuring.store(false, Ordering::Release);
    }

    // ===== Preview =====

    pub fn subscribe_preview(&self) -> watch::Receiver<Option<CameraFrame>> {
        self.preview.subscribe()
    }

    // ===== Photo output =====

    pub fn attach_photo_output(&self) {
        self.photo_output().attached = true;
    }

    pub fn has_photo_output(&self) -> bool {
        self.photo_output().attached
    }

    /// Ask for the next published frame. `None` without a photo output.
    pub fn request_photo_frame(&self) -> Option<oneshot::Receiver<CameraFrame>> {
        let mut photo = self.photo_output();
        if !photo.attached {
            return None;
        }
        // Requesters that gave up (timed out or dropped) never get a frame
        photo.pending.retain(|tx| !tx.is_closed());
        let (tx, rx) = oneshot::channel();
        photo.pending.push(tx);
        Some(rx)
    }

    // ===== Movie-file output =====

    pub fn attach_movie_output(&self) {
        self.movie_output().attached = true;
    }

    pub fn has_movie_output(&self) -> bool {
        self.movie_output().attached
    }

    /// Route frames into `writer` until [`take_writer`](Self::take_writer)
    pub fn start_writer(&self, writer: Box<dyn MovieWriter>) {
        let mut movie = self.movie_output();
        movie.write_failures = 0;
        movie.writer = Some(writer);
    }

    pub fn take_writer(&self) -> Option<Box<dyn MovieWriter>> {
        let mut movie = self.movie_output();
        if movie.write_failures > 0 {
            warn!(failures = movie.write_failures, "Recording dropped frames");
        }
        movie.writer.take()
    }

    fn photo_output(&self) -> MutexGuard<'_, PhotoOutput> {
        self.photo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn movie_output(&self) -> MutexGuard<'_, MovieOutput> {
        self.movie.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for OutputStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Begin/commit pair around an input change.
///
/// Committed explicitly with [`commit`](Self::commit) or when dropped, so an
/// early return cannot leave the output stage blocked.
pub struct ConfigurationTransaction<'a> {
    stage: &'a OutputStage,
}

impl<'a> ConfigurationTransaction<'a> {
    pub fn begin(stage: &'a OutputStage) -> Self {
        stage.begin_configuration();
        Self { stage }
    }

    pub fn commit(self) {}
}

impl Drop for ConfigurationTransaction<'_> {
    fn drop(&mut self) {
        self.stage.commit_configuration();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> CameraFrame {
        CameraFrame::from_rgba(2, 2, vec![255; 16])
    }

    #[test]
    fn test_frames_dropped_during_configuration() {
        let stage = OutputStage::new();
        let preview = stage.subscribe_preview();

        let transaction = ConfigurationTransaction::begin(&stage);
        stage.publish(frame());
        assert!(preview.borrow().is_none());
        assert_eq!(stage.frames_published(), 0);

        transaction.commit();
        assert!(!stage.is_configuring());
        stage.publish(frame());
        assert!(preview.borrow().is_some());
    }

    #[test]
    fn test_transaction_commits_on_drop() {
        let stage = OutputStage::new();
        {
            let _transaction = ConfigurationTransaction::begin(&stage);
            assert!(stage.is_configuring());
        }
        assert!(!stage.is_configuring());
    }

    #[test]
    fn test_abandoned_photo_requests_are_pruned() {
        let stage = OutputStage::new();
        stage.attach_photo_output();

        for _ in 0..1000 {
            drop(stage.request_photo_frame());
        }
        let mut live = stage.request_photo_frame().unwrap();
        assert_eq!(stage.photo_output().pending.len(), 1);

        stage.publish(frame());
        assert!(live.try_recv().is_ok());
        assert!(stage.photo_output().pending.is_empty());
    }

    #[test]
    fn test_photo_request_needs_output() {
        let stage = OutputStage::new();
        assert!(stage.request_photo_frame().is_none());

        stage.attach_photo_output();
        let mut request = stage.request_photo_frame().unwrap();
        stage.publish(frame());
        assert_eq!(request.try_recv().unwrap().width, 2);
    }
}
