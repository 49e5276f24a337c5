//! Shared frame context, the one piece of state the media engine and the
//! renderer both touch.
//!
//! The engine only ever sees it as a [`FrameSink`]: begin a write, end it,
//! ask for a present. Everything else (resize, upload to the texture) is the
//! main thread's business and goes through the inherent methods.
//!
//! # Locking
//! One mutex guards the staging pixels *and* the display geometry. A
//! [`FrameWrite`] lease holds it from `begin_frame_write` to
//! `end_frame_write`, so at most one writer is active and the main thread
//! can never read a half-written frame or a half-updated rectangle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::types::{DisplayRect, Resolution, VideoFormat};

// MARK: - Capabilities

/// Wakes the thread that owns the renderer.
pub trait PresentNotifier: Send + Sync {
    /// Post one wake-up. Returns `false` if it was not delivered.
    fn notify(&self) -> bool;
}

/// The callback contract the media engine drives from its own threads.
pub trait FrameSink: Send + Sync {
    /// Lock the frame buffer and hand it out for one full frame.
    fn begin_frame_write(&self) -> FrameWrite<'_>;

    /// Commit the frame written through `frame` and release the lock.
    fn end_frame_write(&self, frame: FrameWrite<'_>);

    /// The committed frame should become visible.
    fn present_frame(&self);
}

// MARK: - FrameStore

struct FrameStore {
    pixels: Vec<u8>,
    /// Clamped window size; the present path scales into this.
    window: Resolution,
    /// A frame was committed since the last upload.
    dirty: bool,
}

// MARK: - FrameWrite

/// Exclusive write access to the frame buffer. Holds the context lock.
pub struct FrameWrite<'a> {
    store: MutexGuard<'a, FrameStore>,
    format: VideoFormat,
}

impl FrameWrite<'_> {
    /// The whole frame, `pitch() * height` bytes.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.store.pixels
    }

    pub fn pitch(&self) -> usize {
        self.format.pitch
    }

}

// MARK: - FrameView

/// What the present path gets to look at while holding the lock.
pub struct FrameView<'a> {
    /// Pixels of a frame committed since the last present, if any.
    pub fresh: Option<&'a [u8]>,
    pub pitch: usize,
    pub rect: DisplayRect,
}

// MARK: - SharedFrameContext

pub struct SharedFrameContext {
    store: Mutex<FrameStore>,
    format: VideoFormat,
    notifier: Box<dyn PresentNotifier>,
    present_queued: AtomicBool,
    frames_written: AtomicU64,
    frames_presented: AtomicU64,
}

impl SharedFrameContext {
    /// `format` fixes the buffer size for the life of the context; `window`
    /// is the initial display size, clamped to it.
    pub fn new(format: VideoFormat, window: Resolution, notifier: Box<dyn PresentNotifier>) -> Self {
        let window = format.resolution().clamp(window.width as i32, window.height as i32);
        Self {
            store: Mutex::new(FrameStore {
                pixels: vec![0; format.frame_len()],
                window,
                dirty: false,
            }),
            format,
            notifier,
            present_queued: AtomicBool::new(false),
            frames_written: AtomicU64::new(0),
            frames_presented: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrameStore> {
        // A writer that panicked mid-frame leaves garbage pixels, not broken state.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new window size, clamped to the texture's dimensions.
    /// Returns the resulting display rectangle.
    pub fn set_window_size(&self, width: i32, height: i32) -> DisplayRect {
        let clamped = self.format.resolution().clamp(width, height);
        self.lock().window = clamped;
        DisplayRect::covering(clamped)
    }

    pub fn display_rect(&self) -> DisplayRect {
        DisplayRect::covering(self.lock().window)
    }

    /// Clear the pending present request. Returns whether one was queued.
    pub fn take_present_request(&self) -> bool {
        self.present_queued.swap(false, Ordering::AcqRel)
    }

    /// Run `f` on the current frame under the lock. The display rectangle is
    /// recomputed from the window size and the dirty flag is consumed.
    pub fn with_frame<R>(&self, f: impl FnOnce(FrameView<'_>) -> R) -> R {
        let mut store = self.lock();
        let fresh = std::mem::replace(&mut store.dirty, false);
        let view = FrameView {
            fresh: fresh.then_some(store.pixels.as_slice()),
            pitch: self.format.pitch,
            rect: DisplayRect::covering(store.window),
        };
        let out = f(view);
        self.frames_presented.fetch_add(1, Ordering::Relaxed);
        out
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Relaxed)
    }
}

impl FrameSink for SharedFrameContext {
    fn begin_frame_write(&self) -> FrameWrite<'_> {
        FrameWrite { store: self.lock(), format: self.format }
    }

    fn end_frame_write(&self, mut frame: FrameWrite<'_>) {
        frame.store.dirty = true;
        self.frames_written.fetch_add(1, Ordering::Relaxed);
        drop(frame);
    }

    fn present_frame(&self) {
        // Coalesce: one outstanding wake-up is enough.
        if self.present_queued.swap(true, Ordering::AcqRel) {
            trace!("present already queued");
            return;
        }
        if !self.notifier.notify() {
            // Nobody will take this request; leave the slot open for the next frame.
            self.present_queued.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[derive(Default)]
    struct CountingNotifier(Arc<AtomicUsize>);

    impl PresentNotifier for CountingNotifier {
        fn notify(&self) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    /// Drops the first `fail` posts, as a full event queue would.
    struct LossyNotifier {
        calls: Arc<AtomicUsize>,
        fail: usize,
    }

    impl PresentNotifier for LossyNotifier {
        fn notify(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) >= self.fail
        }
    }

    fn context(notifies: Arc<AtomicUsize>) -> SharedFrameContext {
        let format = VideoFormat::packed(PixelFormat::Rv32, Resolution::new(64, 36));
        SharedFrameContext::new(format, Resolution::new(32, 18), Box::new(CountingNotifier(notifies)))
    }

    #[test]
    fn writers_are_mutually_exclusive() {
        let ctx = Arc::new(context(Arc::default()));
        let held = Arc::new(AtomicUsize::new(0));
        let max_held = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ctx = Arc::clone(&ctx);
                let held = Arc::clone(&held);
                let max_held = Arc::clone(&max_held);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let mut frame = ctx.begin_frame_write();
                        let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                        max_held.fetch_max(now, Ordering::SeqCst);
                        frame.pixels_mut()[0] = i as u8;
                        thread::yield_now();
                        held.fetch_sub(1, Ordering::SeqCst);
                        ctx.end_frame_write(frame);
                    }
                })
            })
            .collect();

        // Readers on the present path contend for the same lock.
        for _ in 0..200 {
            ctx.with_frame(|_| {
                let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                max_held.fetch_max(now, Ordering::SeqCst);
                held.fetch_sub(1, Ordering::SeqCst);
            });
        }

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_held.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.frames_written(), 8 * 200);
    }

    #[test]
    fn lease_exposes_full_frame() {
        let ctx = context(Arc::default());
        let mut frame = ctx.begin_frame_write();
        assert_eq!(frame.pitch(), 64 * 4);
        assert_eq!(frame.pixels_mut().len(), 64 * 4 * 36);
        ctx.end_frame_write(frame);
    }

    #[test]
    fn committed_frame_is_fresh_once() {
        let ctx = context(Arc::default());
        let mut frame = ctx.begin_frame_write();
        frame.pixels_mut()[0] = 0xAB;
        ctx.end_frame_write(frame);

        let first = ctx.with_frame(|view| view.fresh.map(|p| p[0]));
        assert_eq!(first, Some(0xAB));
        let second = ctx.with_frame(|view| view.fresh.is_some());
        assert!(!second);
        assert_eq!(ctx.frames_presented(), 2);
    }

    #[test]
    fn window_size_is_clamped_to_texture() {
        let ctx = context(Arc::default());
        assert_eq!(ctx.display_rect(), DisplayRect { x: 0, y: 0, width: 32, height: 18 });

        let rect = ctx.set_window_size(100, 20);
        assert_eq!(rect.size(), Resolution::new(64, 20));
        assert_eq!(ctx.with_frame(|view| view.rect), rect);
    }

    #[test]
    fn present_requests_are_coalesced() {
        let notifies = Arc::new(AtomicUsize::new(0));
        let ctx = context(Arc::clone(&notifies));

        ctx.present_frame();
        ctx.present_frame();
        assert_eq!(notifies.load(Ordering::SeqCst), 1);

        assert!(ctx.take_present_request());
        assert!(!ctx.take_present_request());
        ctx.present_frame();
        assert_eq!(notifies.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn lost_wake_up_does_not_block_later_presents() {
        let calls = Arc::new(AtomicUsize::new(0));
        let format = VideoFormat::packed(PixelFormat::Rv32, Resolution::new(64, 36));
        let notifier = LossyNotifier { calls: Arc::clone(&calls), fail: 1 };
        let ctx = SharedFrameContext::new(format, Resolution::new(32, 18), Box::new(notifier));

        for _ in 0..1000 {
            let frame = ctx.begin_frame_write();
            ctx.end_frame_write(frame);
            ctx.present_frame();
        }

        // First post lost, second delivered; the rest coalesce behind it.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(ctx.take_present_request());
        ctx.present_frame();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
