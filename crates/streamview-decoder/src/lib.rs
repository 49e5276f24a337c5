//! streamview-decoder: network stream decoding.
//!
//! The engine opens a stream location, decodes it and writes every frame into
//! a [`FrameSink`] through the begin-write / end-write / present contract.
//! The player never hands decoded frames back to the caller; frame delivery is
//! push-driven from the engine's own streaming threads.
//!
//! # Pipeline
//! ```text
//! uridecodebin(rtspsrc …) → videoconvert → videoscale → video/x-raw,format=BGRx,WxH → appsink
//! ```
//! `BGRx` is the in-memory byte order of `RV32` and of an ARGB8888 texture on
//! little endian, so frames are copied row by row without conversion.

use std::sync::Arc;

use streamview_core::{EngineError, FrameSink, VideoFormat};

mod pipeline;

pub use pipeline::{GstEngine, GstMedia, GstPlayer};

// MARK: - MediaEngine

/// An engine instance. Releasing it is dropping it.
pub trait MediaEngine {
    type Media;
    type Player: MediaPlayer;

    /// Media reference for a location URI.
    fn new_media(&self, location: &str) -> Result<Self::Media, EngineError>;

    /// Player bound to `media`.
    fn new_player(&self, media: &Self::Media) -> Result<Self::Player, EngineError>;
}

// MARK: - MediaPlayer

pub trait MediaPlayer {
    /// Register the frame callbacks. Must happen before [`MediaPlayer::play`].
    fn set_callbacks(&mut self, sink: Arc<dyn FrameSink>);

    /// Declare the pixel format, size and row stride frames are written in.
    fn set_format(&mut self, format: VideoFormat);

    fn play(&mut self) -> Result<(), EngineError>;

    /// Stop playback. No callback is in flight once this returns.
    fn stop(&mut self);
}

// MARK: - Row copy

/// Copy `src` rows of stride `src_stride` into `dst` rows of stride
/// `dst_stride`, `min(strides)` bytes per row.
pub fn copy_rows(dst: &mut [u8], dst_stride: usize, src: &[u8], src_stride: usize) {
    if dst_stride == 0 || src_stride == 0 {
        return;
    }
    let row_len = dst_stride.min(src_stride);
    for (d, s) in dst.chunks_mut(dst_stride).zip(src.chunks(src_stride)) {
        let n = row_len.min(d.len()).min(s.len());
        d[..n].copy_from_slice(&s[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::copy_rows;

    #[test]
    fn copies_equal_strides() {
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0u8; 16];
        copy_rows(&mut dst, 8, &src, 8);
        assert_eq!(dst, src);
    }

    #[test]
    fn drops_source_row_padding() {
        // 2 rows of 4 bytes, source padded to 6.
        let src = [1, 2, 3, 4, 0xEE, 0xEE, 5, 6, 7, 8, 0xEE, 0xEE];
        let mut dst = [0u8; 8];
        copy_rows(&mut dst, 4, &src, 6);
        assert_eq!(dst, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn short_source_leaves_remaining_rows() {
        let src = [9u8; 4];
        let mut dst = [0u8; 8];
        copy_rows(&mut dst, 4, &src, 4);
        assert_eq!(dst, [9, 9, 9, 9, 0, 0, 0, 0]);
    }
}
