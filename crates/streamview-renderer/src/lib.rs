//! streamview-renderer: window, renderer and streaming texture.
//!
//! The player talks to the window system through two traits:
//! - [`VideoBackend`] owns the subsystem: render driver enumeration, hints,
//!   window/renderer creation and the event queue.
//! - [`Renderer`] owns the accelerated renderer and its one streaming texture.
//!
//! Renderer objects are bound to the thread that created them. Engine threads
//! never call into a `Renderer`; they wake the owning thread through the
//! [`PresentNotifier`] handed out by the backend.
//!
//! [`SdlBackend`] is the production implementation.

use std::time::Duration;

use streamview_core::{BackendError, DisplayRect, InputEvent, PresentNotifier, Resolution, WindowConfig};

mod sdl;

pub use sdl::{SdlBackend, SdlRenderer};

// MARK: - RenderDriverInfo

/// One available rendering backend, as reported by the window system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDriverInfo {
    pub name: String,
    pub max_texture_width: u32,
    pub max_texture_height: u32,
}

// MARK: - RenderHint

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderHint {
    /// Linear filtering when the texture is scaled.
    LinearScaling,
    /// Present synchronised to the display refresh.
    Vsync,
}

// MARK: - Color

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT_BLACK: Self = Self { r: 0, g: 0, b: 0, a: 0 };
}

// MARK: - VideoBackend

pub trait VideoBackend {
    type Window;
    type Renderer: Renderer;

    fn render_drivers(&self) -> Vec<RenderDriverInfo>;

    /// Set a global rendering hint. Returns whether it was accepted.
    fn set_hint(&mut self, hint: RenderHint) -> bool;

    fn create_window(&mut self, config: &WindowConfig) -> Result<Self::Window, BackendError>;

    /// Create a hardware-accelerated renderer bound to `window`.
    fn create_renderer(&mut self, window: Self::Window) -> Result<Self::Renderer, BackendError>;

    /// Next pending event, without blocking.
    fn poll_event(&mut self) -> Option<InputEvent>;

    /// Next event, waiting at most `timeout`.
    fn wait_event(&mut self, timeout: Duration) -> Option<InputEvent>;

    /// Handle engine threads use to post [`InputEvent::PresentRequested`].
    fn present_notifier(&self) -> Result<Box<dyn PresentNotifier>, BackendError>;
}

// MARK: - Renderer

pub trait Renderer {
    /// Create the streaming texture (32-bit packed RGB) the frames land in.
    fn create_streaming_texture(&mut self, size: Resolution) -> Result<(), BackendError>;

    /// Lock the texture, copy a full frame into it, unlock.
    fn update_texture(&mut self, pixels: &[u8], pitch: usize) -> Result<(), BackendError>;

    fn set_draw_color(&mut self, color: Color);

    fn clear(&mut self);

    /// Copy the whole texture, scaled, into `dst`.
    fn copy_texture(&mut self, dst: DisplayRect) -> Result<(), BackendError>;

    fn present(&mut self);

    /// Reset the viewport to the whole output.
    fn reset_viewport(&mut self);
}
