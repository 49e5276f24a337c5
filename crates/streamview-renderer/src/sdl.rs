use std::sync::Mutex;
use std::time::Duration;

use sdl2::event::{Event, EventSender, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;
use sdl2::render::{Texture, WindowCanvas};
use sdl2::video::Window;
use sdl2::{EventPump, EventSubsystem, Sdl, VideoSubsystem};
use streamview_core::{
    BackendError, DisplayRect, InputEvent, Key, PresentNotifier, Resolution, WindowConfig,
};
use tracing::{debug, info, warn};

use crate::{Color, RenderDriverInfo, RenderHint, Renderer, VideoBackend};

fn sdl_err(e: impl ToString) -> BackendError {
    BackendError::Sdl(e.to_string())
}

/// Payload of the custom event engine threads push to request a present.
struct PresentEvent;

// ── SdlBackend ─────────────────────────────────────────────────────────────────

/// SDL video + event subsystems. Must live on the main thread.
pub struct SdlBackend {
    // Field order is drop order: the pump and subsystems go before the context.
    pump: EventPump,
    events: EventSubsystem,
    video: VideoSubsystem,
    _sdl: Sdl,
}

impl SdlBackend {
    pub fn init() -> Result<Self, BackendError> {
        let sdl = sdl2::init().map_err(sdl_err)?;
        let video = sdl.video().map_err(sdl_err)?;
        let events = sdl.event().map_err(sdl_err)?;
        events.register_custom_event::<PresentEvent>().map_err(sdl_err)?;
        let pump = sdl.event_pump().map_err(sdl_err)?;
        info!("SDL video driver: {}", video.current_video_driver());
        Ok(Self { pump, events, video, _sdl: sdl })
    }
}

impl VideoBackend for SdlBackend {
    type Window = Window;
    type Renderer = SdlRenderer;

    fn render_drivers(&self) -> Vec<RenderDriverInfo> {
        sdl2::render::drivers()
            .map(|info| RenderDriverInfo {
                name: info.name.to_string(),
                max_texture_width: info.max_texture_width,
                max_texture_height: info.max_texture_height,
            })
            .collect()
    }

    fn set_hint(&mut self, hint: RenderHint) -> bool {
        let (name, value) = match hint {
            RenderHint::LinearScaling => ("SDL_RENDER_SCALE_QUALITY", "linear"),
            RenderHint::Vsync => ("SDL_RENDER_VSYNC", "1"),
        };
        sdl2::hint::set(name, value)
    }

    fn create_window(&mut self, config: &WindowConfig) -> Result<Window, BackendError> {
        self.video
            .window(&config.title, config.size.width, config.size.height)
            .position_centered()
            .resizable()
            .build()
            .map_err(sdl_err)
    }

    fn create_renderer(&mut self, window: Window) -> Result<SdlRenderer, BackendError> {
        let canvas = window.into_canvas().accelerated().build().map_err(sdl_err)?;
        let info = canvas.info();
        debug!("Renderer '{}' created (flags={:#x})", info.name, info.flags);
        Ok(SdlRenderer { texture: None, canvas })
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        // Skip events the player has no use for instead of surfacing them.
        while let Some(event) = self.pump.poll_event() {
            if let Some(ev) = translate(&event) {
                return Some(ev);
            }
        }
        None
    }

    fn wait_event(&mut self, timeout: Duration) -> Option<InputEvent> {
        self.pump
            .wait_event_timeout(timeout_ms(timeout))
            .and_then(|event| translate(&event))
    }

    fn present_notifier(&self) -> Result<Box<dyn PresentNotifier>, BackendError> {
        Ok(Box::new(SdlPresentNotifier { sender: Mutex::new(self.events.event_sender()) }))
    }
}

/// Whole milliseconds for SDL, rounded up so a sub-millisecond wait still blocks.
fn timeout_ms(timeout: Duration) -> u32 {
    timeout.as_nanos().div_ceil(1_000_000).min(u32::MAX as u128) as u32
}

/// Map an SDL event to the player's event set.
fn translate(event: &Event) -> Option<InputEvent> {
    match event {
        Event::Quit { .. } => Some(InputEvent::Quit),
        Event::Window { win_event: WindowEvent::Resized(width, height), .. } => {
            Some(InputEvent::Resized { width: *width, height: *height })
        }
        Event::KeyDown { keycode, .. } => Some(InputEvent::KeyDown(map_key(*keycode))),
        ev if ev.is_user_event() => ev
            .as_user_event_type::<PresentEvent>()
            .map(|_| InputEvent::PresentRequested),
        _ => None,
    }
}

fn map_key(keycode: Option<Keycode>) -> Key {
    match keycode {
        Some(Keycode::Escape) => Key::Escape,
        Some(Keycode::Q) => Key::Q,
        Some(Keycode::Space) => Key::Space,
        _ => Key::Other,
    }
}

// ── SdlPresentNotifier ─────────────────────────────────────────────────────────

struct SdlPresentNotifier {
    sender: Mutex<EventSender>,
}

impl PresentNotifier for SdlPresentNotifier {
    fn notify(&self) -> bool {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match sender.push_custom_event(PresentEvent) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to post present request, retrying on next frame: {}", e);
                false
            }
        }
    }
}

// ── SdlRenderer ────────────────────────────────────────────────────────────────

/// Accelerated SDL renderer plus its streaming texture.
pub struct SdlRenderer {
    texture: Option<Texture>,
    canvas: WindowCanvas,
}

impl Renderer for SdlRenderer {
    fn create_streaming_texture(&mut self, size: Resolution) -> Result<(), BackendError> {
        let texture = self
            .canvas
            .texture_creator()
            .create_texture_streaming(PixelFormatEnum::ARGB8888, size.width, size.height)
            .map_err(sdl_err)?;
        if let Some(old) = self.texture.replace(texture) {
            // SAFETY: the old texture belongs to this canvas's renderer, which is still alive.
            unsafe { old.destroy() };
        }
        info!("Streaming texture {} ARGB8888", size);
        Ok(())
    }

    fn update_texture(&mut self, pixels: &[u8], pitch: usize) -> Result<(), BackendError> {
        let texture = self.texture.as_mut().ok_or(BackendError::NoTexture)?;
        let query = texture.query();
        let row_len = query.width as usize * 4;
        let expected = pitch * query.height as usize;
        if pixels.len() < expected || pitch < row_len {
            return Err(BackendError::FrameSize { expected, got: pixels.len() });
        }
        texture
            .with_lock(None::<Rect>, |buf: &mut [u8], dst_pitch: usize| {
                for (dst, src) in buf.chunks_mut(dst_pitch).zip(pixels.chunks(pitch)) {
                    dst[..row_len].copy_from_slice(&src[..row_len]);
                }
            })
            .map_err(sdl_err)
    }

    fn set_draw_color(&mut self, color: Color) {
        self.canvas
            .set_draw_color(sdl2::pixels::Color::RGBA(color.r, color.g, color.b, color.a));
    }

    fn clear(&mut self) {
        self.canvas.clear();
    }

    fn copy_texture(&mut self, dst: DisplayRect) -> Result<(), BackendError> {
        let texture = self.texture.as_ref().ok_or(BackendError::NoTexture)?;
        let rect = Rect::new(dst.x, dst.y, dst.width, dst.height);
        self.canvas.copy(texture, None::<Rect>, Some(rect)).map_err(sdl_err)
    }

    fn present(&mut self) {
        self.canvas.present();
    }

    fn reset_viewport(&mut self) {
        self.canvas.set_viewport(None::<Rect>);
    }
}

impl Drop for SdlRenderer {
    fn drop(&mut self) {
        if let Some(texture) = self.texture.take() {
            // SAFETY: destroyed before `canvas`, which owns the SDL renderer.
            unsafe { texture.destroy() };
        }
    }
}
