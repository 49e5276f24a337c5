use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use streamview_core::{
    Action, EngineError, EngineOptions, FrameSink, InputEvent, Key, PixelFormat, PlaybackError,
    PlayerConfig, SharedFrameContext, VideoFormat,
};
use streamview_decoder::{GstEngine, MediaEngine, MediaPlayer};
use streamview_renderer::{Color, RenderHint, Renderer, SdlBackend, VideoBackend};
use tracing::{debug, error, info, warn};

use crate::cli::Cli;

/// Full player lifecycle: config → startup → main loop → teardown.
///
/// Every startup failure comes back as a [`PlaybackError`]; `main` turns it
/// into the process exit status.
pub fn run(cli: Cli) -> Result<PlaybackStats, PlaybackError> {
    let config = cli.into_config()?;
    info!("Stream: {}", config.redacted_location());

    let backend = SdlBackend::init().map_err(PlaybackError::Init)?;
    let mut playback = Playback::start(backend, &config, GstEngine::new)?;
    playback.run();
    Ok(playback.shutdown())
}

// ── PlaybackState ──────────────────────────────────────────────────────────────

/// Main-thread state machine.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub done: bool,
    pub paused: bool,
    /// Main-loop ticks while not paused. Not a count of decoded frames.
    pub heartbeat: u64,
}

impl PlaybackState {
    pub fn apply(&mut self, key: Key) {
        match key.action() {
            Some(Action::Quit) => self.done = true,
            Some(Action::TogglePause) => {
                self.paused = !self.paused;
                info!("Pause toggled (paused={})", self.paused);
            }
            None => {}
        }
    }

    pub fn advance(&mut self) {
        if !self.paused {
            self.heartbeat += 1;
        }
    }
}

// ── PlaybackStats ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStats {
    pub heartbeat: u64,
    pub frames_written: u64,
    pub frames_presented: u64,
}

// ── Playback ───────────────────────────────────────────────────────────────────

/// The bridge between one media player and one renderer.
pub struct Playback<B: VideoBackend, E: MediaEngine> {
    backend:  B,
    renderer: B::Renderer,
    context:  Arc<SharedFrameContext>,
    engine:   E,
    media:    E::Media,
    player:   E::Player,
    state:    PlaybackState,
    poll_interval: Duration,
    /// Events that arrived while idling, handled on the next drain.
    deferred: VecDeque<InputEvent>,
}

impl<B: VideoBackend, E: MediaEngine> Playback<B, E> {
    /// Bring everything up in order. The first failing step aborts startup
    /// and whatever was already created is released on the way out.
    pub fn start<F>(mut backend: B, config: &PlayerConfig, engine_init: F) -> Result<Self, PlaybackError>
    where
        F: FnOnce(&EngineOptions) -> Result<E, EngineError>,
    {
        let window = backend
            .create_window(&config.window)
            .map_err(PlaybackError::WindowCreate)?;
        info!("Window '{}' {}", config.window.title, config.window.size);

        for (i, driver) in backend.render_drivers().iter().enumerate() {
            info!(
                "Render driver {}: {} (max texture {}x{})",
                i, driver.name, driver.max_texture_width, driver.max_texture_height
            );
        }

        for hint in [RenderHint::LinearScaling, RenderHint::Vsync] {
            if !backend.set_hint(hint) {
                warn!("Render hint {:?} not accepted", hint);
            }
        }

        let mut renderer = backend
            .create_renderer(window)
            .map_err(PlaybackError::RendererCreate)?;

        let texture_size = config.window.texture_size;
        renderer
            .create_streaming_texture(texture_size)
            .map_err(PlaybackError::TextureCreate)?;

        let format = VideoFormat::packed(PixelFormat::Rv32, texture_size);
        let notifier = backend.present_notifier().map_err(PlaybackError::Init)?;
        let context = Arc::new(SharedFrameContext::new(format, config.window.size, notifier));

        let engine = engine_init(&config.engine)?;
        let media = engine.new_media(&config.location)?;
        let mut player = engine.new_player(&media)?;

        let sink: Arc<dyn FrameSink> = context.clone();
        player.set_callbacks(sink);
        player.set_format(format);
        player.play()?;
        info!("Playback started");

        Ok(Self {
            backend,
            renderer,
            context,
            engine,
            media,
            player,
            state: PlaybackState::default(),
            poll_interval: config.poll_interval(),
            deferred: VecDeque::new(),
        })
    }

    /// Run the main loop until quit.
    pub fn run(&mut self) {
        while !self.state.done {
            self.tick();
        }
        info!("Main loop finished after {} ticks", self.state.heartbeat);
    }

    /// One main-loop iteration: drain events, apply the key action, advance
    /// the heartbeat, idle.
    fn tick(&mut self) {
        let mut action = None;
        while let Some(event) = self.next_event() {
            match event {
                InputEvent::Resized { width, height } => self.resize(width, height),
                InputEvent::Quit => self.state.done = true,
                InputEvent::KeyDown(key) => action = Some(key),
                InputEvent::PresentRequested => self.present(),
            }
        }

        if let Some(key) = action {
            self.state.apply(key);
        }
        self.state.advance();

        if !self.state.done {
            self.idle();
        }
    }

    fn next_event(&mut self) -> Option<InputEvent> {
        self.deferred.pop_front().or_else(|| self.backend.poll_event())
    }

    /// Wait out the poll interval, presenting frames as they are requested.
    fn idle(&mut self) {
        let deadline = Instant::now() + self.poll_interval;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.backend.wait_event(deadline - now) {
                Some(InputEvent::PresentRequested) => self.present(),
                Some(other) => self.deferred.push_back(other),
                None => {}
            }
        }
    }

    /// Upload the committed frame (under the context lock), then draw it
    /// scaled into the display rectangle.
    fn present(&mut self) {
        if !self.context.take_present_request() {
            return;
        }
        let renderer = &mut self.renderer;
        let rect = self.context.with_frame(|view| {
            if let Some(pixels) = view.fresh {
                if let Err(e) = renderer.update_texture(pixels, view.pitch) {
                    warn!("Texture upload failed: {}", e);
                }
            }
            view.rect
        });

        renderer.set_draw_color(Color::TRANSPARENT_BLACK);
        renderer.clear();
        if let Err(e) = renderer.copy_texture(rect) {
            warn!("Texture copy failed: {}", e);
        }
        renderer.present();
    }

    /// Stop the player, blank the window, adopt the clamped size, restart.
    fn resize(&mut self, width: i32, height: i32) {
        info!("Window resized to {}x{}", width, height);
        self.player.stop();

        self.renderer.set_draw_color(Color::TRANSPARENT_BLACK);
        self.renderer.clear();
        self.renderer.present();
        self.renderer.reset_viewport();

        let rect = self.context.set_window_size(width, height);
        debug!("Display rect now {}x{}", rect.width, rect.height);

        if let Err(e) = self.player.play() {
            error!("Failed to restart playback after resize: {}", e);
        }
    }

    /// Release everything in reverse dependency order: player (stopped
    /// first), media, engine, shared context, renderer, window subsystem.
    pub fn shutdown(self) -> PlaybackStats {
        let Playback { backend, renderer, context, engine, media, mut player, state, .. } = self;

        player.stop();
        drop(player);
        drop(media);
        drop(engine);

        let stats = PlaybackStats {
            heartbeat: state.heartbeat,
            frames_written: context.frames_written(),
            frames_presented: context.frames_presented(),
        };
        drop(context);
        drop(renderer);
        drop(backend);

        info!(
            "Shutdown complete: {} ticks, {} frames written, {} presented",
            stats.heartbeat, stats.frames_written, stats.frames_presented
        );
        stats
    }
}
