use thiserror::Error;

/// Fatal startup failures. Each one ends the process with its own status.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Configuration invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not initialize video subsystem: {0}")]
    Init(BackendError),

    #[error("Couldn't create window: {0}")]
    WindowCreate(BackendError),

    #[error("Couldn't create renderer: {0}")]
    RendererCreate(BackendError),

    #[error("Couldn't create texture: {0}")]
    TextureCreate(BackendError),

    #[error("Media engine initialization failure: {0}")]
    EngineInit(#[from] EngineError),
}

impl PlaybackError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Init(_) | Self::EngineInit(_) => 1,
            Self::Config(_) => 2,
            Self::WindowCreate(_) => 3,
            Self::RendererCreate(_) => 4,
            Self::TextureCreate(_) => 5,
        }
    }
}

/// Errors reported by the window/renderer backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    Sdl(String),

    #[error("Texture not created")]
    NoTexture,

    #[error("Frame is {got} bytes, texture expects {expected}")]
    FrameSize { expected: usize, got: usize },
}

/// Errors reported by the media engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine initialization failed: {0}")]
    Init(String),

    #[error("Required element '{0}' not found")]
    MissingElement(&'static str),

    #[error("Invalid stream location '{0}'")]
    InvalidLocation(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Player has no callbacks registered")]
    NoCallbacks,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No stream location given (pass a URL or set STREAMVIEW_URL)")]
    MissingLocation,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_step() {
        let sdl = || BackendError::Sdl("boom".into());
        assert_eq!(PlaybackError::Init(sdl()).exit_code(), 1);
        assert_eq!(PlaybackError::WindowCreate(sdl()).exit_code(), 3);
        assert_eq!(PlaybackError::RendererCreate(sdl()).exit_code(), 4);
        assert_eq!(PlaybackError::TextureCreate(sdl()).exit_code(), 5);
        assert_eq!(PlaybackError::EngineInit(EngineError::Init("x".into())).exit_code(), 1);
        assert_eq!(PlaybackError::Config(ConfigError::MissingLocation).exit_code(), 2);
    }

    #[test]
    fn message_carries_subsystem_cause() {
        let err = PlaybackError::WindowCreate(BackendError::Sdl("No available video device".into()));
        assert_eq!(err.to_string(), "Couldn't create window: No available video device");
    }
}
