pub mod config;
pub mod errors;
pub mod frame;
pub mod input;
pub mod types;

pub use config::{redact_credentials, EngineOptions, PlayerConfig, WindowConfig};
pub use errors::{BackendError, ConfigError, EngineError, PlaybackError};
pub use frame::{FrameSink, FrameView, FrameWrite, PresentNotifier, SharedFrameContext};
pub use input::{Action, InputEvent, Key};
pub use types::*;
