use std::path::PathBuf;

use clap::Parser;
use streamview_core::{ConfigError, PlayerConfig, Resolution};

/// Play a network video stream in a window.
///
/// Keys: Space toggles pause, Escape or q quits.
#[derive(Parser, Debug)]
#[command(name = "streamview", version)]
pub struct Cli {
    /// Stream location, e.g. rtsp://camera.local/stream1
    #[arg(env = "STREAMVIEW_URL", hide_env_values = true)]
    pub url: Option<String>,

    /// JSON config file; flags given here override it
    #[arg(short, long, env = "STREAMVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Initial window size, WxH
    #[arg(long, value_parser = parse_size)]
    pub window_size: Option<Resolution>,

    /// Decoded video size and upper bound for the display area, WxH
    #[arg(long, value_parser = parse_size)]
    pub video_size: Option<Resolution>,

    /// Main loop poll interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Network caching in milliseconds
    #[arg(long)]
    pub caching_ms: Option<u32>,

    /// Let RTSP negotiate UDP transport instead of forcing TCP
    #[arg(long)]
    pub udp: bool,
}

impl Cli {
    /// Merge the config file (if any) with the flags, then validate.
    pub fn into_config(self) -> Result<PlayerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PlayerConfig::from_file(path)?,
            None => PlayerConfig::default(),
        };
        if let Some(url) = self.url {
            config.location = url;
        }
        if let Some(size) = self.window_size {
            config.window.size = size;
        }
        if let Some(size) = self.video_size {
            config.window.texture_size = size;
        }
        if let Some(ms) = self.poll_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(ms) = self.caching_ms {
            config.engine.network_caching_ms = ms;
        }
        if self.udp {
            config.engine.force_tcp = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_size(s: &str) -> Result<Resolution, String> {
    let (w, h) = s
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let width = w.trim().parse::<u32>().map_err(|e| format!("width: {e}"))?;
    let height = h.trim().parse::<u32>().map_err(|e| format!("height: {e}"))?;
    Ok(Resolution::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1920x1080"), Ok(Resolution::FHD));
        assert_eq!(parse_size("800X450"), Ok(Resolution::new(800, 450)));
        assert!(parse_size("800").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "streamview",
            "rtsp://camera.local/stream1",
            "--video-size",
            "1280x720",
            "--poll-ms",
            "50",
            "--udp",
        ])
        .expect("valid args");
        let config = cli.into_config().expect("valid config");
        assert_eq!(config.location, "rtsp://camera.local/stream1");
        assert_eq!(config.window.texture_size, Resolution::HD);
        assert_eq!(config.poll_interval_ms, 50);
        assert!(!config.engine.force_tcp);
        assert_eq!(config.engine.network_caching_ms, 1000);
    }

    #[test]
    fn missing_location_is_a_config_error() {
        let cli = Cli {
            url: None,
            config: None,
            window_size: None,
            video_size: None,
            poll_ms: None,
            caching_ms: None,
            udp: false,
        };
        assert!(matches!(cli.into_config(), Err(ConfigError::MissingLocation)));
    }
}
