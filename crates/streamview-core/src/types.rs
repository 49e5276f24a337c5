use serde::{Deserialize, Serialize};

// MARK: - Resolution

/// Width × height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Self = Self { width: 1280, height: 720 };
    pub const FHD: Self = Self { width: 1920, height: 1080 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamp a requested size to this resolution, per axis.
    ///
    /// Window systems report sizes as signed integers, so anything below 1
    /// is raised to 1.
    pub fn clamp(&self, width: i32, height: i32) -> Resolution {
        Resolution {
            width: (width.max(1) as u32).min(self.width),
            height: (height.max(1) as u32).min(self.height),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// MARK: - DisplayRect

/// Destination rectangle the texture is scaled into on present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayRect {
    /// Rectangle anchored at the origin covering `size`.
    pub fn covering(size: Resolution) -> Self {
        Self { x: 0, y: 0, width: size.width, height: size.height }
    }

    pub fn size(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

// MARK: - PixelFormat

/// 32-bit packed pixel layouts the bridge can hand to an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Packed RGB, one padding byte: B, G, R, X in memory on little endian.
    Rv32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rv32 => 4,
        }
    }

    /// Four-character tag engines use for the format.
    pub fn fourcc(&self) -> &'static str {
        match self {
            Self::Rv32 => "RV32",
        }
    }
}

// MARK: - VideoFormat

/// Format declaration handed to the engine before playback starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub pixel_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub pitch: usize,
}

impl VideoFormat {
    /// Tightly packed rows at `size`.
    pub fn packed(pixel_format: PixelFormat, size: Resolution) -> Self {
        Self {
            pixel_format,
            width: size.width,
            height: size.height,
            pitch: size.width as usize * pixel_format.bytes_per_pixel(),
        }
    }

    pub fn frame_len(&self) -> usize {
        self.pitch * self.height as usize
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}
