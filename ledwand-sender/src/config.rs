//! Configuration for the sender service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ledwand_core::{
    ByteOrder, DEFAULT_BIAS, DEFAULT_PORT, Dimensions, LedwandError, LumaWeights, MAX_PACKET_SIZE,
    StreamConfig,
};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Display connection settings.
    pub network: NetworkConfig,
    /// Frame geometry and start-up state.
    pub display: DisplayConfig,
    /// Packet layout and pacing.
    pub stream: StreamSettings,
    /// Where frames come from.
    pub source: SourceConfig,
    /// Frame loop timing.
    pub timing: TimingConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Literal IP address of the display wall.
    pub address: String,
    /// UDP port of the display wall.
    pub port: u16,
    /// Byte order of the 16-bit header fields.
    pub byte_order: ByteOrder,
    /// Largest datagram the display accepts.
    pub max_packet_size: usize,
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Framebuffer width in pixels (multiple of 8).
    pub width: usize,
    /// Framebuffer height in pixels.
    pub height: usize,
    /// Greyscale cutoff; samples above it light up.
    pub bias: u8,
    /// Brightness sent once at start-up.
    pub brightness: Option<u8>,
    /// Clear the display before the first frame.
    pub clear_on_start: bool,
}

/// Streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Packed rows per draw packet.
    pub band_rows: usize,
    /// Source rows skipped after each band (module gaps).
    pub gap_rows: usize,
    /// Delay between band packets in microseconds.
    pub packet_delay_us: u64,
    /// Parts per whole-buffer draw.
    pub parts: usize,
    /// Delay between whole-buffer parts in microseconds.
    pub part_delay_us: u64,
}

/// Kind of frame source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Built-in moving gradient.
    #[default]
    Pattern,
    /// Raw 8-bit greyscale file.
    Grey,
    /// Raw 32-bit XRGB file.
    Xrgb,
    /// Pre-packed 1-bit bitmap, drawn without dithering.
    Bitmap,
}

/// Frame source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// File path for file-backed sources.
    pub path: Option<PathBuf>,
    /// Colour to grey weights for `xrgb` sources.
    pub weights: LumaWeights,
}

/// Frame loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Target frames per second.
    pub fps: u8,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "172.23.42.29".into(),
            port: DEFAULT_PORT,
            byte_order: ByteOrder::Little,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let dims = Dimensions::REFERENCE;
        Self {
            width: dims.width(),
            height: dims.height(),
            bias: DEFAULT_BIAS,
            brightness: None,
            clear_on_start: true,
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        let defaults = StreamConfig::default();
        Self {
            band_rows: defaults.band_rows,
            gap_rows: defaults.gap_rows,
            packet_delay_us: defaults.packet_delay.as_micros() as u64,
            parts: defaults.parts,
            part_delay_us: defaults.part_delay.as_micros() as u64,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { fps: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl SenderConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Validated frame geometry.
    pub fn dimensions(&self) -> Result<Dimensions, LedwandError> {
        Dimensions::new(self.display.width, self.display.height)
    }

    /// Convert stream settings into a core [`StreamConfig`].
    pub fn to_stream_config(&self) -> StreamConfig {
        StreamConfig {
            band_rows: self.stream.band_rows.max(1),
            gap_rows: self.stream.gap_rows,
            packet_delay: Duration::from_micros(self.stream.packet_delay_us),
            parts: self.stream.parts.max(1),
            part_delay: Duration::from_micros(self.stream.part_delay_us),
        }
    }

    /// Interval between frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.timing.fps.clamp(1, 60)))
    }
}

// ── Tests ────────────────────────────────────────────────────────
