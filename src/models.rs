//! Configuration model of the panelvis daemon

use std::path::{Path, PathBuf};

use derive_more::From;
use serde_derive::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::image::Rotation;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("error parsing configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("error serializing configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_frame_count() -> u32 {
    5
}

fn default_period_ms() -> u64 {
    1000
}

/// Frame acquisition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Capture {
    #[validate(nested)]
    pub grabber: Grabber,
    /// Number of consecutive frames averaged into one composite frame
    #[validate(range(min = 1, max = 64))]
    pub frame_count: u32,
    /// Delay after the first failed grab, grows linearly with consecutive failures
    pub retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    /// Number of consecutive failed grabs before the grabber is reopened
    #[validate(range(min = 1))]
    pub reopen_after: u32,
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            grabber: Grabber::default(),
            frame_count: default_frame_count(),
            retry_delay_ms: 100,
            max_retry_delay_ms: 2000,
            reopen_after: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Any,
    Ffmpeg,
    Gstreamer,
}

impl Default for Backend {
    fn default() -> Self {
        Self::Ffmpeg
    }
}

/// Live capture through a video backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Stream {
    #[validate(length(min = 1))]
    pub uri: String,
    pub backend: Backend,
    /// Longest time opening the stream may block
    #[validate(range(min = 1))]
    pub open_timeout_ms: u32,
    /// Longest time a single grab may block before it fails
    #[validate(range(min = 1))]
    pub read_timeout_ms: u32,
}

impl Default for Stream {
    fn default() -> Self {
        Self {
            uri: "udp://@239.0.0.10:5000".to_owned(),
            backend: Backend::default(),
            open_timeout_ms: 10_000,
            read_timeout_ms: 5_000,
        }
    }
}

/// Replay of still images, cycled in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Stills {
    #[validate(length(min = 1))]
    pub paths: Vec<PathBuf>,
    /// Time between two frames, emulating the camera frame rate
    pub interval_ms: u64,
}

impl Default for Stills {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            interval_ms: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr, From)]
#[serde(rename_all = "lowercase", tag = "type", deny_unknown_fields)]
pub enum Grabber {
    Stream(Stream),
    Stills(Stills),
}

impl Default for Grabber {
    fn default() -> Self {
        Self::Stream(Stream::default())
    }
}

impl Validate for Grabber {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Grabber::Stream(grabber) => grabber.validate(),
            Grabber::Stills(grabber) => grabber.validate(),
        }
    }
}

fn validate_corner_indices(indices: &[usize; 4]) -> Result<(), ValidationError> {
    if indices.iter().all(|&i| i < 4) {
        Ok(())
    } else {
        Err(ValidationError::new("corner_index_out_of_range"))
    }
}

fn validate_marker_ids(ids: &[i32; 4]) -> Result<(), ValidationError> {
    let mut sorted = *ids;
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        Err(ValidationError::new("duplicate_marker_id"))
    } else {
        Ok(())
    }
}

/// Geometric calibration of the camera against the panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Calibration {
    /// Rotation applied to raw frames before detection
    pub rotation: Rotation,
    /// Marker IDs stuck to the panel, clockwise from the top left
    #[validate(custom(function = "validate_marker_ids"))]
    pub marker_ids: [i32; 4],
    /// Corner of each marker that lies on the outer panel rectangle
    #[validate(custom(function = "validate_corner_indices"))]
    pub corner_indices: [usize; 4],
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            rotation: Rotation::default(),
            marker_ids: [100, 101, 102, 103],
            corner_indices: [0, 1, 2, 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArucoDictionary {
    #[serde(rename = "4x4_50")]
    Dict4x4_50,
    #[serde(rename = "4x4_100")]
    Dict4x4_100,
    #[serde(rename = "4x4_250")]
    Dict4x4_250,
    #[serde(rename = "4x4_1000")]
    Dict4x4_1000,
}

impl Default for ArucoDictionary {
    fn default() -> Self {
        Self::Dict4x4_250
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Aruco {
    pub dictionary: ArucoDictionary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedMarker {
    pub id: i32,
    pub corners: [[f32; 2]; 4],
}

/// Markers pinned in the configuration, for rigidly mounted cameras
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Fixed {
    pub markers: Vec<FixedMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr, From)]
#[serde(rename_all = "lowercase", tag = "type", deny_unknown_fields)]
pub enum Detector {
    Aruco(Aruco),
    Fixed(Fixed),
}

impl Default for Detector {
    fn default() -> Self {
        Self::Aruco(Aruco::default())
    }
}

impl Validate for Detector {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Detector::Aruco(detector) => detector.validate(),
            Detector::Fixed(detector) => detector.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Udp {
    /// `host:port` the state datagrams are sent to
    #[validate(length(min = 1))]
    pub address: String,
}

impl Default for Udp {
    fn default() -> Self {
        Self {
            address: "localhost:64000".to_owned(),
        }
    }
}

/// Where decoded panel states are sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase", tag = "type", deny_unknown_fields)]
pub enum Method {
    Udp(Udp),
    Stdout,
}

impl Default for Method {
    fn default() -> Self {
        Self::Udp(Udp::default())
    }
}

impl Validate for Method {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Method::Udp(method) => method.validate(),
            Method::Stdout => Ok(()),
        }
    }
}

fn default_gpio_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

/// Status LED driven through the sysfs GPIO interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Gpio {
    pub pin: u32,
    #[serde(default)]
    pub active_low: bool,
    #[serde(default = "default_gpio_root")]
    pub sysfs_root: PathBuf,
}

/// Sink for the "panel currently readable" signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase", tag = "type", deny_unknown_fields)]
pub enum Status {
    None,
    Log,
    Gpio(Gpio),
}

impl Default for Status {
    fn default() -> Self {
        Self::Log
    }
}

impl Validate for Status {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Status::Gpio(gpio) => gpio.validate(),
            Status::None | Status::Log => Ok(()),
        }
    }
}

/// Diagnostic overlay output
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Overlay {
    /// PNG file rewritten after every decode cycle
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Time between two decode cycles
    #[validate(range(min = 1))]
    pub period_ms: u64,
    #[validate(nested)]
    pub capture: Capture,
    #[validate(nested)]
    pub calibration: Calibration,
    #[validate(nested)]
    pub detector: Detector,
    #[validate(nested)]
    pub method: Method,
    #[validate(nested)]
    pub status: Status,
    #[validate(nested)]
    pub overlay: Overlay,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            capture: Capture::default(),
            calibration: Calibration::default(),
            detector: Detector::default(),
            method: Method::default(),
            status: Status::default(),
            overlay: Overlay::default(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML configuration
    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let data = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&data)
    }

    pub fn to_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
