use crate::errors::CameraError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Selector value meaning "let the platform pick"
pub const DEFAULT_SELECTION: &str = "default";

/// Identity of one live capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A selectable capture resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOption {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl ResolutionOption {
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
        }
    }

    /// Selector value for this option, `WIDTHxHEIGHT`
    pub fn value(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn fits_within(&self, caps: &TrackCapabilities) -> bool {
        self.width <= caps.max_width && self.height <= caps.max_height
    }
}

/// The fixed reference list, smallest first
pub fn standard_resolutions() -> Vec<ResolutionOption> {
    vec![
        ResolutionOption::new("640x480 (VGA)", 640, 480),
        ResolutionOption::new("1280x720 (HD 720p)", 1280, 720),
        ResolutionOption::new("1920x1080 (Full HD 1080p)", 1920, 1080),
        ResolutionOption::new("3840x2160 (4K UHD)", 3840, 2160),
    ]
}

/// Options offered for a track: standard entries inside the capability
/// range, or the whole standard list when the range is unknown.
pub fn resolution_options_for(caps: Option<&TrackCapabilities>) -> Vec<ResolutionOption> {
    match caps {
        Some(caps) => standard_resolutions()
            .into_iter()
            .filter(|option| option.fits_within(caps))
            .collect(),
        None => standard_resolutions(),
    }
}

/// Parsed resolution selector value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSelection {
    Default,
    Sized { width: u32, height: u32 },
}

impl ResolutionSelection {
    pub fn constraints(&self) -> CaptureConstraints {
        match *self {
            ResolutionSelection::Default => CaptureConstraints::Any,
            ResolutionSelection::Sized { width, height } => {
                CaptureConstraints::Ideal { width, height }
            }
        }
    }
}

impl FromStr for ResolutionSelection {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == DEFAULT_SELECTION {
            return Ok(ResolutionSelection::Default);
        }

        let invalid = || CameraError::InvalidSelection(s.to_string());
        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(ResolutionSelection::Sized { width, height })
    }
}

impl fmt::Display for ResolutionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSelection::Default => write!(f, "{}", DEFAULT_SELECTION),
            ResolutionSelection::Sized { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

/// Capture request handed to the platform.
///
/// Serializes to the wire shape `{"video":true}` or
/// `{"video":{"width":{"ideal":W},"height":{"ideal":H}}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureConstraints {
    Any,
    Ideal { width: u32, height: u32 },
}

impl Serialize for CaptureConstraints {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Ideal {
            ideal: u32,
        }

        #[derive(Serialize)]
        struct Sized {
            width: Ideal,
            height: Ideal,
        }

        #[derive(Serialize)]
        #[serde(untagged)]
        enum Video {
            Any(bool),
            Sized(Sized),
        }

        #[derive(Serialize)]
        struct Wire {
            video: Video,
        }

        let video = match *self {
            CaptureConstraints::Any => Video::Any(true),
            CaptureConstraints::Ideal { width, height } => Video::Sized(Sized {
                width: Ideal { ideal: width },
                height: Ideal { ideal: height },
            }),
        };
        Wire { video }.serialize(serializer)
    }
}

/// Reported capability range of a video track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCapabilities {
    pub max_width: u32,
    pub max_height: u32,
}

/// Negotiated settings of a live video track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
}

/// One decoded frame, tightly packed RGB8
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    Off,
    Requesting,
    Active,
}

/// Mutable state of the panel's controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub camera_on: bool,
    pub toggle_enabled: bool,
    pub selected_resolution: String,
    pub resolution_select_enabled: bool,
    pub snapshot_enabled: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            camera_on: false,
            toggle_enabled: true,
            selected_resolution: DEFAULT_SELECTION.to_string(),
            resolution_select_enabled: false,
            snapshot_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Everything the host page needs to render the camera panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelView {
    pub controls: ControlState,
    pub status: StatusMessage,
    pub resolution_options: Vec<ResolutionOption>,
    pub surface: Option<SessionId>,
    pub state: StreamState,
}
