use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

use crate::error::StampError;

/// Placement of a mark on the page, either a named anchor or a
/// page-relative coordinate pair in `[0,1] x [0,1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
    Custom { rx: f64, ry: f64 },
}

impl FromStr for Position {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "top-left" | "topleft" => Ok(Position::TopLeft),
            "top-right" | "topright" => Ok(Position::TopRight),
            "bottom-left" | "bottomleft" => Ok(Position::BottomLeft),
            "bottom-right" | "bottomright" => Ok(Position::BottomRight),
            "center" => Ok(Position::Center),
            custom if custom.starts_with("custom:") => {
                // A broken custom spec is not a usage error: fall back to the
                // default corner and keep the run alive.
                match parse_custom(custom.trim_start_matches("custom:")) {
                    Some((rx, ry)) => Ok(Position::Custom { rx, ry }),
                    None => {
                        warn!("malformed custom position '{s}', falling back to bottom-right");
                        Ok(Position::BottomRight)
                    }
                }
            }
            _ => Err(StampError::InvalidPosition(s.to_string())),
        }
    }
}

fn parse_custom(coords: &str) -> Option<(f64, f64)> {
    let (rx, ry) = coords.split_once(',')?;
    let rx: f64 = rx.trim().parse().ok()?;
    let ry: f64 = ry.trim().parse().ok()?;
    if (0.0..=1.0).contains(&rx) && (0.0..=1.0).contains(&ry) {
        Some((rx, ry))
    } else {
        None
    }
}

/// Border and shadow decoration applied to the watermark image before
/// placement. The default is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectsSpec {
    pub border_width: u32,
    pub border_color: [u8; 3],
    pub shadow_enabled: bool,
    pub shadow_offset: (i32, i32),
}

impl Default for EffectsSpec {
    fn default() -> Self {
        EffectsSpec {
            border_width: 0,
            border_color: [0, 0, 0],
            shadow_enabled: false,
            shadow_offset: (4, 4),
        }
    }
}

impl EffectsSpec {
    pub fn is_noop(&self) -> bool {
        self.border_width == 0 && !self.shadow_enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    Short,
    Long,
    Full,
    Iso,
    Custom,
}

impl FromStr for TimestampFormat {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(TimestampFormat::Short),
            "long" => Ok(TimestampFormat::Long),
            "full" => Ok(TimestampFormat::Full),
            "iso" => Ok(TimestampFormat::Iso),
            "custom" => Ok(TimestampFormat::Custom),
            other => Err(StampError::InvalidOptions(format!(
                "unknown timestamp format '{other}'"
            ))),
        }
    }
}

/// Where the timestamp goes relative to the main watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDirection {
    Above,
    Below,
    Left,
    Right,
}

impl FromStr for RelativeDirection {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(RelativeDirection::Above),
            "below" => Ok(RelativeDirection::Below),
            "left" => Ok(RelativeDirection::Left),
            "right" => Ok(RelativeDirection::Right),
            other => Err(StampError::InvalidOptions(format!(
                "unknown relative direction '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimestampSpec {
    pub format: TimestampFormat,
    pub custom_format: Option<String>,
    pub relative_position: RelativeDirection,
    pub font_path: PathBuf,
}

/// Info-dictionary fields supplied by the caller. Producer and ModDate are
/// filled in by the writer itself.
#[derive(Debug, Clone, Default)]
pub struct MetadataFields {
    pub author: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
}

/// Every knob a stamping run accepts. There is no keyword bag and no
/// process-wide configuration behind this; a run sees exactly what the
/// caller put here.
#[derive(Debug, Clone)]
pub struct StampOptions {
    pub scale_factor: f64,
    pub position: Position,
    pub pages: String,
    pub exclude_pages: Option<String>,
    pub opacity: f64,
    pub effects: EffectsSpec,
    pub timestamp: Option<TimestampSpec>,
    pub metadata: Option<MetadataFields>,
}

impl Default for StampOptions {
    fn default() -> Self {
        StampOptions {
            scale_factor: 0.2,
            position: Position::BottomRight,
            pages: "all".to_string(),
            exclude_pages: None,
            opacity: 1.0,
            effects: EffectsSpec::default(),
            timestamp: None,
            metadata: None,
        }
    }
}

impl StampOptions {
    pub fn validate(&self) -> Result<(), StampError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(StampError::InvalidOptions(format!(
                "scale factor must be > 0, got {}",
                self.scale_factor
            )));
        }
        if !self.opacity.is_finite() || self.opacity <= 0.0 || self.opacity > 1.0 {
            return Err(StampError::InvalidOptions(format!(
                "opacity must be in (0, 1], got {}",
                self.opacity
            )));
        }
        Ok(())
    }
}
