use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ShotreelError, ShotreelResult};

/// How long each exported shot stays on screen, expressed as frames at export fps.
pub const EXPORT_HOLD_MS: u64 = 3000;
/// How long the live preview lingers on each shot before auto-advancing.
pub const PREVIEW_HOLD_MS: u64 = 4000;
/// Preview progress tick interval.
pub const PREVIEW_TICK_MS: u64 = 50;

/// One storyboard unit in presentation order.
///
/// Shots arrive from the surrounding application (the AI analysis side is out of
/// scope here) and are treated as read-only once an export run has snapshotted
/// them.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    pub visual_action: String,
    pub camera_angle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ShotStatus,
}

/// Image-generation status flags carried alongside each shot.
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotStatus {
    #[serde(default)]
    pub generating: bool,
    #[serde(default)]
    pub failed: bool,
}

impl Shot {
    /// Dialogue with surrounding whitespace stripped, `None` when empty.
    pub fn dialogue_text(&self) -> Option<&str> {
        self.dialogue
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Per-shot image pixels as seen by the compositor.
#[derive(Clone, Debug)]
pub enum ImageLoadState {
    Loading,
    Loaded(image::RgbaImage),
    Failed,
}

/// Output aspect ratio; each variant maps to one canonical export resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    #[value(name = "16:9")]
    Wide16x9,
    #[serde(rename = "9:16")]
    #[value(name = "9:16")]
    Vertical9x16,
    #[serde(rename = "1:1")]
    #[value(name = "1:1")]
    Square1x1,
    #[serde(rename = "4:3")]
    #[value(name = "4:3")]
    Classic4x3,
    #[serde(rename = "21:9")]
    #[value(name = "21:9")]
    Cinema21x9,
}

impl AspectRatio {
    /// Canonical export resolution. All dimensions are even, as the encoder
    /// requires.
    pub fn resolution(self) -> (u32, u32) {
        match self {
            AspectRatio::Wide16x9 => (1920, 1080),
            AspectRatio::Vertical9x16 => (1080, 1920),
            AspectRatio::Square1x1 => (1080, 1080),
            AspectRatio::Classic4x3 => (1440, 1080),
            AspectRatio::Cinema21x9 => (2520, 1080),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Wide16x9 => "16:9",
            AspectRatio::Vertical9x16 => "9:16",
            AspectRatio::Square1x1 => "1:1",
            AspectRatio::Classic4x3 => "4:3",
            AspectRatio::Cinema21x9 => "21:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = ShotreelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Wide16x9),
            "9:16" => Ok(AspectRatio::Vertical9x16),
            "1:1" => Ok(AspectRatio::Square1x1),
            "4:3" => Ok(AspectRatio::Classic4x3),
            "21:9" => Ok(AspectRatio::Cinema21x9),
            other => Err(ShotreelError::validation(format!(
                "unknown aspect ratio '{other}' (expected 16:9, 9:16, 1:1, 4:3 or 21:9)"
            ))),
        }
    }
}

/// Explicitly threaded export configuration. Captured once at export start;
/// nothing in the pipeline reads ambient state.
#[derive(Clone, Debug)]
pub struct ExportSettings {
    pub aspect: AspectRatio,
    pub fps: u32,
    pub bitrate_bps: u64,
    pub hold: Duration,
    pub file_prefix: String,
    pub out_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            aspect: AspectRatio::Wide16x9,
            fps: 30,
            bitrate_bps: 8_000_000,
            hold: Duration::from_millis(EXPORT_HOLD_MS),
            file_prefix: "storyboard".to_string(),
            out_dir: PathBuf::from("."),
        }
    }
}

impl ExportSettings {
    pub fn validate(&self) -> ShotreelResult<()> {
        if self.fps == 0 {
            return Err(ShotreelError::validation("export fps must be non-zero"));
        }
        if self.bitrate_bps == 0 {
            return Err(ShotreelError::validation("export bitrate must be non-zero"));
        }
        if self.hold.is_zero() {
            return Err(ShotreelError::validation(
                "per-shot hold duration must be non-zero",
            ));
        }
        if self.file_prefix.trim().is_empty() {
            return Err(ShotreelError::validation(
                "artifact file prefix must be non-empty",
            ));
        }
        Ok(())
    }

    /// Frames pushed per shot at the configured fps. Always at least one.
    pub fn hold_frames(&self) -> u64 {
        ((self.hold.as_millis() as u64).saturating_mul(u64::from(self.fps)) / 1000).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_resolutions_are_even() {
        for aspect in [
            AspectRatio::Wide16x9,
            AspectRatio::Vertical9x16,
            AspectRatio::Square1x1,
            AspectRatio::Classic4x3,
            AspectRatio::Cinema21x9,
        ] {
            let (w, h) = aspect.resolution();
            assert!(w > 0 && h > 0);
            assert_eq!(w % 2, 0, "{aspect} width must be even");
            assert_eq!(h % 2, 0, "{aspect} height must be even");
        }
    }

    #[test]
    fn aspect_labels_roundtrip() {
        for aspect in [
            AspectRatio::Wide16x9,
            AspectRatio::Vertical9x16,
            AspectRatio::Square1x1,
            AspectRatio::Classic4x3,
            AspectRatio::Cinema21x9,
        ] {
            let parsed: AspectRatio = aspect.label().parse().unwrap();
            assert_eq!(parsed, aspect);
        }
        assert!("2.39:1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn shot_json_uses_camel_case() {
        let json = r#"{
            "id": "shot-1",
            "sceneId": "scene-1",
            "dialogue": "Hello.",
            "visualAction": "Closeup on the door",
            "cameraAngle": "close-up",
            "imageUrl": "https://example.com/shot1.png"
        }"#;
        let shot: Shot = serde_json::from_str(json).unwrap();
        assert_eq!(shot.scene_id.as_deref(), Some("scene-1"));
        assert_eq!(shot.image_url.as_deref(), Some("https://example.com/shot1.png"));
        assert!(!shot.status.generating);
    }

    #[test]
    fn dialogue_text_filters_blank_strings() {
        let mut shot: Shot = serde_json::from_str(
            r#"{"id":"s","visualAction":"a","cameraAngle":"wide","dialogue":"  "}"#,
        )
        .unwrap();
        assert_eq!(shot.dialogue_text(), None);
        shot.dialogue = Some(" line ".to_string());
        assert_eq!(shot.dialogue_text(), Some("line"));
    }

    #[test]
    fn settings_validation_catches_bad_values() {
        let mut s = ExportSettings::default();
        assert!(s.validate().is_ok());

        s.fps = 0;
        assert!(s.validate().is_err());

        s = ExportSettings::default();
        s.hold = Duration::ZERO;
        assert!(s.validate().is_err());

        s = ExportSettings::default();
        s.file_prefix = "  ".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn hold_frames_matches_duration_times_fps() {
        let s = ExportSettings::default();
        // 3000 ms at 30 fps.
        assert_eq!(s.hold_frames(), 90);

        let short = ExportSettings {
            hold: Duration::from_millis(1),
            fps: 30,
            ..ExportSettings::default()
        };
        assert_eq!(short.hold_frames(), 1);
    }
}
