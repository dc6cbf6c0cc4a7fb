#![forbid(unsafe_code)]

pub mod compositor;
pub mod encode;
pub mod error;
pub mod export;
pub mod fetch;
pub mod model;
pub mod playback;
pub mod surface;
pub mod text;

pub use compositor::{Compositor, SubtitleStyle};
pub use encode::{Codec, EncodeConfig, EncoderSink, ExportArtifact, FfmpegEncoderSession};
pub use error::{ShotreelError, ShotreelResult};
pub use export::{ExportPhase, ExportPipeline, ExportReport};
pub use fetch::{load_shot_image, HttpImageSource, ImageSource};
pub use model::{AspectRatio, ExportSettings, ImageLoadState, Shot, ShotStatus};
pub use playback::PlaybackClock;
pub use surface::Surface;
pub use text::{wrap_text, SubtitleFont};
