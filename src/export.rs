use crate::{
    compositor::Compositor,
    encode::{EncodeConfig, EncoderSink, ExportArtifact, FfmpegEncoderSession},
    error::ShotreelResult,
    fetch::{load_shot_image, ImageSource},
    model::{ExportSettings, Shot},
    playback::PlaybackClock,
    surface::Surface,
};

/// Export run lifecycle. `Finalizing` and `Aborted` are transient; the pipeline
/// always settles back to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Running,
    Finalizing,
    Aborted,
}

/// Outcome of one successful export run.
#[derive(Clone, Debug)]
pub struct ExportReport {
    pub shots: usize,
    pub frames_pushed: u64,
    pub artifact: ExportArtifact,
}

/// Sequential export driver: snapshot the shots, then for each one load its
/// image, composite a frame and push it for the hold duration's worth of frames,
/// finally stopping the encoder exactly once.
pub struct ExportPipeline {
    phase: ExportPhase,
    progress_pct: u8,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportPipeline {
    pub fn new() -> Self {
        Self {
            phase: ExportPhase::Idle,
            progress_pct: 0,
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    /// Coarse progress, updated once per shot boundary.
    pub fn progress_pct(&self) -> u8 {
        self.progress_pct
    }

    /// Run a full export against the system ffmpeg encoder.
    ///
    /// `playback`, when given, is locked for the duration of the run so the
    /// preview and the exporter never touch a surface concurrently.
    pub fn export(
        &mut self,
        shots: &[Shot],
        settings: &ExportSettings,
        images: &dyn ImageSource,
        compositor: &mut Compositor,
        playback: Option<&mut PlaybackClock>,
    ) -> ShotreelResult<ExportReport> {
        settings.validate()?;
        let (width, height) = settings.aspect.resolution();
        let mut encoder = FfmpegEncoderSession::start(EncodeConfig {
            width,
            height,
            fps: settings.fps,
            bitrate_bps: settings.bitrate_bps,
            out_dir: settings.out_dir.clone(),
            file_prefix: settings.file_prefix.clone(),
        })?;
        self.export_with(shots, settings, images, compositor, &mut encoder, playback)
    }

    /// Run a full export against an arbitrary encoder sink. This is the seam
    /// used by tests and by hosts that bring their own encoder.
    pub fn export_with(
        &mut self,
        shots: &[Shot],
        settings: &ExportSettings,
        images: &dyn ImageSource,
        compositor: &mut Compositor,
        encoder: &mut dyn EncoderSink,
        playback: Option<&mut PlaybackClock>,
    ) -> ShotreelResult<ExportReport> {
        settings.validate()?;

        // Copy-on-start: mutations to the caller's shot list after this point
        // cannot affect the running export.
        let snapshot: Vec<Shot> = shots.to_vec();

        let (width, height) = settings.aspect.resolution();
        let mut surface = Surface::new(width, height)?;

        if let Some(clock) = playback {
            clock.lock_for_export();
            let result = self.run(&snapshot, settings, images, compositor, encoder, &mut surface);
            clock.unlock();
            return result;
        }
        self.run(&snapshot, settings, images, compositor, encoder, &mut surface)
    }

    fn run(
        &mut self,
        snapshot: &[Shot],
        settings: &ExportSettings,
        images: &dyn ImageSource,
        compositor: &mut Compositor,
        encoder: &mut dyn EncoderSink,
        surface: &mut Surface,
    ) -> ShotreelResult<ExportReport> {
        self.phase = ExportPhase::Running;
        self.progress_pct = 0;

        tracing::info!(
            shots = snapshot.len(),
            aspect = %settings.aspect,
            fps = settings.fps,
            "export started"
        );

        match self.shot_loop(snapshot, settings, images, compositor, encoder, surface) {
            Ok(frames_pushed) => {
                self.phase = ExportPhase::Finalizing;
                match encoder.finish() {
                    Ok(artifact) => {
                        self.progress_pct = 100;
                        self.phase = ExportPhase::Idle;
                        tracing::info!(path = %artifact.path.display(), "export complete");
                        Ok(ExportReport {
                            shots: snapshot.len(),
                            frames_pushed,
                            artifact,
                        })
                    }
                    Err(e) => {
                        self.phase = ExportPhase::Aborted;
                        tracing::error!(error = %e, "export finalization failed");
                        self.phase = ExportPhase::Idle;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                // Never leave the session dangling, even on error.
                encoder.abort();
                self.phase = ExportPhase::Aborted;
                tracing::error!(error = %e, "export aborted");
                self.phase = ExportPhase::Idle;
                Err(e)
            }
        }
    }

    fn shot_loop(
        &mut self,
        snapshot: &[Shot],
        settings: &ExportSettings,
        images: &dyn ImageSource,
        compositor: &mut Compositor,
        encoder: &mut dyn EncoderSink,
        surface: &mut Surface,
    ) -> ShotreelResult<u64> {
        let total = snapshot.len();
        let hold_frames = settings.hold_frames();
        let mut frames_pushed = 0u64;

        for (i, shot) in snapshot.iter().enumerate() {
            self.progress_pct = (i * 100 / total) as u8;
            tracing::info!(shot = %shot.id, index = i, total, "exporting shot");

            // Image failure degrades to the placeholder; the run continues.
            let image = load_shot_image(images, shot);
            compositor.compose_shot(surface, shot, &image);

            // Shot duration expressed as repeated identical frames at the
            // export frame rate. Shot i+1 never starts before these are pushed.
            for _ in 0..hold_frames {
                encoder.push_frame(surface)?;
            }
            frames_pushed += hold_frames;
        }

        Ok(frames_pushed)
    }
}
