use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    error::{ShotreelError, ShotreelResult},
    surface::Surface,
};

/// WebM video codec used for one session. Probed once at session start, never
/// per chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Vp9,
    Vp8,
}

impl Codec {
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Codec::Vp9 => "libvpx-vp9",
            Codec::Vp8 => "libvpx",
        }
    }
}

/// The finalized export: a single video-only WebM file.
#[derive(Clone, Debug)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub bytes: u64,
    pub codec: Codec,
}

/// Sink for composited frames. The pipeline drives encoding only through this
/// seam, so tests can substitute a recording fake.
pub trait EncoderSink {
    /// Append one frame. Frames are consumed strictly in push order.
    fn push_frame(&mut self, frame: &Surface) -> ShotreelResult<()>;
    /// Finalize: flush, concatenate buffered chunks in emission order and
    /// produce the artifact. Called exactly once, at the end of a successful run.
    fn finish(&mut self) -> ShotreelResult<ExportArtifact>;
    /// Discard the session without producing an artifact.
    fn abort(&mut self);
}

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_bps: u64,
    pub out_dir: PathBuf,
    pub file_prefix: String,
}

impl EncodeConfig {
    pub fn validate(&self) -> ShotreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ShotreelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ShotreelError::validation(
                "encode width/height must be even",
            ));
        }
        if self.fps == 0 {
            return Err(ShotreelError::validation("encode fps must be non-zero"));
        }
        if self.bitrate_bps == 0 {
            return Err(ShotreelError::validation("encode bitrate must be non-zero"));
        }
        if self.file_prefix.trim().is_empty() {
            return Err(ShotreelError::validation(
                "encode file prefix must be non-empty",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Pick the WebM codec for this environment: VP9 when available, else VP8.
pub fn probe_codec() -> ShotreelResult<Codec> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
        .map_err(|e| ShotreelError::encode(format!("failed to run ffmpeg -encoders: {e}")))?;
    let listing = String::from_utf8_lossy(&out.stdout);
    if listing.contains("libvpx-vp9") {
        Ok(Codec::Vp9)
    } else if listing.contains("libvpx") {
        Ok(Codec::Vp8)
    } else {
        Err(ShotreelError::encode(
            "no WebM encoder available (ffmpeg has neither libvpx-vp9 nor libvpx)",
        ))
    }
}

/// Artifact file name: `<prefix>_<unix-timestamp-ms>.webm`.
pub fn artifact_file_name(prefix: &str, unix_ms: u128) -> String {
    format!("{prefix}_{unix_ms}.webm")
}

fn ensure_out_dir(path: &Path) -> ShotreelResult<()> {
    use anyhow::Context as _;
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create output directory '{}'", path.display()))?;
    Ok(())
}

/// Streaming encoder session over a system `ffmpeg` child process.
///
/// Raw RGBA frames go in on stdin; the muxed WebM stream comes back on stdout,
/// where a reader thread accumulates chunks in emission order. `finish`
/// concatenates the chunks in that order into the artifact file. We use the
/// system binary rather than linked FFmpeg to avoid native dev dependencies.
pub struct FfmpegEncoderSession {
    cfg: EncodeConfig,
    codec: Codec,
    child: Child,
    stdin: Option<ChildStdin>,
    reader: Option<JoinHandle<Vec<Vec<u8>>>>,
    frames_pushed: u64,
    done: bool,
}

impl FfmpegEncoderSession {
    /// Probe the codec, spawn ffmpeg and bind the chunk reader. Fatal when
    /// ffmpeg or both VPx encoders are missing; nothing is written in that case.
    pub fn start(cfg: EncodeConfig) -> ShotreelResult<Self> {
        cfg.validate()?;
        ensure_out_dir(&cfg.out_dir)?;

        if !is_ffmpeg_on_path() {
            return Err(ShotreelError::encode(
                "ffmpeg is required for video export, but was not found on PATH",
            ));
        }
        let codec = probe_codec()?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            codec.ffmpeg_encoder(),
            "-b:v",
            &cfg.bitrate_bps.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-f",
            "webm",
            "pipe:1",
        ]);

        let mut child = cmd.spawn().map_err(|e| {
            ShotreelError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ShotreelError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ShotreelError::encode("failed to open ffmpeg stdout (unexpected)"))?;

        // Drain stdout as chunks arrive; feeding stdin would deadlock otherwise
        // once the pipe buffer fills.
        let reader = std::thread::spawn(move || {
            let mut chunks = Vec::new();
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => chunks.push(buf[..n].to_vec()),
                }
            }
            chunks
        });

        tracing::info!(
            codec = codec.ffmpeg_encoder(),
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps,
            "encoder session started"
        );

        Ok(Self {
            cfg,
            codec,
            child,
            stdin: Some(stdin),
            reader: Some(reader),
            frames_pushed: 0,
            done: false,
        })
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    fn collect_chunks(&mut self) -> ShotreelResult<Vec<Vec<u8>>> {
        drop(self.stdin.take());
        let Some(reader) = self.reader.take() else {
            return Ok(Vec::new());
        };
        reader
            .join()
            .map_err(|_| ShotreelError::encode("encoder chunk reader panicked"))
    }
}

impl EncoderSink for FfmpegEncoderSession {
    fn push_frame(&mut self, frame: &Surface) -> ShotreelResult<()> {
        if frame.width() != self.cfg.width || frame.height() != self.cfg.height {
            return Err(ShotreelError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ShotreelError::encode("encoder session is already finalized"));
        };

        use std::io::Write as _;
        stdin
            .write_all(frame.data())
            .map_err(|e| ShotreelError::encode(format!("failed to write frame to ffmpeg: {e}")))?;
        self.frames_pushed += 1;
        Ok(())
    }

    fn finish(&mut self) -> ShotreelResult<ExportArtifact> {
        if self.done {
            return Err(ShotreelError::encode("encoder session already stopped"));
        }
        self.done = true;

        let chunks = self.collect_chunks()?;
        let status = self
            .child
            .wait()
            .map_err(|e| ShotreelError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        if !status.success() && self.frames_pushed > 0 {
            return Err(ShotreelError::encode(format!(
                "ffmpeg exited with status {status}"
            )));
        }

        // Chunk emission order is artifact byte order.
        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in &chunks {
            data.extend_from_slice(chunk);
        }

        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = self
            .cfg
            .out_dir
            .join(artifact_file_name(&self.cfg.file_prefix, unix_ms));

        use anyhow::Context as _;
        std::fs::write(&path, &data)
            .with_context(|| format!("failed to write artifact '{}'", path.display()))?;

        tracing::info!(
            path = %path.display(),
            bytes = data.len(),
            frames = self.frames_pushed,
            "encoder session finalized"
        );

        Ok(ExportArtifact {
            path,
            bytes: data.len() as u64,
            codec: self.codec,
        })
    }

    fn abort(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        tracing::warn!("encoder session aborted, no artifact produced");
    }
}

impl Drop for FfmpegEncoderSession {
    fn drop(&mut self) {
        // A dangling child process must not outlive the session.
        if !self.done {
            self.abort();
        }
    }
}
