//! Argument builders and process runners for the `ffmpeg` binary.
//!
//! Builders are pure so the exact command lines can be tested without the tool installed.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use crate::foundation::core::Size;
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::format::fmt3;
use crate::graph::node::CompiledGraph;
use crate::timeline::model::{Clip, Trim};

/// H.264 encoders in preference order; the software encoder is the fallback.
const H264_PRIORITY: [&str; 4] = ["h264_nvenc", "h264_qsv", "h264_amf", "h264_videotoolbox"];
const SOFTWARE_H264: &str = "libx264";

/// Video encoders the local `ffmpeg` build offers.
///
/// Detect once at startup and pass it along; nothing here is cached globally.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderCaps {
    encoders: BTreeSet<String>,
}

impl EncoderCaps {
    /// Ask `ffmpeg -encoders`. A missing or failing binary yields [`EncoderCaps::software`].
    #[tracing::instrument]
    pub fn detect() -> Self {
        let out = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .output();
        match out {
            Ok(out) if out.status.success() => {
                let caps = Self::parse_encoders(&String::from_utf8_lossy(&out.stdout));
                tracing::debug!(
                    encoders = caps.encoders.len(),
                    h264 = caps.best_h264(),
                    "detected ffmpeg encoders"
                );
                caps
            }
            Ok(out) => {
                tracing::warn!(status = %out.status, "ffmpeg -encoders failed; using software encoding");
                Self::software()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not run ffmpeg; using software encoding");
                Self::software()
            }
        }
    }

    /// Capabilities of a build with no hardware encoders.
    pub fn software() -> Self {
        Self::default()
    }

    /// Parse `ffmpeg -encoders` output. Video encoder lines start with `V`; the name is the
    /// second field.
    pub fn parse_encoders(text: &str) -> Self {
        let encoders = text
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with('V'))
            .filter_map(|l| l.split_whitespace().nth(1))
            .map(str::to_owned)
            .collect();
        Self { encoders }
    }

    pub fn has(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }

    /// Best available H.264 encoder, hardware first.
    pub fn best_h264(&self) -> &'static str {
        H264_PRIORITY
            .into_iter()
            .find(|e| self.has(e))
            .unwrap_or(SOFTWARE_H264)
    }
}

/// Translate a software-style preset (`ultrafast` .. `placebo`) for `codec`.
///
/// Returns `None` when the encoder takes no preset.
pub fn map_preset(codec: &str, preset: &str) -> Option<String> {
    if preset.is_empty() {
        return None;
    }
    let family = codec.rsplit('_').next().unwrap_or(codec);
    let mapped = match (family, preset) {
        ("nvenc", "ultrafast" | "superfast" | "veryfast" | "fast") => "fast",
        ("nvenc", "slow" | "veryslow") => "slow",
        ("nvenc", "placebo") => "hq",
        ("nvenc", _) => "medium",
        ("amf", "ultrafast" | "superfast" | "veryfast" | "fast") => "speed",
        ("amf", "slow" | "veryslow" | "placebo") => "quality",
        ("amf", _) => "balanced",
        ("qsv", "ultrafast" | "superfast" | "veryfast") => "veryfast",
        ("qsv", "fast" | "medium" | "slow" | "veryslow") => preset,
        ("qsv", "placebo") => "veryslow",
        ("qsv", _) => "medium",
        ("videotoolbox", _) => return None,
        _ => preset,
    };
    Some(mapped.to_owned())
}

/// Output encoding parameters.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    /// Video encoder; `None` picks the best detected H.264 encoder.
    pub codec: Option<String>,
    pub preset: Option<String>,
    /// Target video bit rate in ffmpeg notation, e.g. `4M`.
    pub bit_rate: Option<String>,
    /// Output frame rate override.
    pub fps: Option<u32>,
    /// Output pixel format; `None` picks `yuv420p`, or `yuv444p` for odd sizes.
    pub pixel_format: Option<String>,
    pub threads: Option<u16>,
    pub overwrite: bool,
    pub audio_codec: String,
    pub audio_bit_rate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            codec: None,
            preset: Some("medium".to_owned()),
            bit_rate: None,
            fps: None,
            pixel_format: None,
            threads: None,
            overwrite: true,
            audio_codec: "aac".to_owned(),
            audio_bit_rate: "192k".to_owned(),
        }
    }
}

impl EncodeSettings {
    pub fn resolved_codec(&self, caps: &EncoderCaps) -> String {
        self.codec
            .clone()
            .unwrap_or_else(|| caps.best_h264().to_owned())
    }

    fn video_args(&self, caps: &EncoderCaps, size: Size, args: &mut Vec<OsString>) {
        let codec = self.resolved_codec(caps);
        let preset = self
            .preset
            .as_deref()
            .and_then(|p| map_preset(&codec, p));
        push(args, ["-c:v", codec.as_str()]);
        if let Some(p) = preset {
            push(args, ["-preset", p.as_str()]);
        }
        if let Some(b) = &self.bit_rate {
            push(args, ["-b:v", b.as_str()]);
        }
        if let Some(fps) = self.fps {
            push(args, ["-r".to_owned(), fps.to_string()]);
        }
        let pix_fmt = self
            .pixel_format
            .clone()
            .unwrap_or_else(|| output_pixel_format(size).to_owned());
        push(args, ["-pix_fmt".to_owned(), pix_fmt]);
        if let Some(t) = self.threads {
            push(args, ["-threads".to_owned(), t.to_string()]);
        }
    }

    fn audio_args(&self, args: &mut Vec<OsString>) {
        push(
            args,
            ["-c:a", self.audio_codec.as_str(), "-b:a", self.audio_bit_rate.as_str()],
        );
    }

    fn output_args(&self, out: &Path, args: &mut Vec<OsString>) {
        args.push(if self.overwrite { "-y" } else { "-n" }.into());
        args.push(out.into());
    }
}

/// `yuv420p` needs even dimensions; odd sizes fall back to `yuv444p`.
pub fn output_pixel_format(size: Size) -> &'static str {
    if size.width % 2 == 0 && size.height % 2 == 0 {
        "yuv420p"
    } else {
        "yuv444p"
    }
}

fn push<I, S>(args: &mut Vec<OsString>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    args.extend(items.into_iter().map(Into::into));
}

/// Run a compiled graph and encode its outputs into `out`.
pub fn graph_args(
    graph: &CompiledGraph,
    settings: &EncodeSettings,
    caps: &EncoderCaps,
    out: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into()];
    for input in &graph.inputs {
        args.extend(input.to_args());
    }
    push(&mut args, ["-filter_complex".to_owned(), graph.filter_complex()]);
    push(&mut args, ["-map".to_owned(), format!("[{}]", graph.video_label())]);
    if let Some(a) = graph.audio_label() {
        push(&mut args, ["-map".to_owned(), format!("[{a}]")]);
    }
    settings.video_args(caps, graph.size, &mut args);
    if graph.has_audio {
        settings.audio_args(&mut args);
    } else {
        args.push("-an".into());
    }
    settings.output_args(out, &mut args);
    args
}

/// Stream-copy `input` into `out` without re-encoding.
pub fn passthrough_args(input: &Path, out: &Path, overwrite: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into(), "-i".into()];
    args.push(input.into());
    push(&mut args, ["-c", "copy"]);
    args.push(if overwrite { "-y" } else { "-n" }.into());
    args.push(out.into());
    args
}

/// Decode a file clip's playable window to raw RGBA on stdout.
pub fn decoder_args(clip: &Clip) -> MontageResult<Vec<OsString>> {
    let path = clip
        .source
        .path()
        .ok_or_else(|| MontageError::configuration("only file clips can be decoded"))?;
    if clip.fps == 0 {
        return Err(MontageError::configuration(format!(
            "clip '{}' has no frame rate",
            path.display()
        )));
    }
    let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into()];
    if let Some(t) = clip.trim {
        push(&mut args, ["-ss".to_owned(), fmt3(t.start())]);
    }
    args.push("-i".into());
    args.push(path.into());
    if let Some(t) = clip.trim {
        push(&mut args, ["-t".to_owned(), fmt3(t.len())]);
    }
    push(
        &mut args,
        [
            "-f".to_owned(),
            "rawvideo".to_owned(),
            "-pix_fmt".to_owned(),
            "rgba".to_owned(),
            "-r".to_owned(),
            clip.fps.to_string(),
            "-".to_owned(),
        ],
    );
    Ok(args)
}

/// Audio taken from the original source when re-encoding raw frames.
#[derive(Clone, Copy, Debug)]
pub struct AudioSource<'a> {
    pub path: &'a Path,
    pub trim: Option<Trim>,
}

/// Encode raw RGBA frames from stdin into `out`, optionally muxing audio from a source file.
pub fn encoder_args(
    size: Size,
    fps: u32,
    settings: &EncodeSettings,
    caps: &EncoderCaps,
    audio: Option<AudioSource<'_>>,
    out: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    push(
        &mut args,
        [
            "-loglevel".to_owned(),
            "error".to_owned(),
            "-f".to_owned(),
            "rawvideo".to_owned(),
            "-vcodec".to_owned(),
            "rawvideo".to_owned(),
            "-s".to_owned(),
            format!("{}x{}", size.width, size.height),
            "-pix_fmt".to_owned(),
            "rgba".to_owned(),
            "-r".to_owned(),
            fps.to_string(),
            "-i".to_owned(),
            "-".to_owned(),
        ],
    );
    if let Some(src) = audio {
        if let Some(t) = src.trim {
            push(&mut args, ["-ss".to_owned(), fmt3(t.start())]);
        }
        args.push("-i".into());
        args.push(src.path.into());
        if let Some(t) = src.trim {
            push(&mut args, ["-t".to_owned(), fmt3(t.len())]);
        }
        push(&mut args, ["-map", "0:v:0", "-map", "1:a:0?"]);
    }
    settings.video_args(caps, size, &mut args);
    if audio.is_some() {
        settings.audio_args(&mut args);
        args.push("-shortest".into());
    } else {
        args.push("-an".into());
    }
    settings.output_args(out, &mut args);
    args
}

/// Render a command line for logs.
pub fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A spawned `ffmpeg` whose stderr is drained on a helper thread.
pub struct EngineProcess {
    child: Child,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl EngineProcess {
    fn spawn(args: &[OsString], stdin: Stdio, stdout: Stdio) -> MontageResult<Self> {
        tracing::debug!(cmd = %display_args(args), "spawning ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MontageError::engine(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MontageError::engine("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });
        Ok(Self {
            child,
            stderr_drain: Some(stderr_drain),
        })
    }

    /// `ffmpeg` producing raw frames on stdout.
    pub fn decoder(args: &[OsString]) -> MontageResult<Self> {
        Self::spawn(args, Stdio::null(), Stdio::piped())
    }

    /// `ffmpeg` consuming raw frames on stdin.
    pub fn encoder(args: &[OsString]) -> MontageResult<Self> {
        Self::spawn(args, Stdio::piped(), Stdio::null())
    }

    pub fn take_stdout(&mut self) -> MontageResult<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or_else(|| MontageError::engine("ffmpeg stdout is not available"))
    }

    pub fn take_stdin(&mut self) -> MontageResult<ChildStdin> {
        self.child
            .stdin
            .take()
            .ok_or_else(|| MontageError::engine("ffmpeg stdin is not available"))
    }

    /// Stop a process whose output is no longer wanted.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            tracing::debug!(error = %e, "ffmpeg already exited");
        }
    }

    /// Wait for exit. A non-zero status becomes an [`MontageError::Engine`] carrying stderr.
    pub fn finish(mut self) -> MontageResult<()> {
        drop(self.child.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| MontageError::engine(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| MontageError::engine("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| MontageError::engine(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(MontageError::engine(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Run `ffmpeg` to completion with no piped input or output.
#[tracing::instrument(skip(args))]
pub fn run_ffmpeg(args: &[OsString]) -> MontageResult<()> {
    EngineProcess::spawn(args, Stdio::null(), Stdio::null())?.finish()
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> MontageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/engine/ffmpeg.rs"]
mod tests;
