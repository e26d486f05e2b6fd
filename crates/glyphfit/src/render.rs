//! Rendering seam.
//!
//! [`Renderer`] turns an isolation document into an RGBA raster of a given
//! size. [`CommandRenderer`] drives an external SVG rasterizer (by default
//! `rsvg-convert`) over stdin/stdout with a wall-clock timeout.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Why a render produced no usable raster.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The program could not be started.
    Spawn { program: String, message: String },
    /// The program exited unsuccessfully.
    Exit { code: Option<i32>, stderr: String },
    /// The program did not finish in time and was killed.
    Timeout { timeout_ms: u64 },
    /// Pipe I/O failed.
    Io(String),
    /// The output was not a decodable image.
    Decode(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { program, message } => {
                write!(f, "failed to start renderer '{}': {}", program, message)
            }
            Self::Exit { code, stderr } => match code {
                Some(c) => write!(f, "renderer exited with status {}: {}", c, stderr.trim()),
                None => write!(f, "renderer terminated by signal: {}", stderr.trim()),
            },
            Self::Timeout { timeout_ms } => write!(f, "renderer timed out after {} ms", timeout_ms),
            Self::Io(msg) => write!(f, "renderer I/O error: {}", msg),
            Self::Decode(msg) => write!(f, "renderer output is not a valid image: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

/// Rasterizes SVG markup.
///
/// Implementations must stretch the document viewport to exactly the
/// returned raster, which is what makes the pixel ↔ document mapping exact.
pub trait Renderer: Send + Sync {
    /// Render `svg` at `size = [width, height]` pixels.
    fn render(&self, svg: &str, size: [u32; 2]) -> Result<RgbaImage, RenderError>;

    /// One-time readiness check run before any glyph is processed.
    fn probe(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// External renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub program: String,
    /// Argument template; `{width}`, `{height}` and `{background}` are
    /// substituted per call.
    pub args: Vec<String>,
    /// Arguments for the readiness probe.
    pub probe_args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "rsvg-convert".to_string(),
            args: [
                "--width",
                "{width}",
                "--height",
                "{height}",
                "--background-color",
                "{background}",
                "--format",
                "png",
            ]
            .map(String::from)
            .to_vec(),
            probe_args: vec!["--version".to_string()],
            timeout_ms: 30_000,
        }
    }
}

/// Renderer backed by an external program reading SVG on stdin and writing
/// PNG to stdout.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    config: RendererConfig,
    background: String,
}

impl CommandRenderer {
    pub fn new(config: RendererConfig, background: impl Into<String>) -> Self {
        Self {
            config,
            background: background.into(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn expand_args(&self, size: [u32; 2]) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|a| {
                a.replace("{width}", &size[0].to_string())
                    .replace("{height}", &size[1].to_string())
                    .replace("{background}", &self.background)
            })
            .collect()
    }

    fn spawn(&self, args: &[String], stdin: bool) -> Result<Child, RenderError> {
        Command::new(&self.config.program)
            .args(args)
            .stdin(if stdin { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::Spawn {
                program: self.config.program.clone(),
                message: e.to_string(),
            })
    }
}

/// Feed `input` to the child and collect stdout/stderr, killing it when
/// `timeout` elapses.
fn run_with_timeout(
    mut child: Child,
    input: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<(Vec<u8>, String), RenderError> {
    let writer = match (input, child.stdin.take()) {
        (Some(bytes), Some(mut stdin)) => Some(thread::spawn(move || {
            let res = stdin.write_all(&bytes);
            drop(stdin);
            res
        })),
        _ => None,
    };
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let out_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(s) = stdout.as_mut() {
            let _ = s.read_to_end(&mut buf);
        }
        buf
    });
    let err_reader = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(s) = stderr.as_mut() {
            let _ = s.read_to_string(&mut buf);
        }
        buf
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RenderError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(RenderError::Io(e.to_string())),
        }
    };

    let stdout = out_reader
        .join()
        .map_err(|_| RenderError::Io("stdout reader panicked".to_string()))?;
    let stderr = err_reader
        .join()
        .map_err(|_| RenderError::Io("stderr reader panicked".to_string()))?;
    let write_res = match writer {
        Some(w) => w
            .join()
            .map_err(|_| RenderError::Io("stdin writer panicked".to_string()))?,
        None => Ok(()),
    };
    if !status.success() {
        return Err(RenderError::Exit {
            code: status.code(),
            stderr,
        });
    }
    // A renderer that succeeded may close stdin before it is fully written.
    if let Err(e) = write_res {
        tracing::debug!(error = %e, "renderer closed stdin early");
    }
    Ok((stdout, stderr))
}

/// Decode PNG (or any enabled format) bytes into RGBA.
pub fn decode_raster(bytes: &[u8]) -> Result<RgbaImage, RenderError> {
    if bytes.is_empty() {
        return Err(RenderError::Decode("empty output".to_string()));
    }
    let img = image::load_from_memory(bytes).map_err(|e| RenderError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(RenderError::Decode("zero-sized raster".to_string()));
    }
    Ok(rgba)
}

impl Renderer for CommandRenderer {
    fn render(&self, svg: &str, size: [u32; 2]) -> Result<RgbaImage, RenderError> {
        let args = self.expand_args(size);
        let child = self.spawn(&args, true)?;
        let (png, _) = run_with_timeout(
            child,
            Some(svg.as_bytes().to_vec()),
            Duration::from_millis(self.config.timeout_ms),
        )?;
        decode_raster(&png)
    }

    fn probe(&self) -> Result<(), RenderError> {
        let child = self.spawn(&self.config.probe_args, false)?;
        let (stdout, _) = run_with_timeout(child, None, Duration::from_millis(self.config.timeout_ms))?;
        tracing::info!(
            program = %self.config.program,
            version = %String::from_utf8_lossy(&stdout).lines().next().unwrap_or("").trim(),
            "renderer available"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.program
    }
}
