// External encoder (ffmpeg) detection and audio/video merging

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::{PipelineError, PipelineResult};

/// Locations probed when no explicit encoder path is configured
const COMMON_PATHS: &[&str] = &[
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
    "ffmpeg",
];

/// Handle to a working external encoder binary. Constructed only through
/// [`Encoder::detect`], so holding one implies the binary answered a version
/// probe at detection time.
#[derive(Debug, Clone)]
pub struct Encoder {
    path: PathBuf,
}

impl Encoder {
    /// Probe one specific binary. `None` means the path does not answer and
    /// downloads degrade to muxed streams.
    pub async fn at(path: &Path) -> Option<Self> {
        if Self::probe(path).await {
            info!("[encoder] using binary: {}", path.display());
            Some(Self {
                path: path.to_path_buf(),
            })
        } else {
            warn!("[encoder] path does not answer: {}", path.display());
            None
        }
    }

    /// Discover an encoder for settings that have none configured: the
    /// configured path is tried first, then well-known install locations.
    pub async fn detect(configured: Option<&Path>) -> Option<Self> {
        if let Some(path) = configured {
            if let Some(encoder) = Self::at(path).await {
                return Some(encoder);
            }
        }

        for candidate in COMMON_PATHS {
            let path = Path::new(candidate);
            if Self::probe(path).await {
                info!("[encoder] found binary: {}", candidate);
                return Some(Self {
                    path: path.to_path_buf(),
                });
            }
        }

        debug!("[encoder] no binary found, falling back to muxed streams");
        None
    }

    async fn probe(path: &Path) -> bool {
        tokio::process::Command::new(path)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge a video-only and an audio-only file into `output`. The video
    /// track is copied, audio is re-encoded to AAC so any source codec fits
    /// the target container.
    pub async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        token: &CancellationToken,
    ) -> PipelineResult<()> {
        let args = merge_args(video, audio, output);
        debug!("[encoder] {} {:?}", self.path.display(), args);

        let mut child = tokio::process::Command::new(&self.path)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::Encoder(format!("failed to spawn encoder: {}", e)))?;

        tokio::select! {
            status = child.wait() => {
                let status = status
                    .map_err(|e| PipelineError::Encoder(format!("encoder wait failed: {}", e)))?;
                if status.success() {
                    Ok(())
                } else {
                    Err(PipelineError::Encoder(format!(
                        "encoder exited with {}",
                        status
                    )))
                }
            }
            _ = token.cancelled() => {
                let _ = child.kill().await;
                // A killed encoder leaves a truncated output behind
                let _ = tokio::fs::remove_file(output).await;
                Err(PipelineError::Cancelled)
            }
        }
    }
}

fn merge_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video.display().to_string(),
        "-i".to_string(),
        audio.display().to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-preset".to_string(),
        "ultrafast".to_string(),
        output.display().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_copies_video_and_reencodes_audio() {
        let args = merge_args(
            Path::new("/tmp/v.mp4"),
            Path::new("/tmp/a.mp4"),
            Path::new("/tmp/out.mp4"),
        );
        assert_eq!(args[0], "-y");
        let joined = args.join(" ");
        assert!(joined.contains("-c:v copy"));
        assert!(joined.contains("-c:a aac"));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }

    #[tokio::test]
    async fn detect_with_dead_configured_path_does_not_panic() {
        // Whatever the host has installed, a bogus configured path must not
        // be returned as-is
        let encoder = Encoder::detect(Some(Path::new("/nonexistent/ffmpeg"))).await;
        if let Some(encoder) = encoder {
            assert_ne!(encoder.path(), Path::new("/nonexistent/ffmpeg"));
        }
    }
}
