// Destination path resolution for downloaded media

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{PipelineError, PipelineResult};

/// Well-known base folder for downloads, mapped to the platform-specific
/// location at resolve time. `Custom` bypasses the lookup entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseFolder {
    Downloads,
    Videos,
    Music,
    Pictures,
    Documents,
    Desktop,
    Custom(PathBuf),
}

impl BaseFolder {
    /// Resolve to an absolute directory. Fails with a configuration error
    /// when the platform cannot supply the folder (headless systems).
    pub fn resolve(&self) -> PipelineResult<PathBuf> {
        let dir = match self {
            Self::Downloads => dirs::download_dir(),
            Self::Videos => dirs::video_dir(),
            Self::Music => dirs::audio_dir(),
            Self::Pictures => dirs::picture_dir(),
            Self::Documents => dirs::document_dir(),
            Self::Desktop => dirs::desktop_dir(),
            Self::Custom(path) => return Ok(path.clone()),
        };
        dir.ok_or_else(|| {
            PipelineError::Config(format!("base folder {:?} is not available on this system", self))
        })
    }
}

/// Replace filesystem-hostile characters with underscores so any title can
/// become a file or directory name. Control characters are stripped the same
/// way.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Compute the final media path: `<base>/[<playlist>/]<title>.<extension>`.
///
/// When `playlist_title` is given, the per-playlist subdirectory is created
/// if missing. The file itself is not created here.
pub async fn resolve_destination(
    base: &BaseFolder,
    title: &str,
    extension: &str,
    playlist_title: Option<&str>,
) -> PipelineResult<PathBuf> {
    let mut dir = base.resolve()?;
    if let Some(playlist) = playlist_title {
        dir = dir.join(sanitize(playlist));
    }
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir.join(format!("{}.{}", sanitize(title), extension)))
}

/// Sibling directory holding a video's subtitle files, named after the video
pub fn subtitle_directory(media_path: &Path, title: &str) -> PathBuf {
    let parent = media_path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{} subtitles", sanitize(title)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sanitize_replaces_hostile_characters() {
        assert_eq!(sanitize("A/B:C"), "A_B_C");
        assert_eq!(sanitize("AC/DC: Live? *yes*"), "AC_DC_ Live_ _yes_");
        assert_eq!(sanitize("tabs\tand\nnewlines"), "tabs_and_newlines");
        assert_eq!(sanitize("plain title"), "plain title");
    }

    #[test]
    fn custom_base_folder_resolves_to_itself() {
        let base = BaseFolder::Custom(PathBuf::from("/tmp/media"));
        assert_eq!(base.resolve().unwrap(), PathBuf::from("/tmp/media"));
    }

    #[tokio::test]
    async fn destination_without_playlist_is_directly_under_base() {
        let dir = tempdir().unwrap();
        let base = BaseFolder::Custom(dir.path().to_path_buf());

        let path = resolve_destination(&base, "My Video", "mp4", None)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("My Video.mp4"));
    }

    #[tokio::test]
    async fn playlist_subdirectory_is_created() {
        let dir = tempdir().unwrap();
        let base = BaseFolder::Custom(dir.path().to_path_buf());

        let path = resolve_destination(&base, "Episode 1", "mp4", Some("Season: One"))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("Season_ One").join("Episode 1.mp4"));
        assert!(dir.path().join("Season_ One").is_dir());
    }

    #[test]
    fn subtitle_directory_sits_next_to_media() {
        let media = PathBuf::from("/downloads/My Video.mp4");
        assert_eq!(
            subtitle_directory(&media, "My Video"),
            PathBuf::from("/downloads/My Video subtitles")
        );
    }
}
