// Common data models for the pipeline

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::paths::BaseFolder;

/// Thumbnail used when the platform reports none for an entity
pub const PLACEHOLDER_THUMBNAIL: &str = "asset://thumbnails/placeholder.png";

/// Progress callback, invoked with a fraction in 0.0..=1.0 from whichever
/// context performs the transfer. Thread/context marshaling is the caller's
/// responsibility, not the pipeline's.
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// Entity kinds the resolver knows about. Each kind owns one cache namespace;
/// dispatch is always by this enum, never by runtime type inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Video,
    Channel,
    Playlist,
    VideoSearch,
    ChannelSearch,
    PlaylistSearch,
    ChannelVideos,
    PlaylistVideos,
    /// Raw platform video object, kept alongside the mapped descriptor so
    /// later stages reuse the same network round-trip
    RawVideo,
    /// Per-video stream manifest
    Manifest,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Channel => "Channel",
            Self::Playlist => "Playlist",
            Self::VideoSearch => "VideoSearch",
            Self::ChannelSearch => "ChannelSearch",
            Self::PlaylistSearch => "PlaylistSearch",
            Self::ChannelVideos => "ChannelVideos",
            Self::PlaylistVideos => "PlaylistVideos",
            Self::RawVideo => "RawVideo",
            Self::Manifest => "Manifest",
        }
    }

    /// Namespaced cache key: `"<EntityKind>-<identifier>"` where the
    /// identifier is a URL, a search string or a platform id.
    pub fn cache_key(&self, identifier: &str) -> String {
        format!("{}-{}", self.as_str(), identifier)
    }
}

/// Reference to the uploading author carried by videos and playlists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub name: String,
    pub url: String,
    pub thumbnail: String,
}

/// Immutable snapshot of a remote video. Created by the resolver on cache
/// population; the only post-creation mutation is thumbnail backfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub author: Option<AuthorRef>,
}

impl VideoDescriptor {
    /// Whether the thumbnail is still the placeholder and worth backfilling
    pub fn needs_thumbnail(&self) -> bool {
        self.thumbnail == PLACEHOLDER_THUMBNAIL
    }

    /// Backfill a missing thumbnail. A present thumbnail is never replaced.
    pub fn set_thumbnail(&mut self, url: &str) {
        if self.needs_thumbnail() && !url.is_empty() {
            self.thumbnail = url.to_string();
        }
    }
}

/// Immutable snapshot of a remote channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
}

/// Immutable snapshot of a remote playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDescriptor {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub author: Option<AuthorRef>,
}

/// Whether a stream carries audio, video, or both already combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Audio and video in one stream, downloadable without re-encoding
    Muxed,
    AudioOnly,
    VideoOnly,
}

/// One available stream variant for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    /// Container format, e.g. "mp4" or "webm"
    pub container: String,
    /// Platform quality label, e.g. "1080p" or "720p60". Empty for audio.
    pub quality_label: String,
    /// Bitrate in bits per second
    pub bitrate: u64,
    /// Direct media URL for the byte transfer
    pub url: String,
}

/// The set of available streams for one video, in the order the platform
/// reported them. That ordering is authoritative for tie-breaking: when two
/// streams carry the same quality label, the one listed first wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamManifest {
    pub streams: Vec<StreamDescriptor>,
}

impl StreamManifest {
    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self { streams }
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Outcome of stream selection
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSelection {
    /// Single combined stream, remuxed to disk directly
    Muxed(StreamDescriptor),
    /// Best audio plus matching video, combined by the external encoder.
    /// Chosen only when a working encoder path is configured.
    Separate {
        audio: StreamDescriptor,
        video: StreamDescriptor,
    },
}

impl StreamSelection {
    /// Container of the output file
    pub fn container(&self) -> &str {
        match self {
            Self::Muxed(s) => &s.container,
            Self::Separate { video, .. } => &video.container,
        }
    }
}

/// One remote caption track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Language tag, e.g. "en" or "de"; used as the subtitle file name
    pub language: String,
    pub url: String,
}

/// Per-job settings snapshot. Captured once at job creation from the
/// surrounding application's settings provider; the pipeline never mutates
/// it, and later settings changes do not affect a running job.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Path to the external encoder binary; `None` or a dead path means
    /// muxed-only selection (quality degradation, not an error)
    pub encoder_path: Option<PathBuf>,
    /// "highest" or a specific quality label like "1080p"
    pub preferred_resolution: String,
    pub download_subtitles: bool,
    pub base_folder: BaseFolder,
    /// Place playlist items into a per-playlist subdirectory
    pub playlist_subdirectory: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            encoder_path: None,
            preferred_resolution: super::selection::HIGHEST.to_string(),
            download_subtitles: false,
            base_folder: BaseFolder::Downloads,
            playlist_subdirectory: false,
        }
    }
}

impl JobSettings {
    pub fn with_encoder_path(mut self, path: Option<PathBuf>) -> Self {
        self.encoder_path = path;
        self
    }

    pub fn with_preferred_resolution(mut self, label: &str) -> Self {
        self.preferred_resolution = label.to_string();
        self
    }

    pub fn with_subtitles(mut self, enabled: bool) -> Self {
        self.download_subtitles = enabled;
        self
    }

    pub fn with_base_folder(mut self, base: BaseFolder) -> Self {
        self.base_folder = base;
        self
    }

    pub fn with_playlist_subdirectory(mut self, enabled: bool) -> Self {
        self.playlist_subdirectory = enabled;
        self
    }
}
