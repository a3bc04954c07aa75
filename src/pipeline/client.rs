// Collaborator seams: remote platform client and entity persistence

use std::path::Path;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::errors::{PipelineError, PipelineResult};
use super::models::{
    ChannelDescriptor, EntityKind, PlaylistDescriptor, StreamManifest, SubtitleTrack,
    VideoDescriptor,
};

/// Raw platform video object as the remote client returns it, before mapping
/// into a [`VideoDescriptor`]. Cached separately so later pipeline stages can
/// reuse the same network round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideo {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub author_thumbnail: Option<String>,
}

/// Raw platform channel object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChannel {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
}

/// Raw platform playlist object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlaylist {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub author_thumbnail: Option<String>,
}

lazy_static! {
    static ref HANDLE_RE: Regex = Regex::new(r"/@([A-Za-z0-9_.\-]+)").unwrap();
    static ref USER_RE: Regex = Regex::new(r"/user/([^/?#]+)").unwrap();
    static ref LEGACY_RE: Regex = Regex::new(r"/c/([^/?#]+)").unwrap();
    static ref ID_RE: Regex = Regex::new(r"/channel/([^/?#]+)").unwrap();
}

/// The four URL shapes a channel can be addressed by. The shape picks the
/// remote lookup variant; the parse runs before any cache key is computed so
/// the key is built from the canonical identifier, not the raw URL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelUrlKind {
    /// Handle-style `/@name`
    Handle(String),
    /// Legacy `/user/<name>`
    User(String),
    /// Legacy `/c/<name>`
    Legacy(String),
    /// Canonical `/channel/<id>`
    Id(String),
}

impl ChannelUrlKind {
    /// Pure dispatch on URL shape; no network, no caching.
    pub fn parse(url: &str) -> PipelineResult<Self> {
        if let Some(caps) = HANDLE_RE.captures(url) {
            return Ok(Self::Handle(caps[1].to_string()));
        }
        if let Some(caps) = USER_RE.captures(url) {
            return Ok(Self::User(caps[1].to_string()));
        }
        if let Some(caps) = LEGACY_RE.captures(url) {
            return Ok(Self::Legacy(caps[1].to_string()));
        }
        if let Some(caps) = ID_RE.captures(url) {
            return Ok(Self::Id(caps[1].to_string()));
        }
        Err(PipelineError::InvalidUrl(format!(
            "not a recognizable channel url: {}",
            url
        )))
    }

    /// Canonical identifier used in cache keys
    pub fn identifier(&self) -> String {
        match self {
            Self::Handle(name) => format!("@{}", name),
            Self::User(name) => format!("user/{}", name),
            Self::Legacy(name) => format!("c/{}", name),
            Self::Id(id) => id.clone(),
        }
    }
}

/// Remote platform client. The pipeline treats this as a black box that may
/// fail with network errors; `Ok(None)` models a remote entity that does not
/// exist (and triggers cache eviction upstream, never a negative entry).
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Name of the client (for logging)
    fn name(&self) -> &'static str;

    async fn video(&self, url: &str) -> PipelineResult<Option<RawVideo>>;

    /// Channel lookup, dispatched on the parsed URL shape
    async fn channel(&self, kind: &ChannelUrlKind) -> PipelineResult<Option<RawChannel>>;

    async fn playlist(&self, url: &str) -> PipelineResult<Option<RawPlaylist>>;

    async fn search_videos(&self, query: &str, cap: usize) -> PipelineResult<Vec<RawVideo>>;

    async fn search_channels(&self, query: &str, cap: usize) -> PipelineResult<Vec<RawChannel>>;

    async fn search_playlists(&self, query: &str, cap: usize) -> PipelineResult<Vec<RawPlaylist>>;

    async fn channel_videos(&self, url: &str) -> PipelineResult<Vec<RawVideo>>;

    async fn playlist_videos(&self, playlist_id: &str) -> PipelineResult<Vec<RawVideo>>;

    async fn stream_manifest(&self, video_id: &str) -> PipelineResult<StreamManifest>;

    async fn subtitle_manifest(&self, video_id: &str) -> PipelineResult<Vec<SubtitleTrack>>;

    /// Fetch one caption track to `dest`, honoring the cancellation token
    async fn download_caption(
        &self,
        track: &SubtitleTrack,
        dest: &Path,
        token: &CancellationToken,
    ) -> PipelineResult<()>;
}

/// Local persistence of saved descriptors, keyed by platform id. The
/// resolver is independent of this store; only the surrounding application
/// wires the two together.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn save_video(&self, video: &VideoDescriptor) -> PipelineResult<()>;
    async fn save_channel(&self, channel: &ChannelDescriptor) -> PipelineResult<()>;
    async fn save_playlist(&self, playlist: &PlaylistDescriptor) -> PipelineResult<()>;

    async fn delete(&self, kind: EntityKind, id: &str) -> PipelineResult<()>;
    async fn exists(&self, kind: EntityKind, id: &str) -> PipelineResult<bool>;

    async fn list_videos(&self) -> PipelineResult<Vec<VideoDescriptor>>;
    async fn list_channels(&self) -> PipelineResult<Vec<ChannelDescriptor>>;
    async fn list_playlists(&self) -> PipelineResult<Vec<PlaylistDescriptor>>;
}
