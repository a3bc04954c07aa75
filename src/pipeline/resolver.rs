// Cached metadata resolution in front of the remote platform client

use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::cache::TtlCache;
use super::client::{ChannelUrlKind, MetadataClient, RawChannel, RawPlaylist, RawVideo};
use super::errors::{PipelineError, PipelineResult};
use super::models::{
    AuthorRef, ChannelDescriptor, EntityKind, PlaylistDescriptor, StreamManifest,
    VideoDescriptor, PLACEHOLDER_THUMBNAIL,
};

/// Upper bound on search results kept per query
pub const SEARCH_CAP: usize = 200;

fn author_ref(name: Option<&str>, url: Option<&str>, thumbnail: Option<&str>) -> Option<AuthorRef> {
    let name = name?;
    Some(AuthorRef {
        name: name.to_string(),
        url: url.unwrap_or_default().to_string(),
        thumbnail: thumbnail
            .filter(|t| !t.is_empty())
            .unwrap_or(PLACEHOLDER_THUMBNAIL)
            .to_string(),
    })
}

fn thumbnail_or_placeholder(thumbnail: Option<&str>) -> String {
    thumbnail
        .filter(|t| !t.is_empty())
        .unwrap_or(PLACEHOLDER_THUMBNAIL)
        .to_string()
}

fn map_video(raw: &RawVideo) -> VideoDescriptor {
    VideoDescriptor {
        id: raw.id.clone(),
        title: raw.title.clone(),
        url: raw.url.clone(),
        thumbnail: thumbnail_or_placeholder(raw.thumbnail.as_deref()),
        author: author_ref(
            raw.author_name.as_deref(),
            raw.author_url.as_deref(),
            raw.author_thumbnail.as_deref(),
        ),
    }
}

fn map_channel(raw: &RawChannel) -> ChannelDescriptor {
    ChannelDescriptor {
        id: raw.id.clone(),
        title: raw.title.clone(),
        url: raw.url.clone(),
        thumbnail: thumbnail_or_placeholder(raw.thumbnail.as_deref()),
    }
}

fn map_playlist(raw: &RawPlaylist) -> PlaylistDescriptor {
    PlaylistDescriptor {
        id: raw.id.clone(),
        title: raw.title.clone(),
        url: raw.url.clone(),
        thumbnail: thumbnail_or_placeholder(raw.thumbnail.as_deref()),
        author: author_ref(
            raw.author_name.as_deref(),
            raw.author_url.as_deref(),
            raw.author_thumbnail.as_deref(),
        ),
    }
}

/// Playlist id from the `list` query parameter of a playlist URL
pub fn playlist_id_from_url(url: &str) -> PipelineResult<String> {
    let parsed =
        Url::parse(url).map_err(|e| PipelineError::InvalidUrl(format!("{}: {}", url, e)))?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "list")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| {
            PipelineError::InvalidUrl(format!("playlist url has no list parameter: {}", url))
        })
}

/// Front of every metadata lookup. Each entity kind owns its own TTL cache,
/// keyed by [`EntityKind::cache_key`]; lookups go to the remote client only
/// on a miss. Absent remote entities come back as `Ok(None)` and are never
/// retained as negative entries.
pub struct MetadataResolver<C: MetadataClient> {
    client: Arc<C>,
    videos: TtlCache<VideoDescriptor>,
    channels: TtlCache<ChannelDescriptor>,
    playlists: TtlCache<PlaylistDescriptor>,
    video_searches: TtlCache<Vec<VideoDescriptor>>,
    channel_searches: TtlCache<Vec<ChannelDescriptor>>,
    playlist_searches: TtlCache<Vec<PlaylistDescriptor>>,
    channel_videos: TtlCache<Vec<VideoDescriptor>>,
    playlist_videos: TtlCache<Vec<VideoDescriptor>>,
    raw_videos: TtlCache<RawVideo>,
    manifests: TtlCache<StreamManifest>,
}

impl<C: MetadataClient> MetadataResolver<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            videos: TtlCache::new(),
            channels: TtlCache::new(),
            playlists: TtlCache::new(),
            video_searches: TtlCache::new(),
            channel_searches: TtlCache::new(),
            playlist_searches: TtlCache::new(),
            channel_videos: TtlCache::new(),
            playlist_videos: TtlCache::new(),
            raw_videos: TtlCache::new(),
            manifests: TtlCache::new(),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Raw platform object for a video URL, cached on its own so descriptor
    /// mapping and stream resolution share one network round-trip
    pub async fn raw_video(&self, url: &str) -> PipelineResult<Option<RawVideo>> {
        let key = EntityKind::RawVideo.cache_key(url);
        self.raw_videos
            .get_or_populate(&key, || self.client.video(url))
            .await
    }

    pub async fn video(&self, url: &str) -> PipelineResult<Option<VideoDescriptor>> {
        let key = EntityKind::Video.cache_key(url);
        self.videos
            .get_or_populate(&key, || async {
                Ok(self.raw_video(url).await?.as_ref().map(map_video))
            })
            .await
    }

    /// Channel lookup. The URL shape (handle, legacy name, canonical id) is
    /// parsed first so the cache key is the canonical identifier.
    pub async fn channel(&self, url: &str) -> PipelineResult<Option<ChannelDescriptor>> {
        let kind = ChannelUrlKind::parse(url)?;
        let key = EntityKind::Channel.cache_key(&kind.identifier());
        self.channels
            .get_or_populate(&key, || async {
                Ok(self.client.channel(&kind).await?.as_ref().map(map_channel))
            })
            .await
    }

    pub async fn playlist(&self, url: &str) -> PipelineResult<Option<PlaylistDescriptor>> {
        let id = playlist_id_from_url(url)?;
        let key = EntityKind::Playlist.cache_key(&id);
        self.playlists
            .get_or_populate(&key, || async {
                Ok(self.client.playlist(url).await?.as_ref().map(map_playlist))
            })
            .await
    }

    pub async fn search_videos(&self, query: &str) -> PipelineResult<Vec<VideoDescriptor>> {
        let key = EntityKind::VideoSearch.cache_key(query);
        let results = self
            .video_searches
            .get_or_populate(&key, || async {
                let raw = self.client.search_videos(query, SEARCH_CAP).await?;
                Ok(Some(raw.iter().map(map_video).collect()))
            })
            .await?;
        Ok(results.unwrap_or_default())
    }

    pub async fn search_channels(&self, query: &str) -> PipelineResult<Vec<ChannelDescriptor>> {
        let key = EntityKind::ChannelSearch.cache_key(query);
        let results = self
            .channel_searches
            .get_or_populate(&key, || async {
                let raw = self.client.search_channels(query, SEARCH_CAP).await?;
                Ok(Some(raw.iter().map(map_channel).collect()))
            })
            .await?;
        Ok(results.unwrap_or_default())
    }

    pub async fn search_playlists(&self, query: &str) -> PipelineResult<Vec<PlaylistDescriptor>> {
        let key = EntityKind::PlaylistSearch.cache_key(query);
        let results = self
            .playlist_searches
            .get_or_populate(&key, || async {
                let raw = self.client.search_playlists(query, SEARCH_CAP).await?;
                Ok(Some(raw.iter().map(map_playlist).collect()))
            })
            .await?;
        Ok(results.unwrap_or_default())
    }

    /// Uploads of a channel, newest first as the platform reports them
    pub async fn channel_videos(&self, url: &str) -> PipelineResult<Vec<VideoDescriptor>> {
        let kind = ChannelUrlKind::parse(url)?;
        let key = EntityKind::ChannelVideos.cache_key(&kind.identifier());
        let results = self
            .channel_videos
            .get_or_populate(&key, || async {
                let raw = self.client.channel_videos(url).await?;
                Ok(Some(raw.iter().map(map_video).collect()))
            })
            .await?;
        Ok(results.unwrap_or_default())
    }

    pub async fn playlist_videos(&self, url: &str) -> PipelineResult<Vec<VideoDescriptor>> {
        let id = playlist_id_from_url(url)?;
        let key = EntityKind::PlaylistVideos.cache_key(&id);
        let results = self
            .playlist_videos
            .get_or_populate(&key, || async {
                let raw = self.client.playlist_videos(&id).await?;
                Ok(Some(raw.iter().map(map_video).collect()))
            })
            .await?;
        Ok(results.unwrap_or_default())
    }

    /// Available stream variants of a video, cached per video id
    pub async fn stream_manifest(&self, video_id: &str) -> PipelineResult<StreamManifest> {
        let key = EntityKind::Manifest.cache_key(video_id);
        let manifest = self
            .manifests
            .get_or_populate(&key, || async {
                Ok(Some(self.client.stream_manifest(video_id).await?))
            })
            .await?;
        // populate never returns None above
        Ok(manifest.unwrap_or_default())
    }

    /// Replace a descriptor's placeholder thumbnail with the raw object's, if
    /// it has one. Works on the caller's copy; cached entries are untouched.
    pub fn backfill_thumbnail(&self, video: &mut VideoDescriptor, raw: &RawVideo) {
        if let Some(thumbnail) = raw.thumbnail.as_deref() {
            video.set_thumbnail(thumbnail);
        }
    }

    /// Drop every cached entry, across all entity kinds
    pub fn clear_caches(&self) {
        debug!("[resolver] clearing all caches");
        self.videos.clear();
        self.channels.clear();
        self.playlists.clear();
        self.video_searches.clear();
        self.channel_searches.clear();
        self.playlist_searches.clear();
        self.channel_videos.clear();
        self.playlist_videos.clear();
        self.raw_videos.clear();
        self.manifests.clear();
    }
}
