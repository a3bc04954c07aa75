// Download orchestration: resolve, select, transfer, merge, captions

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::client::MetadataClient;
use super::encoder::Encoder;
use super::errors::{PipelineError, PipelineResult};
use super::models::{JobSettings, ProgressFn, StreamSelection, VideoDescriptor};
use super::paths::{resolve_destination, sanitize, subtitle_directory};
use super::resolver::MetadataResolver;
use super::selection::select;
use super::transfer::download_to_file;

/// Progress share given to the video transfer of a separate-stream job; audio
/// takes the rest up to 0.9, the merge accounts for the final stretch
const VIDEO_SHARE: f32 = 0.45;
const AUDIO_SHARE: f32 = 0.45;

/// Lifecycle of a single download job. Terminal states are `Completed`,
/// `Cancelled` and `Failed`; cancellation can interrupt any earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Resolving,
    Selecting,
    Transferring,
    Subtitles,
    Completed,
    Cancelled,
    Failed,
}

/// State transition callback
pub type StateFn = Arc<dyn Fn(JobState) + Send + Sync>;

/// One download request. Settings are snapshotted at construction; changing
/// application settings after a job is created does not affect it.
#[derive(Clone)]
pub struct DownloadJob {
    pub url: String,
    pub settings: JobSettings,
    /// Playlist title this video belongs to, for subdirectory placement
    pub playlist_title: Option<String>,
    token: CancellationToken,
    progress: Option<ProgressFn>,
    on_state: Option<StateFn>,
}

impl DownloadJob {
    pub fn new(url: &str, settings: JobSettings) -> Self {
        Self {
            url: url.to_string(),
            settings,
            playlist_title: None,
            token: CancellationToken::new(),
            progress: None,
            on_state: None,
        }
    }

    pub fn with_playlist_title(mut self, title: &str) -> Self {
        self.playlist_title = Some(title.to_string());
        self
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_state_callback(mut self, on_state: StateFn) -> Self {
        self.on_state = Some(on_state);
        self
    }

    /// Token that cancels this job when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn set_state(&self, state: JobState) {
        if let Some(on_state) = &self.on_state {
            on_state(state);
        }
    }

    fn report(&self, fraction: f32) {
        if let Some(progress) = &self.progress {
            progress(fraction);
        }
    }

    /// Progress callback covering `[start, start + share]` of the whole job
    fn scaled_progress(&self, start: f32, share: f32) -> Option<ProgressFn> {
        let progress = self.progress.clone()?;
        Some(Arc::new(move |f: f32| progress(start + f * share)))
    }

    fn check_cancelled(&self) -> PipelineResult<()> {
        if self.token.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Drives download jobs end to end: metadata resolution through the cached
/// resolver, stream selection, byte transfer, optional encoder merge and
/// optional caption download.
pub struct Orchestrator<C: MetadataClient> {
    resolver: Arc<MetadataResolver<C>>,
    http: reqwest::Client,
}

impl<C: MetadataClient> Orchestrator<C> {
    pub fn new(resolver: Arc<MetadataResolver<C>>) -> Self {
        Self {
            resolver,
            http: reqwest::Client::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<MetadataResolver<C>> {
        &self.resolver
    }

    /// Run one job to completion. On success the final media path is
    /// returned. Cancellation resets reported progress to 0.0 and surfaces
    /// as [`PipelineError::Cancelled`]; every other error leaves progress
    /// where it was and moves the job to `Failed`.
    pub async fn download(&self, job: &DownloadJob) -> PipelineResult<PathBuf> {
        match self.run(job).await {
            Ok(path) => {
                job.report(1.0);
                job.set_state(JobState::Completed);
                info!("[orchestrator] completed: {}", path.display());
                Ok(path)
            }
            Err(e) if e.is_cancelled() => {
                job.report(0.0);
                job.set_state(JobState::Cancelled);
                info!("[orchestrator] cancelled: {}", job.url);
                Err(e)
            }
            Err(e) => {
                job.set_state(JobState::Failed);
                warn!("[orchestrator] failed: {}: {}", job.url, e);
                Err(e)
            }
        }
    }

    async fn run(&self, job: &DownloadJob) -> PipelineResult<PathBuf> {
        job.set_state(JobState::Resolving);
        job.check_cancelled()?;

        let video = self
            .resolver
            .video(&job.url)
            .await?
            .ok_or_else(|| PipelineError::NotFound(job.url.clone()))?;

        job.set_state(JobState::Selecting);
        job.check_cancelled()?;

        let encoder = match job.settings.encoder_path.as_deref() {
            Some(path) => Encoder::at(path).await,
            None => None,
        };
        let manifest = self.resolver.stream_manifest(&video.id).await?;
        let selection = select(
            &manifest,
            &job.settings.preferred_resolution,
            encoder.is_some(),
        )?;

        let playlist = job
            .settings
            .playlist_subdirectory
            .then_some(job.playlist_title.as_deref())
            .flatten();
        let dest = resolve_destination(
            &job.settings.base_folder,
            &video.title,
            selection.container(),
            playlist,
        )
        .await?;

        job.set_state(JobState::Transferring);
        job.check_cancelled()?;

        match &selection {
            StreamSelection::Muxed(stream) => {
                download_to_file(
                    &self.http,
                    &stream.url,
                    &dest,
                    job.progress.as_ref(),
                    &job.token,
                )
                .await?;
            }
            StreamSelection::Separate { audio, video: vid } => {
                let encoder = encoder.ok_or_else(|| {
                    PipelineError::Encoder("separate selection without encoder".into())
                })?;
                self.transfer_and_merge(job, &encoder, &dest, &vid.url, &audio.url)
                    .await?;
            }
        }

        if job.settings.download_subtitles {
            job.set_state(JobState::Subtitles);
            // The media file is already complete; nothing in the subtitle
            // step may fail the job except cancellation
            match self.download_subtitles(job, &video, &dest).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!("[orchestrator] subtitle step failed for {}: {}", video.id, e);
                }
            }
        }

        Ok(dest)
    }

    async fn transfer_and_merge(
        &self,
        job: &DownloadJob,
        encoder: &Encoder,
        dest: &Path,
        video_url: &str,
        audio_url: &str,
    ) -> PipelineResult<()> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let stem = dest
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());
        let video_part = parent.join(format!(".{}.video.mp4", stem));
        let audio_part = parent.join(format!(".{}.audio.mp4", stem));

        let result = async {
            let video_progress = job.scaled_progress(0.0, VIDEO_SHARE);
            download_to_file(
                &self.http,
                video_url,
                &video_part,
                video_progress.as_ref(),
                &job.token,
            )
            .await?;

            let audio_progress = job.scaled_progress(VIDEO_SHARE, AUDIO_SHARE);
            download_to_file(
                &self.http,
                audio_url,
                &audio_part,
                audio_progress.as_ref(),
                &job.token,
            )
            .await?;

            encoder.merge(&video_part, &audio_part, dest, &job.token).await
        }
        .await;

        for part in [&video_part, &audio_part] {
            if let Err(e) = tokio::fs::remove_file(part).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("[orchestrator] could not remove {}: {}", part.display(), e);
                }
            }
        }
        result
    }

    /// Caption download, best-effort end to end: the caller swallows every
    /// error from here except cancellation.
    async fn download_subtitles(
        &self,
        job: &DownloadJob,
        video: &VideoDescriptor,
        dest: &Path,
    ) -> PipelineResult<()> {
        let tracks = self.resolver.client().subtitle_manifest(&video.id).await?;
        if tracks.is_empty() {
            return Ok(());
        }

        let dir = subtitle_directory(dest, &video.title);
        tokio::fs::create_dir_all(&dir).await?;

        for track in &tracks {
            job.check_cancelled()?;
            let path = dir.join(format!("{}.srt", sanitize(&track.language)));
            self.resolver
                .client()
                .download_caption(track, &path, &job.token)
                .await?;
        }
        info!("[orchestrator] saved {} caption file(s) to {}", tracks.len(), dir.display());
        Ok(())
    }

    /// Run a batch of jobs sequentially under one shared token. The token is
    /// checked before each item starts; once cancelled, remaining items are
    /// reported cancelled without any work.
    pub async fn download_all(
        &self,
        jobs: &[DownloadJob],
    ) -> Vec<(String, PipelineResult<PathBuf>)> {
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            if job.token.is_cancelled() {
                job.report(0.0);
                job.set_state(JobState::Cancelled);
                results.push((job.url.clone(), Err(PipelineError::Cancelled)));
                continue;
            }
            let result = self.download(job).await;
            results.push((job.url.clone(), result));
        }
        results
    }
}
