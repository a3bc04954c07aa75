// Video download pipeline: cached metadata resolution, stream selection and
// orchestrated transfers

pub mod cache;
pub mod client;
pub mod encoder;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod paths;
pub mod resolver;
pub mod selection;
pub mod transfer;

pub use cache::{TtlCache, DEFAULT_TTL};
pub use client::{ChannelUrlKind, EntityStore, MetadataClient, RawChannel, RawPlaylist, RawVideo};
pub use encoder::Encoder;
pub use errors::{PipelineError, PipelineResult};
pub use models::{
    AuthorRef, ChannelDescriptor, EntityKind, JobSettings, PlaylistDescriptor, ProgressFn,
    StreamDescriptor, StreamKind, StreamManifest, StreamSelection, SubtitleTrack, VideoDescriptor,
    PLACEHOLDER_THUMBNAIL,
};
pub use orchestrator::{DownloadJob, JobState, Orchestrator, StateFn};
pub use paths::BaseFolder;
pub use resolver::{MetadataResolver, SEARCH_CAP};
pub use selection::{select, HIGHEST, STANDARD_CONTAINER};
