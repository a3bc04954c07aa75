// Stream selection policy: which variant(s) of a video to transfer

use tracing::debug;

use super::errors::{PipelineError, PipelineResult};
use super::models::{StreamDescriptor, StreamKind, StreamManifest, StreamSelection};

/// Sentinel resolution preference meaning "best the manifest offers"
pub const HIGHEST: &str = "highest";

/// Container the selection is restricted to. Keeps outputs playable
/// everywhere without probing codec support.
pub const STANDARD_CONTAINER: &str = "mp4";

/// Pick the stream(s) to download.
///
/// Without an encoder only muxed streams qualify, since separate audio and
/// video cannot be combined afterwards. With one, the best audio-only stream
/// is paired with a video-only stream at the preferred quality, which reaches
/// resolutions the platform never offers muxed.
///
/// A preference that matches no label falls back to the highest available
/// quality rather than failing.
pub fn select(
    manifest: &StreamManifest,
    preference: &str,
    encoder_available: bool,
) -> PipelineResult<StreamSelection> {
    if encoder_available {
        let audio = best_audio(manifest)?;
        let video = pick(manifest, StreamKind::VideoOnly, preference)?;
        debug!(
            "[selection] separate: video {} + audio {} bps",
            video.quality_label, audio.bitrate
        );
        Ok(StreamSelection::Separate { audio, video })
    } else {
        let muxed = pick(manifest, StreamKind::Muxed, preference)?;
        debug!("[selection] muxed: {}", muxed.quality_label);
        Ok(StreamSelection::Muxed(muxed))
    }
}

/// Numeric ordinal of a quality label: the leading digits of e.g. "1080p" or
/// "720p60". Labels without a leading number rank lowest.
fn quality_ordinal(label: &str) -> u32 {
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

fn candidates<'a>(
    manifest: &'a StreamManifest,
    kind: StreamKind,
) -> impl Iterator<Item = &'a StreamDescriptor> {
    manifest
        .streams
        .iter()
        .filter(move |s| s.kind == kind && s.container == STANDARD_CONTAINER)
}

/// Pick a video-bearing stream by quality label. Exact label match wins;
/// otherwise the highest ordinal. Manifest order breaks ties, so strict
/// comparison keeps the first-listed stream.
fn pick(
    manifest: &StreamManifest,
    kind: StreamKind,
    preference: &str,
) -> PipelineResult<StreamDescriptor> {
    if preference != HIGHEST {
        if let Some(exact) = candidates(manifest, kind).find(|s| s.quality_label == preference) {
            return Ok(exact.clone());
        }
    }

    let mut best: Option<&StreamDescriptor> = None;
    for stream in candidates(manifest, kind) {
        if best.map_or(true, |b| {
            quality_ordinal(&stream.quality_label) > quality_ordinal(&b.quality_label)
        }) {
            best = Some(stream);
        }
    }
    best.cloned().ok_or_else(|| {
        PipelineError::NoSuitableStream(format!(
            "no {:?} {} stream in manifest",
            kind, STANDARD_CONTAINER
        ))
    })
}

/// Highest-bitrate audio-only stream in the standard container. Manifest
/// order breaks bitrate ties.
fn best_audio(manifest: &StreamManifest) -> PipelineResult<StreamDescriptor> {
    let mut best: Option<&StreamDescriptor> = None;
    for stream in candidates(manifest, StreamKind::AudioOnly) {
        if best.map_or(true, |b| stream.bitrate > b.bitrate) {
            best = Some(stream);
        }
    }
    best.cloned().ok_or_else(|| {
        PipelineError::NoSuitableStream(format!("no audio {} stream in manifest", STANDARD_CONTAINER))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(kind: StreamKind, container: &str, label: &str, bitrate: u64) -> StreamDescriptor {
        StreamDescriptor {
            kind,
            container: container.to_string(),
            quality_label: label.to_string(),
            bitrate,
            url: format!("https://cdn.example.com/{}-{}", label, bitrate),
        }
    }

    #[test]
    fn without_encoder_only_muxed_streams_qualify() {
        let manifest = StreamManifest::new(vec![
            stream(StreamKind::VideoOnly, "mp4", "2160p", 8_000_000),
            stream(StreamKind::Muxed, "mp4", "720p", 2_000_000),
            stream(StreamKind::AudioOnly, "mp4", "", 160_000),
        ]);

        let selection = select(&manifest, HIGHEST, false).unwrap();
        assert_eq!(
            selection,
            StreamSelection::Muxed(stream(StreamKind::Muxed, "mp4", "720p", 2_000_000))
        );
    }

    #[test]
    fn with_encoder_best_audio_pairs_with_video_only() {
        let manifest = StreamManifest::new(vec![
            stream(StreamKind::Muxed, "mp4", "720p", 2_000_000),
            stream(StreamKind::VideoOnly, "mp4", "2160p", 8_000_000),
            stream(StreamKind::AudioOnly, "mp4", "", 128_000),
            stream(StreamKind::AudioOnly, "mp4", "", 160_000),
        ]);

        match select(&manifest, HIGHEST, true).unwrap() {
            StreamSelection::Separate { audio, video } => {
                assert_eq!(audio.bitrate, 160_000);
                assert_eq!(video.quality_label, "2160p");
            }
            other => panic!("expected separate selection, got {:?}", other),
        }
    }

    #[test]
    fn highest_is_decided_by_label_not_list_position() {
        let manifest = StreamManifest::new(vec![
            stream(StreamKind::Muxed, "mp4", "480p", 1_000_000),
            stream(StreamKind::Muxed, "mp4", "1080p", 4_000_000),
            stream(StreamKind::Muxed, "mp4", "720p", 2_000_000),
        ]);

        let selection = select(&manifest, HIGHEST, false).unwrap();
        assert_eq!(
            selection,
            StreamSelection::Muxed(stream(StreamKind::Muxed, "mp4", "1080p", 4_000_000))
        );
    }

    #[test]
    fn exact_preference_beats_highest() {
        let manifest = StreamManifest::new(vec![
            stream(StreamKind::Muxed, "mp4", "1080p", 4_000_000),
            stream(StreamKind::Muxed, "mp4", "480p", 1_000_000),
        ]);

        let selection = select(&manifest, "480p", false).unwrap();
        assert_eq!(
            selection,
            StreamSelection::Muxed(stream(StreamKind::Muxed, "mp4", "480p", 1_000_000))
        );
    }

    #[test]
    fn unmatched_preference_falls_back_to_highest() {
        let manifest = StreamManifest::new(vec![
            stream(StreamKind::Muxed, "mp4", "480p", 1_000_000),
            stream(StreamKind::Muxed, "mp4", "720p", 2_000_000),
        ]);

        let selection = select(&manifest, "4K", false).unwrap();
        assert_eq!(
            selection,
            StreamSelection::Muxed(stream(StreamKind::Muxed, "mp4", "720p", 2_000_000))
        );
    }

    #[test]
    fn equal_labels_keep_manifest_order() {
        let first = stream(StreamKind::Muxed, "mp4", "720p", 1_500_000);
        let second = stream(StreamKind::Muxed, "mp4", "720p", 2_500_000);
        let manifest = StreamManifest::new(vec![first.clone(), second]);

        let selection = select(&manifest, HIGHEST, false).unwrap();
        assert_eq!(selection, StreamSelection::Muxed(first));
    }

    #[test]
    fn other_containers_are_filtered_out() {
        let manifest = StreamManifest::new(vec![
            stream(StreamKind::Muxed, "webm", "1080p", 4_000_000),
            stream(StreamKind::Muxed, "mp4", "360p", 500_000),
        ]);

        let selection = select(&manifest, HIGHEST, false).unwrap();
        assert_eq!(
            selection,
            StreamSelection::Muxed(stream(StreamKind::Muxed, "mp4", "360p", 500_000))
        );
    }

    #[test]
    fn no_candidate_in_container_is_an_error() {
        let manifest = StreamManifest::new(vec![stream(
            StreamKind::Muxed,
            "webm",
            "1080p",
            4_000_000,
        )]);

        let err = select(&manifest, HIGHEST, false).unwrap_err();
        assert!(matches!(err, PipelineError::NoSuitableStream(_)));

        let err = select(&StreamManifest::default(), HIGHEST, true).unwrap_err();
        assert!(matches!(err, PipelineError::NoSuitableStream(_)));
    }

    #[test]
    fn ordinals_compare_numerically() {
        assert!(quality_ordinal("1080p") > quality_ordinal("720p60"));
        assert!(quality_ordinal("144p") < quality_ordinal("240p"));
        assert_eq!(quality_ordinal("audio"), 0);
    }
}
