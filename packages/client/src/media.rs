//! Local media.
//!
//! A terminal client has no capture pipeline, so [`SyntheticMediaSource`] hands out
//! webrtc-rs RTP tracks (Opus audio, VP8 video) that stand in for devices. The device id
//! becomes the track id.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;

use crate::domain::{MediaConstraints, MediaKind};
use crate::error::MediaError;
use crate::peer::{MediaSource, MediaTrack};

const LOCAL_STREAM_ID: &str = "duocall-local";
const SCREEN_STREAM_ID: &str = "duocall-screen";
const DEFAULT_AUDIO_DEVICE: &str = "default-audio";
const DEFAULT_VIDEO_DEVICE: &str = "default-video";
const SCREEN_TRACK_ID: &str = "screen";

/// A local track backed by a webrtc-rs RTP track
pub struct RtcTrack {
    kind: MediaKind,
    local: Arc<TrackLocalStaticRTP>,
    stopped: AtomicBool,
}

impl RtcTrack {
    pub fn new(kind: MediaKind, track_id: &str, stream_id: &str) -> Self {
        let mime_type = match kind {
            MediaKind::Audio => MIME_TYPE_OPUS,
            MediaKind::Video => MIME_TYPE_VP8,
        };
        let capability = RTCRtpCodecCapability {
            mime_type: mime_type.to_owned(),
            ..Default::default()
        };
        Self {
            kind,
            local: Arc::new(TrackLocalStaticRTP::new(
                capability,
                track_id.to_owned(),
                stream_id.to_owned(),
            )),
            stopped: AtomicBool::new(false),
        }
    }

    /// The track as webrtc-rs senders take it
    pub fn local(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        Arc::clone(&self.local) as Arc<dyn TrackLocal + Send + Sync>
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for RtcTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtcTrack")
            .field("id", &self.id())
            .field("kind", &self.kind)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl MediaTrack for RtcTrack {
    fn id(&self) -> &str {
        self.local.id()
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!("Stopped local {} track '{}'", self.kind, self.id());
        }
    }
}

/// Stand-in capture devices
#[derive(Debug, Clone)]
pub struct SyntheticMediaSource {
    has_camera: bool,
}

impl SyntheticMediaSource {
    pub fn new(has_camera: bool) -> Self {
        Self { has_camera }
    }
}

impl Default for SyntheticMediaSource {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl MediaSource for SyntheticMediaSource {
    type Track = RtcTrack;

    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Vec<Arc<RtcTrack>>, MediaError> {
        let mut tracks = Vec::new();
        if constraints.audio {
            let device = constraints
                .audio_device
                .as_deref()
                .unwrap_or(DEFAULT_AUDIO_DEVICE);
            tracks.push(Arc::new(RtcTrack::new(
                MediaKind::Audio,
                device,
                LOCAL_STREAM_ID,
            )));
        }
        if constraints.video {
            if !self.has_camera {
                return Err(MediaError::NotFound(MediaKind::Video.to_string()));
            }
            let device = constraints
                .video_device
                .as_deref()
                .unwrap_or(DEFAULT_VIDEO_DEVICE);
            tracks.push(Arc::new(RtcTrack::new(
                MediaKind::Video,
                device,
                LOCAL_STREAM_ID,
            )));
        }
        Ok(tracks)
    }

    async fn acquire_screen(&self) -> Result<Arc<RtcTrack>, MediaError> {
        Ok(Arc::new(RtcTrack::new(
            MediaKind::Video,
            SCREEN_TRACK_ID,
            SCREEN_STREAM_ID,
        )))
    }
}

/// Tracks acquired for a call
#[derive(Debug)]
pub struct LocalMedia<T> {
    pub tracks: Vec<Arc<T>>,
    pub audio_only: bool,
}

/// Acquire microphone and camera, falling back to the microphone alone.
///
/// With `audio_only` set the camera is never requested.
pub async fn acquire_local_media<M: MediaSource>(
    source: &M,
    audio_only: bool,
) -> Result<LocalMedia<M::Track>, MediaError> {
    if !audio_only {
        match source.acquire(&MediaConstraints::audio_video()).await {
            Ok(tracks) => {
                let has_video = tracks.iter().any(|track| track.kind() == MediaKind::Video);
                return Ok(LocalMedia {
                    tracks,
                    audio_only: !has_video,
                });
            }
            Err(err) => {
                tracing::warn!("Camera unavailable ({}), falling back to audio only", err);
            }
        }
    }

    let tracks = source.acquire(&MediaConstraints::audio_only()).await?;
    Ok(LocalMedia {
        tracks,
        audio_only: true,
    })
}
