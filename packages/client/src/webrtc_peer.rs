//! webrtc-rs binding of the peer-connection capability.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use duocall_server::domain::IceServer;
use duocall_server::infrastructure::dto::websocket::{IceCandidate, SdpKind, SessionDescription};
use tokio::sync::Mutex;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

use crate::domain::MediaKind;
use crate::error::PeerError;
use crate::media::RtcTrack;
use crate::peer::{
    MediaTrack, OfferOptions, PeerConnection, PeerConnectionFactory, PeerConnectionState,
    PeerEvent, PeerEventSender,
};

const ICE_CANDIDATE_POOL_SIZE: u8 = 10;

/// Builds webrtc-rs peer connections for the given ICE servers
#[derive(Debug, Clone)]
pub struct RtcPeerConnectionFactory {
    ice_servers: Vec<IceServer>,
}

impl RtcPeerConnectionFactory {
    pub fn new(ice_servers: Vec<IceServer>) -> Self {
        Self { ice_servers }
    }

    fn configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self.ice_servers.iter().map(rtc_ice_server).collect(),
            ice_candidate_pool_size: ICE_CANDIDATE_POOL_SIZE,
            bundle_policy: RTCBundlePolicy::MaxBundle,
            rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerConnectionFactory for RtcPeerConnectionFactory {
    type Peer = RtcPeerConnection;

    async fn create(&self, events: PeerEventSender) -> Result<RtcPeerConnection, PeerError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(other)?;

        // one interceptor registry per peer connection
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(other)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let pc = Arc::new(
            api.new_peer_connection(self.configuration())
                .await
                .map_err(other)?,
        );
        register_callbacks(&pc, events);

        tracing::debug!(
            "Created peer connection with {} ICE server(s)",
            self.ice_servers.len()
        );
        Ok(RtcPeerConnection {
            pc,
            senders: Mutex::new(HashMap::new()),
            receivers: Mutex::new(HashSet::new()),
        })
    }
}

/// Forward webrtc-rs callbacks as [`PeerEvent`]s
fn register_callbacks(pc: &Arc<RTCPeerConnection>, events: PeerEventSender) {
    let candidate_events = events.clone();
    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let events = candidate_events.clone();
        Box::pin(async move {
            // None marks the end of gathering
            let Some(candidate) = candidate else {
                return;
            };
            match candidate.to_json() {
                Ok(init) => {
                    let _ = events.send(PeerEvent::LocalCandidate(ice_candidate_from_init(init)));
                }
                Err(err) => tracing::warn!("Failed to serialize local ICE candidate: {}", err),
            }
        })
    }));

    let state_events = events.clone();
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        if let Some(state) = connection_state(state) {
            let _ = state_events.send(PeerEvent::ConnectionStateChanged(state));
        }
        Box::pin(async {})
    }));

    pc.on_track(Box::new(move |track, _receiver, _transceiver| {
        let events = events.clone();
        Box::pin(async move {
            if let Some(kind) = media_kind(track.kind()) {
                let _ = events.send(PeerEvent::RemoteTrack {
                    kind,
                    track_id: track.id().to_string(),
                });
            }
        })
    }));
}

/// A webrtc-rs peer connection with its outgoing senders indexed by kind
pub struct RtcPeerConnection {
    pc: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<MediaKind, Arc<RTCRtpSender>>>,
    /// Kinds with a receive-only transceiver
    receivers: Mutex<HashSet<MediaKind>>,
}

impl RtcPeerConnection {
    /// Make sure the offer asks for `kind` even without a local track of that kind
    async fn ensure_receiving(&self, kind: MediaKind) -> Result<(), PeerError> {
        if self.senders.lock().await.contains_key(&kind) {
            return Ok(());
        }
        let mut receivers = self.receivers.lock().await;
        if receivers.contains(&kind) {
            return Ok(());
        }

        self.pc
            .add_transceiver_from_kind(
                codec_type(kind),
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(|err| PeerError::Track(err.to_string()))?;
        receivers.insert(kind);
        Ok(())
    }
}

#[async_trait]
impl PeerConnection for RtcPeerConnection {
    type Track = RtcTrack;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, PeerError> {
        if options.receive_audio {
            self.ensure_receiving(MediaKind::Audio).await?;
        }
        if options.receive_video {
            self.ensure_receiving(MediaKind::Video).await?;
        }

        let offer = self
            .pc
            .create_offer(Some(RTCOfferOptions {
                ice_restart: options.ice_restart,
                voice_activity_detection: false,
            }))
            .await
            .map_err(|err| PeerError::CreateDescription(err.to_string()))?;
        session_description_from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|err| PeerError::CreateDescription(err.to_string()))?;
        session_description_from_rtc(answer)
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.pc
            .set_local_description(rtc_session_description(description)?)
            .await
            .map_err(|err| PeerError::ApplyDescription(err.to_string()))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.pc
            .set_remote_description(rtc_session_description(description)?)
            .await
            .map_err(|err| PeerError::ApplyDescription(err.to_string()))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: candidate.username_fragment,
            })
            .await
            .map_err(|err| PeerError::Candidate(err.to_string()))
    }

    async fn add_track(&self, track: Arc<RtcTrack>) -> Result<(), PeerError> {
        let sender = self
            .pc
            .add_track(track.local())
            .await
            .map_err(|err| PeerError::Track(err.to_string()))?;
        self.senders.lock().await.insert(track.kind(), sender);
        tracing::debug!("Added local {} track '{}'", track.kind(), track.id());
        Ok(())
    }

    async fn replace_track(
        &self,
        kind: MediaKind,
        track: Option<Arc<RtcTrack>>,
    ) -> Result<bool, PeerError> {
        let Some(sender) = self.senders.lock().await.get(&kind).cloned() else {
            return Ok(false);
        };
        sender
            .replace_track(track.map(|track| track.local()))
            .await
            .map_err(|err| PeerError::Track(err.to_string()))?;
        Ok(true)
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.pc.close().await.map_err(other)
    }
}

// ========================================
// Conversions
// ========================================

fn other(err: webrtc::Error) -> PeerError {
    PeerError::Other(err.to_string())
}

fn rtc_ice_server(server: &IceServer) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn rtc_session_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, PeerError> {
    let SessionDescription { kind, sdp } = description;
    let result = match kind {
        SdpKind::Offer => RTCSessionDescription::offer(sdp),
        SdpKind::Answer => RTCSessionDescription::answer(sdp),
        SdpKind::Pranswer => RTCSessionDescription::pranswer(sdp),
        SdpKind::Rollback => {
            return Err(PeerError::ApplyDescription(
                "rollback descriptions are not supported".to_string(),
            ));
        }
    };
    result.map_err(|err| PeerError::ApplyDescription(err.to_string()))
}

fn session_description_from_rtc(
    description: RTCSessionDescription,
) -> Result<SessionDescription, PeerError> {
    let kind = match description.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        RTCSdpType::Pranswer => SdpKind::Pranswer,
        RTCSdpType::Rollback => SdpKind::Rollback,
        RTCSdpType::Unspecified => {
            return Err(PeerError::CreateDescription(
                "description has no type".to_string(),
            ));
        }
    };
    Ok(SessionDescription {
        kind,
        sdp: description.sdp,
    })
}

fn ice_candidate_from_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn connection_state(state: RTCPeerConnectionState) -> Option<PeerConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(PeerConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(PeerConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(PeerConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(PeerConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(PeerConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(PeerConnectionState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

fn media_kind(codec_type: RTPCodecType) -> Option<MediaKind> {
    match codec_type {
        RTPCodecType::Audio => Some(MediaKind::Audio),
        RTPCodecType::Video => Some(MediaKind::Video),
        RTPCodecType::Unspecified => None,
    }
}

fn codec_type(kind: MediaKind) -> RTPCodecType {
    match kind {
        MediaKind::Audio => RTPCodecType::Audio,
        MediaKind::Video => RTPCodecType::Video,
    }
}
