//! Hand-written fakes of the client capabilities for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use duocall_server::infrastructure::dto::websocket::{
    ClientMessage, IceCandidate, SdpKind, SessionDescription,
};
use tokio::sync::mpsc;

use crate::domain::{MediaConstraints, MediaKind, SessionNotice};
use crate::error::{MediaError, NegotiationError, PeerError};
use crate::negotiation::{JoinParams, NegotiationMachine};
use crate::peer::{
    MediaSource, MediaTrack, OfferOptions, PeerConnection, PeerConnectionFactory, PeerEvent,
    PeerEventReceiver, PeerEventSender,
};

#[derive(Debug)]
pub struct FakeTrack {
    id: String,
    kind: MediaKind,
    stopped: AtomicBool,
}

impl FakeTrack {
    pub fn new(id: &str, kind: MediaKind) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Calls observed on fake peer connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCall {
    CreateOffer(OfferOptions),
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddCandidate(String),
    AddTrack(String),
    ReplaceTrack(MediaKind, Option<String>),
    Close,
}

/// Shared record of every fake peer built by one factory
#[derive(Debug, Default)]
pub struct PeerLog {
    calls: Mutex<Vec<PeerCall>>,
    created: AtomicUsize,
    /// Event sender of each fake peer, in build order
    events: Mutex<Vec<PeerEventSender>>,
    pub fail_offers: AtomicBool,
    pub fail_candidates: AtomicBool,
}

impl PeerLog {
    pub fn calls(&self) -> Vec<PeerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Raise `event` from the `index`-th peer connection built (0-based)
    pub fn emit_from(&self, index: usize, event: PeerEvent) {
        let events = self.events.lock().unwrap();
        assert!(events[index].send(event), "peer event channel closed");
    }

    fn record(&self, call: PeerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct FakePeer {
    log: Arc<PeerLog>,
    senders: Mutex<HashSet<MediaKind>>,
}

#[async_trait]
impl PeerConnection for FakePeer {
    type Track = FakeTrack;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, PeerError> {
        self.log.record(PeerCall::CreateOffer(options));
        if self.log.fail_offers.load(Ordering::SeqCst) {
            return Err(PeerError::CreateDescription("offer rejected".to_string()));
        }
        Ok(offer_sdp(if options.ice_restart { "restart-offer" } else { "offer" }))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        self.log.record(PeerCall::CreateAnswer);
        Ok(answer_sdp("answer"))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.log.record(PeerCall::SetLocal(description));
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.log.record(PeerCall::SetRemote(description));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.log.record(PeerCall::AddCandidate(candidate.candidate));
        if self.log.fail_candidates.load(Ordering::SeqCst) {
            return Err(PeerError::Candidate("malformed candidate".to_string()));
        }
        Ok(())
    }

    async fn add_track(&self, track: Arc<FakeTrack>) -> Result<(), PeerError> {
        self.log.record(PeerCall::AddTrack(track.id().to_string()));
        self.senders.lock().unwrap().insert(track.kind());
        Ok(())
    }

    async fn replace_track(
        &self,
        kind: MediaKind,
        track: Option<Arc<FakeTrack>>,
    ) -> Result<bool, PeerError> {
        if !self.senders.lock().unwrap().contains(&kind) {
            return Ok(false);
        }
        self.log.record(PeerCall::ReplaceTrack(
            kind,
            track.map(|track| track.id().to_string()),
        ));
        Ok(true)
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.log.record(PeerCall::Close);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePeerFactory {
    pub log: Arc<PeerLog>,
}

#[async_trait]
impl PeerConnectionFactory for FakePeerFactory {
    type Peer = FakePeer;

    async fn create(&self, events: PeerEventSender) -> Result<FakePeer, PeerError> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        self.log.events.lock().unwrap().push(events);
        Ok(FakePeer {
            log: Arc::clone(&self.log),
            senders: Mutex::new(HashSet::new()),
        })
    }
}

/// Media source with a microphone, an optional camera and a screen
pub struct FakeMediaSource {
    pub has_camera: bool,
    pub has_microphone: bool,
    pub screen_denied: bool,
}

impl Default for FakeMediaSource {
    fn default() -> Self {
        Self {
            has_camera: true,
            has_microphone: true,
            screen_denied: false,
        }
    }
}

#[async_trait]
impl MediaSource for FakeMediaSource {
    type Track = FakeTrack;

    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Vec<Arc<FakeTrack>>, MediaError> {
        let mut tracks = Vec::new();
        if constraints.audio {
            if !self.has_microphone {
                return Err(MediaError::NotFound("audio".to_string()));
            }
            let id = constraints.audio_device.as_deref().unwrap_or("default-audio");
            tracks.push(FakeTrack::new(id, MediaKind::Audio));
        }
        if constraints.video {
            if !self.has_camera {
                return Err(MediaError::NotFound("video".to_string()));
            }
            let id = constraints.video_device.as_deref().unwrap_or("default-video");
            tracks.push(FakeTrack::new(id, MediaKind::Video));
        }
        Ok(tracks)
    }

    async fn acquire_screen(&self) -> Result<Arc<FakeTrack>, MediaError> {
        if self.screen_denied {
            return Err(MediaError::PermissionDenied("screen capture".to_string()));
        }
        Ok(FakeTrack::new("screen", MediaKind::Video))
    }
}

pub fn offer_sdp(sdp: &str) -> SessionDescription {
    SessionDescription {
        kind: SdpKind::Offer,
        sdp: sdp.to_string(),
    }
}

pub fn answer_sdp(sdp: &str) -> SessionDescription {
    SessionDescription {
        kind: SdpKind::Answer,
        sdp: sdp.to_string(),
    }
}

pub fn candidate(line: &str) -> IceCandidate {
    IceCandidate {
        candidate: line.to_string(),
        sdp_mid: Some("0".to_string()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    }
}

pub fn join_params() -> JoinParams {
    JoinParams {
        room_id: "room-1".to_string(),
        display_name: "Calm Otter".to_string(),
        client_id: "me".to_string(),
    }
}

pub type FakeMachine = NegotiationMachine<FakePeerFactory, mpsc::UnboundedSender<ClientMessage>>;

/// A machine wired to fakes, plus the channels it talks to
pub struct Harness {
    pub machine: FakeMachine,
    pub log: Arc<PeerLog>,
    pub outbox: mpsc::UnboundedReceiver<ClientMessage>,
    pub events: PeerEventReceiver,
}

impl Harness {
    pub fn new() -> Self {
        let factory = FakePeerFactory::default();
        let log = Arc::clone(&factory.log);
        let (signal_tx, outbox) = mpsc::unbounded_channel();
        let (events_tx, events) = PeerEventSender::channel();
        Self {
            machine: NegotiationMachine::new(factory, signal_tx, events_tx),
            log,
            outbox,
            events,
        }
    }

    /// Started and joined, with a microphone and a camera attached
    pub async fn joined() -> (Self, Vec<Arc<FakeTrack>>) {
        let mut harness = Self::new();
        let tracks = vec![
            FakeTrack::new("default-audio", MediaKind::Audio),
            FakeTrack::new("default-video", MediaKind::Video),
        ];
        harness
            .machine
            .start(join_params(), tracks.clone())
            .await
            .unwrap();
        harness
            .machine
            .handle_server_message(
                duocall_server::infrastructure::dto::websocket::ServerMessage::Joined {
                    room_id: "room-1".to_string(),
                    client_id: "me".to_string(),
                    participants: 1,
                },
            )
            .await
            .unwrap();
        harness.sent();
        harness.log.clear();
        (harness, tracks)
    }

    /// Raise `event` from the most recently built peer connection
    pub fn emit(&self, event: PeerEvent) {
        self.log.emit_from(self.log.created() - 1, event);
    }

    /// Hand the oldest queued peer event to the machine
    pub async fn deliver(&mut self) -> Result<Option<SessionNotice>, NegotiationError> {
        let envelope = self.events.try_recv().expect("no queued peer event");
        self.machine.handle_peer_event(envelope).await
    }

    /// Raise `event` from the current peer connection and handle it
    pub async fn raise(
        &mut self,
        event: PeerEvent,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        self.emit(event);
        self.deliver().await
    }

    /// Every envelope sent since the last call
    pub fn sent(&mut self) -> Vec<ClientMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.outbox.try_recv() {
            messages.push(message);
        }
        messages
    }
}
