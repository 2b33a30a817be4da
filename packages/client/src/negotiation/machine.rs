//! Negotiation state machine.
//!
//! The machine is driven from a single task: every relay message and every peer event is
//! handed to it in turn, so no locking is needed around the negotiation state.

use std::sync::Arc;

use duocall_server::infrastructure::dto::websocket::{
    ClientMessage, IceCandidate, ServerMessage, SessionDescription,
};

use crate::domain::{ChatEntry, MediaKind, SessionNotice};
use crate::error::{NegotiationError, UserNotice};
use crate::peer::{
    MediaTrack, OfferOptions, PeerConnection, PeerConnectionFactory, PeerConnectionState,
    PeerEvent, PeerEventEnvelope, PeerEventSender, SignalSink,
};

use super::candidate_buffer::CandidateBuffer;
use super::state::{NegotiationState, Phase};

/// Track type used by the peer connections a factory builds
pub type LocalTrack<F> = <<F as PeerConnectionFactory>::Peer as PeerConnection>::Track;

/// What the local client asks the relay for when joining
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinParams {
    pub room_id: String,
    pub display_name: String,
    pub client_id: String,
}

/// Result of putting a track on the outgoing sender of its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSubstitution {
    /// Swapped in place; no offer/answer exchange
    Replaced,
    /// No sender existed, so a new one was added
    Added,
    /// Nothing to remove the track from
    Unchanged,
}

pub struct NegotiationMachine<F, S>
where
    F: PeerConnectionFactory,
    S: SignalSink,
{
    factory: F,
    signal: S,
    /// Sender of the current peer connection; its generation identifies that connection
    events: PeerEventSender,
    peer: Option<F::Peer>,
    local_tracks: Vec<Arc<LocalTrack<F>>>,
    state: NegotiationState,
    phase: Phase,
    join: Option<JoinParams>,
}

impl<F, S> NegotiationMachine<F, S>
where
    F: PeerConnectionFactory,
    S: SignalSink,
{
    /// Peer connections built by `factory` report to `events`.
    pub fn new(factory: F, signal: S, events: PeerEventSender) -> Self {
        Self {
            factory,
            signal,
            events,
            peer: None,
            local_tracks: Vec::new(),
            state: NegotiationState::new(),
            phase: Phase::Idle,
            join: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.state.peer_id.as_deref()
    }

    pub fn join_params(&self) -> Option<&JoinParams> {
        self.join.as_ref()
    }

    pub fn has_peer_connection(&self) -> bool {
        self.peer.is_some()
    }

    /// The camera or microphone track currently held for `kind`
    pub fn local_track(&self, kind: MediaKind) -> Option<Arc<LocalTrack<F>>> {
        self.local_tracks
            .iter()
            .find(|track| track.kind() == kind)
            .cloned()
    }

    /// Build the peer connection with the local tracks attached and ask the relay to join.
    pub async fn start(
        &mut self,
        join: JoinParams,
        tracks: Vec<Arc<LocalTrack<F>>>,
    ) -> Result<(), NegotiationError> {
        if self.phase != Phase::Idle {
            return Err(self.invalid_phase("join a room"));
        }

        self.local_tracks = tracks;
        self.ensure_peer().await?;
        self.signal.send(ClientMessage::Join {
            room_id: join.room_id.clone(),
            user_name: join.display_name.clone(),
            client_id: join.client_id.clone(),
        })?;

        tracing::info!("Joining room '{}' as '{}'", join.room_id, join.display_name);
        self.join = Some(join);
        self.phase = Phase::Joining;
        Ok(())
    }

    /// React to one envelope from the relay.
    pub async fn handle_server_message(
        &mut self,
        message: ServerMessage,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        if matches!(self.phase, Phase::Idle | Phase::Ended) {
            tracing::debug!("Ignoring relay message while {}: {:?}", self.phase, message);
            return Ok(None);
        }

        match message {
            ServerMessage::Joined {
                room_id,
                participants,
                ..
            } => {
                if self.phase == Phase::Joining {
                    self.phase = Phase::WaitingForPeer;
                }
                tracing::info!("Joined room '{}' ({} participant(s))", room_id, participants);
                Ok(Some(SessionNotice::Joined {
                    room_id,
                    participants,
                }))
            }
            ServerMessage::Ready { peer_id, peer_name } => self.on_ready(peer_id, peer_name).await,
            ServerMessage::PeerJoined { peer_id, peer_name } => {
                self.on_peer_joined(peer_id, peer_name).await
            }
            ServerMessage::PeerLeft { peer_id } => self.on_peer_left(peer_id).await,
            ServerMessage::CallEndedByCreator { creator_name } => {
                tracing::info!("Call ended by {}", creator_name);
                self.teardown().await;
                self.phase = Phase::Ended;
                Ok(Some(SessionNotice::CallEnded { creator_name }))
            }
            ServerMessage::Error { message } => {
                if self.phase == Phase::Joining {
                    tracing::warn!("Join rejected: {}", message);
                    self.teardown().await;
                    self.phase = Phase::Idle;
                    return Ok(Some(SessionNotice::JoinRejected { message }));
                }
                tracing::warn!("Relay error: {}", message);
                Ok(Some(UserNotice::error(message).into()))
            }
            ServerMessage::Offer { offer, from } => self.on_offer(offer, from).await,
            ServerMessage::Answer { answer, from } => self.on_answer(answer, from).await,
            ServerMessage::IceCandidate { candidate, from } => {
                self.on_remote_candidate(candidate, from).await
            }
            ServerMessage::ChatMessage {
                message,
                sender_name,
                timestamp,
                ..
            } => Ok(Some(SessionNotice::Chat(ChatEntry {
                sender_name,
                message,
                timestamp,
            }))),
            ServerMessage::TypingIndicator { is_typing, .. } => {
                Ok(Some(SessionNotice::Typing { is_typing }))
            }
            ServerMessage::ScreenShareState { is_sharing, .. } => {
                Ok(Some(SessionNotice::RemoteScreenShare { is_sharing }))
            }
        }
    }

    /// React to one callback of the current peer connection.
    ///
    /// Events raised by a connection that has since been closed or replaced are dropped.
    pub async fn handle_peer_event(
        &mut self,
        envelope: PeerEventEnvelope,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        if self.peer.is_none() || envelope.generation != self.events.generation() {
            tracing::debug!(
                "Dropping event of closed peer connection #{}: {:?}",
                envelope.generation,
                envelope.event
            );
            return Ok(None);
        }

        match envelope.event {
            PeerEvent::LocalCandidate(candidate) => {
                // outgoing candidates are never buffered
                match self.state.peer_id.clone() {
                    Some(target) => {
                        self.signal
                            .send(ClientMessage::IceCandidate { candidate, target })?;
                    }
                    None => tracing::debug!("Dropping local ICE candidate: no peer yet"),
                }
                Ok(None)
            }
            PeerEvent::ConnectionStateChanged(state) => self.on_connection_state(state).await,
            PeerEvent::RemoteTrack { kind, track_id } => {
                tracing::info!("Remote {} track received: {}", kind, track_id);
                Ok(Some(SessionNotice::RemoteTrack { kind }))
            }
        }
    }

    /// Leave the room, keeping it alive for the peer.
    pub async fn leave(&mut self) -> Result<(), NegotiationError> {
        self.terminate(ClientMessage::Leave, "leave the room").await
    }

    /// End the call for everyone in the room.
    pub async fn end_call(&mut self) -> Result<(), NegotiationError> {
        self.terminate(ClientMessage::EndCall, "end the call").await
    }

    pub fn send_chat(
        &self,
        message: impl Into<String>,
        timestamp: i64,
    ) -> Result<(), NegotiationError> {
        let target = self
            .state
            .peer_id
            .clone()
            .ok_or(NegotiationError::UnknownPeer)?;
        let sender_name = self
            .join
            .as_ref()
            .map(|join| join.display_name.clone())
            .unwrap_or_default();
        self.signal.send(ClientMessage::ChatMessage {
            message: message.into(),
            sender_name,
            timestamp,
            target,
        })?;
        Ok(())
    }

    /// Typing indicators are dropped while no peer is known
    pub fn send_typing(&self, is_typing: bool) -> Result<(), NegotiationError> {
        if let Some(target) = self.state.peer_id.clone() {
            self.signal
                .send(ClientMessage::TypingIndicator { is_typing, target })?;
        }
        Ok(())
    }

    pub fn send_screen_share_state(&self, is_sharing: bool) -> Result<(), NegotiationError> {
        if let Some(target) = self.state.peer_id.clone() {
            self.signal
                .send(ClientMessage::ScreenShareState { is_sharing, target })?;
        }
        Ok(())
    }

    /// Put `track` on the outgoing sender of `kind`.
    ///
    /// The swap happens in place and leaves the phase untouched. A missing sender is added,
    /// which the peer connection renegotiates on its own.
    pub async fn substitute_track(
        &mut self,
        kind: MediaKind,
        track: Option<Arc<LocalTrack<F>>>,
    ) -> Result<TrackSubstitution, NegotiationError> {
        let peer = self
            .peer
            .as_ref()
            .ok_or(NegotiationError::NoPeerConnection)?;
        if peer.replace_track(kind, track.clone()).await? {
            return Ok(TrackSubstitution::Replaced);
        }
        match track {
            Some(track) => {
                peer.add_track(track).await?;
                Ok(TrackSubstitution::Added)
            }
            None => Ok(TrackSubstitution::Unchanged),
        }
    }

    /// Hold `track` as the local track of its kind, returning the one it displaces
    pub fn swap_local_track(&mut self, track: Arc<LocalTrack<F>>) -> Option<Arc<LocalTrack<F>>> {
        let kind = track.kind();
        match self.local_tracks.iter_mut().find(|held| held.kind() == kind) {
            Some(held) => Some(std::mem::replace(held, track)),
            None => {
                self.local_tracks.push(track);
                None
            }
        }
    }

    // ========================================
    // Relay message handlers
    // ========================================

    /// Newcomer side: we make the offer
    async fn on_ready(
        &mut self,
        peer_id: String,
        peer_name: String,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        self.require_room("start an offer")?;
        tracing::info!("Peer '{}' ({}) is ready, sending offer", peer_name, peer_id);

        self.state.set_peer(peer_id, Some(peer_name.clone()));
        self.ensure_peer().await?;
        self.phase = Phase::Negotiating;
        self.send_offer(OfferOptions::initial()).await?;

        Ok(Some(SessionNotice::PeerJoined { peer_name }))
    }

    /// Existing side: wait for the newcomer's offer
    async fn on_peer_joined(
        &mut self,
        peer_id: String,
        peer_name: String,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        self.require_room("accept a peer")?;
        tracing::info!("Peer '{}' ({}) joined, waiting for offer", peer_name, peer_id);

        self.state.set_peer(peer_id, Some(peer_name.clone()));
        self.ensure_peer().await?;
        self.phase = Phase::Negotiating;

        Ok(Some(SessionNotice::PeerJoined { peer_name }))
    }

    async fn on_offer(
        &mut self,
        offer: SessionDescription,
        from: String,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        self.require_room("answer an offer")?;
        tracing::debug!("Received offer from {}", from);

        self.state.set_peer(from.clone(), None);
        self.ensure_peer().await?;
        let peer = self
            .peer
            .as_ref()
            .ok_or(NegotiationError::NoPeerConnection)?;

        peer.set_remote_description(offer).await?;
        self.state.remote_description_set = true;
        apply_buffered(peer, &mut self.state.buffer).await;

        let answer = peer.create_answer().await?;
        peer.set_local_description(answer.clone()).await?;
        self.state.local_description_set = true;
        self.signal.send(ClientMessage::Answer {
            answer,
            target: from,
        })?;

        // an ICE restart offer arrives while connected
        if self.phase != Phase::Connected {
            self.phase = Phase::Negotiating;
        }
        Ok(None)
    }

    async fn on_answer(
        &mut self,
        answer: SessionDescription,
        from: String,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        if self.state.peer_id.as_deref() != Some(from.as_str()) {
            tracing::warn!("Ignoring answer from unexpected participant {}", from);
            return Ok(None);
        }
        let peer = self
            .peer
            .as_ref()
            .ok_or(NegotiationError::NoPeerConnection)?;

        peer.set_remote_description(answer).await?;
        self.state.remote_description_set = true;
        apply_buffered(peer, &mut self.state.buffer).await;
        Ok(None)
    }

    async fn on_remote_candidate(
        &mut self,
        candidate: IceCandidate,
        from: String,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        match self.peer.as_ref() {
            Some(peer) if self.state.remote_description_set => {
                if let Err(err) = peer.add_ice_candidate(candidate).await {
                    tracing::warn!("Failed to add ICE candidate from {}: {}", from, err);
                }
            }
            _ => {
                self.state.buffer.push(candidate);
                tracing::debug!(
                    "Buffered ICE candidate from {} ({} pending)",
                    from,
                    self.state.buffer.len()
                );
            }
        }
        Ok(None)
    }

    async fn on_peer_left(
        &mut self,
        peer_id: String,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        if self
            .state
            .peer_id
            .as_ref()
            .is_some_and(|current| *current != peer_id)
        {
            tracing::warn!("Ignoring peer-left for unknown participant {}", peer_id);
            return Ok(None);
        }

        tracing::info!("Peer {} left", peer_id);
        self.close_peer().await;
        self.state.reset();
        if self.phase.in_room() {
            self.phase = Phase::Disconnected;
        }
        Ok(Some(SessionNotice::PeerLeft { peer_id }))
    }

    // ========================================
    // Peer event handlers
    // ========================================

    async fn on_connection_state(
        &mut self,
        state: PeerConnectionState,
    ) -> Result<Option<SessionNotice>, NegotiationError> {
        tracing::debug!("Peer connection state: {}", state);
        if !self.phase.in_room() || self.peer.is_none() {
            return Ok(None);
        }

        match state {
            PeerConnectionState::Connected => {
                self.phase = Phase::Connected;
                Ok(Some(SessionNotice::Connected))
            }
            PeerConnectionState::Failed if self.state.restart_attempted => {
                tracing::error!("Connection failed after ICE restart");
                self.phase = Phase::Failed;
                Ok(Some(UserNotice::error("Connection failed").into()))
            }
            PeerConnectionState::Failed => {
                tracing::warn!("Connection failed, attempting ICE restart");
                self.state.restart_attempted = true;
                if let Err(err) = self.send_offer(OfferOptions::ice_restart()).await {
                    self.phase = Phase::Failed;
                    return Err(NegotiationError::RestartFailed(err.to_string()));
                }
                Ok(Some(
                    UserNotice::warning("Connection failed, restarting ICE").into(),
                ))
            }
            PeerConnectionState::Disconnected => Ok(Some(
                UserNotice::warning("Connection to peer interrupted").into(),
            )),
            _ => Ok(None),
        }
    }

    // ========================================
    // Helpers
    // ========================================

    async fn send_offer(&mut self, options: OfferOptions) -> Result<(), NegotiationError> {
        let target = self
            .state
            .peer_id
            .clone()
            .ok_or(NegotiationError::UnknownPeer)?;
        let peer = self
            .peer
            .as_ref()
            .ok_or(NegotiationError::NoPeerConnection)?;

        let offer = peer.create_offer(options).await?;
        peer.set_local_description(offer.clone()).await?;
        self.state.local_description_set = true;
        self.signal.send(ClientMessage::Offer { offer, target })?;
        Ok(())
    }

    /// Build a peer connection, with the local tracks attached, if none exists
    async fn ensure_peer(&mut self) -> Result<(), NegotiationError> {
        if self.peer.is_some() {
            return Ok(());
        }

        self.events = self.events.next_generation();
        let peer = self.factory.create(self.events.clone()).await?;
        for track in &self.local_tracks {
            peer.add_track(Arc::clone(track)).await?;
        }
        self.peer = Some(peer);
        Ok(())
    }

    async fn close_peer(&mut self) {
        if let Some(peer) = self.peer.take()
            && let Err(err) = peer.close().await
        {
            tracing::warn!("Failed to close peer connection: {}", err);
        }
    }

    async fn terminate(
        &mut self,
        message: ClientMessage,
        operation: &'static str,
    ) -> Result<(), NegotiationError> {
        if !(self.phase.in_room() || self.phase == Phase::Joining) {
            return Err(self.invalid_phase(operation));
        }

        let sent = self.signal.send(message);
        self.teardown().await;
        self.phase = Phase::Ended;
        sent.map_err(NegotiationError::from)
    }

    /// Stop local media, release the peer connection and forget the peer
    async fn teardown(&mut self) {
        for track in self.local_tracks.drain(..) {
            track.stop();
        }
        self.close_peer().await;
        self.state.reset();
    }

    fn require_room(&self, operation: &'static str) -> Result<(), NegotiationError> {
        if self.phase.in_room() {
            Ok(())
        } else {
            Err(self.invalid_phase(operation))
        }
    }

    fn invalid_phase(&self, operation: &'static str) -> NegotiationError {
        NegotiationError::InvalidPhase {
            operation,
            phase: self.phase.to_string(),
        }
    }
}

/// Apply buffered remote candidates in arrival order; failures are only logged
async fn apply_buffered<P: PeerConnection>(peer: &P, buffer: &mut CandidateBuffer) {
    for candidate in buffer.drain() {
        if let Err(err) = peer.add_ice_candidate(candidate).await {
            tracing::warn!("Failed to add buffered ICE candidate: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{
        FakeTrack, Harness, PeerCall, answer_sdp, candidate, join_params, offer_sdp,
    };

    fn ready() -> ServerMessage {
        ServerMessage::Ready {
            peer_id: "peer".to_string(),
            peer_name: "Brave Falcon".to_string(),
        }
    }

    fn peer_joined() -> ServerMessage {
        ServerMessage::PeerJoined {
            peer_id: "peer".to_string(),
            peer_name: "Brave Falcon".to_string(),
        }
    }

    fn remote_candidate(line: &str) -> ServerMessage {
        ServerMessage::IceCandidate {
            candidate: candidate(line),
            from: "peer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_sends_join_with_tracks_attached() {
        // テスト項目: start でローカルトラック付きのピア接続を作り、join を送信する
        // given (前提条件):
        let mut harness = Harness::new();
        let tracks = vec![FakeTrack::new("mic", MediaKind::Audio)];

        // when (操作):
        let result = harness.machine.start(join_params(), tracks).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(harness.machine.phase(), Phase::Joining);
        assert_eq!(harness.log.created(), 1);
        assert_eq!(harness.log.calls(), vec![PeerCall::AddTrack("mic".to_string())]);
        assert_eq!(
            harness.sent(),
            vec![ClientMessage::Join {
                room_id: "room-1".to_string(),
                user_name: "Calm Otter".to_string(),
                client_id: "me".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        // テスト項目: 参加処理中に再度 start するとフェーズ不正エラーになる
        // given (前提条件):
        let mut harness = Harness::new();
        harness.machine.start(join_params(), vec![]).await.unwrap();

        // when (操作):
        let result = harness.machine.start(join_params(), vec![]).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(NegotiationError::InvalidPhase { .. })
        ));
    }

    #[tokio::test]
    async fn test_joined_moves_to_waiting_for_peer() {
        // テスト項目: joined を受け取ると相手待ちフェーズになる
        // given (前提条件):
        let mut harness = Harness::new();
        harness.machine.start(join_params(), vec![]).await.unwrap();

        // when (操作):
        let notice = harness
            .machine
            .handle_server_message(ServerMessage::Joined {
                room_id: "room-1".to_string(),
                client_id: "me".to_string(),
                participants: 1,
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(harness.machine.phase(), Phase::WaitingForPeer);
        assert_eq!(
            notice,
            Some(SessionNotice::Joined {
                room_id: "room-1".to_string(),
                participants: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_ready_creates_and_sends_offer() {
        // テスト項目: ready を受け取った側がオファーを作成し、相手宛てに送信する
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;

        // when (操作):
        let notice = harness.machine.handle_server_message(ready()).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            notice,
            Some(SessionNotice::PeerJoined {
                peer_name: "Brave Falcon".to_string()
            })
        );
        assert_eq!(harness.machine.phase(), Phase::Negotiating);
        assert_eq!(
            harness.log.calls(),
            vec![
                PeerCall::CreateOffer(OfferOptions::initial()),
                PeerCall::SetLocal(offer_sdp("offer")),
            ]
        );
        assert_eq!(
            harness.sent(),
            vec![ClientMessage::Offer {
                offer: offer_sdp("offer"),
                target: "peer".to_string(),
            }]
        );
        assert!(harness.machine.state().local_description_set);
    }

    #[tokio::test]
    async fn test_peer_joined_waits_without_offering() {
        // テスト項目: peer-joined を受け取った側はオファーを作らずに待つ
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;

        // when (操作):
        harness
            .machine
            .handle_server_message(peer_joined())
            .await
            .unwrap();

        // then (期待する結果):
        assert!(harness.log.calls().is_empty());
        assert!(harness.sent().is_empty());
        assert_eq!(harness.machine.peer_id(), Some("peer"));
        assert_eq!(harness.machine.phase(), Phase::Negotiating);
    }

    #[tokio::test]
    async fn test_offer_is_answered_to_sender_after_draining_candidates() {
        // テスト項目: オファー受信時、リモート記述の設定直後にバッファ済み候補を到着順に適用し、送信元へアンサーを返す
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness
            .machine
            .handle_server_message(peer_joined())
            .await
            .unwrap();
        for line in ["candidate:a", "candidate:b"] {
            harness
                .machine
                .handle_server_message(remote_candidate(line))
                .await
                .unwrap();
        }
        assert_eq!(harness.machine.state().buffer.len(), 2);

        // when (操作):
        harness
            .machine
            .handle_server_message(ServerMessage::Offer {
                offer: offer_sdp("remote-offer"),
                from: "peer".to_string(),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            harness.log.calls(),
            vec![
                PeerCall::SetRemote(offer_sdp("remote-offer")),
                PeerCall::AddCandidate("candidate:a".to_string()),
                PeerCall::AddCandidate("candidate:b".to_string()),
                PeerCall::CreateAnswer,
                PeerCall::SetLocal(answer_sdp("answer")),
            ]
        );
        assert_eq!(
            harness.sent(),
            vec![ClientMessage::Answer {
                answer: answer_sdp("answer"),
                target: "peer".to_string(),
            }]
        );
        assert!(harness.machine.state().remote_description_set);
        assert!(harness.machine.state().buffer.is_empty());
    }

    #[tokio::test]
    async fn test_answer_applies_remote_description_and_drains() {
        // テスト項目: アンサー受信でリモート記述を設定し、バッファ済み候補を一度だけ適用する
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();
        harness
            .machine
            .handle_server_message(remote_candidate("candidate:early"))
            .await
            .unwrap();
        harness.log.clear();

        // when (操作):
        harness
            .machine
            .handle_server_message(ServerMessage::Answer {
                answer: answer_sdp("remote-answer"),
                from: "peer".to_string(),
            })
            .await
            .unwrap();
        harness
            .machine
            .handle_server_message(remote_candidate("candidate:late"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            harness.log.calls(),
            vec![
                PeerCall::SetRemote(answer_sdp("remote-answer")),
                PeerCall::AddCandidate("candidate:early".to_string()),
                PeerCall::AddCandidate("candidate:late".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_answer_from_unexpected_sender_is_ignored() {
        // テスト項目: 想定外の参加者からのアンサーは無視する
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();
        harness.log.clear();

        // when (操作):
        let result = harness
            .machine
            .handle_server_message(ServerMessage::Answer {
                answer: answer_sdp("stray"),
                from: "someone-else".to_string(),
            })
            .await;

        // then (期待する結果):
        assert!(matches!(result, Ok(None)));
        assert!(harness.log.calls().is_empty());
        assert!(!harness.machine.state().remote_description_set);
    }

    #[tokio::test]
    async fn test_candidate_failure_is_not_an_error() {
        // テスト項目: 候補の適用失敗はログのみでエラーにならない
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();
        harness
            .machine
            .handle_server_message(ServerMessage::Answer {
                answer: answer_sdp("remote-answer"),
                from: "peer".to_string(),
            })
            .await
            .unwrap();
        harness.log.fail_candidates.store(true, Ordering::SeqCst);

        // when (操作):
        let result = harness
            .machine
            .handle_server_message(remote_candidate("candidate:bad"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_local_candidates_go_to_known_peer_only() {
        // テスト項目: ローカル候補はピアが判明していれば即送信し、未判明なら破棄する
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;

        // when (操作):
        harness
            .raise(PeerEvent::LocalCandidate(candidate("candidate:early")))
            .await
            .unwrap();
        harness.machine.handle_server_message(ready()).await.unwrap();
        harness.sent();
        harness
            .raise(PeerEvent::LocalCandidate(candidate("candidate:known")))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            harness.sent(),
            vec![ClientMessage::IceCandidate {
                candidate: candidate("candidate:known"),
                target: "peer".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_connection_failure_restarts_ice_once() {
        // テスト項目: 接続失敗時に ICE リスタートを 1 回だけ試み、2 回目の失敗で Failed になる
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();
        harness.sent();
        harness.log.clear();
        let failed = PeerEvent::ConnectionStateChanged(PeerConnectionState::Failed);

        // when (操作):
        let first = harness.raise(failed.clone()).await.unwrap();
        let restart_messages = harness.sent();
        let second = harness.raise(failed).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            restart_messages,
            vec![ClientMessage::Offer {
                offer: offer_sdp("restart-offer"),
                target: "peer".to_string(),
            }]
        );
        assert_eq!(
            harness.log.calls(),
            vec![
                PeerCall::CreateOffer(OfferOptions::ice_restart()),
                PeerCall::SetLocal(offer_sdp("restart-offer")),
            ]
        );
        assert!(matches!(first, Some(SessionNotice::Notice(_))));
        assert_eq!(
            second,
            Some(SessionNotice::Notice(UserNotice::error("Connection failed")))
        );
        assert_eq!(harness.machine.phase(), Phase::Failed);
        assert!(harness.sent().is_empty());
    }

    #[tokio::test]
    async fn test_restart_failure_is_terminal() {
        // テスト項目: ICE リスタート自体が失敗した場合は RestartFailed を返し Failed になる
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();
        harness.log.fail_offers.store(true, Ordering::SeqCst);

        // when (操作):
        let result = harness
            .raise(PeerEvent::ConnectionStateChanged(PeerConnectionState::Failed))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(NegotiationError::RestartFailed(_))));
        assert_eq!(harness.machine.phase(), Phase::Failed);
        assert!(harness.machine.phase().is_terminal());
    }

    #[tokio::test]
    async fn test_connected_state_change() {
        // テスト項目: 接続確立で Connected フェーズになる
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();

        // when (操作):
        let notice = harness
            .raise(PeerEvent::ConnectionStateChanged(PeerConnectionState::Connected))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(notice, Some(SessionNotice::Connected));
        assert_eq!(harness.machine.phase(), Phase::Connected);
    }

    #[tokio::test]
    async fn test_events_of_closed_peer_connection_are_dropped() {
        // テスト項目: 退出したピアの接続から遅れて届いたイベントは、次のピアとの接続に影響しない
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();
        let failed = PeerEvent::ConnectionStateChanged(PeerConnectionState::Failed);
        harness.emit(failed.clone());
        harness.emit(PeerEvent::LocalCandidate(candidate("candidate:stale")));
        harness
            .machine
            .handle_server_message(ServerMessage::PeerLeft {
                peer_id: "peer".to_string(),
            })
            .await
            .unwrap();
        harness
            .machine
            .handle_server_message(ServerMessage::PeerJoined {
                peer_id: "peer-2".to_string(),
                peer_name: "Keen Lynx".to_string(),
            })
            .await
            .unwrap();
        harness.sent();

        // when (操作):
        let stale_failure = harness.deliver().await.unwrap();
        let stale_candidate = harness.deliver().await.unwrap();

        // then (期待する結果):
        assert_eq!(stale_failure, None);
        assert_eq!(stale_candidate, None);
        assert!(harness.sent().is_empty());
        assert!(!harness.machine.state().restart_attempted);
        assert_eq!(harness.machine.phase(), Phase::Negotiating);

        // when (操作):
        let current_failure = harness.raise(failed).await.unwrap();

        // then (期待する結果):
        assert!(matches!(current_failure, Some(SessionNotice::Notice(_))));
        assert_eq!(
            harness.sent(),
            vec![ClientMessage::Offer {
                offer: offer_sdp("restart-offer"),
                target: "peer-2".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_peer_left_closes_peer_and_rebuilds_for_next_peer() {
        // テスト項目: peer-left でピア接続を閉じ、次のピア到着時にローカルトラック付きで作り直す
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();

        // when (操作):
        let notice = harness
            .machine
            .handle_server_message(ServerMessage::PeerLeft {
                peer_id: "peer".to_string(),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            notice,
            Some(SessionNotice::PeerLeft {
                peer_id: "peer".to_string()
            })
        );
        assert_eq!(harness.machine.phase(), Phase::Disconnected);
        assert!(!harness.machine.has_peer_connection());
        assert_eq!(harness.machine.peer_id(), None);
        assert!(harness.log.calls().contains(&PeerCall::Close));

        // when (操作):
        harness.log.clear();
        harness
            .machine
            .handle_server_message(ServerMessage::PeerJoined {
                peer_id: "peer-2".to_string(),
                peer_name: "Keen Lynx".to_string(),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(harness.log.created(), 2);
        assert_eq!(
            harness.log.calls(),
            vec![
                PeerCall::AddTrack("default-audio".to_string()),
                PeerCall::AddTrack("default-video".to_string()),
            ]
        );
        assert_eq!(harness.machine.phase(), Phase::Negotiating);
    }

    #[tokio::test]
    async fn test_call_ended_by_creator_tears_down() {
        // テスト項目: call-ended-by-creator でトラックを停止し、ピア接続を閉じて Ended になる
        // given (前提条件):
        let (mut harness, tracks) = Harness::joined().await;
        harness
            .machine
            .handle_server_message(peer_joined())
            .await
            .unwrap();

        // when (操作):
        let notice = harness
            .machine
            .handle_server_message(ServerMessage::CallEndedByCreator {
                creator_name: "Brave Falcon".to_string(),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            notice,
            Some(SessionNotice::CallEnded {
                creator_name: "Brave Falcon".to_string()
            })
        );
        assert_eq!(harness.machine.phase(), Phase::Ended);
        assert!(tracks.iter().all(|track| track.is_stopped()));
        assert!(harness.log.calls().contains(&PeerCall::Close));
        assert_eq!(harness.machine.peer_id(), None);
    }

    #[tokio::test]
    async fn test_error_while_joining_is_join_rejection() {
        // テスト項目: 参加処理中の error はルーム参加拒否として扱い Idle に戻る
        // given (前提条件):
        let mut harness = Harness::new();
        let tracks = vec![FakeTrack::new("mic", MediaKind::Audio)];
        harness
            .machine
            .start(join_params(), tracks.clone())
            .await
            .unwrap();

        // when (操作):
        let notice = harness
            .machine
            .handle_server_message(ServerMessage::Error {
                message: "Room is full. Only 2 participants allowed.".to_string(),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            notice,
            Some(SessionNotice::JoinRejected {
                message: "Room is full. Only 2 participants allowed.".to_string()
            })
        );
        assert_eq!(harness.machine.phase(), Phase::Idle);
        assert!(tracks[0].is_stopped());
        assert!(!harness.machine.has_peer_connection());
    }

    #[tokio::test]
    async fn test_leave_sends_leave_and_ends() {
        // テスト項目: leave で leave を送信し、ローカル状態を破棄して Ended になる
        // given (前提条件):
        let (mut harness, tracks) = Harness::joined().await;
        harness.machine.handle_server_message(ready()).await.unwrap();
        harness.sent();

        // when (操作):
        harness.machine.leave().await.unwrap();

        // then (期待する結果):
        assert_eq!(harness.sent(), vec![ClientMessage::Leave]);
        assert_eq!(harness.machine.phase(), Phase::Ended);
        assert!(tracks.iter().all(|track| track.is_stopped()));
        assert!(!harness.machine.has_peer_connection());
        assert_eq!(harness.machine.state(), &NegotiationState::new());

        // when (操作): 終了後のメッセージは無視される
        let notice = harness.machine.handle_server_message(ready()).await.unwrap();

        // then (期待する結果):
        assert_eq!(notice, None);
        assert!(harness.machine.leave().await.is_err());
    }

    #[tokio::test]
    async fn test_end_call_sends_end_call() {
        // テスト項目: end_call で end-call を送信して Ended になる
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;

        // when (操作):
        harness.machine.end_call().await.unwrap();

        // then (期待する結果):
        assert_eq!(harness.sent(), vec![ClientMessage::EndCall]);
        assert_eq!(harness.machine.phase(), Phase::Ended);
    }

    #[tokio::test]
    async fn test_chat_requires_known_peer() {
        // テスト項目: チャットは相手が判明していれば表示名とタイムスタンプ付きで送信される
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;

        // when (操作):
        let without_peer = harness.machine.send_chat("hello", 1_000);
        harness
            .machine
            .handle_server_message(peer_joined())
            .await
            .unwrap();
        let with_peer = harness.machine.send_chat("hello", 1_000);

        // then (期待する結果):
        assert_eq!(without_peer, Err(NegotiationError::UnknownPeer));
        assert_eq!(with_peer, Ok(()));
        assert_eq!(
            harness.sent(),
            vec![ClientMessage::ChatMessage {
                message: "hello".to_string(),
                sender_name: "Calm Otter".to_string(),
                timestamp: 1_000,
                target: "peer".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_typing_and_screen_share_state_need_peer() {
        // テスト項目: 入力中表示と画面共有状態は相手がいる場合だけ送信される
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;
        harness.machine.send_typing(true).unwrap();
        assert!(harness.sent().is_empty());
        harness
            .machine
            .handle_server_message(peer_joined())
            .await
            .unwrap();

        // when (操作):
        harness.machine.send_typing(true).unwrap();
        harness.machine.send_screen_share_state(false).unwrap();

        // then (期待する結果):
        assert_eq!(
            harness.sent(),
            vec![
                ClientMessage::TypingIndicator {
                    is_typing: true,
                    target: "peer".to_string(),
                },
                ClientMessage::ScreenShareState {
                    is_sharing: false,
                    target: "peer".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_pass_through_messages_become_notices() {
        // テスト項目: チャット・入力中・画面共有状態の受信は通知に変換される
        // given (前提条件):
        let (mut harness, _) = Harness::joined().await;

        // when (操作):
        let chat = harness
            .machine
            .handle_server_message(ServerMessage::ChatMessage {
                message: "hi".to_string(),
                sender_name: "Brave Falcon".to_string(),
                timestamp: 42,
                from: "peer".to_string(),
            })
            .await
            .unwrap();
        let typing = harness
            .machine
            .handle_server_message(ServerMessage::TypingIndicator {
                is_typing: true,
                from: "peer".to_string(),
            })
            .await
            .unwrap();
        let sharing = harness
            .machine
            .handle_server_message(ServerMessage::ScreenShareState {
                is_sharing: true,
                from: "peer".to_string(),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            chat,
            Some(SessionNotice::Chat(ChatEntry {
                sender_name: "Brave Falcon".to_string(),
                message: "hi".to_string(),
                timestamp: 42,
            }))
        );
        assert_eq!(typing, Some(SessionNotice::Typing { is_typing: true }));
        assert_eq!(
            sharing,
            Some(SessionNotice::RemoteScreenShare { is_sharing: true })
        );
    }

    #[tokio::test]
    async fn test_substitute_track_replaces_or_adds() {
        // テスト項目: 既存の送信者があれば差し替え、なければ新しく追加する
        // given (前提条件):
        let mut harness = Harness::new();
        harness
            .machine
            .start(join_params(), vec![FakeTrack::new("mic", MediaKind::Audio)])
            .await
            .unwrap();
        harness.log.clear();

        // when (操作):
        let audio = harness
            .machine
            .substitute_track(MediaKind::Audio, Some(FakeTrack::new("mic-2", MediaKind::Audio)))
            .await
            .unwrap();
        let video = harness
            .machine
            .substitute_track(MediaKind::Video, Some(FakeTrack::new("screen", MediaKind::Video)))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(audio, TrackSubstitution::Replaced);
        assert_eq!(video, TrackSubstitution::Added);
        assert_eq!(
            harness.log.calls(),
            vec![
                PeerCall::ReplaceTrack(MediaKind::Audio, Some("mic-2".to_string())),
                PeerCall::AddTrack("screen".to_string()),
            ]
        );
        assert_eq!(harness.machine.phase(), Phase::Joining);
    }

    #[tokio::test]
    async fn test_swap_local_track() {
        // テスト項目: 同じ種類のローカルトラックを入れ替え、古いトラックを返す
        // given (前提条件):
        let (mut harness, tracks) = Harness::joined().await;

        // when (操作):
        let displaced = harness
            .machine
            .swap_local_track(FakeTrack::new("usb-mic", MediaKind::Audio));

        // then (期待する結果):
        assert_eq!(displaced.map(|track| track.id().to_string()), Some(tracks[0].id().to_string()));
        assert_eq!(
            harness
                .machine
                .local_track(MediaKind::Audio)
                .map(|track| track.id().to_string()),
            Some("usb-mic".to_string())
        );
    }
}
