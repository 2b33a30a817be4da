//! Outgoing track substitution: device switching and screen sharing.
//!
//! Tracks are swapped on the existing senders, so the offer/answer exchange is not re-run
//! and the negotiation phase stays where it is.

use std::sync::Arc;

use crate::domain::{MediaConstraints, MediaKind};
use crate::error::{ClientError, MediaError};
use crate::negotiation::NegotiationMachine;
use crate::peer::{MediaSource, MediaTrack, PeerConnection, PeerConnectionFactory, SignalSink};

pub struct RenegotiationController<M: MediaSource> {
    source: M,
    screen: Option<Arc<M::Track>>,
}

impl<M: MediaSource> RenegotiationController<M> {
    pub fn new(source: M) -> Self {
        Self {
            source,
            screen: None,
        }
    }

    pub fn source(&self) -> &M {
        &self.source
    }

    pub fn is_sharing(&self) -> bool {
        self.screen.is_some()
    }

    /// Replace the camera or microphone with another device.
    ///
    /// While the screen is shared a new camera is only held locally; it goes out once
    /// sharing stops.
    pub async fn switch_device<F, S>(
        &mut self,
        machine: &mut NegotiationMachine<F, S>,
        kind: MediaKind,
        device_id: &str,
    ) -> Result<(), ClientError>
    where
        F: PeerConnectionFactory,
        F::Peer: PeerConnection<Track = M::Track>,
        S: SignalSink,
    {
        let track = self
            .source
            .acquire(&MediaConstraints::device(kind, device_id))
            .await?
            .into_iter()
            .find(|track| track.kind() == kind)
            .ok_or_else(|| MediaError::NotFound(kind.to_string()))?;

        let screen_holds_sender = kind == MediaKind::Video && self.is_sharing();
        if machine.has_peer_connection() && !screen_holds_sender {
            if let Err(err) = machine.substitute_track(kind, Some(Arc::clone(&track))).await {
                track.stop();
                return Err(err.into());
            }
        }

        if let Some(previous) = machine.swap_local_track(track) {
            previous.stop();
        }
        tracing::info!("Switched {} input to '{}'", kind, device_id);
        Ok(())
    }

    /// Send the screen instead of the camera and tell the peer about it.
    pub async fn start_screen_share<F, S>(
        &mut self,
        machine: &mut NegotiationMachine<F, S>,
    ) -> Result<(), ClientError>
    where
        F: PeerConnectionFactory,
        F::Peer: PeerConnection<Track = M::Track>,
        S: SignalSink,
    {
        if self.is_sharing() {
            return Ok(());
        }
        if !machine.has_peer_connection() || machine.peer_id().is_none() {
            return Err(ClientError::ScreenShare(
                "connection not established".to_string(),
            ));
        }

        let screen = self.source.acquire_screen().await?;
        if let Err(err) = machine
            .substitute_track(MediaKind::Video, Some(Arc::clone(&screen)))
            .await
        {
            screen.stop();
            return Err(err.into());
        }
        self.screen = Some(screen);
        machine.send_screen_share_state(true)?;

        tracing::info!("Screen sharing started");
        Ok(())
    }

    /// Put the camera back (or nothing, without one) and tell the peer.
    pub async fn stop_screen_share<F, S>(
        &mut self,
        machine: &mut NegotiationMachine<F, S>,
    ) -> Result<(), ClientError>
    where
        F: PeerConnectionFactory,
        F::Peer: PeerConnection<Track = M::Track>,
        S: SignalSink,
    {
        let Some(screen) = self.screen.take() else {
            return Ok(());
        };
        screen.stop();

        if machine.has_peer_connection() {
            let camera = machine.local_track(MediaKind::Video);
            machine.substitute_track(MediaKind::Video, camera).await?;
        }
        machine.send_screen_share_state(false)?;

        tracing::info!("Screen sharing stopped");
        Ok(())
    }

    /// Returns whether the screen is shared afterwards
    pub async fn toggle_screen_share<F, S>(
        &mut self,
        machine: &mut NegotiationMachine<F, S>,
    ) -> Result<bool, ClientError>
    where
        F: PeerConnectionFactory,
        F::Peer: PeerConnection<Track = M::Track>,
        S: SignalSink,
    {
        if self.is_sharing() {
            self.stop_screen_share(machine).await?;
        } else {
            self.start_screen_share(machine).await?;
        }
        Ok(self.is_sharing())
    }

    /// Drop the screen track without touching any sender, e.g. after the peer connection closed
    pub fn release(&mut self) {
        if let Some(screen) = self.screen.take() {
            screen.stop();
        }
    }
}
