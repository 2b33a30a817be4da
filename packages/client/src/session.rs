//! One call from join to teardown.
//!
//! All negotiation state lives in a single task: relay messages, peer events and user
//! commands are multiplexed with `tokio::select!` and handled one at a time.

use std::sync::Arc;
use std::time::Duration;

use duocall_server::infrastructure::dto::websocket::{ClientMessage, ServerMessage};
use duocall_shared::time::{Clock, SystemClock};
use tokio::sync::mpsc;

use crate::domain::{MediaKind, SessionNotice};
use crate::error::{ClientError, NegotiationError, UserNotice};
use crate::media::acquire_local_media;
use crate::negotiation::{JoinParams, NegotiationMachine};
use crate::peer::{
    MediaSource, PeerConnection, PeerConnectionFactory, PeerEventReceiver, PeerEventSender,
};
use crate::renegotiation::RenegotiationController;

pub const DEFAULT_END_CALL_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room_id: String,
    pub display_name: String,
    pub client_id: String,
    /// Never request the camera
    pub audio_only: bool,
    /// How long the signaling channel stays open after `end-call`
    pub end_call_grace: Duration,
}

/// What the local user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Chat(String),
    Typing(bool),
    ToggleScreenShare,
    SwitchDevice(MediaKind, String),
    Leave,
    EndCall,
}

/// How a session finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Left,
    EndedCall,
    EndedByCreator { creator_name: String },
}

type Signal = mpsc::UnboundedSender<ClientMessage>;

pub struct ClientSession<F, M>
where
    F: PeerConnectionFactory,
    M: MediaSource,
{
    machine: NegotiationMachine<F, Signal>,
    controller: RenegotiationController<M>,
    events: PeerEventReceiver,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl<F, M> ClientSession<F, M>
where
    F: PeerConnectionFactory,
    F::Peer: PeerConnection<Track = M::Track>,
    M: MediaSource,
{
    pub fn new(factory: F, source: M, signal: Signal, config: SessionConfig) -> Self {
        let (events_tx, events) = PeerEventSender::channel();
        Self {
            machine: NegotiationMachine::new(factory, signal, events_tx),
            controller: RenegotiationController::new(source),
            events,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamp chat messages with `clock` instead of the system time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Acquire media, join the room and run until the call is over.
    ///
    /// A closed command channel counts as leaving.
    pub async fn run(
        self,
        inbound: &mut mpsc::UnboundedReceiver<ServerMessage>,
        mut commands: mpsc::UnboundedReceiver<UserCommand>,
        notices: mpsc::UnboundedSender<SessionNotice>,
    ) -> Result<SessionEnd, ClientError> {
        let Self {
            mut machine,
            mut controller,
            mut events,
            config,
            clock,
        } = self;
        let notify = |notice: SessionNotice| {
            let _ = notices.send(notice);
        };

        let media = acquire_local_media(controller.source(), config.audio_only).await?;
        if media.audio_only && !config.audio_only {
            notify(UserNotice::warning("No camera available, joining with audio only").into());
        }
        machine
            .start(
                JoinParams {
                    room_id: config.room_id.clone(),
                    display_name: config.display_name.clone(),
                    client_id: config.client_id.clone(),
                },
                media.tracks,
            )
            .await?;

        loop {
            tokio::select! {
                message = inbound.recv() => {
                    let Some(message) = message else {
                        controller.release();
                        return Err(ClientError::Connection(
                            "Connection to relay lost".to_string(),
                        ));
                    };
                    if matches!(message, ServerMessage::PeerLeft { .. }) {
                        controller.release();
                    }

                    match machine.handle_server_message(message).await {
                        Ok(Some(SessionNotice::JoinRejected { message })) => {
                            return Err(ClientError::JoinRejected(message));
                        }
                        Ok(Some(SessionNotice::CallEnded { creator_name })) => {
                            controller.release();
                            notify(SessionNotice::CallEnded {
                                creator_name: creator_name.clone(),
                            });
                            return Ok(SessionEnd::EndedByCreator { creator_name });
                        }
                        Ok(Some(notice)) => notify(notice),
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!("Failed to handle relay message: {}", err);
                            notify(UserNotice::error(err.to_string()).into());
                        }
                    }
                }
                Some(event) = events.recv() => {
                    match machine.handle_peer_event(event).await {
                        Ok(Some(notice)) => notify(notice),
                        Ok(None) => {}
                        Err(err @ NegotiationError::RestartFailed(_)) => {
                            controller.release();
                            return Err(err.into());
                        }
                        Err(err) => {
                            tracing::warn!("Failed to handle peer event: {}", err);
                            notify(UserNotice::error(err.to_string()).into());
                        }
                    }
                }
                command = commands.recv() => {
                    let command = command.unwrap_or(UserCommand::Leave);
                    match command {
                        UserCommand::Chat(message) => {
                            if let Err(err) = machine.send_chat(message, clock.now_millis()) {
                                let notice = match err {
                                    NegotiationError::UnknownPeer => {
                                        UserNotice::warning("No one else is in the room yet")
                                    }
                                    other => UserNotice::error(other.to_string()),
                                };
                                notify(notice.into());
                            }
                        }
                        UserCommand::Typing(is_typing) => {
                            if let Err(err) = machine.send_typing(is_typing) {
                                tracing::debug!("Failed to send typing indicator: {}", err);
                            }
                        }
                        UserCommand::ToggleScreenShare => {
                            match controller.toggle_screen_share(&mut machine).await {
                                Ok(true) => {
                                    notify(UserNotice::info("Screen sharing started").into())
                                }
                                Ok(false) => {
                                    notify(UserNotice::info("Screen sharing stopped").into())
                                }
                                Err(err) => notify(UserNotice::error(err.to_string()).into()),
                            }
                        }
                        UserCommand::SwitchDevice(kind, device_id) => {
                            match controller.switch_device(&mut machine, kind, &device_id).await {
                                Ok(()) => {
                                    let message = format!("Switched {kind} input to '{device_id}'");
                                    notify(UserNotice::info(message).into())
                                }
                                Err(err) => notify(UserNotice::error(err.to_string()).into()),
                            }
                        }
                        UserCommand::Leave => {
                            controller.release();
                            machine.leave().await?;
                            return Ok(SessionEnd::Left);
                        }
                        UserCommand::EndCall => {
                            controller.release();
                            machine.end_call().await?;
                            // give the relay time to fan out the termination
                            tokio::time::sleep(config.end_call_grace).await;
                            return Ok(SessionEnd::EndedCall);
                        }
                    }
                }
            }
        }
    }
}
