//! Message formatting utilities for client display.

use duocall_shared::time::timestamp_to_clock_time;

use crate::domain::{ChatEntry, SessionNotice};
use crate::error::{Severity, UserNotice};

const RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a session notice for the terminal
    ///
    /// # Arguments
    ///
    /// * `notice` - The notice to display
    ///
    /// # Returns
    ///
    /// A formatted string, or `None` for notices that are not shown
    pub fn format_notice(notice: &SessionNotice) -> Option<String> {
        let formatted = match notice {
            SessionNotice::Joined {
                room_id,
                participants,
            } => Self::format_joined(room_id, *participants),
            SessionNotice::JoinRejected { message } => {
                Self::format_user_notice(&UserNotice::error(message.clone()))
            }
            SessionNotice::PeerJoined { peer_name } => {
                format!("\n+ {} joined the call\n", peer_name)
            }
            SessionNotice::PeerLeft { .. } => "\n- Your peer left the call\n".to_string(),
            SessionNotice::Connected => "\n* Connected\n".to_string(),
            SessionNotice::RemoteTrack { kind } => format!("\n* Receiving {} from peer\n", kind),
            SessionNotice::Chat(entry) => Self::format_chat_message(entry),
            SessionNotice::Typing { is_typing: true } => "\n... peer is typing\n".to_string(),
            SessionNotice::Typing { is_typing: false } => return None,
            SessionNotice::RemoteScreenShare { is_sharing } => {
                if *is_sharing {
                    "\n* Peer started sharing their screen\n".to_string()
                } else {
                    "\n* Peer stopped sharing their screen\n".to_string()
                }
            }
            SessionNotice::CallEnded { creator_name } => {
                format!("\n* The call was ended by {}\n", creator_name)
            }
            SessionNotice::Notice(notice) => Self::format_user_notice(notice),
        };
        Some(formatted)
    }

    /// Format the joined-room banner with the invite reference
    ///
    /// # Arguments
    ///
    /// * `room_id` - The room that was joined
    /// * `participants` - Occupancy after joining
    pub fn format_joined(room_id: &str, participants: usize) -> String {
        let status = if participants < 2 {
            "Waiting for someone to join..."
        } else {
            "Connecting to your peer..."
        };
        format!(
            "\n\n============================================================\n\
             Room: {}\n\
             Share this room id to invite someone.\n\
             {}\n\
             ============================================================\n",
            room_id, status
        )
    }

    /// Format a chat message from the peer
    ///
    /// # Arguments
    ///
    /// * `entry` - The received chat message
    ///
    /// # Returns
    ///
    /// A formatted string with the chat message
    pub fn format_chat_message(entry: &ChatEntry) -> String {
        format!(
            "\n\n{}\n@{}: {}\nsent at {}\n{}\n",
            RULE,
            entry.sender_name,
            entry.message,
            timestamp_to_clock_time(entry.timestamp),
            RULE
        )
    }

    pub fn format_user_notice(notice: &UserNotice) -> String {
        let marker = match notice.severity {
            Severity::Info => "*",
            Severity::Warning => "!",
            Severity::Error => "x",
        };
        format!("\n{} {}\n", marker, notice.message)
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        format!("sent at {}\n", timestamp_to_clock_time(sent_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaKind;

    #[test]
    fn test_format_joined_waiting() {
        // テスト項目: 1 人目の参加時は相手待ちの案内とルーム ID が表示される
        // when (操作):
        let result = MessageFormatter::format_joined("k3j9x0a2bq", 1);

        // then (期待する結果):
        assert!(result.contains("Room: k3j9x0a2bq"));
        assert!(result.contains("Waiting for someone to join"));
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: チャットメッセージに送信者名と内容が含まれる
        // given (前提条件):
        let entry = ChatEntry {
            sender_name: "Brave Falcon".to_string(),
            message: "hello".to_string(),
            timestamp: 1_672_498_800_000,
        };

        // when (操作):
        let result = MessageFormatter::format_chat_message(&entry);

        // then (期待する結果):
        assert!(result.contains("@Brave Falcon: hello"));
        assert!(result.contains("sent at "));
    }

    #[test]
    fn test_typing_stopped_is_not_shown() {
        // テスト項目: 入力停止の通知は表示しない
        assert_eq!(
            MessageFormatter::format_notice(&SessionNotice::Typing { is_typing: false }),
            None
        );
        assert!(
            MessageFormatter::format_notice(&SessionNotice::Typing { is_typing: true }).is_some()
        );
    }

    #[test]
    fn test_format_notices() {
        // テスト項目: 各種通知が種類ごとの表示になる
        // when (操作):
        let error = MessageFormatter::format_notice(&SessionNotice::Notice(UserNotice::error(
            "Room is full",
        )));
        let track = MessageFormatter::format_notice(&SessionNotice::RemoteTrack {
            kind: MediaKind::Video,
        });
        let ended = MessageFormatter::format_notice(&SessionNotice::CallEnded {
            creator_name: "Calm Otter".to_string(),
        });

        // then (期待する結果):
        assert_eq!(error.as_deref(), Some("\nx Room is full\n"));
        assert_eq!(track.as_deref(), Some("\n* Receiving video from peer\n"));
        assert!(ended.unwrap().contains("ended by Calm Otter"));
    }
}
