//! Terminal rendering of messages and listener callbacks.

use std::io::{self, BufRead, Write};

use chrono::{DateTime, Local};

use crate::api::types::RoomPage;
use crate::events::{AuthListener, RoomListener, TransportListener};
use crate::protocol::{MessageEnvelope, MessageKind, RoomId, RoomMember};
use crate::transport::{ConnectionState, TransportError};

/// Listener printing to the terminal.
#[derive(Debug, Clone, Default)]
pub struct TerminalListener {
    assume_yes: bool,
}

impl TerminalListener {
    /// `assume_yes` answers delete confirmations without prompting.
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl TransportListener for TerminalListener {
    fn on_state_change(&self, state: &ConnectionState) {
        match state {
            ConnectionState::Open => println!("* connected"),
            ConnectionState::Reconnecting { attempt } => {
                println!("* connection lost, reconnecting (attempt {attempt})");
            }
            _ => {}
        }
    }

    fn on_error(&self, error: &TransportError) {
        eprintln!("! {}", error.description);
    }

    fn on_reconnect_failed(&self) {
        eprintln!("! Could not reconnect. Use /join <id> to try again.");
    }
}

impl RoomListener for TerminalListener {
    fn on_history(&self, room: RoomId, messages: &[MessageEnvelope]) {
        println!("--- room {room} ---");
        for message in messages {
            println!("{}", format_message(message));
        }
    }

    fn on_room_list(&self, page: &RoomPage, current: Option<RoomId>) {
        println!("{}", room_line(page, current));
    }

    fn on_room_cleared(&self, room: RoomId) {
        println!("* left room {room}");
    }

    fn on_notice(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn confirm_delete(&self, room: RoomId) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("Delete room {room}? This cannot be undone. [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

impl AuthListener for TerminalListener {
    fn on_unauthorized(&self) {
        eprintln!("! Session expired. Run `roomchat login <username>` to sign in again.");
    }
}

/// One chat line, e.g. `[10:00:00] Alice: hello`.
pub fn format_message(message: &MessageEnvelope) -> String {
    let time = format_timestamp(&message.timestamp);
    let name = message.sender_display_name();
    match message.message_kind() {
        Some(MessageKind::Text) => format!("[{time}] {name}: {}", message.content),
        Some(MessageKind::Image) => format!("[{time}] {name} sent an image"),
        Some(MessageKind::File) => match message.file_descriptor() {
            Some(file) => format!(
                "[{time}] {name} sent a file: {} ({}, {} bytes)",
                file.name, file.mime_type, file.size
            ),
            None => format!("[{time}] {name} sent a file"),
        },
        Some(MessageKind::System) | None => format!("[{time}] * {}", message.content),
    }
}

/// Local `HH:MM:SS` for an RFC 3339 timestamp; other input is shown as-is.
pub fn format_timestamp(timestamp: &str) -> String {
    if timestamp.is_empty() {
        return "--:--:--".to_string();
    }
    DateTime::parse_from_rfc3339(timestamp).map_or_else(
        |_| timestamp.to_string(),
        |dt| dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
    )
}

/// `Online (2): Alice, Bob`
pub fn format_members(members: &[RoomMember]) -> String {
    let names: Vec<&str> = members
        .iter()
        .map(|m| {
            if m.nickname.is_empty() {
                m.username.as_str()
            } else {
                m.nickname.as_str()
            }
        })
        .collect();
    format!("Online ({}): {}", members.len(), names.join(", "))
}

/// Compact one-line room list; the current room is starred.
pub fn room_line(page: &RoomPage, current: Option<RoomId>) -> String {
    let rooms: Vec<String> = page
        .list
        .iter()
        .map(|room| {
            let star = if Some(room.id) == current { "*" } else { "" };
            format!("{star}{} #{} ({})", room.name, room.id, room.user_count)
        })
        .collect();
    format!("Rooms: {}", rooms.join(", "))
}

/// Full room table.
pub fn room_table(page: &RoomPage) -> String {
    let mut out = format!("{:<6} {:<25} {:<6} {}\n", "ID", "Name", "Users", "Private");
    out.push_str(&"-".repeat(46));
    out.push('\n');
    for room in &page.list {
        out.push_str(&format!(
            "{:<6} {:<25} {:<6} {}\n",
            room.id,
            room.name,
            room.user_count,
            if room.is_private { "yes" } else { "" }
        ));
    }
    if page.total > page.list.len() as u64 {
        out.push_str(&format!("({} of {} rooms)\n", page.list.len(), page.total));
    }
    out
}
