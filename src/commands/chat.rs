//! Interactive chat loop.
//!
//! Reads lines from stdin; plain lines are sent as text messages, lines
//! starting with `/` are commands:
//!
//! ```text
//! /image <path>   send an image
//! /file <path>    send a file
//! /join <id>      switch rooms
//! /leave          leave the current room
//! /rooms          refresh the room list
//! /quit           leave and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::attachment;
use super::display::{self, TerminalListener};
use super::session::Session;
use crate::api::types::CreateRoomRequest;
use crate::api::RoomApi;
use crate::controller::{Paging, RoomController};
use crate::events::{AuthListener, RoomListener, TransportListener};
use crate::protocol::{EventKind, MessageEnvelope, MessageKind, RoomId};
use crate::router::MessageRouter;
use crate::transport::{ReconnectPolicy, TransportSession, TungsteniteConnector};

/// How the chat loop starts.
#[derive(Debug, Clone)]
pub enum Start {
    /// Join an existing room.
    Join(RoomId),
    /// Create a room and join it.
    Create(CreateRoomRequest),
}

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line.
    Empty,
    /// Text message.
    Text(String),
    /// `/image <path>`
    Image(PathBuf),
    /// `/file <path>`
    File(PathBuf),
    /// `/join <id>`
    Join(RoomId),
    /// `/leave`
    Leave,
    /// `/rooms`
    Rooms,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Anything else starting with `/`.
    Invalid(String),
}

impl Input {
    /// Parse a line typed by the user.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Text(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match (name, arg) {
            ("image", path) if !path.is_empty() => Self::Image(PathBuf::from(path)),
            ("file", path) if !path.is_empty() => Self::File(PathBuf::from(path)),
            ("join", id) => match id.parse::<u64>() {
                Ok(id) if id != 0 => Self::Join(RoomId(id)),
                _ => Self::Invalid(format!("invalid room id '{id}'")),
            },
            ("leave", "") => Self::Leave,
            ("rooms", "") => Self::Rooms,
            ("help", "") => Self::Help,
            ("quit" | "exit", "") => Self::Quit,
            _ => Self::Invalid(format!("unknown command '/{name}', try /help")),
        }
    }
}

const HELP: &str = "/image <path>, /file <path>, /join <id>, /leave, /rooms, /quit";

/// Router for the frames the terminal shows.
///
/// Chat messages are printed; member list updates are printed and trigger a
/// room list refresh through `refresh`.
pub fn build_router(refresh: mpsc::UnboundedSender<()>) -> MessageRouter {
    let mut router = MessageRouter::new();
    for kind in [
        MessageKind::Text,
        MessageKind::Image,
        MessageKind::File,
        MessageKind::System,
    ] {
        router.register(kind, |message: &MessageEnvelope| {
            println!("{}", display::format_message(message));
        });
    }
    router.register(EventKind::UserList, move |message: &MessageEnvelope| {
        if let Some(members) = message.members() {
            println!("{}", display::format_members(&members));
        }
        let _ = refresh.send(());
    });
    router
}

/// Run the interactive loop until `/quit`, end of input or Ctrl-C.
pub async fn run(start: Start) -> Result<()> {
    let listener = Arc::new(TerminalListener::default());
    let session = Session::open(Arc::clone(&listener) as Arc<dyn AuthListener>)?;
    session.require_login()?;

    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();
    let transport = Arc::new(TransportSession::new(
        session.config.base_url(),
        Arc::clone(&session.auth),
        Arc::new(TungsteniteConnector),
        build_router(refresh_tx),
        Arc::clone(&listener) as Arc<dyn TransportListener>,
        ReconnectPolicy::from(&session.config),
    ));
    let controller = RoomController::new(
        Arc::clone(&session.api) as Arc<dyn RoomApi>,
        transport,
        Arc::clone(&listener) as Arc<dyn RoomListener>,
        Arc::clone(&session.auth),
    )
    .with_paging(Paging::from(&session.config));

    // Failures were already reported through the listener.
    let started = match start {
        Start::Join(room) => controller.join_room(room).await,
        Start::Create(request) => controller.create_room(&request).await.map(|_| ()),
    };
    if started.as_ref().is_err_and(crate::api::ApiError::is_unauthorized) {
        return Ok(());
    }
    println!("Type a message, or {HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            Some(()) = refresh_rx.recv() => {
                controller.refresh_room_list().await;
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle(&controller, Input::parse(&line)).await {
                    break;
                }
                if !session.auth.is_authenticated() {
                    break;
                }
            }
        }
    }

    if let Some(room) = controller.current_room() {
        let _ = controller.leave_room(room, false).await;
    }
    controller.transport().close();
    Ok(())
}

/// Execute one input. Returns `false` to stop the loop.
async fn handle(controller: &RoomController, input: Input) -> bool {
    match input {
        Input::Empty => {}
        Input::Text(text) => {
            if let Err(e) = controller.send_text(&text) {
                eprintln!("! Message not sent: {e}");
            }
        }
        Input::Image(path) => match attachment::read_image(&path) {
            Ok(data_uri) => {
                if let Err(e) = controller.send_image(&data_uri) {
                    eprintln!("! Image not sent: {e}");
                }
            }
            Err(e) => eprintln!("! {e:#}"),
        },
        Input::File(path) => match attachment::read_file(&path) {
            Ok(descriptor) => {
                if let Err(e) = controller.send_file(&descriptor) {
                    eprintln!("! File not sent: {e}");
                }
            }
            Err(e) => eprintln!("! {e:#}"),
        },
        Input::Join(room) => {
            let _ = controller.join_room(room).await;
        }
        Input::Leave => match controller.current_room() {
            Some(room) => {
                let _ = controller.leave_room(room, true).await;
            }
            None => eprintln!("! Not in a room"),
        },
        Input::Rooms => controller.refresh_room_list().await,
        Input::Help => println!("{HELP}"),
        Input::Quit => return false,
        Input::Invalid(message) => eprintln!("! {message}"),
    }
    true
}
