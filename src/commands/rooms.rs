//! Room listing and deletion.
//!
//! # Output Format
//!
//! ```text
//! ID     Name                      Users  Private
//! ----------------------------------------------
//! 3      general                   4
//! 7      rust                      1      yes
//! ```

use std::sync::Arc;

use anyhow::Result;

use super::display::{self, TerminalListener};
use super::session::Session;
use crate::api::RoomApi;
use crate::constants;
use crate::events::RoomListener;
use crate::protocol::RoomId;

/// Print the first page of rooms.
pub async fn list() -> Result<()> {
    let session = Session::open(Arc::new(TerminalListener::default()))?;
    session.require_login()?;

    let page = session
        .api
        .list_rooms(constants::FIRST_PAGE, session.config.room_page_size)
        .await?;
    print!("{}", display::room_table(&page));
    Ok(())
}

/// Delete a room, asking for confirmation unless `yes` is set.
pub async fn delete(room: u64, yes: bool) -> Result<()> {
    let listener = TerminalListener::new(yes);
    let session = Session::open(Arc::new(listener.clone()))?;
    session.require_login()?;

    let room = RoomId(room);
    if !listener.confirm_delete(room) {
        println!("Cancelled");
        return Ok(());
    }
    session.api.delete_room(room).await?;
    println!("Deleted room {room}");
    Ok(())
}
