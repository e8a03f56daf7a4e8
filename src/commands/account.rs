//! Account commands: login, logout, whoami.
//!
//! # Examples
//!
//! ```bash
//! roomchat login alice          # prompts for the password on stdin
//! roomchat whoami
//! roomchat logout
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::display::TerminalListener;
use super::session::Session;

/// Log in as `username`.
///
/// The password is read from stdin when not given.
pub async fn login(username: &str, password: Option<String>) -> Result<()> {
    let session = Session::open(Arc::new(TerminalListener::default()))?;

    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let profile = session.api.login(username, &password).await?;
    println!(
        "Logged in as {} ({}) on {}",
        profile.nickname,
        profile.username,
        session.api.server_url()
    );
    Ok(())
}

/// Forget the stored credentials.
pub fn logout() -> Result<()> {
    let session = Session::open(Arc::new(TerminalListener::default()))?;
    session.auth.clear()?;
    println!("Logged out");
    Ok(())
}

/// Print the profile the current token belongs to.
pub async fn whoami() -> Result<()> {
    let session = Session::open(Arc::new(TerminalListener::default()))?;
    session.require_login()?;

    let profile = session.api.profile().await?;
    println!("{} ({})", profile.nickname, profile.username);
    println!("  id:     {}", profile.id);
    if !profile.avatar.is_empty() {
        println!("  avatar: {}", profile.avatar);
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
