//! Line-based terminal chat client.
//!
//! ```text
//! CHATLINE_URL=ws://127.0.0.1:8080 CHATLINE_ROOM=general cargo run -p terminal-chat
//! ```
//!
//! Every stdin line is sent as a chat message. `/quit` or EOF leaves the
//! room and exits.

use chatline::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

struct Settings {
    url: String,
    room: String,
    home: String,
}

impl Settings {
    fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            url: var("CHATLINE_URL", ChannelConfig::DEFAULT_URL),
            room: var("CHATLINE_ROOM", DEFAULT_ROOM),
            home: var("CHATLINE_HOME", ".chatline"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Loads the stored identity, asking for a display name on first run.
async fn load_identity(
    home: &str,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<Option<Identity>, Box<dyn std::error::Error>> {
    let ids = IdentityStore::new(FileStore::in_dir(home)?);
    if let Some(identity) = ids.identity()? {
        return Ok(Some(identity));
    }

    loop {
        eprintln!("choose a display name (2-20 characters):");
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match ids.set_display_name(&line) {
            Ok(_) => return Ok(ids.identity()?),
            Err(IdentityError::InvalidDisplayName { .. }) => {
                eprintln!("that name won't do, try again");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn render(msg: &DomainMessage) -> String {
    let time = format_timestamp(msg.sent_at_epoch_millis);
    match msg.kind {
        MessageKind::Chat => format!("[{time}] {}: {}", msg.sender_display_name, msg.content),
        MessageKind::Join => format!("[{time}] * {} joined", msg.sender_display_name),
        MessageKind::Leave => format!("[{time}] * {} left", msg.sender_display_name),
        MessageKind::System => format!(
            "[{time}] ! {}",
            truncate_message(&msg.content, DEFAULT_PREVIEW_CHARS)
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let Some(identity) = load_identity(&settings.home, &mut input).await? else {
        return Ok(());
    };
    tracing::info!(
        name = %identity.display_name,
        sender_id = %identity.sender_id,
        room = %settings.room,
        url = %settings.url,
        "starting terminal chat"
    );

    let client = ChatClient::builder(identity)
        .url(settings.url)
        .room(settings.room.as_str())
        .build(WebSocketConnector::new());

    client.on_room_message(|msg| println!("{}", render(msg)));
    client.on_connection_change(|status| eprintln!("-- {status} --"));

    client.connect().await?;
    client.join();

    while let Some(line) = input.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        match client.send_chat(&line) {
            Ok(()) if !client.is_connected() => eprintln!("(not connected, message dropped)"),
            Ok(()) => {}
            Err(ChatlineError::InvalidMessage(ContentError::Empty)) => {}
            Err(e) => eprintln!("{e}"),
        }
    }

    client.leave();
    client.close().await;
    Ok(())
}
