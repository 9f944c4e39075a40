//! Logs in, identifies, and logs what the server says.
//!
//! ```text
//! FCHAT_ACCOUNT=me FCHAT_PASSWORD=secret FCHAT_CHARACTER="My Character" \
//!     RUST_LOG=info,fchat=debug cargo run -p fchat-connect
//! ```
//!
//! Set `FCHAT_CHANNEL` to also join a channel and log its messages.

use std::env;

use fchat::prelude::*;
use tracing_subscriber::EnvFilter;

fn required(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    env::var(name).map_err(|_| format!("{name} is not set").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let account = required("FCHAT_ACCOUNT")?;
    let password = required("FCHAT_PASSWORD")?;
    let character = required("FCHAT_CHARACTER")?;
    let channel = env::var("FCHAT_CHANNEL").ok();

    let client = FchatClient::websocket(
        ClientConfig {
            join_on_invite: true,
            ..ClientConfig::default()
        },
        Credentials::new(account, password),
    );

    client.on(Opcode::Idn, |frame| {
        tracing::info!(character = %frame.payload["character"], "identified");
    });
    client.on(Opcode::Con, |frame| {
        tracing::info!(online = %frame.payload["count"], "user count");
    });
    client.on(Opcode::Msg, |frame| {
        tracing::info!(
            channel = %frame.payload["channel"],
            from = %frame.payload["character"],
            "{}",
            frame.payload["message"].as_str().unwrap_or_default(),
        );
    });
    client.on(Opcode::Pri, |frame| {
        tracing::info!(from = %frame.payload["character"], "private message");
    });
    client.on_error(|err| tracing::warn!(error = %err, "fchat error"));
    client.on_state_change(|state| tracing::debug!(%state, "state"));

    let (closed_tx, mut closed_rx) = tokio::sync::mpsc::unbounded_channel();
    client.on_close(move || {
        let _ = closed_tx.send(());
    });

    client.connect(&character, None).await?;
    if let Some(channel) = channel {
        client.join_channel(&channel).await?;
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            client.disconnect().await;
        }
        _ = closed_rx.recv() => {
            tracing::info!(state = %client.connection_state(), "server closed the connection");
        }
    }
    Ok(())
}
