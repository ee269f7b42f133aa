//! Admin session against the server's admin endpoint.

use impostor_core::protocol::{AdminMessage, AdminServerMessage, RosterEntry};
use impostor_core::transport::{Transport, TransportError, recv_message, send_message};
use impostor_core::ws_transport::WsTransport;

#[derive(Debug, Clone, Copy)]
pub enum AdminCommand {
    Start,
    Stop,
    Reset,
}

impl From<AdminCommand> for AdminMessage {
    fn from(cmd: AdminCommand) -> Self {
        match cmd {
            AdminCommand::Start => AdminMessage::ForceStartGame,
            AdminCommand::Stop => AdminMessage::ForceStopGame,
            AdminCommand::Reset => AdminMessage::ResetGame,
        }
    }
}

/// Connect, send one command, and close.
pub async fn send_command(
    server_url: &str,
    cmd: AdminCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_reader, mut writer) = WsTransport::connect(server_url).await?.split();
    send_message(&mut writer, &AdminMessage::from(cmd)).await?;
    writer.close().await?;
    println!("Sent {:?} to {}", cmd, server_url);
    Ok(())
}

/// Print roster pushes until the server closes the connection.
pub async fn watch(server_url: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (mut reader, _writer) = WsTransport::connect(server_url).await?.split();
    println!("Watching {} (Ctrl-C to quit)", server_url);

    loop {
        match recv_message::<_, AdminServerMessage>(&mut reader).await {
            Ok(AdminServerMessage::SendPlayerList { players }) => {
                if json {
                    println!("{}", serde_json::to_string(&players)?);
                } else {
                    print!("{}", format_roster(&players));
                }
            }
            Err(TransportError::ConnectionClosed) => {
                println!("Server closed the connection");
                return Ok(());
            }
            Err(TransportError::Json(e)) => eprintln!("Skipping unreadable message: {}", e),
            Err(e) => return Err(e.into()),
        }
    }
}

fn format_roster(players: &[RosterEntry]) -> String {
    let mut out = format!("{:<6} {:<9} {:<6} {}\n", "ID", "ROLE", "ALIVE", "TASKS");
    for p in players {
        let role = if p.is_impostor { "impostor" } else { "crewmate" };
        let alive = if p.is_alive { "yes" } else { "no" };
        out.push_str(&format!("{:<6} {:<9} {:<6} {}\n", p.id, role, alive, p.tasks_left));
    }
    out
}
