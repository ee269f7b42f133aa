use clap::{Parser, Subcommand};

mod client;

#[derive(Parser)]
#[command(name = "impostor-admin")]
#[command(about = "Control an impostor game server", long_about = None)]
struct Cli {
    /// Admin WebSocket endpoint
    #[arg(short, long, default_value = "ws://127.0.0.1:54813")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Force the game to start
    Start,
    /// Force the game to stop
    Stop,
    /// Drop every player and return to the lobby
    Reset,
    /// Print each roster update as it arrives
    Watch {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => client::send_command(&cli.server, client::AdminCommand::Start).await,
        Command::Stop => client::send_command(&cli.server, client::AdminCommand::Stop).await,
        Command::Reset => client::send_command(&cli.server, client::AdminCommand::Reset).await,
        Command::Watch { json } => client::watch(&cli.server, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
