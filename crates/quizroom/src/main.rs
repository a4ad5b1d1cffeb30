//! `quizroomd`: the quiz room server process.

use clap::Parser;
use quizroom::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "quizroomd", version)]
#[command(about = "Real-time broadcast server for live quiz sessions")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "QUIZROOM_BIND", default_value = "0.0.0.0:8083")]
    bind: String,

    /// HS256 secret shared with the service that issues tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Envelopes buffered per member before it is disconnected
    #[arg(long, env = "QUIZROOM_MAILBOX_CAPACITY", default_value_t = 64)]
    mailbox_capacity: usize,

    /// Maximum members per quiz room
    #[arg(long, env = "QUIZROOM_MAX_ROOM_SIZE", default_value_t = 512)]
    max_room_size: usize,

    /// Disconnect members silent for this long (0 = never)
    #[arg(long, env = "QUIZROOM_IDLE_TIMEOUT_SECS", default_value_t = 300)]
    idle_timeout_secs: u64,

    /// Inbound frames accepted per second per connection (0 = unlimited)
    #[arg(long, env = "QUIZROOM_MAX_FRAMES_PER_SECOND", default_value_t = 20)]
    max_frames_per_second: u32,

    /// Do not send a member's own messages back to it
    #[arg(long)]
    no_echo: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn hub_config(&self) -> HubConfig {
        HubConfig {
            mailbox_capacity: self.mailbox_capacity,
            max_room_size: self.max_room_size,
            echo_to_sender: !self.no_echo,
            ..HubConfig::default()
        }
    }

    fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            idle_timeout_secs: self.idle_timeout_secs,
            max_frames_per_second: self.max_frames_per_second,
            ..ConnectionConfig::default()
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), QuizRoomError> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let server = QuizRoomServerBuilder::new()
        .bind(&args.bind)
        .hub_config(args.hub_config())
        .connection_config(args.connection_config())
        .build(JwtAuthenticator::new(args.jwt_secret.as_bytes()))
        .await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    }
}
