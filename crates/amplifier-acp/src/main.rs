//! Binary entrypoint: parses CLI flags, initializes logging on the sink
//! appropriate for the chosen transport, and runs it. Grounded on
//! `ah-rest-server`'s `main.rs` flag layout, generalized to the three
//! transports this runtime supports instead of one fixed HTTP server.

use amplifier_acp::{handler::AcpHandler, routing, transport, Config, PersistenceConfig, SessionManager, TransportMode};
use amplifier_logging::{CliLogLevel, LogFormat};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "amplifier-acp", about = "Server-side Agent Client Protocol runtime")]
struct Args {
    /// Which transport to run: stdio, http, or websocket.
    #[arg(long, value_enum, env = "AMPLIFIER_ACP_TRANSPORT", default_value = "stdio")]
    transport: TransportMode,

    /// Address to bind for http/websocket transports.
    #[arg(long, env = "AMPLIFIER_ACP_BIND", default_value = "127.0.0.1:8700")]
    bind: String,

    /// Explicit session storage directory; overrides AMPLIFIER_STORAGE_DIR / AMPLIFIER_NO_PERSIST.
    #[arg(long, env = "AMPLIFIER_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Disable session persistence entirely.
    #[arg(long, env = "AMPLIFIER_NO_PERSIST")]
    no_persist: bool,

    #[arg(long, value_enum, env = "AMPLIFIER_LOG_LEVEL", default_value = "info")]
    log_level: CliLogLevel,

    #[arg(long, value_enum, env = "AMPLIFIER_LOG_FORMAT", default_value = "plaintext")]
    log_format: LogFormat,

    /// Seconds of inactivity before an http/websocket connection is closed.
    #[arg(long, default_value_t = 300)]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.into();
    if args.transport == TransportMode::Stdio {
        amplifier_logging::init_stdio_safe("amplifier-acp", log_level, args.log_format)?;
    } else {
        amplifier_logging::init("amplifier-acp", log_level, args.log_format)?;
    }

    let persistence = if args.no_persist { PersistenceConfig::Disabled } else { PersistenceConfig::resolve(args.storage_dir) };

    let config = Config {
        bind_addr: args.bind.clone(),
        transport: args.transport,
        persistence: persistence.clone(),
        idle_timeout_secs: args.idle_timeout_secs,
        connection_limit: 64,
        acp_enabled: amplifier_acp::config::acp_enabled_from_env(),
    };

    let sessions = SessionManager::new(persistence);
    let handler: Arc<dyn amplifier_acp::RpcHandler> = Arc::new(AcpHandler::new(sessions, config.clone()));

    match args.transport {
        TransportMode::Stdio => {
            if let Err(err) = transport::stdio::run(handler.as_ref()).await {
                tracing::error!(error = %err, "stdio transport terminated with an error");
                std::process::exit(1);
            }
        }
        TransportMode::Http | TransportMode::Websocket => {
            let state = routing::AppState {
                handler,
                notifications: Arc::new(transport::NotificationHub::new()),
                idle_timeout: Duration::from_secs(args.idle_timeout_secs),
            };
            let app = routing::build_app(state, config.acp_enabled);
            let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
            tracing::info!(addr = %config.bind_addr, transport = ?config.transport, "amplifier-acp listening");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
