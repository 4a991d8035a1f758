// Server module entry point
// Binds the listener and runs the accept loop

pub mod connection;
pub mod listener;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use respkit::config::{AppState, Config};
use respkit::logger;

pub use listener::create_reusable_listener;

/// Run the server until the accept loop fails
///
/// Connections are served on a `LocalSet`, so handlers need not be `Send`.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;
    let state = Arc::new(AppState::new(&config));
    let connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &config);

    let local = tokio::task::LocalSet::new();
    local
        .run_until(accept_loop(listener, state, connections))
        .await
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    connections: Arc<AtomicUsize>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                connection::accept_connection(stream, peer_addr, &state, &connections);
            }
            Err(e) => {
                logger::log_error(&format!("Failed to accept connection: {e}"));
            }
        }
    }
}
