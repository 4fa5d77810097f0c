//! WHEP viewer example - pulls streams and logs every state change
//!
//! Run with: cargo run --example viewer --features webrtc -- <BASE_URL> <STREAM_ID>...
//!
//! Examples:
//!   cargo run --example viewer --features webrtc -- http://localhost:8080 camera-1
//!   cargo run --example viewer --features webrtc -- http://localhost:8080 cam-1 cam-2
//!
//! Set `WHEP_TOKEN` to send a bearer token with every request.
//!
//! Sessions keep retrying until Ctrl-C: stop the server and start it again
//! to watch them go `Failed` and recover.

use std::sync::Arc;

use whep_viewer::{
    PeerTransportFactory, SessionConfig, SessionRegistry, Unsubscribe, WhepConnector,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: viewer <BASE_URL> <STREAM_ID>...");
        std::process::exit(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("whep_viewer=debug".parse()?)
                .add_directive("viewer=info".parse()?),
        )
        .init();

    let mut config = SessionConfig::new(&args[0])?;
    if let Ok(token) = std::env::var("WHEP_TOKEN") {
        config = config.bearer_token(token);
    }

    let registry = SessionRegistry::new(
        config.clone(),
        Arc::new(PeerTransportFactory::new(&config)?),
        Arc::new(WhepConnector::new(&config)?),
    );

    let mut subscriptions: Vec<Unsubscribe> = Vec::new();
    for id in &args[1..] {
        let bridge = registry.bridge(id);
        let reader = bridge.clone();
        let last = parking_lot::Mutex::new(bridge.get_snapshot());

        subscriptions.push(bridge.subscribe(move || {
            let status = reader.get_snapshot();
            let mut last = last.lock();
            if !Arc::ptr_eq(&last, &status) {
                tracing::info!(session = %status.id, state = %status.state, "State changed");
                *last = status;
            }
        }));

        tokio::spawn(registry.get_or_create(id).start());
    }

    println!("Viewing {} stream(s), press Ctrl-C to stop", args.len() - 1);
    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");

    for id in &args[1..] {
        let session = registry.get_or_create(id);
        session.stop().await;

        let stats = session.stats();
        tracing::info!(
            session = %id,
            attempts = stats.attempts,
            restarts = stats.restarts,
            handshake_failures = stats.handshake_failures,
            uptime = ?stats.uptime(),
            since_connected = ?stats.since_connected(),
            "Session summary"
        );
    }

    for subscription in subscriptions {
        subscription.unsubscribe();
    }

    Ok(())
}
