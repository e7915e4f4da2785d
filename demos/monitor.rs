use njspc::{Hub, MessageLogMode, NjsPcClient, Renderable};
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Connects to njsPC, builds every entity and then applies NDJSON events
/// read from stdin (e.g. piped from a socket.io bridge).
#[tokio::main]
async fn main() -> njspc::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args
        .get(1)
        .expect("usage: monitor <host:port> [--https] [--log <path>]");
    let use_https = args.iter().any(|a| a == "--https");
    let log_path = args
        .iter()
        .position(|a| a == "--log")
        .and_then(|i| args.get(i + 1));

    let mut builder = NjsPcClient::builder(host);
    if use_https {
        builder = builder.protocol("https");
    }
    let mut client = builder.build();

    println!("Connecting to {host}...");
    client.connect().await?;

    let mut hub = Hub::builder().on_refresh(|entity| {
        let props = entity.display_properties();
        println!(
            "[{}] {} = {}{}",
            entity.platform(),
            entity.name(),
            props.get("state").cloned().unwrap_or_default(),
            if entity.available() { "" } else { " (unavailable)" },
        );
    });
    if let Some(path) = log_path {
        hub = hub.message_log(MessageLogMode::Diffed, path);
    }
    let mut hub = hub.setup(&client).await?;

    for entity in hub.entities() {
        println!("{:<14} {:<40} {}", entity.platform(), entity.unique_id(), entity.name());
    }
    println!("{} entities. Reading events from stdin...", hub.len());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = hub.dispatch_line(&line) {
            eprintln!("Dispatch error: {e}");
        }
    }

    hub.teardown();
    client.disconnect();
    Ok(())
}
