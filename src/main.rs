use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use ameta::server;
use ameta::InstanceState;

/// Annotate the files of a local instance through a small HTTP API
#[derive(Parser, Debug)]
#[command(name = "ameta", version, about)]
struct Args {
    /// Path to the identity file anchoring the instance
    #[arg(long)]
    identity: PathBuf,

    /// Address to serve on
    #[arg(long, default_value = "127.0.0.1:8000")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Identity resolution and schema-store startup are the only fatal
    // failures; everything after this degrades per file instead.
    let state = match InstanceState::open(&args.identity) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server::serve(state, args.listen).await {
        eprintln!("❌ Server error: {}", e);
        process::exit(1);
    }
}
