//! resp-tap: print the frames in a Redis protocol byte stream
//!
//! Reads raw RESP bytes from one of:
//! - stdin
//! - a capture file
//! - a TCP peer
//!
//! and prints each decoded frame the way redis-cli shows replies. Exits with
//! an error on the first protocol violation.

mod config;

use config::{Config, Source};
use resp_stream::{FrameReader, ReaderConfig, ReaderError};
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!(
        source = %config.source,
        read_buffer_size = config.reader.read_buffer_size,
        max_pending_bytes = ?config.reader.max_pending_bytes,
        max_nesting_depth = ?config.reader.max_nesting_depth,
        "Starting resp-tap"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(run(config)) {
        Ok(frames) => {
            info!(frames, "Stream finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Decoding failed");
            Err(e.into())
        }
    }
}

/// Open the configured source and print its frames
async fn run(config: Config) -> Result<u64, ReaderError> {
    match config.source {
        Source::Stdin => tap(tokio::io::stdin(), config.reader).await,
        Source::File(path) => {
            let file = tokio::fs::File::open(&path).await?;
            tap(file, config.reader).await
        }
        Source::Tcp(addr) => {
            let stream = TcpStream::connect(&addr).await?;
            debug!(peer = %addr, "Connected");
            tap(stream, config.reader).await
        }
    }
}

/// Print every frame until the stream ends, returning how many were seen
async fn tap<R: AsyncRead + Unpin>(stream: R, config: ReaderConfig) -> Result<u64, ReaderError> {
    let mut reader = FrameReader::with_config(stream, config);
    let mut count = 0;

    while let Some(frame) = reader.read_frame().await? {
        println!("{frame}");
        count += 1;
    }

    Ok(count)
}
