//! Times filling freshly allocated buffers against filling pooled ones.
//!
//! Run with `cargo run --release --example benchmark`. Set `RUST_LOG=debug`
//! to watch the sweeper.

use bpool::Pool;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const ITERATIONS: usize = 5000;
const BUFFER_SIZE: usize = 10 * 1024 * 1024;

fn fill(buf: &mut [u8], src: &[u8]) {
    buf.copy_from_slice(src);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let src = vec![42u8; BUFFER_SIZE];
    let pool = Pool::new(BUFFER_SIZE, 10)?;

    let timer = Instant::now();
    for _ in 0..ITERATIONS {
        let mut buf = vec![0u8; BUFFER_SIZE];
        fill(&mut buf, &src);
    }
    info!("without pool: {:?}", timer.elapsed());

    let timer = Instant::now();
    for _ in 0..ITERATIONS {
        let mut buf = pool.acquire();
        fill(&mut buf, &src);
        pool.release(buf);
    }
    info!("with pool: {:?}", timer.elapsed());
    info!("stats: {}", serde_json::to_string(&pool.stats())?);

    // Let the sweeper run once the buffers go stale.
    tokio::time::sleep(Duration::from_secs(12)).await;
    info!("idle buffers after expiration: {}", pool.len());

    pool.shutdown().await;
    Ok(())
}
