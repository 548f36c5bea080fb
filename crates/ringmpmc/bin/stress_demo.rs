//! Multi-producer stress demonstration.
//!
//! Several producer threads enqueue into one single-consumer ring; once they
//! finish, the ring must hold exactly `threads * per_thread` values, and a
//! drain must return each of them once.
//!
//! Run with: `cargo run --release -p ringmpmc-rs --features demo --bin stress_demo`
//!
//! Tune with `RINGMPMC_THREADS` and `RINGMPMC_PER_THREAD`; set `RUST_LOG=debug`
//! to see ring lifecycle events.

use ringmpmc_rs::{Backoff, Config, Ring, RingFlags};
use std::env;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_THREADS: usize = 4;
const DEFAULT_PER_THREAD: usize = 100_000;
const RING_CAPACITY: usize = 1 << 20;

fn env_or(name: &str, default: usize) -> Result<usize, Box<dyn Error>> {
    match env::var(name) {
        Ok(raw) => Ok(raw
            .parse()
            .map_err(|e| format!("{name}={raw:?} is not a count: {e}"))?),
        Err(_) => Ok(default),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let threads = env_or("RINGMPMC_THREADS", DEFAULT_THREADS)?;
    let per_thread = env_or("RINGMPMC_PER_THREAD", DEFAULT_PER_THREAD)?;
    let expected = threads * per_thread;

    println!("=== ringmpmc-rs Stress Demo ===\n");
    println!("  producers:  {threads}");
    println!("  per thread: {per_thread}");
    println!("  capacity:   {RING_CAPACITY}\n");

    let config = Config::new(RING_CAPACITY, RingFlags::SINGLE_CONSUMER, true);
    let ring = Arc::new(Ring::<usize>::with_config(config)?);
    let running = Arc::new(AtomicUsize::new(threads));

    let start = Instant::now();
    let handles = (0..threads)
        .map(|t| {
            let ring = Arc::clone(&ring);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name(format!("producer-{t}"))
                .spawn(move || {
                    let mut backoff = Backoff::new();
                    for i in 0..per_thread {
                        let mut value = t * per_thread + i;
                        // Only spins when the ring is smaller than the workload
                        while let Err(rejected) = ring.enqueue(value) {
                            value = rejected;
                            backoff.snooze();
                        }
                        backoff.reset();
                    }
                    running.fetch_sub(1, Ordering::Release);
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Producers decrement the countdown as they finish
    let mut backoff = Backoff::new();
    while running.load(Ordering::Acquire) != 0 {
        backoff.snooze();
    }
    let elapsed = start.elapsed();
    for handle in handles {
        handle.join().map_err(|_| "producer thread panicked")?;
    }

    let count = ring.count() as usize;
    tracing::info!(count, expected, ?elapsed, "producers finished");
    println!("  ret count: {count}");
    if count != expected {
        return Err(format!("expected {expected} values in the ring, found {count}").into());
    }

    let mut seen = vec![false; expected];
    let mut drained = 0usize;
    for value in ring.drain() {
        if value >= expected || seen[value] {
            return Err(format!("unexpected or duplicate value {value}").into());
        }
        seen[value] = true;
        drained += 1;
    }
    if drained != expected {
        return Err(format!("drained {drained} values, expected {expected}").into());
    }

    let metrics = ring.metrics();
    println!("  drained:    {drained}");
    println!("  cas retries: {}", metrics.cas_retries);
    println!("  tail waits:  {}", metrics.tail_wait_spins);
    println!(
        "  throughput:  {:.1} M enq/s",
        expected as f64 / elapsed.as_secs_f64() / 1e6
    );

    let ring = Arc::try_unwrap(ring).map_err(|_| "ring still shared after join")?;
    ring.destroy(None::<fn(usize)>);

    println!("\n=== Stress demo completed successfully! ===");
    Ok(())
}
