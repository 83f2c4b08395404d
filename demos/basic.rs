//! Basic example demonstrating per-user flood control.
//!
//! A limiter allowing 3 messages per 2-second window is fed a burst from one
//! user and a slow stream from another.

use flood_throttle::{Decision, Limiter, Update};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let limiter: Limiter<Update> = Limiter::builder()
        .with_window(Duration::from_secs(2))
        .with_punishment(Duration::from_secs(3))
        .with_max_count(3)
        .with_trigger(|update: &Update| {
            println!("  -> user {:?} is now muted", update.sender);
        })
        .build()?;
    limiter.start()?;

    println!("=== Basic Flood Control Example ===\n");
    println!("Policy: 3 messages per 2s window, 3s punishment\n");

    println!("User 1 sends a burst of 6 messages:");
    for i in 1..=6 {
        let update = Update::message(-1001, 1).with_text(format!("spam {i}"));
        println!("  message {i}: {:?}", limiter.admit(&update));
    }

    println!("\nUser 2 sends one message every 800ms:");
    for i in 1..=4 {
        let update = Update::message(-1001, 2).with_text(format!("hello {i}"));
        let decision = limiter.admit(&update);
        println!("  message {i}: {decision:?}");
        assert_ne!(decision, Decision::NewlyLimited);
        tokio::time::sleep(Duration::from_millis(800)).await;
    }

    println!("\nUser 1 after serving the punishment:");
    tokio::time::sleep(Duration::from_secs(1)).await;
    let update = Update::message(-1001, 1).with_text("sorry");
    println!("  message: {:?}", limiter.admit(&update));

    let snapshot = limiter.metrics().snapshot();
    println!("\n=== Metrics ===");
    println!("Admitted:    {}", snapshot.events_admitted);
    println!("Suppressed:  {}", snapshot.events_suppressed);
    println!("Limited:     {}", snapshot.identities_limited);
    println!(
        "Suppression rate: {:.1}%",
        snapshot.suppression_rate() * 100.0
    );

    limiter.shutdown().await?;
    Ok(())
}
