//! Exception lists and custom overrides.
//!
//! Admins are exempt from flood control. A custom override can mute the
//! limiter for one user, or put an exempt admin back under evaluation.

use flood_throttle::{Limiter, Update};
use std::time::Duration;

const ADMIN: i64 = 10;
const TRUSTED: i64 = 20;
const GROUP: i64 = -1001;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let limiter: Limiter<Update> = Limiter::builder()
        .with_max_count(2)
        .with_exception_ids(vec![ADMIN])
        .with_condition(|update: &Update| update.chat.is_some_and(|chat| chat < 0))
        .build()?;
    limiter.start()?;

    let burst = |who: i64| {
        (1..=4)
            .map(|i| limiter.admit(&Update::message(GROUP, who).with_text(format!("#{i}"))))
            .collect::<Vec<_>>()
    };

    println!("Admin burst (exempt):         {:?}", burst(ADMIN));
    println!("Trusted burst (evaluated):    {:?}", burst(TRUSTED));

    // Let the trusted user through for a minute
    limiter.add_custom_ignore(TRUSTED, Duration::from_secs(60), false)?;
    println!("Trusted burst (overridden):   {:?}", burst(TRUSTED));

    // Put the admin back under flood control
    limiter.add_custom_ignore(ADMIN, Duration::from_secs(60), true)?;
    println!(
        "Admin ignored exception:      {}",
        limiter.is_ignored_exception(ADMIN)
    );
    println!("Admin burst (re-evaluated):   {:?}", burst(ADMIN));

    limiter.remove_custom_ignore(ADMIN);
    println!("Admin burst (exempt again):   {:?}", burst(ADMIN));

    limiter.shutdown().await?;
    Ok(())
}
