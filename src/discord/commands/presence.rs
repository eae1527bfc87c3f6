// Rotating "playing ..." status, started once the framework is ready.

use poise::serenity_prelude as serenity;
use rand::seq::SliceRandom;
use std::time::Duration;

const STATUSES: &[&str] = &["with the ban hammer", "/help", "the case files"];

const ROTATE_EVERY: Duration = Duration::from_secs(10 * 60);

fn pick_status() -> &'static str {
    STATUSES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("/help")
}

/// Loops forever; spawn it.
pub async fn rotate(ctx: serenity::Context) {
    let mut ticker = tokio::time::interval(ROTATE_EVERY);
    loop {
        ticker.tick().await;
        let status = pick_status();
        tracing::debug!(status, "Rotating presence");
        ctx.set_presence(
            Some(serenity::ActivityData::playing(status)),
            serenity::OnlineStatus::Online,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_a_known_status() {
        for _ in 0..20 {
            assert!(STATUSES.contains(&pick_status()));
        }
    }
}
