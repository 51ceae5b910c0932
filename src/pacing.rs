use crate::client::AuthMode;
use crate::error::Result;
use crate::quota::{OperationClass, QuotaRegistry};

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone, Copy)]
struct ClassState {
    last_request: Instant,
    requests: u64,
}

/// Per-session request pacing state.
///
/// Tracks, independently for every [`OperationClass`], when the last request of that class
/// was issued, and computes how long the next one has to wait so that the registry's
/// per-window quota is never exceeded. Classes are isolated on purpose: time spent in a
/// `Timeline` request never earns an `Associates` request extra credit.
///
/// The state sits behind a [`tokio::sync::Mutex`] for fairness, so a single `PacingState`
/// can be shared by concurrent listings without breaking the read-modify-write of the
/// per-class timestamps. The quota guarantee still assumes that requests of one class are
/// issued sequentially.
#[derive(Debug)]
pub struct PacingState {
    mode: AuthMode,
    registry: QuotaRegistry,
    classes: Mutex<HashMap<OperationClass, ClassState>>,
}

impl PacingState {
    pub fn new(mode: AuthMode, registry: QuotaRegistry) -> Self {
        PacingState {
            mode,
            registry,
            classes: Mutex::new(HashMap::new()),
        }
    }

    /// The auth mode this state selects quotas for. Fixed for the session's lifetime.
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// How long the next request of this class has to wait.
    ///
    /// The required spacing between two requests is `WINDOW / limit`; whatever wall-clock
    /// time has already elapsed since the last request of the class counts against it, so a
    /// caller that spends longer processing a page than the spacing requires waits nothing
    /// at all. The class's last-request timestamp is updated unconditionally: the caller is
    /// expected to sleep for the returned duration and then issue the request.
    pub async fn cooldown(&self, class: OperationClass) -> Result<Duration> {
        let spacing = self.registry.spacing(class, self.mode)?;
        let now = Instant::now();

        let mut classes = self.classes.lock().await;

        // The first request of a class never waits.
        let wait = match classes.get(&class) {
            Some(state) => spacing.saturating_sub(now.saturating_duration_since(state.last_request)),
            None => Duration::ZERO,
        };

        let state = classes.entry(class).or_insert(ClassState {
            last_request: now,
            requests: 0,
        });
        state.last_request = now;
        state.requests += 1;

        Ok(wait)
    }

    /// Compute the cooldown for this class and suspend for it.
    ///
    /// This is the only suspension point of the pull path; dropping the future cancels the
    /// wait without issuing anything.
    pub async fn pace(&self, class: OperationClass) -> Result<()> {
        let wait = self.cooldown(class).await?;

        if !wait.is_zero() {
            tracing::debug!(?class, ?wait, "pacing request");
            sleep(wait).await;
        }

        Ok(())
    }

    /// How many requests of this class have been paced through this state so far.
    pub async fn request_count(&self, class: OperationClass) -> u64 {
        self.classes
            .lock()
            .await
            .get(&class)
            .map(|state| state.requests)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::ALL_CLASSES;

    fn paced(limit: u32) -> PacingState {
        PacingState::new(
            AuthMode::User,
            QuotaRegistry::new(vec![((OperationClass::Associates, AuthMode::User), limit)]),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_never_waits() {
        let pacing = PacingState::new(AuthMode::User, QuotaRegistry::default());

        for &class in ALL_CLASSES.iter() {
            assert_eq!(
                pacing.cooldown(class).await.unwrap(),
                Duration::ZERO,
                "{:?}",
                class
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_requests_wait_the_full_spacing() {
        let pacing = paced(15);

        pacing.cooldown(OperationClass::Associates).await.unwrap();

        // With the clock paused, zero time has elapsed since the previous call.
        assert_eq!(
            pacing.cooldown(OperationClass::Associates).await.unwrap(),
            Duration::from_secs(60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_processing_time_counts_against_the_cooldown() {
        let pacing = paced(15);

        pacing.cooldown(OperationClass::Associates).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;

        assert_eq!(
            pacing.cooldown(OperationClass::Associates).await.unwrap(),
            Duration::from_secs(15)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_processing_means_no_wait_at_all() {
        let pacing = paced(15);

        pacing.cooldown(OperationClass::Associates).await.unwrap();
        tokio::time::advance(Duration::from_secs(90)).await;

        assert_eq!(
            pacing.cooldown(OperationClass::Associates).await.unwrap(),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_classes_never_wait() {
        let pacing = paced(0);

        for _ in 0..3 {
            assert_eq!(
                pacing.cooldown(OperationClass::Associates).await.unwrap(),
                Duration::ZERO
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn classes_are_paced_independently() {
        let pacing = PacingState::new(AuthMode::User, QuotaRegistry::default());

        pacing.cooldown(OperationClass::Associates).await.unwrap();

        // A fresh class starts with a clean slate, whatever happened on the other one.
        assert_eq!(
            pacing.cooldown(OperationClass::Timeline).await.unwrap(),
            Duration::ZERO
        );

        // And pacing the other class didn't reset the first one's timestamp.
        assert_eq!(
            pacing.cooldown(OperationClass::Associates).await.unwrap(),
            Duration::from_secs(60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pace_suspends_for_the_cooldown() {
        let pacing = paced(15);
        let start = Instant::now();

        pacing.pace(OperationClass::Associates).await.unwrap();
        pacing.pace(OperationClass::Associates).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_row_fails_fast() {
        let pacing = paced(15);

        assert!(pacing.pace(OperationClass::Lookup).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn request_counts_are_per_class() {
        let pacing = paced(0);

        assert_eq!(pacing.request_count(OperationClass::Associates).await, 0);

        pacing.cooldown(OperationClass::Associates).await.unwrap();
        pacing.cooldown(OperationClass::Associates).await.unwrap();

        assert_eq!(pacing.request_count(OperationClass::Associates).await, 2);
        assert_eq!(pacing.request_count(OperationClass::Timeline).await, 0);
    }
}
