//! Per-provider cooldown after upstream rate limiting.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::telemetry;

/// Minimum interval between logged disable events per provider.
const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Circuit breaker that disables a provider for a fixed window after an
/// explicit rate-limit signal.
///
/// Re-enabling is lazy: the next [`is_disabled`](Self::is_disabled) check
/// past the deadline reports the provider as available again; no background
/// timer runs. Disable logging is itself rate-limited (once per minute per
/// provider) so sustained throttling cannot storm the logs.
pub struct CooldownGuard {
    state: Mutex<HashMap<String, ProviderState>>,
    cooldown: Duration,
}

#[derive(Debug, Clone, Copy)]
struct ProviderState {
    disabled_until: Instant,
    last_logged: Option<Instant>,
}

impl CooldownGuard {
    /// Create a guard with the given fixed cooldown window.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            cooldown,
        }
    }

    /// Whether the provider is currently inside a cooldown window.
    pub fn is_disabled(&self, provider: &str, now: Instant) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(provider)
            .is_some_and(|s| now < s.disabled_until)
    }

    /// Open (or extend) a cooldown window for the provider.
    ///
    /// `retry_after` overrides the configured window when the upstream
    /// supplied a hint; `None` uses the fixed default.
    pub fn disable(&self, provider: &str, now: Instant, retry_after: Option<Duration>) {
        let window = retry_after.filter(|d| !d.is_zero()).unwrap_or(self.cooldown);
        let until = now + window;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.entry(provider.to_string()).or_insert(ProviderState {
            disabled_until: until,
            last_logged: None,
        });
        entry.disabled_until = entry.disabled_until.max(until);

        metrics::counter!(telemetry::PROVIDER_COOLDOWNS_TOTAL, "provider" => provider.to_owned())
            .increment(1);

        let should_log = entry
            .last_logged
            .is_none_or(|last| now.saturating_duration_since(last) >= LOG_INTERVAL);
        if should_log {
            entry.last_logged = Some(now);
            warn!(
                provider,
                cooldown_secs = window.as_secs(),
                "provider rate limited, disabling"
            );
        }
    }

    /// The fixed cooldown window this guard was built with.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for CooldownGuard {
    /// 15-minute window.
    fn default() -> Self {
        Self::new(Duration::from_secs(15 * 60))
    }
}
