//! Notification sink for new-quake transitions.
//!
//! Fans one short message out to every configured channel: a terminal
//! banner (with BEL so muted terminals still flash) and an optional JSON
//! webhook. Notifications are strictly opt-in; when disabled, a send is a
//! logged no-op rather than an error.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::models::Quake;

// Banner styling
const RESET: &str = "\x1b[0m";
const BANNER: &str = "\x1b[1;97;41m"; // bold white on red
const BELL: char = '\u{7}';

/// Notification channel configuration.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    /// Master opt-in switch.
    pub enabled: bool,
    /// Optional webhook URL receiving `{"text": "..."}` per event.
    pub webhook: Option<String>,
    /// Minimum seconds between notifications; 0 disables the gate.
    pub cooldown_secs: i64,
}

/// Fan-out notifier with a flutter-damping cooldown.
pub struct Notifier {
    config: NotifyConfig,
    cooldown: Cooldown,
    http: Option<reqwest::blocking::Client>,
}

impl Notifier {
    #[must_use]
    pub fn new(config: NotifyConfig) -> Self {
        let http = config
            .webhook
            .is_some()
            .then(reqwest::blocking::Client::new);
        let cooldown = Cooldown::new(config.cooldown_secs);

        Self {
            config,
            cooldown,
            http,
        }
    }

    /// Announce a new quake, honoring the opt-in gate and cooldown.
    ///
    /// Channel failures are logged, never propagated: a dead webhook must
    /// not take the watch loop down.
    pub fn notify(&mut self, quake: &Quake, now: DateTime<Utc>) {
        let message = new_quake_message(quake);

        if !self.config.enabled {
            info!("notification skipped (disabled): {message}");
            return;
        }
        if !self.cooldown.allows(now) {
            info!("notification suppressed by cooldown: {message}");
            return;
        }

        eprintln!("{BELL}{BANNER} {message} {RESET}");

        if let (Some(url), Some(http)) = (self.config.webhook.as_deref(), self.http.as_ref()) {
            let payload = serde_json::json!({ "text": message });
            match http.post(url).json(&payload).send() {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => warn!("webhook returned HTTP {}", resp.status()),
                Err(e) => warn!("webhook send failed: {e}"),
            }
        }

        self.cooldown.note_sent(now);
    }
}

/// Notification text for a new event.
#[must_use]
pub fn new_quake_message(quake: &Quake) -> String {
    format!("New quake — M {:.1} — {}", quake.magnitude, quake.place)
}

/// Cooldown gate to prevent notification spam when the feed head flaps.
///
/// The first alert always passes; inside the window, alerts are
/// suppressed. State advances only via `note_sent`, after a send.
#[derive(Debug, Clone)]
struct Cooldown {
    window: Duration,
    last_sent: Option<DateTime<Utc>>,
}

impl Cooldown {
    /// `secs <= 0` means no cooldown.
    fn new(secs: i64) -> Self {
        Self {
            window: Duration::seconds(secs.max(0)),
            last_sent: None,
        }
    }

    fn allows(&self, now: DateTime<Utc>) -> bool {
        match self.last_sent {
            None => true,
            Some(ts) => now.signed_duration_since(ts) >= self.window,
        }
    }

    fn note_sent(&mut self, now: DateTime<Utc>) {
        self.last_sent = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quake() -> Quake {
        Quake {
            id: "q1".to_string(),
            magnitude: 4.25,
            place: "Ege Denizi".to_string(),
            occurred_at: Utc::now(),
            latitude: 38.5,
            longitude: 27.1,
            located: true,
        }
    }

    #[test]
    fn test_message_text() {
        assert_eq!(new_quake_message(&quake()), "New quake — M 4.2 — Ege Denizi");
    }

    #[test]
    fn test_first_alert_passes() {
        let cd = Cooldown::new(300);
        let now = Utc.with_ymd_and_hms(2026, 8, 5, 9, 0, 0).unwrap();
        assert!(cd.allows(now));
    }

    #[test]
    fn test_inside_cooldown_blocked() {
        let mut cd = Cooldown::new(300);
        let t0 = Utc.with_ymd_and_hms(2026, 8, 5, 9, 0, 0).unwrap();
        cd.note_sent(t0);
        assert!(!cd.allows(t0 + Duration::seconds(120)));
        assert!(cd.allows(t0 + Duration::seconds(300)));
    }

    #[test]
    fn test_zero_cooldown_never_blocks() {
        let mut cd = Cooldown::new(0);
        let t0 = Utc.with_ymd_and_hms(2026, 8, 5, 9, 0, 0).unwrap();
        cd.note_sent(t0);
        assert!(cd.allows(t0));
    }
}
