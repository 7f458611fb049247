/// Delay notifications
use crate::config::SmtpConfig;
use crate::domain::FlightRecord;
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Plain-text message about one delayed flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn for_delayed(record: &FlightRecord) -> Self {
        Self {
            subject: format!("Flight {} Delayed!", record.flight_number),
            body: format!(
                "Flight {} scheduled to arrive at {} is delayed.",
                record.flight_number, record.schedule_arrival_time
            ),
        }
    }
}

/// Outbound mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> ApiResult<()>;
}

/// SMTP submission with STARTTLS and username/password auth
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> ApiResult<Self> {
        let field = |value: &Option<String>, key: &str| {
            value
                .clone()
                .ok_or_else(|| ApiError::MissingConfiguration(key.to_string()))
        };
        let username = field(&config.username, "SMTP_USERNAME")?;
        let password = field(&config.password, "SMTP_PASSWORD")?;
        let from: Mailbox = field(&config.from, "SMTP_FROM")?.parse()?;
        let to: Mailbox = field(&config.to, "SMTP_TO")?.parse()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(username, password))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> ApiResult<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Tally of one dispatch round
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Sends one notification per delayed record.
///
/// Without a dedup window every call re-notifies the same flights. With one,
/// a flight (number + scheduled arrival) notified within the window is
/// skipped.
pub struct Notifier {
    mailer: Box<dyn Mailer>,
    dedup_window: Option<Duration>,
    last_sent: Mutex<HashMap<(String, String), Instant>>,
}

impl Notifier {
    pub fn new(mailer: Box<dyn Mailer>, dedup_window: Option<Duration>) -> Self {
        Self {
            mailer,
            dedup_window,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Notify about a single delayed flight
    pub async fn notify(&self, record: &FlightRecord) -> ApiResult<()> {
        let notification = Notification::for_delayed(record);
        self.mailer.send(&notification).await?;
        info!("Sent delay notification for flight {}", record.flight_number);
        Ok(())
    }

    /// Notify every record in `delayed`; a failed send does not stop the rest
    pub async fn notify_all(&self, delayed: &[FlightRecord]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for record in delayed {
            let key = (
                record.flight_number.clone(),
                record.schedule_arrival_time.clone(),
            );
            if self.recently_sent(&key) {
                summary.suppressed += 1;
                continue;
            }

            match self.notify(record).await {
                Ok(()) => {
                    summary.sent += 1;
                    if self.dedup_window.is_some() {
                        self.mark_sent(key);
                    }
                }
                Err(e) => {
                    error!(
                        "Delay notification for flight {} failed: {:?}",
                        record.flight_number, e
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    fn recently_sent(&self, key: &(String, String)) -> bool {
        let Some(window) = self.dedup_window else {
            return false;
        };
        let sent = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.get(key).is_some_and(|at| at.elapsed() < window)
    }

    /// Record a send and drop entries that have aged out of the window
    fn mark_sent(&self, key: (String, String)) {
        let mut sent = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(window) = self.dedup_window {
            sent.retain(|_, at| at.elapsed() < window);
        }
        sent.insert(key, Instant::now());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::tests::record;
    use std::sync::Arc;

    /// Records every notification instead of delivering it
    #[derive(Clone, Default)]
    pub(crate) struct RecordingMailer {
        pub(crate) sent: Arc<Mutex<Vec<Notification>>>,
        pub(crate) fail_for: Option<String>,
    }

    impl RecordingMailer {
        pub(crate) fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, notification: &Notification) -> ApiResult<()> {
            if let Some(flight) = &self.fail_for {
                if notification.subject.contains(flight.as_str()) {
                    return Err(ApiError::Notification("relay refused".to_string()));
                }
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn delayed_three() -> Vec<FlightRecord> {
        vec![
            record("AE1", "2024-01-01T10:00", None, "Delayed"),
            record("AE2", "2024-01-01T11:00", None, "Delayed"),
            record("AE3", "2024-01-01T12:00", None, "Delayed"),
        ]
    }

    #[test]
    fn test_notification_template() {
        let n = Notification::for_delayed(&record("B78690", "2024-01-01T10:00", None, "Delayed"));
        assert_eq!(n.subject, "Flight B78690 Delayed!");
        assert_eq!(
            n.body,
            "Flight B78690 scheduled to arrive at 2024-01-01T10:00 is delayed."
        );
    }

    #[tokio::test]
    async fn test_every_round_renotifies_without_dedup() {
        let mailer = RecordingMailer::default();
        let notifier = Notifier::new(Box::new(mailer.clone()), None);

        let first = notifier.notify_all(&delayed_three()).await;
        let second = notifier.notify_all(&delayed_three()).await;

        assert_eq!(first.sent, 3);
        assert_eq!(second.sent, 3);
        assert_eq!(mailer.count(), 6);
    }

    #[tokio::test]
    async fn test_dedup_window_suppresses_repeats() {
        let mailer = RecordingMailer::default();
        let notifier = Notifier::new(Box::new(mailer.clone()), Some(Duration::from_secs(3600)));

        notifier.notify_all(&delayed_three()).await;
        let second = notifier.notify_all(&delayed_three()).await;

        assert_eq!(second.sent, 0);
        assert_eq!(second.suppressed, 3);
        assert_eq!(mailer.count(), 3);
    }

    #[tokio::test]
    async fn test_expired_dedup_entries_are_pruned() {
        let mailer = RecordingMailer::default();
        let notifier = Notifier::new(Box::new(mailer.clone()), Some(Duration::from_millis(20)));

        notifier.notify_all(&delayed_three()).await;
        assert_eq!(notifier.last_sent.lock().unwrap().len(), 3);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let again = notifier
            .notify_all(&[record("AE9", "2024-01-01T13:00", None, "Delayed")])
            .await;

        assert_eq!(again.sent, 1);
        let sent = notifier.last_sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent.contains_key(&("AE9".to_string(), "2024-01-01T13:00".to_string())));
    }

    #[tokio::test]
    async fn test_failed_send_does_not_stop_others() {
        let mailer = RecordingMailer {
            fail_for: Some("AE2".to_string()),
            ..Default::default()
        };
        let notifier = Notifier::new(Box::new(mailer.clone()), None);

        let summary = notifier.notify_all(&delayed_three()).await;

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(mailer.count(), 2);
    }

    #[test]
    fn test_smtp_mailer_requires_addresses() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            from: Some("alerts@example.com".to_string()),
            to: None,
        };
        let err = SmtpMailer::new(&config, Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, ApiError::MissingConfiguration(ref k) if k == "SMTP_TO"));

        let bad = SmtpConfig {
            to: Some("not an address".to_string()),
            ..config
        };
        let err = SmtpMailer::new(&bad, Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, ApiError::Notification(_)));
    }
}
