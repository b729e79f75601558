use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use market_types::events::MarketEvent;

/// An email to a single user.
#[derive(Debug, Clone)]
pub struct Notification {
    pub to_email: String,
    pub to_username: String,
    pub event: MarketEvent,
}

/// Where outgoing emails are delivered.
pub enum MailTransport {
    /// Write the email to the log. Used when no mail service is configured.
    Log,
    /// POST each email as JSON to a mail relay.
    Webhook { client: reqwest::Client, url: String },
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    body: String,
    event: &'a MarketEvent,
}

impl MailTransport {
    async fn deliver(&self, from: &str, n: &Notification) -> anyhow::Result<()> {
        match self {
            Self::Log => {
                info!(
                    to = %n.to_email,
                    subject = %n.event.subject(),
                    "Email (log transport): {}",
                    n.event.body()
                );
                Ok(())
            }
            Self::Webhook { client, url } => {
                let payload = WebhookPayload {
                    from,
                    to: &n.to_email,
                    subject: n.event.subject(),
                    body: format!("Hi {},\n\n{}", n.to_username, n.event.body()),
                    event: &n.event,
                };
                client
                    .post(url)
                    .json(&payload)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }
        }
    }
}

/// Hands notifications to a background worker so requests never wait on mail delivery.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Starts the delivery worker on the current runtime.
    pub fn spawn(transport: MailTransport, from: String) -> Self {
        let (notifier, rx) = Self::channel();
        tokio::spawn(run_worker(rx, transport, from));
        notifier
    }

    /// A notifier whose queue is read by the caller instead of a worker.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("Notification worker has stopped; dropping email");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    transport: MailTransport,
    from: String,
) {
    while let Some(n) = rx.recv().await {
        match transport.deliver(&from, &n).await {
            Ok(()) => debug!("Delivered notification to {}", n.to_email),
            Err(e) => warn!("Failed to deliver notification to {}: {}", n.to_email, e),
        }
    }
}
