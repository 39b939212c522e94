//! Best-effort operator email delivery over SMTP.

use lettre::message::Mailbox;
use lettre::transport::smtp::AsyncSmtpTransport;
use lettre::{AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

use crate::policy::Notify;

/// Fixed sender address for every outgoing notification. Never derived from
/// the configured hostname, so mail keeps a stable From regardless of where
/// the process runs.
const MAIL_FROM: &str = "container-watchdog@localhost";

/// Delivers one-shot operator notifications over SMTP. Transport failures
/// are logged and swallowed; a notification failure must never take down
/// the pipeline.
pub struct Notifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_host: String,
    recipients: Vec<String>,
}

impl Notifier {
    pub fn new(mail_server: &str, from_host: String, recipients: Vec<String>) -> crate::error::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(mail_server).build();
        Ok(Self {
            transport,
            from_host,
            recipients,
        })
    }

    fn build_message(&self, subject: &str, body: &str) -> Option<Message> {
        if self.recipients.is_empty() {
            return None;
        }
        let from: Mailbox = MAIL_FROM.parse().ok()?;
        let mut builder = Message::builder()
            .from(from)
            .subject(format!("{}: {subject}", self.from_host));
        for recipient in &self.recipients {
            let to: Mailbox = recipient.parse().ok()?;
            builder = builder.to(to);
        }
        builder.body(body.to_string()).ok()
    }
}

impl Notify for Notifier {
    async fn send(&self, subject: &str, body: &str) {
        let Some(message) = self.build_message(subject, body) else {
            if self.recipients.is_empty() {
                debug!("no mail recipients configured, not sending notification");
            } else {
                warn!(subject, "failed to build notification message, dropping it");
            }
            return;
        };

        if let Err(e) = self.transport.send(message).await {
            warn!(error = %e, subject, "failed to send notification email");
        }
    }
}
