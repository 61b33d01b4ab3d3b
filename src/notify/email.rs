// src/notify/email.rs
use anyhow::{Context, Result};
use chrono::Local;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{digest_subject, render_html_digest, render_text_digest, NotificationTransport};
use crate::error::TransportError;
use crate::posting::MatchResult;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP digest sender (STARTTLS relay).
pub struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailTransport {
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SENDER_EMAIL`, `SENDER_PASSWORD`, `RECIPIENT_EMAIL`.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string());
        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);
        let user = std::env::var("SENDER_EMAIL").context("SENDER_EMAIL missing")?;
        let pass = std::env::var("SENDER_PASSWORD").context("SENDER_PASSWORD missing")?;
        let to_addr = std::env::var("RECIPIENT_EMAIL").context("RECIPIENT_EMAIL missing")?;

        let from: Mailbox = user.parse().context("invalid SENDER_EMAIL")?;
        let to: Mailbox = to_addr.parse().context("invalid RECIPIENT_EMAIL")?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            .with_context(|| format!("invalid SMTP_HOST {host}"))?
            .port(port)
            .credentials(Credentials::new(user, pass))
            .build();

        tracing::info!(target: "notify", %host, port, "email transport configured");
        Ok(Self { mailer, from, to })
    }

    fn build_message(&self, matches: &[MatchResult]) -> Result<Message> {
        let now = Local::now().naive_local();
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(digest_subject(matches))
            .multipart(MultiPart::alternative_plain_html(
                render_text_digest(matches),
                render_html_digest(matches, now),
            ))
            .context("build email")
    }
}

#[async_trait::async_trait]
impl NotificationTransport for EmailTransport {
    async fn send(&self, matches: &[MatchResult]) -> Result<(), TransportError> {
        let msg = self.build_message(matches)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn missing_credentials_are_reported_not_panicked() {
        std::env::remove_var("SENDER_EMAIL");
        std::env::remove_var("SENDER_PASSWORD");
        std::env::remove_var("RECIPIENT_EMAIL");
        let err = EmailTransport::from_env().err().expect("must fail");
        assert!(format!("{err:#}").contains("SENDER_EMAIL"));
    }
}
