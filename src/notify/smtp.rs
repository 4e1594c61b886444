use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{Mailer, OutboundEmail};
use crate::config::SmtpConfig;

/// SMTP mailer over an implicit-TLS relay (port 465 by default).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .with_context(|| format!("smtp relay {}", config.host))?
            .port(config.port)
            .credentials(creds)
            .build();

        let from = match &config.from_name {
            Some(name) => format!("\"{}\" <{}>", name, config.from_email),
            None => config.from_email.clone(),
        };
        let from = from.parse::<Mailbox>().context("invalid from address")?;

        tracing::info!(host = %config.host, port = config.port, "smtp mailer configured");
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()> {
        let to = email
            .recipient
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {}", email.recipient))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body)
            .context("build email")?;

        self.transport
            .send(message)
            .await
            .context("Failed to send email")?;
        tracing::info!(recipient = %email.recipient, "email sent");
        Ok(())
    }
}
