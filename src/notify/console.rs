//! Log-only transports for local development, used when SMTP/Twilio are not configured.

use async_trait::async_trait;
use uuid::Uuid;

use super::{Mailer, OutboundEmail, Sms, SmsSender};

#[derive(Debug, Default, Clone)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()> {
        tracing::info!(
            recipient = %email.recipient,
            subject = %email.subject,
            body = %email.html_body,
            "email (console transport)"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConsoleSms;

#[async_trait]
impl SmsSender for ConsoleSms {
    async fn send(&self, sms: Sms) -> anyhow::Result<String> {
        let id = format!("console-{}", Uuid::new_v4());
        tracing::info!(to = %sms.to, body = %sms.body, message_id = %id, "sms (console transport)");
        Ok(id)
    }
}
