//! Outbound mail and SMS collaborators.

mod console;
mod smtp;
pub mod templates;
mod twilio;

use async_trait::async_trait;

pub use console::{ConsoleMailer, ConsoleSms};
pub use smtp::SmtpMailer;
pub use twilio::TwilioSms;

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Clone)]
pub struct Sms {
    pub to: String,
    pub body: String,
}

/// Sends one email. Errors carry a human-readable reason.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()>;
}

/// Sends one SMS and returns the provider's message id.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, sms: Sms) -> anyhow::Result<String>;
}
