use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{Sms, SmsSender};
use crate::config::TwilioConfig;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

/// Twilio Programmable Messaging over its REST API.
pub struct TwilioSms {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct MessageCreated {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: String,
}

impl TwilioSms {
    pub fn new(config: &TwilioConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", TWILIO_API, self.account_sid)
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send(&self, sms: Sms) -> anyhow::Result<String> {
        let form = [
            ("To", sms.to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", sms.body.as_str()),
        ];
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .context("twilio request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let reason = match resp.json::<TwilioError>().await {
                Ok(err) => err.message,
                Err(_) => status.to_string(),
            };
            anyhow::bail!("twilio rejected message: {}", reason);
        }

        let created: MessageCreated = resp.json().await.context("decode twilio response")?;
        tracing::info!(to = %sms.to, sid = %created.sid, "sms sent");
        Ok(created.sid)
    }
}
