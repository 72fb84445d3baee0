//! Injected mail collaborator. The dispatcher only sees the trait; the
//! production implementation posts to an HTTP mail gateway.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::MAIL_SEND_TIMEOUT_SECS;

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

pub struct HttpMailTransport {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl HttpMailTransport {
    pub fn new(endpoint: &str, from: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(MAIL_SEND_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let payload = serde_json::json!({
            "from": self.from,
            "to": recipient,
            "subject": subject,
            "body": body,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("mail gateway returned {}: {}", status, text);
        }
        Ok(())
    }
}
