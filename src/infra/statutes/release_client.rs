// HTTP fetcher for statute release payloads (USC XML release points, SRC
// JSON exports). Best-effort: one attempt, typed error on failure. The
// import command reports the failure to whoever ran it.

use reqwest::Client;

use crate::core::statutes::StatuteError;

/// Refuse to buffer payloads past this size. An annual USC title tops out
/// well under this.
const MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

pub struct ReleaseClient {
    client: Client,
}

impl ReleaseClient {
    pub fn new() -> Result<Self, StatuteError> {
        let client = Client::builder()
            .user_agent("CapitolBot/0.2")
            .build()
            .map_err(|e| StatuteError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetch a release document as text.
    pub async fn fetch(&self, url: &str) -> Result<String, StatuteError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StatuteError::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StatuteError::Fetch(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        if let Some(length) = resp.content_length() {
            if length > MAX_PAYLOAD_BYTES {
                return Err(StatuteError::Fetch(format!(
                    "Payload is {} bytes; refusing to buffer it",
                    length
                )));
            }
        }

        resp.text()
            .await
            .map_err(|e| StatuteError::Fetch(e.to_string()))
    }
}
