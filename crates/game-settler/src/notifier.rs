//! Best-effort announcement of settled games.
//!
//! Announcements are posted to X using OAuth 1.0a user context signing. They
//! are fire-and-forget: a failed post is logged and never retried.

use {
    crate::traits::Announcing,
    alloy::primitives::{B256, U256},
    anyhow::{Context, Result},
    base64::Engine as _,
    hmac::{Hmac, Mac},
    rand::{Rng, distributions::Alphanumeric},
    reqwest::header::AUTHORIZATION,
    sha1::Sha1,
    std::{
        borrow::Cow,
        sync::Arc,
        time::{Duration, SystemTime, UNIX_EPOCH},
    },
    url::Url,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub game: String,
    pub winner: String,
    /// Hash of the primary settlement transaction.
    pub tx_hash: B256,
    /// Whole tokens burned by the buy-back.
    pub burned: U256,
}

impl Announcement {
    pub fn text(&self, explorer: &Url) -> String {
        let mut text = format!(
            "{} won {}! Fees were forwarded to the winning token",
            self.winner, self.game
        );
        if self.burned.is_zero() {
            text.push('.');
        } else {
            text.push_str(&format!(" and {} tokens were burned.", self.burned));
        }
        text.push_str(&format!(
            "\n{}/tx/{}",
            explorer.as_str().trim_end_matches('/'),
            self.tx_hash
        ));
        text
    }
}

/// Forwards announcements to the configured channel, if any. Never fails.
#[derive(Clone, Default)]
pub struct Notifier(Option<Arc<dyn Announcing>>);

impl Notifier {
    pub fn new(announcer: Arc<dyn Announcing>) -> Self {
        Self(Some(announcer))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    pub async fn announce(&self, announcement: &Announcement) {
        let Some(announcer) = &self.0 else {
            tracing::debug!("announcements are not configured");
            return;
        };
        match announcer.announce(announcement).await {
            Ok(()) => tracing::info!(game = %announcement.game, "announced settlement"),
            Err(err) => tracing::error!(?err, game = %announcement.game, "failed to announce"),
        }
    }
}

#[derive(Clone)]
pub struct XCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl XCredentials {
    /// All four credentials are needed. A partial set is treated as if none
    /// were given.
    pub fn from_parts(
        consumer_key: Option<String>,
        consumer_secret: Option<String>,
        access_token: Option<String>,
        access_token_secret: Option<String>,
    ) -> Option<Self> {
        match (
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        ) {
            (Some(consumer_key), Some(consumer_secret), Some(access_token), Some(access_token_secret)) => {
                Some(Self {
                    consumer_key,
                    consumer_secret,
                    access_token,
                    access_token_secret,
                })
            }
            (None, None, None, None) => None,
            _ => {
                tracing::warn!("incomplete X credentials, announcements are disabled");
                None
            }
        }
    }

    /// Value of the `Authorization` header for a request without form or
    /// query parameters.
    fn authorization(
        &self,
        method: &str,
        url: &Url,
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let timestamp = timestamp.to_string();
        let mut params = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];
        let signature = sign(
            &signature_base(method, url, &params),
            &self.consumer_secret,
            &self.access_token_secret,
        )?;
        params.push(("oauth_signature", signature.as_str()));
        params.sort_unstable();

        let params = params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {params}"))
    }
}

impl std::fmt::Debug for XCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"SECRET")
            .field("access_token", &"SECRET")
            .field("access_token_secret", &"SECRET")
            .finish()
    }
}

fn encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

fn signature_base(method: &str, url: &Url, params: &[(&str, &str)]) -> String {
    let mut encoded = params
        .iter()
        .map(|(key, value)| (encode(key), encode(value)))
        .collect::<Vec<_>>();
    encoded.sort_unstable();
    let params = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url.as_str()),
        encode(&params)
    )
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).context("invalid signing key")?;
    mac.update(base.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Posts announcements with the X API v2.
pub struct XAnnouncer {
    client: reqwest::Client,
    endpoint: Url,
    credentials: XCredentials,
    explorer: Url,
}

impl XAnnouncer {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.twitter.com/2/tweets";

    pub fn new(credentials: XCredentials, explorer: Url, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("failed to build X http client")?,
            endpoint: Self::DEFAULT_ENDPOINT
                .parse()
                .context("invalid X endpoint")?,
            credentials,
            explorer,
        })
    }
}

#[async_trait::async_trait]
impl Announcing for XAnnouncer {
    async fn announce(&self, announcement: &Announcement) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system time before unix epoch")?
            .as_secs();
        let authorization =
            self.credentials
                .authorization("POST", &self.endpoint, &nonce(), timestamp)?;
        let response: serde_json::Value = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, authorization)
            .json(&serde_json::json!({ "text": announcement.text(&self.explorer) }))
            .send()
            .await
            .context("failed to make request")?
            .error_for_status()
            .context("response status is not success")?
            .json()
            .await
            .context("failed to decode response")?;
        tracing::debug!(post = ?response["data"]["id"], "posted announcement");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::traits::MockAnnouncing, alloy::primitives::b256, anyhow::anyhow};

    fn announcement(burned: u64) -> Announcement {
        Announcement {
            game: "Detroit Lions at Dallas Cowboys".to_string(),
            winner: "Detroit Lions".to_string(),
            tx_hash: b256!("0x1111111111111111111111111111111111111111111111111111111111111111"),
            burned: U256::from(burned),
        }
    }

    #[test]
    fn formats_announcement() {
        let explorer: Url = "https://basescan.org/".parse().unwrap();
        assert_eq!(
            announcement(15).text(&explorer),
            "Detroit Lions won Detroit Lions at Dallas Cowboys! Fees were forwarded to the \
             winning token and 15 tokens were burned.\nhttps://basescan.org/tx/\
             0x1111111111111111111111111111111111111111111111111111111111111111"
        );
        assert_eq!(
            announcement(0).text(&explorer),
            "Detroit Lions won Detroit Lions at Dallas Cowboys! Fees were forwarded to the \
             winning token.\nhttps://basescan.org/tx/\
             0x1111111111111111111111111111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn partial_credentials_are_absent() {
        let some = || Some("value".to_string());
        assert!(XCredentials::from_parts(some(), some(), some(), some()).is_some());
        assert!(XCredentials::from_parts(some(), some(), some(), None).is_none());
        assert!(XCredentials::from_parts(None, None, some(), None).is_none());
        assert!(XCredentials::from_parts(None, None, None, None).is_none());
    }

    // Example from X's "Creating a signature" documentation.
    #[test]
    fn signs_requests() {
        let url: Url = "https://api.twitter.com/1.1/statuses/update.json"
            .parse()
            .unwrap();
        let params = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            (
                "oauth_token",
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            ),
            ("oauth_version", "1.0"),
        ];
        let base = signature_base("post", &url, &params);
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
        assert_eq!(
            sign(
                &base,
                "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
                "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"
            )
            .unwrap(),
            "hCtSmYh+iHYCEqBWrE7C7hYmtUk="
        );
    }

    #[test]
    fn authorization_header_contains_signature() {
        let credentials = XCredentials {
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            access_token: "token".to_string(),
            access_token_secret: "token secret".to_string(),
        };
        let url: Url = XAnnouncer::DEFAULT_ENDPOINT.parse().unwrap();
        let header = credentials
            .authorization("POST", &url, "nonce", 1_700_000_000)
            .unwrap();
        assert!(header.starts_with("OAuth oauth_consumer_key=\"key\", oauth_nonce=\"nonce\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
        assert!(!header.contains("secret"));
    }

    #[tokio::test]
    async fn disabled_notifier_does_nothing() {
        Notifier::disabled().announce(&announcement(1)).await;
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let mut announcer = MockAnnouncing::new();
        announcer
            .expect_announce()
            .times(1)
            .returning(|_| Err(anyhow!("rate limited")));
        Notifier::new(Arc::new(announcer))
            .announce(&announcement(1))
            .await;
    }
}
