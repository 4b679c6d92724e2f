//! Twitter OAuth 1.0a credentials
//!
//! The four user-context keys are read from the environment. Each key accepts
//! a primary variable name plus the aliases used by the developer portal.

use strum::{AsRefStr, EnumIter, IntoEnumIterator};

/// Enum of all credential identifiers the bot needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, AsRefStr)]
pub enum ApiKeyId {
    #[strum(serialize = "TWITTER_CONSUMER_KEY")]
    TwitterConsumerKey,
    #[strum(serialize = "TWITTER_CONSUMER_SECRET")]
    TwitterConsumerSecret,
    #[strum(serialize = "TWITTER_ACCESS_TOKEN")]
    TwitterAccessToken,
    #[strum(serialize = "TWITTER_ACCESS_TOKEN_SECRET")]
    TwitterAccessTokenSecret,
}

impl ApiKeyId {
    /// The canonical key name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwitterConsumerKey => "TWITTER_CONSUMER_KEY",
            Self::TwitterConsumerSecret => "TWITTER_CONSUMER_SECRET",
            Self::TwitterAccessToken => "TWITTER_ACCESS_TOKEN",
            Self::TwitterAccessTokenSecret => "TWITTER_ACCESS_TOKEN_SECRET",
        }
    }

    /// Environment variable names checked for this key, in order
    pub fn env_vars(&self) -> &'static [&'static str] {
        match self {
            Self::TwitterConsumerKey => &["TWITTER_CONSUMER_KEY", "TWITTER_API_KEY"],
            Self::TwitterConsumerSecret => &["TWITTER_CONSUMER_SECRET", "TWITTER_API_SECRET"],
            Self::TwitterAccessToken => &["TWITTER_ACCESS_TOKEN"],
            Self::TwitterAccessTokenSecret => &["TWITTER_ACCESS_TOKEN_SECRET"],
        }
    }

    /// Iterate over all key variants
    pub fn iter() -> impl Iterator<Item = ApiKeyId> {
        <Self as IntoEnumIterator>::iter()
    }
}

/// OAuth 1.0a user-context credentials
#[derive(Clone)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

impl TwitterCredentials {
    pub fn new(
        consumer_key: String,
        consumer_secret: String,
        access_token: String,
        access_token_secret: String,
    ) -> Self {
        Self {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        }
    }

    /// Load all four keys from the process environment
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load all four keys through `lookup`, reporting every missing key at once
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |key_id: ApiKeyId| {
            key_id
                .env_vars()
                .iter()
                .filter_map(|var| lookup(var))
                .map(|val| val.trim().to_string())
                .find(|val| !val.is_empty())
        };

        let missing: Vec<&str> = ApiKeyId::iter()
            .filter(|key_id| resolve(*key_id).is_none())
            .map(|key_id| key_id.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(format!("{} not configured", missing.join(", ")));
        }

        let get = |key_id: ApiKeyId| resolve(key_id).unwrap_or_default();
        Ok(Self::new(
            get(ApiKeyId::TwitterConsumerKey),
            get(ApiKeyId::TwitterConsumerSecret),
            get(ApiKeyId::TwitterAccessToken),
            get(ApiKeyId::TwitterAccessTokenSecret),
        ))
    }
}
