use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Room permissions carried in the `video` claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(default)]
    pub room_join: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,
    #[serde(default)]
    pub can_publish: bool,
    #[serde(default)]
    pub can_subscribe: bool,
    #[serde(default)]
    pub can_update_own_metadata: bool,
}

impl VideoGrant {
    /// Grant used for debate participants: join, speak, listen, set own role
    pub fn participant(room: impl Into<String>) -> Self {
        Self {
            room_join: true,
            room: room.into(),
            can_publish: true,
            can_subscribe: true,
            can_update_own_metadata: true,
        }
    }
}

/// JWT claims understood by the media server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// API key that signed the token
    pub iss: String,
    /// Participant identity
    pub sub: String,
    pub jti: String,
    pub nbf: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default)]
    pub video: VideoGrant,
}

#[derive(Serialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

/// Builder for room-join access tokens (HS256 JWT)
pub struct AccessToken {
    api_key: String,
    api_secret: String,
    identity: String,
    name: Option<String>,
    metadata: Option<String>,
    ttl: Duration,
    grant: VideoGrant,
}

impl AccessToken {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            identity: identity.into(),
            name: None,
            metadata: None,
            ttl: DEFAULT_TOKEN_TTL,
            grant: VideoGrant::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn add_grant(mut self, grant: VideoGrant) -> Self {
        self.grant = grant;
        self
    }

    /// Sign the token
    pub fn to_jwt(&self) -> Result<String> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            bail!("API key and secret must be set");
        }
        if self.identity.is_empty() && self.grant.room_join {
            bail!("Identity is required for room join grants");
        }

        let now = Utc::now().timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .context("Token TTL out of range")?;

        let claims = Claims {
            iss: self.api_key.clone(),
            sub: self.identity.clone(),
            jti: self.identity.clone(),
            nbf: now,
            exp,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            video: self.grant.clone(),
        };

        let header = serde_json::to_vec(&Header {
            alg: "HS256",
            typ: "JWT",
        })?;
        let payload = serde_json::to_vec(&claims)?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = sign(&self.api_secret, signing_input.as_bytes())?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }
}

fn sign(secret: &str, input: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).context("Invalid signing secret")?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check signature and validity window, returning the claims
pub fn verify(token: &str, api_secret: &str) -> Result<Claims> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("Malformed token");
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .context("Malformed token signature")?;

    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).context("Invalid signing secret")?;
    mac.update(format!("{}.{}", header, payload).as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| anyhow::anyhow!("Token signature mismatch"))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .context("Malformed token payload")?;
    let claims: Claims = serde_json::from_slice(&payload).context("Invalid token claims")?;

    let now = Utc::now().timestamp();
    if claims.exp <= now {
        bail!("Token expired");
    }
    if claims.nbf > now {
        bail!("Token not yet valid");
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_carries_participant_grant() {
        let jwt = AccessToken::new("key", "secret", "u1")
            .add_grant(VideoGrant::participant("debate-42"))
            .to_jwt()
            .unwrap();

        let claims = verify(&jwt, "secret").unwrap();
        assert_eq!(claims.iss, "key");
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.jti, "u1");
        assert_eq!(claims.video, VideoGrant::participant("debate-42"));
        assert_eq!(claims.exp - claims.nbf, DEFAULT_TOKEN_TTL.as_secs() as i64);
    }

    #[test]
    fn test_grant_uses_camel_case() {
        let json = serde_json::to_string(&VideoGrant::participant("r")).unwrap();
        assert!(json.contains("\"roomJoin\":true"));
        assert!(json.contains("\"canUpdateOwnMetadata\":true"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let jwt = AccessToken::new("key", "secret", "u1").to_jwt().unwrap();
        assert!(verify(&jwt, "other").is_err());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let jwt = AccessToken::new("key", "secret", "u1")
            .add_grant(VideoGrant::participant("room"))
            .to_jwt()
            .unwrap();
        let parts: Vec<&str> = jwt.split('.').collect();

        let forged_claims = serde_json::json!({
            "iss": "key", "sub": "admin", "jti": "admin",
            "nbf": 0, "exp": i64::MAX,
            "video": { "roomJoin": true, "room": "room" }
        });
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(forged_claims.to_string()),
            parts[2]
        );

        assert!(verify(&forged, "secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = AccessToken::new("key", "secret", "u1")
            .with_ttl(Duration::ZERO)
            .to_jwt()
            .unwrap();
        assert!(verify(&jwt, "secret").is_err());
    }

    #[test]
    fn test_oversized_ttl_is_an_error() {
        let result = AccessToken::new("key", "secret", "u1")
            .with_ttl(Duration::from_secs(i64::MAX as u64))
            .to_jwt();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_credentials() {
        assert!(AccessToken::new("", "secret", "u1").to_jwt().is_err());
        assert!(AccessToken::new("key", "", "u1").to_jwt().is_err());
    }
}
