//! Access tokens for the Firestore REST API.
//!
//! Production credentials use the OAuth2 JWT-bearer grant: a short-lived
//! RS256 assertion signed with the service-account key is exchanged for an
//! access token. The emulator accepts the fixed token `owner`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::ServiceAccount;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;
const EMULATOR_TOKEN: &str = "owner";

/// JWT claims for the token exchange.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn for_account(account: &ServiceAccount, now: DateTime<Utc>) -> Self {
        Self {
            iss: account.client_email.clone(),
            sub: account.client_email.clone(),
            aud: account.token_uri.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// A cached access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Where bearer tokens come from.
pub enum TokenSource {
    /// Exchange a signed assertion for a cached access token
    ServiceAccount {
        account: ServiceAccount,
        client: reqwest::Client,
        cached: Mutex<Option<AccessToken>>,
    },
    /// Local emulator, no exchange
    Emulator,
}

impl TokenSource {
    pub fn service_account(account: ServiceAccount, client: reqwest::Client) -> Self {
        Self::ServiceAccount {
            account,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, exchanging a new one when the cached token is near expiry.
    pub async fn bearer(&self) -> Result<String> {
        match self {
            TokenSource::Emulator => Ok(EMULATOR_TOKEN.to_string()),
            TokenSource::ServiceAccount {
                account,
                client,
                cached,
            } => {
                let mut cached = cached.lock().await;
                let now = Utc::now();
                if let Some(token) = (*cached).as_ref().filter(|t| t.is_fresh(now)) {
                    return Ok(token.value.clone());
                }

                log::debug!("Requesting access token for {}", account.client_email);
                let token = exchange(client, account, now).await?;
                let value = token.value.clone();
                *cached = Some(token);
                Ok(value)
            }
        }
    }
}

/// Sign the JWT-bearer assertion.
fn assertion(account: &ServiceAccount, now: DateTime<Utc>) -> Result<String> {
    let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
        .map_err(|e| AppError::auth(format!("invalid service account private key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = account.private_key_id.clone();

    Ok(encode(&header, &Claims::for_account(account, now), &key)?)
}

async fn exchange(
    client: &reqwest::Client,
    account: &ServiceAccount,
    now: DateTime<Utc>,
) -> Result<AccessToken> {
    let jwt = assertion(account, now)?;
    let response = client
        .post(&account.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", jwt.as_str())])
        .send()
        .await
        .map_err(|e| AppError::auth(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::auth(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::auth(format!("unreadable token response: {e}")))?;

    Ok(AccessToken {
        value: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn account() -> ServiceAccount {
        ServiceAccount::from_json(
            r#"{
                "project_id": "atlas-jobs",
                "client_email": "scraper@atlas-jobs.iam.gserviceaccount.com",
                "private_key": "not a pem"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_claims_for_account() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let claims = Claims::for_account(&account(), now);

        assert_eq!(claims.iss, "scraper@atlas-jobs.iam.gserviceaccount.com");
        assert_eq!(claims.sub, claims.iss);
        assert_eq!(claims.aud, "https://oauth2.googleapis.com/token");
        assert_eq!(claims.scope, DATASTORE_SCOPE);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_invalid_key_is_auth_error() {
        let err = assertion(&account(), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(120),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(61)));
    }

    #[tokio::test]
    async fn test_emulator_token() {
        assert_eq!(TokenSource::Emulator.bearer().await.unwrap(), "owner");
    }
}
