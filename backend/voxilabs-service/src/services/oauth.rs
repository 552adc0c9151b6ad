/// Google OAuth 2.0 authorization-code client
use crate::config::OAuthSettings;
use crate::error::{AppError, Result};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const SCOPES: &str = "openid profile email";

/// Subset of the userinfo response the service uses
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: HttpClient,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuthClient {
    /// `None` unless client id, secret and redirect URI are all configured.
    pub fn from_settings(settings: &OAuthSettings) -> Option<Self> {
        let (Some(client_id), Some(client_secret), Some(redirect_uri)) = (
            settings.google_client_id.clone(),
            settings.google_client_secret.clone(),
            settings.google_redirect_uri.clone(),
        ) else {
            warn!("Google OAuth not configured; /api/auth/google is disabled");
            return None;
        };

        let http = match HttpClient::builder().timeout(Duration::from_secs(15)).build() {
            Ok(http) => http,
            Err(e) => {
                warn!(error = %e, "Failed to build OAuth HTTP client");
                return None;
            }
        };

        Some(Self {
            http,
            client_id,
            client_secret,
            redirect_uri,
            auth_url: settings.google_auth_url.clone(),
            token_url: settings.google_token_url.clone(),
            userinfo_url: settings.google_userinfo_url.clone(),
        })
    }

    /// Consent screen URL. Requests offline access and always prompts.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
        )
    }

    /// Trade an authorization code for the user's Google profile.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleProfile> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::OAuth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("malformed token response: {e}")))?;
        debug!("Exchanged Google authorization code");

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::OAuth(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<GoogleProfile>()
            .await
            .map_err(|e| AppError::OAuth(format!("malformed userinfo response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base: &str) -> OAuthSettings {
        OAuthSettings {
            google_client_id: Some("client-123".into()),
            google_client_secret: Some("shh".into()),
            google_redirect_uri: Some("http://localhost:5000/api/auth/google/callback".into()),
            google_auth_url: format!("{base}/auth"),
            google_token_url: format!("{base}/token"),
            google_userinfo_url: format!("{base}/userinfo"),
        }
    }

    #[test]
    fn test_disabled_without_credentials() {
        let mut s = settings("http://unused");
        s.google_client_secret = None;
        assert!(GoogleOAuthClient::from_settings(&s).is_none());
    }

    #[test]
    fn test_authorization_url_parameters() {
        let client = GoogleOAuthClient::from_settings(&settings("https://accounts.test")).unwrap();
        let url = client.authorization_url();

        assert!(url.starts_with("https://accounts.test/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fapi%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20profile%20email"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn test_exchange_code_fetches_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "at-1", "token_type": "Bearer"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "grace@example.com",
                "verified_email": true,
                "given_name": "Grace",
                "family_name": "Hopper"
            })))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::from_settings(&settings(&server.uri())).unwrap();
        let profile = client.exchange_code("auth-code").await.unwrap();

        assert_eq!(profile.email, "grace@example.com");
        assert!(profile.verified_email);
        assert_eq!(profile.given_name.as_deref(), Some("Grace"));
        assert!(profile.picture.is_none());
    }

    #[tokio::test]
    async fn test_rejected_code_is_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::from_settings(&settings(&server.uri())).unwrap();
        let err = client.exchange_code("stale").await.unwrap_err();
        assert!(matches!(err, AppError::OAuth(_)));
    }
}
