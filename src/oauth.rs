// Google OAuth for installed applications: reuse the stored token when it is
// still valid, refresh it when it has expired, otherwise run the loopback
// redirect flow with PKCE and store the result for the next run.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ui;

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.metadata.readonly",
    "https://www.googleapis.com/auth/drive.file",
];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_SKEW_SECS: i64 = 60;

const REDIRECT_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/plain; charset=utf-8\r\n\
    Connection: close\r\n\r\n\
    The authentication flow has completed. You may close this window.";

const NOT_FOUND_RESPONSE: &str = "HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.into()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

/// OAuth client registration, one section of `credentials.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    installed: Option<ClientConfig>,
    web: Option<ClientConfig>,
}

impl ClientConfig {
    /// Read the client registration downloaded from the Google Cloud console.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            Error::OAuth(format!(
                "cannot read client secrets {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&data)
    }

    fn parse(data: &str) -> Result<Self> {
        let secrets: ClientSecrets = serde_json::from_str(data)
            .map_err(|e| Error::OAuth(format!("invalid client secrets: {}", e)))?;
        secrets.installed.or(secrets.web).ok_or_else(|| {
            Error::OAuth("client secrets contain neither an `installed` nor a `web` section".into())
        })
    }
}

/// Refreshable credentials, stored in `token.json`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl AuthorizedUser {
    /// A token without an expiry never expires.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expiry)) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now,
        }
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(response.access_token);
        self.expiry = response.expires_in.map(|secs| now + Duration::seconds(secs));
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(String::from).collect();
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn load_token(path: &Path) -> Result<Option<AuthorizedUser>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|e| Error::OAuth(format!("invalid token file {}: {}", path.display(), e)))
}

fn save_token(path: &Path, user: &AuthorizedUser) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(user)?)?;
    tracing::debug!("Saved OAuth token to {}", path.display());
    Ok(())
}

fn post_token_request(http: &Client, token_uri: &str, params: &[(&str, &str)]) -> Result<TokenResponse> {
    let res = http.post(token_uri).form(params).send()?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().unwrap_or_default();
        return Err(Error::OAuth(format!(
            "token request failed: {} - {}",
            status, body
        )));
    }
    res.json()
        .map_err(|e| Error::OAuth(format!("cannot parse token response: {}", e)))
}

fn refresh(http: &Client, user: &mut AuthorizedUser) -> Result<()> {
    let refresh_token = user
        .refresh_token
        .clone()
        .ok_or_else(|| Error::OAuth("no refresh token available".into()))?;
    let response = post_token_request(
        http,
        &user.token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
        ],
    )?;
    user.apply(response, Utc::now());
    tracing::info!("Refreshed Google access token");
    Ok(())
}

/// PKCE verifier and its S256 challenge.
struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    fn generate() -> Self {
        Self::from_verifier(random_token())
    }

    fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Pkce {
            verifier,
            challenge,
        }
    }
}

fn random_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

fn authorization_url(
    config: &ClientConfig,
    redirect_uri: &str,
    challenge: &str,
    state: &str,
) -> Result<Url> {
    let scope = SCOPES.join(" ");
    Url::parse_with_params(
        &config.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| Error::OAuth(format!("invalid auth_uri {}: {}", config.auth_uri, e)))
}

#[derive(Debug, PartialEq, Eq)]
struct Redirect {
    code: String,
    state: Option<String>,
}

/// Parse the request line the browser sends to the loopback listener.
///
/// Returns `Ok(None)` for requests that are not the OAuth redirect.
fn parse_redirect(request_line: &str) -> Result<Option<Redirect>> {
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(None);
    };
    let url = match Url::parse(&format!("http://localhost{}", target)) {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(Error::OAuth(format!("authorization denied: {}", value)));
            }
            _ => {}
        }
    }
    Ok(code.map(|code| Redirect { code, state }))
}

/// Wait for the browser to hit the loopback redirect and answer it.
fn wait_for_redirect(listener: &TcpListener) -> Result<Redirect> {
    loop {
        let (mut stream, _) = listener.accept()?;
        let mut line = String::new();
        BufReader::new(&stream).read_line(&mut line)?;

        match parse_redirect(&line) {
            Ok(Some(redirect)) => {
                let _ = stream.write_all(REDIRECT_RESPONSE.as_bytes());
                return Ok(redirect);
            }
            Ok(None) => {
                let _ = stream.write_all(NOT_FOUND_RESPONSE.as_bytes());
            }
            Err(e) => {
                let _ = stream.write_all(REDIRECT_RESPONSE.as_bytes());
                return Err(e);
            }
        }
    }
}

/// Redirect target on the exact address the listener is bound to.
fn loopback_redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}/", port)
}

fn run_local_server_flow(http: &Client, config: &ClientConfig) -> Result<AuthorizedUser> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let redirect_uri = loopback_redirect_uri(listener.local_addr()?.port());
    let pkce = Pkce::generate();
    let state = random_token();

    let url = authorization_url(config, &redirect_uri, &pkce.challenge, &state)?;
    ui::print_authorization_prompt(url.as_str());

    let redirect = wait_for_redirect(&listener)?;
    if redirect.state.as_deref() != Some(state.as_str()) {
        return Err(Error::OAuth("state mismatch in authorization response".into()));
    }

    let response = post_token_request(
        http,
        &config.token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("code", redirect.code.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
        ],
    )?;

    let mut user = AuthorizedUser {
        token: None,
        refresh_token: None,
        token_uri: config.token_uri.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        expiry: None,
    };
    user.apply(response, Utc::now());
    tracing::info!("Google authorization completed");
    Ok(user)
}

/// Authorized Google session that keeps `token.json` current.
pub struct GoogleSession {
    http: Client,
    user: AuthorizedUser,
    token_path: PathBuf,
}

impl GoogleSession {
    /// Load, refresh or obtain credentials. Any failure here is a setup error.
    pub fn connect(http: Client, credentials_path: &Path, token_path: &Path) -> Result<Self> {
        let stored = load_token(token_path)?;
        let now = Utc::now();

        let user = match stored {
            Some(user) if user.is_valid(now) => {
                tracing::debug!("Using stored Google token from {}", token_path.display());
                user
            }
            Some(mut user) if user.can_refresh() => {
                refresh(&http, &mut user)?;
                save_token(token_path, &user)?;
                user
            }
            _ => {
                let config = ClientConfig::load(credentials_path)?;
                let user = run_local_server_flow(&http, &config)?;
                save_token(token_path, &user)?;
                user
            }
        };

        Ok(GoogleSession {
            http,
            user,
            token_path: token_path.to_path_buf(),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Current access token, refreshed first if it has expired.
    pub fn access_token(&mut self) -> Result<String> {
        if !self.user.is_valid(Utc::now()) {
            refresh(&self.http, &mut self.user)?;
            save_token(&self.token_path, &self.user)?;
        }
        self.user
            .token
            .clone()
            .ok_or_else(|| Error::OAuth("no access token".into()))
    }
}
