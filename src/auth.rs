//! Google OAuth credentials: loopback login, storage and refresh.
//!
//! Every caller goes through [`access_token`], which either hands back a
//! valid bearer token or fails with [`Error::ReauthRequired`].

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/calendar",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(true)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Write token file with secure permissions (owner read/write only)
fn write_token_file(path: &Path, token: &StoredToken) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(token)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

pub fn load_token(path: &Path) -> Result<Option<StoredToken>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// A valid access token, refreshed if needed.
pub async fn access_token(config: &Config) -> Result<String> {
    let token_path = Config::token_path()?;

    let stored = match load_token(&token_path) {
        Ok(Some(stored)) => stored,
        Ok(None) => return Err(Error::ReauthRequired),
        Err(e) => {
            warn!(error = %e, "stored token unreadable");
            return Err(Error::ReauthRequired);
        }
    };

    if !stored.is_expired(Utc::now()) {
        return Ok(stored.access_token);
    }

    let Some(refresh_token) = stored.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
        return Err(Error::ReauthRequired);
    };

    match refresh(config, refresh_token).await {
        Ok(token) => {
            write_token_file(&token_path, &token)?;
            Ok(token.access_token)
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed");
            Err(Error::ReauthRequired)
        }
    }
}

async fn refresh(config: &Config, refresh_token: &str) -> Result<StoredToken> {
    let params = [
        ("client_id", config.gmail.client_id.as_str()),
        ("client_secret", config.gmail.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let response = Client::new().post(GOOGLE_TOKEN_URL).form(&params).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Status { status, body });
    }

    let token_response: TokenResponse = response.json().await?;
    Ok(StoredToken {
        access_token: token_response.access_token,
        // Google omits the refresh token on refresh; keep the old one.
        refresh_token: token_response
            .refresh_token
            .or_else(|| Some(refresh_token.to_string())),
        expires_at: expiry(token_response.expires_in),
    })
}

fn expiry(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in.map(|secs| Utc::now() + chrono::Duration::seconds(secs))
}

/// True when a stored token is valid or can be refreshed.
pub fn is_logged_in() -> bool {
    let Ok(path) = Config::token_path() else {
        return false;
    };
    match load_token(&path) {
        Ok(Some(token)) => !token.is_expired(Utc::now()) || token.can_refresh(),
        _ => false,
    }
}

/// Forget the stored credentials.
pub fn logout() -> Result<bool> {
    let path = Config::token_path()?;
    if path.exists() {
        fs::remove_file(&path)?;
        return Ok(true);
    }
    Ok(false)
}

/// Run the browser consent flow and store the resulting token.
pub async fn login(config: &Config) -> Result<()> {
    if config.gmail.client_id.is_empty() || config.gmail.client_secret.is_empty() {
        return Err(Error::Config("gmail.client_id and gmail.client_secret must be set".to_string()));
    }

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://localhost:{}", port);

    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&include_granted_scopes=true",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&config.gmail.client_id),
        urlencoding::encode(&redirect_uri),
        urlencoding::encode(&SCOPES.join(" "))
    );

    println!("\nOpening browser for Google authorization...");
    println!("If it doesn't open, visit: {}\n", auth_url);
    let _ = open::that(&auth_url);

    let (stream, _) = listener.accept()?;
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let code = extract_code(&request_line)
        .ok_or_else(|| Error::InvalidInput("authorization code missing from callback".to_string()))?;

    let response_html = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization successful!</h1>\
        <p>You can close this tab and return to the terminal.</p></body></html>";
    let mut stream = stream;
    stream.write_all(response_html.as_bytes())?;

    let params = [
        ("client_id", config.gmail.client_id.as_str()),
        ("client_secret", config.gmail.client_secret.as_str()),
        ("code", code.as_str()),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let response = Client::new().post(GOOGLE_TOKEN_URL).form(&params).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Status { status, body });
    }

    let token_response: TokenResponse = response.json().await?;
    let stored = StoredToken {
        access_token: token_response.access_token,
        refresh_token: token_response.refresh_token,
        expires_at: expiry(token_response.expires_in),
    };
    write_token_file(&Config::token_path()?, &stored)?;

    info!("stored new Google credentials");
    Ok(())
}

/// Pull the decoded `code` parameter out of an HTTP request line.
fn extract_code(request_line: &str) -> Option<String> {
    let raw = request_line
        .split_whitespace()
        .nth(1)?
        .split('?')
        .nth(1)?
        .split('&')
        .find_map(|p| p.strip_prefix("code="))?;
    urlencoding::decode(raw).ok().map(|c| c.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_decodes_code() {
        let line = "GET /?state=x&code=4%2F0Abc&scope=email HTTP/1.1\r\n";
        assert_eq!(extract_code(line).as_deref(), Some("4/0Abc"));
        assert_eq!(extract_code("GET /favicon.ico HTTP/1.1"), None);
    }

    #[test]
    fn token_expiry_and_refreshability() {
        let now = Utc::now();
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(now + chrono::Duration::minutes(5)),
        };
        assert!(!token.is_expired(now));
        assert!(!token.can_refresh());

        let expired = StoredToken {
            expires_at: None,
            refresh_token: Some("r".to_string()),
            ..token
        };
        assert!(expired.is_expired(now));
        assert!(expired.can_refresh());
    }

    #[test]
    fn token_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        assert!(load_token(&path).unwrap().is_none());

        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: None,
        };
        write_token_file(&path, &token).unwrap();
        let loaded = load_token(&path).unwrap().unwrap();
        assert_eq!(loaded.refresh_token.as_deref(), Some("r"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
