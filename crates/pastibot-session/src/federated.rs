//! Federated sign-in over a browser redirect.
//!
//! The backend owns the provider handshake: the client opens the backend's
//! provider entry URL in a browser, the backend completes the exchange and
//! redirects back to a local return URL carrying a session token (or an
//! error). A small one-shot HTTP listener receives that redirect; the
//! token is then handed to `SessionManager::resume_federated`.

use crate::{SessionError, SessionResult};
use pastibot_api::Role;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};
use url::Url;
use uuid::Uuid;

/// Default local port for the redirect return listener.
pub const DEFAULT_REDIRECT_PORT: u16 = 4173;

/// Default time to wait for the browser round-trip, in seconds.
pub const DEFAULT_REDIRECT_TIMEOUT_SECS: u64 = 120;

/// Identity providers the backend can broker a sign-in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedProvider {
    Google,
}

impl FederatedProvider {
    /// Path segment of the backend's entry endpoint for this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            FederatedProvider::Google => "google",
        }
    }
}

impl FromStr for FederatedProvider {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(FederatedProvider::Google),
            other => Err(SessionError::Federated(format!(
                "unsupported identity provider: {}",
                other
            ))),
        }
    }
}

/// Everything needed to hand a federated sign-in to the browser.
#[derive(Debug, Clone)]
pub struct FederatedHandoff {
    /// Backend entry URL to open in the browser.
    pub auth_url: Url,
    /// Nonce echoed back on the redirect; detects mixed-up callbacks.
    pub state: String,
}

impl FederatedHandoff {
    /// Build the browser hand-off for a provider sign-in.
    ///
    /// The entry URL carries the chosen role (when one was picked before
    /// the redirect), the local return URL and a fresh state nonce.
    pub fn new(
        api_base_url: &str,
        provider: FederatedProvider,
        role: Role,
        return_url: &str,
    ) -> SessionResult<Self> {
        let state = Uuid::new_v4().to_string();
        let mut auth_url = Url::parse(&format!("{}/auth/{}", api_base_url, provider.as_str()))
            .map_err(|e| SessionError::Federated(format!("invalid provider URL: {}", e)))?;

        {
            let mut query = auth_url.query_pairs_mut();
            if let Some(wire) = role.as_wire() {
                query.append_pair("role", wire);
            }
            query.append_pair("redirect", return_url);
            query.append_pair("state", &state);
        }

        Ok(Self { auth_url, state })
    }
}

/// Outcome of the browser redirect.
#[derive(Debug, Clone)]
pub struct RedirectOutcome {
    /// Whether the redirect carried a session token.
    pub success: bool,
    /// Session token (if successful).
    pub token: Option<String>,
    /// Error message (if failed).
    pub error: Option<String>,
}

impl RedirectOutcome {
    fn success(token: String) -> Self {
        Self {
            success: true,
            token: Some(token),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            success: false,
            token: None,
            error: Some(error),
        }
    }

    /// Unwrap the session token, turning a failed redirect into an error.
    pub fn into_token(self) -> SessionResult<String> {
        match self.token {
            Some(token) if self.success => Ok(token),
            _ => Err(SessionError::Federated(
                self.error
                    .unwrap_or_else(|| "redirect carried no session token".to_string()),
            )),
        }
    }
}

/// One-shot local HTTP listener for the redirect return.
pub struct RedirectListener {
    port: u16,
    timeout_secs: u64,
}

impl RedirectListener {
    /// Create a listener on a specific port with a custom timeout.
    pub fn new(port: u16, timeout_secs: u64) -> Self {
        Self { port, timeout_secs }
    }

    /// Create with default settings.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_REDIRECT_PORT, DEFAULT_REDIRECT_TIMEOUT_SECS)
    }

    /// The local URL the backend should redirect back to.
    pub fn return_url(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    /// Start the listener and wait for the redirect.
    ///
    /// Binds a local HTTP server, waits for a `GET /callback` carrying the
    /// token or an error, replies with a small closing page, and shuts the
    /// server down. When `expected_state` is given and the redirect carries
    /// a `state` parameter, a mismatch is treated as a failed sign-in.
    ///
    /// The caller is responsible for opening the browser at the entry URL.
    pub async fn wait_for_redirect(
        &self,
        expected_state: Option<&str>,
    ) -> SessionResult<RedirectOutcome> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| SessionError::Federated(format!("failed to bind to {}: {}", addr, e)))?;

        info!(port = self.port, "Redirect listener waiting for sign-in");

        let (tx, rx) = oneshot::channel::<RedirectOutcome>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));
        let expected_state = expected_state.map(String::from);

        let server_handle = tokio::spawn({
            let tx = tx.clone();
            async move {
                loop {
                    match listener.accept().await {
                        Ok((mut socket, _)) => {
                            let tx = tx.clone();
                            let expected_state = expected_state.clone();
                            tokio::spawn(async move {
                                if let Err(e) =
                                    handle_connection(&mut socket, tx, expected_state.as_deref())
                                        .await
                                {
                                    error!("Error handling redirect connection: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let timeout = tokio::time::Duration::from_secs(self.timeout_secs);
        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(SessionError::Federated(
                "internal error: redirect channel closed".to_string(),
            )),
            Err(_) => Err(SessionError::RedirectTimeout),
        };

        server_handle.abort();

        result
    }
}

/// Handle an incoming HTTP connection on the return listener.
async fn handle_connection(
    socket: &mut tokio::net::TcpStream,
    tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<RedirectOutcome>>>>,
    expected_state: Option<&str>,
) -> SessionResult<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    debug!(request = %request_line.trim(), "Received redirect request");

    // Parse the request line: GET /callback?... HTTP/1.1
    if !request_line.starts_with("GET ") {
        send_response(&mut writer, 405, "Method Not Allowed", "Method Not Allowed").await?;
        return Ok(());
    }

    let path_end = request_line.find(" HTTP/").unwrap_or(request_line.len());
    let path = &request_line[4..path_end];

    if !path.starts_with("/callback") {
        // Browsers probe for favicons; answer quietly without resolving
        send_response(&mut writer, 404, "Not Found", "Not Found").await?;
        return Ok(());
    }

    let query = match path.find('?') {
        Some(idx) => &path[idx + 1..],
        None => "",
    };

    let params: std::collections::HashMap<String, String> = query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?.to_string();
            let value = parts.next().unwrap_or("").to_string();
            Some((key, percent_decode(&value)))
        })
        .collect();

    let token = params.get("token").cloned().filter(|t| !t.is_empty());
    let state = params.get("state").cloned();
    let error = params.get("error").cloned();

    let state_mismatch = match (expected_state, state.as_deref()) {
        (Some(expected), Some(got)) => expected != got,
        _ => false,
    };

    let outcome = if let Some(err) = error {
        send_response(&mut writer, 200, "OK", &error_page(&err)).await?;
        RedirectOutcome::failure(err)
    } else if state_mismatch {
        send_response(&mut writer, 200, "OK", &error_page("Sign-in state mismatch")).await?;
        RedirectOutcome::failure("redirect state mismatch".to_string())
    } else if let Some(token) = token {
        send_response(&mut writer, 200, "OK", &success_page()).await?;
        RedirectOutcome::success(token)
    } else {
        send_response(&mut writer, 200, "OK", &error_page("Missing session token")).await?;
        RedirectOutcome::failure("redirect carried no session token".to_string())
    };

    if let Some(tx) = tx.lock().await.take() {
        let _ = tx.send(outcome);
    }

    Ok(())
}

/// Send an HTTP response.
async fn send_response(
    writer: &mut tokio::net::tcp::WriteHalf<'_>,
    status_code: u16,
    status_text: &str,
    body: &str,
) -> SessionResult<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_code,
        status_text,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Generate success page HTML.
fn success_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Pastibot - Sign-in Successful</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px; background: #f5f5f5;">
<div style="max-width: 400px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
<h1 style="color: #22c55e; margin-bottom: 20px;">Signed in!</h1>
<p style="color: #666;">You can close this window and return to the terminal.</p>
</div>
<script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#
        .to_string()
}

/// Generate error page HTML.
fn error_page(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Pastibot - Sign-in Failed</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px; background: #f5f5f5;">
<div style="max-width: 400px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
<h1 style="color: #ef4444; margin-bottom: 20px;">Sign-in Failed</h1>
<p style="color: #666;">Error: {}</p>
<p style="color: #888; font-size: 14px;">You can close this window and try again.</p>
</div>
</body>
</html>"#,
        error
    )
}

/// Simple percent decoding for query parameter values.
fn percent_decode(s: &str) -> String {
    let mut result = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                result.push(byte);
            }
        } else if c == '+' {
            result.push(b' ');
        } else {
            let mut buf = [0u8; 4];
            result.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }

    String::from_utf8_lossy(&result).to_string()
}
