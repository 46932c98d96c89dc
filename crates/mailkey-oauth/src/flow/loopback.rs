//! Loopback redirect listener for the installed-application flow.
//!
//! The provider redirects the browser to `http://<host>:<port>/?code=..&state=..`.
//! This module accepts that one request on an OS-assigned port, answers the
//! browser with a short HTML page, and hands the code back.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Upper bound on the request head we are willing to buffer.
const MAX_HEAD_BYTES: usize = 8 * 1024;

/// Idle connections (browser preconnects) are dropped after this long.
const HEAD_READ_TIMEOUT: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><body>\
    <p>The authentication flow has completed. You may close this window.</p>\
    </body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html><html><body>\
    <p>The authentication flow did not complete. Return to the application for details.</p>\
    </body></html>";

const NOT_FOUND_PAGE: &str = "<!DOCTYPE html><html><body><p>Not found.</p></body></html>";

/// Transient HTTP listener receiving the authorization redirect.
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    redirect_uri: String,
}

impl LoopbackListener {
    /// Binds to `host` on an OS-assigned port.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn bind(host: &str) -> Result<Self> {
        let listener = TcpListener::bind((host, 0)).await?;
        let addr = listener.local_addr()?;
        let redirect_uri = format!("http://{addr}/");
        debug!(%redirect_uri, "Loopback listener bound");
        Ok(Self {
            listener,
            redirect_uri,
        })
    }

    /// Returns the redirect URI to register with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Waits for the redirect and returns the authorization code.
    ///
    /// Requests for other paths are answered with `404` and ignored. The
    /// listener is closed when this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting fails, the `state` does not match,
    /// the provider reported an error, or no code was sent.
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;

            let head = match read_request_head(&mut stream).await {
                Ok(head) => head,
                Err(e) => {
                    debug!(%peer, "Dropping loopback connection: {e}");
                    continue;
                }
            };

            match parse_request(&head) {
                Request::Other => {
                    let _ = respond(&mut stream, "404 Not Found", NOT_FOUND_PAGE).await;
                }
                Request::Callback(params) => {
                    let outcome = params.into_code(expected_state);
                    let (status, page) = if outcome.is_ok() {
                        ("200 OK", SUCCESS_PAGE)
                    } else {
                        ("400 Bad Request", FAILURE_PAGE)
                    };
                    if let Err(e) = respond(&mut stream, status, page).await {
                        debug!(%peer, "Could not answer browser: {e}");
                    }
                    return outcome;
                }
            }
        }
    }
}

/// Parsed first line of a request that reached the listener.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Request {
    Callback(CallbackParams),
    Other,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CallbackParams {
    pub(crate) code: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) error_description: Option<String>,
}

impl CallbackParams {
    fn into_code(self, expected_state: &str) -> Result<String> {
        if let Some(error) = self.error {
            return Err(if error == "access_denied" {
                Error::AccessDenied
            } else {
                let description = self.error_description.unwrap_or_default();
                Error::Callback(format!("{error} {description}").trim_end().to_string())
            });
        }

        if self.state.as_deref() != Some(expected_state) {
            return Err(Error::StateMismatch);
        }

        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::Callback("missing authorization code".into()))
    }
}

pub(crate) fn parse_request(head: &str) -> Request {
    let Some(line) = head.lines().next() else {
        return Request::Other;
    };
    let mut parts = line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return Request::Other;
    };
    if !target.starts_with('/') {
        return Request::Other;
    }
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return Request::Other;
    };
    if url.path() != "/" {
        return Request::Other;
    }

    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        let slot = match &*key {
            "code" => &mut params.code,
            "state" => &mut params.state,
            "error" => &mut params.error,
            "error_description" => &mut params.error_description,
            _ => continue,
        };
        *slot = Some(value.into_owned());
    }

    if params.code.is_none() && params.error.is_none() {
        return Request::Other;
    }
    Request::Callback(params)
}

async fn read_request_head(stream: &mut TcpStream) -> io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = tokio::time::timeout(HEAD_READ_TIMEOUT, stream.read(&mut chunk))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "request head timed out"))??;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_HEAD_BYTES {
            break;
        }
    }

    if buf.is_empty() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty request"));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
