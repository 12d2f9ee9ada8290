use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::commands;
use crate::config::AppConfig;
use crate::settings::{JsonFileStore, OptionStore, SettingsController, PAGE};

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub location: Option<String>,
    pub body: String,
}

impl HttpResponse {
    fn html(body: String) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type: "text/html; charset=utf-8",
            location: None,
            body,
        }
    }

    fn text(status: u16, reason: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            reason,
            content_type: "text/plain; charset=utf-8",
            location: None,
            body: body.into(),
        }
    }

    fn see_other(location: String) -> Self {
        Self {
            status: 303,
            reason: "See Other",
            content_type: "text/plain; charset=utf-8",
            location: Some(location),
            body: String::new(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let location = self
            .location
            .as_ref()
            .map(|l| format!("Location: {}\r\n", l))
            .unwrap_or_default();
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n{}X-Content-Type-Options: nosniff\r\nX-Frame-Options: DENY\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.reason,
            self.content_type,
            self.body.len(),
            location,
            self.body
        )
        .into_bytes()
    }
}

/// Serve the admin endpoint, one connection at a time.
pub async fn serve(config: AppConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    log::info!("Admin endpoint listening on http://{}", listener.local_addr()?);
    log::info!("Options stored in {}", config.store_path.display());

    let store = JsonFileStore::new(&config.store_path);
    let mut controller = SettingsController::new(store, config.charset.clone());

    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("Failed to accept: {}", e);
                continue;
            }
        };

        if let Err(e) = handle_connection(&mut controller, &mut stream).await {
            log::warn!("Request from {} failed: {}", peer, e);
        }
    }
}

/// Read one request, answer it and leave the stream ready to be dropped.
pub async fn handle_connection<S, T>(
    controller: &mut SettingsController<S>,
    stream: &mut T,
) -> Result<(), String>
where
    S: OptionStore,
    T: AsyncRead + AsyncWrite + Unpin,
{
    handle_connection_within(controller, stream, READ_TIMEOUT).await
}

/// [`handle_connection`] with an explicit limit on how long the client may
/// take to deliver its request.
async fn handle_connection_within<S, T>(
    controller: &mut SettingsController<S>,
    stream: &mut T,
    read_timeout: Duration,
) -> Result<(), String>
where
    S: OptionStore,
    T: AsyncRead + AsyncWrite + Unpin,
{
    let response = match tokio::time::timeout(read_timeout, read_request(stream)).await {
        Ok(Ok(request)) => {
            log::debug!("{} {}", request.method, request.path);
            route(controller, &request).await
        }
        Ok(Err(e)) => HttpResponse::text(400, "Bad Request", e),
        Err(_) => {
            log::debug!("Client sent no complete request within {:?}", read_timeout);
            HttpResponse::text(408, "Request Timeout", "Request Timeout")
        }
    };

    stream
        .write_all(&response.to_bytes())
        .await
        .map_err(|e| format!("Failed to write: {}", e))?;
    stream
        .flush()
        .await
        .map_err(|e| format!("Failed to flush: {}", e))
}

async fn route<S: OptionStore>(
    controller: &mut SettingsController<S>,
    request: &HttpRequest,
) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") if request.query.get("page").map(String::as_str) == Some(PAGE) => {
            let send_test = request.query.contains_key("send_test");
            match commands::settings_page(controller, send_test).await {
                Ok(html) => HttpResponse::html(html),
                Err(e) => {
                    log::error!("Failed to render settings page: {}", e);
                    HttpResponse::text(500, "Internal Server Error", "Failed to render settings page")
                }
            }
        }
        ("POST", "/options.php") => {
            let form = parse_pairs(&request.body);
            match commands::save_settings(controller, &form) {
                Ok(target) => HttpResponse::see_other(format!("/{}", target)),
                Err(e) => {
                    log::error!("Failed to save settings: {}", e);
                    HttpResponse::text(500, "Internal Server Error", "Failed to save settings")
                }
            }
        }
        _ => HttpResponse::text(404, "Not Found", "Not Found"),
    }
}

async fn read_request<T: AsyncRead + Unpin>(stream: &mut T) -> Result<HttpRequest, String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return Err("Request too large".to_string());
        }
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| format!("Failed to read: {}", e))?;
        if n == 0 {
            return Err("Connection closed mid-request".to_string());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let first_line = lines.next().ok_or("Empty request")?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next().ok_or("No method in request")?.to_string();
    let target = parts.next().ok_or("No path in request")?;

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim().parse::<usize>())
        .transpose()
        .map_err(|_| "Invalid Content-Length".to_string())?
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        return Err("Request too large".to_string());
    }

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| format!("Failed to read: {}", e))?;
        if n == 0 {
            return Err("Connection closed mid-body".to_string());
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_pairs(query)),
        None => (target, Vec::new()),
    };

    Ok(HttpRequest {
        method,
        path: path.to_string(),
        query: query.into_iter().collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Split a query string or urlencoded form body into decoded pairs, in order.
/// A bare key such as `send_test` gets an empty value.
fn parse_pairs(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next().unwrap_or_default();
            let value = kv.next().unwrap_or_default();
            (urlencoding_decode(key), urlencoding_decode(value))
        })
        .collect()
}

fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                result.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        if bytes[i] == b'+' {
            result.push(b' ');
        } else {
            result.push(bytes[i]);
        }
        i += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
