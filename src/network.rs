//! Network URL constants for the quote backend.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://localhost:8080";

/// Default feed WebSocket URL.
pub const DEFAULT_WS_URL: &str = "wss://localhost:8080/ws/stock";

/// Path of the streaming quote feed, relative to the backend host.
pub const FEED_PATH: &str = "/ws/stock";

/// Fixed delay between a lost feed connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// Environment variable naming the backend host (`host[:port]`, no scheme).
pub const BACKEND_HOST_ENV: &str = "STOCK_BACKEND_URL";

/// Derive `(api_url, ws_url)` from a bare backend host.
///
/// An explicit `http://` / `https://` scheme is respected; the WS scheme
/// follows it (`ws://` for plain HTTP, `wss://` otherwise).
pub fn urls_for_host(host: &str) -> (String, String) {
    let host = host.trim().trim_end_matches('/');
    let (secure, bare) = if let Some(rest) = host.strip_prefix("http://") {
        (false, rest)
    } else if let Some(rest) = host.strip_prefix("https://") {
        (true, rest)
    } else {
        (true, host)
    };

    if secure {
        (format!("https://{}", bare), format!("wss://{}{}", bare, FEED_PATH))
    } else {
        (format!("http://{}", bare), format!("ws://{}{}", bare, FEED_PATH))
    }
}
