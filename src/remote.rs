//! HTTP remote shift store.
//!
//! Each day lives under `{base_url}/daily-shifts/{day_id}`. `GET` returns the
//! shift as JSON (404 when absent) and `PUT` overwrites it with the full
//! shift body.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{DailyShift, DayId};
use crate::store::ShiftStore;

/// Default timeout for remote requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "X-Register-API-Key";

/// Normalise the remote base URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

pub struct HttpShiftStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpShiftStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn shift_url(&self, day: DayId) -> String {
        format!("{}/daily-shifts/{day}", self.base_url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header(API_KEY_HEADER, key.trim()),
            None => req,
        }
    }
}

async fn status_error(resp: reqwest::Response) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StoreError::Status {
        status,
        body: body.trim().to_string(),
    }
}

#[async_trait]
impl ShiftStore for HttpShiftStore {
    async fn get(&self, day: DayId) -> Result<Option<DailyShift>, StoreError> {
        let url = self.shift_url(day);
        let resp = self.authorize(self.client.get(&url)).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(day_id = day, "Remote shift absent");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        let body = resp.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn save(&self, shift: &DailyShift) -> Result<(), StoreError> {
        let url = self.shift_url(shift.id);
        let resp = self
            .authorize(self.client.put(&url))
            .json(shift)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        debug!(day_id = shift.id, bills = shift.bill_count(), "Remote shift written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut read = Vec::new();
            while !read.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                read.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    /// Serve an in-memory shift table: `PUT` stores the body under the path,
    /// `GET` returns it or 404. Each connection carries one request.
    async fn serve_table() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut table: std::collections::HashMap<String, String> = Default::default();
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = vec![0u8; 4096];
                let mut read = Vec::new();
                let header_end = loop {
                    if let Some(pos) = read.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break read.len();
                    }
                    read.extend_from_slice(&buf[..n]);
                };
                let head = String::from_utf8_lossy(&read[..header_end]).to_string();
                let content_length = head
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while read.len() < header_end + content_length {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    read.extend_from_slice(&buf[..n]);
                }
                let body = String::from_utf8_lossy(&read[header_end..]).to_string();
                let mut request_line = head.lines().next().unwrap_or_default().split(' ');
                let method = request_line.next().unwrap_or_default().to_string();
                let path = request_line.next().unwrap_or_default().to_string();

                let (status, reply) = match method.as_str() {
                    "PUT" => {
                        table.insert(path, body);
                        ("200 OK", String::new())
                    }
                    _ => match table.get(&path) {
                        Some(stored) => ("200 OK", stored.clone()),
                        None => ("404 Not Found", String::new()),
                    },
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
                    reply.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });
        format!("http://{addr}")
    }

    fn two_bill_shift(day: DayId) -> DailyShift {
        use crate::model::{Bill, Item};
        let mut shift = DailyShift::new(day);
        for (id, price) in [("bill-a", 1200.0), ("bill-b", 800.0)] {
            let mut bill = Bill::with_id(id, day * 1_000_000_000);
            bill.add_item(Item::priced(price));
            shift.add_bill(bill);
        }
        shift
    }

    #[test]
    fn normalize_adds_scheme_and_strips_slashes() {
        assert_eq!(normalize_base_url("localhost:8080/"), "http://localhost:8080");
        assert_eq!(normalize_base_url("shifts.example.com//"), "https://shifts.example.com");
        assert_eq!(normalize_base_url(" https://x.io/api "), "https://x.io/api");
    }

    #[test]
    fn shift_url_uses_day_id_key() {
        let store = HttpShiftStore::new("https://x.io/", None).unwrap();
        assert_eq!(store.shift_url(1_704_067_200), "https://x.io/daily-shifts/1704067200");
    }

    #[tokio::test]
    async fn get_parses_present_shift() {
        let base = serve_once(
            "200 OK",
            r#"{"id":1704067200,"bills":[{"id":"b1","created_at":1,"items":[],"total":100.0}],"total":100.0}"#,
        )
        .await;
        let store = HttpShiftStore::new(&base, Some("key".into())).unwrap();

        let shift = store.get(1_704_067_200).await.unwrap().expect("shift");
        assert_eq!(shift.last_bill_id(), Some("b1"));
        assert_eq!(shift.total(), 100.0);
    }

    #[tokio::test]
    async fn get_maps_404_to_absent() {
        let base = serve_once("404 Not Found", "").await;
        let store = HttpShiftStore::new(&base, None).unwrap();

        assert!(store.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_surfaces_server_errors() {
        let base = serve_once("503 Service Unavailable", "down").await;
        let store = HttpShiftStore::new(&base, None).unwrap();

        match store.get(1).await {
            Err(StoreError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "down");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_surfaces_server_errors() {
        let base = serve_once("500 Internal Server Error", "boom").await;
        let store = HttpShiftStore::new(&base, None).unwrap();

        match store.save(&two_bill_shift(1_704_067_200)).await {
            Err(StoreError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn saved_shift_reads_back_with_same_bills() {
        let base = serve_table().await;
        let store = HttpShiftStore::new(&base, Some("key".into())).unwrap();
        let day = 1_704_067_200;
        let local = two_bill_shift(day);

        assert!(store.get(day).await.unwrap().is_none());
        store.save(&local).await.unwrap();
        let remote = store.get(day).await.unwrap().expect("stored shift");

        assert_eq!(remote.bill_count(), 2);
        assert_eq!(remote.last_bill_id(), Some("bill-b"));
        assert_eq!(remote.total(), 2000.0);
        assert!(local.matches_remote(&remote));
    }
}
