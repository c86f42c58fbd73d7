use std::future::Future;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::config::Config;

/// Capability to look up the owner of a single pixel.
///
/// The scan loop is generic over this trait so tests can drive it without a
/// network. Lookups are best-effort: transport failures, non-success
/// responses, and undecodable bodies all collapse to `None`, the same as a
/// pixel nobody has painted.
pub trait PixelClient: Send + Sync {
    fn pixel_owner(
        &self,
        qx: i32,
        qy: i32,
        x: u32,
        y: u32,
    ) -> impl Future<Output = Option<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct PixelInfo {
    #[serde(rename = "paintedBy")]
    painted_by: Option<PaintedBy>,
}

#[derive(Debug, Deserialize)]
struct PaintedBy {
    name: Option<String>,
}

impl PixelInfo {
    fn owner(self) -> Option<String> {
        self.painted_by.and_then(|p| p.name)
    }
}

/// Queries the remote ownership endpoint at
/// `{base}/pixel/{qx}/{qy}?x={x}&y={y}`.
pub struct HttpPixelClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPixelClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();

        if let Some(cookie) = &config.session_cookie {
            // Ambient session credentials, attached to every query.
            if let Ok(mut value) = HeaderValue::from_str(cookie) {
                value.set_sensitive(true);
                let mut headers = HeaderMap::new();
                headers.insert(header::COOKIE, value);
                builder = builder.default_headers(headers);
            } else {
                tracing::warn!("PIXSEEK_SESSION_COOKIE is not a valid header value, ignoring");
            }
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }

    fn pixel_endpoint(&self, qx: i32, qy: i32) -> String {
        format!("{}/pixel/{qx}/{qy}", self.base_url)
    }
}

impl PixelClient for HttpPixelClient {
    async fn pixel_owner(&self, qx: i32, qy: i32, x: u32, y: u32) -> Option<String> {
        let url = self.pixel_endpoint(qx, qy);

        let response = match self.http.get(&url).query(&[("x", x), ("y", y)]).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("pixel query ({qx},{qy}) ({x},{y}) failed: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                "pixel query ({qx},{qy}) ({x},{y}) returned {}",
                response.status()
            );
            return None;
        }

        match response.json::<PixelInfo>().await {
            Ok(info) => info.owner(),
            Err(e) => {
                tracing::debug!("pixel query ({qx},{qy}) ({x},{y}) undecodable: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_from_full_response() {
        let info: PixelInfo =
            serde_json::from_str(r#"{"paintedBy":{"id":42,"name":"alice"}}"#).unwrap();
        assert_eq!(info.owner().as_deref(), Some("alice"));
    }

    #[test]
    fn test_owner_absent_when_unpainted() {
        let info: PixelInfo = serde_json::from_str(r#"{"paintedBy":null}"#).unwrap();
        assert_eq!(info.owner(), None);

        let info: PixelInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info.owner(), None);
    }

    #[test]
    fn test_owner_absent_when_name_missing() {
        let info: PixelInfo = serde_json::from_str(r#"{"paintedBy":{"id":42}}"#).unwrap();
        assert_eq!(info.owner(), None);
    }

    #[test]
    fn test_unrelated_fields_ignored() {
        let info: PixelInfo =
            serde_json::from_str(r#"{"region":{"id":7},"paintedBy":{"name":"bob"}}"#).unwrap();
        assert_eq!(info.owner().as_deref(), Some("bob"));
    }

    #[test]
    fn test_pixel_endpoint_shape() {
        let client = HttpPixelClient {
            http: reqwest::Client::new(),
            base_url: "https://backend.wplace.live/s0".into(),
        };
        assert_eq!(
            client.pixel_endpoint(-3, 17),
            "https://backend.wplace.live/s0/pixel/-3/17"
        );
    }
}
