//! Image proxy for profile pictures.
//!
//! Provider CDNs do not always serve pictures to third-party pages, so the
//! dashboard loads them through the service. Only raster images up to
//! [`MAX_IMAGE_BYTES`] are relayed. Anything else never surfaces as an
//! error: the browser gets a transparent pixel instead.

use crate::app::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// A 1x1 transparent PNG.
pub const TRANSPARENT_PIXEL: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xdb, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae,
    0x42, 0x60, 0x82,
];

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    url: Option<String>,
}

/// `GET /image-proxy/{*url}`: the image URL is the rest of the path.
pub async fn image_proxy(State(state): State<AppState>, Path(url): Path<String>) -> Response {
    proxy_image(&state.proxy_client, &url).await
}

/// `GET /proxy?url=...`
pub async fn proxy_query(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Response {
    match params.url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => proxy_image(&state.proxy_client, url).await,
        None => (StatusCode::BAD_REQUEST, "Missing URL parameter").into_response(),
    }
}

async fn proxy_image(client: &reqwest::Client, url: &str) -> Response {
    if url.starts_with("data:") {
        return (StatusCode::BAD_REQUEST, "Data URIs don't need proxying").into_response();
    }

    let url = normalize_url(url);
    match fetch_image(client, &url).await {
        Ok((content_type, body)) => (
            [
                (CONTENT_TYPE, content_type),
                (CACHE_CONTROL, "public, max-age=3600".to_string()),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            log::warn!("Image proxy could not fetch {url}: {e}");
            ([(CONTENT_TYPE, "image/png")], TRANSPARENT_PIXEL).into_response()
        }
    }
}

/// Prefixes `https://` when the URL carries no http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url.trim_start_matches('/'))
    }
}

/// Largest upstream body the proxy relays.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("upstream content type {0:?} is not a raster image")]
    NotAnImage(Option<String>),
    #[error("upstream body exceeds {MAX_IMAGE_BYTES} bytes")]
    TooLarge,
}

/// Raster `image/*` types only. SVG can carry script and is refused.
fn is_proxyable_image(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("image/") && !mime.starts_with("image/svg")
}

async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<(String, Bytes), FetchError> {
    let mut response = client
        .get(url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let content_type = match content_type {
        Some(content_type) if is_proxyable_image(&content_type) => content_type,
        other => return Err(FetchError::NotAnImage(other)),
    };

    if response
        .content_length()
        .is_some_and(|len| len > MAX_IMAGE_BYTES as u64)
    {
        return Err(FetchError::TooLarge);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(FetchError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok((content_type, Bytes::from(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_less_urls_get_https() {
        assert_eq!(
            normalize_url("media.licdn.com/dms/image/abc"),
            "https://media.licdn.com/dms/image/abc"
        );
        assert_eq!(
            normalize_url("http://localhost:9000/a.png"),
            "http://localhost:9000/a.png"
        );
        assert_eq!(
            normalize_url("https://lh3.googleusercontent.com/a/x"),
            "https://lh3.googleusercontent.com/a/x"
        );
    }

    #[test]
    fn only_raster_images_are_relayed() {
        assert!(is_proxyable_image("image/jpeg"));
        assert!(is_proxyable_image("Image/PNG; charset=binary"));
        assert!(!is_proxyable_image("image/svg+xml"));
        assert!(!is_proxyable_image("application/json"));
        assert!(!is_proxyable_image("text/plain; charset=utf-8"));
        assert!(!is_proxyable_image(""));
    }

    #[test]
    fn pixel_is_a_png() {
        assert!(TRANSPARENT_PIXEL.starts_with(b"\x89PNG\r\n\x1a\n"));
        assert!(TRANSPARENT_PIXEL.ends_with(b"IEND\xaeB`\x82"));
    }
}
