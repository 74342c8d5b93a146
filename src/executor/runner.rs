use std::time::Instant;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, COOKIE},
    Client, Method,
};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::resolve::ResolvedRequest;

use super::models::HttpResponse;

/// Sends exactly one request described by `request`, bounded by its timeout.
pub async fn execute(request: &ResolvedRequest) -> Result<HttpResponse> {
    let method = Method::from_bytes(request.method.as_bytes())
        .map_err(|_| Error::validation(format!("invalid HTTP method '{}'", request.method)))?;
    let url = Url::parse(&request.url)
        .map_err(|err| Error::validation(format!("invalid URL '{}': {err}", request.url)))?;
    let headers = build_headers(request)?;

    let client = Client::builder()
        .timeout(request.timeout)
        .build()
        .map_err(|source| Error::Transport {
            url: request.url.clone(),
            source,
        })?;

    let mut request_builder = client.request(method, url).headers(headers);
    if !request.body.text.is_empty() {
        request_builder = request_builder.body(request.body.text.clone());
    }

    debug!(method = %request.method, url = %request.url, "sending request");
    let start = Instant::now();
    let response = request_builder
        .send()
        .await
        .map_err(|err| transport_error(request, err))?;

    let status = response.status();
    let headers = collect_headers(response.headers());
    let body = response
        .bytes()
        .await
        .map_err(|err| transport_error(request, err))?;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    info!(
        method = %request.method,
        url = %request.url,
        status = status.as_u16(),
        duration_ms,
        "request completed"
    );

    Ok(HttpResponse {
        status: status.as_u16(),
        reason: status.canonical_reason().map(str::to_string),
        headers,
        body: body.to_vec(),
        duration_ms,
    })
}

fn build_headers(request: &ResolvedRequest) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in &request.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::validation(format!("invalid header name '{name}'")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| Error::validation(format!("invalid value for header '{name}'")))?;
        map.insert(header_name, header_value);
    }

    // Cookies extend an explicit Cookie header instead of replacing it.
    if let Some(cookies) = request.cookie_header() {
        let combined = match map.get(COOKIE).and_then(|existing| existing.to_str().ok()) {
            Some(existing) if !existing.is_empty() => format!("{existing}; {cookies}"),
            _ => cookies,
        };
        let value = HeaderValue::from_str(&combined)
            .map_err(|_| Error::validation("invalid cookie value"))?;
        map.insert(COOKIE, value);
    }
    Ok(map)
}

fn transport_error(request: &ResolvedRequest, source: reqwest::Error) -> Error {
    if source.is_timeout() {
        Error::Timeout {
            url: request.url.clone(),
            timeout: request.timeout,
        }
    } else {
        Error::Transport {
            url: request.url.clone(),
            source,
        }
    }
}

fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}
