//! Turns a stored request plus an environment into one outbound call.

mod auth;
mod merge;
mod variables;

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{EnvironmentRecord, RequestRecord, Store, StringMap};

pub use auth::apply_auth;
pub use merge::{merge_headers, merge_layers, set_header};
pub use variables::{substitute_variables, unresolved_variables};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the body of a resolved request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Inline,
    Variant(String),
    /// The active variant could not be read; the inline body was used instead.
    InlineFallback { missing: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBody {
    pub text: String,
    pub source: BodySource,
}

impl ResolvedBody {
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: BodySource::Inline,
        }
    }
}

/// Fully merged description of a single HTTP call. Computed per execution and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub method: String,
    pub url: String,
    pub headers: StringMap,
    pub cookies: StringMap,
    pub body: ResolvedBody,
    pub timeout: Duration,
}

impl ResolvedRequest {
    /// `{{...}}` placeholders that no environment variable matched.
    pub fn unresolved_variables(&self) -> Vec<String> {
        unresolved_variables(&self.url)
    }

    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Used when the request's own timeout is zero.
    pub default_timeout: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub fn resolve(store: &Store, request_path: &str, env_name: &str) -> Result<ResolvedRequest> {
    resolve_with(store, request_path, env_name, ResolveOptions::default())
}

pub fn resolve_with(
    store: &Store,
    request_path: &str,
    env_name: &str,
    options: ResolveOptions,
) -> Result<ResolvedRequest> {
    let request = store.load_request(request_path)?;
    let environment = store.load_environment(env_name)?;
    let body = select_body(store, request_path, &request);

    let resolved = resolve_records(&request, &environment, body, options);
    debug!(
        request = request_path,
        environment = env_name,
        method = %resolved.method,
        url = %resolved.url,
        "resolved request"
    );
    for name in resolved.unresolved_variables() {
        warn!(request = request_path, variable = %name, "no environment variable for placeholder");
    }
    Ok(resolved)
}

/// Two-step body lookup: the active variant if it can be read, else the
/// inline body.
pub fn select_body(store: &Store, request_path: &str, request: &RequestRecord) -> ResolvedBody {
    if request.active_body.is_empty() {
        return ResolvedBody::inline(request.body.clone());
    }

    match store.read_body(request_path, &request.active_body) {
        Ok(text) => ResolvedBody {
            text,
            source: BodySource::Variant(request.active_body.clone()),
        },
        Err(err) => {
            warn!(
                request = request_path,
                body = %request.active_body,
                error = %err,
                "active body unavailable, falling back to inline body"
            );
            ResolvedBody {
                text: request.body.clone(),
                source: BodySource::InlineFallback {
                    missing: request.active_body.clone(),
                },
            }
        }
    }
}

/// Pure merge of already-loaded records.
pub fn resolve_records(
    request: &RequestRecord,
    environment: &EnvironmentRecord,
    body: ResolvedBody,
    options: ResolveOptions,
) -> ResolvedRequest {
    let base_url = environment
        .base_url
        .strip_suffix('/')
        .unwrap_or(&environment.base_url);
    let url = substitute_variables(&format!("{base_url}{}", request.url), &environment.variables);

    let mut headers = merge_headers(&environment.headers, &request.headers);
    apply_auth(&environment.auth, &mut headers);
    let cookies = merge_layers(&environment.cookies, &request.cookies);

    let timeout = if request.timeout > 0 {
        Duration::from_secs(request.timeout)
    } else {
        options.default_timeout
    };

    let method = match request.method.trim() {
        "" => "GET".to_string(),
        other => other.to_ascii_uppercase(),
    };

    ResolvedRequest {
        method,
        url,
        headers,
        cookies,
        body,
        timeout,
    }
}
