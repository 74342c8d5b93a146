use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::store::{AuthConfig, StringMap};

use super::merge::set_header;

pub const AUTHORIZATION: &str = "Authorization";

/// Applies the environment's auth scheme on top of the merged headers.
pub fn apply_auth(auth: &AuthConfig, headers: &mut StringMap) {
    match auth {
        AuthConfig::None => {}
        AuthConfig::Bearer { token } => {
            if !token.is_empty() {
                set_header(headers, AUTHORIZATION, &format!("Bearer {token}"));
            }
        }
        AuthConfig::Basic { username, password } => {
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            set_header(headers, AUTHORIZATION, &format!("Basic {encoded}"));
        }
        AuthConfig::ApiKey { key, header } => {
            if !key.is_empty() && !header.is_empty() {
                set_header(headers, header, key);
            }
        }
    }
}
