use tracing::info;

use crate::error::Result;

use super::{is_empty_dir, AuthConfig, EnvironmentRecord, RequestRecord, Store, StringMap};

pub const SAMPLE_REQUEST: &str = "users/get-users";

/// Writes the default environments and the sample request into whichever
/// root is still empty. Existing content is never touched.
pub(super) fn seed_defaults(store: &Store) -> Result<()> {
    if is_empty_dir(store.environments_dir())? {
        for (name, base_url, host) in [
            ("dev", "http://localhost:3000", "localhost:3000"),
            ("prod", "https://api.example.com", "api.example.com"),
        ] {
            store.save_environment(name, &default_environment(base_url, host))?;
        }
        info!(dir = %store.environments_dir().display(), "created default environments");
    }

    if is_empty_dir(store.requests_dir())? {
        store.save_request(SAMPLE_REQUEST, &sample_request())?;
        info!(request = SAMPLE_REQUEST, "created sample request");
    }

    Ok(())
}

fn default_environment(base_url: &str, host: &str) -> EnvironmentRecord {
    EnvironmentRecord {
        base_url: base_url.to_string(),
        headers: StringMap::from([("Content-Type".to_string(), "application/json".to_string())]),
        cookies: StringMap::new(),
        auth: AuthConfig::None,
        variables: StringMap::from([("host".to_string(), host.to_string())]),
    }
}

fn sample_request() -> RequestRecord {
    RequestRecord {
        name: "Get Users".to_string(),
        description: "Fetch all users from the API".to_string(),
        method: "GET".to_string(),
        url: "/users".to_string(),
        timeout: 30,
        ..RequestRecord::default()
    }
}
