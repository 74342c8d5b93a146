use std::path::PathBuf;

/// Raw outcome of one executed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub duration_ms: f64,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    pub fn status_line(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{} {}", self.status, reason),
            None => self.status.to_string(),
        }
    }
}

pub struct RequestSummary {
    pub path: String,
    pub environment: String,
    pub method: String,
    pub url: String,
    pub body_bytes: Option<usize>,
    /// Active variant that was used, or that was missing and fell back.
    pub body_note: Option<String>,
}

pub struct ExecutionResult {
    pub request: RequestSummary,
    pub response: HttpResponse,
    pub saved_body: Option<PathBuf>,
}
