use std::{
    fs,
    path::{Path, PathBuf},
};

use petname::petname;
use tracing::debug;

use crate::error::{Error, Result};

/// Stores a response body under `<output_dir>/<request>/NNN-<petname><ext>`.
pub fn save_response_body(
    bytes: &[u8],
    content_type: Option<&str>,
    output_dir: &Path,
    request_path: &str,
) -> Result<PathBuf> {
    let extension = extension_for_content_type(content_type);
    let request_dir = output_dir.join(sanitize_component(request_path));
    fs::create_dir_all(&request_dir)
        .map_err(|err| Error::io("creating response directory", &request_dir, err))?;

    let index = next_index(&request_dir)?;
    let file_name = format!("{:03}-{}{}", index, petname(2, "-"), extension);
    let path = request_dir.join(file_name);
    fs::write(&path, bytes).map_err(|err| Error::io("writing response body to", &path, err))?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved response body");
    Ok(path)
}

pub(super) fn sanitize_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => ch,
            _ => '-',
        })
        .collect();
    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        "request".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(super) fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    match content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
    {
        "application/json" | "application/problem+json" => ".json",
        "text/html" => ".html",
        "text/plain" => ".txt",
        "text/csv" => ".csv",
        "application/xml" | "text/xml" => ".xml",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "application/pdf" => ".pdf",
        _ => ".bin",
    }
}

fn next_index(dir: &Path) -> Result<u32> {
    let mut max_index = 0;
    let entries = fs::read_dir(dir).map_err(|err| Error::io("reading directory", dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| Error::io("reading directory", dir, err))?;
        if let Some(name) = entry.file_name().to_str() {
            if name.len() >= 3 && name.chars().take(3).all(|c| c.is_ascii_digit()) {
                if let Ok(value) = name[0..3].parse::<u32>() {
                    max_index = max_index.max(value + 1);
                }
            }
        }
    }
    Ok(max_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use regex::Regex;
    use tempfile::tempdir;

    #[test]
    fn sanitize_component_flattens_logical_paths() {
        assert_eq!(sanitize_component("users/get-users"), "users-get-users");
        assert_eq!(sanitize_component("Hello World!"), "Hello-World");
        assert_eq!(sanitize_component("///"), "request");
    }

    #[test]
    fn extension_for_content_type_matches_common_types() {
        assert_eq!(
            extension_for_content_type(Some("application/json; charset=utf-8")),
            ".json"
        );
        assert_eq!(extension_for_content_type(Some("text/html")), ".html");
        assert_eq!(extension_for_content_type(Some("application/unknown")), ".bin");
        assert_eq!(extension_for_content_type(None), ".bin");
    }

    #[test]
    fn save_response_body_numbers_files() -> Result<()> {
        let temp = tempdir()?;
        let out = temp.path().join("responses");

        let first = save_response_body(b"{}", Some("application/json"), &out, "users/get-users")?;
        let second = save_response_body(b"{}", Some("application/json"), &out, "users/get-users")?;

        assert_eq!(first.parent().unwrap(), out.join("users-get-users"));
        let pattern = Regex::new(r"^\d{3}-[a-z]+-[a-z]+\.json$").unwrap();
        assert!(pattern.is_match(first.file_name().unwrap().to_str().unwrap()));
        assert_eq!(&second.file_name().unwrap().to_str().unwrap()[0..3], "001");
        assert_eq!(std::fs::read(first)?, b"{}");
        Ok(())
    }

    #[test]
    fn next_index_detects_existing_files() -> Result<()> {
        let temp = tempdir()?;
        std::fs::write(temp.path().join("000-first.bin"), b"one")?;
        std::fs::write(temp.path().join("010-second.bin"), b"two")?;

        assert_eq!(next_index(temp.path())?, 11);
        Ok(())
    }
}
