use colored::{Color, Colorize};
use url::Url;

use super::models::ExecutionResult;

pub fn print_execution_result(result: &ExecutionResult) {
    let status_color = if result.response.status >= 400 {
        Color::Red
    } else if result.response.status >= 300 {
        Color::Yellow
    } else {
        Color::Green
    };

    println!(
        "{} {} {}",
        result.request.method.bold(),
        result.request.url.cyan(),
        format!("[{}]", result.request.environment).dimmed()
    );
    println!(
        "{} {} {}",
        "Status:".bold(),
        result.response.status_line().color(status_color),
        format!("({:.1} ms)", result.response.duration_ms).dimmed()
    );

    if let Some(bytes) = result.request.body_bytes {
        let note = result
            .request
            .body_note
            .as_deref()
            .map(|note| format!(" {note}"))
            .unwrap_or_default();
        println!(
            "{} {}",
            "Request body:".bold(),
            format!("{bytes} bytes{note}").dimmed()
        );
    }

    println!("{}", "Headers:".bold());
    for (name, value) in &result.response.headers {
        println!("  {}: {}", name.cyan(), value.dimmed());
    }

    println!();
    println!("{}", "Response Body:".bold());
    println!("{}", render_body(&result.response.body));

    if let Some(path) = &result.saved_body {
        println!(
            "{} {}",
            "Saved:".bold(),
            format_body_link(path)
        );
    }
}

/// Pretty-prints JSON bodies and passes everything else through as text.
pub fn render_body(bytes: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return pretty;
        }
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Single-line preview of a stored body, truncated to `width` characters.
pub fn body_preview(text: &str, width: usize) -> String {
    let compact = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => value.to_string(),
        Err(_) => text.split_whitespace().collect::<Vec<_>>().join(" "),
    };
    if compact.chars().count() <= width {
        compact
    } else {
        let mut truncated: String = compact.chars().take(width.saturating_sub(1)).collect();
        truncated.push('…');
        truncated
    }
}

fn format_body_link(path: &std::path::Path) -> String {
    let display = path.to_string_lossy();
    match Url::from_file_path(path) {
        Ok(url) => format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, display.cyan()),
        Err(_) => display.cyan().to_string(),
    }
}
