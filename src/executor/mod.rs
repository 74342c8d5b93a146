mod models;
mod printer;
mod runner;
mod writer;

use std::path::PathBuf;

use crate::error::Result;
use crate::resolve::{resolve_with, BodySource, ResolveOptions, ResolvedRequest};
use crate::store::Store;

pub use models::{ExecutionResult, HttpResponse, RequestSummary};
pub use printer::{body_preview, print_execution_result, render_body};
pub use runner::execute;
pub use writer::save_response_body;

#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    pub resolve: ResolveOptions,
    /// Directory that receives a copy of each response body.
    pub response_output_dir: Option<PathBuf>,
}

/// Resolves `request_path` against `env_name` and executes it once.
pub async fn run_request(
    store: &Store,
    request_path: &str,
    env_name: &str,
    options: &ExecutionOptions,
) -> Result<ExecutionResult> {
    let resolved = resolve_with(store, request_path, env_name, options.resolve)?;
    run_resolved(&resolved, request_path, env_name, options).await
}

pub async fn run_resolved(
    resolved: &ResolvedRequest,
    request_path: &str,
    env_name: &str,
    options: &ExecutionOptions,
) -> Result<ExecutionResult> {
    let response = execute(resolved).await?;

    let saved_body = match &options.response_output_dir {
        Some(dir) => Some(save_response_body(
            &response.body,
            response.content_type(),
            dir,
            request_path,
        )?),
        None => None,
    };

    Ok(ExecutionResult {
        request: summarize(resolved, request_path, env_name),
        response,
        saved_body,
    })
}

fn summarize(resolved: &ResolvedRequest, request_path: &str, env_name: &str) -> RequestSummary {
    let body_bytes = (!resolved.body.text.is_empty()).then(|| resolved.body.text.len());
    let body_note = match &resolved.body.source {
        BodySource::Inline => None,
        BodySource::Variant(name) => Some(format!("(body: {name}.json)")),
        BodySource::InlineFallback { missing } => {
            Some(format!("(inline body; {missing}.json is missing)"))
        }
    };

    RequestSummary {
        path: request_path.to_string(),
        environment: env_name.to_string(),
        method: resolved.method.clone(),
        url: resolved.url.clone(),
        body_bytes,
        body_note,
    }
}
