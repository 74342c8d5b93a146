use std::{collections::BTreeSet, fs};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::openapi::{ApiDocument, Operation};
use crate::store::{RequestRecord, Store};

const DEFAULT_GROUP: &str = "api";
const PLACEHOLDER_BODY: &str = "{\n  \"example\": \"data\"\n}";

static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]+").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Writes one directory-layout request per operation under
/// `<requests>/<slug(title)>/<name>/request.json`. Existing requests are left
/// alone unless `force` is set.
pub fn generate_requests(store: &Store, doc: &ApiDocument, force: bool) -> Result<GenerateSummary> {
    let group = match slugify(&doc.title) {
        slug if slug.is_empty() => DEFAULT_GROUP.to_string(),
        slug => slug,
    };

    let mut summary = GenerateSummary::default();
    let mut seen = BTreeSet::new();

    for operation in &doc.operations {
        let logical = format!("{group}/{}", request_name(operation));

        if !seen.insert(logical.clone()) {
            warn!(request = %logical, operation = %operation, "duplicate request name, skipping");
            summary.skipped.push(logical);
            continue;
        }

        let exists = match store.locate_request(&logical) {
            Ok(_) => true,
            Err(err) if err.is_not_found() => false,
            Err(err) => return Err(err),
        };
        if exists && !force {
            warn!(request = %logical, "request already exists, skipping");
            summary.skipped.push(logical);
            continue;
        }

        let dir = store.request_dir(&logical);
        fs::create_dir_all(&dir).map_err(|err| Error::io("creating directory", &dir, err))?;
        store.save_request(&logical, &build_record(operation))?;
        summary.created.push(logical);
    }

    info!(
        group = %group,
        created = summary.created.len(),
        skipped = summary.skipped.len(),
        "generated requests"
    );
    Ok(summary)
}

/// Lowercased operationId, else `method-path-segments`.
pub fn request_name(operation: &Operation) -> String {
    let raw = match &operation.operation_id {
        Some(id) => id.clone(),
        None => format!(
            "{}-{}",
            operation.method,
            operation.path.trim_matches('/').replace('/', "-")
        ),
    };
    match slugify(&raw) {
        slug if slug.is_empty() => operation.method.to_ascii_lowercase(),
        slug => slug,
    }
}

pub fn build_record(operation: &Operation) -> RequestRecord {
    let mut record = RequestRecord {
        name: request_name(operation),
        description: operation.label().to_string(),
        method: operation.method.clone(),
        url: operation.path.clone(),
        ..RequestRecord::default()
    };

    for param in &operation.parameters {
        let mut meta = Map::new();
        meta.insert("in".to_string(), json!(param.location.as_str()));
        meta.insert("required".to_string(), json!(param.required));
        if !param.description.is_empty() {
            meta.insert("description".to_string(), json!(param.description));
        }
        if let Some(schema) = &param.schema {
            meta.insert("schema".to_string(), schema.clone());
        }
        record.params.insert(param.name.clone(), Value::Object(meta));
    }

    if operation.sends_body() {
        record
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(body) = &operation.request_body {
            record.body = body
                .example
                .as_ref()
                .and_then(|example| serde_json::to_string_pretty(example).ok())
                .unwrap_or_else(|| PLACEHOLDER_BODY.to_string());
        }
    }

    record
}

fn slugify(value: &str) -> String {
    SLUG_SEPARATORS
        .replace_all(&value.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::{ParamLocation, Parameter, RequestBodySpec};
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn operation(method: &str, path: &str, id: Option<&str>) -> Operation {
        Operation {
            method: method.to_string(),
            path: path.to_string(),
            operation_id: id.map(str::to_string),
            ..Operation::default()
        }
    }

    fn document() -> ApiDocument {
        let mut create = operation("POST", "/pets", Some("createPet"));
        create.summary = "Create a pet".to_string();
        create.request_body = Some(RequestBodySpec {
            required: true,
            content_type: "application/json".to_string(),
            schema: None,
            example: Some(json!({"name": "Rex"})),
        });

        let mut fetch = operation("GET", "/pets/{petId}", None);
        fetch.description = "Fetch one".to_string();
        fetch.parameters.push(Parameter {
            name: "petId".to_string(),
            location: ParamLocation::Path,
            required: true,
            description: "Pet identifier".to_string(),
            schema: Some(json!({"type": "integer"})),
        });

        ApiDocument {
            title: "Pet Store".to_string(),
            operations: vec![create, fetch, operation("PUT", "/pets", Some("updatePet"))],
            ..ApiDocument::default()
        }
    }

    #[test]
    fn names_follow_operation_id_or_method_and_path() {
        assert_eq!(request_name(&operation("GET", "/x", Some("listUsers"))), "listusers");
        assert_eq!(
            request_name(&operation("GET", "/users/{id}/posts", None)),
            "get-users-id-posts"
        );
        assert_eq!(request_name(&operation("DELETE", "/", None)), "delete");
    }

    #[test]
    fn records_carry_params_and_body_skeletons() {
        let doc = document();

        let create = build_record(&doc.operations[0]);
        assert_eq!(create.description, "Create a pet");
        assert_eq!(create.headers.get("Content-Type").map(String::as_str), Some("application/json"));
        assert_eq!(create.body, "{\n  \"name\": \"Rex\"\n}");

        let fetch = build_record(&doc.operations[1]);
        assert_eq!(fetch.method, "GET");
        assert_eq!(fetch.url, "/pets/{petId}");
        assert!(fetch.headers.is_empty());
        assert_eq!(
            fetch.params.get("petId"),
            Some(&json!({
                "in": "path",
                "required": true,
                "description": "Pet identifier",
                "schema": {"type": "integer"}
            }))
        );

        let mut without_example = doc.operations[0].clone();
        if let Some(body) = without_example.request_body.as_mut() {
            body.example = None;
        }
        assert_eq!(build_record(&without_example).body, PLACEHOLDER_BODY);

        let update = build_record(&doc.operations[2]);
        assert!(update.headers.contains_key("Content-Type"));
        assert!(update.body.is_empty());
    }

    #[test]
    fn generates_directory_layout_and_skips_existing() -> Result<()> {
        let temp = tempdir()?;
        let store = Store::open(temp.path())?;
        let doc = document();

        let first = generate_requests(&store, &doc, false)?;
        assert_eq!(
            first.created,
            vec![
                "pet-store/createpet".to_string(),
                "pet-store/get-pets-petid".to_string(),
                "pet-store/updatepet".to_string(),
            ]
        );
        assert!(first.skipped.is_empty());
        assert!(store
            .requests_dir()
            .join("pet-store/createpet/request.json")
            .is_file());

        let mut edited = store.load_request("pet-store/createpet")?;
        edited.body = "{}".to_string();
        store.save_request("pet-store/createpet", &edited)?;

        let second = generate_requests(&store, &doc, false)?;
        assert!(second.created.is_empty());
        assert_eq!(second.skipped.len(), 3);
        assert_eq!(store.load_request("pet-store/createpet")?.body, "{}");

        let forced = generate_requests(&store, &doc, true)?;
        assert_eq!(forced.created.len(), 3);
        assert_eq!(
            store.load_request("pet-store/createpet")?.body,
            "{\n  \"name\": \"Rex\"\n}"
        );
        Ok(())
    }

    #[test]
    fn untitled_documents_use_the_api_group() -> Result<()> {
        let temp = tempdir()?;
        let store = Store::open(temp.path())?;
        let doc = ApiDocument {
            operations: vec![
                operation("GET", "/ping", Some("ping")),
                operation("POST", "/ping", Some("Ping")),
            ],
            ..ApiDocument::default()
        };

        let summary = generate_requests(&store, &doc, false)?;
        assert_eq!(summary.created, vec!["api/ping".to_string()]);
        assert_eq!(summary.skipped, vec!["api/ping".to_string()]);

        let listed = store.list_requests()?;
        assert!(listed["api"].contains("api/ping"));
        Ok(())
    }
}
