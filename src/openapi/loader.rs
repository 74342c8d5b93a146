use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::model::{ApiDocument, Operation, ParamLocation, Parameter, RequestBodySpec, METHODS};
use crate::error::{Error, Result};

const JSON_MEDIA_TYPE: &str = "application/json";

/// Reads an OpenAPI 3 or Swagger 2 document. `.json` files are parsed as
/// JSON, everything else as YAML.
pub fn load_spec(path: &Path) -> Result<ApiDocument> {
    let contents = fs::read_to_string(path).map_err(|err| Error::from_read("spec", path, err))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let document = parse_document(&contents, is_json, path)?;
    info!(
        spec = %path.display(),
        title = %document.title,
        operations = document.operations.len(),
        "loaded API description"
    );
    Ok(document)
}

pub(super) fn parse_document(contents: &str, is_json: bool, origin: &Path) -> Result<ApiDocument> {
    let raw: RawDocument = if is_json {
        serde_json::from_str(contents).map_err(|err| Error::parse(origin, err))?
    } else {
        serde_yaml::from_str(contents).map_err(|err| Error::parse(origin, err))?
    };
    raw.into_document()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    openapi: Option<Value>,
    swagger: Option<Value>,
    info: RawInfo,
    servers: Vec<RawServer>,
    host: Option<String>,
    #[serde(rename = "basePath")]
    base_path: Option<String>,
    schemes: Vec<String>,
    consumes: Vec<String>,
    paths: Option<BTreeMap<String, RawPathItem>>,
    components: RawComponents,
    /// Swagger 2 keeps shared parameters at the top level.
    parameters: BTreeMap<String, RawParameter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInfo {
    title: String,
    version: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComponents {
    parameters: BTreeMap<String, RawParameter>,
    #[serde(rename = "requestBodies")]
    request_bodies: BTreeMap<String, RawRequestBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPathItem {
    parameters: Vec<MaybeRef<RawParameter>>,
    get: Option<RawOperation>,
    post: Option<RawOperation>,
    put: Option<RawOperation>,
    delete: Option<RawOperation>,
    patch: Option<RawOperation>,
}

impl RawPathItem {
    fn operation(&self, method: &str) -> Option<&RawOperation> {
        match method {
            "GET" => self.get.as_ref(),
            "POST" => self.post.as_ref(),
            "PUT" => self.put.as_ref(),
            "DELETE" => self.delete.as_ref(),
            "PATCH" => self.patch.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOperation {
    #[serde(rename = "operationId")]
    operation_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    parameters: Vec<MaybeRef<RawParameter>>,
    #[serde(rename = "requestBody")]
    request_body: Option<MaybeRef<RawRequestBody>>,
    consumes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<Value>,
    /// Swagger 2 describes simple parameters with a bare `type`.
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRequestBody {
    required: bool,
    content: BTreeMap<String, RawMediaType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMediaType {
    schema: Option<Value>,
    example: Option<Value>,
    examples: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaybeRef<T> {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Inline(T),
}

impl RawDocument {
    fn into_document(self) -> Result<ApiDocument> {
        if self.openapi.is_none() && self.swagger.is_none() {
            return Err(Error::validation(
                "API description has no `openapi` or `swagger` version field",
            ));
        }
        let Some(paths) = &self.paths else {
            return Err(Error::validation("API description has no `paths` object"));
        };

        let mut operations = Vec::new();
        for (path, item) in paths {
            for method in METHODS {
                if let Some(operation) = item.operation(method) {
                    operations.push(self.build_operation(method, path, item, operation)?);
                }
            }
        }

        Ok(ApiDocument {
            title: self.info.title.clone(),
            version: self.info.version.as_ref().map(scalar_text).unwrap_or_default(),
            servers: self.server_urls(),
            operations,
        })
    }

    fn server_urls(&self) -> Vec<String> {
        if !self.servers.is_empty() {
            return self.servers.iter().map(|server| server.url.clone()).collect();
        }
        match &self.host {
            Some(host) => {
                let scheme = self.schemes.first().map(String::as_str).unwrap_or("https");
                let base_path = self.base_path.as_deref().unwrap_or("");
                vec![format!("{scheme}://{host}{base_path}")]
            }
            None => Vec::new(),
        }
    }

    fn build_operation(
        &self,
        method: &str,
        path: &str,
        item: &RawPathItem,
        operation: &RawOperation,
    ) -> Result<Operation> {
        // Operation-level parameters override path-level ones with the same name and location.
        let mut merged: Vec<&RawParameter> = Vec::new();
        for entry in item.parameters.iter().chain(&operation.parameters) {
            let param = self.parameter(entry)?;
            match merged
                .iter_mut()
                .find(|existing| existing.name == param.name && existing.location == param.location)
            {
                Some(slot) => *slot = param,
                None => merged.push(param),
            }
        }

        let mut parameters = Vec::new();
        let mut request_body = match &operation.request_body {
            Some(entry) => self.request_body(entry)?,
            None => None,
        };

        for param in merged {
            if let Some(location) = ParamLocation::parse(&param.location) {
                parameters.push(Parameter {
                    name: param.name.clone(),
                    location,
                    required: param.required || location == ParamLocation::Path,
                    description: param.description.clone().unwrap_or_default(),
                    schema: param.schema.clone().or_else(|| {
                        param
                            .kind
                            .as_ref()
                            .map(|kind| serde_json::json!({ "type": kind }))
                    }),
                });
            } else if param.location == "body" && request_body.is_none() {
                let content_type = operation
                    .consumes
                    .first()
                    .or_else(|| self.consumes.first())
                    .cloned()
                    .unwrap_or_else(|| JSON_MEDIA_TYPE.to_string());
                request_body = Some(RequestBodySpec {
                    required: param.required,
                    content_type,
                    schema: param.schema.clone(),
                    example: None,
                });
            } else {
                debug!(
                    method,
                    path,
                    parameter = %param.name,
                    location = %param.location,
                    "ignoring parameter"
                );
            }
        }

        Ok(Operation {
            method: method.to_string(),
            path: path.to_string(),
            operation_id: operation
                .operation_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            summary: operation.summary.clone().unwrap_or_default(),
            description: operation.description.clone().unwrap_or_default(),
            parameters,
            request_body,
        })
    }

    fn parameter<'a>(&'a self, entry: &'a MaybeRef<RawParameter>) -> Result<&'a RawParameter> {
        match entry {
            MaybeRef::Inline(param) => Ok(param),
            MaybeRef::Ref { reference } => {
                let found = if let Some(name) = reference.strip_prefix("#/components/parameters/") {
                    self.components.parameters.get(name)
                } else if let Some(name) = reference.strip_prefix("#/parameters/") {
                    self.parameters.get(name)
                } else {
                    None
                };
                found.ok_or_else(|| unresolved(reference))
            }
        }
    }

    fn request_body(&self, entry: &MaybeRef<RawRequestBody>) -> Result<Option<RequestBodySpec>> {
        let body = match entry {
            MaybeRef::Inline(body) => body,
            MaybeRef::Ref { reference } => reference
                .strip_prefix("#/components/requestBodies/")
                .and_then(|name| self.components.request_bodies.get(name))
                .ok_or_else(|| unresolved(reference))?,
        };

        // JSON wins when offered; otherwise the first media type by name.
        let media = body
            .content
            .get_key_value(JSON_MEDIA_TYPE)
            .or_else(|| body.content.iter().next());

        Ok(media.map(|(content_type, media)| RequestBodySpec {
            required: body.required,
            content_type: content_type.clone(),
            schema: media.schema.clone(),
            example: media.example.clone().or_else(|| {
                media
                    .examples
                    .values()
                    .find_map(|example| example.get("value").cloned())
            }),
        }))
    }
}

fn unresolved(reference: &str) -> Error {
    Error::validation(format!("unresolved reference `{reference}`"))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
