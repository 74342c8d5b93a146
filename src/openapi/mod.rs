//! Minimal OpenAPI / Swagger reader: a flat list of operations with their
//! parameters and request body, enough to generate and drive requests.

mod loader;
mod model;

pub use loader::load_spec;
pub use model::{ApiDocument, Operation, ParamLocation, Parameter, RequestBodySpec, METHODS};
