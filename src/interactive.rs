use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use inquire::{Confirm, InquireError, Select, Text};
use url::form_urlencoded;

use crate::{
    executor::{body_preview, print_execution_result, run_request, run_resolved, ExecutionOptions},
    generator::{build_record, request_name},
    openapi::{ApiDocument, Operation, ParamLocation, Parameter},
    resolve::{resolve_records, set_header, ResolvedBody},
    store::{RequestRecord, Store},
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BACK: &str = "← Back";
const PREVIEW_WIDTH: usize = 60;

pub struct InteractiveOptions {
    pub store: Store,
    pub document: ApiDocument,
    pub environment: String,
    pub execution: ExecutionOptions,
}

pub async fn run_interactive(options: InteractiveOptions) -> Result<()> {
    let mut ui = InquireUi;
    run_interactive_with_ui(options, &mut ui).await
}

pub(crate) async fn run_interactive_with_ui(
    mut options: InteractiveOptions,
    ui: &mut dyn InteractiveUi,
) -> Result<()> {
    let title = match options.document.title.as_str() {
        "" => "untitled API",
        title => title,
    };
    ui.print(&format!(
        "apiman v{} - {} ({} operations)",
        VERSION,
        title,
        options.document.operations.len()
    ));

    loop {
        let menu = [
            MenuItem::RunEndpoint,
            MenuItem::Browse,
            MenuItem::SwitchEnvironment,
            MenuItem::Quit,
        ];
        let labels: Vec<String> = menu
            .iter()
            .map(|item| item.label(&options.environment))
            .collect();
        let index = ui.select("apiman", &labels, 0)?;
        let choice = menu
            .get(index)
            .copied()
            .ok_or_else(|| anyhow!("invalid menu selection"))?;

        let outcome = match choice {
            MenuItem::RunEndpoint => run_endpoint(&options, ui).await,
            MenuItem::Browse => browse_requests(&options, ui).await,
            MenuItem::SwitchEnvironment => switch_environment(&mut options, ui),
            MenuItem::Quit => break,
        };
        if let Err(err) = outcome {
            ui.print(&format!("Error: {err:#}"));
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum MenuItem {
    RunEndpoint,
    Browse,
    SwitchEnvironment,
    Quit,
}

impl MenuItem {
    fn label(self, environment: &str) -> String {
        match self {
            MenuItem::RunEndpoint => "▶ Run API endpoint".to_string(),
            MenuItem::Browse => "☰ Saved requests".to_string(),
            MenuItem::SwitchEnvironment => format!("⇄ Switch environment ({environment})"),
            MenuItem::Quit => "Quit".to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum RequestAction {
    Run,
    ListBodies,
    SetBody,
    RemoveBody,
    Back,
}

impl RequestAction {
    const ALL: [RequestAction; 5] = [
        RequestAction::Run,
        RequestAction::ListBodies,
        RequestAction::SetBody,
        RequestAction::RemoveBody,
        RequestAction::Back,
    ];

    fn label(self) -> &'static str {
        match self {
            RequestAction::Run => "Run",
            RequestAction::ListBodies => "List bodies",
            RequestAction::SetBody => "Set active body",
            RequestAction::RemoveBody => "Remove body",
            RequestAction::Back => BACK,
        }
    }
}

pub(crate) trait InteractiveUi {
    fn print(&mut self, message: &str);
    fn select(&mut self, prompt: &str, items: &[String], start: usize) -> Result<usize>;
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<Option<String>>;
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
    fn read_multiline(&mut self, prompt: &str) -> Result<Option<String>>;
}

struct InquireUi;

impl InteractiveUi for InquireUi {
    fn print(&mut self, message: &str) {
        println!("{}", message);
    }

    fn select(&mut self, prompt: &str, items: &[String], start: usize) -> Result<usize> {
        let choice = Select::new(prompt, items.to_vec())
            .with_page_size(12)
            .with_starting_cursor(start)
            .prompt()?;
        items
            .iter()
            .position(|item| item == &choice)
            .ok_or_else(|| anyhow!("selection not found"))
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<Option<String>> {
        let mut builder = Text::new(prompt);
        if let Some(value) = default {
            builder = builder.with_default(value);
        }
        match builder.prompt() {
            Ok(value) => Ok(Some(value)),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        match Confirm::new(prompt).with_default(default).prompt() {
            Ok(value) => Ok(value),
            Err(InquireError::OperationCanceled) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    fn read_multiline(&mut self, prompt: &str) -> Result<Option<String>> {
        read_multiline_from_stdin(prompt)
    }
}

/// Reads lines until an empty one. `None` when nothing was entered.
fn read_multiline_from_stdin(prompt: &str) -> Result<Option<String>> {
    let stdin = io::stdin();
    let mut lines = Vec::new();

    loop {
        print!("{} ", prompt);
        io::stdout().flush()?;

        let mut buffer = String::new();
        let bytes = stdin.read_line(&mut buffer)?;
        if bytes == 0 {
            break;
        }

        let trimmed = buffer.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            break;
        }
        lines.push(trimmed.to_string());
    }

    if lines.is_empty() {
        Ok(None)
    } else {
        Ok(Some(lines.join("\n")))
    }
}

fn pause(ui: &mut dyn InteractiveUi) {
    let _ = ui.input("Press Enter to continue", Some(""));
}

async fn run_endpoint(options: &InteractiveOptions, ui: &mut dyn InteractiveUi) -> Result<()> {
    let operations = &options.document.operations;
    if operations.is_empty() {
        ui.print("No operations in the API description.");
        return Ok(());
    }

    let mut labels: Vec<String> = operations.iter().map(ToString::to_string).collect();
    labels.push(BACK.to_string());
    let index = ui.select("Select endpoint", &labels, 0)?;
    let Some(operation) = operations.get(index) else {
        return Ok(());
    };

    let Some(record) = prompt_endpoint_request(ui, operation)? else {
        ui.print("Cancelled.");
        return Ok(());
    };

    let environment = options
        .store
        .load_environment(&options.environment)
        .with_context(|| format!("loading environment {}", options.environment))?;
    let body = ResolvedBody::inline(record.body.clone());
    let resolved = resolve_records(&record, &environment, body, options.execution.resolve);

    ui.print("");
    ui.print(&format!(
        "Running {} {} ({})\n",
        resolved.method, resolved.url, options.environment
    ));
    let result = run_resolved(
        &resolved,
        &request_name(operation),
        &options.environment,
        &options.execution,
    )
    .await?;
    print_execution_result(&result);
    pause(ui);
    Ok(())
}

/// Prompts for every parameter of `operation` and returns an unsaved record
/// ready for resolution. `None` when the user cancels.
pub(crate) fn prompt_endpoint_request(
    ui: &mut dyn InteractiveUi,
    operation: &Operation,
) -> Result<Option<RequestRecord>> {
    let mut record = build_record(operation);
    let mut url = operation.path.clone();

    for param in operation.parameters_in(ParamLocation::Path) {
        let Some(value) = prompt_param(ui, param)? else {
            return Ok(None);
        };
        if value.is_empty() {
            ui.print(&format!("Path parameter `{}` is required.", param.name));
            return Ok(None);
        }
        url = url.replace(&format!("{{{}}}", param.name), &value);
    }

    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut has_query = false;
    for param in operation.parameters_in(ParamLocation::Query) {
        let Some(value) = prompt_param(ui, param)? else {
            return Ok(None);
        };
        if !value.is_empty() {
            query.append_pair(&param.name, &value);
            has_query = true;
        }
    }
    if has_query {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query.finish());
    }

    for param in operation.parameters_in(ParamLocation::Header) {
        let Some(value) = prompt_param(ui, param)? else {
            return Ok(None);
        };
        if !value.is_empty() {
            set_header(&mut record.headers, &param.name, &value);
        }
    }

    if operation.sends_body() {
        if record.body.is_empty() {
            ui.print("Request body (finish with an empty line):");
        } else {
            ui.print(&format!(
                "Request body (finish with an empty line, leave empty for the default):\n{}",
                record.body
            ));
        }
        if let Some(body) = ui.read_multiline("body>")? {
            if !body.trim().is_empty() {
                record.body = body;
            }
        }
    }

    record.url = url;
    Ok(Some(record))
}

fn prompt_param(ui: &mut dyn InteractiveUi, param: &Parameter) -> Result<Option<String>> {
    let mut prompt = format!("{} ({}", param.name, param.location);
    if param.required {
        prompt.push_str(", required");
    }
    prompt.push(')');
    if !param.description.is_empty() {
        prompt.push_str(&format!(" {}", param.description));
    }
    Ok(ui
        .input(&prompt, None)?
        .map(|value| value.trim().to_string()))
}

async fn browse_requests(options: &InteractiveOptions, ui: &mut dyn InteractiveUi) -> Result<()> {
    let store = &options.store;
    let paths: Vec<String> = store.list_requests()?.into_values().flatten().collect();
    if paths.is_empty() {
        ui.print("No saved requests.");
        return Ok(());
    }

    let mut labels = paths.clone();
    labels.push(BACK.to_string());
    let index = ui.select("Select request", &labels, 0)?;
    let Some(path) = paths.get(index) else {
        return Ok(());
    };

    let labels: Vec<String> = RequestAction::ALL
        .iter()
        .map(|action| action.label().to_string())
        .collect();
    let index = ui.select(path, &labels, 0)?;
    let action = RequestAction::ALL
        .get(index)
        .copied()
        .unwrap_or(RequestAction::Back);

    match action {
        RequestAction::Run => {
            ui.print("");
            ui.print(&format!("Running {} ({})\n", path, options.environment));
            let result = run_request(store, path, &options.environment, &options.execution).await?;
            print_execution_result(&result);
            pause(ui);
        }
        RequestAction::ListBodies => show_bodies(store, path, ui)?,
        RequestAction::SetBody => {
            if let Some(name) = pick_body(store, path, ui, "Select active body")? {
                store.set_active_body(path, &name)?;
                ui.print(&format!("Active body for {path} is now {name}."));
            }
        }
        RequestAction::RemoveBody => {
            if let Some(name) = pick_body(store, path, ui, "Select body to remove")? {
                if ui.confirm(&format!("Remove body {name}?"), false)? {
                    store.remove_body(path, &name)?;
                    ui.print(&format!("Removed body {name} from {path}."));
                }
            }
        }
        RequestAction::Back => {}
    }
    Ok(())
}

fn show_bodies(store: &Store, path: &str, ui: &mut dyn InteractiveUi) -> Result<()> {
    let listing = store.list_bodies(path)?;
    if listing.variants.is_empty() {
        ui.print(&format!("No body variants for {path}."));
        return Ok(());
    }
    for name in &listing.variants {
        let marker = if listing.is_active(name) { "*" } else { " " };
        let preview = store
            .read_body(path, name)
            .map(|text| body_preview(&text, PREVIEW_WIDTH))
            .unwrap_or_default();
        ui.print(&format!("{marker} {name}  {preview}"));
    }
    Ok(())
}

fn pick_body(
    store: &Store,
    path: &str,
    ui: &mut dyn InteractiveUi,
    prompt: &str,
) -> Result<Option<String>> {
    let listing = store.list_bodies(path)?;
    if listing.variants.is_empty() {
        ui.print(&format!("No body variants for {path}."));
        return Ok(None);
    }

    let names: Vec<String> = listing.variants.iter().cloned().collect();
    let mut labels: Vec<String> = names
        .iter()
        .map(|name| {
            if listing.is_active(name) {
                format!("{name} (active)")
            } else {
                name.clone()
            }
        })
        .collect();
    labels.push(BACK.to_string());

    let start = names
        .iter()
        .position(|name| listing.is_active(name))
        .unwrap_or(0);
    let index = ui.select(prompt, &labels, start)?;
    Ok(names.get(index).cloned())
}

fn switch_environment(options: &mut InteractiveOptions, ui: &mut dyn InteractiveUi) -> Result<()> {
    let names = options.store.list_environments()?;
    if names.is_empty() {
        ui.print("No environments defined.");
        return Ok(());
    }

    let start = names
        .iter()
        .position(|name| name == &options.environment)
        .unwrap_or(0);
    let index = ui.select("Select environment", &names, start)?;
    let name = names
        .get(index)
        .cloned()
        .ok_or_else(|| anyhow!("invalid environment selection"))?;
    ui.print(&format!("Environment: {name}"));
    options.environment = name;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::RequestBodySpec;
    use crate::store::SAMPLE_REQUEST;
    use httpmock::prelude::*;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    struct TestUi {
        menu: VecDeque<usize>,
        inputs: VecDeque<Option<String>>,
        confirms: VecDeque<bool>,
        multiline: VecDeque<Option<String>>,
        prints: Vec<String>,
        selects: usize,
    }

    impl TestUi {
        fn new(menu: Vec<usize>) -> Self {
            Self {
                menu: menu.into(),
                inputs: VecDeque::new(),
                confirms: VecDeque::new(),
                multiline: VecDeque::new(),
                prints: Vec::new(),
                selects: 0,
            }
        }

        fn with_input(mut self, value: Option<&str>) -> Self {
            self.inputs.push_back(value.map(|s| s.to_string()));
            self
        }

        fn with_confirm(mut self, value: bool) -> Self {
            self.confirms.push_back(value);
            self
        }

        fn with_multiline(mut self, value: Option<&str>) -> Self {
            self.multiline.push_back(value.map(|s| s.to_string()));
            self
        }
    }

    impl InteractiveUi for TestUi {
        fn print(&mut self, message: &str) {
            self.prints.push(message.to_string());
        }

        fn select(&mut self, _prompt: &str, items: &[String], _start: usize) -> Result<usize> {
            self.selects += 1;
            self.menu
                .pop_front()
                .map(|idx| {
                    if idx >= items.len() {
                        panic!("index {} out of bounds", idx);
                    }
                    idx
                })
                .ok_or_else(|| anyhow::anyhow!("unexpected menu request"))
        }

        fn input(&mut self, _prompt: &str, _default: Option<&str>) -> Result<Option<String>> {
            Ok(self.inputs.pop_front().unwrap_or(Some(String::new())))
        }

        fn confirm(&mut self, _prompt: &str, _default: bool) -> Result<bool> {
            Ok(self.confirms.pop_front().unwrap_or(true))
        }

        fn read_multiline(&mut self, _prompt: &str) -> Result<Option<String>> {
            Ok(self.multiline.pop_front().unwrap_or(None))
        }
    }

    fn param(name: &str, location: ParamLocation) -> Parameter {
        Parameter {
            name: name.to_string(),
            location,
            required: location == ParamLocation::Path,
            description: String::new(),
            schema: None,
        }
    }

    fn pet_operation() -> Operation {
        Operation {
            method: "GET".to_string(),
            path: "/pets/{petId}".to_string(),
            operation_id: Some("getPet".to_string()),
            parameters: vec![
                param("petId", ParamLocation::Path),
                param("limit", ParamLocation::Query),
                param("x-trace", ParamLocation::Header),
            ],
            ..Operation::default()
        }
    }

    fn options(store: Store, operations: Vec<Operation>) -> InteractiveOptions {
        InteractiveOptions {
            store,
            document: ApiDocument {
                title: "Pets".to_string(),
                operations,
                ..ApiDocument::default()
            },
            environment: "dev".to_string(),
            execution: ExecutionOptions::default(),
        }
    }

    #[tokio::test]
    async fn quits_via_menu() -> Result<()> {
        let temp = tempdir()?;
        let store = Store::open(temp.path())?;

        let mut ui = TestUi::new(vec![3]);
        run_interactive_with_ui(options(store, vec![pet_operation()]), &mut ui).await?;
        assert_eq!(ui.selects, 1);
        assert!(ui.prints[0].contains("Pets (1 operations)"));
        Ok(())
    }

    #[test]
    fn prompt_endpoint_request_fills_parameters() -> Result<()> {
        let mut ui = TestUi::new(vec![])
            .with_input(Some("42"))
            .with_input(Some("a b&c"))
            .with_input(Some("trace-1"));

        let record = prompt_endpoint_request(&mut ui, &pet_operation())?.expect("record");
        assert_eq!(record.url, "/pets/42?limit=a+b%26c");
        assert_eq!(record.method, "GET");
        assert_eq!(record.headers.get("x-trace").map(String::as_str), Some("trace-1"));
        Ok(())
    }

    #[test]
    fn prompt_endpoint_request_requires_path_parameters() -> Result<()> {
        let mut ui = TestUi::new(vec![]).with_input(Some("  "));
        assert!(prompt_endpoint_request(&mut ui, &pet_operation())?.is_none());
        assert!(ui.prints.iter().any(|line| line.contains("petId")));

        let mut ui = TestUi::new(vec![]).with_input(None);
        assert!(prompt_endpoint_request(&mut ui, &pet_operation())?.is_none());
        Ok(())
    }

    #[test]
    fn prompt_endpoint_request_reads_body() -> Result<()> {
        let operation = Operation {
            method: "POST".to_string(),
            path: "/pets".to_string(),
            request_body: Some(RequestBodySpec {
                required: true,
                content_type: "application/json".to_string(),
                schema: None,
                example: None,
            }),
            ..Operation::default()
        };

        let mut ui = TestUi::new(vec![]).with_multiline(Some("{\"name\":\"Rex\"}"));
        let record = prompt_endpoint_request(&mut ui, &operation)?.expect("record");
        assert_eq!(record.body, "{\"name\":\"Rex\"}");
        assert_eq!(
            record.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );

        let mut ui = TestUi::new(vec![]);
        let record = prompt_endpoint_request(&mut ui, &operation)?.expect("record");
        assert!(record.body.contains("\"example\""));
        Ok(())
    }

    #[tokio::test]
    async fn runs_spec_endpoint_against_current_environment() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/pets/42")
                    .query_param("limit", "5")
                    .header("x-trace", "abc");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("{\"id\":42}");
            })
            .await;

        let temp = tempdir()?;
        let store = Store::open(temp.path())?;
        let mut dev = store.load_environment("dev")?;
        dev.base_url = server.base_url();
        store.save_environment("dev", &dev)?;

        let mut ui = TestUi::new(vec![0, 0, 3])
            .with_input(Some("42"))
            .with_input(Some("5"))
            .with_input(Some("abc"));
        run_interactive_with_ui(options(store, vec![pet_operation()]), &mut ui).await?;

        mock.assert_async().await;
        assert!(!ui.prints.iter().any(|line| line.starts_with("Error:")));
        Ok(())
    }

    #[tokio::test]
    async fn manages_body_variants_of_saved_requests() -> Result<()> {
        let temp = tempdir()?;
        let store = Store::open(temp.path())?;
        store.add_body(SAMPLE_REQUEST, "admin", "{\"role\":\"admin\"}", false)?;

        // set active, list bodies, remove, quit
        let mut ui = TestUi::new(vec![1, 0, 2, 0, 1, 0, 1, 1, 0, 3, 0, 3]).with_confirm(true);
        run_interactive_with_ui(options(store.clone(), vec![]), &mut ui).await?;

        assert!(ui
            .prints
            .iter()
            .any(|line| line.contains("Active body for users/get-users is now admin")));
        assert!(ui
            .prints
            .iter()
            .any(|line| line.starts_with("* admin") && line.contains("{\"role\":\"admin\"}")));
        assert!(store.list_bodies(SAMPLE_REQUEST)?.variants.is_empty());
        assert_eq!(store.load_request(SAMPLE_REQUEST)?.active_body, "");
        Ok(())
    }

    #[tokio::test]
    async fn switches_environment_and_reports_empty_documents() -> Result<()> {
        let temp = tempdir()?;
        let store = Store::open(temp.path())?;

        let mut ui = TestUi::new(vec![2, 1, 0, 3]);
        run_interactive_with_ui(options(store, vec![]), &mut ui).await?;

        assert!(ui.prints.iter().any(|line| line == "Environment: prod"));
        assert!(ui
            .prints
            .iter()
            .any(|line| line.contains("No operations in the API description")));
        Ok(())
    }
}
