use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use apiman::config::{load_config, Workspace};
use apiman::executor::{body_preview, print_execution_result, run_request};
use apiman::generator::generate_requests;
use apiman::interactive::{run_interactive, InteractiveOptions};
use apiman::openapi::load_spec;
use apiman::store::{Store, ROOT_GROUP};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "APIMAN_LOG";
const PREVIEW_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(
    name = "apiman",
    version,
    about = "Filesystem-backed API request manager",
    disable_help_subcommand = true
)]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Directory or file containing apiman.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory to store response bodies
    #[arg(long = "output", short = 'O', global = true)]
    output: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the workspace directories and seed defaults
    Init,
    /// Generate request files from an OpenAPI description
    Generate {
        #[arg(value_name = "SPEC")]
        spec: PathBuf,
        /// Overwrite requests that already exist
        #[arg(short, long)]
        force: bool,
    },
    /// Execute a saved request
    Run {
        /// Logical request path, e.g. users/get-users
        #[arg(value_name = "REQUEST")]
        request: String,
        /// Environment name (defaults to the configured default, else dev)
        #[arg(value_name = "ENV")]
        env: Option<String>,
    },
    /// List saved requests grouped by folder
    List,
    /// List environments
    Envs,
    /// Browse an OpenAPI description interactively
    Tui {
        #[arg(value_name = "SPEC")]
        spec: PathBuf,
        /// Environment to start with
        #[arg(short, long)]
        env: Option<String>,
    },
    /// Manage body variants of a request
    Body {
        #[command(subcommand)]
        action: BodyCommand,
    },
    /// Delete a saved request and its body variants
    Delete {
        #[arg(value_name = "REQUEST")]
        request: String,
    },
}

#[derive(Subcommand, Debug)]
enum BodyCommand {
    /// List body variants, marking the active one
    List {
        #[arg(value_name = "REQUEST")]
        request: String,
    },
    /// Make a variant the active body
    Set {
        #[arg(value_name = "REQUEST")]
        request: String,
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Delete a variant
    Remove {
        #[arg(value_name = "REQUEST")]
        request: String,
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Add a variant, copied from a file or from the inline body
    Add {
        #[arg(value_name = "REQUEST")]
        request: String,
        #[arg(value_name = "NAME")]
        name: String,
        /// Read the variant contents from this file
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
        /// Replace an existing variant
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli
        .cwd
        .as_ref()
        .map(|p| resolve_path(Path::new(p)))
        .transpose()?
        .unwrap_or(std::env::current_dir()?);

    let config_target = cli
        .config
        .as_ref()
        .map(|p| resolve_relative(&root, p))
        .unwrap_or_else(|| root.clone());
    let cfg = load_config(&config_target).context("loading configuration")?;

    let output_override = cli.output.as_ref().map(|p| resolve_relative(&root, p));
    let workspace = Workspace::resolve(root.clone(), cfg.as_ref(), output_override);
    let store = workspace.open_store()?;

    match cli.command {
        Commands::Init => {
            println!(
                "{} workspace at {}",
                "Initialized".green().bold(),
                workspace.root.display()
            );
            println!("  requests:     {}", store.requests_dir().display());
            println!("  environments: {}", store.environments_dir().display());
        }
        Commands::Generate { spec, force } => {
            let spec_path = resolve_relative(&root, &spec);
            let doc = load_spec(&spec_path)
                .with_context(|| format!("loading API description {}", spec_path.display()))?;
            let summary = generate_requests(&store, &doc, force)?;
            for path in &summary.created {
                println!("  {} {}", "+".green(), path);
            }
            for path in &summary.skipped {
                println!("  {} {} {}", "=".dimmed(), path, "(exists)".dimmed());
            }
            println!(
                "Generated {} request(s), skipped {}",
                summary.created.len(),
                summary.skipped.len()
            );
        }
        Commands::Run { request, env } => {
            let env_name = env.unwrap_or_else(|| workspace.default_environment.clone());
            let result = run_request(&store, &request, &env_name, &workspace.execution_options())
                .await
                .with_context(|| format!("running {request} against {env_name}"))?;
            print_execution_result(&result);
        }
        Commands::List => print_requests(&store)?,
        Commands::Envs => print_environments(&store, &workspace.default_environment)?,
        Commands::Tui { spec, env } => {
            let spec_path = resolve_relative(&root, &spec);
            let document = load_spec(&spec_path)
                .with_context(|| format!("loading API description {}", spec_path.display()))?;
            run_interactive(InteractiveOptions {
                store,
                document,
                environment: env.unwrap_or_else(|| workspace.default_environment.clone()),
                execution: workspace.execution_options(),
            })
            .await?;
        }
        Commands::Body { action } => handle_body(&store, action, &root)?,
        Commands::Delete { request } => {
            store
                .delete_request(&request)
                .with_context(|| format!("deleting {request}"))?;
            println!("Deleted {request}");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "apiman=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_requests(store: &Store) -> Result<()> {
    let groups = store.list_requests()?;
    if groups.is_empty() {
        println!("No requests under {}", store.requests_dir().display());
        return Ok(());
    }

    for (group, paths) in &groups {
        let heading = if group == ROOT_GROUP { "(root)" } else { group.as_str() };
        println!("{}", heading.bold());
        for path in paths {
            match store.load_request(path) {
                Ok(record) => {
                    let mut line = format!("  {:<7} {}  {}", record.method, path, record.url.cyan());
                    if !record.description.is_empty() {
                        line.push_str(&format!("  {}", record.description.dimmed()));
                    }
                    println!("{line}");
                }
                Err(err) => println!("  {:<7} {}  {}", "?", path, err.to_string().red()),
            }
        }
    }
    Ok(())
}

fn print_environments(store: &Store, default_env: &str) -> Result<()> {
    for name in store.list_environments()? {
        let marker = if name == default_env { "*" } else { " " };
        match store.load_environment(&name) {
            Ok(env) => println!("{marker} {:<12} {}", name, env.base_url.cyan()),
            Err(err) => println!("{marker} {:<12} {}", name, err.to_string().red()),
        }
    }
    Ok(())
}

fn handle_body(store: &Store, action: BodyCommand, root: &Path) -> Result<()> {
    match action {
        BodyCommand::List { request } => {
            let listing = store.list_bodies(&request)?;
            if listing.variants.is_empty() {
                println!("No body variants for {request}");
                return Ok(());
            }
            for name in &listing.variants {
                let marker = if listing.is_active(name) {
                    "*".green().to_string()
                } else {
                    " ".to_string()
                };
                let preview = store
                    .read_body(&request, name)
                    .map(|text| body_preview(&text, PREVIEW_WIDTH))
                    .unwrap_or_default();
                println!("{marker} {:<16} {}", name, preview.dimmed());
            }
        }
        BodyCommand::Set { request, name } => {
            store
                .set_active_body(&request, &name)
                .with_context(|| format!("activating body {name} for {request}"))?;
            println!("Active body for {request} is now {name}");
        }
        BodyCommand::Remove { request, name } => {
            store
                .remove_body(&request, &name)
                .with_context(|| format!("removing body {name} from {request}"))?;
            println!("Removed body {name} from {request}");
        }
        BodyCommand::Add {
            request,
            name,
            from,
            force,
        } => {
            let contents = match from {
                Some(file) => {
                    let path = resolve_relative(root, &file);
                    fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?
                }
                None => {
                    let record = store.load_request(&request)?;
                    if record.body.is_empty() {
                        "{}".to_string()
                    } else {
                        record.body
                    }
                }
            };
            store
                .add_body(&request, &name, &contents, force)
                .with_context(|| format!("adding body {name} to {request}"))?;
            println!("Added body {name} to {request}");
        }
    }
    Ok(())
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
