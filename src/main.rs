use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use azrm::arm::auth::{AzureCliCredential, StaticTokenCredential, TokenCredential};
use azrm::arm::environment::Environment;
use azrm::arm::http::format_arm_error;
use azrm::config::{Config, OutputFormat};
use azrm::lro::{LongRunningOperation, ProgressEvent};
use azrm::models::{GenericResource, ResourceGroup, ResourceGroupPatch};
use azrm::resourceids::{GenericResourceId, ResourceGroupId, ResourceIdRegistry};
use azrm::services::{GenericResourcesClient, ListOptions, ResourceGroupsClient};
use azrm::{ArmClient, CancellationToken, PollOptions};
use clap::{Parser, Subcommand, ValueEnum};
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Environment variable holding a bearer token to use instead of the Azure CLI
const ACCESS_TOKEN_ENV: &str = "AZRM_ACCESS_TOKEN";

/// Command-line client for Azure Resource Manager
#[derive(Parser, Debug)]
#[command(name = "azrm", version = azrm::VERSION, about, long_about = None)]
struct Args {
    /// Subscription to use
    #[arg(short, long, global = true)]
    subscription: Option<String>,

    /// Azure cloud
    #[arg(long, value_enum, global = true)]
    environment: Option<Environment>,

    /// Override the resource manager endpoint (e.g. for a local emulator)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resource group operations
    #[command(subcommand)]
    Group(GroupCommands),

    /// Operations on any resource by ID
    #[command(subcommand)]
    Resource(ResourceCommands),

    /// Resource ID utilities
    #[command(subcommand)]
    Id(IdCommands),

    /// Show or change the saved configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum GroupCommands {
    /// List resource groups
    List {
        /// OData filter, e.g. "tagName eq 'env'"
        #[arg(long)]
        filter: Option<String>,
        /// Page size
        #[arg(long)]
        top: Option<u32>,
    },
    /// Show one resource group
    Show { name: String },
    /// Check whether a resource group exists
    Exists { name: String },
    /// Create or replace a resource group
    Create {
        name: String,
        #[arg(short, long)]
        location: String,
        /// Tags as key=value
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Replace the tags of a resource group
    Update {
        name: String,
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Delete a resource group and everything in it
    Delete {
        name: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ResourceCommands {
    /// Show a resource
    Show {
        id: String,
        #[arg(long)]
        api_version: String,
    },
    /// Create or replace a resource from a JSON body
    Put {
        id: String,
        #[arg(long)]
        api_version: String,
        /// JSON body, or @file to read it from a file
        #[arg(long)]
        body: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Delete a resource
    Delete {
        id: String,
        #[arg(long)]
        api_version: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// List every resource in a resource group
    List {
        #[arg(short, long)]
        group: String,
    },
}

#[derive(Subcommand, Debug)]
enum IdCommands {
    /// Identify and split a resource ID
    Parse {
        id: String,
        /// Accept any casing of fixed segments
        #[arg(short, long)]
        insensitive: bool,
    },
    /// List known resource types
    Types,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the saved configuration
    Show,
    /// Save a default subscription
    SetSubscription { subscription: String },
    /// Save a default cloud
    SetEnvironment {
        #[arg(value_enum)]
        environment: Environment,
    },
}

#[derive(clap::Args, Debug)]
struct WaitArgs {
    /// Return once the operation is accepted instead of waiting for it
    #[arg(long)]
    no_wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_tag(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("azrm {} started with log level: {:?}", azrm::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("azrm").join("azrm.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".azrm").join("azrm.log");
    }
    PathBuf::from("azrm.log")
}

fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    let value = serde_json::to_value(data)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&value)?),
    }
    Ok(())
}

fn credential() -> Arc<dyn TokenCredential> {
    match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            tracing::info!("Using bearer token from {}", ACCESS_TOKEN_ENV);
            Arc::new(StaticTokenCredential::new(token.trim()))
        }
        _ => Arc::new(AzureCliCredential::new()),
    }
}

fn build_client(
    subscription: Option<&str>,
    environment: Option<Environment>,
    endpoint: Option<&str>,
    config: &Config,
) -> Result<ArmClient> {
    let subscription = config
        .effective_subscription(subscription)
        .context("No subscription configured. Set AZURE_SUBSCRIPTION_ID, run 'az login' or use --subscription")?;
    let environment = config.effective_environment(environment);

    tracing::info!("Using subscription: {}, environment: {}", subscription, environment);

    let client = ArmClient::new(credential(), &subscription, environment)?;
    Ok(match endpoint {
        Some(endpoint) => client.with_endpoint(endpoint),
        None => client,
    })
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            token.cancel();
        }
    });
}

/// Wait for `operation` unless `--no-wait`, printing progress to stderr
async fn finish(
    operation: LongRunningOperation,
    wait: &WaitArgs,
    options: PollOptions,
    cancel: &CancellationToken,
) -> Result<Option<serde_json::Value>> {
    if wait.no_wait {
        let handle = operation.handle();
        eprintln!("Accepted: {} ({})", handle.operation, handle.polling_url);
        return Ok(None);
    }

    let operation = operation
        .with_options(options)
        .with_progress(Box::new(|event| {
            if let ProgressEvent::Polling {
                operation,
                state,
                elapsed,
            } = event
            {
                eprintln!("{}: {} ({}s)", operation, state, elapsed.as_secs());
            }
        }));

    Ok(operation.wait(cancel).await?)
}

fn read_body(raw: &str) -> Result<GenericResource> {
    let content = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&content).context("Body is not a valid resource JSON document")
}

async fn run_group(
    command: GroupCommands,
    client: ArmClient,
    config: &Config,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let groups = ResourceGroupsClient::new(client);

    match command {
        GroupCommands::List { filter, top } => {
            let options = ListOptions { filter, top };
            let pager = groups.pager();
            let items: Vec<ResourceGroup> = groups
                .list_stream(&pager, &options)
                .try_collect()
                .await
                .context("Failed to list resource groups")?;
            print_output(&items, format)
        }
        GroupCommands::Show { name } => {
            let group = groups
                .get(&name)
                .await
                .with_context(|| format!("Failed to get resource group {}", name))?;
            print_output(&group, format)
        }
        GroupCommands::Exists { name } => {
            let exists = groups.check_existence(&name).await?;
            print_output(&json!({ "name": name, "exists": exists }), format)
        }
        GroupCommands::Create {
            name,
            location,
            tags,
        } => {
            let group = tags
                .iter()
                .fold(ResourceGroup::new(&location), |g, (k, v)| g.with_tag(k, v));
            let created = groups
                .create_or_update(&name, &group)
                .await
                .with_context(|| format!("Failed to create resource group {}", name))?;
            print_output(&created, format)
        }
        GroupCommands::Update { name, tags } => {
            let patch = ResourceGroupPatch {
                tags: Some(tags.into_iter().collect()),
                ..Default::default()
            };
            let updated = groups
                .update(&name, &patch)
                .await
                .with_context(|| format!("Failed to update resource group {}", name))?;
            print_output(&updated, format)
        }
        GroupCommands::Delete { name, wait } => {
            let operation = groups
                .begin_delete(&name)
                .await
                .with_context(|| format!("Failed to delete resource group {}", name))?;
            finish(operation, &wait, config.poll_options(wait.timeout), cancel).await?;
            if !wait.no_wait {
                eprintln!("Deleted resource group {}", name);
            }
            Ok(())
        }
    }
}

async fn run_resource(
    command: ResourceCommands,
    client: ArmClient,
    config: &Config,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let subscription = client.subscription_id.clone();
    let resources = GenericResourcesClient::new(client);

    match command {
        ResourceCommands::Show { id, api_version } => {
            let resource = resources
                .get_by_id(&id, &api_version)
                .await
                .with_context(|| format!("Failed to get {}", id))?;
            print_output(&resource, format)
        }
        ResourceCommands::Put {
            id,
            api_version,
            body,
            wait,
        } => {
            let resource = read_body(&body)?;
            let operation = resources
                .begin_create_or_update_by_id(&id, &api_version, &resource)
                .await
                .with_context(|| format!("Failed to create {}", id))?;
            match finish(operation, &wait, config.poll_options(wait.timeout), cancel).await? {
                Some(result) => print_output(&result, format),
                None => Ok(()),
            }
        }
        ResourceCommands::Delete {
            id,
            api_version,
            wait,
        } => {
            let operation = resources
                .begin_delete_by_id(&id, &api_version)
                .await
                .with_context(|| format!("Failed to delete {}", id))?;
            finish(operation, &wait, config.poll_options(wait.timeout), cancel).await?;
            if !wait.no_wait {
                eprintln!("Deleted {}", id);
            }
            Ok(())
        }
        ResourceCommands::List { group } => {
            let group = ResourceGroupId::new(&subscription, &group);
            let items = resources
                .pager()
                .complete(&resources.list_by_resource_group_url(&group), |_| true)
                .await
                .with_context(|| format!("Failed to list resources in {}", group))?;
            print_output(&items, format)
        }
    }
}

fn load_registry(config: &Config) -> Result<ResourceIdRegistry> {
    let mut registry = ResourceIdRegistry::builtin()?;
    if let Some(path) = &config.resource_types_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource types from {:?}", path))?;
        let added = registry.load_json(&content)?;
        tracing::info!("Loaded {} resource types from {:?}", added, path);
    }
    Ok(registry)
}

fn run_id(command: IdCommands, config: &Config, format: OutputFormat) -> Result<()> {
    let registry = load_registry(config)?;

    match command {
        IdCommands::Parse { id, insensitive } => {
            let parsed = match registry.identify(&id) {
                Some((id_type, result)) => {
                    if !insensitive {
                        // Surface casing mismatches in fixed segments
                        id_type.parse(&id, false)?;
                    }
                    json!({
                    "resourceType": id_type.resource_type,
                    "displayName": id_type.display_name,
                    "pattern": id_type.pattern(),
                    "apiVersion": id_type.api_version,
                    "values": result
                        .values
                        .iter()
                        .map(|(name, value)| (name.clone(), json!(value)))
                        .collect::<serde_json::Map<_, _>>(),
                    })
                }
                None => {
                    let generic = GenericResourceId::parse(&id)
                        .with_context(|| format!("'{}' is not a recognised resource ID", id))?;
                    json!({
                        "resourceType": generic.resource_type(),
                        "name": generic.name(),
                        "resourceGroup": generic.resource_group_name,
                        "subscriptionId": generic.subscription_id,
                        "parent": generic.parent().map(|p| p.id()),
                    })
                }
            };
            print_output(&parsed, format)
        }
        IdCommands::Types => print_output(&registry.resource_types(), format),
    }
}

fn run_config(command: ConfigCommands, mut config: Config, format: OutputFormat) -> Result<()> {
    match command {
        ConfigCommands::Show => print_output(&config, format),
        ConfigCommands::SetSubscription { subscription } => {
            config.set_subscription(&subscription)?;
            eprintln!("Default subscription set to {}", subscription);
            Ok(())
        }
        ConfigCommands::SetEnvironment { environment } => {
            config.set_environment(environment)?;
            eprintln!("Default environment set to {}", environment);
            Ok(())
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load();
    let format = config.effective_output(args.output);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let Args {
        subscription,
        environment,
        endpoint,
        command,
        ..
    } = args;
    let connect = || build_client(subscription.as_deref(), environment, endpoint.as_deref(), &config);

    match command {
        Commands::Group(command) => run_group(command, connect()?, &config, format, &cancel).await,
        Commands::Resource(command) => {
            run_resource(command, connect()?, &config, format, &cancel).await
        }
        Commands::Id(command) => run_id(command, &config, format),
        Commands::Config(command) => run_config(command, config.clone(), format),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<azrm::Error>() {
                Some(arm_error) => eprintln!("Error: {}\n  {}", err, format_arm_error(arm_error)),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
