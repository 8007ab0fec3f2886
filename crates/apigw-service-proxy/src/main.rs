//! CLI for `apigw-service-proxy`.
//!
//! # Subcommands
//!
//! ```text
//! # Compile the proxies into a new template (or extend an existing one)
//! apigw-service-proxy compile --config serverless.yml --output template.json
//! apigw-service-proxy compile --config serverless.yml \
//!   --template cloudformation-template-update-stack.json \
//!   --output cloudformation-template-update-stack.json
//!
//! # Check the proxy list without compiling
//! apigw-service-proxy validate --config serverless.yml
//!
//! # Print the endpoint URLs of a deployed stage
//! apigw-service-proxy info --config serverless.yml --rest-api-id abc123
//! ```

#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use apigw_service_proxy::{ProjectConfig, ServiceProxyCompiler, Template};
use clap::Parser;

/// Compile API Gateway service proxies into CloudFormation resources.
#[derive(Parser)]
#[command(name = "apigw-service-proxy", version, about)]
struct Cli {
    /// Log every compiled resource.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Compile the configured proxies into a CloudFormation template.
    Compile(CompileArgs),

    /// Validate the configured proxies.
    Validate(ConfigArgs),

    /// Print the endpoints of a deployed stage.
    Info(InfoArgs),
}

#[derive(Parser)]
struct ConfigArgs {
    /// Path to the project config (`serverless.yml`).
    #[arg(short, long, default_value = "serverless.yml")]
    config: PathBuf,
}

#[derive(Parser)]
struct CompileArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Existing JSON template to extend. Defaults to an empty template.
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Where to write the compiled template. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Deployment instance token. Defaults to the current time in milliseconds.
    #[arg(long)]
    instance_id: Option<String>,
}

#[derive(Parser)]
struct InfoArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Id of the deployed REST API.
    #[arg(long)]
    rest_api_id: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Command::Compile(args) => run_compile(&args),
        Command::Validate(args) => run_validate(&args),
        Command::Info(args) => run_info(&args),
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("apigw_service_proxy=debug,apigw_service_proxy_core=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_project(args: &ConfigArgs) -> anyhow::Result<ProjectConfig> {
    tracing::info!(path = %args.config.display(), "loading config");
    ProjectConfig::load(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))
}

fn run_compile(args: &CompileArgs) -> anyhow::Result<()> {
    let project = load_project(&args.config)?;

    let mut template = match &args.template {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read template: {}", path.display()))?;
            Template::from_json_str(&json)
                .with_context(|| format!("Failed to parse template: {}", path.display()))?
        }
        None => Template::new(),
    };

    let instance_id = args
        .instance_id
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());

    let report = ServiceProxyCompiler::new(project.context(instance_id))
        .compile(project.service_proxies(), &mut template)
        .context("Failed to compile service proxies")?;

    let output = template
        .to_json_pretty()
        .context("Failed to serialize template")?;
    match &args.output {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!(
                "Compiled {} service proxies ({} methods) into {}",
                report.events,
                report.method_ids.len(),
                path.display()
            );
        }
        None => println!("{output}"),
    }

    Ok(())
}

fn run_validate(args: &ConfigArgs) -> anyhow::Result<()> {
    let project = load_project(args)?;
    let proxies = apigw_service_proxy::parse(project.service_proxies())
        .context("Invalid service proxy configuration")?;
    eprintln!("{} service proxies are valid", proxies.len());
    Ok(())
}

fn run_info(args: &InfoArgs) -> anyhow::Result<()> {
    let project = load_project(&args.config)?;
    let proxies = apigw_service_proxy::parse(project.service_proxies())
        .context("Invalid service proxy configuration")?;
    let normalized = apigw_service_proxy::normalize(&proxies);

    let endpoint = apigw_service_proxy::service_endpoint(
        &args.rest_api_id,
        &project.provider.region,
        &project.provider.stage,
    );
    println!(
        "{}",
        apigw_service_proxy::endpoint_report(&normalized.events, &endpoint)
    );
    Ok(())
}
