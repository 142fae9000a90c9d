use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scene_script_service::api::{ApiServer, AppState};
use scene_script_service::script::PromptTemplate;
use scene_script_service::{create_llm, Config, ConfigBuilder, ScriptRequestor, ServiceError};

fn cli() -> Command {
    Command::new("Scene Script Service")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Short-video script generation and scene image-prompt extraction")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML)")
                .global(true)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true)
        )
        .subcommand(
            Command::new("serve")
                .about("Start the HTTP API")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Address to bind")
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on")
                        .value_parser(clap::value_parser!(u16))
                )
        )
        .subcommand(
            Command::new("extract")
                .about("Print the scene image prompts found in a script file")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("Script text file")
                        .required(true)
                )
        )
        .subcommand(
            Command::new("init-config")
                .about("Write a configuration file with default settings")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Where to write the file")
                        .default_value("scene-script.toml")
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help("Overwrite an existing file")
                        .action(ArgAction::SetTrue)
                )
                .arg(Arg::new("host").long("host").value_name("HOST").help("Address to bind"))
                .arg(
                    Arg::new("port")
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on")
                        .value_parser(clap::value_parser!(u16))
                )
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .value_name("PROVIDER")
                        .help("Generation backend (openai, lmstudio)")
                )
                .arg(Arg::new("model").long("model").value_name("MODEL").help("Model name"))
                .arg(
                    Arg::new("template")
                        .long("template")
                        .value_name("VERSION")
                        .help("Prompt template version (v1, v2)")
                )
                .arg(
                    Arg::new("response-mode")
                        .long("response-mode")
                        .value_name("MODE")
                        .help("Output contract (text, structured)")
                )
                .arg(
                    Arg::new("min-scenes")
                        .long("min-scenes")
                        .value_name("N")
                        .value_parser(clap::value_parser!(u8))
                        .requires("max-scenes")
                )
                .arg(
                    Arg::new("max-scenes")
                        .long("max-scenes")
                        .value_name("N")
                        .value_parser(clap::value_parser!(u8))
                        .requires("min-scenes")
                )
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let (command, args) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("No command given"))?;

    if command == "init-config" {
        init_logging("info", args.get_flag("verbose"));
        return init_config(args);
    }

    let config_path = args
        .get_one::<String>("config")
        .cloned()
        .or_else(|| Config::find_config_file().map(String::from));

    let config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::from_env()?,
    };

    init_logging(&config.logging.log_level, args.get_flag("verbose"));

    match &config_path {
        Some(path) => info!("📄 Loaded configuration from: {}", path),
        None => info!("📄 No configuration file found, using defaults"),
    }

    match command {
        "serve" => serve(config, args).await,
        "extract" => extract(&config, args).await,
        other => Err(anyhow!("Unknown command: {}", other)),
    }
}

fn init_logging(log_level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("scene_script_service={level},tower_http={level},warn"))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(mut config: Config, args: &ArgMatches) -> Result<()> {
    if let Some(host) = args.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = args.get_one::<u16>("port") {
        config.server.port = *port;
    }

    // Missing credentials stop the process here, not on the first request
    config.validate()?;
    info!("{}", config.summary());

    let llm = create_llm(&config.llm).context("Failed to create generation backend client")?;
    if !llm.is_available().await {
        warn!("⚠️ Generation backend is not reachable, script requests will fail until it is");
    }

    let requestor = ScriptRequestor::new(Arc::from(llm), &config.script);
    let server = ApiServer::new(AppState::new(requestor), config.server.host.clone(), config.server.port);

    server.start().await
}

async fn extract(config: &Config, args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("file")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("No script file given"))?;

    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;

    let extractor = PromptTemplate::new(config.script.template).extractor();
    let prompts = extractor.extract(&text);

    if prompts.is_empty() {
        return Err(ServiceError::NoPromptsFound.into());
    }

    info!("🖼️ Found {} scene prompts in {}", prompts.len(), path.display());
    println!("{}", serde_json::to_string_pretty(&prompts)?);

    Ok(())
}

fn init_config(args: &ArgMatches) -> Result<()> {
    let output = args
        .get_one::<String>("output")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("No output file given"))?;

    if output.exists() && !args.get_flag("force") {
        return Err(anyhow!(
            "{} already exists, pass --force to overwrite it",
            output.display()
        ));
    }

    let config = config_from_args(args)?;
    config.validate_settings()?;
    config.save(&output)?;

    println!("Wrote {}. Set OPENAI_API_KEY in the environment before running serve.", output.display());
    Ok(())
}

/// Default configuration with the `init-config` flags applied
fn config_from_args(args: &ArgMatches) -> Result<Config> {
    let mut builder = ConfigBuilder::new();

    if let Some(host) = args.get_one::<String>("host") {
        builder = builder.with_host(host.as_str());
    }
    if let Some(port) = args.get_one::<u16>("port") {
        builder = builder.with_port(*port);
    }
    if let Some(provider) = args.get_one::<String>("provider") {
        builder = builder.with_provider(provider.parse()?);
    }
    if let Some(model) = args.get_one::<String>("model") {
        builder = builder.with_model(model.as_str());
    }
    if let Some(template) = args.get_one::<String>("template") {
        builder = builder.with_template(template.parse().map_err(|e: String| anyhow!(e))?);
    }
    if let Some(mode) = args.get_one::<String>("response-mode") {
        builder = builder.with_response_mode(mode.parse().map_err(|e: String| anyhow!(e))?);
    }
    if let (Some(min), Some(max)) = (args.get_one::<u8>("min-scenes"), args.get_one::<u8>("max-scenes")) {
        builder = builder.with_scene_limits(*min, *max);
    }

    Ok(builder.build())
}
