mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ds_av::tools::FFMPEG;
use ds_av::{FfmpegFrameExtractor, FrameExtractor, ToolRegistry};
use ds_core::config::Config;
use ds_core::{DeviceId, PathResolver, StreamKind};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use defaults based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "devstream=trace,ds_server=trace,ds_av=trace,ds_core=debug,tower_http=debug".to_string()
        } else {
            "devstream=debug,ds_server=debug,ds_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Resolve { device, kind, json } => {
            resolve(&device, kind.map(Into::into), json, cli.config.as_deref())
        }
        Commands::Frames { device, count } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(extract_frames(&device, count, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("devstream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::discover(path).context("failed to load configuration")
}

fn parse_device(raw: &str) -> Result<DeviceId> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("invalid device id (expected a UUID): {raw}"))
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(
        "Starting devstream on {}:{}",
        config.server.host,
        config.server.port
    );

    ds_server::start(config).await?;
    Ok(())
}

fn resolve(device: &str, kind: Option<StreamKind>, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let resolver = PathResolver::new(&config.streams)?;
    let device = parse_device(device)?;

    let kinds: Vec<StreamKind> = match kind {
        Some(k) => vec![k],
        None => StreamKind::ALL.to_vec(),
    };
    let locations: Vec<_> = kinds.into_iter().map(|k| resolver.resolve(device, k)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&locations)?);
    } else {
        for loc in &locations {
            println!("{:<5} {}", loc.kind.as_str(), loc.location);
        }
    }
    Ok(())
}

async fn extract_frames(device: &str, count: i64, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let device = parse_device(device)?;
    let resolver = Arc::new(PathResolver::new(&config.streams)?);
    let tools = ToolRegistry::discover(&config.tools);

    let extractor = FfmpegFrameExtractor::new(resolver, &tools, &config.frames);
    let result = extractor.extract(device, count).await?;

    if !result.success {
        anyhow::bail!("frame extraction failed for device {device}");
    }
    println!("{}", serde_json::to_string_pretty(&result.uris)?);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = load_config(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);

    for tool in tools.check_all() {
        let status = if tool.available { "✓" } else { "✗" };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    match tools.require(FFMPEG) {
        Ok(path) => println!(
            "All required tools are available! Transcoder: {}",
            path.display()
        ),
        Err(e) => println!("{e}. Frame extraction will fail until it is installed."),
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {}", p.display()),
        None => println!("No config file specified, searching default locations"),
    }

    let config = load_config(path)?;
    PathResolver::new(&config.streams).context("stream configuration is unusable")?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Manifest base: {}", config.streams.manifest_base_url);
    println!("  RTMP base: {}", config.streams.rtmp_base_url);
    println!("  Frames dir: {}", config.streams.frames_dir.display());
    match config.registry.base_url.as_deref() {
        Some(url) => println!("  Registry: {url}"),
        None => println!("  Registry: static ({} device(s))", config.registry.devices.len()),
    }

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}
