//! Campus Pulse CLI
//!
//! Command-line interface for the Campus Pulse feedback portal.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod validator;

use commands::{run_seed, run_server, ServeConfig};
use config::AppConfig;
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "campus-pulse")]
#[command(author = "Campus Pulse Team")]
#[command(version)]
#[command(about = "Role-based feedback collection for an academic institute", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Database URL, sqlite:// or postgres:// (overrides config)
        #[arg(short, long)]
        database: Option<String>,

        /// Disable Swagger UI
        #[arg(long)]
        no_swagger: bool,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        validate_only: bool,
    },

    /// Run migrations, create the admin account, and load the demo dataset
    Seed {
        /// Database URL, sqlite:// or postgres:// (overrides config)
        #[arg(short, long)]
        database: Option<String>,

        /// Only create the admin account, skip the demo dataset
        #[arg(long)]
        admin_only: bool,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Show {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    cp_observability::init_logging_with_config(cp_observability::LoggingConfig {
        level: log_level,
        format: if cli.format == OutputFormat::Json {
            cp_observability::LogFormat::Json
        } else {
            cp_observability::LogFormat::Plain
        },
        ..Default::default()
    });

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path).unwrap_or_else(|_| {
        if cli.verbose {
            eprintln!("Using default configuration (no config file found)");
        }
        AppConfig::default()
    });
    config.apply_env_overrides();

    // Execute command
    match cli.command {
        Commands::Serve {
            port,
            host,
            database,
            no_swagger,
            validate_only,
        } => {
            let serve_config = ServeConfig {
                port: port.unwrap_or(config.server.port),
                host: host.unwrap_or_else(|| config.server.host.clone()),
                database_url: database.unwrap_or_else(|| config.database.url.clone()),
                enable_swagger: !no_swagger,
                timeout_secs: 30,
            };
            cmd_serve(serve_config, config, validate_only).await
        }
        Commands::Seed {
            database,
            admin_only,
        } => {
            let database_url = database.unwrap_or_else(|| config.database.url.clone());
            run_seed(&database_url, &config.institute.domain, admin_only).await
        }
        Commands::Config { action } => match action {
            ConfigCommands::Validate { config: cfg_path } => {
                cmd_validate(cfg_path.unwrap_or(config_path)).await
            }
            ConfigCommands::Show { show_secrets } => {
                cmd_config(config, show_secrets, cli.format).await
            }
        },
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "campus-pulse", "campus-pulse") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/default.yaml")
    }
}

async fn cmd_serve(
    serve_config: ServeConfig,
    app_config: AppConfig,
    validate_only: bool,
) -> Result<()> {
    println!("{}", "Validating configuration...".cyan());

    // Run configuration validation
    let validation_result = ConfigValidator::validate(&app_config);
    validation_result.print();

    // If validate_only mode, exit after validation
    if validate_only {
        if validation_result.has_errors() {
            println!();
            println!(
                "{}",
                "Configuration validation failed. Fix the errors above before starting the server."
                    .red()
                    .bold()
            );
            std::process::exit(1);
        } else {
            println!();
            println!(
                "{}",
                "Configuration is valid. Server can be started."
                    .green()
                    .bold()
            );
            return Ok(());
        }
    }

    // If there are errors, refuse to start
    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Server startup aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    println!();
    run_server(serve_config, app_config).await
}

async fn cmd_validate(config_path: PathBuf) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    // First, check if the file can be loaded
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("{}: {}", "Configuration file error".red().bold(), e);
            std::process::exit(1);
        }
    };

    // Run comprehensive validation
    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    // Summary
    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.database.url);
    println!("  Institute domain: {}", config.institute.domain);
    println!(
        "  Session: cookie {} ({}s expiry)",
        config.session.cookie_name, config.session.expiry_seconds
    );
    println!(
        "  Logging: {} ({})",
        config.logging.level, config.logging.format
    );

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    } else if validation_result.has_warnings() {
        println!();
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!();
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}

async fn cmd_config(config: AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        println!(
            "Server: {}:{}",
            display_config.server.host, display_config.server.port
        );
        println!("Database: {}", display_config.database.url);
        println!(
            "Logging: {} ({})",
            display_config.logging.level, display_config.logging.format
        );
        println!(
            "Session: cookie {} expires after {}s{}",
            display_config.session.cookie_name,
            display_config.session.expiry_seconds,
            if display_config.session.secure {
                ", Secure"
            } else {
                ""
            }
        );
        println!("Institute domain: {}", display_config.institute.domain);
        println!(
            "Default student password: {}",
            display_config.institute.default_student_password
        );
    }

    Ok(())
}
