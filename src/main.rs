use anyhow::Result;
use clap::{Parser, Subcommand};
use cloudmap::cli::{CoerceCommand, ListCommand, PathCommand, RenderCommand};
use cloudmap::commands::CommandRegistry;
use cloudmap::config::Config;
use cloudmap::context::Context;
use cloudmap::mapping::TypeTag;
use cloudmap::output;
use cloudmap::traits::RealFileSystem;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudmap")]
#[command(about = "Declarative parameter-to-request mapping for cloud resource commands", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file (defaults to ~/.cloudmap/config.yaml)
    #[arg(long, global = true, env = "CLOUDMAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Coerce raw values with a type tag and print the result
    Coerce {
        /// Type tag, e.g. int64, six-digit-string, port-mappings
        #[arg(short, long)]
        tag: TypeTag,

        /// JSON file used as template data for templated content
        #[arg(long)]
        template_data: Option<PathBuf>,

        /// Values to coerce; more than one is treated as a list
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Render the request a command would send (dry run)
    Render {
        /// Command name, e.g. create-instance
        command: String,

        /// Parameters as key=value (repeat a key to pass a list)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// JSON file used as template data for user data and templates
        #[arg(long)]
        template_data: Option<PathBuf>,
    },

    /// List the available commands and their parameters
    Commands,

    /// Parse a field path and print its steps
    Path {
        /// Field path, e.g. Instances[0]InstanceId or Tags[Name]
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&RealFileSystem, cli.config.as_deref())?;
    let ctx = Context::new(config);

    match cli.command {
        Commands::Coerce {
            tag,
            template_data,
            values,
        } => {
            CoerceCommand::execute(&ctx, tag, &values, template_data.as_deref())?;
        }
        Commands::Render {
            command,
            params,
            template_data,
        } => {
            let registry = CommandRegistry::with_defaults()?;
            RenderCommand::execute(&ctx, &registry, &command, &params, template_data.as_deref())?;
        }
        Commands::Commands => {
            let registry = CommandRegistry::with_defaults()?;
            ListCommand::execute(&ctx, &registry)?;
        }
        Commands::Path { path } => {
            PathCommand::execute(&ctx, &path)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
