use clap::{Parser, Subcommand};
use labflow_core::constants::{CODE_TABLE_ENV, ENRICH_ENV};
use labflow_core::{CoreConfig, PipelineOptions, ResultPipeline};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "labflow")]
#[command(about = "Lab result ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and print the full output as JSON
    Parse {
        /// Path to an ER7 message file
        file: PathBuf,
        /// Request enrichment (recorded only; output is always deterministic)
        #[arg(long)]
        enrich: bool,
    },
    /// Print only the resource bundle as JSON
    Bundle {
        /// Path to an ER7 message file
        file: PathBuf,
    },
    /// Print the parsed message header as JSON
    Header {
        /// Path to an ER7 message file
        file: PathBuf,
    },
    /// Print the plain-text clinical summary
    Summary {
        /// Path to an ER7 message file
        file: PathBuf,
    },
    /// Send a message over MLLP and print the acknowledgement
    Send {
        /// Path to an ER7 message file
        file: PathBuf,
        /// Listener address
        #[arg(long, default_value = "127.0.0.1:2575")]
        addr: String,
        /// Seconds to wait for the acknowledgement
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

fn read_message(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()).into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("labflow_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = CoreConfig::from_env_values(
        std::env::var(CODE_TABLE_ENV).ok(),
        std::env::var(ENRICH_ENV).ok(),
    )?;
    let pipeline = ResultPipeline::from_config(&cfg);

    match cli.command {
        Some(Commands::Parse { file, enrich }) => {
            let options = PipelineOptions {
                enrich: enrich || cfg.options().enrich,
            };
            let output = pipeline.run(&read_message(&file)?, &options)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Some(Commands::Bundle { file }) => {
            let output = pipeline.run(&read_message(&file)?, cfg.options())?;
            println!("{}", output.bundle.render()?);
        }
        Some(Commands::Header { file }) => {
            let header = er7::Header::parse(&read_message(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&header)?);
        }
        Some(Commands::Summary { file }) => {
            let output = pipeline.run(&read_message(&file)?, cfg.options())?;
            println!("{}", output.summary);
        }
        Some(Commands::Send {
            file,
            addr,
            timeout,
        }) => {
            let message = read_message(&file)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let ack = runtime.block_on(mllp::client::send(
                addr.as_str(),
                &message,
                Some(Duration::from_secs(timeout)),
            ))?;
            for segment in er7::message::split_segments(&ack) {
                println!("{segment}");
            }
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}
