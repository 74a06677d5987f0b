use clap::Parser;
use dotenvy::dotenv;
use nbscan::client::{ClientError, collect_and_package, upload_archive};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Package notebooks and submit them for scanning", long_about = None)]
struct Args {
    /// Directory to search for .ipynb files
    #[arg(short, long, default_value = "./")]
    source: PathBuf,

    /// Output ZIP file path
    #[arg(short, long, default_value = "./notebooks.zip")]
    output: PathBuf,

    /// Send the archive to the scan service after packaging
    #[arg(long)]
    upload: bool,

    /// Scan endpoint URL
    #[arg(long, default_value = "http://127.0.0.1:8000/scan-zip/")]
    api_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nbscan=info,nbscan_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Step 1: Create ZIP
    let source = args.source.clone();
    let output = args.output.clone();
    let packaged =
        tokio::task::spawn_blocking(move || collect_and_package(&source, &output)).await??;
    info!("📦 Packaged {} notebook(s)", packaged);

    if !args.upload {
        return Ok(());
    }

    // Step 2: Send ZIP to API
    match upload_archive(&args.output, &args.api_url).await {
        Ok(response) => {
            println!("API Response: {}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(ClientError::Rejected { status, body }) => {
            error!("❌ Scan request rejected");
            println!("Error: {} {}", status, body);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
