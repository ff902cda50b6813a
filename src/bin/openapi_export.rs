use std::{fs, path::PathBuf};

use bititec_api::openapi::ApiDocV1;
use clap::Parser;
use utoipa::OpenApi;

/// Writes the OpenAPI document to disk
#[derive(Debug, Parser)]
#[command(name = "openapi-export")]
struct Cli {
    #[arg(long, default_value = "openapi/bititec-api.v1.json")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let json = serde_json::to_string_pretty(&ApiDocV1::openapi())?;

    if let Some(dir) = cli.output.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&cli.output, json)?;

    println!("OpenAPI spec written to {}", cli.output.display());
    Ok(())
}
