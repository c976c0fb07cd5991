use clap::{Parser, Subcommand};
use reqwest::Client;

use roleta_shared::{ApiError, GenerateLinkResponse, RedemptionRecord, ValidateResponse};

#[derive(Parser)]
#[command(name = "roleta-cli", about = "Admin CLI for the roleta spin-link server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Server base URL, default http://127.0.0.1:8080
    #[arg(long, env = "SERVER_URL", default_value = "http://127.0.0.1:8080")]
    server_url: String,
    /// Admin API key (sent as a bearer token)
    #[arg(long, env = "API_KEY", default_value = "dev-key")]
    api_key: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue fresh spin links and print them
    GenerateLink {
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Check whether a link is still redeemable
    Validate { id: String },
    /// View last N redemption records
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: usize,
    },
    /// Export redemption records to CSV path
    ExportCsv { path: String },
}

async fn fetch_redemptions(
    client: &Client,
    base: &str,
    api_key: &str,
) -> anyhow::Result<Vec<RedemptionRecord>> {
    let resp = client
        .get(format!("{base}/api/admin/redemptions"))
        .bearer_auth(api_key)
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(ApiError::Invalid(format!("server answered {}", resp.status())).into());
    }
    Ok(resp.json().await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::GenerateLink { count } => {
            for _ in 0..count {
                let resp = client
                    .post(format!("{}/api/generate-link", cli.server_url))
                    .bearer_auth(&cli.api_key)
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    return Err(
                        ApiError::Invalid(format!("server answered {}", resp.status())).into(),
                    );
                }
                let issued: GenerateLinkResponse = resp.json().await?;
                println!("{}  expires {}", issued.link, issued.expires_at.to_rfc3339());
            }
        }
        Commands::Validate { id } => {
            let resp: ValidateResponse = client
                .get(format!("{}/api/validate-spin/{}", cli.server_url, id))
                .send()
                .await?
                .json()
                .await?;
            if resp.valid {
                println!("{id}: valid");
            } else {
                println!(
                    "{id}: invalid ({})",
                    resp.error.unwrap_or_else(|| "unknown".into())
                );
            }
        }
        Commands::ViewLogs { n } => {
            let records = fetch_redemptions(&client, &cli.server_url, &cli.api_key).await?;
            for r in records.iter().rev().take(n) {
                println!("{} link={} prize={}", r.ts.to_rfc3339(), r.link_id, r.prize);
            }
        }
        Commands::ExportCsv { path } => {
            let records = fetch_redemptions(&client, &cli.server_url, &cli.api_key).await?;
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record(["ts", "link_id", "prize"])?;
            for r in &records {
                wtr.write_record([r.ts.to_rfc3339(), r.link_id.clone(), r.prize.clone()])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", records.len(), path);
        }
    }

    Ok(())
}
