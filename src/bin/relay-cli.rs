use clap::{Parser, Subcommand};
use percent_encoding::utf8_percent_encode;
use serde_json::{json, Value};

use relay_proxy::rewrite::resolver::URI_COMPONENT;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for a running relay proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health and open sessions
    Health,
    /// List shared bookmarks
    List,
    /// Add or replace a bookmark
    Add {
        url: String,
        title: String,
    },
    /// Remove a bookmark by URL
    Remove { url: String },
    /// Remove every bookmark
    Clear,
    /// Ask for address bar suggestions
    Suggest { query: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::List => client.get(format!("{}/api/bookmarks", base)).send().await?,
        Commands::Add { url, title } => {
            client
                .post(format!("{}/api/bookmarks", base))
                .json(&json!({ "url": url, "title": title }))
                .send()
                .await?
        }
        Commands::Remove { url } => {
            let encoded = utf8_percent_encode(&url, URI_COMPONENT);
            client
                .delete(format!("{}/api/bookmarks/{}", base, encoded))
                .send()
                .await?
        }
        Commands::Clear => client.delete(format!("{}/api/bookmarks", base)).send().await?,
        Commands::Suggest { query } => {
            client
                .get(format!("{}/api/autocomplete", base))
                .query(&[("q", query)])
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
