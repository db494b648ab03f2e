use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, IF_MATCH};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "resource-cli")]
#[command(about = "Command-line client for a resource router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Sent as Accept-API-Version, e.g. `protocol=2.0,resource=1.0`
    #[arg(long)]
    api_version: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one resource
    Read {
        path: String,
        /// Comma-separated fields to return
        #[arg(long)]
        fields: Option<String>,
    },
    /// Query a collection
    Query {
        path: String,
        #[arg(long, default_value = "true")]
        filter: String,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        sort_keys: Option<String>,
    },
    /// Create a resource; with --id the client chooses the id
    Create {
        path: String,
        /// JSON content
        content: String,
        #[arg(long)]
        id: Option<String>,
    },
    /// Replace a resource at a known revision
    Update {
        path: String,
        content: String,
        #[arg(long, default_value = "*")]
        revision: String,
    },
    /// Delete a resource
    Delete {
        path: String,
        #[arg(long)]
        revision: Option<String>,
    },
    /// Invoke an action
    Action {
        path: String,
        action: String,
        /// JSON content
        #[arg(long)]
        content: Option<String>,
    },
}

fn resource_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn etag(revision: &str) -> Result<HeaderValue, reqwest::header::InvalidHeaderValue> {
    if revision == "*" {
        HeaderValue::from_str(revision)
    } else {
        HeaderValue::from_str(&format!("\"{}\"", revision))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(version) = &cli.api_version {
        headers.insert("accept-api-version", HeaderValue::from_str(version)?);
    }

    let res = match cli.command {
        Commands::Read { path, fields } => {
            let mut req = client.get(resource_url(&cli.url, &path)).headers(headers);
            if let Some(fields) = fields {
                req = req.query(&[("_fields", fields)]);
            }
            req.send().await?
        }
        Commands::Query {
            path,
            filter,
            page_size,
            sort_keys,
        } => {
            let mut params = vec![("_queryFilter", filter)];
            if let Some(size) = page_size {
                params.push(("_pageSize", size.to_string()));
            }
            if let Some(keys) = sort_keys {
                params.push(("_sortKeys", keys));
            }
            client
                .get(resource_url(&cli.url, &path))
                .headers(headers)
                .query(&params)
                .send()
                .await?
        }
        Commands::Create { path, content, id } => {
            let content: Value = serde_json::from_str(&content)?;
            match id {
                Some(id) => {
                    let url = resource_url(&cli.url, &format!("{}/{}", path, id));
                    client
                        .put(url)
                        .headers(headers)
                        .header("if-none-match", "*")
                        .json(&content)
                        .send()
                        .await?
                }
                None => {
                    client
                        .post(resource_url(&cli.url, &path))
                        .headers(headers)
                        .query(&[("_action", "create")])
                        .json(&content)
                        .send()
                        .await?
                }
            }
        }
        Commands::Update {
            path,
            content,
            revision,
        } => {
            let content: Value = serde_json::from_str(&content)?;
            client
                .put(resource_url(&cli.url, &path))
                .headers(headers)
                .header(IF_MATCH, etag(&revision)?)
                .json(&content)
                .send()
                .await?
        }
        Commands::Delete { path, revision } => {
            let mut req = client.delete(resource_url(&cli.url, &path)).headers(headers);
            if let Some(revision) = revision {
                req = req.header(IF_MATCH, etag(&revision)?);
            }
            req.send().await?
        }
        Commands::Action {
            path,
            action,
            content,
        } => {
            let mut req = client
                .post(resource_url(&cli.url, &path))
                .headers(headers)
                .query(&[("_action", action)]);
            if let Some(content) = content {
                let content: Value = serde_json::from_str(&content)?;
                req = req.json(&content);
            }
            req.send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(etag) = res.headers().get("etag").and_then(|v| v.to_str().ok()) {
        eprintln!("ETag: {}", etag);
    }
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
