use std::time::Duration;

use anyhow::Context;
use colored::Colorize;

use chunkvault_protocol::ListMetadataResponse;
use chunkvault_server::{ChunkvaultServer, ServerConfig};

use crate::cli::*;
use crate::client::ChunkvaultClient;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Upload(args) => cmd_upload(args, cli.format).await,
        Command::List(args) => cmd_list(args, cli.format).await,
    }
}

fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(root) = &args.root {
        config.storage_root = root.clone();
    }
    if let Some(n) = args.max_read {
        config.gates.max_read_requests = n;
    }
    if let Some(n) = args.max_upload {
        config.gates.max_upload_requests = n;
    }
    if let Some(n) = args.max_payload {
        config.max_payload_size = n;
    }
    if let Some(secs) = args.call_timeout {
        config.call_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    println!(
        "chunkvault server on {} (root: {}, read ≤ {}, upload ≤ {}, payload ≤ {} bytes)",
        config.bind_addr.to_string().bold(),
        config.storage_root.display(),
        config.gates.max_read_requests,
        config.gates.max_upload_requests,
        config.max_payload_size,
    );
    let server = ChunkvaultServer::new(config)?;
    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
        })
        .await?;
    println!("{} Server stopped.", "✓".green());
    Ok(())
}

async fn cmd_upload(args: UploadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let client = ChunkvaultClient::new(&args.remote.server)?;
    let resp = client
        .upload_file(
            &args.file,
            args.name,
            args.content_type,
            args.chunk_size as usize,
            Duration::from_millis(args.timeout_ms),
        )
        .await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resp)?),
        OutputFormat::Text => {
            println!("{} Uploaded {}", "✓".green().bold(), args.file.display().to_string().bold());
            println!("  Id: {}", resp.id.yellow());
            println!("  Size: {} bytes", resp.size);
        }
    }
    Ok(())
}

async fn cmd_list(args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let client = ChunkvaultClient::new(&args.remote.server)?;
    let listing = client.list(Duration::from_millis(args.timeout_ms)).await?;

    if let Some(path) = &args.output {
        let json = serde_json::to_vec_pretty(&listing)?;
        std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
        println!(
            "{} Wrote {} item(s) to {}",
            "✓".green(),
            listing.items.len(),
            path.display()
        );
        return Ok(());
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Text => print_listing(&listing),
    }
    Ok(())
}

fn print_listing(listing: &ListMetadataResponse) {
    if listing.items.is_empty() {
        println!("No items stored.");
        return;
    }
    for item in &listing.items {
        println!(
            "{}  {}  {}",
            item.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            item.updated_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            item.name.cyan()
        );
    }
    println!("{} item(s)", listing.items.len().to_string().bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let mut full = vec!["chunkvault", "serve"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Serve(args) => args,
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let config = server_config(&serve_args(&["--max-read", "3", "--call-timeout", "0"])).unwrap();
        assert_eq!(config.gates.max_read_requests, 3);
        assert_eq!(config.gates.max_upload_requests, 8);
        assert_eq!(config.call_timeout(), None);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunkvault.toml");
        std::fs::write(&path, "max_upload_requests = 2\nmax_payload_size = 512\n").unwrap();
        let config = server_config(&serve_args(&[
            "--config",
            path.to_str().unwrap(),
            "--max-payload",
            "1024",
        ]))
        .unwrap();
        assert_eq!(config.gates.max_upload_requests, 2);
        assert_eq!(config.max_payload_size, 1024);
    }

    #[test]
    fn zero_ceiling_is_refused() {
        assert!(server_config(&serve_args(&["--max-upload", "0"])).is_err());
    }

    #[test]
    fn oversized_call_timeout_is_refused() {
        assert!(server_config(&serve_args(&["--call-timeout", "18446744073709551615"])).is_err());
    }
}
