//!
//! registrar server binary
//! ------------------------
//! Command-line entry point for the portal front-end. Configuration comes from
//! `REGISTRAR_*` environment variables; `--port`, `--api-host` and `--api-port`
//! override them.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use registrar::config::PortalConfig;

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].as_str());
        }
        i += 1;
    }
    None
}

fn parse_port_arg(args: &[String], flag: &str) -> anyhow::Result<Option<u16>> {
    match arg_value(args, flag) {
        Some(v) => Ok(Some(v.parse::<u16>().with_context(|| format!("{} expects a port number, got '{}'", flag, v))?)),
        None => Ok(None),
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn print_help() {
    println!("Usage: registrar [--port <http_port>] [--api-host <host>] [--api-port <port>]");
    println!();
    println!("Environment:");
    println!("  REGISTRAR_HTTP_PORT             front-end port (default 3000)");
    println!("  REGISTRAR_API_HOST              records API host (default localhost)");
    println!("  REGISTRAR_API_PORT              records API port (default 8080)");
    println!("  REGISTRAR_SESSION_TTL_SECS      session lifetime (default 3600)");
    println!("  REGISTRAR_REQUEST_TIMEOUT_SECS  API request timeout, 0 for none");
    println!("  RUST_LOG                        log filter (default info)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_help();
        return Ok(());
    }

    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let mut config = PortalConfig::from_env().context("Invalid REGISTRAR_* environment")?;
    if let Some(p) = parse_port_arg(&args, "--port")? { config.http_port = p; }
    if let Some(p) = parse_port_arg(&args, "--api-port")? { config.api_port = p; }
    if let Some(h) = arg_value(&args, "--api-host") { config.api_host = h.to_string(); }

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "startup", "registrar: RUST_LOG='{}', http_port={}, api={}", rust_log, config.http_port, config.api_base_url());

    registrar::server::run(config).await
}
