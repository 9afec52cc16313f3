use anyhow::{Context, Result};
use station::GasStation;
use station::metrics::StationTelemetry;
use tokio_util::sync::CancellationToken;
use tron::TronAddress;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "help".to_string());
    if command == "help" || command == "--help" {
        print_usage();
        return Ok(());
    }

    let cfg = station::config::load_config()?;
    tracing::info!(
        network = cfg.network.kind.as_str(),
        node = %cfg.node.full_url,
        pool = %cfg.wallet.pool_address,
        "config loaded"
    );
    let telemetry = StationTelemetry::new();
    let station = GasStation::new(cfg, telemetry)?;

    match command.as_str() {
        "prepare" => {
            let target = parse_target(args.next())?;
            let cancel = CancellationToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("interrupt received; cancelling preparation");
                        cancel.cancel();
                    }
                });
            }
            let result = station.prepare_with_cancel(target, cancel).await;
            print_json(&result)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        "dry-run" => {
            let target = parse_target(args.next())?;
            print_json(&station.dry_run(target).await)?;
        }
        "health" => {
            print_json(&station.health().await)?;
        }
        "status" => {
            print_json(&station.status().await?)?;
        }
        other => {
            print_usage();
            anyhow::bail!("unknown command: {other}");
        }
    }

    Ok(())
}

fn parse_target(arg: Option<String>) -> Result<TronAddress> {
    let raw = arg.context("missing target address argument")?;
    TronAddress::from_base58check(&raw).context("parse target address")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    eprintln!(
        "usage: station <command>\n\
         \n\
         commands:\n\
         \x20 prepare <address>   activate and delegate resources for a USDT transfer\n\
         \x20 dry-run <address>   show the plan and cost without broadcasting\n\
         \x20 health              node endpoint health\n\
         \x20 status              pool wallet balance, resources and signer setup\n\
         \n\
         configuration comes from the environment (see .env support via dotenv)."
    );
}
