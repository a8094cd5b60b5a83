use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use rust_decimal::Decimal;
use tracing::warn;

use sorx_rs::config::RouterConfig;
use sorx_rs::market_data::clock::TokioClock;
use sorx_rs::market_data::transport::HttpTransport;
use sorx_rs::{telemetry, RouteSide, SmartOrderRouter};

/// Quote a volume-weighted execution price across Gemini + Coinbase books.
#[derive(Debug, Parser)]
#[command(name = "sorx", version)]
struct Cli {
    /// Quantity to fill (base units, e.g. BTC)
    #[arg(short, long, value_parser = parse_quantity)]
    qty: Decimal,

    #[arg(short, long, value_enum, default_value_t = RouteSide::Both)]
    side: RouteSide,

    /// Config file (extension optional; missing file means defaults)
    #[arg(short, long, default_value = "sorx")]
    config: String,

    /// Print fills as JSON instead of one line per side
    #[arg(long)]
    json: bool,
}

fn parse_quantity(raw: &str) -> Result<Decimal, String> {
    let qty = Decimal::from_str(raw).map_err(|e| format!("not a decimal: {e}"))?;
    if qty <= Decimal::ZERO {
        return Err(format!("quantity must be positive, got {qty}"));
    }
    Ok(qty)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    let cli = Cli::parse();

    telemetry::init_tracing("sorx_rs=info,sorx=info");
    let cfg = RouterConfig::load(&cli.config)?;
    telemetry::init_metrics(&cfg.metrics_listen)?;

    let transport = Arc::new(HttpTransport::new(cfg.http_timeout()?, &cfg.http.user_agent)?);
    let router = SmartOrderRouter::from_config(&cfg, transport, Arc::new(TokioClock))?;

    let report = router.run(cli.qty, cli.side).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.fills)?);
    } else {
        for fill in &report.fills {
            match &fill.outcome {
                Ok(result) => {
                    println!("{result}");
                    if result.is_partial() {
                        warn!(
                            side = %fill.side,
                            shortfall = %result.shortfall(),
                            "Only partially filled"
                        );
                    }
                }
                Err(e) => eprintln!("{} failed: {e}", fill.side),
            }
        }
    }

    if !report.all_filled() {
        anyhow::bail!("one or more walks could not be priced");
    }
    Ok(())
}
