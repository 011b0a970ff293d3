use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::time;

use autopay_keeper::{create_example_config, KeeperConfig, TipKeeper};
use autopay_types::QueryId;

#[derive(Parser, Debug)]
#[command(name = "autopay-keeper")]
#[command(about = "Suggests the most rewarding autopay query to report")]
struct Args {
    /// Path to keeper configuration file
    #[arg(short, long, default_value = "keeper.toml", global = true)]
    config: String,

    /// Override the configured JSON-RPC endpoint
    #[arg(short, long, global = true)]
    rpc_url: Option<String>,

    /// Override the configured chain id
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggest the best query to report (default)
    Suggest {
        /// Re-evaluate every N seconds instead of exiting
        #[arg(short, long)]
        watch: Option<u64>,
    },
    /// Show the feed tip available for one query
    Tip {
        /// Query id as hex
        #[arg(short, long)]
        query_id: String,
    },
    /// List one-time and feed tips per query
    List,
    /// Write an example configuration file
    InitConfig {
        #[arg(short, long, default_value = "keeper.toml")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.verbose { "debug" } else { "info" })
    ).init();

    let command = args.command.take().unwrap_or(Command::Suggest { watch: None });

    match command {
        Command::InitConfig { path } => {
            create_example_config(&path)?;
            log::info!("Example configuration written to {}", path);
        }
        Command::Suggest { watch: None } => {
            let (config, keeper) = load_keeper(&args)?;
            suggest(&keeper, config.chain_id, args.json).await?;
        }
        Command::Suggest { watch: Some(secs) } => {
            let (config, keeper) = load_keeper(&args)?;
            log::info!("Re-evaluating every {}s", secs);
            let mut interval_timer = time::interval(Duration::from_secs(secs.max(1)));
            let mut iteration = 0u64;

            loop {
                interval_timer.tick().await;
                iteration += 1;
                log::debug!("Starting suggestion round {}", iteration);

                if let Err(e) = suggest(&keeper, config.chain_id, args.json).await {
                    match e.downcast_ref::<autopay_types::AutopayError>() {
                        Some(err) if !err.is_recoverable() => return Err(e),
                        _ => log::error!("Error in suggestion round {}: {}", iteration, e),
                    }
                }
            }
        }
        Command::Tip { query_id } => {
            let (_, keeper) = load_keeper(&args)?;
            let query_id: QueryId = query_id.parse()?;
            let tip = keeper.suggest_tip_for_query(&query_id).await?;
            if args.json {
                println!("{}", json!({ "query_id": query_id, "amount": tip.map(|a| a.to_string()) }));
            } else {
                match tip {
                    Some(amount) => println!("{}: {}", query_id, amount),
                    None => println!("{}: no feed tip available", query_id),
                }
            }
        }
        Command::List => {
            let (_, keeper) = load_keeper(&args)?;
            let one_time = keeper.list_one_time_tips().await?;
            let continuous = keeper.list_continuous_tip_suggestions().await?;
            if args.json {
                let to_json = |tips: &autopay_types::TipMap| {
                    tips.iter()
                        .map(|(tag, amount)| (tag.to_string(), json!(amount.to_string())))
                        .collect::<serde_json::Map<_, _>>()
                };
                println!(
                    "{}",
                    json!({ "one_time": to_json(&one_time), "continuous": to_json(&continuous) })
                );
            } else {
                for entry in keeper.catalog().entries() {
                    let one_time = one_time.get(&entry.tag).copied().unwrap_or(0);
                    let continuous = continuous.get(&entry.tag).copied().unwrap_or(0);
                    println!("{:<24} one-time {:>28}  feeds {:>28}", entry.tag.as_str(), one_time, continuous);
                }
            }
        }
    }

    Ok(())
}

/// Load configuration, apply command line overrides and connect
fn load_keeper(args: &Args) -> anyhow::Result<(KeeperConfig, TipKeeper)> {
    let mut config = KeeperConfig::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(chain_id) = args.chain_id {
        config.chain_id = chain_id;
    }
    config.validate()?;

    log::info!("RPC URL: {}", config.rpc_url);
    let keeper = TipKeeper::from_config(&config)?;
    Ok((config, keeper))
}

async fn suggest(keeper: &TipKeeper, chain_id: u64, json_output: bool) -> anyhow::Result<()> {
    let best = keeper.suggest_best_opportunity(chain_id).await?;

    if json_output {
        let body = match &best {
            Some(s) => json!({ "query_tag": s.query_tag, "amount": s.amount.to_string() }),
            None => json!({ "query_tag": null, "amount": null }),
        };
        println!("{}", body);
    } else {
        match best {
            Some(s) => println!("Report {} for {}", s.query_tag, s.amount),
            None => println!("No autopay tips available"),
        }
    }

    Ok(())
}
