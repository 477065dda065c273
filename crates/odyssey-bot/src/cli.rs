//! CLI binary for odyssey-bot (feature-gated behind `cli`).
//!
//! Provides `odyssey claim`, `odyssey open-box`, `odyssey check-in`,
//! `odyssey fan-out` and `odyssey init-config`.

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use clap::{Parser, Subcommand};
    use colored::Colorize;
    use odyssey_bot::runner::{AccountOutcome, RunMode, RunSettings};
    use odyssey_bot::rewards::{LoginOutcome, StageOutcome};
    use odyssey_bot::transfer::{self, TransferPlan};
    use odyssey_bot::{
        load_credentials, ChainFactory, CredentialKind, HttpApiFactory, OdysseyConfig, ProxyPool,
        RetryPolicy, RpcChainAdapter, RpcChainFactory, Wallet,
    };
    use std::path::PathBuf;
    use std::time::Duration;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    #[derive(Parser)]
    #[command(name = "odyssey", version, about = "Sonic Odyssey reward bot and SOL fan-out tool")]
    struct Cli {
        /// TOML config file (defaults are used when omitted)
        #[arg(long, global = true)]
        config: Option<PathBuf>,
        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Claim the daily reward stages for every account
        Claim,
        /// Open mystery boxes for every account
        OpenBox {
            /// Boxes to open per account
            #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
            count: u64,
        },
        /// Daily check-in for every account
        CheckIn,
        /// Send SOL from each source wallet to a batch of addresses
        FanOut {
            /// Credential source: `seed` (accounts.json) or `key` (privateKeys.json)
            #[arg(long)]
            input: CredentialKind,
            /// Random addresses to generate
            #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
            count: Option<u64>,
            /// Amount of SOL per transfer
            #[arg(long)]
            amount: Option<f64>,
            /// Delay between transactions in milliseconds
            #[arg(long)]
            delay_ms: Option<u64>,
            /// Retries per transfer (0 = single attempt)
            #[arg(long)]
            retries: Option<u32>,
            /// JSON array of destination addresses instead of random ones
            #[arg(long)]
            destinations: Option<PathBuf>,
        },
        /// Write a config file with every default filled in
        InitConfig {
            #[arg(long, default_value = "odyssey.toml")]
            output: PathBuf,
        },
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "odyssey_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = OdysseyConfig::load_or_default(cli.config.as_deref())?;

    println!("{}", "Sonic Odyssey Bot".cyan().bold());

    let mode = match cli.command {
        Commands::Claim => RunMode::Claim,
        Commands::OpenBox { count } => RunMode::OpenBoxes { count },
        Commands::CheckIn => RunMode::DailyLogin,
        Commands::InitConfig { output } => {
            OdysseyConfig::default().save(&output)?;
            println!("{} {}", "Config written to".green(), output.display());
            return Ok(());
        }
        Commands::FanOut {
            input,
            count,
            amount,
            delay_ms,
            retries,
            destinations,
        } => {
            let path = match input {
                CredentialKind::SeedPhrase => &config.files.seed_phrases,
                CredentialKind::PrivateKey => &config.files.private_keys,
            };
            let sources = load_credentials(path, input)?
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    Wallet::from_credential(c).with_context(|| format!("account {}", i + 1))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let targets = match destinations {
                Some(file) => transfer::load_destinations(&file)?,
                None => transfer::generate_random_addresses(
                    count.unwrap_or(config.transfer.address_count as u64) as usize,
                ),
            };

            let proxies = ProxyPool::load_or_empty(&config.files.proxies)?;
            let factory = RpcChainFactory::new(
                config.chain.rpc_url.clone(),
                config.api.proxy_scheme.clone(),
                config.request_timeout(),
            );
            let rt = tokio::runtime::Runtime::new()?;
            let reports = rt.block_on(async {
                let chain = factory.connect(proxies.pick())?;
                let min = transfer::minimum_transfer_lamports(chain.as_ref()).await;
                let lamports = transfer::amount_to_lamports(
                    amount.unwrap_or(config.transfer.amount_sol),
                    min,
                )?;
                let plan = TransferPlan {
                    lamports,
                    delay: Duration::from_millis(delay_ms.unwrap_or(config.transfer.delay_ms)),
                    policy: RetryPolicy::new(
                        retries.unwrap_or(config.transfer.max_retries),
                        config.retry.policy().delay(),
                    ),
                };
                Ok::<_, odyssey_bot::OdysseyError>(
                    transfer::fan_out_all(&factory, &proxies, &sources, &targets, &plan).await,
                )
            })?;

            for (i, r) in reports.iter().enumerate() {
                if let Some(reason) = &r.skipped {
                    println!("{}", format!("[Account {}] {}: skipped ({reason})", i + 1, r.source).red());
                    continue;
                }
                let line = format!(
                    "[Account {}] {}: {} sent, {} failed{}",
                    i + 1,
                    r.source,
                    r.sent.len(),
                    r.failed.len(),
                    r.proxy.as_deref().map(|p| format!(" via {p}")).unwrap_or_default()
                );
                if r.failed.is_empty() {
                    println!("{}", line.green());
                } else {
                    println!("{}", line.yellow());
                }
            }
            return Ok(());
        }
    };

    let credentials = load_credentials(&config.files.private_keys, CredentialKind::PrivateKey)?;
    let proxies = ProxyPool::load_or_empty(&config.files.proxies)?;
    println!(
        "Loaded {} account(s), {} proxy(ies)",
        credentials.len(),
        proxies.len()
    );

    let settings = RunSettings {
        policy: config.retry.policy(),
        proxies,
    };
    let factory = HttpApiFactory::new(config.api.clone(), config.request_timeout());
    let chain = RpcChainAdapter::new(&config.chain.rpc_url);

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(odyssey_bot::run_batch(
        &settings,
        &credentials,
        mode,
        &factory,
        &chain,
    ));

    for account in &report.accounts {
        let who = format!(
            "[Account {}] {}",
            account.index,
            account.address.as_deref().unwrap_or("?")
        );
        match &account.outcome {
            AccountOutcome::Claimed(claims) => {
                for (stage, outcome) in &claims.stages {
                    let text = match outcome {
                        StageOutcome::Claimed(c) => format!("stage {stage} claimed (status: {c})").green(),
                        StageOutcome::AlreadyClaimed => format!("stage {stage} already claimed").cyan(),
                        StageOutcome::TaskNotFinished => {
                            format!("stage {stage}: interact task not finished").yellow()
                        }
                        StageOutcome::Failed(e) => format!("stage {stage} failed: {e}").red(),
                    };
                    println!("{who} {text}");
                }
            }
            AccountOutcome::BoxesOpened(boxes) => {
                if boxes.downgraded {
                    println!(
                        "{who} {}",
                        format!("only {} box(es) available", boxes.planned).yellow()
                    );
                }
                let total: u64 = boxes.opened.iter().map(|b| b.amount).sum();
                let summary = format!(
                    "opened {} of {} box(es), total amount {total}",
                    boxes.opened.len(),
                    boxes.planned
                );
                match &boxes.error {
                    Some(e) => println!("{who} {}", format!("{summary}; stopped: {e}").red()),
                    None => println!("{who} {}", summary.green()),
                }
            }
            AccountOutcome::LoggedIn(LoginOutcome::CheckedIn { accumulative_days }) => {
                println!(
                    "{who} {}",
                    format!("daily login done, accumulative days: {accumulative_days}").green()
                );
            }
            AccountOutcome::LoggedIn(LoginOutcome::AlreadyCheckedIn) => {
                println!("{who} {}", "already checked in today".yellow());
            }
            AccountOutcome::Skipped => {
                println!("{who} {}", "skipped: insufficient balance or RPC down".red());
            }
            AccountOutcome::Failed(e) => println!("{who} {}", e.red()),
        }
    }
    println!(
        "{}",
        format!(
            "All accounts processed: {} ok, {} failed (started {})",
            report.succeeded(),
            report.failed(),
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .cyan()
    );
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with: cargo build --features cli");
    std::process::exit(1);
}
