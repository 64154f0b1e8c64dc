//! Terminal front end for the stock desk
//!
//! # Usage
//!
//! ```bash
//! # Backend from the environment, or pass --api-url
//! export STOCK_DESK_API_URL="http://localhost:5000/api"
//!
//! cargo run -p desk-cli -- --ticker AAPL
//! ```

use clap::Parser;
use desk_stock::DeskConfig;
use desk_stock::bot::{BotConfig, BotReply, DeskBot};
use desk_utils::{LogFormat, LoggingConfig};
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::info;

/// How often transcript lines of running commands are printed
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "stock-desk")]
#[command(about = "Terminal desk for a stock analysis backend", long_about = None)]
struct Args {
    /// Backend base URL including the /api prefix
    #[arg(long)]
    api_url: Option<String>,

    /// Ticker to load on start
    #[arg(short, long)]
    ticker: Option<String>,

    /// Client-side request timeout in seconds (default: wait indefinitely)
    #[arg(long)]
    timeout: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Hide message timestamps
    #[arg(long)]
    no_timestamps: bool,
}

fn print_banner() {
    println!(
        r"
╔══════════════════════════════════════════════════════════════╗
║                        Stock Desk                            ║
║                                                              ║
║  /ticker <symbol>   load a ticker and run the full analysis  ║
║  /technical /quant /risk /sentiment   show an analysis tab   ║
║  /help              all commands                             ║
║  /exit              quit                                     ║
║                                                              ║
║  Or chat: find ticker MSFT, What's the outlook?              ║
╚══════════════════════════════════════════════════════════════╝
"
    );
}

fn desk_config(args: &Args) -> desk_stock::Result<DeskConfig> {
    let mut builder = DeskConfig::builder();
    if let Some(url) = &args.api_url {
        builder = builder.api_base_url(url.clone());
    }
    if let Some(secs) = args.timeout {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    builder.with_env().build()
}

fn print_reply(reply: &str) {
    if !reply.is_empty() {
        println!("{reply}\n");
    }
}

/// Print output that arrived while the prompt was showing
fn print_background(reply: &str, prompt: &str) -> io::Result<()> {
    if reply.is_empty() {
        return Ok(());
    }
    println!("\n{reply}\n");
    show_prompt(prompt)
}

fn show_prompt(prompt: &str) -> io::Result<()> {
    print!("{prompt}");
    io::stdout().flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::from_env();
    if args.log_json {
        logging = logging.with_format(LogFormat::Json);
    }
    desk_utils::init_tracing(&logging);

    let config = BotConfig::builder()
        .desk(desk_config(&args)?)
        .show_timestamps(!args.no_timestamps)
        .build();

    print_banner();
    println!("Backend: {}\n", config.desk.api_base_url);
    info!("Starting stock desk against {}", config.desk.api_base_url);

    let mut bot = DeskBot::new(config)?;
    print_reply(&bot.welcome().await);

    if let Some(ticker) = &args.ticker {
        match bot.process_input(&format!("/ticker {ticker}")).await {
            Ok(BotReply::Output(text)) => print_reply(&text),
            Ok(BotReply::Exit) => return Ok(()),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
    progress.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let prompt = bot.prompt().to_string();
    show_prompt(&prompt)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(input) = line? else {
                    println!("\nGoodbye!");
                    break;
                };
                if !input.trim().is_empty() {
                    match bot.process_input(&input).await {
                        Ok(BotReply::Output(text)) => print_reply(&text),
                        Ok(BotReply::Exit) => {
                            println!("Goodbye!");
                            break;
                        }
                        Err(e) => eprintln!("Error: {e}\n"),
                    }
                }
                show_prompt(&prompt)?;
            }
            Some(text) = bot.next_completion(), if bot.pending() > 0 => {
                print_background(&text, &prompt)?;
            }
            _ = progress.tick() => {
                let text = bot.progress().await;
                print_background(&text, &prompt)?;
            }
        }
    }

    Ok(())
}
