//! Binary entrypoint for the settlerbot CLI.
//!
//! Commands:
//! - `start` - run the bot with the line-based console adapter (real chat
//!   platforms attach through the library API instead)
//! - `init` - create a starter `config.toml`
//! - `status` - print database row totals
//!
//! See the library crate docs for module-level details: `settlerbot::`.
use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use settlerbot::bot::{Bot, Command, Outgoing, Roster};
use settlerbot::config::Config;
use settlerbot::engine::Engine;
use settlerbot::store::{Store, UserId};

#[derive(Parser)]
#[command(name = "settlerbot")]
#[command(about = "A scavenging and theft game bot for chat platforms")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot with the interactive console adapter
    Start,
    /// Initialize a new configuration file
    Init,
    /// Show database status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            config.validate_for_start()?;
            info!("Starting settlerbot v{}", env!("CARGO_PKG_VERSION"));
            if config.sync_commands() {
                info!("dev environment: slash-command registration will be re-synced");
            }

            let store = Arc::new(Store::open(&config.storage.database)?);
            let engine = Arc::new(Engine::new(store, config.bot.give_user));
            let roster = Arc::new(ConsoleRoster::default());
            let (tx, rx) = mpsc::unbounded_channel();
            let bot = Bot::new(
                engine,
                config.bot.authorized_users.clone(),
                roster.clone(),
                tx,
            );

            run_console(bot, roster, rx).await;
        }
        Commands::Init => {
            info!("Initializing new bot configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let store = Store::open(&config.storage.database)?;
            let (inventory, stolen) = store.totals()?;
            println!("database: {}", config.storage.database);
            println!("inventory entries: {}", inventory);
            println!("stolen-item records: {}", stolen);
        }
    }

    Ok(())
}

/// Roster for the console adapter: every user id that has issued a command
/// counts as a group member.
#[derive(Default)]
struct ConsoleRoster {
    seen: Mutex<HashSet<UserId>>,
}

impl ConsoleRoster {
    fn record(&self, user: UserId) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.insert(user);
        }
    }
}

impl Roster for ConsoleRoster {
    fn members(&self) -> Vec<UserId> {
        self.seen
            .lock()
            .map(|seen| seen.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Line-based dev console: `<user-id> <command> [args...]` per line, e.g.
/// `1 scavenge eden` or `1 trade 2 Combat Knife`. Outgoing messages print to
/// stdout tagged with their destination.
async fn run_console(
    bot: Bot,
    roster: Arc<ConsoleRoster>,
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                Outgoing::Reply {
                    user,
                    text,
                    private,
                } => {
                    let vis = if private { "private" } else { "public" };
                    println!("[reply->{} {}] {}", user, vis, text);
                }
                Outgoing::Channel { text } => println!("[channel] {}", text),
                Outgoing::Dm { user, text } => println!("[dm->{}] {}", user, text),
            }
        }
    });

    println!("settlerbot console. Commands: tell, slots, scavenge, trade, use, give, inv.");
    println!("Format: <user-id> <command> [args...]; Ctrl-D to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("console read error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok((user, command)) => {
                roster.record(user);
                bot.handle(user, command);
                // Let the printer task flush before the next prompt.
                tokio::task::yield_now().await;
            }
            Err(usage) => println!("{}", usage),
        }
    }
    info!("console closed, shutting down");
}

/// Parse one console line into `(invoker, command)`.
fn parse_line(line: &str) -> Result<(UserId, Command), String> {
    let mut parts = line.splitn(3, ' ');
    let user: UserId = parts
        .next()
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| "usage: <user-id> <command> [args...]".to_string())?;
    let verb = parts
        .next()
        .ok_or_else(|| "missing command".to_string())?
        .to_ascii_lowercase();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let command = match verb.as_str() {
        "tell" => Command::Tell { message: rest },
        "slots" => Command::Slots,
        "inv" => Command::Inv,
        "scavenge" => Command::Scavenge { location: rest },
        "trade" | "give" => {
            let (recipient, item) = split_user_then_item(&rest)
                .ok_or(format!("usage: <user-id> {} <recipient-id> <item>", verb))?;
            if verb == "trade" {
                Command::Trade { recipient, item }
            } else {
                Command::Give { recipient, item }
            }
        }
        "use" => {
            // Target is the trailing token when it parses as a user id.
            let (item, target) = match rest.rsplit_once(' ') {
                Some((item, last)) => match last.parse::<UserId>() {
                    Ok(target) => (item.trim().to_string(), Some(target)),
                    Err(_) => (rest.clone(), None),
                },
                None => (rest.clone(), None),
            };
            if item.is_empty() {
                return Err("usage: <user-id> use <item> [target-id]".to_string());
            }
            Command::Use { item, target }
        }
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok((user, command))
}

/// Split `"<id> <item words...>"`.
fn split_user_then_item(rest: &str) -> Option<(UserId, String)> {
    let (raw_id, item) = rest.split_once(' ')?;
    let recipient = raw_id.parse().ok()?;
    let item = item.trim();
    if item.is_empty() {
        return None;
    }
    Some((recipient, item.to_string()))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(base_level);
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_handles_multi_word_items() {
        let (user, command) = parse_line("1 trade 2 Combat Knife").unwrap();
        assert_eq!(user, 1);
        match command {
            Command::Trade { recipient, item } => {
                assert_eq!(recipient, 2);
                assert_eq!(item, "Combat Knife");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_line_takes_trailing_id_as_use_target() {
        let (_, command) = parse_line("1 use Hacking Device 2").unwrap();
        match command {
            Command::Use { item, target } => {
                assert_eq!(item, "Hacking Device");
                assert_eq!(target, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let (_, command) = parse_line("1 use Settler's Apparatus 4 codeline").unwrap();
        match command {
            Command::Use { item, target } => {
                assert_eq!(item, "Settler's Apparatus 4 codeline");
                assert_eq!(target, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_line_rejects_garbage() {
        assert!(parse_line("not-a-number inv").is_err());
        assert!(parse_line("1 fly").is_err());
        assert!(parse_line("1").is_err());
    }
}
