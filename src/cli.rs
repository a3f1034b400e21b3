use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{Config, StoreBackend};
use crate::dialog::{Dialog, DialogContext, DialogError, DialogRegistry};
use crate::driver::Conversation;
use crate::fiber::Val;
use crate::store::{BagScope, BagWrite, BotDataStore, DataBag, MemoryStore, PgStore, StorageError};
use crate::types::{Address, Message};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley - persistent dialog state for stateless bot handlers", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL (overrides config file and env vars)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct AddressArgs {
    /// User id
    #[arg(short = 'u', long = "user")]
    pub user: String,

    /// Conversation id
    #[arg(short = 'c', long = "conversation")]
    pub conversation: String,

    /// Channel id
    #[arg(long = "channel", default_value = "cli")]
    pub channel: String,
}

impl AddressArgs {
    fn address(&self) -> Address {
        Address::new(&self.channel, &self.user, &self.conversation)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run database migrations
    Migrate,

    /// Print the effective configuration
    Config,

    /// Show the stored dialog stack of a conversation (postgres backend only)
    Inspect {
        #[command(flatten)]
        address: AddressArgs,
    },

    /// Delete the stored dialog state of a conversation (postgres backend only)
    Reset {
        #[command(flatten)]
        address: AddressArgs,

        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Talk to the built-in counter dialog, one turn per line of input
    Chat {
        #[command(flatten)]
        address: AddressArgs,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder()
        .config_path(cli.config)
        .database_url(cli.database_url)
        .build()?;

    match cli.command {
        Commands::Migrate => {
            println!("Running migrations...");
            let pool = crate::db::connect(&config.database).await?;
            crate::db::migrate(&pool).await?;
            println!("Migrations complete!");
        }

        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{}", rendered);
        }

        Commands::Inspect { address } => {
            require_persistent_store(&config, "inspect")?;
            let conversation = open_conversation(&config).await?;
            match conversation.load_fiber(&address.address()).await? {
                Some(fiber) => print!("{}", fiber.describe()),
                None => {
                    eprintln!("No dialog state stored for {:?}", address.address());
                    std::process::exit(1);
                }
            }
        }

        Commands::Reset { address, yes } => {
            if !yes {
                eprintln!("Error: Confirmation required. Use --yes flag to confirm reset.");
                std::process::exit(1);
            }

            require_persistent_store(&config, "reset")?;
            let conversation = open_conversation(&config).await?;
            if conversation.reset(&address.address()).await? {
                println!("✓ Dialog state for {} / {} reset", address.user, address.conversation);
            } else {
                println!("No dialog state stored for {} / {}", address.user, address.conversation);
            }
        }

        Commands::Chat { address } => {
            let conversation = open_conversation(&config).await?;
            let address = address.address();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            println!("Type a message (\"reset\" restarts the counter, Ctrl-D to quit)");
            while let Some(line) = lines.next_line().await? {
                let inbound = Message::from_user(&address, &config.driver.bot_id, line.trim());
                match conversation.post(&inbound).await {
                    Ok(reply) => println!("< {}", reply.text_or_empty()),
                    Err(err) => eprintln!("! turn failed: {}", err),
                }
            }
        }
    }

    Ok(())
}

/// A memory store starts empty in every process, so there is nothing to inspect
fn require_persistent_store(config: &Config, command: &str) -> Result<()> {
    if config.store.backend == StoreBackend::Memory {
        bail!(
            "'{}' reads stored dialog state and needs store.backend = \"postgres\"",
            command
        );
    }
    Ok(())
}

async fn open_conversation(config: &Config) -> Result<Conversation<CliStore>> {
    let store = match config.store.backend {
        StoreBackend::Memory => CliStore::Memory(MemoryStore::new()),
        StoreBackend::Postgres => {
            let pool = crate::db::connect(&config.database).await?;
            CliStore::Postgres(PgStore::new(pool))
        }
    };

    Ok(Conversation::new(store, DialogRegistry::new(), CounterDialog::default).with_config(config))
}

/* ===================== Store selection ===================== */

/// Store chosen by `store.backend`
pub enum CliStore {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl BotDataStore for CliStore {
    async fn load_bag(&self, scope: BagScope, key: &str) -> Result<DataBag, StorageError> {
        match self {
            CliStore::Memory(store) => store.load_bag(scope, key).await,
            CliStore::Postgres(store) => store.load_bag(scope, key).await,
        }
    }

    async fn save_bags(&self, batch: &[BagWrite<'_>]) -> Result<(), StorageError> {
        match self {
            CliStore::Memory(store) => store.save_bags(batch).await,
            CliStore::Postgres(store) => store.save_bags(batch).await,
        }
    }
}

/* ===================== Demo dialog ===================== */

/// Counts messages until the user says "reset"
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CounterDialog {
    count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum CounterResume {
    Message,
}

impl Dialog for CounterDialog {
    const KIND: &'static str = "parley.cli.counter";
    type Resume = CounterResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, CounterResume>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(CounterResume::Message)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, CounterResume>,
        _resume: CounterResume,
        _input: Val,
    ) -> Result<(), DialogError> {
        let text = ctx.inbound().text_or_empty().to_string();
        if text.eq_ignore_ascii_case("reset") {
            ctx.post(format!("Counter reset after {} message(s)", self.count));
            return ctx.done(self.count);
        }

        self.count += 1;
        ctx.post(format!("{}: {}", self.count, text));
        ctx.wait(CounterResume::Message)
    }
}
