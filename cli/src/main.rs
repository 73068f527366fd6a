use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use journal_core::dashboard::entries_in_month;
use journal_core::{
    fetch_dashboard, ApiError, ClientConfig, EntryDraft, EntryQuery, JournalClient, Mood,
    ProfileUpdate, Session, SortBy,
};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "journal")]
#[command(about = "Command-line client for the journal API", long_about = None)]
struct Cli {
    /// TOML config file. Without it, `JOURNAL_*` environment variables apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured base address.
    #[arg(short, long)]
    url: Option<String>,

    /// Bearer token. Defaults to the session from `JOURNAL_TOKEN`.
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List entries, optionally filtered and sorted
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(short, long)]
        mood: Option<Mood>,
        #[arg(long, value_enum, default_value_t = SortArg::Date)]
        sort: SortArg,
    },
    /// Show one entry
    Get { id: String },
    /// Create an entry
    Create { title: String, content: String },
    /// Replace an entry's title and content
    Update {
        id: String,
        title: String,
        content: String,
    },
    /// Delete an entry
    Delete { id: String },
    /// Entries, greeting and mood summary in one call
    Dashboard,
    /// Show the personalized greeting
    Greeting,
    /// Manage the signed-in account
    #[command(subcommand)]
    Profile(ProfileCommands),
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Change the display name and optionally the password
    Update {
        user_name: String,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Delete the account and all of its entries
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SortArg {
    Date,
    Title,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => SortBy::Date,
            SortArg::Title => SortBy::Title,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            if err.downcast_ref::<ApiError>().is_some_and(ApiError::is_retryable) {
                eprintln!("The request may succeed if you try again.");
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journal_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::from_env()?,
    };
    Ok(match &cli.url {
        Some(url) => config.with_base_address(url),
        None => config,
    })
}

fn resolve_token(cli: &Cli, session: &Session) -> String {
    cli.token
        .clone()
        .or_else(|| session.token().map(str::to_string))
        .unwrap_or_default()
}

async fn run(cli: Cli) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    let client = JournalClient::new(&config)?;
    let session = Session::from_env();
    let token = resolve_token(&cli, &session);
    debug!(base = %config.base_address, authenticated = !token.is_empty(), "starting");

    let output = match cli.command {
        Commands::List { search, mood, sort } => {
            let entries = client.list_entries(&token).await?;
            let query = EntryQuery {
                search,
                mood,
                sort: sort.into(),
            };
            serde_json::to_value(query.apply(&entries))?
        }
        Commands::Get { id } => serde_json::to_value(client.get_entry(&token, &id).await?)?,
        Commands::Create { title, content } => {
            let draft = EntryDraft::new(&title, &content)?;
            client.create_entry(&token, &draft).await?;
            done("created")
        }
        Commands::Update { id, title, content } => {
            let draft = EntryDraft::new(&title, &content)?;
            client.update_entry(&token, &id, &draft).await?;
            done("updated")
        }
        Commands::Delete { id } => {
            client.delete_entry(&token, &id).await?;
            done("deleted")
        }
        Commands::Dashboard => {
            let dashboard = fetch_dashboard(&client, &token).await?;
            json!({
                "greeting": dashboard.greeting,
                "total": dashboard.entries.len(),
                "this_month": entries_in_month(&dashboard.entries, chrono::Utc::now()),
                "moods": dashboard.stats(),
                "recent": EntryQuery::default()
                    .apply(&dashboard.entries)
                    .into_iter()
                    .take(5)
                    .collect::<Vec<_>>(),
            })
        }
        Commands::Greeting => json!({ "greeting": client.get_greeting(&token).await? }),
        Commands::Profile(ProfileCommands::Update { user_name, password }) => {
            let update = ProfileUpdate::new(&user_name, password.as_deref())?;
            client.update_profile(&token, &update).await?;
            done("updated")
        }
        Commands::Profile(ProfileCommands::Delete) => {
            client.delete_account(&token).await?;
            done("deleted")
        }
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

fn done(status: &str) -> Value {
    json!({ "status": status })
}
