mod config;
mod interactive;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use crush_client::{ApiClient, ChatSession, SwipeSession};
use crush_core::{MatrimonyUpdate, ProfileUpdate, Registration};
use crush_store::{SessionStore, SqliteStorage};

use config::Config;

#[derive(Parser)]
#[command(name = "crush", about = "CrushCloud dating client")]
struct Cli {
    /// Override the backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account and store the session token
    Register {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        /// Extra user fields as key=value
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Forget the stored session token
    Logout,

    /// Show backend, data directory and session state
    Status,

    /// View or edit a user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// List profiles available for swiping
    Profiles,

    /// Swipe through profiles interactively
    Swipe,

    /// List matches
    Matches,

    /// Show the messages of a match
    Messages { match_id: String },

    /// Send a message to a match
    Send { match_id: String, text: String },

    /// Update matching preferences (key=value, values parsed as JSON when possible)
    Prefs {
        #[arg(required = true)]
        settings: Vec<String>,
    },

    /// Talk to the dating assistant
    Chat {
        /// Send a single message and exit
        #[arg(long)]
        message: Option<String>,
    },

    /// Show the stored assistant history
    ChatHistory {
        /// Delete the stored history instead
        #[arg(long)]
        clear: bool,
    },

    /// List suggested assistant topics
    Topics,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print a profile
    Show { id: String },

    /// Change profile fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        education: Option<String>,
        #[arg(long)]
        profession: Option<String>,
        #[arg(long)]
        family: Option<String>,
    },

    /// Upload a JPEG profile photo
    Photo { id: String, path: PathBuf },
}

struct App {
    config: Config,
    data_dir: PathBuf,
    storage: Arc<SqliteStorage>,
    session: SessionStore,
    client: ApiClient,
}

fn open_app(cli: &Cli) -> Result<App> {
    let data_dir = config::data_dir();
    let mut config = Config::load(&data_dir)?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }

    let storage = Arc::new(
        crush_store::open_default(Some(&data_dir))
            .with_context(|| format!("failed to open storage in {}", data_dir.display()))?,
    );
    let session = SessionStore::new(storage.clone());
    let client = ApiClient::new(&config.api_url, session.clone())
        .context("failed to create API client")?;

    Ok(App {
        config,
        data_dir,
        storage,
        session,
        client,
    })
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Topics = cli.command {
        interactive::print_topics();
        return Ok(());
    }

    let app = open_app(&cli)?;
    match &cli.command {
        Commands::Login { email, password } => cmd_login(&app, email, password).await,
        Commands::Register {
            email,
            password,
            name,
            age,
            fields,
        } => cmd_register(&app, email, password, name.clone(), *age, fields).await,
        Commands::Logout => cmd_logout(&app),
        Commands::Status => cmd_status(&app),
        Commands::Profile { action } => cmd_profile(&app, action).await,
        Commands::Profiles => cmd_profiles(&app).await,
        Commands::Swipe => cmd_swipe(&app).await,
        Commands::Matches => cmd_matches(&app).await,
        Commands::Messages { match_id } => cmd_messages(&app, match_id).await,
        Commands::Send { match_id, text } => cmd_send(&app, match_id, text).await,
        Commands::Prefs { settings } => cmd_prefs(&app, settings).await,
        Commands::Chat { message } => cmd_chat(&app, message.as_deref()).await,
        Commands::ChatHistory { clear } => cmd_chat_history(&app, *clear),
        Commands::Topics => Ok(()),
    }
}

/// Cancels the returned token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let guard = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling session");
            guard.cancel();
        }
    });
    token
}

/// Parse `key=value` pairs. Values that parse as JSON keep their type,
/// anything else becomes a string.
fn parse_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("expected key=value, got {pair:?}");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("empty key in {pair:?}");
        }
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

fn build_update(
    name: Option<String>,
    age: Option<u32>,
    bio: Option<String>,
    education: Option<String>,
    profession: Option<String>,
    family: Option<String>,
) -> ProfileUpdate {
    let matrimony = MatrimonyUpdate {
        education,
        profession,
        family_details: family,
    };
    let matrimony_details = (!matrimony.is_empty()).then_some(matrimony);
    ProfileUpdate {
        name,
        age,
        bio,
        matrimony_details,
    }
}

async fn cmd_login(app: &App, email: &str, password: &str) -> Result<()> {
    let user = app.client.login(email, password).await.map_err(|e| {
        if e.is_unauthorized() {
            anyhow::anyhow!("login rejected: {e}")
        } else {
            anyhow::Error::new(e).context("login failed")
        }
    })?;
    println!("logged in as {}", user.email.as_deref().unwrap_or(&user.id));
    Ok(())
}

async fn cmd_register(
    app: &App,
    email: &str,
    password: &str,
    name: Option<String>,
    age: Option<u32>,
    fields: &[String],
) -> Result<()> {
    let registration = Registration {
        email: email.to_string(),
        password: password.to_string(),
        name,
        age,
        extra: parse_pairs(fields)?,
    };
    let user = app
        .client
        .register(&registration)
        .await
        .context("registration failed")?;
    println!("registered {}", user.id);
    Ok(())
}

fn cmd_logout(app: &App) -> Result<()> {
    app.client.logout().context("failed to clear session")?;
    println!("logged out");
    Ok(())
}

fn cmd_status(app: &App) -> Result<()> {
    let logged_in = app
        .session
        .token()
        .context("failed to read session")?
        .is_some();
    let history = app
        .session
        .chat_history()
        .context("failed to read chat history")?;

    let keys = app.storage.keys().context("failed to list storage keys")?;
    let schema = app
        .storage
        .schema_version()
        .context("failed to read schema version")?
        .unwrap_or(0);

    println!("api:        {}", app.client.base_url());
    println!("data_dir:   {}", app.data_dir.display());
    println!("session:    {}", if logged_in { "logged in" } else { "logged out" });
    println!("policy:     {}", app.config.advance_policy.as_str());
    println!("history:    {} entries", history.len());
    println!("storage:    {} keys, schema v{schema}", keys.len());
    Ok(())
}

async fn cmd_profile(app: &App, action: &ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show { id } => {
            let profile = app
                .client
                .get_profile(id)
                .await
                .with_context(|| format!("failed to load profile {id}"))?;
            println!("{}", interactive::render_card(&profile));
        }
        ProfileAction::Update {
            id,
            name,
            age,
            bio,
            education,
            profession,
            family,
        } => {
            let update = build_update(
                name.clone(),
                *age,
                bio.clone(),
                education.clone(),
                profession.clone(),
                family.clone(),
            );
            if update.is_empty() {
                bail!("nothing to update");
            }
            let profile = app
                .client
                .update_profile(id, &update)
                .await
                .with_context(|| format!("failed to update profile {id}"))?;
            println!("updated {}", profile.headline());
        }
        ProfileAction::Photo { id, path } => {
            upload(app, id, path).await?;
        }
    }
    Ok(())
}

async fn upload(app: &App, id: &str, path: &Path) -> Result<()> {
    let reply = app
        .client
        .upload_photo(id, path)
        .await
        .with_context(|| format!("failed to upload {}", path.display()))?;
    println!("uploaded {}", path.display());
    if !reply.is_null() {
        println!("{reply}");
    }
    Ok(())
}

async fn cmd_profiles(app: &App) -> Result<()> {
    let profiles = app
        .client
        .fetch_profiles()
        .await
        .context("failed to fetch profiles")?;
    if profiles.is_empty() {
        println!("No more profiles to show");
    }
    for profile in &profiles {
        println!("{}  {}", profile.id, profile.headline());
    }
    Ok(())
}

async fn cmd_swipe(app: &App) -> Result<()> {
    let swipe = SwipeSession::new(app.client.clone(), app.config.advance_policy)
        .with_cancellation(cancel_on_ctrl_c());
    interactive::run_swipe(swipe, BufReader::new(tokio::io::stdin())).await
}

async fn cmd_matches(app: &App) -> Result<()> {
    let matches = app
        .client
        .get_matches()
        .await
        .context("failed to fetch matches")?;
    if matches.is_empty() {
        println!("(no matches yet)");
    }
    for m in &matches {
        let who = m
            .user
            .as_ref()
            .map(|p| p.headline())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{}  {}", m.id, who);
    }
    Ok(())
}

async fn cmd_messages(app: &App, match_id: &str) -> Result<()> {
    let messages = app
        .client
        .get_messages(match_id)
        .await
        .with_context(|| format!("failed to fetch messages for {match_id}"))?;
    if messages.is_empty() {
        println!("(no messages)");
    }
    for message in &messages {
        let from = message.sender_id.as_deref().unwrap_or("?");
        println!("{from}: {}", message.content);
    }
    Ok(())
}

async fn cmd_send(app: &App, match_id: &str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        bail!("message is empty");
    }
    app.client
        .send_message(match_id, text)
        .await
        .with_context(|| format!("failed to send message to {match_id}"))?;
    println!("sent");
    Ok(())
}

async fn cmd_prefs(app: &App, settings: &[String]) -> Result<()> {
    let preferences = Value::Object(parse_pairs(settings)?);
    app.client
        .update_preferences(&preferences)
        .await
        .context("failed to update preferences")?;
    println!("preferences updated");
    Ok(())
}

async fn cmd_chat(app: &App, message: Option<&str>) -> Result<()> {
    let chat = ChatSession::new(app.client.clone(), app.config.transcript_capacity)
        .with_cancellation(cancel_on_ctrl_c());

    match message {
        Some(text) => {
            if let Some(reply) = chat.send(text).await {
                println!("{}", reply.text);
            }
            Ok(())
        }
        None => interactive::run_chat(chat, BufReader::new(tokio::io::stdin())).await,
    }
}

fn cmd_chat_history(app: &App, clear: bool) -> Result<()> {
    if clear {
        app.session
            .clear_history()
            .context("failed to clear chat history")?;
        println!("chat history cleared");
        return Ok(());
    }

    let history = app
        .session
        .chat_history()
        .context("failed to read chat history")?;
    if history.is_empty() {
        println!("(no chat history)");
    }
    for entry in &history {
        let role = match entry.role {
            crush_core::Role::User => "you",
            crush_core::Role::Assistant => "bot",
        };
        println!("{role}: {}", entry.content);
    }
    Ok(())
}
