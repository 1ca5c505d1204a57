mod db;
mod llm;
mod screens;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use llm::{Generator, LlmClient};
use screens::chat::ChatExit;
use services::auth::{AuthClient, AuthConfig, AuthError, IdentityHandle, SessionFile};
use services::chat::ChatRoute;
use services::persona::{PersonaCatalog, PersonaError};
use services::store::{ChatStore, PgChatStore, StoreError};
use state::AppState;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("sign-in is not configured; set AUTH_BASE_URL")]
    AuthNotConfigured,
    #[error("not signed in; run `chatbuddy login` first")]
    NotSignedIn,
    #[error("no LLM provider configured: {0}")]
    LlmNotConfigured(llm::types::LlmError),
    #[error("chat unavailable: {0}")]
    ChatUnavailable(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Db(#[from] db::DbError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persona(#[from] PersonaError),
    #[error(transparent)]
    Screen(#[from] screens::ScreenError),
    #[error("terminal io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "chatbuddy", about = "ChatBuddy terminal assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long, env = "CHATBUDDY_EMAIL")]
        email: Option<String>,
    },
    /// Forget the saved session.
    Logout,
    /// List assistant personas.
    Personas,
    /// List your saved chats.
    Chats,
    /// Open a chat by id, or `new` to start one.
    Chat {
        #[arg(default_value = "new")]
        id: String,
        /// Persona title, e.g. "Write an Article".
        #[arg(long)]
        assistant: Option<String>,
        /// Override the persona description.
        #[arg(long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", format!("error: {e}").red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let sessions = SessionFile::from_env();
    match cli.command {
        Command::Login { email } => run_login(&sessions, email).await,
        Command::Logout => {
            sessions.clear()?;
            println!("Signed out ({} removed).", sessions.path().display());
            Ok(())
        }
        Command::Personas => {
            let catalog = PersonaCatalog::builtin()?;
            print!("{}", screens::home::render_personas(&catalog));
            Ok(())
        }
        Command::Chats => {
            let identity = signed_in(&sessions)?;
            let store = connect_store().await?;
            let owner_id = identity.current().ok_or(CliError::NotSignedIn)?;
            let chats = store.list_chats(&owner_id).await?;
            print!("{}", screens::home::render_chats(&chats));
            Ok(())
        }
        Command::Chat { id, assistant, description } => {
            run_chat(&sessions, &id, assistant.as_deref(), description.as_deref()).await
        }
    }
}

async fn run_login(sessions: &SessionFile, email: Option<String>) -> Result<(), CliError> {
    let config = AuthConfig::from_env().ok_or(CliError::AuthNotConfigured)?;
    let client = AuthClient::new(config)?;
    let identity = IdentityHandle::new();
    let mut input = screens::stdin();
    let mut out = std::io::stdout();
    screens::login::run(&mut input, &mut out, &client, email, sessions, &identity).await?;
    out.flush()?;
    Ok(())
}

async fn run_chat(
    sessions: &SessionFile,
    id: &str,
    assistant: Option<&str>,
    description: Option<&str>,
) -> Result<(), CliError> {
    let identity = signed_in(sessions)?;
    let store = connect_store().await?;
    let client = LlmClient::from_env().map_err(CliError::LlmNotConfigured)?;
    tracing::info!(model = client.model(), images = client.supports_images(), "LLM client initialized");
    let generator: Arc<dyn Generator> = Arc::new(client);
    let state = AppState::new(store, Some(generator), PersonaCatalog::builtin()?, identity);

    let route = ChatRoute::parse(id);
    let Some(mut session) = state.open_chat(route, assistant, description) else {
        return Err(CliError::ChatUnavailable("generation client missing".into()));
    };

    let mut input = screens::stdin();
    let mut out = std::io::stdout();
    let interrupt = || async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Without a handler nothing can interrupt; never cancel.
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };
    let exit = screens::chat::run(&mut input, &mut out, &mut session, &state.identity, &state.catalog, interrupt).await?;
    out.flush()?;
    match exit {
        ChatExit::Quit => Ok(()),
        ChatExit::Redirected => {
            println!("Back to home. Run `chatbuddy chats` to see your conversations.");
            Ok(())
        }
        ChatExit::Failed => {
            Err(CliError::ChatUnavailable(session.error().unwrap_or("unknown error").to_owned()))
        }
    }
}

/// Identity from the saved session.
fn signed_in(sessions: &SessionFile) -> Result<IdentityHandle, CliError> {
    let session = sessions.load()?.ok_or(CliError::NotSignedIn)?;
    Ok(IdentityHandle::resolved(&session.user_id))
}

async fn connect_store() -> Result<Arc<dyn ChatStore>, CliError> {
    let config = db::DbConfig::from_env()?;
    let pool = db::init_pool(&config).await?;
    Ok(Arc::new(PgChatStore::new(pool)))
}
