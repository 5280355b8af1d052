//! Warden CLI - inspect and drive the persisted session from a terminal
//!
//! Every command works on the same durable slots an interactive client uses, so
//! a `login` here is picked up by any running `warden watch` on its next tick.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use warden_auth::{
    AuthorizationGateway, OrganizationPermission, ProjectPermission, RouteParams, ScopeKind,
};
use warden_core::{
    init_logging, log_operation_error, log_operation_start, DiagnosticSink, TracingSink,
    WardenConfig, WardenError,
};
use warden_session::{SelectedOrganization, Session, SessionClock, SessionContext};

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Session persistence and permission checks for the Warden API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save a session record (JSON) as the current login
    Login {
        /// File holding the session record, or `-` for stdin
        source: String,
    },

    /// Forget the current session and everything tied to it
    Logout,

    /// Print the current session
    Whoami,

    /// Ask the API whether the current session holds a permission
    Allowed {
        /// Scope kind: organization or project
        scope: ScopeKind,

        /// Organization or project slug/uuid
        id: String,

        /// Permission, e.g. edit or delete_role
        permission: String,
    },

    /// Whether USER is the logged-in user (admins always match)
    SameUser {
        user: String,
    },

    /// Select the organization to work in
    SelectOrg {
        slug: String,

        /// Organization uuid (defaults to the slug)
        #[arg(long)]
        uuid: Option<String>,

        /// Display name (defaults to the slug)
        #[arg(long)]
        name: Option<String>,
    },

    /// Keep the session in sync with storage and print every change
    Watch,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = WardenConfig::load(config_path.as_deref())?;

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    init_logging(&logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!("Starting Warden CLI v{}", env!("CARGO_PKG_VERSION"));

    let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);

    let context = || SessionContext::from_config(&config.storage, Arc::clone(&sink));

    match cli.command {
        Commands::Login { source } => handle_login(&context(), &source).await,
        Commands::Logout => {
            context().cache.logout();
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami => handle_whoami(&context()),
        Commands::Allowed {
            scope,
            id,
            permission,
        } => handle_allowed(&config, &context(), Arc::clone(&sink), scope, &id, &permission).await,
        Commands::SameUser { user } => {
            let gateway =
                AuthorizationGateway::new(&config.http, context().cache, Arc::clone(&sink))
                    .inspect_err(WardenError::log)?;
            let params = RouteParams::new().with_user(user);
            println!("{}", gateway.is_same_user(Some(&params)));
            Ok(())
        }
        Commands::SelectOrg { slug, uuid, name } => handle_select_org(&context(), slug, uuid, name),
        Commands::Watch => handle_watch(&config, &context()).await,
        Commands::Config { action } => handle_config(action, &config, config_path.as_deref()),
    }
}

/// Explicit path, else the default location when a file exists there
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| WardenConfig::default_path().filter(|path| path.exists()))
}

async fn handle_login(context: &SessionContext, source: &str) -> Result<()> {
    log_operation_start!("login", source = source);

    let json = if source == "-" {
        tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
            .await
            .context("stdin reader panicked")??
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read session record from {}", source))?
    };

    let session = match Session::parse(&json) {
        Ok(session) => session,
        Err(e) => {
            log_operation_error!("login", e);
            bail!("Not a session record: {}", e);
        }
    };

    if !context.cache.login(session) {
        bail!("Session record rejected; the previous login is unchanged");
    }

    let user = context.cache.with_current(|s| s.identity.slug.clone());
    info!(user = %user, "Logged in");
    println!("Logged in as {}", user);
    Ok(())
}

fn handle_whoami(context: &SessionContext) -> Result<()> {
    let session = context.cache.current();
    if session.is_anonymous() {
        println!("anonymous");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&session.sanitized())?);
    if let Some(organization) = context.organization.selected() {
        println!("organization: {} ({})", organization.slug, organization.uuid);
    }
    Ok(())
}

async fn handle_allowed(
    config: &WardenConfig,
    context: &SessionContext,
    sink: Arc<dyn DiagnosticSink>,
    scope: ScopeKind,
    id: &str,
    permission: &str,
) -> Result<()> {
    let gateway = AuthorizationGateway::new(&config.http, context.cache.clone(), sink)
        .inspect_err(WardenError::log)?;

    let allowed = match scope {
        ScopeKind::Organization => {
            let permission: OrganizationPermission = permission.parse()?;
            gateway.check(&config.api_url, Some(id), permission).await
        }
        ScopeKind::Project => {
            let permission: ProjectPermission = permission.parse()?;
            gateway.check(&config.api_url, Some(id), permission).await
        }
    };

    println!("{}", allowed);
    Ok(())
}

fn handle_select_org(
    context: &SessionContext,
    slug: String,
    uuid: Option<String>,
    name: Option<String>,
) -> Result<()> {
    if context.cache.current().is_anonymous() {
        bail!("Not logged in");
    }

    let organization = SelectedOrganization {
        uuid: uuid.unwrap_or_else(|| slug.clone()),
        name: name.unwrap_or_else(|| slug.clone()),
        slug,
    };
    if !context.organization.select(&organization) {
        bail!("Organization selection rejected");
    }

    println!("Selected organization {}", organization.slug);
    Ok(())
}

async fn handle_watch(config: &WardenConfig, context: &SessionContext) -> Result<()> {
    let mut changes = context.cache.subscribe();
    let clock = SessionClock::start(context.cache.clone(), config.clock.period());
    info!(period_ms = config.clock.interval_ms, "Watching session");

    print_session(&changes.borrow_and_update());
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                print_session(&changes.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; stopping session clock");
                break;
            }
        }
    }

    clock.stop();
    Ok(())
}

fn print_session(session: &Session) {
    if session.is_anonymous() {
        println!("session: anonymous");
    } else {
        println!(
            "session: {} (expires {})",
            session.identity.slug,
            session
                .expires_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
    }
}

fn handle_config(
    action: ConfigAction,
    config: &WardenConfig,
    config_path: Option<&Path>,
) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path.to_path_buf(),
                None => WardenConfig::default_path()
                    .context("No configuration directory on this platform; pass --config")?,
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            WardenConfig::default()
                .save_to_file(&path)
                .inspect_err(WardenError::log)?;
            println!("Configuration initialized at: {}", path.display());
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_allowed() {
        let cli = Cli::try_parse_from([
            "warden",
            "--verbose",
            "allowed",
            "project",
            "p1",
            "edit",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Allowed {
                scope,
                id,
                permission,
            } => {
                assert_eq!(scope, ScopeKind::Project);
                assert_eq!(id, "p1");
                assert_eq!(permission, "edit");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_scope() {
        assert!(Cli::try_parse_from(["warden", "allowed", "team", "t1", "edit"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["warden", "login", "-", "--config", "/tmp/warden.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/warden.toml")));
        assert!(matches!(cli.command, Commands::Login { ref source } if source == "-"));
    }

    #[test]
    fn config_subcommands() {
        let cli = Cli::try_parse_from(["warden", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
        assert!(Cli::try_parse_from(["warden", "config"]).is_err());
    }
}
