//! Foard — collaborative task board.
//!
//! Runs an offline demo against the in-memory store: signs in, creates a
//! board, seeds a few tasks, performs a couple of moves, and prints the
//! resulting board. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/foard/config.toml`).
//!
//! ```bash
//! cargo run --bin foard -- --name alice --lucky-number 7
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use foard::board::{BoardManager, BoardSession};
use foard::config::{CliArgs, ClientConfig};
use foard::identity::{Identity, upsert_user};
use foard_model::Category;
use foard_store::DocumentStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("foard starting");

    let store = Arc::new(DocumentStore::with_retry_limit(config.txn_retry_limit));
    let identity = Identity::new();
    let name = config.name.clone().unwrap_or_else(|| "demo".to_string());
    let lucky = config.lucky_number.unwrap_or(7);
    identity.sign_in(&name, lucky)?;
    let user = identity.wait(config.identity_wait_timeout).await?;
    upsert_user(&store, &user).await?;

    let manager = BoardManager::new(store, config.cache.clone())
        .with_title_limit(config.max_task_title_len);
    let board = manager.create_board(&user, "Demo board").await?;
    let invite = manager
        .create_invite(&user, &board.id, config.invite_ttl)
        .await?;
    println!("Board {} ({})", board.name, board.id);
    println!("Invite token: {}\n", invite.token);

    let (mut session, _subscription) = BoardSession::open(&manager, &board.id, &user).await?;

    session
        .create_tasks("ship the release\nwrite the changelog", Category::Now)
        .await?;
    let day = session
        .create_tasks("review patches\nplan sprint\nclear inbox", Category::Day)
        .await?;

    // Reorder inside Day, then pull one task into Now.
    session.move_task(&day[2].id, 0).await?;
    session
        .move_task_to(&day[0].id, Category::Now, None)
        .await?;
    session.archive_task(&day[1].id).await?;

    print_board(&session);

    tracing::info!("foard exiting");
    Ok(())
}

/// Initialize file-based logging.
///
/// Logs go to a file so stdout stays clean for board output. Returns a
/// [`WorkerGuard`] that must be held until shutdown to ensure all buffered
/// log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("foard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Render the board to stdout, one column per category plus the archive.
fn print_board(session: &BoardSession) {
    let view = session.view();
    for column in &view.columns {
        println!("== {} ==", column.category);
        for task in &column.tasks {
            println!("  [{}] {}", task.tag, task.title);
        }
        if column.tasks.is_empty() {
            println!("  (empty)");
        }
        println!();
    }
    if !view.archive.is_empty() {
        println!("== Archive ==");
        for group in &view.archive {
            println!("  {}", group.day);
            for task in &group.tasks {
                println!("    {} (was {})", task.title, task.tag);
            }
        }
    }
}
