//! bookshelf-web - catalog management web application
//!
//! Server-rendered HTML catalog of books with genre, platform, publisher and
//! format lookup tables, backed by SQLite. Also serves uploaded cover images
//! and a small read-only JSON API.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use bookshelf_common::config;
use bookshelf_common::db::init::init_database;
use bookshelf_web::upload::ImageStore;
use bookshelf_web::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "bookshelf-web", version, about = "Catalog management web application")]
struct Args {
    /// Root folder for the database and uploaded images
    /// (overrides BOOKSHELF_ROOT and the config file)
    #[arg(long)]
    root_folder: Option<String>,

    /// Port to listen on
    #[arg(long, default_value_t = 5780)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately, before database delays
    info!("Starting Bookshelf Web (bookshelf-web) v{}", env!("CARGO_PKG_VERSION"));

    // 4-tier root folder resolution: CLI > env > config file > default
    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    config::ensure_directories(&root_folder)?;
    info!("Root folder: {}", root_folder.display());

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database initialized");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let images = ImageStore::new(config::images_dir(&root_folder));
    let state = AppState::new(pool, images);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("bookshelf-web listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
