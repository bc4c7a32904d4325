use std::net::SocketAddr;
use std::sync::Arc;

use quiz_proctor::{
    config::{get_config, init_config, LogFormat},
    database::{pool::create_pool, MemoryQuizStore, PgQuizStore, QuizStore},
    routes, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let store: Arc<dyn QuizStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to Postgres, migrations applied");
            Arc::new(PgQuizStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; quizzes and results are kept in memory only");
            Arc::new(MemoryQuizStore::new())
        }
    };

    let app_state = AppState::new(store, &config.jwt_secret);
    let app = routes::router(app_state, config.public_rps, config.educator_rps);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
