use anyhow::Context;
use clap::Parser;
use nilaid::config::ServiceConfig;
use nilaid::db::{self, Store};
use nilaid::http::{serve, AppState};
use nilaid::logging::init_logging;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::parse();
    init_logging(&config);

    let store = Store::new(config.database.clone(), config.store_timeout());
    {
        let conn = store
            .open()
            .with_context(|| format!("open database {}", config.database.display()))?;
        db::ensure_schema(&conn)?;
    }

    let state = AppState {
        store,
        on_row_error: config.on_row_error,
    };

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind {}", config.listen))?;
    serve(listener, state).await
}
