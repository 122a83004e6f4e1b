use anyhow::{format_err, Result};
use tracing_subscriber::EnvFilter;

use lastweek::{config::Config, fill_db, server, State};

const DEFAULT_LOG_FILTER: &str = "lastweek=info,tower_http=info";

async fn fill(config: Config) -> Result<()> {
    if !config.dev {
        return Err(format_err!("fill-db is only available with LASTWEEK_DEV=true"));
    }
    let state = State::try_new(config).await?;
    fill_db::fill_db(&state.db).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let result = match Config::from_env() {
        Ok(config) => match std::env::args().nth(1).as_deref() {
            None | Some("serve") => server::run(config).await,
            Some("fill-db") => fill(config).await,
            Some(other) => Err(format_err!("unknown command {:?}, expected serve or fill-db", other)),
        },
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
