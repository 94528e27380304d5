use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pantry::{
    app,
    ingredients::import,
    state::{self, AppState},
};
use sqlx::PgPool;

#[derive(Debug, Parser)]
#[command(name = "pantry", version, about = "Recipe sharing backend")]
struct Cli {
    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0", global = true)]
    host: String,
    #[arg(long, env = "APP_PORT", default_value_t = 8080, global = true)]
    port: u16,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Load `name,measurement_unit` rows from a CSV file into the catalog.
    ImportIngredients {
        #[arg(default_value = "data/ingredients.csv")]
        path: PathBuf,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "pantry=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::ImportIngredients { path } => {
            let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
            let db = state::connect_db(&database_url).await?;
            migrate(&db).await?;
            import::import_file(&db, &path).await?;
        }
        Command::Serve => {
            let state = AppState::init().await?;
            migrate(&state.db).await?;
            app::serve(app::build_app(state), &cli.host, cli.port).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_takes_a_path_and_serve_is_the_default() {
        let cli = Cli::try_parse_from(["pantry", "import-ingredients", "extra.csv"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::ImportIngredients { ref path }) if path == &PathBuf::from("extra.csv")
        ));

        let cli = Cli::try_parse_from(["pantry"]).unwrap();
        assert!(cli.command.is_none());
    }
}
