use anyhow::Result;
use mysql_exporter::cli::{actions::run, commands, dispatch, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = commands::new().get_matches();

    telemetry::init()?;

    let action = dispatch::handler(&matches)?;

    run::handle(action).await
}
