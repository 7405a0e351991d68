use clap::Parser;
use color_eyre::Result;
use tracing::info;

use querybar::{app::App, cli::Cli, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    querybar::errors::init()?;
    let args = Cli::parse();
    querybar::logging::init_with(None, args.logging.map(Into::into))?;

    let mut config = Config::from_path(args.config.as_ref())?;
    if let Some(schema) = args.schema {
        config.query.schema_path = Some(schema);
    }
    let schema = config.load_schema()?;
    info!(groups = schema.groups.len(), "schema loaded");

    let mut app = App::new(config, schema, args.tick_rate, args.frame_rate)?;
    app.run().await?;

    if args.print {
        println!("{}", serde_json::to_string_pretty(&app.query())?);
    }
    Ok(())
}
