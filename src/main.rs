//! bankim-content - resolve screen content and dropdowns from the command line

use clap::Parser;
use tracing::{error, info};

use bankim_content::{
    config::{Args, Command},
    dropdown::OptionFilter,
    logging, EngineConfig, FormContentEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init_tracing(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Content service: {}", args.api_url);
    info!("Language: {} (fallback {})", args.language, args.fallback_language);

    let engine = FormContentEngine::init(EngineConfig::from_args(&args))?;

    match args.command {
        Command::Content {
            screen,
            keys,
            fallback,
        } => {
            let view = engine.content().load(&screen).await;
            if let Some(error) = view.error() {
                error!(screen_location = %screen, "Content unavailable: {}", error);
            }

            if keys.is_empty() {
                match view.bundle() {
                    Some(bundle) => println!("{}", serde_json::to_string_pretty(bundle)?),
                    None => println!("{{}}"),
                }
            } else {
                for key in keys {
                    let resolved = view.resolve(&key, fallback.as_deref());
                    println!("{}\t{}\t{:?}", key, resolved.value, resolved.tier);
                }
            }
        }

        Command::Dropdown {
            screen,
            field,
            mode,
            exclude,
        } => {
            let filter = exclude
                .into_iter()
                .fold(OptionFilter::new(), |filter, value| filter.exclude(value));
            let data = engine
                .dropdowns()
                .get_filtered(&screen, &field, mode, &filter)
                .await;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }

        Command::Fields { screen } => {
            let table = engine.dropdowns().field_table();
            match table.screen(&screen) {
                Some(fields) => println!("{}", serde_json::to_string_pretty(fields)?),
                None => println!("{} has no table entry; fields resolve to {}_<field>", screen, screen),
            }
        }
    }

    Ok(())
}
