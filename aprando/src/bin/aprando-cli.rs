use anyhow::{Context, Result};
use aprando::generate::{random_seed, Generator};
use aprando::settings::load_generation_settings;
use aprando::spoiler_log::get_spoiler_log;
use aprando::worlds::GAMES;
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    #[arg(long, required_unless_present = "list_games")]
    settings: Option<PathBuf>,

    /// Print the supported games and exit.
    #[arg(long)]
    list_games: bool,

    #[arg(long)]
    random_seed: Option<usize>,

    #[arg(long)]
    output_spoiler_log: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    if args.list_games {
        for game in GAMES {
            println!("{game}");
        }
        return Ok(());
    }
    let settings_path = args.settings.as_ref().context("--settings is required")?;
    let settings = load_generation_settings(settings_path)?;
    let seed = match args.random_seed.or(settings.seed) {
        Some(s) => s,
        None => random_seed(),
    };
    info!("Seed: {seed}");

    let mut generator = Generator::new(&settings, seed)?;
    generator
        .generate()
        .with_context(|| format!("Generation failed for seed {seed}"))?;

    let spoiler_log = get_spoiler_log(&generator);
    info!(
        "{} spheres, {} unreachable locations",
        spoiler_log.spheres.len(),
        spoiler_log.unreachable_locations.len()
    );
    if let Some(output_spoiler_log_path) = &args.output_spoiler_log {
        info!(
            "Writing spoiler log to {}",
            output_spoiler_log_path.display()
        );
        let spoiler_str = serde_json::to_string_pretty(&spoiler_log)?;
        std::fs::write(output_spoiler_log_path, spoiler_str)?;
    }
    Ok(())
}
