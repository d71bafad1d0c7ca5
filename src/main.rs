mod api;
mod cli;
mod config;
mod core;
mod dispatch;
mod integrations;
mod prelude;
mod retry;
mod scheduler;
mod tables;

use clap::Parser;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use crate::{
    api::{
        apaga_luz,
        open_meteo,
        provider::{PriceProvider, WeatherProvider},
    },
    cli::{Args, Command},
    config::Settings,
    core::planner,
    dispatch::ActionDispatcher,
    prelude::*,
    scheduler::Scheduler,
};

#[tokio::main]
async fn main() -> Result {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy(),
        )
        .init();

    match Args::parse().command {
        Command::Run(args) => {
            let settings = Settings::load(&args.config)?;
            let dispatcher = ActionDispatcher::try_from_settings(&settings)?;
            if dispatcher.is_empty() {
                warn!("no integrations are configured, actions will only be logged");
            }
            let prices: Box<dyn PriceProvider> =
                Box::new(apaga_luz::Api::try_new(settings.price.zone)?);
            let weather: Option<Box<dyn WeatherProvider>> = match &settings.weather {
                Some(weather) => Some(Box::new(open_meteo::Api::try_new(weather)?)),
                None => None,
            };
            Scheduler::new(&settings, prices, weather, dispatcher).run().await
        }

        Command::Plan(args) => {
            let settings = Settings::load(&args.config)?;
            let series = apaga_luz::Api::try_new(settings.price.zone)?.fetch_today().await?;
            let plan = planner::plan(&series, settings.device.active_hours)?;
            println!("{}", tables::build_price_table(&series));
            println!("{}", tables::build_plan_table(&plan));
            Ok(())
        }
    }
}
