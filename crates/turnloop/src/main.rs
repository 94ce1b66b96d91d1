//! The seminar registration desk in the terminal.

#[macro_use]
extern crate tracing;

use anyhow::Context as _;
use owo_colors::OwoColorize;
use tokio::io::{self, BufReader};
use turnloop::tools::RegistrationDesk;
use turnloop::{AppConfig, Driver, DriverExit, WELCOME_MESSAGE};
use turnloop_openai_model::OpenAIProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    debug!("using {:?}", config.openai);

    let model_provider = OpenAIProvider::new(config.openai);
    let desk = RegistrationDesk::default();
    let engine = turnloop::engine_builder(model_provider, &desk)
        .with_max_iterations(config.max_iterations)
        .build();

    let mut session = engine
        .open_session(config.session_id)
        .await
        .context("failed to open the session")?;
    eprintln!("{}", format!("session {}", session.id()).dimmed());

    let mut driver =
        Driver::new(engine, BufReader::new(io::stdin()), io::stdout())
            .with_welcome(WELCOME_MESSAGE)
            .with_colors(true)
            .with_spinner(true);

    match driver.run(&mut session).await? {
        DriverExit::ExitToken => debug!("user left the desk"),
        DriverExit::EndOfInput => println!(),
    }
    Ok(())
}
