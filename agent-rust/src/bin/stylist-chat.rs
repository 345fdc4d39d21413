use dotenvy::dotenv;
use std::{
    env,
    io::{self, Write},
};
use stylist_agent::{catalog::load_catalog, CallbackListener, Orchestrator};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let orchestrator = Orchestrator::from_env()?;

    let listener = CallbackListener::new()
        .on_log(|message| eprintln!("* {message}"))
        .on_image(|locator| println!("[image] {locator}"));

    // A message on the command line runs once; otherwise read messages from stdin
    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        let catalog = load_catalog(orchestrator.storage().as_ref()).await;
        let reply = orchestrator.run(&args.join(" "), &catalog, &listener).await?;
        println!("{reply}");
        return Ok(());
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        // Re-read every turn so a fresh index is picked up
        let catalog = load_catalog(orchestrator.storage().as_ref()).await;
        let reply = orchestrator.run(&line, &catalog, &listener).await?;
        println!("{reply}\n");
    }

    Ok(())
}
