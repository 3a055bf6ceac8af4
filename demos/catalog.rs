use anyhow::{Context, Result};
use chrono::Duration;
use hapi_client::{Server, pretty};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that walks one HAPI server.
    // Pass the server URL as the first argument, or configure it via HAPI_URL / .hapirc.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = match std::env::args().nth(1) {
        Some(url) => Server::new(url)?,
        None => Server::from_env()?,
    };

    let caps = server
        .fetch_capabilities()?
        .context("server did not answer with HAPI capabilities")?;
    println!("{}", pretty::render(&*caps));

    let catalog = server.fetch_catalog()?.context("no catalog")?;
    println!("{} dataset(s)", catalog.len());
    let dataset = catalog.first().context("empty catalog")?;

    let info = dataset.description()?.context("no dataset info")?;
    println!("{}", pretty::render(&*info));

    let start = info.start().context("unparseable startDate")?;
    let stop = info.stop().context("unparseable stopDate")?;
    let mid = start + (stop - start) / 2;
    match server.fetch_data(&dataset.id, mid, mid + Duration::minutes(10), None)? {
        Some(table) => println!("{table}"),
        None => println!("no data between {mid} and {}", mid + Duration::minutes(10)),
    }
    Ok(())
}
