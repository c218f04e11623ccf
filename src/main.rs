//! Groups UMIs from a UMI count file by the positions they occur at.

use anyhow::Result;
use clap::Parser;

pub mod anchors;
mod app;
pub mod io;
mod logging;
pub mod metrics;
pub mod progress;
pub mod record;
pub mod scan;

use app::{App, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::parse();
    logging::init_logging(config.verbose, config.quiet);

    let mut app = App::new(config).await?;
    app.run().await?;

    Ok(())
}
