use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global fmt subscriber. `verbose` forces DEBUG; otherwise
/// `RUST_LOG` applies, falling back to INFO.
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new(Level::DEBUG.as_str().to_ascii_lowercase())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
