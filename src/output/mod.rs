pub mod config;
pub mod presenter;
pub mod types;

use anyhow::Result;

pub use presenter::Emitter;

/// Render an envelope to stdout with the presenter selected by `--json` / env.
pub fn emit(env: &types::Envelope) -> Result<()> {
    let cfg = config::OutputConfig::from_env();
    Emitter::from_config(cfg).emit(env)?;
    Ok(())
}
