use lineage_config::LineageConfig;

use crate::cli::{Commands, GlobalFlags};

pub mod create_flat_result;
pub mod resolve;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(
    command: Commands,
    config: &LineageConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::CreateFlatResult(args) => create_flat_result::handle(&args, flags),
        Commands::Resolve(args) => resolve::handle(&args, config, flags).await,
        Commands::Config => crate::output::output(config, flags.format),
    }
}
