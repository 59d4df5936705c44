//! Stage listing and configuration validation

use anyhow::Result;
use clap::Args;

use eden_core::types::LifecycleStage;
use eden_runtime::system::RuntimeConfig;

/// Arguments for the validate command
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the configuration file
    #[clap(long)]
    pub config: String,
}

/// Print every stage in boot order
pub fn execute_stages() {
    for stage in LifecycleStage::ALL {
        println!("{:>2} {}", stage.index(), stage);
    }
}

/// Load and validate a configuration file
pub async fn execute_validate(args: ValidateArgs) -> Result<()> {
    let config = RuntimeConfig::load(Some(&args.config)).await?;
    let hooks = config.hook_sources()?;

    println!("Configuration is valid");
    println!("  location: {}", config.bootstrap.location);
    println!("  hooks:    {}", hooks.len());
    println!("  packages: {}", config.packages.len());
    println!(
        "  gating:   {}",
        config
            .dispatcher
            .gating_stages
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}
