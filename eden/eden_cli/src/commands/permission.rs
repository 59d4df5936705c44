//! Permission inspection

use anyhow::{bail, Context, Result};
use clap::Args;

use eden_core::types::{PermissionDescriptor, PermissionKind};
use eden_runtime::system::RuntimeConfig;
use eden_runtime::Runtime;

/// Arguments for the check-permission command
#[derive(Args)]
pub struct CheckPermissionArgs {
    /// Path to the configuration file
    #[clap(long)]
    pub config: String,

    /// Descriptor as JSON (`{"name":"read","path":"/etc"}`) or `kind[:scope]`
    pub descriptor: String,
}

/// Parse a descriptor from JSON or the `kind[:scope]` shorthand.
pub fn parse_descriptor(input: &str) -> Result<PermissionDescriptor> {
    let input = input.trim();
    if input.starts_with('{') {
        let descriptor: PermissionDescriptor =
            serde_json::from_str(input).context("Invalid descriptor JSON")?;
        return Ok(descriptor.normalize());
    }

    let (kind, scope) = match input.split_once(':') {
        Some((kind, scope)) => (kind, Some(scope)),
        None => (input, None),
    };
    let kind: PermissionKind = kind.parse()?;

    let descriptor = match (kind, scope) {
        (_, None) => PermissionDescriptor::unscoped_of(kind),
        (PermissionKind::Run, Some(scope)) => PermissionDescriptor::run(scope),
        (PermissionKind::Read, Some(scope)) => PermissionDescriptor::read(scope),
        (PermissionKind::Write, Some(scope)) => PermissionDescriptor::write(scope),
        (PermissionKind::Env, Some(scope)) => PermissionDescriptor::env(scope),
        (PermissionKind::Net, Some(scope)) => PermissionDescriptor::net(scope),
        (PermissionKind::LifecycleHook, Some(scope)) => PermissionDescriptor::lifecycle_hook(scope),
        (other, Some(_)) => bail!("Permission {} takes no scope", other),
    };
    Ok(descriptor)
}

/// Print the decision the configuration and the decision store yield
pub async fn execute(args: CheckPermissionArgs) -> Result<()> {
    let descriptor = parse_descriptor(&args.descriptor)?;
    let config = RuntimeConfig::load(Some(&args.config)).await?;
    let runtime = Runtime::builder(config).build().await?;

    let state = runtime.permissions.query(&descriptor);
    println!("{} {}", descriptor, state);
    Ok(())
}
