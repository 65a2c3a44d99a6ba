//! Command dispatch: bridges CLI args -> reconciler calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod purge;
pub mod sites;
pub mod status;
pub mod sync;
pub mod util;

use std::sync::Arc;
use std::time::Duration;

use dnasync_config::{Config, FileTenants};
use dnasync_core::{
    DestinationStore, DnacConnector, Gateway, MemoryStore, NetBoxStore, Reconciler,
    TenantRegistry,
};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a controller-bound command needs.
pub struct Context {
    pub reconciler: Arc<Reconciler>,
    pub config: Config,
}

/// Load the config file and wire the reconciler to the tenants it lists and
/// to the destination (NetBox, or an empty in-memory store on `--dry-run`).
pub fn build_context(global: &GlobalOpts) -> Result<Context, CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(dnasync_config::config_path);
    if !path.exists() {
        return Err(CliError::NoConfig {
            path: path.display().to_string(),
        });
    }

    let config = dnasync_config::load_config_from(&path)?;
    let timeout = global
        .timeout
        .map_or_else(|| config.timeout(), Duration::from_secs);

    let store: Arc<dyn DestinationStore> = if global.dry_run {
        tracing::info!("dry run: writing to an in-memory destination");
        Arc::new(MemoryStore::new())
    } else {
        let dest = config.destination()?;
        Arc::new(NetBoxStore::connect(
            dest.url.as_str(),
            &dest.token,
            dest.verify_tls,
            timeout,
        )?)
    };

    let registry = TenantRegistry::new(
        Arc::new(FileTenants::new(path)),
        Arc::new(DnacConnector::new(timeout, config.sync.page_size)),
    );

    Ok(Context {
        reconciler: Arc::new(Reconciler::new(registry, Gateway::new(store))),
        config,
    })
}

/// Dispatch a reconciler-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(ctx, &args, global).await,
        Command::Sites(args) => sites::handle(ctx, args, global).await,
        Command::Devices(args) => devices::handle(ctx, args, global).await,
        Command::Sync(args) => sync::handle(ctx, args, global).await,
        Command::PurgeTenant { id } => purge::handle(ctx, id, global).await,
        // Handled in main before a context exists
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "does not take a controller context".into(),
        }),
    }
}
