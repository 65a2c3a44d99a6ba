//! `purge-tenant`: remove a managed NetBox tenant and everything it owns.

use dnasync_core::{RecordId, TenantPurgeReport};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{Context, util};

fn detail(report: &TenantPurgeReport) -> String {
    format!(
        "Purged tenant '{}': {} device(s), {} IP address(es), {} site(s)",
        report.tenant, report.devices, report.ip_addresses, report.sites
    )
}

pub async fn handle(ctx: &Context, id: RecordId, global: &GlobalOpts) -> Result<(), CliError> {
    if !util::confirm(
        &format!("Delete NetBox tenant {id} with all its devices, IP addresses and sites?"),
        "purge-tenant",
        global.yes,
    )? {
        return Ok(());
    }

    let report = ctx.reconciler.purge_tenant(id).await?;
    let out = output::render_single(&global.output, &report, detail, |r| r.tenant.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
