//! `status`: controller and destination counts per tenant.

use std::fmt::Write as _;

use chrono::Local;
use tabled::Tabled;

use dnasync_core::{DestinationTenant, StatusReport, TenantStatus};

use crate::cli::{GlobalOpts, OutputFormat, TenantArg};
use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TenantStatusRow {
    #[tabled(rename = "Controller")]
    hostname: String,
    #[tabled(rename = "Auth")]
    auth: String,
    #[tabled(rename = "Sites (DNAC)")]
    remote_sites: String,
    #[tabled(rename = "Devices (DNAC)")]
    remote_devices: String,
    #[tabled(rename = "Sites (NetBox)")]
    destination_sites: usize,
    #[tabled(rename = "Devices (NetBox)")]
    destination_devices: usize,
}

fn count_cell<T: ToString>(count: Option<T>) -> String {
    count.map_or_else(|| "-".into(), |c| c.to_string())
}

impl TenantStatusRow {
    fn new(hostname: &str, status: &TenantStatus, color: bool) -> Self {
        Self {
            hostname: hostname.to_owned(),
            auth: output::paint_auth(&status.auth_status, color),
            remote_sites: count_cell(status.remote_site_count),
            remote_devices: count_cell(status.remote_device_count),
            destination_sites: status.destination_site_count,
            destination_devices: status.destination_device_count,
        }
    }
}

#[derive(Tabled)]
struct DestinationTenantRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Tenant")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Managed")]
    managed: String,
}

impl DestinationTenantRow {
    fn new(tenant: &DestinationTenant, color: bool) -> Self {
        let managed = if tenant.managed {
            "yes".to_owned()
        } else {
            output::paint_problem("orphan", color)
        };
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            description: tenant.description.clone(),
            created: tenant
                .created
                .map(|t| {
                    t.with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string()
                })
                .unwrap_or_default(),
            managed,
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────

fn detail(report: &StatusReport, color: bool) -> String {
    let tenants: Vec<_> = report
        .tenants
        .iter()
        .map(|(host, status)| TenantStatusRow::new(host, status, color))
        .collect();
    let destination: Vec<_> = report
        .destination_tenants
        .iter()
        .map(|t| DestinationTenantRow::new(t, color))
        .collect();

    let mut out = String::new();
    if tenants.is_empty() {
        out.push_str("No controllers configured");
    } else {
        out.push_str(&output::render_table(&tenants));
    }
    if !destination.is_empty() {
        let _ = write!(
            out,
            "\n\nNetBox tenants\n{}",
            output::render_table(&destination)
        );
    }
    let orphans = report.orphans().count();
    if orphans > 0 {
        let _ = write!(
            out,
            "\n\n{orphans} orphaned tenant(s); remove with `dnasync purge-tenant <ID>`"
        );
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: &TenantArg, global: &GlobalOpts) -> Result<(), CliError> {
    let report = ctx.reconciler.status(&args.scope()).await?;
    let color = output::should_color(&global.color);

    let out = match global.output {
        OutputFormat::Plain => report
            .tenants
            .iter()
            .map(|(host, status)| format!("{host}\t{}", status.auth_status))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => output::render_single(
            &global.output,
            &report,
            |r| detail(r, color),
            |_| String::new(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
