//! Sync command handlers.
//!
//! `sync sites` and `sync devices` run in the foreground. `sync full` runs
//! as a job: a second invocation while one is in flight joins it, and
//! Ctrl-C cancels it.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use dnasync_core::{
    DeviceRow, FullSyncReport, FullSyncService, JobStatus, PurgeOutcome, ReportRow, SiteRow,
    SyncLease, SyncReport, TenantResult,
};

use crate::cli::{GlobalOpts, SyncArgs, SyncCommand, TenantArg};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteTableRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Slug")]
    slug: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Result")]
    outcome: String,
}

#[derive(Tabled)]
struct DeviceTableRow {
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Primary IP")]
    primary_ip: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Result")]
    outcome: String,
}

/// A report row that knows its table shape.
trait Rendered: ReportRow + Serialize {
    type Row: Tabled;

    fn table_row(&self, color: bool) -> Self::Row;
    fn name(&self) -> &str;
}

impl Rendered for SiteRow {
    type Row = SiteTableRow;

    fn table_row(&self, color: bool) -> SiteTableRow {
        SiteTableRow {
            name: self.name.clone(),
            slug: self.slug.clone(),
            status: self.status.to_string(),
            outcome: output::paint_outcome(&self.outcome, color),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Rendered for DeviceRow {
    type Row = DeviceTableRow;

    fn table_row(&self, color: bool) -> DeviceTableRow {
        DeviceTableRow {
            hostname: self.hostname.clone(),
            site: self.site.clone(),
            role: self.role.clone(),
            device_type: self.device_type.clone(),
            primary_ip: self.primary_ip.clone().unwrap_or_default(),
            status: self.status.to_string(),
            outcome: output::paint_outcome(&self.outcome, color),
        }
    }

    fn name(&self) -> &str {
        &self.hostname
    }
}

// ── Rendering ───────────────────────────────────────────────────────

fn purge_line(purge: &PurgeOutcome, color: bool) -> String {
    match purge {
        PurgeOutcome::NoChange => "nothing to purge".into(),
        PurgeOutcome::Purged { deleted } => format!("purged {}: {}", deleted.len(), deleted.join(", ")),
        PurgeOutcome::CompletedWithErrors { deleted, failed } => {
            let failures: Vec<String> = failed
                .iter()
                .map(|f| format!("{} ({})", f.key, f.error))
                .collect();
            output::paint_problem(
                &format!(
                    "purged {}, {} failed: {}",
                    deleted.len(),
                    failed.len(),
                    failures.join(", ")
                ),
                color,
            )
        }
    }
}

fn render_report<R: Rendered>(report: &SyncReport<R>, color: bool) -> String {
    let mut out = String::new();
    for (host, result) in &report.tenants {
        let _ = writeln!(out, "{host}");
        match result {
            TenantResult::Skipped { reason } => {
                let _ = writeln!(out, "  {}", output::paint_problem(&format!("skipped: {reason}"), color));
            }
            TenantResult::Synced { rows, purge } => {
                let table: Vec<R::Row> = rows.iter().map(|r| r.table_row(color)).collect();
                if !table.is_empty() {
                    let _ = writeln!(out, "{}", output::render_table(&table));
                }
                let _ = writeln!(out, "  {}", purge_line(purge, color));
            }
        }
        out.push('\n');
    }
    let _ = write!(
        out,
        "{} synced, {} failed",
        report.synced_count(),
        report.failure_count()
    );
    out
}

fn plain_lines<R: Rendered>(report: &SyncReport<R>) -> String {
    report
        .tenants
        .iter()
        .flat_map(|(host, result)| {
            result
                .rows()
                .iter()
                .map(move |row| format!("{host}\t{}\t{}", row.name(), row.outcome()))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn emit_report<R: Rendered>(report: &SyncReport<R>, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        report,
        |r| render_report(r, color),
        plain_lines::<R>,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn emit_full(report: &FullSyncReport, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        report,
        |r| {
            format!(
                "Sites\n\n{}\n\nDevices\n\n{}",
                render_report(&r.sites, color),
                render_report(&r.devices, color)
            )
        },
        |r| {
            [plain_lines(&r.sites), plain_lines(&r.devices)]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn finish(problems: usize) -> Result<(), CliError> {
    if problems == 0 {
        Ok(())
    } else {
        Err(CliError::SyncIncomplete { failures: problems })
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SyncCommand::Sites(tenant) => {
            let bar = util::spinner("syncing sites", global.quiet);
            let report = ctx.reconciler.sync_sites(&tenant.scope()).await;
            bar.finish_and_clear();
            let report = report?;
            emit_report(&report, global)?;
            finish(report.problem_count())
        }

        SyncCommand::Devices(tenant) => {
            let bar = util::spinner("syncing devices", global.quiet);
            let report = ctx.reconciler.sync_devices(&tenant.scope()).await;
            bar.finish_and_clear();
            let report = report?;
            emit_report(&report, global)?;
            finish(report.problem_count())
        }

        SyncCommand::Full(tenant) => full(ctx, &tenant, global).await,
    }
}

async fn full(ctx: &Context, tenant: &TenantArg, global: &GlobalOpts) -> Result<(), CliError> {
    let service = FullSyncService::with_lease(
        Arc::clone(&ctx.reconciler),
        SyncLease::new(ctx.config.lease_ttl()),
    );
    let acquired = service.start(tenant.scope()).await;
    let id = acquired.handle().id;
    if acquired.is_existing() {
        util::notice(&format!("joining full sync {id}"), global.quiet);
    }

    let bar = util::spinner("full sync", global.quiet);
    let mut phase = ctx.reconciler.phase();
    let mut phase_open = true;
    let wait = service.wait(id);
    tokio::pin!(wait);

    let record = loop {
        tokio::select! {
            record = &mut wait => break record,
            changed = phase.changed(), if phase_open => {
                if changed.is_ok() {
                    let current = *phase.borrow_and_update();
                    bar.set_message(format!("full sync: {current}"));
                } else {
                    phase_open = false;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                bar.set_message("cancelling");
                service.cancel(id)?;
            }
        }
    };
    bar.finish_and_clear();
    let record = record?;

    match (record.status, record.result) {
        (JobStatus::Finished, Some(report)) => {
            emit_full(&report, global)?;
            finish(report.sites.problem_count() + report.devices.problem_count())
        }
        (status, _) => Err(CliError::JobFailed {
            id: id.to_string(),
            status: status.to_string(),
            message: record.error.unwrap_or_else(|| "no result".into()),
        }),
    }
}
