//! Device command handlers.

use tabled::Tabled;

use dnasync_core::RemoteDevice;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::sites::flatten;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Controller")]
    controller: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Reachability")]
    reachability: String,
    #[tabled(rename = "Support")]
    support: String,
    #[tabled(rename = "Serial")]
    serial: String,
}

impl DeviceRow {
    fn new(controller: &str, d: &RemoteDevice) -> Self {
        Self {
            controller: controller.to_owned(),
            hostname: d.hostname.clone(),
            ip: d.management_ip.clone().unwrap_or_default(),
            family: d.family.clone(),
            role: d.role.clone(),
            reachability: d.reachability.clone(),
            support: d.support_level.clone(),
            serial: d.serial.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List(tenant) => {
            let listings = ctx.reconciler.list_devices(&tenant.scope()).await?;
            let rows = flatten(&listings, global.quiet);
            let out = output::render_list(
                &global.output,
                &listings,
                &rows,
                |&(host, d)| DeviceRow::new(host, d),
                |(_, d)| d.hostname.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
