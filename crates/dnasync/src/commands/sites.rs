//! Site command handlers.

use std::collections::BTreeMap;

use tabled::Tabled;

use dnasync_core::{SiteSummary, TenantListing};

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Controller")]
    controller: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hierarchy")]
    hierarchy: String,
    #[tabled(rename = "Type")]
    location_type: String,
    #[tabled(rename = "Country")]
    country: String,
}

impl SiteRow {
    fn new(controller: &str, s: &SiteSummary) -> Self {
        Self {
            controller: controller.to_owned(),
            name: s.name.clone(),
            hierarchy: s.hierarchy.clone(),
            location_type: s.location_type.clone().unwrap_or_default(),
            country: s.country.clone().unwrap_or_default(),
        }
    }
}

/// Flatten listed tenants into rows; report the unavailable ones on stderr.
pub(super) fn flatten<'a, T>(
    listings: &'a BTreeMap<String, TenantListing<T>>,
    quiet: bool,
) -> Vec<(&'a str, &'a T)> {
    let mut rows = Vec::new();
    for (host, listing) in listings {
        match listing {
            TenantListing::Listed { items } => {
                rows.extend(items.iter().map(|item| (host.as_str(), item)));
            }
            TenantListing::Unavailable { reason } => {
                util::notice(&format!("{host}: unavailable ({reason})"), quiet);
            }
        }
    }
    rows
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: SitesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SitesCommand::List(tenant) => {
            let listings = ctx.reconciler.list_sites(&tenant.scope()).await?;
            let rows = flatten(&listings, global.quiet);
            let out = output::render_list(
                &global.output,
                &listings,
                &rows,
                |&(host, s)| SiteRow::new(host, s),
                |(_, s)| s.hierarchy.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
