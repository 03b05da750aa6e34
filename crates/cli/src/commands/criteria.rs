//! `appraisal criteria`: list the evaluation grid.

use serde::Serialize;

use appraisal_core::{CriteriaGroup, CriteriaItem};

use crate::context::Context;
use crate::OutputFormat;

#[derive(Serialize)]
struct GroupListing {
    #[serde(flatten)]
    group: CriteriaGroup,
    items: Vec<CriteriaItem>,
}

pub(crate) async fn cmd_criteria(ctx: &Context) -> Result<(), String> {
    let groups = ctx
        .backend
        .criteria_groups()
        .await
        .map_err(|e| e.to_string())?;

    let mut listing = Vec::with_capacity(groups.len());
    for group in groups {
        let items = ctx
            .backend
            .criteria_items(group.id)
            .await
            .map_err(|e| e.to_string())?;
        listing.push(GroupListing { group, items });
    }

    match ctx.output {
        OutputFormat::Json => ctx.print_json(&listing),
        OutputFormat::Text => {
            for entry in &listing {
                ctx.print_text(format!("{} (#{})", entry.group.name, entry.group.id));
                for item in &entry.items {
                    ctx.print_text(format!(
                        "  #{} [{}] {}",
                        item.id, item.item_type, item.label
                    ));
                }
            }
        }
    }
    Ok(())
}
