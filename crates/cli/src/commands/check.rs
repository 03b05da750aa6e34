//! `appraisal check`: dry-run a responses file through the evaluation form.
//!
//! Responses are applied for whoever is answering at the current step and
//! rendered group by group, with the same tab warnings the form shows.
//! Nothing is sent to the backend.

use std::path::Path;

use serde::Serialize;

use appraisal_core::{GroupId, GroupTab, ItemId, ItemView, WorkflowStep};

use crate::context::{apply_responses, read_responses, Context};
use crate::OutputFormat;

#[derive(Serialize)]
struct GroupReport {
    group_id: GroupId,
    name: String,
    progress: u8,
    items: Vec<ItemView>,
}

#[derive(Serialize)]
struct CheckReport {
    mission_id: i64,
    step: WorkflowStep,
    tabs: Vec<GroupTab>,
    groups: Vec<GroupReport>,
    missing: Vec<ItemId>,
    complete: bool,
}

pub(crate) async fn cmd_check(ctx: &Context, mission: i64, responses: &Path) -> Result<(), String> {
    let responses = read_responses(responses)?;
    let mut session = ctx.open(mission, None).await?;
    if session.active_responder().is_none() {
        return Err(format!(
            "evaluation {} is at step {} ({}); there is nothing left to fill in",
            mission,
            session.step(),
            session.step().label()
        ));
    }
    apply_responses(&mut session, responses).await?;

    let groups = session.groups().to_vec();
    let mut reports = Vec::with_capacity(groups.len());
    for group in &groups {
        session.go_to(group.id).await.map_err(|e| e.to_string())?;
        reports.push(GroupReport {
            group_id: group.id,
            name: group.name.clone(),
            progress: session.progress(),
            items: session.current_view(),
        });
    }
    if let Some(first) = groups.first() {
        session.go_to(first.id).await.map_err(|e| e.to_string())?;
    }

    let missing: Vec<ItemId> = session.missing_items().iter().map(|i| i.id).collect();
    let report = CheckReport {
        mission_id: mission,
        step: session.step(),
        tabs: session.group_tabs(),
        complete: missing.is_empty(),
        groups: reports,
        missing,
    };

    match ctx.output {
        OutputFormat::Json => ctx.print_json(&report),
        OutputFormat::Text => print_report(ctx, &report),
    }
    Ok(())
}

fn print_report(ctx: &Context, report: &CheckReport) {
    ctx.print_text(format!(
        "mission {} at step {} ({})",
        report.mission_id,
        report.step,
        report.step.label()
    ));
    let tabs: Vec<String> = report.tabs.iter().map(|t| t.to_string()).collect();
    ctx.print_text(tabs.join(" | "));
    for group in &report.groups {
        ctx.print_text(format!("\n== {} ({}%)", group.name, group.progress));
        for view in &group.items {
            ctx.print_text(format!("  {}", view));
        }
    }
    if report.complete {
        ctx.print_text("\nall criteria answered");
    } else {
        let ids: Vec<String> = report.missing.iter().map(|id| format!("#{}", id)).collect();
        ctx.print_text(format!(
            "\n{} criteria missing or invalid: {}",
            ids.len(),
            ids.join(", ")
        ));
    }
}
