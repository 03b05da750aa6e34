//! Status, decision and summary commands.

use serde::Serialize;

use appraisal_client::Summary;
use appraisal_core::{Assignment, Decision, WorkflowStep};

use crate::context::Context;
use crate::OutputFormat;

#[derive(Serialize)]
struct StatusReport<'a> {
    mission_id: i64,
    step: WorkflowStep,
    label: &'static str,
    #[serde(flatten)]
    assignment: Assignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<&'a Decision>,
}

pub(crate) async fn cmd_status(ctx: &Context, mission: i64) -> Result<(), String> {
    let session = ctx.open(mission, None).await?;
    let report = StatusReport {
        mission_id: mission,
        step: session.step(),
        label: session.step().label(),
        assignment: session.assignment(),
        decision: session.decision(),
    };

    match ctx.output {
        OutputFormat::Json => ctx.print_json(&report),
        OutputFormat::Text => {
            ctx.print_text(format!(
                "mission {}: step {} ({})",
                report.mission_id, report.step, report.label
            ));
            let evaluator = or_unset(report.assignment.evaluator_id);
            let approver = or_unset(report.assignment.approver_id);
            ctx.print_text(format!("  evaluator: {}", evaluator));
            ctx.print_text(format!("  approver:  {}", approver));
            if let Some(decision) = report.decision {
                ctx.print_text(format!("  decision:  {}", describe(decision)));
            }
        }
    }
    Ok(())
}

pub(crate) async fn cmd_decide(
    ctx: &Context,
    mission: i64,
    decision: Decision,
) -> Result<(), String> {
    let mut session = ctx.open(mission, None).await?;
    session
        .decide(decision.clone())
        .await
        .map_err(|e| e.to_string())?;
    ctx.persist()?;

    match ctx.output {
        OutputFormat::Json => ctx.print_json(&serde_json::json!({
            "mission_id": mission,
            "decision": decision,
        })),
        OutputFormat::Text => {
            ctx.print_text(format!("mission {}: {}", mission, describe(&decision)))
        }
    }
    Ok(())
}

pub(crate) async fn cmd_summary(ctx: &Context, mission: i64) -> Result<(), String> {
    let mut session = ctx.open(mission, None).await?;
    let summary = session.summary().await.map_err(|e| e.to_string())?;

    match ctx.output {
        OutputFormat::Json => ctx.print_json(&summary),
        OutputFormat::Text => print_summary(ctx, &summary),
    }
    Ok(())
}

fn print_summary(ctx: &Context, summary: &Summary) {
    ctx.print_text(format!("summary for mission {}", summary.mission_id));
    for row in &summary.rows {
        ctx.print_text(format!("  #{} {}", row.item_id, row.label));
        ctx.print_text(format!("      employee:  {}", row.employee));
        ctx.print_text(format!("      evaluator: {}", row.evaluator));
    }
    ctx.print_text(format!(
        "average rating: employee {}, evaluator {}",
        average(summary.employee_average),
        average(summary.evaluator_average)
    ));
    if let Some(decision) = &summary.decision {
        ctx.print_text(format!("decision: {}", describe(decision)));
    }
}

fn describe(decision: &Decision) -> String {
    match decision {
        Decision::Approve => "approved".to_string(),
        Decision::Reject { comment } => format!("rejected ({})", comment),
    }
}

fn or_unset(id: Option<i64>) -> String {
    id.map(|id| format!("#{}", id))
        .unwrap_or_else(|| "not selected".to_string())
}

fn average(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}
