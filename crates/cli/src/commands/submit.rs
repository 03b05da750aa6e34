//! `appraisal self-assess` and `appraisal evaluate`.

use std::path::Path;

use serde::Serialize;

use appraisal_client::{Redirect, SubmissionOutcome};
use appraisal_core::WorkflowStep;

use crate::context::{apply_responses, read_responses, Context};
use crate::OutputFormat;

pub(crate) struct SelfAssessArgs<'a> {
    pub mission: i64,
    pub responses: &'a Path,
    pub evaluator: Option<i64>,
    pub approver: Option<i64>,
    pub employee: Option<i64>,
}

#[derive(Serialize)]
struct SubmitReport<'a> {
    step: WorkflowStep,
    #[serde(flatten)]
    outcome: &'a SubmissionOutcome,
}

pub(crate) async fn cmd_self_assess(ctx: &Context, args: SelfAssessArgs<'_>) -> Result<(), String> {
    let responses = read_responses(args.responses)?;
    let mut session = ctx.open(args.mission, args.employee).await?;
    apply_responses(&mut session, responses).await?;

    if let Some(id) = args.evaluator {
        session.select_evaluator(id).map_err(|e| e.to_string())?;
    }
    if let Some(id) = args.approver {
        session.select_approver(id).map_err(|e| e.to_string())?;
    }

    let outcome = session
        .submit_self_assessment()
        .await
        .map_err(|e| e.to_string())?;
    ctx.persist()?;
    report(ctx, session.step(), &outcome);
    Ok(())
}

pub(crate) async fn cmd_evaluate(
    ctx: &Context,
    mission: i64,
    responses: &Path,
) -> Result<(), String> {
    let responses = read_responses(responses)?;
    let mut session = ctx.open(mission, None).await?;
    if session.step() != WorkflowStep::ManagerEvaluation {
        return Err(format!(
            "evaluation {} is at step {} ({}), not open for the manager evaluation",
            mission,
            session.step(),
            session.step().label()
        ));
    }
    apply_responses(&mut session, responses).await?;

    let outcome = session
        .submit_manager_evaluation()
        .await
        .map_err(|e| e.to_string())?;
    ctx.persist()?;
    report(ctx, session.step(), &outcome);
    Ok(())
}

fn report(ctx: &Context, step: WorkflowStep, outcome: &SubmissionOutcome) {
    match ctx.output {
        OutputFormat::Json => ctx.print_json(&SubmitReport { step, outcome }),
        OutputFormat::Text => {
            let snapshot = &outcome.snapshot;
            ctx.print_text(format!(
                "{} responses submitted for mission {} at {}",
                snapshot.responder,
                snapshot.mission_id,
                snapshot.submitted_at
            ));
            match outcome.redirect {
                Redirect::Step(next) => {
                    ctx.print_text(format!("now at step {} ({})", next, next.label()))
                }
                Redirect::Listing => ctx.print_text("returning to the evaluation listing"),
            }
            if let appraisal_client::SubmissionStatus::Partial { warning } = &outcome.status {
                // Partial outcomes are shown even under --quiet.
                eprintln!("warning: {}", warning);
            }
        }
    }
}
