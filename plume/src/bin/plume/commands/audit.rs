use anyhow::Result;
use clap::Subcommand;
use plume::AuditReport;

use super::resolve_user;
use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Audit",
        commands: &[
            "plume audit user alice            # Counts and reverse edges of a user",
            "plume audit post <post-id> --fix  # Recount a post after reporting drift",
        ],
    },
    ExampleGroup {
        title: "Reconcile",
        commands: &["plume reconcile follow alice bob # Align bob's followers with alice's following"],
    },
];

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Audit a user
    #[command(name = "user")]
    User {
        user: String,
        /// Recount after reporting
        #[arg(long)]
        fix: bool,
    },

    /// Audit a post
    #[command(name = "post")]
    Post {
        post_id: String,
        #[arg(long)]
        fix: bool,
    },

    /// Audit a comment
    #[command(name = "comment")]
    Comment {
        comment_id: String,
        #[arg(long)]
        fix: bool,
    },
}

#[derive(Subcommand)]
pub enum ReconcileCommands {
    /// Repair the target side of a follow from the actor side
    #[command(name = "follow")]
    Follow { actor: String, target: String },
}

pub async fn handle_audit_commands(command: AuditCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let mut blog = ctx.connect(output).await?;

    let (report, fix) = match command {
        AuditCommands::User { user, fix } => {
            let user_id = resolve_user(&mut blog, &user).await?.id;
            let report = blog.audit_user(&user_id).await?;
            if fix && !report.is_consistent() {
                blog.recount_user(&user_id).await?;
            }
            (report, fix)
        }
        AuditCommands::Post { post_id, fix } => {
            let report = blog.audit_post(&post_id).await?;
            if fix && !report.is_consistent() {
                blog.recount_post(&post_id).await?;
            }
            (report, fix)
        }
        AuditCommands::Comment { comment_id, fix } => {
            let report = blog.audit_comment(&comment_id).await?;
            if fix && !report.is_consistent() {
                blog.recount_comment(&comment_id).await?;
            }
            (report, fix)
        }
    };

    summarize(&report, fix, output);
    output.display(&report)
}

pub async fn handle_reconcile_commands(
    command: ReconcileCommands,
    ctx: &CliContext,
    output: &OutputManager,
) -> Result<()> {
    let mut blog = ctx.connect(output).await?;

    match command {
        ReconcileCommands::Follow { actor, target } => {
            let actor_id = resolve_user(&mut blog, &actor).await?.id;
            let target_id = resolve_user(&mut blog, &target).await?.id;
            let outcome = blog.reconcile_follow(&actor_id, &target_id).await?;
            let relation = if outcome.is_following { "follows" } else { "does not follow" };
            output.success(&format!("{actor} {relation} {target}"));
            output.display(&outcome)?;
        }
    }

    Ok(())
}

fn summarize(report: &AuditReport, fix: bool, output: &OutputManager) {
    if report.is_consistent() {
        output.success(&format!("{} {} is consistent", report.entity, report.id));
    } else if fix {
        output.warning(&format!("{} issue(s) found; counts recomputed", report.drift.len()));
        output.info("Reverse edges are not touched by a recount; use 'plume reconcile follow' for those.");
    } else {
        output.warning(&format!("{} issue(s) found; rerun with --fix to recount", report.drift.len()));
    }
}
