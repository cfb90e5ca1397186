use anyhow::Result;
use clap::Subcommand;

use super::resolve_user;
use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Commenting",
        commands: &[
            "plume comment add bob <post-id> \"Great read\"",
            "plume comment add alice <post-id> \"Thanks!\" --reply-to <comment-id>",
        ],
    },
    ExampleGroup {
        title: "Moderation",
        commands: &[
            "plume comment edit bob <comment-id> \"Great read, thanks\"",
            "plume comment delete bob <comment-id>   # Leaves a tombstone in the thread",
            "plume comment list <post-id>",
        ],
    },
];

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Comment on a post, or reply to a comment
    #[command(name = "add")]
    Add {
        actor: String,
        post_id: String,
        body: String,
        #[arg(long)]
        reply_to: Option<String>,
    },

    /// Edit a comment's text
    #[command(name = "edit")]
    Edit {
        actor: String,
        comment_id: String,
        body: String,
    },

    /// Soft-delete a comment
    #[command(name = "delete")]
    Delete { actor: String, comment_id: String },

    /// List a post's top-level comments, newest first
    #[command(name = "list")]
    List {
        post_id: String,
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
}

pub async fn handle_comment_commands(
    command: CommentCommands,
    ctx: &CliContext,
    output: &OutputManager,
) -> Result<()> {
    let mut blog = ctx.connect(output).await?;

    match command {
        CommentCommands::Add {
            actor,
            post_id,
            body,
            reply_to,
        } => {
            let actor_id = resolve_user(&mut blog, &actor).await?.id;
            let comment = blog
                .create_comment(&actor_id, &post_id, &body, reply_to.as_deref())
                .await?;
            output.success(&format!("Added comment {}", comment.id));
            output.display(&comment)?;
        }
        CommentCommands::Edit {
            actor,
            comment_id,
            body,
        } => {
            let actor_id = resolve_user(&mut blog, &actor).await?.id;
            let comment = blog.update_comment(&actor_id, &comment_id, &body).await?;
            output.success("Comment updated");
            output.display(&comment)?;
        }
        CommentCommands::Delete { actor, comment_id } => {
            let actor_id = resolve_user(&mut blog, &actor).await?.id;
            blog.soft_delete_comment(&actor_id, &comment_id).await?;
            output.success(&format!("Deleted comment {comment_id}"));
        }
        CommentCommands::List { post_id, page } => {
            let comments = blog.post_comments(&post_id, page, 0).await?;
            output.heading(&format!(
                "Comments on {post_id} (page {} of {})",
                comments.page,
                comments.pages().max(1)
            ));
            for thread in &comments.items {
                let comment = &thread.comment;
                output.bullet(&format!("[{}] {}: {}", comment.id, comment.author_id, comment.body.text()));
                for reply in &thread.replies {
                    output.bullet(&format!("  {} {}: {}", ICONS.arrow, reply.author_id, reply.body.text()));
                }
            }
            if comments.has_more() {
                output.info(&format!("More on page {}", comments.page + 1));
            }
            if output.options.output_format == crate::output::OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&comments)?);
            }
        }
    }

    Ok(())
}
