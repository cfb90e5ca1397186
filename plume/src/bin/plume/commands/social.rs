use anyhow::Result;
use clap::Subcommand;

use super::resolve_user;
use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::theme::ICONS;

pub const FOLLOW_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Follow",
    commands: &["plume follow alice bob          # Run again to unfollow"],
}];

pub const LIKE_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Likes",
    commands: &[
        "plume like post bob <post-id>       # Toggle a like on a published post",
        "plume like comment bob <comment-id>",
    ],
}];

#[derive(Subcommand)]
pub enum LikeCommands {
    /// Toggle a like on a post
    #[command(name = "post")]
    Post { actor: String, post_id: String },

    /// Toggle a like on a comment
    #[command(name = "comment")]
    Comment { actor: String, comment_id: String },
}

pub async fn handle_follow(actor: &str, target: &str, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let mut blog = ctx.connect(output).await?;
    let actor = resolve_user(&mut blog, actor).await?;
    let target = resolve_user(&mut blog, target).await?;

    let outcome = blog.toggle_follow(&actor.id, &target.id).await?;
    output.toggled(
        ICONS.follow,
        outcome.is_following,
        &format!("{} now follows {}", actor.username, target.username),
        &format!("{} unfollowed {}", actor.username, target.username),
        outcome.followers_count,
        "followers",
    );
    output.display(&outcome)
}

pub async fn handle_like_commands(command: LikeCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let mut blog = ctx.connect(output).await?;

    let outcome = match command {
        LikeCommands::Post { actor, post_id } => {
            let actor_id = resolve_user(&mut blog, &actor).await?.id;
            blog.toggle_post_like(&actor_id, &post_id).await?
        }
        LikeCommands::Comment { actor, comment_id } => {
            let actor_id = resolve_user(&mut blog, &actor).await?.id;
            blog.toggle_comment_like(&actor_id, &comment_id).await?
        }
    };
    output.toggled(ICONS.heart, outcome.is_liked, "liked", "unliked", outcome.likes_count, "likes");
    output.display(&outcome)
}
