use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use plume::{NewPost, Post, PostStatus, PostUpdate};

use super::resolve_user;
use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputFormat, OutputManager};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Writing",
        commands: &[
            "plume post create alice \"Hello\" --file hello.html --tag rust --tag redis",
            "plume post create alice \"Draft\" --content \"<p>wip</p>\" --draft",
        ],
    },
    ExampleGroup {
        title: "Lifecycle",
        commands: &[
            "plume post publish alice <post-id>",
            "plume post archive alice <post-id>",
            "plume post delete alice <post-id>   # Also repairs posts_count and likers",
            "plume post edit alice <post-id> --title \"Hello again\" --file hello.html",
        ],
    },
    ExampleGroup {
        title: "Reading",
        commands: &[
            "plume post feed bobby               # Posts by the users bobby follows",
            "plume post trending --days 30 --limit 5",
        ],
    },
];

#[derive(Subcommand)]
pub enum PostCommands {
    /// Create a post (published unless --draft)
    #[command(name = "create")]
    Create {
        author: String,
        title: String,
        /// Inline content
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read content from a file
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        draft: bool,
    },

    /// Show a post
    #[command(name = "show")]
    Show { post_id: String },

    /// Publish a draft or archived post
    #[command(name = "publish")]
    Publish { author: String, post_id: String },

    /// Archive a published post
    #[command(name = "archive")]
    Archive { author: String, post_id: String },

    /// Delete a post
    #[command(name = "delete")]
    Delete { author: String, post_id: String },

    /// Edit title, content or tags
    #[command(name = "edit")]
    Edit {
        author: String,
        post_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Replaces every tag
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Published posts by the users someone follows
    #[command(name = "feed")]
    Feed {
        user: String,
        #[arg(long, default_value_t = 1)]
        page: u64,
    },

    /// Most liked recent posts
    #[command(name = "trending")]
    Trending {
        #[arg(long)]
        days: Option<i64>,
        #[arg(long, default_value_t = 10)]
        limit: u64,
    },
}

pub async fn handle_post_commands(command: PostCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let mut blog = ctx.connect(output).await?;

    match command {
        PostCommands::Create {
            author,
            title,
            content,
            file,
            tags,
            draft,
        } => {
            let Some(content) = read_content(content, file).await? else {
                anyhow::bail!("Pass --content or --file");
            };
            let author_id = resolve_user(&mut blog, &author).await?.id;
            let status = if draft { PostStatus::Draft } else { PostStatus::Published };
            let post = blog
                .create_post(
                    &author_id,
                    NewPost {
                        title,
                        content,
                        tags,
                        status,
                    },
                )
                .await?;
            output.success(&format!("Created post {} ({})", post.id, post.status));
            output.display(&post)?;
        }
        PostCommands::Show { post_id } => {
            let views = blog.record_view(&post_id).await?;
            let post = blog.get_post(&post_id).await?;
            output.heading(&post.title);
            output.display(&post)?;
            log::debug!("post {post_id} now has {views} views");
        }
        PostCommands::Publish { author, post_id } => {
            let author_id = resolve_user(&mut blog, &author).await?.id;
            let post = blog.set_post_status(&author_id, &post_id, PostStatus::Published).await?;
            output.success(&format!("Published {}", post.title));
        }
        PostCommands::Archive { author, post_id } => {
            let author_id = resolve_user(&mut blog, &author).await?.id;
            let post = blog.set_post_status(&author_id, &post_id, PostStatus::Archived).await?;
            output.success(&format!("Archived {}", post.title));
        }
        PostCommands::Delete { author, post_id } => {
            let author_id = resolve_user(&mut blog, &author).await?.id;
            blog.delete_post(&author_id, &post_id).await?;
            output.success(&format!("Deleted post {post_id}"));
        }
        PostCommands::Edit {
            author,
            post_id,
            title,
            content,
            file,
            tags,
        } => {
            let author_id = resolve_user(&mut blog, &author).await?.id;
            let update = PostUpdate {
                title,
                content: read_content(content, file).await?,
                tags: (!tags.is_empty()).then_some(tags),
            };
            let post = blog.update_post(&author_id, &post_id, update).await?;
            output.success(&format!("Updated {}", post.title));
            output.display(&post)?;
        }
        PostCommands::Feed { user, page } => {
            let user = resolve_user(&mut blog, &user).await?;
            let feed = blog.feed(&user.id, page, 0).await?;
            output.heading(&format!(
                "Feed for {} (page {} of {})",
                user.username,
                feed.page,
                feed.pages().max(1)
            ));
            list_posts(output, &feed.items)?;
            if feed.has_more() {
                output.info(&format!("More on page {}", feed.page + 1));
            }
        }
        PostCommands::Trending { days, limit } => {
            let posts = blog.trending(days, limit).await?;
            output.heading("Trending");
            list_posts(output, &posts)?;
        }
    }

    Ok(())
}

async fn read_content(content: Option<String>, file: Option<PathBuf>) -> Result<Option<String>> {
    match (content, file) {
        (Some(content), _) => Ok(Some(content)),
        (None, Some(path)) => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Some(content))
        }
        (None, None) => Ok(None),
    }
}

fn list_posts(output: &OutputManager, posts: &[Post]) -> Result<()> {
    if output.options.output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(posts)?);
        return Ok(());
    }
    if posts.is_empty() {
        output.info("No posts");
    }
    for post in posts {
        output.bullet(&format!(
            "[{}] {} ({} likes, {} views)",
            post.id, post.title, post.likes_count, post.views
        ));
    }
    Ok(())
}
