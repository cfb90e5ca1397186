use anyhow::Result;
use clap::Subcommand;
use plume::{NewUser, ProfileUpdate};

use super::resolve_user;
use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Accounts",
        commands: &[
            "plume user register alice alice@example.com --name \"Alice\" --password-hash '$argon2id$...'",
            "plume user show alice              # Look up by username",
            "plume user show Xk3...             # Look up by id",
        ],
    },
    ExampleGroup {
        title: "Profile",
        commands: &["plume user edit alice --bio \"Writes about Rust\" --website https://alice.dev"],
    },
];

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    #[command(name = "register")]
    Register {
        username: String,
        email: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Pre-computed credential hash
        #[arg(long)]
        password_hash: String,
    },

    /// Show a user by username or id
    #[command(name = "show")]
    Show { user: String },

    /// Update profile fields
    #[command(name = "edit")]
    Edit {
        user: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
}

pub async fn handle_user_commands(command: UserCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let mut blog = ctx.connect(output).await?;

    match command {
        UserCommands::Register {
            username,
            email,
            name,
            password_hash,
        } => {
            let user = blog
                .register_user(NewUser {
                    username,
                    email,
                    password_hash,
                    full_name: name,
                })
                .await?;
            output.success(&format!("Registered {}", user.username));
            output.display(&user)?;
        }
        UserCommands::Show { user } => {
            let user = resolve_user(&mut blog, &user).await?;
            output.heading(&format!("@{}", user.username));
            output.display(&user)?;
            let likes = blog.user_likes_received(&user.id).await?;
            output.bullet(&format!("{likes} likes received"));
        }
        UserCommands::Edit {
            user,
            name,
            bio,
            website,
            location,
        } => {
            let user_id = resolve_user(&mut blog, &user).await?.id;
            let user = blog
                .update_profile(
                    &user_id,
                    ProfileUpdate {
                        full_name: name,
                        bio,
                        website,
                        location,
                        ..Default::default()
                    },
                )
                .await?;
            output.success("Profile updated");
            output.display(&user)?;
        }
    }

    Ok(())
}
