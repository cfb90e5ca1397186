use crate::commands::{audit, comment, post, social, user};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "user",
            groups: user::EXAMPLES,
        },
        CommandExample {
            name: "post",
            groups: post::EXAMPLES,
        },
        CommandExample {
            name: "follow",
            groups: social::FOLLOW_EXAMPLES,
        },
        CommandExample {
            name: "like",
            groups: social::LIKE_EXAMPLES,
        },
        CommandExample {
            name: "comment",
            groups: comment::EXAMPLES,
        },
        CommandExample {
            name: "audit",
            groups: audit::EXAMPLES,
        },
        CommandExample {
            name: "reconcile",
            groups: audit::EXAMPLES,
        },
    ]
}
