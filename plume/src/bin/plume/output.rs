use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;

use plume::{AuditReport, Comment, Drift, FollowOutcome, LikeOutcome, Post, User};

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a key/value table.
pub trait TableDisplay {
    fn rows(&self) -> Vec<(&'static str, String)>;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        if options.no_color {
            colored::control::set_override(false);
        }
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let mut table = self.create_table();
                for (key, value) in data.rows() {
                    table.add_row(vec![self.key_cell(key), Cell::new(value)]);
                }
                println!("{table}");
            }
        }
        Ok(())
    }

    pub fn success(&self, message: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.success)
        } else {
            format!("{} {}", ICONS.success.color(THEME.success), message.color(THEME.success))
        };
        println!("{output}");
    }

    pub fn error(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        };
        eprintln!("{output}");
    }

    pub fn warning(&self, message: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.warning)
        } else {
            format!("{} {}", ICONS.warning.color(THEME.warning), message.color(THEME.warning))
        };
        println!("{output}");
    }

    pub fn info(&self, message: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.info)
        } else {
            format!("{} {}", ICONS.info.color(THEME.info), message.color(THEME.info))
        };
        println!("{output}");
    }

    pub fn heading(&self, text: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let output = if self.options.no_color {
            format!("\n{text}\n{}", "=".repeat(text.len()))
        } else {
            format!("\n{}", text.color(THEME.primary).bold())
        };
        println!("{output}");
    }

    pub fn bullet(&self, text: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let output = if self.options.no_color {
            format!("  {} {text}", ICONS.bullet)
        } else {
            format!("  {} {text}", ICONS.bullet.color(THEME.muted))
        };
        println!("{output}");
    }

    /// Summary line for a toggle, e.g. `+ now following (3 followers)`.
    pub fn toggled(&self, icon: &str, active: bool, on: &str, off: &str, count: i64, noun: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        let text = format!("{} ({count} {noun})", if active { on } else { off });
        let output = if self.options.no_color {
            format!("{icon} {text}")
        } else if active {
            format!("{} {}", icon.color(THEME.highlight).bold(), text.color(THEME.highlight))
        } else {
            format!("{} {}", icon.color(THEME.muted), text.color(THEME.muted))
        };
        println!("{output}");
    }

    pub fn create_table(&self) -> Table {
        let mut table = Table::new();
        if !self.options.no_color {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        } else {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        }
        table
    }

    fn key_cell(&self, key: &str) -> Cell {
        let cell = Cell::new(key).add_attribute(Attribute::Bold);
        if self.options.no_color { cell } else { cell.fg(TableColor::Cyan) }
    }

    fn is_json(&self) -> bool {
        self.options.output_format == OutputFormat::Json
    }
}

impl TableDisplay for User {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("username", self.username.clone()),
            ("name", self.full_name.clone()),
            ("email", self.email.clone()),
            ("followers", self.followers_count.to_string()),
            ("following", self.following_count.to_string()),
            ("posts", self.posts_count.to_string()),
            ("joined", self.created_at.to_rfc3339()),
        ]
    }
}

impl TableDisplay for Post {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("title", self.title.clone()),
            ("author", self.author_id.clone()),
            ("status", self.status.to_string()),
            ("tags", self.tags.join(", ")),
            ("likes", self.likes_count.to_string()),
            ("comments", self.comments_count.to_string()),
            ("views", self.views.to_string()),
            ("reading time", format!("{} min", self.reading_time)),
        ]
    }
}

impl TableDisplay for Comment {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("post", self.post_id.clone()),
            ("author", self.author_id.clone()),
            ("parent", self.parent_comment_id.clone().unwrap_or_else(|| "-".to_string())),
            ("text", self.body.text().to_string()),
            ("likes", self.likes_count.to_string()),
            ("replies", self.replies.len().to_string()),
        ]
    }
}

impl TableDisplay for FollowOutcome {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("following", self.is_following.to_string()),
            ("followers_count", self.followers_count.to_string()),
            ("following_count", self.following_count.to_string()),
        ]
    }
}

impl TableDisplay for LikeOutcome {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![("liked", self.is_liked.to_string()), ("likes_count", self.likes_count.to_string())]
    }
}

impl TableDisplay for AuditReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![("entity", format!("{} {}", self.entity, self.id))];
        if self.drift.is_empty() {
            rows.push(("drift", "none".to_string()));
        }
        for drift in &self.drift {
            rows.push(("drift", describe_drift(drift)));
        }
        rows
    }
}

pub fn describe_drift(drift: &Drift) -> String {
    match drift {
        Drift::CountMismatch { field, stored, actual } => format!("{field} is {stored}, expected {actual}"),
        Drift::DuplicateMember { field, member } => format!("{member} appears more than once in {field}"),
        Drift::MissingReverse { field, other, other_id } => {
            format!("{other} {other_id} is missing the reverse entry in {field}")
        }
        Drift::DanglingReference { field, other, other_id } => format!("{field} references missing {other} {other_id}"),
    }
}
