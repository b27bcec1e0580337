use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;
use vidgrade_core::{Provider, Settings, Theme, VidgradeError};

use crate::commands::{Context, DraftEdit};

mod commands;
mod ui;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliProvider {
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliTheme {
    Light,
    Dark,
}

impl From<CliTheme> for Theme {
    fn from(cli: CliTheme) -> Self {
        match cli {
            CliTheme::Light => Theme::Light,
            CliTheme::Dark => Theme::Dark,
        }
    }
}

#[derive(Parser)]
#[command(name = "vidgrade")]
#[command(about = "Grade YouTube video metadata with AI and get copy/paste-ready SEO fixes")]
struct Cli {
    /// AI provider (overrides config.toml)
    #[arg(short, long, global = true)]
    provider: Option<CliProvider>,

    /// Model name (overrides the provider default)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show or edit the saved draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Grade the current draft
    Grade {
        /// Save the result to history
        #[arg(long)]
        save: bool,
        /// Rewrite the description from the recommendations
        #[arg(long)]
        rewrite: bool,
        /// Copy the rewritten description into the draft
        #[arg(long, requires = "rewrite")]
        apply: bool,
    },
    /// Rewrite the description of a saved grading
    Rewrite {
        /// Saved grading id or unique prefix
        id: String,
        /// Copy the rewritten description into the draft
        #[arg(long)]
        apply: bool,
    },
    /// Manage draft tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Browse saved gradings
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Research trends and content gaps for a niche
    Intel {
        #[arg(required = true, num_args = 1..)]
        niche: Vec<String>,
    },
    /// Chat with the strategy assistant about the current draft
    Chat {
        /// Load a saved grading as context
        #[arg(long)]
        id: Option<String>,
    },
    /// Show or set the display theme
    Theme { theme: Option<CliTheme> },
}

#[derive(Subcommand)]
enum DraftAction {
    Show,
    Set {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Display text, e.g. "12:34"
        #[arg(long)]
        duration: Option<String>,
        /// Read the video script from a file
        #[arg(long)]
        script_file: Option<PathBuf>,
        #[arg(long)]
        competitor_url: Option<String>,
        #[arg(long)]
        competitor_notes: Option<String>,
    },
    Clear,
}

#[derive(Subcommand)]
enum TagAction {
    Add { tag: String },
    Check { tag: String },
}

#[derive(Subcommand)]
enum HistoryAction {
    List,
    Show {
        id: String,
        /// Print the raw saved record
        #[arg(long)]
        json: bool,
    },
    Delete {
        id: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load();
    if cli.model.is_some() {
        settings.model = cli.model;
    }
    let provider = cli.provider.map(Provider::from).unwrap_or(settings.provider());
    let ctx = Context { settings, provider };

    match cli.command {
        Command::Draft { action } => match action {
            DraftAction::Show => commands::draft_show(&ctx),
            DraftAction::Set {
                title,
                description,
                tags,
                duration,
                script_file,
                competitor_url,
                competitor_notes,
            } => {
                let edit = DraftEdit {
                    title,
                    description,
                    tags,
                    duration,
                    script_file,
                    competitor_url,
                    competitor_notes,
                };
                commands::draft_set(&ctx, edit).await
            }
            DraftAction::Clear => commands::draft_clear(&ctx),
        },
        Command::Grade {
            save,
            rewrite,
            apply,
        } => commands::grade(&ctx, save, rewrite, apply).await,
        Command::Rewrite { id, apply } => commands::rewrite(&ctx, &id, apply).await,
        Command::Tag { action } => match action {
            TagAction::Add { tag } => commands::tag_add(&ctx, &tag),
            TagAction::Check { tag } => commands::tag_check(&ctx, &tag),
        },
        Command::History { action } => match action {
            HistoryAction::List => commands::history_list(&ctx),
            HistoryAction::Show { id, json } => commands::history_show(&ctx, &id, json),
            HistoryAction::Delete { id } => commands::history_delete(&ctx, &id),
        },
        Command::Intel { niche } => commands::intel(&ctx, &niche.join(" ")).await,
        Command::Chat { id } => commands::chat(&ctx, id.as_deref()).await,
        Command::Theme { theme } => commands::theme(&ctx, theme.map(Theme::from)),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<VidgradeError>() {
            Some(err) => err.user_message(),
            None => format!("{e:#}"),
        };
        eprintln!("{} {}", style("Error:").red().bold(), message);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vidgrade", "grade", "--save", "-p", "openai"]).unwrap();
        assert!(matches!(cli.provider, Some(CliProvider::Openai)));
        assert!(matches!(cli.command, Command::Grade { save: true, rewrite: false, .. }));
    }

    #[test]
    fn apply_requires_rewrite() {
        assert!(Cli::try_parse_from(["vidgrade", "grade", "--apply"]).is_err());
    }
}
