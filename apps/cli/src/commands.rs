use std::{
    io::{self, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::{Context as _, Result, bail};
use console::style;
use tokio::{
    fs,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::debug;
use uuid::Uuid;
use vidgrade_core::{
    AnalysisSession, FileStore, LlmAssistant, Provider, SaveOutcome, Settings, Store, Theme,
    VideoMetadata, add_tag, format_history, format_intelligence, format_report_readable,
    is_tag_added,
};

use crate::ui::{accent, banner, create_spinner, format_duration, print_markdown, rule, success};

type Session = AnalysisSession<LlmAssistant, FileStore>;

/// Resolved settings shared by every command
pub struct Context {
    pub settings: Settings,
    pub provider: Provider,
}

impl Context {
    pub fn store(&self) -> Result<Store<FileStore>> {
        let dir = self.settings.data_dir();
        debug!(dir = %dir.display(), "opening store");
        Ok(Store::open_dir(dir)?)
    }

    /// Commands that talk to the model need an API key; this fails early without one.
    pub fn session(&self) -> Result<Session> {
        let assistant = LlmAssistant::new(self.provider, &self.settings)?;
        Ok(AnalysisSession::new(assistant, self.store()?))
    }
}

#[derive(Debug, Default)]
pub struct DraftEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub duration: Option<String>,
    pub script_file: Option<PathBuf>,
    pub competitor_url: Option<String>,
    pub competitor_notes: Option<String>,
}

fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

pub async fn draft_set(ctx: &Context, edit: DraftEdit) -> Result<()> {
    let store = ctx.store()?;
    let mut draft = store.load_draft();

    if let Some(title) = edit.title {
        draft.title = title;
    }
    if let Some(description) = edit.description {
        draft.description = description;
    }
    if let Some(tags) = edit.tags {
        draft.tags = tags;
    }
    if let Some(duration) = edit.duration {
        draft.duration = duration;
    }
    if let Some(path) = edit.script_file {
        let script = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        draft.script = optional(script);
    }
    if let Some(url) = edit.competitor_url {
        draft.competitor_url = optional(url);
    }
    if let Some(notes) = edit.competitor_notes {
        draft.competitor_notes = optional(notes);
    }

    store.save_draft(&draft)?;
    success("Draft saved");
    print_draft(&draft, store.load_theme());
    Ok(())
}

pub fn draft_show(ctx: &Context) -> Result<()> {
    let store = ctx.store()?;
    print_draft(&store.load_draft(), store.load_theme());
    Ok(())
}

pub fn draft_clear(ctx: &Context) -> Result<()> {
    ctx.store()?.clear_draft()?;
    success("Draft cleared");
    Ok(())
}

fn print_draft(draft: &VideoMetadata, theme: Theme) {
    let label = accent(theme).bold();
    let empty = style("(empty)").dim().to_string();
    let or_empty = |value: &str| {
        if value.trim().is_empty() { empty.clone() } else { value.to_string() }
    };

    println!("{} {}", label.apply_to("Title:"), or_empty(&draft.title));
    println!("{} {}", label.apply_to("Tags:"), or_empty(&draft.tags));
    println!("{} {}", label.apply_to("Duration:"), or_empty(&draft.duration));
    if let Some(script) = &draft.script {
        println!("{} {} chars", label.apply_to("Script:"), script.chars().count());
    }
    if let Some(url) = &draft.competitor_url {
        println!("{} {}", label.apply_to("Competitor:"), url);
    }
    if let Some(notes) = &draft.competitor_notes {
        println!("{} {}", label.apply_to("Competitor notes:"), notes);
    }
    println!("{}\n{}", label.apply_to("Description:"), or_empty(&draft.description));
}

pub async fn grade(ctx: &Context, save: bool, rewrite: bool, apply: bool) -> Result<()> {
    let mut session = ctx.session()?;
    let theme = session.theme();
    banner(theme, "YouTube SEO grader");

    let start = Instant::now();
    let spinner = create_spinner(
        &format!(
            "Grading with {} ({})...",
            ctx.provider.name(),
            session.assistant().model()
        ),
        theme,
    );
    let score = match session.submit().await.map(|analysis| analysis.overall_score) {
        Ok(score) => score,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!(
        "{} Graded: {}/100 {}",
        style("✓").green().bold(),
        accent(theme).bold().apply_to(score),
        style(format!("[{}]", format_duration(start.elapsed()))).dim()
    ));

    rule();
    if let Some(current) = session.current() {
        print_markdown(&format_report_readable(&current.analysis, session.draft()), theme);
    }

    let missing = session.missing_tags();
    if let Some(first) = missing.first() {
        println!(
            "{} vidgrade tag add \"{}\"  {}",
            style("Add a tag:").dim(),
            first,
            style(format!("({} missing)", missing.len())).dim()
        );
    }

    if save {
        save_current(&mut session)?;
    }
    if rewrite {
        run_rewrite(&mut session, theme, apply).await?;
    }
    Ok(())
}

fn save_current(session: &mut Session) -> Result<()> {
    match session.save_current()? {
        SaveOutcome::Saved(id) => success(format!("Saved to history as {}", short_id(id))),
        SaveOutcome::AlreadySaved => println!("{}", style("Already saved").dim()),
        SaveOutcome::NoAnalysis => bail!("Nothing to save yet"),
    }
    Ok(())
}

pub async fn rewrite(ctx: &Context, id: &str, apply: bool) -> Result<()> {
    let mut session = ctx.session()?;
    let theme = session.theme();
    let id = resolve_id(session.history().iter().map(|entry| entry.id), id)?;

    let title = session
        .history()
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| entry.metadata.title.trim().to_string())
        .unwrap_or_default();
    session.view_saved(id)?;
    success(format!("Opened \"{title}\""));
    run_rewrite(&mut session, theme, apply).await
}

async fn run_rewrite(session: &mut Session, theme: Theme, apply: bool) -> Result<()> {
    let start = Instant::now();
    let spinner = create_spinner("Rewriting description...", theme);
    let improved = match session.rewrite().await.map(str::to_string) {
        Ok(improved) => improved,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!(
        "{} Description rewritten {}",
        style("✓").green().bold(),
        style(format!("[{}]", format_duration(start.elapsed()))).dim()
    ));

    rule();
    println!("{improved}");
    rule();

    if apply {
        session.apply_improved_description()?;
        success(format!("Draft updated: \"{}\"", session.draft().title.trim()));
    } else {
        println!("{}", style("Pass --apply to copy it into the draft").dim());
    }
    Ok(())
}

pub fn tag_add(ctx: &Context, tag: &str) -> Result<()> {
    let store = ctx.store()?;
    let mut draft = store.load_draft();

    if is_tag_added(tag, &draft.tags) {
        println!("{}", style(format!("\"{}\" is already in your tags", tag.trim())).dim());
        return Ok(());
    }
    let updated = add_tag(tag, &draft.tags);
    if updated == draft.tags {
        bail!("Tag is empty");
    }

    draft.tags = updated;
    store.save_draft(&draft)?;
    success(format!("Tags: {}", draft.tags));
    Ok(())
}

pub fn tag_check(ctx: &Context, tag: &str) -> Result<()> {
    let draft = ctx.store()?.load_draft();
    if is_tag_added(tag, &draft.tags) {
        success(format!("\"{}\" is added", tag.trim()));
    } else {
        println!("{} \"{}\" is missing", style("✗").red().bold(), tag.trim());
    }
    Ok(())
}

pub fn history_list(ctx: &Context) -> Result<()> {
    let store = ctx.store()?;
    if store.history().is_empty() {
        println!("{}", style("No saved gradings yet").dim());
    } else {
        println!("{}", format_history(store.history()));
    }
    Ok(())
}

pub fn history_show(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let store = ctx.store()?;
    let id = resolve_id(store.history().iter().map(|entry| entry.id), id)?;
    let Some(entry) = store.find_saved(id) else {
        bail!("No saved grading with id {id}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(entry)?);
        return Ok(());
    }

    let theme = store.load_theme();
    println!(
        "{} {}",
        style("Saved:").dim(),
        style(entry.timestamp.format("%Y-%m-%d %H:%M UTC")).dim()
    );
    rule();
    print_markdown(&format_report_readable(&entry.analysis, &entry.metadata), theme);
    Ok(())
}

pub fn history_delete(ctx: &Context, id: &str) -> Result<()> {
    let mut store = ctx.store()?;
    let id = resolve_id(store.history().iter().map(|entry| entry.id), id)?;
    store.remove_saved(id)?;
    success(format!("Deleted {}", short_id(id)));
    Ok(())
}

pub async fn intel(ctx: &Context, niche: &str) -> Result<()> {
    let mut session = ctx.session()?;
    let theme = session.theme();
    banner(theme, "Market intelligence");
    if !ctx.provider.supports_web_search() {
        println!(
            "{}",
            style(format!(
                "Note: {} has no web search here; the report is ungrounded and lists no sources",
                ctx.provider.name()
            ))
            .yellow()
        );
    }

    let start = Instant::now();
    let spinner = create_spinner(&format!("Researching \"{}\"...", niche.trim()), theme);
    let result = match session.market_intelligence(niche).await {
        Ok(result) => result,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!(
        "{} Research complete: {} sources {}",
        style("✓").green().bold(),
        result.sources.len(),
        style(format!("[{}]", format_duration(start.elapsed()))).dim()
    ));

    rule();
    print_markdown(&format_intelligence(&result), theme);
    Ok(())
}

pub async fn chat(ctx: &Context, id: Option<&str>) -> Result<()> {
    let mut session = ctx.session()?;
    let theme = session.theme();

    let mut context_title = None;
    if let Some(id) = id {
        let id = resolve_id(session.history().iter().map(|entry| entry.id), id)?;
        context_title = session
            .history()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.metadata.title.trim().to_string());
        session.view_saved(id)?;
    }

    banner(theme, "Strategy chat");
    if let Some(title) = context_title {
        success(format!("Context: \"{title}\""));
    }
    println!("{}", style("/reset clears the conversation, /exit quits").dim());

    let prompt = accent(theme).bold();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", prompt.apply_to("you›"));
        io::stdout().flush()?;

        let Some(input) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = input.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => {
                session.clear_chat();
                success("Conversation cleared");
                continue;
            }
            _ => {}
        }

        print!("{} ", prompt.apply_to("ai›"));
        let reply = session
            .send_chat(input, |delta| {
                print!("{delta}");
                let _ = io::stdout().flush();
            })
            .await;
        println!();

        if let Err(e) = reply {
            eprintln!("{} {}", style("Error:").red().bold(), e.user_message());
        }
    }
    Ok(())
}

pub fn theme(ctx: &Context, theme: Option<Theme>) -> Result<()> {
    let store = ctx.store()?;
    match theme {
        Some(theme) => {
            store.save_theme(theme)?;
            success(format!("Theme set to {}", accent(theme).bold().apply_to(theme.name())));
        }
        None => {
            let theme = store.load_theme();
            println!("{}", accent(theme).bold().apply_to(theme.name()));
        }
    }
    Ok(())
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Match a full id or a unique prefix of one.
fn resolve_id(ids: impl IntoIterator<Item = Uuid>, needle: &str) -> Result<Uuid> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        bail!("Please give a saved grading id");
    }

    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No saved grading matches \"{needle}\""),
        _ => bail!(
            "\"{needle}\" matches {} saved gradings; use more characters",
            matches.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<Uuid> {
        vec![
            Uuid::from_u128(0xabc1_0000_0000_0000_0000_0000_0000_0001),
            Uuid::from_u128(0xabc2_0000_0000_0000_0000_0000_0000_0002),
            Uuid::from_u128(0x1234_0000_0000_0000_0000_0000_0000_0003),
        ]
    }

    #[test]
    fn resolves_unique_prefix() {
        let id = resolve_id(ids(), "ABC2").unwrap();
        assert_eq!(id, ids()[1]);
        assert_eq!(resolve_id(ids(), &ids()[2].to_string()).unwrap(), ids()[2]);
    }

    #[test]
    fn rejects_ambiguous_and_unknown() {
        let err = resolve_id(ids(), "abc").unwrap_err();
        assert!(err.to_string().contains("matches 2"));
        assert!(resolve_id(ids(), "ffff").is_err());
        assert!(resolve_id(ids(), "  ").is_err());
    }

    #[test]
    fn blank_optional_fields_clear() {
        assert_eq!(optional("  ".to_string()), None);
        assert_eq!(optional("x".to_string()), Some("x".to_string()));
    }
}
