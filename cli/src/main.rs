mod render;

use anyhow::{anyhow, Context, Result};
use bulkgen_client::drafts::{
    submit_keyword_draft, with_store, DraftAutosave, DraftStore, KeywordDraft, SharedDraftStore,
};
use bulkgen_client::{
    diff_snapshots, templates, BoardConfig, BulkApi, Config, HttpBulkApi, JobBoard, Notice,
    Notifier,
};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use common::{JobId, PageQuery, TemplateDraft, Tone, WritingStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(author, version, about = "Track and manage bulk outline generation jobs", long_about = None)]
struct Cli {
    /// Config file (.yaml, .yml or .toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bulk jobs
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Submit a keyword batch for outline generation
    Submit {
        /// Keywords, one per line
        #[arg(short, long, conflicts_with_all = ["file", "from_draft"])]
        keywords: Option<String>,
        /// Read keywords from a file ("-" for stdin)
        #[arg(short, long, conflicts_with = "from_draft")]
        file: Option<PathBuf>,
        /// Submit the saved keyword draft and clear it on success
        #[arg(long)]
        from_draft: bool,
        /// Template to apply
        #[arg(short, long)]
        template: Option<String>,
        /// Keep watching until the batch finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// Cancel a pending or processing job
    Cancel {
        id: String,
    },
    /// Reprocess the failed items of a job
    Retry {
        id: String,
        /// Keep watching until the retried items finish
        #[arg(short, long)]
        watch: bool,
    },
    /// Follow job progress until no job is pending or processing
    Watch,
    /// Manage generation templates
    Templates {
        #[command(subcommand)]
        action: TemplateCommand,
    },
    /// Inspect or edit the local keyword draft
    Draft {
        #[command(subcommand)]
        action: DraftCommand,
    },
    /// Type keywords interactively (autosaved as a draft), submit on EOF
    Compose {
        #[arg(short, long)]
        template: Option<String>,
    },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// List templates
    List,
    /// Create a template
    Create {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        settings: TemplateSettings,
    },
    /// Update a template; unspecified settings keep their current value
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        settings: TemplateSettings,
    },
    /// Delete a template
    Delete {
        id: String,
    },
}

#[derive(clap::Args)]
struct TemplateSettings {
    #[arg(long)]
    tone: Option<Tone>,
    #[arg(long)]
    style: Option<WritingStyle>,
    #[arg(long)]
    word_count: Option<u32>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    faq: Option<bool>,
    #[arg(long)]
    conclusion: Option<bool>,
}

impl TemplateSettings {
    fn apply(self, draft: &mut TemplateDraft) {
        if let Some(tone) = self.tone {
            draft.tone = tone;
        }
        if let Some(style) = self.style {
            draft.writing_style = style;
        }
        if let Some(word_count) = self.word_count {
            draft.word_count = word_count;
        }
        if let Some(language) = self.language {
            draft.language = language;
        }
        if let Some(faq) = self.faq {
            draft.include_faq = faq;
        }
        if let Some(conclusion) = self.conclusion {
            draft.include_conclusion = conclusion;
        }
    }
}

#[derive(Subcommand)]
enum DraftCommand {
    /// Print the saved draft
    Show,
    /// Save keywords as the draft
    Save {
        #[arg(short, long, conflicts_with = "file")]
        keywords: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long)]
        template: Option<String>,
    },
    /// Delete the saved draft
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

struct App {
    config: Config,
    api: HttpBulkApi,
    notifier: Notifier,
    tz: Tz,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    bulkgen_client::logging::setup_logging(&config.logging, cli.verbose)?;
    log::debug!("Using API at {}", config.api.base_url);

    let app = App {
        api: HttpBulkApi::new(&config.api)?,
        notifier: Notifier::with_terminal(config.notifications.clone()),
        tz: config.display.tz()?,
        config,
    };

    match cli.command {
        Commands::List { page, page_size, format } => {
            let query = PageQuery {
                page,
                page_size: page_size.unwrap_or(app.config.poller.page_size),
            };
            list_jobs(&app, query, format).await
        }
        Commands::Submit { keywords, file, from_draft, template, watch } => {
            if from_draft {
                let store = open_drafts(&app.config)?;
                let mut draft = with_store(&store, |s| s.load::<KeywordDraft>())?
                    .ok_or_else(|| anyhow!("No saved keyword draft"))?
                    .data;
                if template.is_some() {
                    draft.template_id = template;
                }
                submit(&app, draft, Some(&store), watch).await
            } else {
                let keywords_text = read_keywords(keywords, file.as_deref()).await?;
                let draft = KeywordDraft { keywords_text, template_id: template };
                submit(&app, draft, None, watch).await
            }
        }
        Commands::Cancel { id } => cancel(&app, JobId(id)).await,
        Commands::Retry { id, watch } => retry(&app, JobId(id), watch).await,
        Commands::Watch => {
            let board = mount(&app).await?;
            watch_until_idle(&app, &board).await;
            board.unmount().await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Templates { action } => manage_templates(&app, action).await,
        Commands::Draft { action } => manage_draft(&app, action).await,
        Commands::Compose { template } => compose(&app, template).await,
    }
}

async fn mount(app: &App) -> Result<JobBoard<HttpBulkApi>> {
    let board = JobBoard::mount(app.api.clone(), BoardConfig::from(&app.config.poller))
        .await
        .context("Failed to load jobs")?;
    Ok(board)
}

async fn list_jobs(app: &App, query: PageQuery, format: OutputFormat) -> Result<ExitCode> {
    let page = app.api.list_jobs(query).await.context("Failed to load jobs")?;

    match format {
        OutputFormat::Table => {
            if page.items.is_empty() {
                println!("No bulk jobs yet.");
            } else {
                println!("{}", render::jobs_table(&page.items, app.tz));
                println!("Page {} of {} ({} jobs)", query.page, page.pages.max(1), page.total);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Csv => render::write_jobs_csv(&page.items, std::io::stdout())?,
    }
    Ok(ExitCode::SUCCESS)
}

/// With a draft store, the stored draft is cleared once the job is created.
async fn submit(
    app: &App,
    draft: KeywordDraft,
    store: Option<&SharedDraftStore>,
    watch: bool,
) -> Result<ExitCode> {
    let board = mount(app).await?;

    let result = match store {
        Some(store) => submit_keyword_draft(&board, store, &draft).await,
        None => board.submit(&draft.keywords_text, draft.template_id.clone()).await,
    };
    let code = match result {
        Ok(job) => {
            app.notifier
                .notify(&Notice::success(
                    format!("Job {}", job.id),
                    format!("Queued {} keywords", job.total_items),
                ))
                .await;
            if watch {
                watch_until_idle(app, &board).await;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            app.notifier.toast_error("Submit failed", &e).await;
            ExitCode::FAILURE
        }
    };

    board.unmount().await;
    Ok(code)
}

async fn cancel(app: &App, id: JobId) -> Result<ExitCode> {
    let board = mount(app).await?;
    let code = match board.cancel(&id).await {
        Ok(()) => {
            println!("Cancellation requested for job {}", id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            app.notifier.toast_error("Cancel failed", &e).await;
            ExitCode::FAILURE
        }
    };
    board.unmount().await;
    Ok(code)
}

async fn retry(app: &App, id: JobId, watch: bool) -> Result<ExitCode> {
    let board = mount(app).await?;
    let code = match board.retry_failed(&id).await {
        Ok(()) => {
            println!("Retrying failed items of job {}", id);
            if watch {
                watch_until_idle(app, &board).await;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            app.notifier.toast_error("Retry failed", &e).await;
            ExitCode::FAILURE
        }
    };
    board.unmount().await;
    Ok(code)
}

/// Print transitions as the poller observes them. Returns once nothing is
/// left to poll or on Ctrl-C.
async fn watch_until_idle<A: BulkApi + 'static>(app: &App, board: &JobBoard<A>) {
    let mut rx = board.subscribe();
    let mut previous = rx.borrow_and_update().clone();
    println!("{}", render::jobs_table(&previous.jobs, app.tz));

    while previous.should_poll() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped watching.");
                return;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }

        let current = rx.borrow_and_update().clone();
        for event in diff_snapshots(&previous, &current) {
            println!("{}", render::event_line(&event));
            if let Some(notice) = Notice::for_event(&event) {
                app.notifier.notify(&notice).await;
            }
        }
        previous = current;
    }

    println!("No pending or processing jobs left.");
}

async fn manage_templates(app: &App, action: TemplateCommand) -> Result<ExitCode> {
    let result = match action {
        TemplateCommand::List => {
            let list = templates::list_templates(&app.api).await?;
            if list.is_empty() {
                println!("No templates.");
            } else {
                println!("{}", render::templates_table(&list));
            }
            return Ok(ExitCode::SUCCESS);
        }
        TemplateCommand::Create { name, settings } => {
            let mut draft = TemplateDraft::new(name);
            settings.apply(&mut draft);
            templates::create_template(&app.api, &draft)
                .await
                .map(|t| format!("Created template {} ({})", t.id, t.name))
        }
        TemplateCommand::Update { id, name, settings } => {
            let current = templates::list_templates(&app.api)
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .ok_or_else(|| anyhow!("Template {} not found", id))?;
            let mut draft = TemplateDraft::from(&current);
            if let Some(name) = name {
                draft.name = name;
            }
            settings.apply(&mut draft);
            templates::update_template(&app.api, &id, &draft)
                .await
                .map(|t| format!("Updated template {}", t.id))
        }
        TemplateCommand::Delete { id } => templates::delete_template(&app.api, &id)
            .await
            .map(|_| format!("Deleted template {}", id)),
    };

    match result {
        Ok(message) => {
            println!("{}", message);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            app.notifier.toast_error("Template change failed", &e).await;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn manage_draft(app: &App, action: DraftCommand) -> Result<ExitCode> {
    let store = open_drafts(&app.config)?;
    match action {
        DraftCommand::Show => match with_store(&store, |s| s.load::<KeywordDraft>())? {
            Some(draft) => {
                println!(
                    "Saved {} ({} keywords{})",
                    common::format_timestamp(&draft.saved_at, app.tz),
                    common::parse_keyword_lines(&draft.data.keywords_text).len(),
                    draft
                        .data
                        .template_id
                        .as_deref()
                        .map(|t| format!(", template {}", t))
                        .unwrap_or_default()
                );
                println!("{}", draft.data.keywords_text);
            }
            None => println!("No saved draft."),
        },
        DraftCommand::Save { keywords, file, template } => {
            let keywords_text = read_keywords(keywords, file.as_deref()).await?;
            with_store(&store, |s| {
                s.save(&KeywordDraft { keywords_text, template_id: template })
            })?;
            println!("Draft saved.");
        }
        DraftCommand::Clear => {
            if with_store(&store, |s| s.clear::<KeywordDraft>())? {
                println!("Draft cleared.");
            } else {
                println!("No saved draft.");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn compose(app: &App, template: Option<String>) -> Result<ExitCode> {
    let store = open_drafts(&app.config)?;
    let mut draft = with_store(&store, |s| s.load::<KeywordDraft>())?
        .map(|d| d.data)
        .unwrap_or_default();
    if template.is_some() {
        draft.template_id = template;
    }

    if !draft.keywords_text.is_empty() {
        println!("Restored draft:\n{}", draft.keywords_text);
    }
    println!(
        "Enter keywords, one per line (max {}). Finish with Ctrl-D.",
        common::MAX_KEYWORDS_PER_BATCH
    );

    let autosave = DraftAutosave::spawn(store.clone(), app.config.drafts.debounce());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !draft.keywords_text.is_empty() && !draft.keywords_text.ends_with('\n') {
            draft.keywords_text.push('\n');
        }
        draft.keywords_text.push_str(&line);
        autosave.update(draft.clone());
    }
    autosave.close().await;

    submit(app, draft, Some(&store), false).await
}

async fn read_keywords(keywords: Option<String>, file: Option<&Path>) -> Result<String> {
    match (keywords, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) if path == Path::new("-") => {
            let mut text = String::new();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                text.push_str(&line);
                text.push('\n');
            }
            Ok(text)
        }
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read keywords from {:?}", path)),
        (None, None) => Err(anyhow!("Provide keywords with --keywords or --file")),
    }
}

fn open_drafts(config: &Config) -> Result<SharedDraftStore> {
    let store = DraftStore::open(&config.drafts.path, config.drafts.ttl())
        .with_context(|| format!("Failed to open draft store at {:?}", config.drafts.path))?;
    Ok(Arc::new(Mutex::new(store)))
}
