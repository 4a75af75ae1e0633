use crate::app::App;
use crate::output;
use anyhow::bail;
use clap::{Args, Subcommand};
use examvault_common::cache::Snapshot;
use examvault_common::identity::IdentityProvider;
use examvault_common::models::{Branch, PaperType, PdfUpload, RecordDraft, Status};
use examvault_common::mutation::{BulkAction, FormState, SubmissionForm};
use examvault_common::remote::ListScope;
use examvault_common::views::{self, LeaderboardPolicy, RecordFilter, SearchField, SortDirection, SortKey, SortSpec};
use examvault_common::Record;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enabled papers
    Browse(ViewArgs),
    /// Your own submissions, any status
    Mine(ViewArgs),
    /// Top contributors
    Leaderboard {
        #[arg(long)]
        size: Option<usize>,
        #[arg(long)]
        refresh: bool,
    },
    /// Dashboard counts
    Stats {
        #[arg(long)]
        refresh: bool,
    },
    /// Years, semesters and branches known to the store
    Filters,
    /// Moderation (admins only)
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Submit a paper for one or more branches
    Submit(SubmitArgs),
    /// Sign out and clear the session
    Logout,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Moderation list; without filters the last selection is reused
    List {
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        sem: Option<String>,
        /// Comma-separated branch codes
        #[arg(long, value_delimiter = ',')]
        branch: Vec<Branch>,
        #[arg(long)]
        status: Option<Status>,
        #[command(flatten)]
        view: ViewArgs,
    },
    Enable { ids: Vec<String> },
    Disable { ids: Vec<String> },
    Toggle { ids: Vec<String> },
    Delete { ids: Vec<String> },
}

/// Client-side filter and sort over a loaded scope
#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Free-text search
    #[arg(long)]
    search: Option<String>,
    /// Field searched: subject, code, branch, type, year, sem, email
    #[arg(long, default_value = "subject")]
    field: SearchField,
    #[arg(long = "filter-year")]
    filter_year: Option<String>,
    #[arg(long = "filter-sem")]
    filter_sem: Option<String>,
    #[arg(long = "filter-branch")]
    filter_branch: Option<String>,
    #[arg(long = "filter-type")]
    filter_type: Option<PaperType>,
    /// year, sem, code, subject, branch, type, status, email, timestamp
    #[arg(long)]
    sort: Option<SortKey>,
    #[arg(long)]
    desc: bool,
    /// Ignore the cached copy
    #[arg(long)]
    refresh: bool,
}

impl ViewArgs {
    fn predicate(&self) -> RecordFilter {
        let mut predicate = RecordFilter {
            year: self.filter_year.clone(),
            semester: self.filter_sem.clone(),
            branch: self.filter_branch.clone(),
            paper_type: self.filter_type.map(|t| t.as_str().to_string()),
            ..RecordFilter::default()
        };
        if let Some(needle) = &self.search {
            predicate = predicate.search(self.field, needle.clone());
        }
        predicate
    }

    fn sort_spec(&self) -> SortSpec {
        match self.sort {
            Some(key) => {
                let direction = if self.desc {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
                SortSpec::new(key, direction)
            }
            None => SortSpec::default(),
        }
    }

    fn apply(&self, snapshot: &Snapshot) -> Vec<Record> {
        views::sort(&views::filter(snapshot, &self.predicate()), &self.sort_spec())
    }
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[arg(long)]
    year: String,
    #[arg(long)]
    sem: String,
    /// e.g. BCS-3011
    #[arg(long)]
    code: String,
    #[arg(long)]
    subject: String,
    #[arg(long = "type")]
    paper_type: Option<PaperType>,
    /// Comma-separated branch codes, or All_Branches
    #[arg(long, value_delimiter = ',', required = true)]
    branch: Vec<Branch>,
    /// URL of the already uploaded PDF
    #[arg(long)]
    pdf_url: Option<String>,
    /// Local PDF whose type and size are checked before submitting
    #[arg(long)]
    pdf: Option<PathBuf>,
    /// Drop branches that already have this paper instead of stopping
    #[arg(long)]
    skip_existing: bool,
    /// Verify only
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Browse(view) => {
            let snapshot = app.catalog.public(view.refresh).await?;
            output::records(&view.apply(&snapshot), app.json)
        }
        Command::Mine(view) => {
            let snapshot = app.catalog.my_submissions(view.refresh).await?;
            output::records(&view.apply(&snapshot), app.json)
        }
        Command::Leaderboard { size, refresh } => {
            let snapshot = app.catalog.leaderboard(refresh).await?;
            let mut policy = LeaderboardPolicy::from_config(&app.config.leaderboard);
            if let Some(size) = size {
                policy.size = size;
            }
            output::leaderboard(&views::leaderboard(&snapshot, &policy), app.json)
        }
        Command::Stats { refresh } => {
            let snapshot = app.catalog.dashboard(refresh).await?;
            output::summary(&views::summarize(&snapshot), app.json)
        }
        Command::Filters => output::filter_options(&app.catalog.filter_options().await?, app.json),
        Command::Admin { command } => admin(app, command).await,
        Command::Submit(args) => submit(app, args).await,
        Command::Logout => {
            app.logout().await;
            println!("Signed out, session cleared");
            Ok(())
        }
    }
}

async fn admin(app: &App, command: AdminCommand) -> anyhow::Result<()> {
    app.identity.require_admin()?;

    let (ids, action) = match command {
        AdminCommand::List {
            year,
            sem,
            branch,
            status,
            view,
        } => {
            let scope = if year.is_none() && sem.is_none() && branch.is_empty() && status.is_none() {
                app.catalog.remembered_admin_scope().await
            } else {
                ListScope {
                    year,
                    semester: sem,
                    branches: branch,
                    status,
                    ..ListScope::admin()
                }
            };
            let snapshot = app.catalog.admin(scope, view.refresh).await?;
            return output::records(&view.apply(&snapshot), app.json);
        }
        AdminCommand::Enable { ids } => (ids, BulkAction::SetStatus(Status::Enabled)),
        AdminCommand::Disable { ids } => (ids, BulkAction::SetStatus(Status::Disabled)),
        AdminCommand::Toggle { ids } => (ids, BulkAction::Toggle),
        AdminCommand::Delete { ids } => (ids, BulkAction::Delete),
    };

    if ids.is_empty() {
        bail!("no record ids given");
    }

    // Toggle flips the cached status, so the rows must be loaded first
    if action == BulkAction::Toggle {
        let mut missing = false;
        for id in &ids {
            missing |= app.cache().find(id).await.is_none();
        }
        if missing {
            let scope = app.catalog.remembered_admin_scope().await;
            app.catalog.admin(scope, true).await?;
        }
    }

    let outcomes = app.coordinator.bulk(&ids, action).await;
    output::bulk(&outcomes, app.json)?;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        bail!("{} of {} operations failed", failed, outcomes.len());
    }
    Ok(())
}

fn pdf_metadata(path: &Path) -> anyhow::Result<PdfUpload> {
    let metadata = std::fs::metadata(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = if file_name.to_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    };
    Ok(PdfUpload {
        file_name,
        content_type: content_type.to_string(),
        size_bytes: metadata.len(),
    })
}

fn confirm(question: &str) -> bool {
    if !std::io::stdin().is_terminal() {
        return false;
    }
    print!("{} [y/N] ", question);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer).is_ok() && answer.trim().eq_ignore_ascii_case("y")
}

async fn submit(app: &App, args: SubmitArgs) -> anyhow::Result<()> {
    let user = app.identity.require_user()?;
    let draft = RecordDraft {
        year: args.year,
        semester: args.sem,
        paper_code: args.code,
        subject_name: args.subject,
        paper_type: args.paper_type,
        email: user.email.clone(),
        pdf_url: args.pdf_url,
    };
    let mut form = SubmissionForm::with_draft(draft, args.branch);
    if let Some(path) = &args.pdf {
        form.attach_pdf(pdf_metadata(path)?, app.config.validation.max_pdf_bytes)?;
    }

    loop {
        let check = app.coordinator.verify(&mut form).await?;
        if !check.exists {
            break;
        }
        let taken: Vec<&str> = check.conflicting_branches.iter().map(Branch::code).collect();
        if !args.skip_existing {
            bail!("paper already exists for {}; use --skip-existing to drop them", taken.join(", "));
        }
        println!("Skipping branches that already have this paper: {}", taken.join(", "));
        for branch in &check.conflicting_branches {
            form.deselect_branch(*branch)?;
        }
        if form.branches().is_empty() {
            bail!("every selected branch already has this paper");
        }
    }

    if args.dry_run {
        let branches: Vec<&str> = form.branches().iter().map(Branch::code).collect();
        println!("Verified for {}; nothing submitted", branches.join(", "));
        return Ok(());
    }

    loop {
        let outcome = app.coordinator.submit(&mut form).await?;
        output::batch(&outcome, app.json)?;
        app.catalog.invalidate_after_submit(&user.email).await;

        if let FormState::Submitted { record_ids } = form.state() {
            info!(batch_id = form.batch_id(), records = record_ids.len(), "Submission complete");
            return Ok(());
        }
        if !confirm("Retry the failed branches?") {
            bail!("{} branch(es) were not saved", outcome.failed.len());
        }
        form.retain_failed()?;
        app.coordinator.verify(&mut form).await?;
    }
}
