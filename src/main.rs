// quote-desk: render, submit and receive priced project quotations

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use quote_desk::client::{self, SubmissionClient, SubmissionStatus, SubmitGuard};
use quote_desk::contact::{ContactField, ContactValidator};
use quote_desk::document::{self, Branding, QuotationInput, SummaryVisual};
use quote_desk::error::AppError;
use quote_desk::form::{self, FormState};
use quote_desk::logging::init_tracing;
use quote_desk::mailer::{SmtpMailer, SmtpSettings};
use quote_desk::pricing::{format_amount, SummaryTable};
use quote_desk::product::ProductLine;
use quote_desk::server::{self, AppState, ServerConfig};
use quote_desk::snapshot::{self, SnapshotOptions};
use quote_desk::store::QuotationStore;
use quote_desk::token::TokenSigner;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Build priced project quotations and run the intake service")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the quotation PDF for a selection file
    Render(RenderArgs),
    /// Render the quotation and send it to the intake service
    Submit(SubmitArgs),
    /// Run the intake service
    Serve(ServeArgs),
    /// Store admin credentials for the login endpoint
    AddAdmin(AddAdminArgs),
}

#[derive(Args, Debug)]
struct DocumentArgs {
    /// Selection file (JSON object of category name to selected options)
    #[arg(short, long)]
    selection: PathBuf,

    /// Date shown in the banner (YYYY-MM-DD format, defaults to today)
    #[arg(short, long)]
    date: Option<String>,

    /// Logo image (file path or URL) shown in the banner
    #[arg(long)]
    logo: Option<String>,

    /// How the summary table is placed on the page
    #[arg(long, value_enum, default_value = "auto")]
    snapshot: SnapshotMode,

    /// Browser binary used for browser snapshots
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SnapshotMode {
    /// Capture with a headless browser, drawing the rows when none is available
    Auto,
    /// Capture the rendered HTML table with a headless browser
    Browser,
    /// Draw the table rows directly
    Vector,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    document: DocumentArgs,

    /// Output filename (defaults to quotation-{date}.pdf)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    #[command(flatten)]
    document: DocumentArgs,

    /// Customer name
    #[arg(long)]
    name: String,

    /// Customer email
    #[arg(long)]
    email: String,

    /// Customer phone (10 digits)
    #[arg(long)]
    phone: String,

    /// Optional message for the business
    #[arg(long, default_value = "")]
    message: String,

    /// Product line the quotation is for
    #[arg(long, value_enum, default_value = "app")]
    product: ProductLine,

    /// Intake service base URL
    #[arg(long, env = "QUOTE_ENDPOINT", default_value = client::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "5000")]
    port: u16,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "quotations.db")]
    database: PathBuf,

    /// Directory for uploads awaiting notification
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Inbox that receives every quotation
    #[arg(long, env = "ADMIN_EMAIL", default_value = server::DEFAULT_ADMIN_EMAIL)]
    admin_email: String,

    /// SMTP relay host
    #[arg(long, env = "EMAIL_HOST", default_value = "smtp.hostinger.com")]
    email_host: String,

    /// SMTP relay port (implicit TLS)
    #[arg(long, env = "EMAIL_PORT", default_value = "465")]
    email_port: u16,

    /// SMTP login, also the sender address
    #[arg(long, env = "EMAIL_USER")]
    email_user: String,

    /// SMTP password
    #[arg(long, env = "EMAIL_PASS", hide_env_values = true)]
    email_pass: String,

    /// Secret used to sign login tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = server::DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// Require a login token on the listing endpoints
    #[arg(long, env = "REQUIRE_TOKEN_FOR_LISTING")]
    require_token_for_listing: bool,
}

#[derive(Args, Debug)]
struct AddAdminArgs {
    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "quotations.db")]
    database: PathBuf,

    #[arg(long)]
    username: String,

    #[arg(long)]
    password: String,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing("info", cli.log_json);

    match cli.command {
        Command::Render(args) => render(args),
        Command::Submit(args) => runtime()?.block_on(submit(args)),
        Command::Serve(args) => runtime()?.block_on(serve(args)),
        Command::AddAdmin(args) => runtime()?.block_on(add_admin(args)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, AppError> {
    Ok(tokio::runtime::Runtime::new()?)
}

// ============================================================================
// Commands
// ============================================================================

fn render(args: RenderArgs) -> Result<(), AppError> {
    let date = parse_date(&args.document.date)?;
    let categories = form::load_selection(&args.document.selection)?;
    let state = FormState::new(categories);
    let logo = document::load_logo(&args.document.logo)?;

    let summary = state.summary();
    let visual = match args.document.snapshot {
        SnapshotMode::Vector => SummaryVisual::Table,
        _ => runtime()?.block_on(summary_visual(&summary, &args.document))?,
    };

    let pdf = document::render_quotation(&QuotationInput {
        summary: &summary,
        visual: &visual,
        logo: logo.as_ref(),
        date,
        branding: &Branding::default(),
    })?;

    let output_file = args
        .output
        .unwrap_or_else(|| format!("quotation-{}.pdf", date.format("%Y-%m-%d")));
    let file = File::create(&output_file)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&pdf)?;
    writer.flush()?;

    println!("✓ Generated: {}", output_file);
    print_summary(&summary);

    Ok(())
}

async fn submit(args: SubmitArgs) -> Result<(), AppError> {
    let date = parse_date(&args.document.date)?;
    let categories = form::load_selection(&args.document.selection)?;
    let state = FormState::new(categories)
        .update_field(ContactField::Name, args.name)
        .update_field(ContactField::Email, args.email)
        .update_field(ContactField::Phone, args.phone)
        .update_field(ContactField::Message, args.message);

    let validator = ContactValidator::new()
        .map_err(|e| AppError::ConfigError(format!("contact rules: {}", e)))?;
    let checked = state.validated(&validator);
    for (field, message) in &checked.errors {
        eprintln!("  {}: {}", field, message);
    }

    let client = SubmissionClient::new(
        &args.endpoint,
        args.product,
        Duration::from_secs(args.timeout_secs),
    )?;
    let guard = SubmitGuard::new();
    let document_args = &args.document;

    let status = client::submit_quotation(
        &state,
        &validator,
        &guard,
        &client,
        |summary| async move {
            let logo = document::load_logo(&document_args.logo)?;
            let visual = summary_visual(&summary, document_args).await?;
            document::render_quotation(&QuotationInput {
                summary: &summary,
                visual: &visual,
                logo: logo.as_ref(),
                date,
                branding: &Branding::default(),
            })
        },
        |status| println!("{}", status.message()),
    )
    .await?;

    match status {
        SubmissionStatus::Failed(message) => Err(AppError::SubmitError(message)),
        _ => {
            print_summary(&checked.summary());
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<(), AppError> {
    let store = QuotationStore::open(&args.database)?;
    std::fs::create_dir_all(&args.upload_dir)?;

    let mailer = SmtpMailer::new(&SmtpSettings {
        host: args.email_host,
        port: args.email_port,
        username: args.email_user,
        password: args.email_pass,
        sender_name: Branding::default().business_name,
    })
    .map_err(|e| AppError::ConfigError(e.to_string()))?;

    let config = ServerConfig {
        admin_email: args.admin_email,
        upload_dir: args.upload_dir,
        max_upload_bytes: args.max_upload_bytes,
        require_token_for_listing: args.require_token_for_listing,
        branding: Branding::default(),
    };
    let state = AppState::new(
        store,
        Arc::new(mailer),
        TokenSigner::new(args.jwt_secret),
        config,
    );

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    server::serve(listener, state).await?;
    Ok(())
}

async fn add_admin(args: AddAdminArgs) -> Result<(), AppError> {
    let store = QuotationStore::open(&args.database)?;
    let id = store.add_admin(&args.username, &args.password).await?;
    println!("✓ Added admin {} (id {})", args.username, id);
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_date(date_str: &Option<String>) -> Result<NaiveDate, AppError> {
    match date_str {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::DateError(s.clone())),
        None => Ok(Local::now().date_naive()),
    }
}

async fn summary_visual(
    summary: &SummaryTable,
    args: &DocumentArgs,
) -> Result<SummaryVisual, AppError> {
    if args.snapshot == SnapshotMode::Vector {
        return Ok(SummaryVisual::Table);
    }
    let options = SnapshotOptions {
        chrome_executable: args.chrome.clone(),
    };
    match snapshot::capture_summary(summary, &options).await {
        Ok(image) => Ok(SummaryVisual::Snapshot(image)),
        Err(e) if args.snapshot == SnapshotMode::Auto => {
            warn!("{}; drawing the summary table instead", e);
            Ok(SummaryVisual::Table)
        }
        Err(e) => Err(e),
    }
}

fn print_summary(summary: &SummaryTable) {
    for row in &summary.rows {
        println!("  {:<16} {:<40} {}", row.category, row.selected, format_amount(row.total));
    }
    println!("  Grand Total: {}", format_amount(summary.grand_total));
}
