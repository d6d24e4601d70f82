// quote-desk: intake service that stores, mails and lists quotations

use crate::document::Branding;
use crate::mailer::{MailAttachment, MailBody, MailError, Mailer, OutgoingMail};
use crate::product::ProductLine;
use crate::snapshot::escape_html;
use crate::store::{NewQuotation, QuotationRecord, QuotationStore, StoreError};
use crate::token::{TokenError, TokenSigner};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const DEFAULT_ADMIN_EMAIL: &str = "info@aspireths.com";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DOCUMENT_FIELD: &str = "pdf";
const PDF_MIME: &str = "application/pdf";

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Business inbox that receives every quotation
    pub admin_email: String,
    /// Where uploads are held until notification finishes
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Listing endpoints demand a bearer token when set
    pub require_token_for_listing: bool,
    pub branding: Branding,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            upload_dir: std::env::temp_dir().join("quote-desk-uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            require_token_for_listing: false,
            branding: Branding::default(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    store: QuotationStore,
    mailer: Arc<dyn Mailer>,
    tokens: TokenSigner,
    config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        store: QuotationStore,
        mailer: Arc<dyn Mailer>,
        tokens: TokenSigner,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            tokens,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &QuotationStore {
        &self.store
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/", get(landing_handler))
        .route(ProductLine::Website.submit_path(), post(website_submit_handler))
        .route(ProductLine::App.submit_path(), post(app_submit_handler))
        .route(ProductLine::Website.list_path(), get(website_list_handler))
        .route(ProductLine::App.list_path(), get(app_list_handler))
        .route("/api/login", post(login_handler))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until ctrl-c.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("intake service listening on {addr}");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for shutdown signal: {e}");
            }
            info!("shutting down");
        })
        .await
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Name, Email, Phone, PDF required")]
    MissingFields,
    #[error("Only PDF allowed")]
    NotPdf,
    #[error("malformed upload: {0}")]
    BadUpload(String),
    #[error("upload could not be stored: {0}")]
    UploadStorage(#[from] std::io::Error),
    #[error("DB Insert Error: {0}")]
    Persist(StoreError),
    #[error("Email sending failed: {source}")]
    Notify { id: i64, source: MailError },
    #[error("Fetch Error: {0}")]
    Fetch(StoreError),
    #[error("DB Error: {0}")]
    Login(StoreError),
    #[error("Invalid Credentials")]
    InvalidCredentials,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("token could not be issued: {0}")]
    TokenIssue(TokenError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingFields => (
                StatusCode::BAD_REQUEST,
                json!({"message": "Name, Email, Phone, PDF required"}),
            ),
            ApiError::NotPdf => (StatusCode::BAD_REQUEST, json!({"message": "Only PDF allowed"})),
            ApiError::BadUpload(e) => (
                StatusCode::BAD_REQUEST,
                json!({"message": "Malformed upload", "error": e}),
            ),
            ApiError::UploadStorage(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "Upload Error", "error": e.to_string()}),
            ),
            ApiError::Persist(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "DB Insert Error", "error": e.to_string()}),
            ),
            ApiError::Notify { id, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "Email sending failed", "error": source.to_string(), "id": id}),
            ),
            ApiError::Fetch(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "Fetch Error", "error": e.to_string()}),
            ),
            ApiError::Login(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "DB Error", "error": e.to_string()}),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({"message": "Invalid Credentials"}),
            ),
            ApiError::Unauthorized(e) => (
                StatusCode::UNAUTHORIZED,
                json!({"message": "Unauthorized", "error": e}),
            ),
            ApiError::TokenIssue(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "Token Error", "error": e.to_string()}),
            ),
        };
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn landing_handler() -> &'static str {
    "Backend Running Successfully"
}

async fn website_submit_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    accept_submission(&state, ProductLine::Website, multipart).await
}

async fn app_submit_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    accept_submission(&state, ProductLine::App, multipart).await
}

async fn website_list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<QuotationRecord>>, ApiError> {
    list_quotations(&state, ProductLine::Website, &headers).await
}

async fn app_list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<QuotationRecord>>, ApiError> {
    list_quotations(&state, ProductLine::App, &headers).await
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = request.map_err(|e| {
        warn!("unreadable login body: {}", e);
        ApiError::InvalidCredentials
    })?;
    let admin_id = state
        .store
        .find_admin(&request.username, &request.password)
        .await
        .map_err(ApiError::Login)?
        .ok_or(ApiError::InvalidCredentials)?;

    let token = state.tokens.issue(admin_id).map_err(ApiError::TokenIssue)?;
    info!(admin_id, "admin logged in");
    Ok(Json(json!({"message": "Login Successful", "token": token})))
}

// ============================================================================
// Submission
// ============================================================================

/// The uploaded document, held in a temp file deleted when this is dropped.
struct StoredUpload {
    file: NamedTempFile,
    original_name: String,
}

#[derive(Default)]
struct SubmissionFields {
    text: HashMap<String, String>,
    document: Option<(String, Vec<u8>)>,
}

impl SubmissionFields {
    /// A field counts as present only when non-empty.
    fn get(&self, name: &str) -> Option<&str> {
        self.text
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

async fn read_fields(mut multipart: Multipart) -> Result<SubmissionFields, ApiError> {
    let mut fields = SubmissionFields::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == DOCUMENT_FIELD {
            if field.content_type() != Some(PDF_MIME) {
                return Err(ApiError::NotPdf);
            }
            let file_name = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "quotation.pdf".to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadUpload(e.to_string()))?;
            fields.document = Some((file_name, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadUpload(e.to_string()))?;
            fields.text.insert(name, value);
        }
    }
    Ok(fields)
}

fn store_upload(
    config: &ServerConfig,
    original_name: String,
    content: &[u8],
) -> Result<StoredUpload, ApiError> {
    std::fs::create_dir_all(&config.upload_dir)?;
    let safe_name: String = original_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}-", chrono::Utc::now().timestamp_millis()))
        .suffix(&format!("-{}", safe_name))
        .tempfile_in(&config.upload_dir)?;
    file.write_all(content)?;
    file.flush()?;
    Ok(StoredUpload {
        file,
        original_name,
    })
}

/// `grandTotal` as sent by the form. The longest leading number is used and
/// trailing text ignored; anything without one counts as zero.
pub fn parse_grand_total(raw: Option<&str>) -> f64 {
    raw.and_then(leading_number)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let candidate = text
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
        .map_or(text, |end| &text[..end]);
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
}

async fn accept_submission(
    state: &AppState,
    line: ProductLine,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let fields = read_fields(multipart).await?;

    let (Some(name), Some(email), Some(phone), Some((file_name, content))) = (
        fields.get("name"),
        fields.get("email"),
        fields.get("phone"),
        fields.document.as_ref(),
    ) else {
        return Err(ApiError::MissingFields);
    };

    let upload = store_upload(&state.config, file_name.clone(), content)?;

    let quotation = NewQuotation {
        product_line: line,
        customer_name: name.to_string(),
        customer_email: email.to_string(),
        customer_phone: phone.to_string(),
        message: fields.get("message").unwrap_or_default().to_string(),
        table_details: fields.get("tableDetails").unwrap_or("[]").to_string(),
        grand_total: parse_grand_total(fields.get("grandTotal")),
    };

    let id = state
        .store
        .insert(&quotation)
        .await
        .map_err(ApiError::Persist)?;
    info!(id, product_line = %line, "quotation stored");

    notify(state, line, &quotation, &upload)
        .await
        .map_err(|source| ApiError::Notify { id, source })?;

    info!(id, "quotation emails sent");
    Ok(Json(json!({
        "message": format!("{} quotation saved + emails sent to admin and client!", line.label()),
        "id": id,
    })))
}

/// Sends the admin notice, then the customer copy.
async fn notify(
    state: &AppState,
    line: ProductLine,
    quotation: &NewQuotation,
    upload: &StoredUpload,
) -> Result<(), MailError> {
    let content = tokio::fs::read(upload.file.path()).await?;
    let attachment = MailAttachment {
        filename: upload.original_name.clone(),
        content,
    };

    state
        .mailer
        .send(admin_mail(&state.config.admin_email, line, quotation, attachment.clone()))
        .await?;
    state
        .mailer
        .send(customer_mail(&state.config.branding, line, quotation, attachment))
        .await?;
    Ok(())
}

pub fn admin_mail(
    admin_email: &str,
    line: ProductLine,
    q: &NewQuotation,
    attachment: MailAttachment,
) -> OutgoingMail {
    let message = if q.message.is_empty() {
        "No message"
    } else {
        q.message.as_str()
    };
    let html = format!(
        "<h3>New {label} Quotation Submitted</h3>\n\
         <p><b>Name:</b> {name}</p>\n\
         <p><b>Email:</b> {email}</p>\n\
         <p><b>Phone:</b> {phone}</p>\n\
         <p><b>Grand Total:</b> &#8377;{total}</p>\n\
         <p><b>Message:</b> {message}</p>\n\
         <pre>{details}</pre>\n",
        label = line.label(),
        name = escape_html(&q.customer_name),
        email = escape_html(&q.customer_email),
        phone = escape_html(&q.customer_phone),
        total = crate::pricing::format_amount(q.grand_total),
        message = escape_html(message),
        details = escape_html(&q.table_details),
    );
    OutgoingMail {
        to: admin_email.to_string(),
        subject: format!("New {} Quotation from {}", line.label(), q.customer_name),
        body: MailBody::Html(html),
        attachment: Some(attachment),
    }
}

pub fn customer_mail(
    branding: &Branding,
    line: ProductLine,
    q: &NewQuotation,
    attachment: MailAttachment,
) -> OutgoingMail {
    let text = format!(
        "Hello {name},\n\nThank you for using {business}'s {label} Cost Calculator. \
         Your quotation is attached.\n\nRegards,\n{business}",
        name = q.customer_name,
        business = branding.business_name,
        label = line.label(),
    );
    OutgoingMail {
        to: q.customer_email.clone(),
        subject: format!("Your {} Quotation - {}", line.label(), q.customer_name),
        body: MailBody::Text(text),
        attachment: Some(attachment),
    }
}

// ============================================================================
// Listing
// ============================================================================

async fn list_quotations(
    state: &AppState,
    line: ProductLine,
    headers: &HeaderMap,
) -> Result<Json<Vec<QuotationRecord>>, ApiError> {
    if state.config.require_token_for_listing {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        state
            .tokens
            .verify(token)
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    }

    let records = state.store.list(line).await.map_err(ApiError::Fetch)?;
    Ok(Json(records))
}
