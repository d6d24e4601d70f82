// quote-desk: packaging a quotation and posting it to the intake service

use crate::contact::{ContactForm, ContactValidator};
use crate::error::AppError;
use crate::form::FormState;
use crate::pricing::{self, table_details, Category, SummaryTable};
use crate::product::ProductLine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://app.aspireths.com";
pub const DOCUMENT_FILE_NAME: &str = "requirements-summary.pdf";

pub const SENDING_MESSAGE: &str = "Sending email... Please wait.";
pub const SENT_MESSAGE: &str = "Email sent successfully!";
pub const FIX_ERRORS_MESSAGE: &str = "Please fix the errors above before submitting.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Error generating or sending PDF.";

// ============================================================================
// Data Structures
// ============================================================================

/// Everything sent for one quotation request.
#[derive(Debug, Clone)]
pub struct Submission {
    pub contact: ContactForm,
    pub categories: Vec<Category>,
    pub grand_total: f64,
    pub document: Vec<u8>,
}

impl Submission {
    pub fn new(contact: ContactForm, categories: Vec<Category>, document: Vec<u8>) -> Self {
        let grand_total = pricing::grand_total(&categories);
        Self {
            contact,
            categories,
            grand_total,
            document,
        }
    }

    pub fn table_details_json(&self) -> Result<String, AppError> {
        serde_json::to_string(&table_details(&self.categories))
            .map_err(|e| AppError::SubmitError(e.to_string()))
    }

    /// Builds the multipart body the intake service expects.
    pub fn to_form(&self) -> Result<Form, AppError> {
        let document = Part::bytes(self.document.clone())
            .file_name(DOCUMENT_FILE_NAME)
            .mime_str("application/pdf")
            .map_err(|e| AppError::SubmitError(e.to_string()))?;

        Ok(Form::new()
            .text("name", self.contact.name.clone())
            .text("email", self.contact.email.clone())
            .text("phone", self.contact.phone.clone())
            .text("message", self.contact.message.clone())
            .part("pdf", document)
            .text("tableDetails", self.table_details_json()?)
            .text("grandTotal", pricing::format_amount(self.grand_total)))
    }
}

/// What the user sees while and after submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    InProgress,
    Sent,
    Failed(String),
}

impl SubmissionStatus {
    pub fn message(&self) -> &str {
        match self {
            SubmissionStatus::InProgress => SENDING_MESSAGE,
            SubmissionStatus::Sent => SENT_MESSAGE,
            SubmissionStatus::Failed(message) => message,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SubmissionStatus::Failed(_))
    }
}

/// Disables the submit trigger while a submission is outstanding.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    busy: AtomicBool,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the trigger; `None` while another submission holds it.
    pub fn try_acquire(&self) -> Option<SubmitTicket<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitTicket { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct SubmitTicket<'a> {
    guard: &'a SubmitGuard,
}

impl Drop for SubmitTicket<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Deserialize)]
struct ServerReply {
    #[serde(default)]
    error: Option<serde_json::Value>,
}

// ============================================================================
// Client
// ============================================================================

pub struct SubmissionClient {
    http: reqwest::Client,
    endpoint: String,
    product: ProductLine,
}

impl SubmissionClient {
    pub fn new(endpoint: &str, product: ProductLine, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            product,
        })
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.endpoint, self.product.submit_path())
    }

    /// Sends one POST. No retry.
    ///
    /// A non-success reply becomes `Failed` with the server's error text;
    /// transport errors and unreadable replies are returned as `Err`.
    pub async fn send(&self, submission: &Submission) -> Result<SubmissionStatus, AppError> {
        let url = self.url();
        info!(%url, "posting quotation");

        let response = self
            .http
            .post(&url)
            .multipart(submission.to_form()?)
            .send()
            .await
            .map_err(|e| AppError::SubmitError(e.to_string()))?;

        let status = response.status();
        let reply: ServerReply = response
            .json()
            .await
            .map_err(|e| AppError::SubmitError(format!("unreadable reply: {}", e)))?;

        if status.is_success() {
            Ok(SubmissionStatus::Sent)
        } else {
            let detail = match reply.error {
                Some(serde_json::Value::String(s)) if !s.is_empty() => s,
                Some(serde_json::Value::Null) | None => "Unknown error".to_string(),
                Some(other) => other.to_string(),
            };
            warn!(%status, %detail, "intake service rejected quotation");
            Ok(SubmissionStatus::Failed(format!(
                "Failed to send email: {}",
                detail
            )))
        }
    }
}

/// Validates, renders and sends a quotation, reporting each state to
/// `on_status`. Returns the final state.
///
/// Rendering and network failures collapse into one generic message.
pub async fn submit_quotation<R, Fut>(
    state: &FormState,
    validator: &ContactValidator,
    guard: &SubmitGuard,
    client: &SubmissionClient,
    render: R,
    mut on_status: impl FnMut(&SubmissionStatus),
) -> Result<SubmissionStatus, AppError>
where
    R: FnOnce(SummaryTable) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, AppError>>,
{
    let checked = state.validated(validator);
    if !checked.is_valid() {
        let status = SubmissionStatus::Failed(FIX_ERRORS_MESSAGE.to_string());
        on_status(&status);
        return Err(AppError::ValidationError(
            checked
                .errors
                .iter()
                .map(|(field, message)| format!("{}: {}", field, message))
                .collect::<Vec<_>>()
                .join("; "),
        ));
    }

    let _ticket = guard.try_acquire().ok_or(AppError::SubmissionInProgress)?;
    on_status(&SubmissionStatus::InProgress);

    let outcome = async {
        let document = render(checked.summary()).await?;
        let submission = Submission::new(checked.contact.clone(), checked.categories.clone(), document);
        client.send(&submission).await
    }
    .await;

    let status = match outcome {
        Ok(status) => status,
        Err(e) => {
            error!("quotation submission failed: {}", e);
            SubmissionStatus::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        }
    };
    on_status(&status);
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactField;
    use crate::pricing::OptionItem;

    fn filled_state() -> FormState {
        FormState::default()
            .select("Platform", vec![OptionItem::new("Web", 500.0)])
            .unwrap()
            .update_field(ContactField::Name, "Akhila Rao")
            .update_field(ContactField::Email, "akhila@gmail.com")
            .update_field(ContactField::Phone, "9876543210")
    }

    fn unreachable_client() -> SubmissionClient {
        SubmissionClient::new("http://127.0.0.1:1/", ProductLine::App, Duration::from_secs(2))
            .unwrap()
    }

    #[test]
    fn url_joins_endpoint_and_route() {
        let client = unreachable_client();
        assert_eq!(client.url(), "http://127.0.0.1:1/send-app-email");
    }

    #[test]
    fn submission_carries_grand_total() {
        let submission = Submission::new(
            ContactForm::default(),
            filled_state().categories,
            b"%PDF-1.3".to_vec(),
        );
        assert_eq!(submission.grand_total, 500.0);
        let details: serde_json::Value =
            serde_json::from_str(&submission.table_details_json().unwrap()).unwrap();
        assert_eq!(details.as_array().unwrap().len(), 11);
        assert_eq!(details[0]["totalPrice"], 500.0);
    }

    #[test]
    fn guard_blocks_second_submission() {
        let guard = SubmitGuard::new();
        let ticket = guard.try_acquire();
        assert!(ticket.is_some());
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());
        drop(ticket);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn invalid_contact_never_renders() {
        let state = filled_state().update_field(ContactField::Phone, "98765");
        let validator = ContactValidator::new().unwrap();
        let guard = SubmitGuard::new();
        let mut seen = Vec::new();
        let rendered = std::cell::Cell::new(false);

        let result = submit_quotation(
            &state,
            &validator,
            &guard,
            &unreachable_client(),
            |_| {
                rendered.set(true);
                async { Ok(Vec::new()) }
            },
            |s| seen.push(s.clone()),
        )
        .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(!rendered.get());
        assert_eq!(seen, vec![SubmissionStatus::Failed(FIX_ERRORS_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn unreachable_service_reports_generic_failure() {
        let validator = ContactValidator::new().unwrap();
        let guard = SubmitGuard::new();
        let mut seen = Vec::new();

        let status = submit_quotation(
            &filled_state(),
            &validator,
            &guard,
            &unreachable_client(),
            |_| async { Ok(b"%PDF-1.3".to_vec()) },
            |s| seen.push(s.clone()),
        )
        .await
        .unwrap();

        assert_eq!(status, SubmissionStatus::Failed(GENERIC_FAILURE_MESSAGE.to_string()));
        assert_eq!(seen.first(), Some(&SubmissionStatus::InProgress));
        assert!(!guard.is_busy());
    }

    #[tokio::test]
    async fn render_failure_reports_generic_failure() {
        let validator = ContactValidator::new().unwrap();
        let guard = SubmitGuard::new();

        let status = submit_quotation(
            &filled_state(),
            &validator,
            &guard,
            &unreachable_client(),
            |_| async { Err(AppError::SnapshotError("no browser".to_string())) },
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(status.message(), GENERIC_FAILURE_MESSAGE);
    }
}
