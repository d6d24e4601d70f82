// quote-desk: priced project quotations, their PDF, and the intake service

pub mod client;
pub mod contact;
pub mod document;
pub mod error;
pub mod form;
pub mod logging;
pub mod mailer;
pub mod pricing;
pub mod product;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod token;

pub use client::{submit_quotation, Submission, SubmissionClient, SubmissionStatus, SubmitGuard};
pub use contact::{ContactField, ContactForm, ContactValidator, ErrorMap};
pub use document::{render_quotation, Branding, QuotationInput, SummaryVisual};
pub use error::AppError;
pub use form::FormState;
pub use pricing::{category_total, grand_total, Category, OptionItem, SummaryTable};
pub use product::ProductLine;
pub use server::{build_router, AppState, ServerConfig};
pub use store::{QuotationRecord, QuotationStore};
