// quote-desk: product lines a quotation can belong to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProductLine {
    Website,
    App,
}

impl ProductLine {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductLine::Website => "website",
            ProductLine::App => "app",
        }
    }

    /// Capitalised label used in mail subjects and responses.
    pub fn label(&self) -> &'static str {
        match self {
            ProductLine::Website => "Website",
            ProductLine::App => "App",
        }
    }

    /// Intake route that accepts submissions for this line.
    pub fn submit_path(&self) -> &'static str {
        match self {
            ProductLine::Website => "/send-email",
            ProductLine::App => "/send-app-email",
        }
    }

    /// Route that lists stored quotations for this line.
    pub fn list_path(&self) -> &'static str {
        match self {
            ProductLine::Website => "/api/quotations",
            ProductLine::App => "/api/app-quotations",
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "website" => Ok(ProductLine::Website),
            "app" => Ok(ProductLine::App),
            other => Err(format!("unknown product line: {}", other)),
        }
    }
}
