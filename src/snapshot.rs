// quote-desk: raster capture of the summary table through a headless browser

use crate::error::AppError;
use crate::pricing::{format_amount, SummaryTable};
use ::image::DynamicImage;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Capture scale relative to CSS pixels
pub const CAPTURE_SCALE: f64 = 3.0;
const VIEWPORT_WIDTH: u32 = 900;
const VIEWPORT_HEIGHT: u32 = 1200;
const TABLE_SELECTOR: &str = ".requirements-table";

#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    /// Browser binary; detected from the environment when unset
    pub chrome_executable: Option<PathBuf>,
}

/// Renders the summary as a standalone HTML page.
pub fn summary_html(table: &SummaryTable) -> String {
    let mut rows = String::new();
    for row in &table.rows {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&row.category),
            escape_html(&row.selected),
            format_amount(row.total),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  body {{ margin: 0; font-family: Helvetica, Arial, sans-serif; background: #fff; }}
  .requirements-table {{ display: inline-block; padding: 8px; }}
  table {{ border-collapse: collapse; width: 860px; font-size: 14px; }}
  th, td {{ border: 1px solid #d0d7e2; padding: 8px 10px; text-align: left; }}
  th {{ background: #3b82f6; color: #fff; }}
  .grand-total-row {{ font-weight: bold; background-color: #f0f0f0; }}
</style>
</head>
<body>
<div class="requirements-table">
<table>
<thead><tr><th>Requirement Questions</th><th>Selected Specifications</th><th>Total Price</th></tr></thead>
<tbody>
{rows}<tr class="grand-total-row"><td style="text-align: right">Grand Total:</td><td></td><td>&#8377;{total}</td></tr>
</tbody>
</table>
</div>
</body>
</html>
"#,
        rows = rows,
        total = format_amount(table.grand_total),
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Launches a headless browser, renders the summary and captures the table
/// element at [`CAPTURE_SCALE`].
pub async fn capture_summary(
    table: &SummaryTable,
    options: &SnapshotOptions,
) -> Result<DynamicImage, AppError> {
    info!("capturing summary snapshot");

    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .viewport(Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(CAPTURE_SCALE),
            ..Default::default()
        })
        .args(vec!["--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"]);
    if let Some(path) = &options.chrome_executable {
        builder = builder.chrome_executable(path);
    }
    let config = builder.build().map_err(AppError::SnapshotError)?;

    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| AppError::SnapshotError(format!("browser launch failed: {}", e)))?;
    let events = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    let captured = capture_with(&browser, table).await;

    if let Err(e) = browser.close().await {
        debug!("browser close failed: {}", e);
    }
    events.abort();

    let png = captured?;
    ::image::load_from_memory(&png)
        .map_err(|e| AppError::SnapshotError(format!("Failed to decode capture: {}", e)))
}

async fn capture_with(browser: &Browser, table: &SummaryTable) -> Result<Vec<u8>, AppError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| AppError::SnapshotError(format!("page creation failed: {}", e)))?;
    page.set_content(summary_html(table))
        .await
        .map_err(|e| AppError::SnapshotError(format!("set content failed: {}", e)))?;
    let element = page
        .find_element(TABLE_SELECTOR)
        .await
        .map_err(|e| AppError::SnapshotError(format!("summary table not found: {}", e)))?;
    let png = element
        .screenshot(CaptureScreenshotFormat::Png)
        .await
        .map_err(|e| AppError::SnapshotError(format!("screenshot failed: {}", e)))?;
    debug!("captured {} bytes", png.len());
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{Category, OptionItem};

    #[test]
    fn html_lists_every_row_and_the_total() {
        let table = SummaryTable::from_categories(&[
            Category::new(1, "Platform", vec![OptionItem::new("Web", 500.0)]),
            Category::new(2, "Size", vec![]),
        ]);
        let html = summary_html(&table);
        assert!(html.contains("<td>Platform</td><td>Web</td><td>500</td>"));
        assert!(html.contains("<td>Size</td><td>None selected</td><td>0</td>"));
        assert!(html.contains("&#8377;500"));
    }

    #[test]
    fn html_escapes_option_names() {
        let table = SummaryTable::from_categories(&[Category::new(
            10,
            "External API",
            vec![OptionItem::new("<script>", 10.0)],
        )]);
        let html = summary_html(&table);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
