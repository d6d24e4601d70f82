// quote-desk: single-page quotation PDF with branded banner and footer

use crate::error::AppError;
use crate::pricing::{format_amount, SummaryTable};
use ::image::{imageops::FilterType, DynamicImage, Rgba, RgbImage};
use chrono::NaiveDate;
use printpdf::*;
use std::io::Read;

// ============================================================================
// Constants
// ============================================================================

// All layout values are in points, measured from the top-left corner of the
// page, and converted to printpdf's bottom-left millimetres when drawn.

/// A4 dimensions in points
pub const PAGE_WIDTH_PT: f32 = 595.28;
pub const PAGE_HEIGHT_PT: f32 = 841.89;

const BANNER_HEIGHT_PT: f32 = 70.0;
const LOGO_X_PT: f32 = 40.0;
const LOGO_Y_PT: f32 = 10.0;
const LOGO_SIZE_PT: f32 = 40.0;
const BRAND_X_PT: f32 = 90.0;
const BANNER_TEXT_BASELINE_PT: f32 = 35.0;
const DATE_INSET_PT: f32 = 120.0;

const TITLE: &str = "REQUIREMENTS SUMMARY";
const TITLE_BASELINE_PT: f32 = 110.0;

/// Left/right margin around the summary image
pub const IMAGE_MARGIN_PT: f32 = 30.0;
pub const IMAGE_TOP_PT: f32 = 130.0;

const FOOTER_GAP_PT: f32 = 20.0;
pub const FOOTER_HEIGHT_PT: f32 = 60.0;
/// Lowest the footer may start, measured up from the page bottom
pub const FOOTER_CLEARANCE_PT: f32 = 70.0;
const FOOTER_LINE_1_PT: f32 = 25.0;
const FOOTER_LINE_2_PT: f32 = 42.0;

/// Font sizes in points
const TITLE_FONT_SIZE: f32 = 16.0;
const BRAND_FONT_SIZE: f32 = 16.0;
const SMALL_FONT_SIZE: f32 = 10.0;
const TABLE_FONT_SIZE: f32 = 9.0;

/// Rough Helvetica advance per character, as a fraction of the font size
const AVG_GLYPH_EM: f32 = 0.5;

/// Vector fallback table
const TABLE_ROW_HEIGHT_PT: f32 = 22.0;
const CATEGORY_COL_RATIO: f32 = 0.30;
const SELECTED_COL_RATIO: f32 = 0.50;

/// Widest snapshot embedded as-is; wider captures are downscaled
const MAX_EMBED_WIDTH_PX: u32 = 1800;

const BRAND_BLUE: (f32, f32, f32) = (59.0 / 255.0, 130.0 / 255.0, 246.0 / 255.0);

// ============================================================================
// Data Structures
// ============================================================================

/// Business identity printed on every quotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub business_name: String,
    pub banner_title: String,
    pub address_line: String,
    pub contact_line: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            business_name: "Aspire TekHub".to_string(),
            banner_title: "ASPIRE TEKHUB SOLUTIONS".to_string(),
            address_line: "Corporate Office: 1-8-303, 3rd Floor, VK Towers, SP Road, RasoolPura, Secunderabad - 500003".to_string(),
            contact_line: "040 4519 5642 | info@aspireths.com | www.aspireths.com".to_string(),
        }
    }
}

/// How the summary table appears on the page.
#[derive(Debug, Clone)]
pub enum SummaryVisual {
    /// A captured raster of the rendered table
    Snapshot(DynamicImage),
    /// Rows drawn directly as text
    Table,
}

pub struct QuotationInput<'a> {
    pub summary: &'a SummaryTable,
    pub visual: &'a SummaryVisual,
    pub logo: Option<&'a DynamicImage>,
    pub date: NaiveDate,
    pub branding: &'a Branding,
}

/// Vertical placement of the summary and footer, in points from the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub image_width: f32,
    pub image_height: f32,
    pub footer_top: f32,
}

impl PageLayout {
    /// Scales content of the given aspect to the page width minus margins.
    pub fn for_pixels(width_px: u32, height_px: u32) -> Self {
        let image_width = PAGE_WIDTH_PT - 2.0 * IMAGE_MARGIN_PT;
        let image_height = if width_px == 0 {
            0.0
        } else {
            height_px as f32 * image_width / width_px as f32
        };
        Self::for_height(image_height)
    }

    pub fn for_height(image_height: f32) -> Self {
        let image_width = PAGE_WIDTH_PT - 2.0 * IMAGE_MARGIN_PT;
        let footer_top = (PAGE_HEIGHT_PT - FOOTER_CLEARANCE_PT)
            .min(IMAGE_TOP_PT + image_height + FOOTER_GAP_PT);
        Self {
            image_width,
            image_height,
            footer_top,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Builds the quotation and returns the PDF bytes.
pub fn render_quotation(input: &QuotationInput<'_>) -> Result<Vec<u8>, AppError> {
    let (doc, page1, layer1) = PdfDocument::new(
        "Requirements Summary",
        Mm::from(Pt(PAGE_WIDTH_PT)),
        Mm::from(Pt(PAGE_HEIGHT_PT)),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);

    let font_regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::PdfError(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::PdfError(e.to_string()))?;

    draw_banner(&layer, &font_bold, input);

    set_fill(&layer, (0.0, 0.0, 0.0));
    layer.use_text(
        TITLE,
        TITLE_FONT_SIZE,
        x_mm(centered_x(TITLE, TITLE_FONT_SIZE)),
        y_mm(TITLE_BASELINE_PT),
        &font_bold,
    );

    let layout = match input.visual {
        SummaryVisual::Snapshot(image) => {
            let layout = PageLayout::for_pixels(image.width(), image.height());
            embed_image(
                &layer,
                image,
                IMAGE_MARGIN_PT,
                IMAGE_TOP_PT,
                layout.image_width,
                layout.image_height,
            );
            layout
        }
        SummaryVisual::Table => {
            let rows = input.summary.rows.len() as f32 + 2.0;
            let layout = PageLayout::for_height(rows * TABLE_ROW_HEIGHT_PT);
            draw_summary_table(&layer, &font_regular, &font_bold, input.summary, &layout);
            layout
        }
    };

    draw_footer(&layer, &font_bold, input.branding, layout.footer_top);

    doc.save_to_bytes()
        .map_err(|e| AppError::PdfError(e.to_string()))
}

fn draw_banner(
    layer: &PdfLayerReference,
    font_bold: &IndirectFontRef,
    input: &QuotationInput<'_>,
) {
    set_fill(layer, BRAND_BLUE);
    fill_band(layer, 0.0, BANNER_HEIGHT_PT);

    if let Some(logo) = input.logo {
        embed_image(layer, logo, LOGO_X_PT, LOGO_Y_PT, LOGO_SIZE_PT, LOGO_SIZE_PT);
    }

    set_fill(layer, (1.0, 1.0, 1.0));
    layer.use_text(
        &input.branding.banner_title,
        BRAND_FONT_SIZE,
        x_mm(BRAND_X_PT),
        y_mm(BANNER_TEXT_BASELINE_PT),
        font_bold,
    );
    layer.use_text(
        &format!("Date: {}", format_date_display(&input.date)),
        SMALL_FONT_SIZE,
        x_mm(PAGE_WIDTH_PT - DATE_INSET_PT),
        y_mm(BANNER_TEXT_BASELINE_PT),
        font_bold,
    );
}

fn draw_footer(
    layer: &PdfLayerReference,
    font_bold: &IndirectFontRef,
    branding: &Branding,
    footer_top: f32,
) {
    set_fill(layer, BRAND_BLUE);
    fill_band(layer, footer_top, FOOTER_HEIGHT_PT);

    set_fill(layer, (1.0, 1.0, 1.0));
    for (text, offset) in [
        (&branding.address_line, FOOTER_LINE_1_PT),
        (&branding.contact_line, FOOTER_LINE_2_PT),
    ] {
        layer.use_text(
            text.as_str(),
            SMALL_FONT_SIZE,
            x_mm(centered_x(text, SMALL_FONT_SIZE)),
            y_mm(footer_top + offset),
            font_bold,
        );
    }
    set_fill(layer, (0.0, 0.0, 0.0));
}

fn draw_summary_table(
    layer: &PdfLayerReference,
    font_regular: &IndirectFontRef,
    font_bold: &IndirectFontRef,
    summary: &SummaryTable,
    layout: &PageLayout,
) {
    let x_start = IMAGE_MARGIN_PT;
    let width = layout.image_width;
    let selected_x = x_start + width * CATEGORY_COL_RATIO;
    let total_x = selected_x + width * SELECTED_COL_RATIO;
    let selected_chars = max_chars(width * SELECTED_COL_RATIO - 8.0, TABLE_FONT_SIZE);

    let mut y = IMAGE_TOP_PT;
    set_fill(layer, (0.0, 0.0, 0.0));

    draw_table_row(
        layer,
        font_bold,
        y,
        [
            (x_start, "Requirement Questions".to_string()),
            (selected_x, "Selected Specifications".to_string()),
            (total_x, "Total Price".to_string()),
        ],
        (0.0, 0.0, 0.0),
    );
    y += TABLE_ROW_HEIGHT_PT;

    for row in &summary.rows {
        draw_table_row(
            layer,
            font_regular,
            y,
            [
                (x_start, row.category.clone()),
                (selected_x, fit_text(&row.selected, selected_chars)),
                (total_x, format_amount(row.total)),
            ],
            (0.8, 0.8, 0.8),
        );
        y += TABLE_ROW_HEIGHT_PT;
    }

    draw_table_row(
        layer,
        font_bold,
        y,
        [
            (x_start, "Grand Total:".to_string()),
            (selected_x, String::new()),
            (total_x, format!("Rs. {}", format_amount(summary.grand_total))),
        ],
        (0.0, 0.0, 0.0),
    );
}

fn draw_table_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    top: f32,
    cells: [(f32, String); 3],
    rule: (f32, f32, f32),
) {
    let baseline = top + TABLE_ROW_HEIGHT_PT / 2.0 + TABLE_FONT_SIZE / 3.0;
    for (x, text) in &cells {
        if !text.is_empty() {
            layer.use_text(text.as_str(), TABLE_FONT_SIZE, x_mm(x + 4.0), y_mm(baseline), font);
        }
    }

    layer.set_outline_color(Color::Rgb(Rgb::new(rule.0, rule.1, rule.2, None)));
    layer.set_outline_thickness(0.3);
    let bottom = top + TABLE_ROW_HEIGHT_PT;
    draw_line(
        layer,
        IMAGE_MARGIN_PT,
        bottom,
        PAGE_WIDTH_PT - IMAGE_MARGIN_PT,
        bottom,
    );
}

// ============================================================================
// Images
// ============================================================================

/// Places an image with its top-left corner at (`x`, `top`), sized to
/// `width` × `height` points. Transparency is composited on white.
fn embed_image(
    layer: &PdfLayerReference,
    source: &DynamicImage,
    x: f32,
    top: f32,
    width: f32,
    height: f32,
) {
    let source = if source.width() > MAX_EMBED_WIDTH_PX {
        source.resize(MAX_EMBED_WIDTH_PX, u32::MAX, FilterType::Triangle)
    } else {
        source.clone()
    };

    let rgb_image = flatten_on_white(&source);
    let (width_px, height_px) = rgb_image.dimensions();
    if width_px == 0 || height_px == 0 || width <= 0.0 {
        return;
    }

    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI that maps the pixel width onto the requested physical width
    let dpi = width_px as f32 * 72.0 / width;
    let natural_height = height_px as f32 * 72.0 / dpi;
    let scale_y = if natural_height > 0.0 { height / natural_height } else { 1.0 };

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(x_mm(x)),
            translate_y: Some(y_mm(top + height)),
            dpi: Some(dpi),
            scale_y: Some(scale_y),
            ..Default::default()
        },
    );
}

fn flatten_on_white(source: &DynamicImage) -> RgbImage {
    let rgba_image = source.to_rgba8();
    let (width_px, height_px) = rgba_image.dimensions();

    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let bg = 255.0;
        let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, ::image::Rgb([out_r, out_g, out_b]));
    }
    rgb_image
}

/// Loads a logo from a file path or an http(s) URL.
pub fn load_logo(path: &Option<String>) -> Result<Option<DynamicImage>, AppError> {
    match path {
        Some(p) => {
            let image_bytes = if p.starts_with("http://") || p.starts_with("https://") {
                let response = ureq::get(p)
                    .call()
                    .map_err(|e| AppError::LogoError(format!("Failed to fetch URL: {}", e)))?;

                let mut bytes = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| AppError::LogoError(format!("Failed to read response: {}", e)))?;
                bytes
            } else {
                std::fs::read(p).map_err(|e| AppError::LogoError(format!("{}: {}", p, e)))?
            };

            let img = ::image::load_from_memory(&image_bytes)
                .map_err(|e| AppError::LogoError(format!("Failed to decode image: {}", e)))?;

            Ok(Some(img))
        }
        None => Ok(None),
    }
}

// ============================================================================
// Drawing Utilities
// ============================================================================

pub fn format_date_display(date: &NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn x_mm(x_pt: f32) -> Mm {
    Mm::from(Pt(x_pt))
}

/// Converts a distance from the page top into printpdf's bottom-up axis.
fn y_mm(top_pt: f32) -> Mm {
    Mm::from(Pt(PAGE_HEIGHT_PT - top_pt))
}

fn centered_x(text: &str, font_size: f32) -> f32 {
    let width = text.chars().count() as f32 * font_size * AVG_GLYPH_EM;
    ((PAGE_WIDTH_PT - width) / 2.0).max(0.0)
}

fn max_chars(width_pt: f32, font_size: f32) -> usize {
    (width_pt / (font_size * AVG_GLYPH_EM)).max(4.0) as usize
}

fn fit_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

fn set_fill(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

/// Fills a full-width band starting `top` points below the page top.
fn fill_band(layer: &PdfLayerReference, top: f32, height: f32) {
    let rect = Rect::new(
        x_mm(0.0),
        y_mm(top + height),
        x_mm(PAGE_WIDTH_PT),
        y_mm(top),
    );
    layer.add_rect(rect);
}

fn draw_line(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32) {
    let points = vec![
        (Point::new(x_mm(x1), y_mm(y1)), false),
        (Point::new(x_mm(x2), y_mm(y2)), false),
    ];
    let line = Line {
        points,
        is_closed: false,
    };
    layer.add_line(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{Category, OptionItem};

    fn summary() -> SummaryTable {
        SummaryTable::from_categories(&[
            Category::new(1, "Platform", vec![OptionItem::new("Web", 500.0)]),
            Category::new(2, "Size", vec![]),
        ])
    }

    #[test]
    fn image_is_scaled_to_page_width() {
        let layout = PageLayout::for_pixels(1000, 500);
        let expected_width = PAGE_WIDTH_PT - 2.0 * IMAGE_MARGIN_PT;
        assert!((layout.image_width - expected_width).abs() < 1e-3);
        assert!((layout.image_height - expected_width / 2.0).abs() < 1e-3);
        assert!((layout.footer_top - (IMAGE_TOP_PT + layout.image_height + 20.0)).abs() < 1e-3);
    }

    #[test]
    fn footer_is_clamped_to_page() {
        let layout = PageLayout::for_pixels(100, 1000);
        assert!((layout.footer_top - (PAGE_HEIGHT_PT - FOOTER_CLEARANCE_PT)).abs() < 1e-3);
        assert!(layout.footer_top + FOOTER_HEIGHT_PT <= PAGE_HEIGHT_PT);
    }

    #[test]
    fn zero_width_snapshot_has_no_height() {
        let layout = PageLayout::for_pixels(0, 100);
        assert_eq!(layout.image_height, 0.0);
    }

    #[test]
    fn renders_snapshot_document() {
        let snapshot = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            600,
            300,
            ::image::Rgb([240, 240, 240]),
        ));
        let logo = DynamicImage::ImageRgba8(::image::RgbaImage::from_pixel(
            32,
            32,
            Rgba([255, 0, 0, 128]),
        ));
        let summary = summary();
        let visual = SummaryVisual::Snapshot(snapshot);
        let branding = Branding::default();
        let bytes = render_quotation(&QuotationInput {
            summary: &summary,
            visual: &visual,
            logo: Some(&logo),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            branding: &branding,
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn renders_vector_table_document() {
        let summary = summary();
        let branding = Branding::default();
        let bytes = render_quotation(&QuotationInput {
            summary: &summary,
            visual: &SummaryVisual::Table,
            logo: None,
            date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            branding: &branding,
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_text_is_shortened() {
        assert_eq!(fit_text("Android, iOS, Web", 10), "Android...");
        assert_eq!(fit_text("Web", 10), "Web");
    }

    #[test]
    fn date_uses_day_first() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(format_date_display(&date), "02/01/2026");
    }
}
