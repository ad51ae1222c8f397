//! One renderer per block variant. A renderer returns `None` when the block
//! has to be dropped (e.g. a link with a disallowed scheme).

use htmlescape::encode_minimal;
use serde_json::Value;

use super::render_sequence;
use super::style::format_number;
use super::style::style_attr;
use super::RenderReport;
use crate::domain::parse_pixels;
use crate::domain::Block;
use crate::domain::ButtonBlock;
use crate::domain::CodeBlock;
use crate::domain::ColumnsBlock;
use crate::domain::DividerBlock;
use crate::domain::ImageBlock;
use crate::domain::SocialBlock;
use crate::domain::SpacerBlock;
use crate::domain::TextBlock;

pub const DEFAULT_SPACER_HEIGHT_PX: f64 = 20.0;

pub(super) fn render_block(
    block: &Block,
    report: &mut RenderReport,
) -> Option<String> {
    match block {
        Block::Heading(b) => Some(heading(b)),
        Block::Text(b) => Some(text(b)),
        Block::Image(b) => image(b),
        Block::Button(b) => button(b),
        Block::Divider(b) => Some(divider(b)),
        Block::Spacer(b) => Some(spacer(b)),
        Block::Social(b) => social(b),
        Block::Code(b) => Some(code(b)),
        Block::Columns(b) => columns(b, report),
    }
}

/// Only `http:` and `https:` links survive, compared case-insensitively.
pub fn is_allowed_url(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    url.starts_with("http:") || url.starts_with("https:")
}

fn allowed_url(url: Option<&str>) -> Option<&str> {
    url.map(str::trim).filter(|u| is_allowed_url(u))
}

fn heading(b: &TextBlock) -> String {
    format!(
        "<h2{}>{}</h2>",
        style_attr(
            "margin: 0 0 16px; font-size: 24px; line-height: 1.3; color: #111827",
            &b.style
        ),
        encode_minimal(&b.content)
    )
}

fn text(b: &TextBlock) -> String {
    format!(
        "<p{}>{}</p>",
        style_attr("margin: 0 0 16px; font-size: 16px; line-height: 1.6", &b.style),
        encode_minimal(&b.content)
    )
}

fn image(b: &ImageBlock) -> Option<String> {
    let Some(src) = allowed_url(b.src.as_deref()) else {
        tracing::warn!(src = ?b.src, "dropping image block without an http(s) src");
        return None;
    };
    Some(format!(
        r#"<div style="margin: 0 0 16px;"><img src="{}" alt="{}"{} /></div>"#,
        encode_minimal(src),
        encode_minimal(b.alt.as_deref().unwrap_or_default()),
        style_attr(
            "display: block; max-width: 100%; height: auto; border: 0",
            &b.style
        ),
    ))
}

fn button(b: &ButtonBlock) -> Option<String> {
    let Some(url) = allowed_url(b.url.as_deref()) else {
        tracing::warn!(url = ?b.url, "dropping button block without an http(s) url");
        return None;
    };
    let label = match b.content.trim().is_empty() {
        true => url,
        false => b.content.as_str(),
    };
    Some(format!(
        r#"<div style="margin: 16px 0; text-align: center;"><a href="{}" target="_blank" rel="noopener"{}>{}</a></div>"#,
        encode_minimal(url),
        style_attr(
            "display: inline-block; padding: 12px 24px; background-color: #2563eb; \
             color: #ffffff; text-decoration: none; border-radius: 6px; font-weight: 600",
            &b.style
        ),
        encode_minimal(label),
    ))
}

fn divider(b: &DividerBlock) -> String {
    format!(
        "<hr{} />",
        style_attr(
            "border: none; border-top: 1px solid #e5e7eb; margin: 24px 0",
            &b.style
        )
    )
}

fn spacer(b: &SpacerBlock) -> String {
    let height = b
        .height
        .as_ref()
        .and_then(parse_pixels)
        .unwrap_or(DEFAULT_SPACER_HEIGHT_PX);
    let height = format_number(height);
    format!(
        "<div{}>&nbsp;</div>",
        style_attr(
            &format!("height: {height}px; line-height: {height}px; font-size: 1px"),
            &b.style
        )
    )
}

/// Short badge text for the platforms we know about
fn social_label(platform: &str) -> String {
    let known = match platform.to_ascii_lowercase().as_str() {
        "facebook" => "f",
        "twitter" | "x" => "X",
        "instagram" => "IG",
        "linkedin" => "in",
        "youtube" => "YT",
        "tiktok" => "TT",
        "github" => "GH",
        _ => "",
    };
    match known.is_empty() {
        false => known.to_string(),
        true => platform
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default(),
    }
}

fn social(b: &SocialBlock) -> Option<String> {
    let anchors: Vec<String> = b
        .links
        .iter()
        .filter_map(|(platform, url)| {
            let url = match allowed_url(url.as_str()) {
                Some(url) => url,
                None => {
                    if !matches!(url, Value::Null) && url.as_str() != Some("") {
                        tracing::warn!(%platform, %url, "dropping social link without an http(s) url");
                    }
                    return None;
                }
            };
            Some(format!(
                r#"<a href="{}" title="{}" target="_blank" rel="noopener" style="display: inline-block; width: 32px; height: 32px; line-height: 32px; margin: 0 4px; border-radius: 50%; background-color: #374151; color: #ffffff; text-decoration: none; font-size: 13px; font-weight: 700; text-align: center;">{}</a>"#,
                encode_minimal(url),
                encode_minimal(platform),
                encode_minimal(&social_label(platform)),
            ))
        })
        .collect();

    if anchors.is_empty() {
        tracing::warn!("dropping social block without any usable links");
        return None;
    }

    Some(format!(
        "<div{}>{}</div>",
        style_attr("margin: 16px 0; text-align: center", &b.style),
        anchors.join("")
    ))
}

// the account owner is trusted with raw HTML; this is not escaped on purpose
fn code(b: &CodeBlock) -> String {
    format!("<div{}>{}</div>", style_attr("", &b.style), b.content)
}

fn columns(
    b: &ColumnsBlock,
    report: &mut RenderReport,
) -> Option<String> {
    if b.columns.is_empty() {
        tracing::warn!("dropping columns block without columns");
        return None;
    }

    let width = format_number(100.0 / b.columns.len() as f64);
    let padding = b
        .style
        .get("gap")
        .and_then(parse_pixels)
        .filter(|gap| *gap > 0.0)
        .map(|gap| {
            let half = format_number(gap / 2.0);
            format!("; padding-left: {half}px; padding-right: {half}px")
        })
        .unwrap_or_default();

    let cells: String = b
        .columns
        .iter()
        .map(|column| {
            format!(
                r#"<td width="{width}%" valign="top" style="width: {width}%; vertical-align: top{padding};">{}</td>"#,
                render_sequence(column, report)
            )
        })
        .collect();

    Some(format!(
        r#"<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0"{}><tr>{cells}</tr></table>"#,
        style_attr(
            "width: 100%; border-collapse: collapse; margin: 0 0 16px",
            &b.style.without("gap")
        ),
    ))
}
