//! The document wrapper every email is embedded in.

use htmlescape::encode_minimal;

use super::SendMode;
use crate::domain::BlockError;

const FONT_STACK: &str =
    "-apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif";

/// Visible stand-in for a block that could not be rendered
pub fn error_placeholder(error: &BlockError) -> String {
    format!(
        r#"<div style="margin: 0 0 16px; padding: 12px; border: 1px dashed #dc2626; border-radius: 4px; color: #dc2626; font-size: 13px;">Error rendering block: {}</div>"#,
        encode_minimal(&error.to_string())
    )
}

fn footer(
    unsubscribe_url: &str,
    preferences_url: &str,
) -> String {
    format!(
        r#"<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="max-width: 600px;">
<tr><td align="center" style="padding: 24px 16px; color: #6b7280; font-size: 12px; line-height: 1.5;">
<p style="margin: 0;">You are receiving this email because you subscribed to our newsletter.</p>
<p style="margin: 8px 0 0;"><a href="{}" style="color: #6b7280; text-decoration: underline;">Unsubscribe</a> &middot; <a href="{}" style="color: #6b7280; text-decoration: underline;">Manage preferences</a></p>
</td></tr>
</table>"#,
        encode_minimal(unsubscribe_url),
        encode_minimal(preferences_url),
    )
}

/// Hidden preview text and the "this is a test" banner
fn test_header(preview_text: Option<&str>) -> String {
    let preview = preview_text
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            format!(
                r#"<span style="display: none; max-height: 0; overflow: hidden; mso-hide: all;">{}</span>"#,
                encode_minimal(p)
            )
        })
        .unwrap_or_default();
    format!(
        r#"{preview}
<div style="background-color: #fef3c7; color: #92400e; padding: 12px 16px; text-align: center; font-size: 14px; font-weight: 600;">Test email: this preview was not sent to your subscribers.</div>"#
    )
}

pub fn document(
    body: &str,
    mode: &SendMode,
    unsubscribe_url: &str,
    preferences_url: &str,
) -> String {
    let header = match mode {
        SendMode::Live => String::new(),
        SendMode::Test { preview_text } => test_header(preview_text.as_deref()),
    };
    let footer = footer(unsubscribe_url, preferences_url);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta http-equiv="X-UA-Compatible" content="IE=edge">
</head>
<body style="margin: 0; padding: 0; background-color: #f4f4f5; font-family: {FONT_STACK};">
{header}
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background-color: #f4f4f5;">
<tr><td align="center" style="padding: 24px 12px;">
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="max-width: 600px; background-color: #ffffff; border-radius: 8px;">
<tr><td style="padding: 32px; color: #111827; font-size: 16px; line-height: 1.6;">
{body}
</td></tr>
</table>
{footer}
</td></tr>
</table>
</body>
</html>"#
    )
}
