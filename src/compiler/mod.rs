//! Block tree -> email-safe HTML.
//!
//! Compilation never fails. Blocks that cannot be rendered are replaced
//! with an inline placeholder, blocks with disallowed links are dropped,
//! and everything else is rendered in order.

mod render;
mod style;
mod template;

use serde_json::Value;

use crate::domain::BlockError;
use crate::domain::Node;
use crate::domain::Sequence;

/// Selects the outer template. Per-block rendering is identical in both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMode {
    Live,
    Test { preview_text: Option<String> },
}

#[derive(Debug)]
pub struct CompiledEmail {
    pub html: String,
    /// Plain-text alternative of `html`
    pub text: String,
    /// Blocks replaced with an error placeholder
    pub errors: Vec<BlockError>,
}

#[derive(Debug, Default)]
pub(crate) struct RenderReport {
    errors: Vec<BlockError>,
}

/// Compiles newsletters against a public base URL, which the footer's
/// unsubscribe/preferences links are built from.
#[derive(Debug, Clone)]
pub struct Compiler {
    base_url: String,
}

impl Compiler {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn unsubscribe_url(&self) -> String { format!("{}/unsubscribe", self.base_url) }

    pub fn preferences_url(&self) -> String { format!("{}/preferences", self.base_url) }

    /// One-click unsubscribe headers (RFC 8058) attached to every live send
    pub fn unsubscribe_headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "List-Unsubscribe".to_string(),
                format!("<{}>", self.unsubscribe_url()),
            ),
            (
                "List-Unsubscribe-Post".to_string(),
                "List-Unsubscribe=One-Click".to_string(),
            ),
        ]
    }

    /// `content` is expected to be a JSON array of blocks; anything else
    /// compiles to a document holding a single error placeholder.
    pub fn compile(
        &self,
        content: &Value,
        mode: &SendMode,
    ) -> CompiledEmail {
        let sequence = Sequence::parse(content);
        let mut report = RenderReport::default();
        let body = render_sequence(&sequence, &mut report);
        let html = template::document(
            &body,
            mode,
            &self.unsubscribe_url(),
            &self.preferences_url(),
        );
        let text = plain_text(&html);

        if !report.errors.is_empty() {
            tracing::warn!(
                errors = report.errors.len(),
                "newsletter compiled with placeholder blocks"
            );
        }

        CompiledEmail {
            html,
            text,
            errors: report.errors,
        }
    }
}

/// Renders a (possibly nested) sequence. Columns call back into this for
/// each of their cells.
pub(crate) fn render_sequence(
    sequence: &Sequence,
    report: &mut RenderReport,
) -> String {
    let nodes = match sequence {
        Sequence::Blocks(nodes) => nodes,
        Sequence::NotASequence => {
            report.errors.push(BlockError::NotASequence);
            return template::error_placeholder(&BlockError::NotASequence);
        }
    };

    let mut html = String::new();
    for node in nodes {
        match node {
            Node::Block(block) => {
                if let Some(rendered) = render::render_block(block, report) {
                    html.push_str(&rendered);
                    html.push('\n');
                }
            }
            Node::Invalid(error) => {
                tracing::warn!(%error, "rendering placeholder for invalid block");
                html.push_str(&template::error_placeholder(error));
                html.push('\n');
                report.errors.push(error.clone());
            }
        }
    }
    html
}

fn plain_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not derive plain-text part");
        String::new()
    })
}
