//! The newsletter document model: an ordered sequence of type-tagged blocks,
//! where `columns` blocks own nested sequences.
//!
//! Parsing never fails as a whole. Entries without a recognised `type` are
//! dropped, and entries with a recognised `type` but an unusable payload are
//! kept as [`Node::Invalid`] so the compiler can show an inline placeholder
//! in their place.

use serde::Deserialize;
use serde::Deserializer;
use serde_json::Map;
use serde_json::Value;

/// `type` tags accepted by [`is_valid_block`]. `paragraph` is an alias of
/// `text`.
pub const BLOCK_TYPES: [&str; 10] = [
    "heading",
    "text",
    "paragraph",
    "image",
    "button",
    "divider",
    "spacer",
    "social",
    "code",
    "columns",
];

/// Maximum number of nested `columns` levels. A `columns` block that would
/// open a deeper level is replaced with a placeholder.
pub const MAX_NESTING_DEPTH: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Malformed {kind} block: {reason}")]
    Malformed { kind: String, reason: String },
    #[error("Columns nested deeper than {max} levels")]
    TooDeep { max: usize },
    #[error("Content is not a list of blocks")]
    NotASequence,
}

/// Accepts only objects whose `type` is one of [`BLOCK_TYPES`].
pub fn is_valid_block(value: &Value) -> bool {
    value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| BLOCK_TYPES.contains(&kind))
}

/// A parsed block sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Sequence {
    Blocks(Vec<Node>),
    /// The input was not an ordered sequence at all
    NotASequence,
}

/// One surviving entry of a block sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Block),
    Invalid(BlockError),
}

impl Sequence {
    /// Parse a top-level block sequence.
    pub fn parse(value: &Value) -> Self { parse_sequence(value, 0) }

    pub fn is_empty(&self) -> bool {
        match self {
            Sequence::Blocks(nodes) => nodes.is_empty(),
            Sequence::NotASequence => false,
        }
    }
}

fn parse_sequence(
    value: &Value,
    depth: usize,
) -> Sequence {
    let Some(entries) = value.as_array() else {
        return Sequence::NotASequence;
    };

    let nodes = entries
        .iter()
        .filter_map(|entry| {
            if !is_valid_block(entry) {
                tracing::warn!(block = %entry, "dropping block with unrecognised type");
                return None;
            }
            Some(parse_node(entry, depth))
        })
        .collect();

    Sequence::Blocks(nodes)
}

fn parse_node(
    value: &Value,
    depth: usize,
) -> Node {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let raw = match RawBlock::deserialize(value) {
        Ok(raw) => raw,
        Err(e) => {
            return Node::Invalid(BlockError::Malformed {
                kind,
                reason: e.to_string(),
            })
        }
    };

    let block = match raw {
        RawBlock::Heading(b) => Block::Heading(b),
        RawBlock::Text(b) => Block::Text(b),
        RawBlock::Image(b) => Block::Image(b),
        RawBlock::Button(b) => Block::Button(b),
        RawBlock::Divider(b) => Block::Divider(b),
        RawBlock::Spacer(b) => Block::Spacer(b),
        RawBlock::Social(b) => Block::Social(b),
        RawBlock::Code(b) => Block::Code(b),
        RawBlock::Columns(raw) => {
            if depth >= MAX_NESTING_DEPTH {
                return Node::Invalid(BlockError::TooDeep {
                    max: MAX_NESTING_DEPTH,
                });
            }
            Block::Columns(ColumnsBlock {
                columns: raw
                    .columns
                    .iter()
                    .map(|column| parse_sequence(column, depth + 1))
                    .collect(),
                style: raw.style,
            })
        }
    };

    Node::Block(block)
}

/// A closed set of block variants; each has exactly one renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(TextBlock),
    Text(TextBlock),
    Image(ImageBlock),
    Button(ButtonBlock),
    Divider(DividerBlock),
    Spacer(SpacerBlock),
    Social(SocialBlock),
    Code(CodeBlock),
    Columns(ColumnsBlock),
}

/// Wire shape of a block. Columns are kept as raw values here, since their
/// children are parsed entry by entry (see `parse_sequence`).
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawBlock {
    Heading(TextBlock),
    #[serde(alias = "paragraph")]
    Text(TextBlock),
    Image(ImageBlock),
    Button(ButtonBlock),
    Divider(DividerBlock),
    Spacer(SpacerBlock),
    Social(SocialBlock),
    Code(CodeBlock),
    Columns(RawColumns),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextBlock {
    #[serde(default, alias = "text", deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ButtonBlock {
    #[serde(default)]
    pub url: Option<String>,
    /// Button label
    #[serde(default, alias = "text", deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DividerBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpacerBlock {
    /// Pixels, either a number or a `"24px"` style string
    #[serde(default)]
    pub height: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SocialBlock {
    /// Ordered `platform -> url` mapping
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Style,
}

/// Raw HTML supplied by the account owner. It is emitted as-is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnsBlock {
    pub columns: Vec<Sequence>,
    pub style: Style,
}

#[derive(Deserialize)]
struct RawColumns {
    #[serde(default, deserialize_with = "null_as_default")]
    columns: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    style: Style,
}

/// Ordered mapping of camelCase CSS property names to values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Style(Map<String, Value>);

impl Style {
    pub fn get(
        &self,
        property: &str,
    ) -> Option<&Value> {
        self.0.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> { self.0.iter() }

    /// Copy of this style with `property` removed, keeping the order of the
    /// remaining entries.
    pub fn without(
        &self,
        property: &str,
    ) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| k.as_str() != property)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl From<Map<String, Value>> for Style {
    fn from(map: Map<String, Value>) -> Self { Self(map) }
}

/// Read a pixel length from either a number (`20`) or a string (`"20px"`,
/// `"20"`).
pub fn parse_pixels(value: &Value) -> Option<f64> {
    let px = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            s.strip_suffix("px").unwrap_or(s).trim().parse().ok()?
        }
        _ => return None,
    };
    (px.is_finite() && px >= 0.0).then_some(px)
}

// the editor sends `null` for fields that were cleared, which serde's
// `default` does not cover
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
