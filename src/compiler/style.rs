use serde_json::Value;

use crate::domain::Style;

/// `backgroundColor` -> `background-color`
pub fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Resolve a block style into an inline CSS declaration list, in the order
/// the entries were given. Entries whose value is not a scalar are skipped.
pub fn to_css(style: &Style) -> String {
    style
        .iter()
        .filter_map(|(property, value)| {
            let value = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some(format!("{}: {value}", kebab_case(property)))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// ` style="..."` for an element, `base` first so that block styles win.
/// Empty when there is nothing to apply.
pub fn style_attr(
    base: &str,
    style: &Style,
) -> String {
    let css = match (base.is_empty(), to_css(style)) {
        (true, user) => user,
        (false, user) if user.is_empty() => base.to_string(),
        (false, user) => format!("{base}; {user}"),
    };
    match css.is_empty() {
        true => String::new(),
        false => format!(r#" style="{}""#, htmlescape::encode_minimal(&css)),
    }
}

/// Formats a length without float noise: `10`, `7.5`, `33.33`.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        return format!("{}", n as i64);
    }
    let s = format!("{n:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
