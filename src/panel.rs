//! Read-only detail view of any record, laid out from a model's detail
//! attribute descriptors instead of per-type markup.

use std::fmt;

use num_format::{Locale, ToFormattedString};
use serde_json::Value;

use crate::config::{AttributeSource, DetailAttribute, ValueFormat};
use crate::store::Record;

pub const NOT_PROVIDED: &str = "Not provided";
pub const SCHEMA_BADGE: &str = "Schema";

#[derive(Clone, Debug, PartialEq)]
pub struct PanelRow {
    pub label: String,
    pub badge: Option<&'static str>,
    pub value: String,
    pub description: Option<String>,
    /// False only for the last row.
    pub separator: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelView {
    pub title: String,
    pub rows: Vec<PanelRow>,
}

impl PanelView {
    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.value.as_str())
    }
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for row in &self.rows {
            write!(f, "{}", row.label)?;
            if let Some(badge) = row.badge {
                write!(f, " [{}]", badge)?;
            }
            writeln!(f, ": {}", row.value)?;
            if let Some(description) = &row.description {
                writeln!(f, "  {}", description)?;
            }
            if row.separator {
                writeln!(f, "---")?;
            }
        }
        Ok(())
    }
}

/// Builds the panel for `data`. Returns None when there are no
/// attributes to show. A missing record renders every value as
/// [`NOT_PROVIDED`].
pub fn render_panel(
    title: &str,
    attributes: Option<&[DetailAttribute]>,
    data: Option<&Record>,
) -> Option<PanelView> {
    let attributes = attributes.filter(|attrs| !attrs.is_empty())?;
    let last = attributes.len() - 1;
    let rows = attributes
        .iter()
        .enumerate()
        .map(|(i, attribute)| PanelRow {
            label: attribute.label.clone(),
            badge: attribute.badge.unwrap_or(false).then_some(SCHEMA_BADGE),
            value: format_value(resolve_value(attribute, data), attribute.format),
            description: attribute.description.clone(),
            separator: i != last,
        })
        .collect();

    Some(PanelView {
        title: title.to_string(),
        rows,
    })
}

/// Custom attributes are read from `customAttributes` first and the
/// record's own field second; base attributes the other way round.
pub fn resolve_value<'a>(attribute: &DetailAttribute, data: Option<&'a Record>) -> Option<&'a Value> {
    let record = data?;
    let key = attribute.key.as_str();
    let present = |value: Option<&'a Value>| value.filter(|v| !v.is_null());
    match attribute.source {
        AttributeSource::Custom => {
            present(record.custom_attribute(key)).or_else(|| present(record.get(key)))
        }
        AttributeSource::Base => {
            present(record.get(key)).or_else(|| present(record.custom_attribute(key)))
        }
    }
}

pub fn format_value(value: Option<&Value>, format: Option<ValueFormat>) -> String {
    match value {
        None | Some(Value::Null) => NOT_PROVIDED.to_string(),
        Some(Value::String(s)) if s.is_empty() => NOT_PROVIDED.to_string(),
        Some(Value::Array(items)) if items.is_empty() => NOT_PROVIDED.to_string(),
        Some(Value::Array(items)) => items.iter().map(plain).collect::<Vec<_>>().join(", "),
        Some(Value::Number(n)) => match format {
            Some(ValueFormat::Currency) => n.as_f64().map(format_currency).unwrap_or_else(|| n.to_string()),
            Some(ValueFormat::Number) => format_number(n),
            _ => n.to_string(),
        },
        Some(other) => plain(other),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// US dollars with two decimals, e.g. `-$1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let Some((whole, cents)) = split_decimal(amount, 2) else {
        return amount.to_string();
    };
    let sign = if amount < 0.0 && (whole > 0 || cents > 0) { "-" } else { "" };
    format!("{}${}.{:02}", sign, whole.to_formatted_string(&Locale::en), cents)
}

/// Digit-grouped number with at most three decimals, e.g. `12,345.678`.
pub fn format_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_formatted_string(&Locale::en);
    }
    if let Some(u) = n.as_u64() {
        return u.to_formatted_string(&Locale::en);
    }
    let Some(x) = n.as_f64() else {
        return n.to_string();
    };
    let Some((whole, thousandths)) = split_decimal(x, 3) else {
        return n.to_string();
    };
    let sign = if x < 0.0 && (whole > 0 || thousandths > 0) { "-" } else { "" };
    let whole = whole.to_formatted_string(&Locale::en);
    let fraction = format!("{:03}", thousandths);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{}{}", sign, whole)
    } else {
        format!("{}{}.{}", sign, whole, fraction)
    }
}

/// Splits `|x|` into its integer part and its fraction rounded to
/// `decimals` digits. None when `x` is not finite or its integer part does
/// not fit in a u128.
fn split_decimal(x: f64, decimals: u32) -> Option<(u128, u32)> {
    let abs = x.abs();
    if !abs.is_finite() || abs >= 2f64.powi(128) {
        return None;
    }
    let scale = 10u32.pow(decimals);
    let whole = abs.trunc();
    let fraction = ((abs - whole) * f64::from(scale)).round() as u32;
    let whole = whole as u128;
    if fraction >= scale {
        Some((whole.checked_add(1)?, 0))
    } else {
        Some((whole, fraction))
    }
}
