//! Canonical content keys
//!
//! A content key is a parenthesized prefix rendering of a filter, e.g.
//! `(and (>= sales 1000) (not (in country "PT" "IE")))`. Property names made
//! only of `[A-Za-z0-9_$.-]` are written bare; any other name is written as a
//! JSON string, and so are all string values. Two filters that are
//! structurally equal always render the same key.

use std::fmt;

use viz_data::Value;

use crate::filter::Filter;

/// Display adapter writing the content key of a filter
pub struct ContentKey<'a>(pub &'a Filter);

impl Filter {
    /// Canonical string form of this filter's structure
    pub fn content_key(&self) -> String {
        ContentKey(self).to_string()
    }
}

impl fmt::Display for ContentKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_filter(f, self.0)
    }
}

fn write_filter(f: &mut fmt::Formatter<'_>, filter: &Filter) -> fmt::Result {
    write!(f, "({}", filter.kind().key_symbol())?;
    match filter {
        Filter::True | Filter::False => {}
        Filter::And(_) | Filter::Or(_) | Filter::Not(_) => {
            for operand in filter.operands() {
                f.write_str(" ")?;
                write_filter(f, operand)?;
            }
        }
        Filter::IsEqual(c)
        | Filter::IsGreater(c)
        | Filter::IsGreaterOrEqual(c)
        | Filter::IsLess(c)
        | Filter::IsLessOrEqual(c) => {
            f.write_str(" ")?;
            write_property(f, c.property())?;
            f.write_str(" ")?;
            write_value(f, c.value())?;
        }
        Filter::IsIn(is_in) => {
            f.write_str(" ")?;
            write_property(f, is_in.property())?;
            for value in is_in.values() {
                f.write_str(" ")?;
                write_value(f, value)?;
            }
        }
        Filter::IsLike(like) => {
            f.write_str(" ")?;
            write_property(f, like.property())?;
            f.write_str(" ")?;
            match like.text() {
                Some(text) => write_json_string(f, text)?,
                None => f.write_str("null")?,
            }
            let options = like.options();
            if options.anchor_start {
                f.write_str(" start")?;
            }
            if options.anchor_end {
                f.write_str(" end")?;
            }
            if options.case_insensitive {
                f.write_str(" ci")?;
            }
        }
    }
    f.write_str(")")
}

fn is_bare(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '-'))
}

fn write_property(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare(name) {
        f.write_str(name)
    } else {
        write_json_string(f, name)
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Boolean(b) => write!(f, "{}", b),
        // -0.0 compares equal to 0.0 and gets the same key
        Value::Number(n) if *n == 0.0 => f.write_str("0"),
        Value::Number(n) => write!(f, "{}", n),
        Value::String(s) => write_json_string(f, s),
    }
}

fn write_json_string(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    // serde_json writes a quoted string with every special character escaped
    let quoted = serde_json::Value::String(text.to_string());
    write!(f, "{}", quoted)
}
