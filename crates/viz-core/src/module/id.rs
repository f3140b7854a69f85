//! Module identifier normalization

use crate::error::{Result, VizError};

/// Segment separator of module identifiers
pub const SEPARATOR: char = '/';

/// Returns `true` for ids written relative to another module (`./x`, `../x`)
pub fn is_relative(id: &str) -> bool {
    id.starts_with("./") || id.starts_with("../")
}

/// Resolve `id` against the id of the module that references it.
///
/// Relative ids are resolved against the *parent* of `base`, the same way
/// a sibling file is addressed. Absolute ids are validated and returned
/// unchanged.
pub fn resolve_relative(id: &str, base: Option<&str>) -> Result<String> {
    if id.is_empty() {
        return Err(VizError::ArgumentRequired("id".to_string()));
    }

    if !is_relative(id) {
        validate(id)?;
        return Ok(id.to_string());
    }

    let base = base.ok_or_else(|| {
        VizError::invalid("id", format!("relative id '{}' requires a base id", id))
    })?;
    validate(base)?;

    let mut segments: Vec<&str> = base.split(SEPARATOR).collect();
    // Drop the referencing module's own name
    segments.pop();

    for part in id.split(SEPARATOR) {
        match part {
            "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(VizError::invalid(
                        "id",
                        format!("'{}' escapes the root of '{}'", id, base),
                    ));
                }
            }
            "" => return Err(VizError::invalid("id", format!("empty segment in '{}'", id))),
            name => segments.push(name),
        }
    }

    if segments.is_empty() {
        return Err(VizError::invalid("id", format!("'{}' resolves to nothing", id)));
    }

    Ok(segments.join("/"))
}

fn validate(id: &str) -> Result<()> {
    if id.split(SEPARATOR).any(|segment| segment.is_empty()) {
        return Err(VizError::invalid("id", format!("empty segment in '{}'", id)));
    }
    if id.split(SEPARATOR).any(|segment| segment == "." || segment == "..") {
        return Err(VizError::invalid("id", format!("'{}' is not an absolute id", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_ids_pass_through() {
        assert_eq!(resolve_relative("viz/visual/models/bar", None).unwrap(), "viz/visual/models/bar");
    }

    #[test]
    fn test_relative_ids() {
        let base = Some("viz/visual/models/bar");
        assert_eq!(resolve_relative("./line", base).unwrap(), "viz/visual/models/line");
        assert_eq!(resolve_relative("../role/mapping", base).unwrap(), "viz/visual/role/mapping");
    }

    #[test]
    fn test_invalid_ids() {
        assert!(matches!(resolve_relative("", None), Err(VizError::ArgumentRequired(_))));
        assert!(resolve_relative("a//b", None).is_err());
        assert!(resolve_relative("./x", None).is_err());
        assert!(resolve_relative("../../x", Some("a")).is_err());
    }
}
