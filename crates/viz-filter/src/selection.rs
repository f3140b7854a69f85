//! Combining a new selection with the current one

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use viz_core::VizError;
use viz_data::TableModel;

use crate::filter::Filter;

/// How an input selection combines with the current selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// The input becomes the selection
    #[default]
    Replace,
    /// `current OR input`
    Add,
    /// `current AND NOT input`
    Remove,
    /// `Remove` when the input is already fully selected, `Add` otherwise
    Toggle,
}

impl SelectionMode {
    pub const ALL: [SelectionMode; 4] = [
        SelectionMode::Replace,
        SelectionMode::Add,
        SelectionMode::Remove,
        SelectionMode::Toggle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SelectionMode::Replace => "replace",
            SelectionMode::Add => "add",
            SelectionMode::Remove => "remove",
            SelectionMode::Toggle => "toggle",
        }
    }

    /// The new selection filter.
    ///
    /// `table` is only read by `Toggle`: the input counts as fully selected
    /// when it accepts as many rows of `table` alone as it does together
    /// with `current`.
    pub fn apply<T: TableModel + ?Sized>(self, current: &Filter, input: &Filter, table: &T) -> Filter {
        match self {
            SelectionMode::Replace => input.clone(),
            SelectionMode::Add => current.or(input),
            SelectionMode::Remove => current.and(&Filter::not(input.clone())),
            SelectionMode::Toggle => {
                let input_rows = input.count(table);
                let shared_rows = input.and(current).count(table);
                let mode = if input_rows == shared_rows {
                    SelectionMode::Remove
                } else {
                    SelectionMode::Add
                };
                debug!(
                    "Toggle selection: {} input rows, {} already selected, acting as {}",
                    input_rows, shared_rows, mode
                );
                mode.apply(current, input, table)
            }
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionMode {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                VizError::invalid(
                    "selection mode",
                    format!("unknown mode '{}'. Valid values: replace, add, remove, toggle", s),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sales_table;

    #[test]
    fn test_replace_add_remove() {
        let table = sales_table();
        let current = Filter::is_equal("country", "Portugal").unwrap();
        let input = Filter::is_equal("product", "Car").unwrap();

        assert_eq!(SelectionMode::Replace.apply(&current, &input, &table), input);

        let added = SelectionMode::Add.apply(&current, &input, &table);
        assert_eq!(added, current.or(&input));
        assert_eq!(added.count(&table), 3);

        let removed = SelectionMode::Remove.apply(&current, &input, &table);
        assert_eq!(removed, current.and(&Filter::not(input.clone())));
        assert_eq!(removed.row_indices(&table), vec![1]);
    }

    #[test]
    fn test_toggle() {
        let table = sales_table();
        let current = Filter::is_equal("country", "Portugal").unwrap();

        // Portugal cars are all selected already
        let contained = Filter::and_all([current.clone(), Filter::is_equal("product", "Car").unwrap()]);
        assert_eq!(
            SelectionMode::Toggle.apply(&current, &contained, &table),
            SelectionMode::Remove.apply(&current, &contained, &table)
        );

        let overlapping = Filter::is_equal("product", "Car").unwrap();
        assert_eq!(
            SelectionMode::Toggle.apply(&current, &overlapping, &table),
            SelectionMode::Add.apply(&current, &overlapping, &table)
        );
    }

    #[test]
    fn test_parse_and_serde() {
        assert_eq!("Toggle".parse::<SelectionMode>().unwrap(), SelectionMode::Toggle);
        assert!(matches!(
            "invert".parse::<SelectionMode>(),
            Err(VizError::ArgumentInvalid { .. })
        ));
        assert_eq!(serde_json::to_string(&SelectionMode::Remove).unwrap(), "\"remove\"");
        let mode: SelectionMode = serde_json::from_str("\"add\"").unwrap();
        assert_eq!(mode, SelectionMode::Add);
        assert_eq!(SelectionMode::default().to_string(), "replace");
    }
}
