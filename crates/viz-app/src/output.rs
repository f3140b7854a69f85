//! Output formats

use std::io::{self, Write};

use anyhow::Result;
use serde_json::{json, Map};
use viz_core::{MetaIndex, ModuleRegistry};
use viz_data::{DataTable, DataView, TableModel};
use viz_filter::Filter;

/// Print every declared type as an indented tree under its root
pub fn print_type_forest(registry: &ModuleRegistry) -> Result<()> {
    let mut out = io::stdout().lock();
    let roots = registry
        .iter()
        .filter(|meta| meta.is_declared())
        .filter_map(|meta| meta.as_type().filter(|t| t.ancestor().is_none()).map(|_| meta.index()));

    for root in roots {
        write_type(&mut out, registry, root, 0)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_type(out: &mut impl Write, registry: &ModuleRegistry, index: MetaIndex, depth: usize) -> Result<()> {
    let Some(meta) = registry.by_index(index) else {
        return Ok(());
    };
    let Some(type_meta) = meta.as_type() else {
        return Ok(());
    };

    let marker = if type_meta.is_abstract() { " (abstract)" } else { "" };
    writeln!(out, "{:indent$}{}{}", "", meta.id(), marker, indent = depth * 2)?;
    for instance in type_meta.instances() {
        if let Some(instance) = registry.by_index(*instance) {
            writeln!(out, "{:indent$}- {}", "", instance.id(), indent = depth * 2 + 2)?;
        }
    }
    for subtype in type_meta.subtypes() {
        write_type(out, registry, *subtype, depth + 1)?;
    }
    Ok(())
}

pub fn print_text(filter: &Filter, view: &DataView<'_, DataTable>) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", filter.content_key())?;

    let columns: Vec<&str> = (0..view.number_of_columns())
        .filter_map(|col| view.column_id(col))
        .collect();
    writeln!(out, "{}", columns.join("\t"))?;

    for row in 0..view.number_of_rows() {
        let cells: Vec<String> = (0..view.number_of_columns())
            .map(|col| view.formatted_value(row, col).unwrap_or_default())
            .collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    Ok(())
}

pub fn print_json(filter: &Filter, view: &DataView<'_, DataTable>) -> Result<()> {
    let rows: Vec<serde_json::Value> = (0..view.number_of_rows())
        .map(|row| {
            let mut object = Map::new();
            for col in 0..view.number_of_columns() {
                if let (Some(name), Some(value)) = (view.column_id(col), view.value(row, col)) {
                    object.insert(name.to_string(), value.to_json());
                }
            }
            serde_json::Value::Object(object)
        })
        .collect();

    let document = json!({
        "contentKey": filter.content_key(),
        "spec": filter.to_spec(),
        "rows": rows,
    });

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &document)?;
    writeln!(out)?;
    Ok(())
}
