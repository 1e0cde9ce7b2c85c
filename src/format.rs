//! Text rendering of results and of the relational model

use crate::catalog::{Attribute, Catalog, Relation};
use crate::executor::QueryResult;
use crate::lang::ast::ModelStyle;
use crate::storage::Tuple;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const RESET: &str = "\x1b[0m";

/// Format tuples as a bordered table followed by the tuple count
pub fn format_table(columns: &[String], rows: &[Tuple]) -> String {
    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();

    for row in rows {
        for (i, value) in row.values().iter().enumerate() {
            if i < widths.len() {
                let value_len = value.to_string().chars().count();
                widths[i] = widths[i].max(value_len);
            }
        }
    }

    let mut output = String::new();

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    // Header
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    // Rows
    for row in rows {
        let row_str: String = row
            .values()
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", v.to_string(), width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }

    if !rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} tuple(s)\n", rows.len()));

    output
}

/// Format a statement result for display
pub fn format_result(result: &QueryResult) -> String {
    if let Some(ref msg) = result.message {
        return format!("{}\n", msg);
    }

    if result.columns.is_empty() {
        if result.affected_rows > 0 {
            return format!("{} tuple(s) affected\n", result.affected_rows);
        }
        return String::new();
    }

    format_table(&result.columns, &result.rows)
}

fn plain_attribute(attribute: &Attribute) -> String {
    format!(
        "{}{}{}",
        if attribute.primary_key { "_" } else { "" },
        if attribute.foreign_key { "#" } else { "" },
        attribute.name
    )
}

fn decorated_attribute(attribute: &Attribute) -> String {
    let mut out = String::new();
    if attribute.primary_key {
        out.push_str(UNDERLINE);
    }
    if attribute.foreign_key {
        out.push('#');
        out.push_str(ITALIC);
    }
    out.push_str(&attribute.name);
    if attribute.primary_key || attribute.foreign_key {
        out.push_str(RESET);
    }
    out
}

fn format_relation(relation: &Relation, style: ModelStyle) -> String {
    let attributes: Vec<String> = relation
        .schema()
        .attributes()
        .iter()
        .map(|a| match style {
            ModelStyle::Raw => plain_attribute(a),
            ModelStyle::Decorated => decorated_attribute(a),
        })
        .collect();

    let mut lines = Vec::with_capacity(1 + relation.foreign_keys.len());
    match style {
        ModelStyle::Raw => {
            lines.push(format!("{}({})", relation.name(), attributes.join(", ")));
            for fk in &relation.foreign_keys {
                lines.push(format!("    {}", fk));
            }
        }
        ModelStyle::Decorated => {
            let dim = if relation.temporary { DIM } else { "" };
            // Attribute styles end in a reset, so dimming is restored after each one
            let separator = format!(", {}", dim);
            lines.push(format!(
                "{dim}{BOLD}{}{RESET}{dim}({}{dim}){RESET}",
                relation.name(),
                attributes.join(&separator),
            ));
            for fk in &relation.foreign_keys {
                lines.push(format!(
                    "    {ITALIC}{}{RESET} references {}.{}",
                    fk.referencer, fk.referenced_relation, fk.referenced_attribute
                ));
            }
        }
    }
    lines.join("\n")
}

/// Render every relation: base relations first, then temporary ones
pub fn format_model(catalog: &Catalog, style: ModelStyle) -> String {
    catalog
        .listing_order()
        .into_iter()
        .map(|r| format_relation(r, style))
        .collect::<Vec<_>>()
        .join("\n")
}
