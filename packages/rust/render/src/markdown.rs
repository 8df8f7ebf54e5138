//! Markdown rendering.

use epicreport_shared::{Content, ReportModel, Table};

/// Render the model as Markdown. Sections are separated by blank lines.
pub fn render(model: &ReportModel) -> String {
    let mut md = String::new();

    for section in &model.sections {
        md.push_str(&"#".repeat(usize::from(section.level.clamp(1, 6))));
        md.push(' ');
        md.push_str(&section.heading);
        md.push_str("\n\n");

        match &section.content {
            Content::Prose(text) => {
                md.push_str(text);
                md.push('\n');
            }
            Content::Bullets(items) => {
                for item in items {
                    md.push_str("- ");
                    md.push_str(item);
                    md.push('\n');
                }
            }
            Content::Table(table) => push_table(&mut md, table),
        }
        md.push('\n');
    }

    // Exactly one trailing newline.
    let trimmed = md.trim_end().len();
    md.truncate(trimmed);
    md.push('\n');
    md
}

fn push_table(md: &mut String, table: &Table) {
    let cols = table.columns.len();

    md.push_str("| ");
    md.push_str(
        &table
            .columns
            .iter()
            .map(|c| escape_cell(c))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    md.push_str(" |\n");

    md.push_str("| ");
    md.push_str(&vec!["---"; cols].join(" | "));
    md.push_str(" |\n");

    for row in &table.rows {
        let mut cells: Vec<String> = row.cells.iter().map(|c| escape_cell(c)).collect();
        cells.resize(cols.max(cells.len()), String::new());
        md.push_str("| ");
        md.push_str(&cells.join(" | "));
        md.push_str(" |\n");
    }
}

/// Pipes would split the cell; newlines would end the row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
