use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use colored::Colorize;
use pier_data::{Adapter, ConnectionParams};
use pier_data_sqlx::SqliteAdapter;

/// Render exported structure as a script `pier run` can replay: one
/// statement per table, each terminated by `;` and a newline.
pub fn render_structure(structure: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (table, ddl) in structure {
        out.push_str(&format!("-- {table}\n{};\n\n", ddl.trim_end().trim_end_matches(';')));
    }
    out
}

pub async fn export(
    adapter: &dyn Adapter,
    out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let structure = adapter.export_database_structure().await?;
    let rendered = render_structure(&structure);
    match out {
        Some(path) => {
            fs::write(path, &rendered)?;
            println!(
                "{} {} tables to {}",
                "Exported".green(),
                structure.len(),
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Replay the structure of the database at `from` on `adapter`, returning
/// the number of tables created.
pub async fn import(
    adapter: &dyn Adapter,
    from: &str,
    clear: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    if !Path::new(from).exists() {
        return Err(format!("Source database '{from}' not found").into());
    }
    let source = SqliteAdapter::open(&ConnectionParams::embedded(from)).await?;
    let imported = adapter.import_database_structure(&*source, clear).await;
    source.disconnect().await?;
    let imported = imported?;
    println!("{} {} tables from {}", "Imported".green(), imported, from);
    Ok(imported)
}
