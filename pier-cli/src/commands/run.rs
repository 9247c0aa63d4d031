use std::path::Path;

use colored::Colorize;
use pier_data::{run_script, Adapter, DataError, Script, ScriptReport};

/// Parse a `name=value` script variable.
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid variable '{raw}'. Expected: name=value"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid variable '{raw}'. Name must not be empty"));
    }
    Ok((name.to_string(), value.to_string()))
}

pub async fn run(
    adapter: &dyn Adapter,
    path: &Path,
    vars: &[(String, String)],
) -> Result<ScriptReport, Box<dyn std::error::Error>> {
    let script = vars
        .iter()
        .fold(Script::from_file(path)?, |script, (name, value)| {
            script.with_var(name.as_str(), value.as_str())
        });

    match run_script(adapter, &script).await {
        Ok(report) => {
            println!(
                "{} {}/{} statements from {}",
                "Executed".green(),
                report.executed,
                report.total,
                path.display()
            );
            Ok(report)
        }
        Err(DataError::Script {
            total,
            executed,
            source,
        }) => {
            println!(
                "{} after {}/{} statements, transaction rolled back",
                "Failed".red(),
                executed,
                total
            );
            Err(source)
        }
        Err(err) => Err(err.into()),
    }
}
