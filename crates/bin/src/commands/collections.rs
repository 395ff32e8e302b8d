//! The `collections` command.

use sortable::Instance;

use crate::output::{OutputFormat, print_table};

/// Run the `collections` command
pub async fn run(instance: &Instance, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let names = instance.collections().await?;

    match format {
        OutputFormat::Human => {
            if names.is_empty() {
                println!("No collections found.");
                return Ok(());
            }
            let mut rows = Vec::with_capacity(names.len());
            for name in &names {
                let count = instance.collection(name.as_str())?.count().await?;
                rows.push(vec![name.clone(), count.to_string()]);
            }
            print_table(&["COLLECTION", "RECORDS"], &rows);
        }
        OutputFormat::Json => {
            let mut entries = Vec::with_capacity(names.len());
            for name in &names {
                let count = instance.collection(name.as_str())?.count().await?;
                entries.push(serde_json::json!({
                    "name": name,
                    "records": count,
                }));
            }
            println!("{}", serde_json::to_string(&entries)?);
        }
    }

    Ok(())
}
