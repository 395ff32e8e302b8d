//! The `check` command: density verification.

use serde::Serialize;
use sortable::Instance;

use crate::cli::CollectionArgs;
use crate::output::OutputFormat;

#[derive(Serialize)]
struct Report<'a> {
    collection: &'a str,
    records: i64,
    dense: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    violation: Option<String>,
}

/// Run the `check` command.
///
/// Returns an error when the collection is not dense, so the process exits non-zero.
pub async fn run(
    instance: &Instance,
    args: &CollectionArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = instance.collection(args.collection.as_str())?;
    let records = collection.count().await?;
    let result = collection.verify_density().await;

    let report = Report {
        collection: collection.name(),
        records,
        dense: result.is_ok(),
        violation: result.as_ref().err().map(ToString::to_string),
    };
    match format {
        OutputFormat::Human => match &report.violation {
            None => println!("{}: {} records, dense", report.collection, report.records),
            Some(violation) => println!("{}: {violation}", report.collection),
        },
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
    }

    result.map_err(Into::into)
}
