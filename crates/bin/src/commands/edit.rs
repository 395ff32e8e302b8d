//! Commands that change positions: `add`, `move`, `swap`, `delete`, `restore`.

use serde_json::Value;
use sortable::{Collection, Instance, PositionAccessor, Record, SwapTarget};

use crate::cli::{AddArgs, DeleteArgs, MoveArgs, RecordArgs, SwapArgs};
use crate::output::{OutputFormat, print_record, print_records};

/// Parse a payload argument, falling back to a JSON string.
fn parse_payload(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

async fn find_live(
    collection: &Collection,
    id: &str,
) -> Result<Record, Box<dyn std::error::Error>> {
    collection
        .get(id)
        .await?
        .ok_or_else(|| format!("No live record {id} in collection {}", collection.name()).into())
}

/// Run the `add` command
pub async fn add(
    instance: &Instance,
    args: &AddArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = instance.collection(args.collection.as_str())?;
    let payload = parse_payload(args.payload.as_deref());
    let mut record = match &args.id {
        Some(id) => Record::with_id(collection.name(), id.as_str(), payload),
        None => collection.new_record(payload),
    };
    if let Some(position) = args.at {
        record.set_position(position);
    }
    collection.save(&mut record).await?;
    tracing::info!(collection = %collection.name(), id = %record.id(), position = ?record.position(), "record added");
    print_record(&record, format)
}

/// Run the `move` command
pub async fn move_record(
    instance: &Instance,
    args: &MoveArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = instance.collection(args.record.collection.as_str())?;
    let mut record = find_live(&collection, &args.record.id).await?;
    let from = record.position();
    collection
        .move_record(&mut record, args.target.target())
        .await?;
    tracing::info!(collection = %collection.name(), id = %record.id(), from = ?from, to = ?record.position(), "record moved");
    print_record(&record, format)
}

/// Run the `swap` command
pub async fn swap(
    instance: &Instance,
    args: &SwapArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = instance.collection(args.record.collection.as_str())?;
    let mut record = find_live(&collection, &args.record.id).await?;
    let other = collection
        .swap_position(&mut record, SwapTarget::Position(args.position))
        .await?;
    tracing::info!(collection = %collection.name(), id = %record.id(), other = %other.id(), "records swapped");

    let mut both = vec![record, other];
    both.sort_by_key(|record| record.position());
    print_records(&both, format)
}

/// Run the `delete` command
pub async fn delete(
    instance: &Instance,
    args: &DeleteArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = instance.collection(args.record.collection.as_str())?;

    if args.force {
        let record = collection
            .get_with_trashed(args.record.id.as_str())
            .await?
            .ok_or_else(|| {
                format!(
                    "No record {} in collection {}",
                    args.record.id,
                    collection.name()
                )
            })?;
        let id = record.id().clone();
        collection.force_delete(record).await?;
        tracing::info!(collection = %collection.name(), %id, "record removed");
        match format {
            OutputFormat::Human => println!("Removed {id}"),
            OutputFormat::Json => println!("{}", serde_json::json!({ "removed": id })),
        }
        return Ok(());
    }

    let mut record = find_live(&collection, &args.record.id).await?;
    collection.delete(&mut record).await?;
    tracing::info!(collection = %collection.name(), id = %record.id(), "record deleted");
    print_record(&record, format)
}

/// Run the `restore` command
pub async fn restore(
    instance: &Instance,
    args: &RecordArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = instance.collection(args.collection.as_str())?;
    let mut record = collection
        .get_with_trashed(args.id.as_str())
        .await?
        .ok_or_else(|| format!("No record {} in collection {}", args.id, collection.name()))?;
    collection.restore(&mut record).await?;
    tracing::info!(collection = %collection.name(), id = %record.id(), position = ?record.position(), "record restored");
    print_record(&record, format)
}
