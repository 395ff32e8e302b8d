//! The `list` command.

use sortable::Instance;

use crate::cli::ListArgs;
use crate::output::{OutputFormat, print_records};

/// Run the `list` command
pub async fn run(
    instance: &Instance,
    args: &ListArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = instance.collection(args.collection.as_str())?;
    let records = if args.trashed {
        collection.trashed().await?
    } else if args.reverse {
        collection.reversed().await?
    } else {
        collection.sorted(Default::default()).await?
    };
    print_records(&records, format)
}
