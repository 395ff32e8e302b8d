//! CLI argument definitions for the Sortable binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sortable::Target;

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// SQLite database (default)
    Sqlite,
    /// PostgreSQL database
    Postgres,
    /// In-memory with JSON persistence (for development)
    Inmemory,
}

/// Inspect and edit densely ordered collections
#[derive(Parser, Debug)]
#[command(name = "sortable")]
#[command(about = "Sortable: dense, gap-free position ordering for records")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub backend_config: BackendConfig,

    /// Log filter directive (tracing EnvFilter syntax)
    #[arg(long, global = true, default_value = "sortable=info", env = "SORTABLE_LOG")]
    pub log: String,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true, env = "SORTABLE_JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the records are stored
#[derive(Args, Debug, Clone)]
pub struct BackendConfig {
    /// Storage backend to use
    #[arg(short, long, global = true, default_value = "sqlite", env = "SORTABLE_BACKEND")]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores sortable.db
    /// For InMemory: stores sortable.json
    #[arg(short = 'D', long, global = true, env = "SORTABLE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, global = true, env = "SORTABLE_POSTGRES_URL")]
    pub postgres_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the records of a collection in position order
    List(ListArgs),
    /// Add a record, at the end or at a given position
    Add(AddArgs),
    /// Move a record
    Move(MoveArgs),
    /// Swap a record with the record at a position
    Swap(SwapArgs),
    /// Delete a record (soft delete unless --force)
    Delete(DeleteArgs),
    /// Restore a soft-deleted record
    Restore(RecordArgs),
    /// Verify that a collection is densely ordered
    Check(CollectionArgs),
    /// List collection names
    Collections,
}

#[derive(Args, Debug)]
pub struct CollectionArgs {
    /// Collection name
    pub collection: String,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Collection name
    pub collection: String,
    /// Record id
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Collection name
    pub collection: String,

    /// Last position first
    #[arg(short, long)]
    pub reverse: bool,

    /// Show soft-deleted records instead of live ones
    #[arg(short, long, conflicts_with = "reverse")]
    pub trashed: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Collection name
    pub collection: String,

    /// Insert at this position instead of appending (clamped to the collection)
    #[arg(long)]
    pub at: Option<i64>,

    /// Record id (a UUID is generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Payload as JSON; anything that is not valid JSON is stored as a string
    #[arg(short, long)]
    pub payload: Option<String>,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    #[command(flatten)]
    pub target: MoveTarget,
}

/// Exactly one destination for `move`
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct MoveTarget {
    /// Move to this position (clamped to the collection)
    #[arg(long, allow_negative_numbers = true)]
    pub to: Option<i64>,

    /// Move this many positions towards the top
    #[arg(long)]
    pub up: Option<u64>,

    /// Move this many positions towards the end
    #[arg(long)]
    pub down: Option<u64>,

    /// Move to position 1
    #[arg(long)]
    pub top: bool,

    /// Move to the last position
    #[arg(long)]
    pub end: bool,
}

impl MoveTarget {
    pub fn target(&self) -> Target {
        if let Some(position) = self.to {
            Target::At(position)
        } else if let Some(steps) = self.up {
            Target::Up(steps)
        } else if let Some(steps) = self.down {
            Target::Down(steps)
        } else if self.top {
            Target::Top
        } else {
            Target::End
        }
    }
}

#[derive(Args, Debug)]
pub struct SwapArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Position of the record to swap with
    pub position: i64,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Remove the record permanently
    #[arg(short, long)]
    pub force: bool,
}
