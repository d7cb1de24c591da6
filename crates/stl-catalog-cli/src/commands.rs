use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stl-catalog")]
#[command(about = "Catalog and categorize a library of 3D-printing files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Crawl the configured root, rebuild the folder tree and classify every file
    Scan,
    /// Show one scan job
    Job {
        id: i64,
        /// Print the job as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent scan jobs, newest first
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Manage categories
    #[command(subcommand)]
    Categories(CategoryCommands),
    /// Apply categories to a folder and its direct children
    Propagate(PropagateArgs),
    /// Run the classifier again for one file
    Reclassify { file_id: i64 },
    /// Replace a file's categories with the given ids
    SetFileCategories {
        file_id: i64,
        #[arg(long = "category")]
        categories: Vec<i64>,
    },
    /// Print the content hash of a file
    Hash { path: String },
    /// Print configuration values
    PrintConfig,
    /// Delete all scan, folder and file rows (categories are kept)
    TruncateDb,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Include soft-deleted categories
        #[arg(long)]
        all: bool,
    },
    Add { name: String },
    Rename { id: i64, name: String },
    /// Soft-delete a category
    Delete { id: i64 },
    Restore { id: i64 },
}

#[derive(Debug, Args)]
pub struct PropagateArgs {
    pub folder_id: i64,
    /// Category id to apply; repeat for several
    #[arg(long = "category")]
    pub categories: Vec<i64>,
    #[arg(long)]
    pub stl: bool,
    #[arg(long)]
    pub zip: bool,
    #[arg(long)]
    pub rar: bool,
    /// Also apply to immediate subfolders (not their contents)
    #[arg(long)]
    pub subfolders: bool,
    /// Leave the folder's own categories untouched
    #[arg(long)]
    pub children_only: bool,
}
