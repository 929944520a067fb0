//! CLI argument definitions for the data browser.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "spm-browser",
    version,
    about = "Browse, annotate and snapshot scanning-probe measurement folders",
    long_about = "Browse, annotate and snapshot folders of Nanonis measurements.\n\n\
                  Scans (.sxm) and spectra (.dat) are tracked in a property database\n\
                  that is saved next to the files as a .spmdb snapshot."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the measurement files of a folder without touching any database.
    Index(DirArgs),

    /// Open a folder, restoring or importing its database.
    Open(OpenArgs),

    /// Merge files added since the last save and save if anything changed.
    Refresh(DirArgs),

    /// Write a snapshot of the folder's database.
    Save(SaveArgs),

    /// Print the most recently saved snapshot of a folder.
    Newest(DirArgs),

    /// List the records of a folder's database.
    List(ListArgs),

    /// Add a tag to a record.
    Tag(TagArgs),

    /// Remove a tag from a record.
    Untag(TagArgs),

    /// Mark a record as liked.
    Like(RecordArgs),

    /// Clear a record's like.
    Unlike(RecordArgs),

    /// Check a record.
    Check(RecordArgs),

    /// Uncheck a record.
    Uncheck(RecordArgs),

    /// Write liked_and_tags.txt into the folder.
    ExportAnnotations(DirArgs),

    /// Keep refreshing and saving a folder in the background.
    Watch(WatchArgs),

    /// Print a transformed curve from a spectrum file.
    Curve(CurveArgs),
}

#[derive(Args)]
pub struct DirArgs {
    /// Folder holding the measurement files.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct OpenArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Ignore saved snapshots and import every file.
    #[arg(long = "force-new")]
    pub force_new: bool,

    /// Start from this snapshot instead of the newest one.
    #[arg(long = "snapshot", value_name = "NAME")]
    pub snapshot: Option<String>,

    /// Save a snapshot right after opening.
    #[arg(long = "save")]
    pub save: bool,
}

#[derive(Args)]
pub struct SaveArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Include the parsed measurement data in the snapshot.
    #[arg(long = "with-data")]
    pub with_data: bool,

    /// Replace the snapshot file instead of picking a free name.
    #[arg(long = "overwrite")]
    pub overwrite: bool,

    /// Snapshot file name (default: the opened snapshot, or _database.spmdb).
    /// `.spmdb` is appended when missing.
    #[arg(long = "filename", value_name = "NAME")]
    pub filename: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Order or filter: name, name-inverse, time, time-inverse, tags,
    /// tags-inverse, selected-tags, checked, liked, not-liked.
    #[arg(long = "sort", value_name = "MODE", default_value = "time-inverse")]
    pub sort: String,

    /// Tags to keep with --sort selected-tags (repeatable).
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct RecordArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// File name of the record.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args)]
pub struct TagArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(value_name = "TAG")]
    pub tag: String,
}

#[derive(Args)]
pub struct WatchArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Seconds between the update check and the save.
    #[arg(long = "action-gap-secs", value_name = "N", default_value_t = 5)]
    pub action_gap_secs: u64,

    /// Seconds between cycles.
    #[arg(long = "cycle-gap-secs", value_name = "N", default_value_t = 60)]
    pub cycle_gap_secs: u64,

    /// Stop after this many cycles (default: run until interrupted).
    #[arg(long = "cycles", value_name = "N")]
    pub cycles: Option<u64>,
}

#[derive(Args)]
pub struct CurveArgs {
    /// Spectrum file (.dat).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Channel for the x axis.
    #[arg(long = "x", value_name = "CHANNEL")]
    pub x: String,

    /// Channel for the y axis.
    #[arg(long = "y", value_name = "CHANNEL")]
    pub y: String,

    /// identity, smoothed, smoothed-derivative or raw-derivative (or the
    /// browser labels such as "dY/dX _ spline").
    #[arg(long = "mode", value_name = "MODE", default_value = "identity")]
    pub mode: String,

    /// Spline smoothing factor.
    #[arg(long = "smoothness", value_name = "S")]
    pub smoothness: Option<f64>,

    /// Use the backward sweep.
    #[arg(long = "backward")]
    pub backward: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
