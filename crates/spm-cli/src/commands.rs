use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use comfy_table::{Cell, CellAlignment};
use tracing::{info, info_span, warn};

use spm_core::{
    Database, ImportReason, OpenOptions, OpenOutcome, RefreshConfig, RefreshEvent, RefreshLoop,
    SnapshotChoice, UpdateOutcome,
};
use spm_ingest::{DataLoader, NanonisLoader, count_by_kind, index_directory};
use spm_model::{DataId, Direction, FileFingerprint, FileKind};
use spm_persistence::find_newest;
use spm_store::{PropertyStore, SortMode, WriteOutcome};
use spm_transform::{CurveMode, DEFAULT_SMOOTHNESS, transform_curve};

use crate::cli::{
    Command, CurveArgs, DirArgs, ListArgs, OpenArgs, RecordArgs, SaveArgs, TagArgs, WatchArgs,
};
use crate::table::{align_column, dim_cell, flag_cell, new_table};

/// Runs one command, writing its report to `out`.
pub fn execute(command: &Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Index(args) => run_index(args, out),
        Command::Open(args) => run_open(args, out),
        Command::Refresh(args) => run_refresh(args, out),
        Command::Save(args) => run_save(args, out),
        Command::Newest(args) => run_newest(args, out),
        Command::List(args) => run_list(args, out),
        Command::Tag(args) => run_tag(args, true, out),
        Command::Untag(args) => run_tag(args, false, out),
        Command::Like(args) => run_flag(args, Flag::Liked(true), out),
        Command::Unlike(args) => run_flag(args, Flag::Liked(false), out),
        Command::Check(args) => run_flag(args, Flag::Checked(true), out),
        Command::Uncheck(args) => run_flag(args, Flag::Checked(false), out),
        Command::ExportAnnotations(args) => run_export(args, out),
        Command::Watch(args) => run_watch(args, out),
        Command::Curve(args) => run_curve(args, out),
    }
}

fn loader() -> Arc<dyn DataLoader> {
    Arc::new(NanonisLoader)
}

fn open_database(dir: &Path, options: &OpenOptions) -> Result<Database> {
    Database::open(dir, options, loader()).with_context(|| format!("open {}", dir.display()))
}

/// Opens `dir` for a command that writes to it.
///
/// Refused when opening had to set the saved snapshot aside: its
/// annotations are only dropped through `open --force-new`.
fn open_for_update(dir: &Path) -> Result<Database> {
    let db = open_database(dir, &OpenOptions::default())?;
    ensure_snapshot_kept(&db, dir)?;
    Ok(db)
}

fn ensure_snapshot_kept(db: &Database, dir: &Path) -> Result<()> {
    match db.opened() {
        OpenOutcome::Imported { reason, .. } if sets_snapshot_aside(*reason) => bail!(
            "{}: {}; run `open --force-new --save` to re-import and start a new snapshot",
            dir.display(),
            import_reason(*reason)
        ),
        _ => Ok(()),
    }
}

/// True when an import replaced a snapshot that may hold annotations.
fn sets_snapshot_aside(reason: ImportReason) -> bool {
    matches!(
        reason,
        ImportReason::Incompatible
            | ImportReason::MoreRecordsThanFiles
            | ImportReason::SnapshotUnreadable
    )
}

/// Saves over the snapshot the database was restored from. Any other save
/// takes a free name.
fn persist(db: &Database) -> Result<PathBuf> {
    let options = db.save_options().with_overwrite(may_overwrite(db.opened()));
    db.save_with(&options).context("save snapshot")
}

fn may_overwrite(outcome: &OpenOutcome) -> bool {
    matches!(
        outcome,
        OpenOutcome::Restored { .. } | OpenOutcome::Merged { .. }
    )
}

fn import_reason(reason: ImportReason) -> &'static str {
    match reason {
        ImportReason::Forced => "forced",
        ImportReason::NoSnapshot => "no snapshot",
        ImportReason::SnapshotUnreadable => "snapshot unreadable",
        ImportReason::MoreRecordsThanFiles => "snapshot tracks missing files",
        ImportReason::Incompatible => "files changed since the snapshot",
    }
}

fn describe_open(outcome: &OpenOutcome) -> String {
    match outcome {
        OpenOutcome::Imported { reason, records } => {
            format!("imported {records} file(s) ({})", import_reason(*reason))
        }
        OpenOutcome::Restored { snapshot } => format!("restored {snapshot}"),
        OpenOutcome::Merged {
            snapshot,
            new_elements,
        } => format!("restored {snapshot} and added {} new file(s)", new_elements.len()),
    }
}

fn run_index(args: &DirArgs, out: &mut impl Write) -> Result<()> {
    let files = index_directory(&args.dir)
        .with_context(|| format!("index {}", args.dir.display()))?;
    let mut table = new_table(&["File", "Kind", "Size", "Modified"]);
    align_column(&mut table, 2, CellAlignment::Right);
    for file in &files {
        let kind = file
            .filename
            .kind()
            .map_or_else(|| "-".to_string(), |kind| kind.to_string());
        table.add_row(vec![
            file.filename.to_string(),
            kind,
            file.size.to_string(),
            format_time(file),
        ]);
    }
    writeln!(out, "{table}")?;
    writeln!(
        out,
        "{} scan(s), {} spectrum file(s)",
        count_by_kind(&files, FileKind::Scan),
        count_by_kind(&files, FileKind::Spectrum)
    )?;
    Ok(())
}

fn run_open(args: &OpenArgs, out: &mut impl Write) -> Result<()> {
    let options = OpenOptions {
        force_new_import: args.force_new,
        snapshot: args
            .snapshot
            .clone()
            .map_or(SnapshotChoice::Newest, SnapshotChoice::Named),
        save_after_open: false,
    };
    let db = open_database(&args.dir, &options)?;
    writeln!(out, "{}: {}", args.dir.display(), describe_open(db.opened()))?;
    writeln!(out, "{} record(s)", db.read(PropertyStore::len))?;
    if args.save {
        ensure_snapshot_kept(&db, &args.dir)?;
        let path = persist(&db)?;
        writeln!(out, "saved {}", path.display())?;
    }
    Ok(())
}

fn run_refresh(args: &DirArgs, out: &mut impl Write) -> Result<()> {
    let db = open_for_update(&args.dir)?;
    writeln!(out, "{}", describe_open(db.opened()))?;
    match db.update().context("update")? {
        UpdateOutcome::NoChanges => writeln!(out, "no new files")?,
        UpdateOutcome::NewElements(ids) => {
            writeln!(out, "added {}", join_ids(&ids))?;
        }
        UpdateOutcome::Incompatible => {
            bail!(
                "{} no longer matches its database; run `open --force-new` to re-import",
                args.dir.display()
            );
        }
    }
    if db.is_dirty() {
        let path = persist(&db)?;
        writeln!(out, "saved {}", path.display())?;
    }
    Ok(())
}

fn run_save(args: &SaveArgs, out: &mut impl Write) -> Result<()> {
    let db = open_for_update(&args.dir)?;
    let mut options = db
        .save_options()
        .with_cache(args.with_data)
        .with_overwrite(args.overwrite);
    if let Some(filename) = &args.filename {
        options = options.with_filename(filename.as_str());
    }
    let path = db.save_with(&options).context("save snapshot")?;
    writeln!(out, "saved {}", path.display())?;
    Ok(())
}

fn run_newest(args: &DirArgs, out: &mut impl Write) -> Result<()> {
    match find_newest(&args.dir).context("look for snapshots")? {
        Some(name) => writeln!(out, "{name}")?,
        None => writeln!(out, "no snapshot in {}", args.dir.display())?,
    }
    Ok(())
}

fn run_list(args: &ListArgs, out: &mut impl Write) -> Result<()> {
    let mode = match args.sort.parse::<SortMode>().map_err(|e| anyhow!(e))? {
        SortMode::SelectedTags(_) => SortMode::SelectedTags(args.tags.iter().cloned().collect()),
        other => other,
    };
    let db = open_database(&args.dir, &OpenOptions::default())?;
    let store = db.store();
    let fingerprints: BTreeMap<DataId, FileFingerprint> = store
        .fingerprints()
        .into_iter()
        .map(|fp| (fp.filename.clone(), fp))
        .collect();

    let mut table = new_table(&["#", "File", "Kind", "Modified", "Liked", "Checked", "Tags"]);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    align_column(&mut table, 5, CellAlignment::Center);
    let ids = store.sorted_ids(&mode);
    for (index, id) in ids.iter().enumerate() {
        let kind = store
            .kind_of(id.as_str())
            .map_or_else(|| "-".to_string(), |kind| kind.to_string());
        let modified = fingerprints
            .get(id)
            .map_or_else(|| "-".to_string(), format_time);
        let tags = store.tags(id.as_str());
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(id),
            Cell::new(kind),
            Cell::new(modified),
            flag_cell(store.is_liked(id.as_str()), "♥"),
            flag_cell(store.is_checked(id.as_str()), "✓"),
            if tags.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(tags.join(", "))
            },
        ]);
    }
    writeln!(out, "{table}")?;
    writeln!(out, "{} of {} record(s), sorted by {mode}", ids.len(), store.len())?;
    Ok(())
}

fn run_tag(args: &TagArgs, add: bool, out: &mut impl Write) -> Result<()> {
    let db = open_for_update(&args.dir)?;
    let outcome = db.modify(|store| {
        if add {
            store.add_tag(&args.id, &args.tag)
        } else {
            store.remove_tag(&args.id, &args.tag)
        }
    });
    let Some(outcome) = outcome else {
        let state = if add { "already has" } else { "does not have" };
        writeln!(out, "{} {state} tag '{}'", args.id, args.tag)?;
        return Ok(());
    };
    ensure_written(&outcome, &args.id)?;
    persist(&db)?;
    let verb = if add { "tagged" } else { "untagged" };
    writeln!(out, "{verb} {} '{}'", args.id, args.tag)?;
    Ok(())
}

#[derive(Clone, Copy)]
enum Flag {
    Liked(bool),
    Checked(bool),
}

fn run_flag(args: &RecordArgs, flag: Flag, out: &mut impl Write) -> Result<()> {
    let db = open_for_update(&args.dir)?;
    let outcome = db.modify(|store| match flag {
        Flag::Liked(liked) => store.set_liked(&args.id, liked),
        Flag::Checked(checked) => store.set_checked(&args.id, checked),
    });
    ensure_written(&outcome, &args.id)?;
    persist(&db)?;
    let state = match flag {
        Flag::Liked(true) => "liked",
        Flag::Liked(false) => "unliked",
        Flag::Checked(true) => "checked",
        Flag::Checked(false) => "unchecked",
    };
    writeln!(out, "{} {state}", args.id)?;
    Ok(())
}

fn ensure_written(outcome: &WriteOutcome, id: &str) -> Result<()> {
    match outcome.refusal() {
        Some(refusal) => Err(anyhow!("{id}: {refusal}")),
        None => Ok(()),
    }
}

fn run_export(args: &DirArgs, out: &mut impl Write) -> Result<()> {
    let db = open_for_update(&args.dir)?;
    let path = db.export_annotations().context("export annotations")?;
    writeln!(out, "wrote {}", path.display())?;
    Ok(())
}

fn run_watch(args: &WatchArgs, out: &mut impl Write) -> Result<()> {
    let _span = info_span!("watch", directory = %args.dir.display()).entered();
    let db = Arc::new(open_for_update(&args.dir)?);
    writeln!(out, "{}", describe_open(db.opened()))?;
    db.set_save_options(db.save_options().with_overwrite(may_overwrite(db.opened())));

    let config = RefreshConfig {
        enabled: true,
        action_gap_ms: args.action_gap_secs.saturating_mul(1000),
        cycle_gap_ms: args.cycle_gap_secs.saturating_mul(1000),
        max_cycles: args.cycles,
    };
    let refresh = RefreshLoop::spawn(Arc::clone(&db), config).context("start refresh")?;
    info!("watching for new files");

    for event in refresh.events() {
        match event {
            RefreshEvent::Updated(UpdateOutcome::NoChanges) | RefreshEvent::SaveSkipped => {}
            RefreshEvent::Updated(UpdateOutcome::NewElements(ids)) => {
                writeln!(out, "added {}", join_ids(&ids))?;
            }
            RefreshEvent::Updated(UpdateOutcome::Incompatible) => {
                writeln!(out, "files changed on disk; new files are not merged until re-import")?;
            }
            RefreshEvent::Saved(path) => writeln!(out, "saved {}", path.display())?,
            RefreshEvent::Failed(message) => writeln!(out, "refresh failed: {message}")?,
            RefreshEvent::Stopped { cycles } => {
                writeln!(out, "stopped after {cycles} cycle(s)")?;
                break;
            }
        }
    }
    refresh.join();
    Ok(())
}

fn run_curve(args: &CurveArgs, out: &mut impl Write) -> Result<()> {
    let mode = args.mode.parse::<CurveMode>().map_err(|e| anyhow!(e))?;
    let file = NanonisLoader
        .load(&args.file)
        .with_context(|| format!("load {}", args.file.display()))?;
    if file.kind != FileKind::Spectrum {
        bail!("{} is not a spectrum file", args.file.display());
    }
    let direction = if args.backward {
        Direction::Backward
    } else {
        Direction::Forward
    };
    let (x, x_unit) = file.get_channel(&args.x, direction)?;
    let (y, y_unit) = file.get_channel(&args.y, direction)?;
    let smoothness = args.smoothness.unwrap_or(DEFAULT_SMOOTHNESS);

    let (mode, curve) = match transform_curve(x, y, mode, smoothness) {
        Err(err) if err.is_insufficient_samples() => {
            let fallback = mode.fallback();
            warn!(error = %err, %fallback, "curve too short for a spline");
            (fallback, transform_curve(x, y, fallback, smoothness)?)
        }
        other => (mode, other?),
    };

    let y_label = match mode.axis_suffix() {
        "" => format!("{} ({y_unit})", args.y),
        suffix => format!("{} {suffix}", args.y),
    };
    let x_label = format!("{} ({x_unit})", args.x);
    let mut table = new_table(&[x_label.as_str(), y_label.as_str()]);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 1, CellAlignment::Right);
    for (x, y) in curve.x.iter().zip(&curve.y) {
        table.add_row(vec![format!("{x:.6e}"), format!("{y:.6e}")]);
    }
    writeln!(out, "{mode}")?;
    writeln!(out, "{table}")?;
    Ok(())
}

fn format_time(fingerprint: &FileFingerprint) -> String {
    fingerprint.modified.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn join_ids(ids: &[DataId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
