//! File and folder CLI commands.

use std::path::PathBuf;

use clap::Args;
use futures::StreamExt;
use serde::Serialize;
use tabled::Tabled;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use nasbox_core::error::AppError;
use nasbox_core::traits::storage::ByteStream;
use nasbox_entity::metadata::{ItemKind, MetadataRecord, SearchKind};
use nasbox_service::RequestContext;
use nasbox_service::file::{ListEntry, SearchRequest};

use crate::app::App;
use crate::output::{self, OutputFormat};

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder to list (the root when omitted)
    pub path: Option<String>,
}

/// Arguments for `mkdir`
#[derive(Debug, Args)]
pub struct MkdirArgs {
    /// New folder name
    pub name: String,
    /// Parent folder (the root when omitted)
    #[arg(short, long)]
    pub parent: Option<String>,
}

/// Arguments for `put`
#[derive(Debug, Args)]
pub struct PutArgs {
    /// Local file to upload
    pub source: PathBuf,
    /// Destination folder (the root when omitted)
    #[arg(short, long)]
    pub dest: Option<String>,
    /// Stored file name (the source name when omitted)
    #[arg(short, long)]
    pub name: Option<String>,
    /// Declared MIME type
    #[arg(short, long)]
    pub mime: Option<String>,
}

/// Arguments for `get`
#[derive(Debug, Args)]
pub struct GetArgs {
    /// File to download
    pub path: String,
    /// Write here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `mv` and `cp`
#[derive(Debug, Args)]
pub struct TransferArgs {
    /// Item to move or copy
    pub path: String,
    /// Destination folder
    pub dest: String,
    /// Item type
    #[arg(short, long, default_value = "file")]
    pub kind: ItemKind,
}

/// Arguments for `rename`
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Item to rename
    pub path: String,
    /// New name
    pub new_name: String,
    /// Item type
    #[arg(short, long, default_value = "file")]
    pub kind: ItemKind,
}

/// Arguments for `rm`
#[derive(Debug, Args)]
pub struct RmArgs {
    /// Item to delete
    pub path: String,
    /// Item type
    #[arg(short, long, default_value = "file")]
    pub kind: ItemKind,
    /// Skip confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `search`
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Name fragment
    pub query: String,
    /// Restrict to `file` or `folder`
    #[arg(short, long, default_value = "all")]
    pub kind: SearchKind,
    /// Maximum results
    #[arg(short, long)]
    pub limit: Option<u32>,
}

/// Listing row for table output
#[derive(Debug, Serialize, Tabled)]
struct EntryRow {
    /// Name
    name: String,
    /// Type
    kind: String,
    /// Size
    size: String,
    /// MIME type
    mime: String,
    /// Modified
    modified: String,
    /// Tracked in metadata
    tracked: bool,
}

impl From<&ListEntry> for EntryRow {
    fn from(e: &ListEntry) -> Self {
        Self {
            name: e.name.clone(),
            kind: e.kind.to_string(),
            size: match e.kind {
                ItemKind::File => output::human_bytes(e.size),
                ItemKind::Folder => "-".to_string(),
            },
            mime: e.mime_type.clone().unwrap_or_else(|| "-".to_string()),
            modified: output::timestamp(e.modified_at),
            tracked: e.has_metadata,
        }
    }
}

/// Record row for table output
#[derive(Debug, Serialize, Tabled)]
struct RecordRow {
    /// Record ID
    id: String,
    /// Type
    kind: String,
    /// Path
    path: String,
    /// Created at
    created_at: String,
}

impl From<&MetadataRecord> for RecordRow {
    fn from(r: &MetadataRecord) -> Self {
        let id = match r {
            MetadataRecord::File(f) => f.id,
            MetadataRecord::Folder(f) => f.id,
        };
        Self {
            id: id.to_string(),
            kind: r.kind().to_string(),
            path: r.path().to_string(),
            created_at: r.created_at().format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn print_record(record: &MetadataRecord, verb: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_item(record, format),
        OutputFormat::Table => output::print_success(&format!(
            "{verb} {} '{}'",
            record.kind(),
            record.path()
        )),
    }
}

/// `ls`
pub async fn ls(
    args: &LsArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let entries = app
        .files
        .list(ctx, args.path.as_deref().unwrap_or_default())
        .await?;
    match format {
        OutputFormat::Json => output::print_item(&entries, format),
        OutputFormat::Table => {
            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}

/// `mkdir`
pub async fn mkdir(
    args: &MkdirArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let folder = app
        .files
        .create_folder(ctx, args.parent.as_deref().unwrap_or_default(), &args.name)
        .await?;
    print_record(&MetadataRecord::Folder(folder), "Created", format);
    Ok(())
}

/// `put`
pub async fn put(
    args: &PutArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::validation("Source has no file name"))?,
    };

    let file = tokio::fs::File::open(&args.source).await.map_err(|e| {
        AppError::from_io(format!("Failed to open {}", args.source.display()), e)
    })?;
    let body: ByteStream = Box::pin(ReaderStream::new(file));

    let record = app
        .files
        .upload_stream(
            ctx,
            args.dest.as_deref().unwrap_or_default(),
            &name,
            args.mime.as_deref(),
            body,
        )
        .await?;

    match format {
        OutputFormat::Json => output::print_item(&record, format),
        OutputFormat::Table => {
            output::print_success(&format!("Uploaded '{}'", record.path));
            output::print_kv("Size", &output::human_bytes(record.size_bytes.max(0) as u64));
            output::print_kv("MIME type", &record.mime_type);
        }
    }
    Ok(())
}

/// `get`
pub async fn get(args: &GetArgs, app: &App, ctx: &RequestContext) -> Result<(), AppError> {
    let content = app.files.download(ctx, &args.path).await?;
    let mut stream = content.stream;

    let mut sink: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = match &args.out {
        Some(out) => Box::new(tokio::fs::File::create(out).await.map_err(|e| {
            AppError::from_io(format!("Failed to create {}", out.display()), e)
        })?),
        None => Box::new(tokio::io::stdout()),
    };

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::from_io("Failed to read file", e))?;
        sink.write_all(&chunk)
            .await
            .map_err(|e| AppError::from_io("Failed to write output", e))?;
    }
    sink.flush()
        .await
        .map_err(|e| AppError::from_io("Failed to write output", e))?;

    if let Some(out) = &args.out {
        output::print_success(&format!(
            "Saved '{}' ({}) to {}",
            content.filename,
            output::human_bytes(content.size),
            out.display()
        ));
    }
    Ok(())
}

/// `mv`
pub async fn mv(
    args: &TransferArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let record = app
        .files
        .move_item(ctx, &args.path, &args.dest, args.kind)
        .await?;
    print_record(&record, "Moved to", format);
    Ok(())
}

/// `cp`
pub async fn cp(
    args: &TransferArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let record = app.files.copy(ctx, &args.path, &args.dest, args.kind).await?;
    print_record(&record, "Copied to", format);
    Ok(())
}

/// `rename`
pub async fn rename(
    args: &RenameArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let record = app
        .files
        .rename(ctx, &args.path, &args.new_name, args.kind)
        .await?;
    print_record(&record, "Renamed to", format);
    Ok(())
}

/// `rm`
pub async fn rm(args: &RmArgs, app: &App, ctx: &RequestContext) -> Result<(), AppError> {
    if !args.force {
        let prompt = match args.kind {
            ItemKind::File => format!("Delete file '{}'?", args.path),
            ItemKind::Folder => format!("Delete folder '{}' and everything in it?", args.path),
        };
        let confirm = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
        if !confirm {
            output::print_warning("Aborted.");
            return Ok(());
        }
    }

    app.files.delete(ctx, &args.path, args.kind).await?;
    output::print_success(&format!("Deleted {} '{}'", args.kind, args.path));
    Ok(())
}

/// `search`
pub async fn search(
    args: &SearchArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let hits = app
        .search
        .search(
            ctx,
            SearchRequest {
                query: args.query.clone(),
                kind: args.kind,
                limit: args.limit,
            },
        )
        .await?;

    match format {
        OutputFormat::Json => output::print_item(&hits, format),
        OutputFormat::Table => {
            let rows: Vec<RecordRow> = hits.iter().map(RecordRow::from).collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
