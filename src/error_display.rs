//! Short, user-facing messages for load failures.
//!
//! Matches on typed errors (PolarsError variants, io::ErrorKind, calamine errors)
//! instead of parsing strings.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::Duplicate(msg) => format!("Duplicate column name: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Rows of unequal length: {}", msg),
        PE::ComputeError(msg) => first_line(msg),
        PE::Context { error, msg } => format!("{}: {}", msg, user_message_from_polars(error)),
        #[allow(unreachable_patterns)]
        _ => first_line(&err.to_string()),
    }
}

pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::IsADirectory => "Path is a directory, not a file.".to_string(),
        _ => err.to_string(),
    };
    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

pub fn user_message_from_spreadsheet(err: &calamine::Error) -> String {
    match err {
        calamine::Error::Io(e) => user_message_from_io(e, None),
        other => format!("Not a readable spreadsheet: {}", first_line(&other.to_string())),
    }
}

/// Walk the cause chain of `report` for a known error type. `path`, when
/// given, prefixes the message.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let msg = report
        .chain()
        .find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<PolarsError>() {
                Some(user_message_from_polars(e))
            } else if let Some(e) = cause.downcast_ref::<io::Error>() {
                Some(user_message_from_io(e, None))
            } else {
                cause
                    .downcast_ref::<calamine::Error>()
                    .map(user_message_from_spreadsheet)
            }
        })
        .unwrap_or_else(|| first_line(&report.to_string()));
    match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    }
}

fn first_line(msg: &str) -> String {
    msg.lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("An error occurred")
        .to_string()
}
