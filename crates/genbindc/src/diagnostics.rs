//! Ariadne-based rendering of catalog and closing faults.
//!
//! Each fault gets its code, a terse message, a label on the catalog value
//! it was traced to and, where one exists, a hint. In JSON mode the same
//! information is emitted as a single-line object.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use genbind_catalog::CatalogError;
use genbind_types::ClosingError;

/// How diagnostics are rendered.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

fn label_message(error: &CatalogError) -> String {
    match error {
        CatalogError::Io { .. } => String::new(),
        CatalogError::Toml { .. } => "here".to_string(),
        CatalogError::Shape { message, .. } => message.clone(),
        CatalogError::DuplicateComponent { .. } => "declared again here".to_string(),
        CatalogError::InvalidDemand { .. } => "in this demand".to_string(),
        CatalogError::Closing { source, .. } => match source {
            ClosingError::UnknownType { name } => format!("`{}` is not defined", name),
            ClosingError::DuplicateType { .. } => "defined again here".to_string(),
            ClosingError::UnknownParameter { .. } | ClosingError::ParameterGap { .. } => {
                "in this definition".to_string()
            }
            ClosingError::ArityMismatch { expected, .. } => {
                format!("expects {} type argument(s)", expected)
            }
            ClosingError::MatchContract { .. } => "while closing this".to_string(),
            ClosingError::NotGeneric { name } => format!("`{}` has no type parameters", name),
            ClosingError::UnknownComponent { .. } => "no such component".to_string(),
            ClosingError::OpenArgument { .. } => "must be a closed type".to_string(),
            ClosingError::PropagationDepth { ty, .. } => format!("`{}` nests too deeply", ty),
        },
    }
}

fn help(error: &CatalogError) -> Option<String> {
    match error {
        CatalogError::InvalidDemand { .. } => {
            Some("use `component` with `arguments`, or `offer` alone".to_string())
        }
        CatalogError::Closing { source, .. } => match source {
            ClosingError::UnknownType { name } => {
                Some(format!("add a [[type]] entry named `{}`", name))
            }
            ClosingError::ParameterGap {
                owner, position, ..
            } => Some(format!(
                "mention parameter {} of `{}` in the dependency shape",
                position, owner
            )),
            ClosingError::NotGeneric { .. } => {
                Some("components must be open generic definitions".to_string())
            }
            ClosingError::PropagationDepth { .. } => {
                Some("raise `options.max_depth` or break the dependency cycle".to_string())
            }
            _ => None,
        },
        _ => None,
    }
}

/// Render an error against the catalog source.
pub fn render_diagnostic(
    error: &CatalogError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    if options.json {
        return render_json(error, source, filename);
    }

    let message = error.to_string();
    let Some(span) = error.span().map(|s| char_span(source, clamp(s, source.len()))) else {
        return format!("error[{}]: {}\n", error.code(), message);
    };

    let mut builder = Report::build(ReportKind::Error, (filename, span.clone()))
        .with_code(error.code())
        .with_message(&message)
        .with_config(Config::default().with_color(options.color))
        .with_label(
            Label::new((filename, span))
                .with_message(label_message(error))
                .with_color(Color::Red),
        );
    if let Some(help) = help(error) {
        builder.set_help(help);
    }

    let mut buf = Vec::new();
    if builder
        .finish()
        .write((filename, Source::from(source)), &mut buf)
        .is_err()
    {
        return format!("error[{}]: {}\n", error.code(), message);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn render_json(error: &CatalogError, source: &str, filename: &str) -> String {
    let spans: Vec<serde_json::Value> = error
        .span()
        .map(|s| clamp(s, source.len()))
        .into_iter()
        .map(|s| {
            serde_json::json!({
                "start": s.start,
                "end": s.end,
                "label": label_message(error),
            })
        })
        .collect();
    serde_json::json!({
        "code": error.code(),
        "severity": "error",
        "message": error.to_string(),
        "file": filename,
        "spans": spans,
        "fix": help(error),
    })
    .to_string()
}

/// Keep a span inside the source and at least one byte wide.
fn clamp(span: Range<usize>, len: usize) -> Range<usize> {
    let start = span.start.min(len);
    let end = span.end.min(len).max(start);
    if start == end {
        start..(end + 1).min(len)
    } else {
        start..end
    }
}

/// Catalog spans are byte offsets; ariadne counts characters.
fn char_span(source: &str, span: Range<usize>) -> Range<usize> {
    let chars_before = |byte: usize| source.char_indices().take_while(|(i, _)| *i < byte).count();
    chars_before(span.start)..chars_before(span.end)
}
