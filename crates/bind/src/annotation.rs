//! Parsing of binding annotations.
//!
//! An annotation has the shape `<kind>[:<name>]`, for example `body`, `header:Authorization`
//! or `query:page`. Only the first comma separated segment is significant, so `query:page,omitempty`
//! reads as `query:page`. An empty annotation or `-` marks a field the binder ignores.

use std::fmt;

/// The request source a field is bound from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Body,
    Header,
    Query,
    Path,
    Cookie,
    Form,
    File,
}

impl BindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BindingKind::Body => "body",
            BindingKind::Header => "header",
            BindingKind::Query => "query",
            BindingKind::Path => "path",
            BindingKind::Cookie => "cookie",
            BindingKind::Form => "form",
            BindingKind::File => "file",
        }
    }

    /// whether the kind interprets the request payload as encoded form data
    pub fn reads_form_payload(self) -> bool {
        matches!(self, BindingKind::Form | BindingKind::File)
    }

    fn parse(kind: &str) -> Option<Self> {
        let kind = match kind {
            "body" => BindingKind::Body,
            "header" => BindingKind::Header,
            "query" => BindingKind::Query,
            "path" => BindingKind::Path,
            "cookie" => BindingKind::Cookie,
            "form" => BindingKind::Form,
            "file" => BindingKind::File,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed annotation. `name` is empty for `body`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation<'a> {
    pub kind: BindingKind,
    pub name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedAnnotation<'a> {
    /// no annotation, or the explicit `-` marker
    Ignored,
    Binding(Annotation<'a>),
    /// the kind is unknown, or `body` carries a name
    Invalid,
}

pub fn parse_annotation(raw: &str) -> ParsedAnnotation<'_> {
    let normalized = raw.split(',').next().unwrap_or_default().trim();
    if normalized.is_empty() || normalized == "-" {
        return ParsedAnnotation::Ignored;
    }

    let (kind, name) = match normalized.split_once(':') {
        Some((kind, name)) => (kind, Some(name)),
        None => (normalized, None),
    };

    match (BindingKind::parse(kind), name) {
        (Some(BindingKind::Body), None) => ParsedAnnotation::Binding(Annotation { kind: BindingKind::Body, name: "" }),
        (Some(BindingKind::Body), Some(_)) | (None, _) => ParsedAnnotation::Invalid,
        (Some(kind), name) => ParsedAnnotation::Binding(Annotation { kind, name: name.unwrap_or_default() }),
    }
}
