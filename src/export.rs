//! Serializations of history and documentation for download.
//!
//! Everything here is pure: callers decide where the bytes go.

use std::fmt::{self, Write};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
#[cfg(feature = "docs")]
use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;

use crate::{
    error::{Result, StudioError},
    models::GenerationResult,
    templates::ContentType,
};

#[cfg(feature = "docs")]
pub const WORD_MIME_TYPE: &str = "application/msword";

/// History export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
    PlainText,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Markdown,
        ExportFormat::PlainText,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Markdown => "md",
            Self::PlainText => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
            Self::Markdown => "text/markdown",
            Self::PlainText => "text/plain",
        }
    }

    /// Suggested download name for a full history export.
    pub fn history_file_name(&self) -> String {
        format!("penpal_history.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "md" | "markdown" => Ok(Self::Markdown),
            "txt" | "text" | "plain" => Ok(Self::PlainText),
            other => Err(StudioError::validation(
                "format",
                format!("unknown export format '{other}'"),
            )),
        }
    }
}

/// A named blob ready to hand to a download or a file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

/// Render the whole history in `format`.
pub fn export_history(records: &[GenerationResult], format: ExportFormat) -> Result<ExportFile> {
    let contents = match format {
        ExportFormat::Json => to_json(records)?,
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Markdown => to_markdown(records),
        ExportFormat::PlainText => to_plain_text(records),
    };
    Ok(ExportFile {
        file_name: format.history_file_name(),
        mime_type: format.mime_type(),
        contents,
    })
}

/// Pretty-printed JSON array in the persisted record shape.
pub fn to_json(records: &[GenerationResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

const CSV_HEADER: [&str; 13] = [
    "id",
    "createdAt",
    "type",
    "genre",
    "tone",
    "language",
    "length",
    "creativity",
    "model",
    "durationMs",
    "estimatedTokens",
    "rating",
    "content",
];

/// Header row plus one row per record. `content` is always quoted.
pub fn to_csv(records: &[GenerationResult]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for record in records {
        let cells = [
            csv_field(&record.id),
            csv_field(&timestamp(&record.created_at)),
            csv_field(record.params.content_type.as_str()),
            csv_field(&record.params.genre),
            csv_field(&record.params.tone),
            csv_field(&record.params.language),
            csv_field(record.params.length.as_str()),
            record.params.creativity.to_string(),
            csv_field(&record.metrics.model_used),
            record.metrics.duration_ms.to_string(),
            record.metrics.estimated_token_count.to_string(),
            record
                .user_rating
                .map(|r| r.stars().to_string())
                .unwrap_or_default(),
            csv_quoted(&record.content),
        ];
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// Quote only when the value contains a comma, quote or line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        csv_quoted(value)
    } else {
        value.to_string()
    }
}

pub fn csv_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// One section per record with a metadata list and the raw Markdown output.
pub fn to_markdown(records: &[GenerationResult]) -> String {
    let mut out = String::from("# PenPal History\n\n");
    if records.is_empty() {
        out.push_str("_No saved generations._\n");
        return out;
    }

    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "## {}. {} ({})\n",
            i + 1,
            record.params.content_type.template().name,
            record.params.genre
        );
        for (label, value) in metadata(record) {
            let _ = writeln!(out, "- **{label}:** {value}");
        }
        out.push('\n');
        out.push_str(record.content.trim_end());
        out.push_str("\n\n---\n\n");
    }
    out
}

/// Same layout as [`to_markdown`] without Markdown markup around the metadata.
pub fn to_plain_text(records: &[GenerationResult]) -> String {
    let mut out = String::from("PENPAL HISTORY\n");
    let rule = "=".repeat(60);
    if records.is_empty() {
        out.push_str("\nNo saved generations.\n");
        return out;
    }

    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n{rule}\n#{} {} / {}\n{rule}",
            i + 1,
            record.params.content_type.template().name,
            record.params.genre
        );
        for (label, value) in metadata(record) {
            let _ = writeln!(out, "{label}: {value}");
        }
        out.push('\n');
        out.push_str(record.content.trim_end());
        out.push('\n');
    }
    out
}

fn metadata(record: &GenerationResult) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Created", timestamp(&record.created_at)),
        ("Tone", record.params.tone.clone()),
        ("Length", record.params.length.to_string()),
        ("Creativity", format!("{:.1}", record.params.creativity)),
        ("Model", record.metrics.model_used.clone()),
        (
            "Duration",
            format!("{:.1}s", record.metrics.duration_ms as f64 / 1000.0),
        ),
        (
            "Estimated tokens",
            record.metrics.estimated_token_count.to_string(),
        ),
        (
            "Rating",
            record
                .user_rating
                .map(|r| format!("{}/5", r.stars()))
                .unwrap_or_else(|| "Unrated".to_string()),
        ),
    ];
    if !record.params.language.is_empty() {
        rows.insert(1, ("Language", record.params.language.clone()));
    }
    rows
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `penpal-{type}-{unix_millis}.md`
pub fn output_file_name(content_type: ContentType, at: DateTime<Utc>) -> String {
    format!("penpal-{}-{}.md", content_type.as_str(), at.timestamp_millis())
}

/// A single generated output as a Markdown download.
pub fn output_download(content_type: ContentType, content: &str, at: DateTime<Utc>) -> ExportFile {
    ExportFile {
        file_name: output_file_name(content_type, at),
        mime_type: ExportFormat::Markdown.mime_type(),
        contents: content.to_string(),
    }
}

/// A titled block of Markdown documentation.
#[cfg(feature = "docs")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocSection {
    pub title: String,
    pub content: String,
}

#[cfg(feature = "docs")]
impl DocSection {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

#[cfg(feature = "docs")]
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// HTML that Word opens as a document, one heading per section.
#[cfg(feature = "docs")]
pub fn word_document(title: &str, sections: &[DocSection]) -> ExportFile {
    let mut body = String::new();
    for section in sections {
        let _ = writeln!(body, "<h1>{}</h1>", escape_html(&section.title));
        body.push_str(&markdown_to_html(&section.content));
        body.push_str("<br style=\"page-break-before: always\">\n");
    }

    let contents = format!(
        "<html xmlns:o='urn:schemas-microsoft-com:office:office' \
xmlns:w='urn:schemas-microsoft-com:office:word' \
xmlns='http://www.w3.org/TR/REC-html40'>\
<head><meta charset='utf-8'><title>{}</title></head><body>\n{}</body></html>",
        escape_html(title),
        body
    );

    let stem: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    ExportFile {
        file_name: format!("{stem}.doc"),
        mime_type: WORD_MIME_TYPE,
        contents,
    }
}

#[cfg(feature = "docs")]
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{GenerationParams, Rating};

    fn sample() -> GenerationResult {
        let params = GenerationParams::new(ContentType::Dialogue)
            .with_genre("Comedy, Romance")
            .with_tone("Witty");
        let mut record = GenerationResult::new(
            "\"Hello,\" she said.\nHe waved.",
            params,
            "gemini-2.5-flash",
            Duration::from_millis(1250),
        )
        .rated(Rating::new(4).unwrap());
        record.id = "rec-1".into();
        record.created_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        record
    }

    #[test]
    fn test_csv_quoting_rules() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_quoted("plain"), "\"plain\"");
    }

    #[test]
    fn test_csv_row() {
        let csv = to_csv(&[sample()]);
        let mut lines = csv.splitn(2, '\n');
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "rec-1,2023-11-14T22:13:20.000Z,dialogue,\"Comedy, Romance\",Witty,English,medium,0.7,\
gemini-2.5-flash,1250,7,4,\"\"\"Hello,\"\" she said.\nHe waved.\"\n"
        );
    }

    #[test]
    fn test_json_matches_persisted_shape() {
        let json = to_json(&[sample()]).unwrap();
        let back: Vec<GenerationResult> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![sample()]);
        assert!(json.contains("\n  {"));
    }

    #[test]
    fn test_markdown_and_text_include_metadata() {
        let md = to_markdown(&[sample()]);
        assert!(md.contains("## 1. Dialogue Scene (Comedy, Romance)"));
        assert!(md.contains("- **Rating:** 4/5"));
        assert!(md.contains("He waved."));

        let txt = to_plain_text(&[sample()]);
        assert!(txt.contains("Model: gemini-2.5-flash"));
        assert!(!txt.contains("**"));
    }

    #[test]
    fn test_output_file_name() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            output_file_name(ContentType::Poem, at),
            "penpal-poem-1700000000123.md"
        );
    }

    #[cfg(feature = "docs")]
    #[test]
    fn test_word_document() {
        let file = word_document(
            "PenPal Docs",
            &[DocSection::new("1. Overview <draft>", "## Goals\n\n**Fast** ideation")],
        );
        assert_eq!(file.mime_type, WORD_MIME_TYPE);
        assert_eq!(file.file_name, "PenPal_Docs.doc");
        assert!(file.contents.contains("<h1>1. Overview &lt;draft&gt;</h1>"));
        assert!(file.contents.contains("<h2>Goals</h2>"));
        assert!(file.contents.contains("<strong>Fast</strong>"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("Markdown".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::PlainText);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
