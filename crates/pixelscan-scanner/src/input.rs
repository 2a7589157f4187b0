//! Batch input parsing.
//!
//! Two formats are accepted, told apart by content: a plain list with one
//! target per line, or CSV whose header names a url column and optionally a
//! correlation-id column.

use crate::error::{BatchError, Result};
use std::path::Path;

const ID_COLUMNS: &[&str] = &["custom_id", "correlation_id", "id"];
const URL_COLUMNS: &[&str] = &["url", "domain", "website"];

/// One raw input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTarget {
    /// The target as written in the input
    pub input: String,
    /// External identifier used to join results back
    pub correlation_id: Option<String>,
}

impl RawTarget {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            correlation_id: None,
        }
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Read and parse a target file.
pub fn read_targets(path: &Path) -> Result<Vec<RawTarget>> {
    let content = std::fs::read_to_string(path).map_err(|source| BatchError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    parse_targets(&content)
}

/// Parse targets from either supported format.
pub fn parse_targets(content: &str) -> Result<Vec<RawTarget>> {
    let first = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'));

    match first {
        Some(header) if is_csv_header(header) => parse_csv(content),
        Some(_) => Ok(parse_lines(content)),
        None => Ok(Vec::new()),
    }
}

fn is_csv_header(line: &str) -> bool {
    line.contains(',')
        && line
            .split(',')
            .any(|cell| URL_COLUMNS.contains(&normalize_header(cell).as_str()))
}

fn normalize_header(cell: &str) -> String {
    cell.trim().trim_matches('"').trim().to_lowercase()
}

fn parse_lines(content: &str) -> Vec<RawTarget> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(RawTarget::new)
        .collect()
}

fn parse_csv(content: &str) -> Result<Vec<RawTarget>> {
    let body: String = content
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let column = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| headers.iter().position(|h| h == name))
    };
    let url_idx = column(URL_COLUMNS).ok_or(BatchError::MissingUrlColumn)?;
    let id_idx = column(ID_COLUMNS);

    let mut targets = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(url) = record.get(url_idx).filter(|u| !u.is_empty()) else {
            continue;
        };

        let correlation_id = id_idx
            .and_then(|idx| record.get(idx))
            .filter(|id| !id.is_empty())
            .map(ToString::to_string);

        targets.push(RawTarget {
            input: url.to_string(),
            correlation_id,
        });
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let content = "# clinics\nexample.com\n\n  https://www.Other.org/  \n# done\n";
        let targets = parse_targets(content).expect("parse");
        assert_eq!(
            targets,
            vec![RawTarget::new("example.com"), RawTarget::new("https://www.Other.org/")]
        );
    }

    #[test]
    fn test_csv_with_ids() {
        let content = "custom_id,name,url\nC-1,Clinic A,clinic-a.com\nC-2,Clinic B,\"https://clinic-b.com\"\n,Clinic C,clinic-c.com\n";
        let targets = parse_targets(content).expect("parse");
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0], RawTarget::new("clinic-a.com").with_correlation_id("C-1"));
        assert_eq!(targets[1].input, "https://clinic-b.com");
        assert_eq!(targets[2].correlation_id, None);
    }

    #[test]
    fn test_csv_header_aliases() {
        let content = "ID,Website\n7,example.com\n";
        let targets = parse_targets(content).expect("parse");
        assert_eq!(targets, vec![RawTarget::new("example.com").with_correlation_id("7")]);

        let content = "Domain\nexample.com\n";
        // Without a comma the header is just another line
        assert_eq!(parse_targets(content).expect("parse").len(), 2);
    }

    #[test]
    fn test_csv_skips_empty_urls_and_short_rows() {
        let content = "correlation_id,domain\na,example.com\nb\nc,\n";
        let targets = parse_targets(content).expect("parse");
        assert_eq!(targets, vec![RawTarget::new("example.com").with_correlation_id("a")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_targets("").expect("parse").is_empty());
        assert!(parse_targets("# nothing\n\n").expect("parse").is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_targets(Path::new("/nonexistent/targets.txt")).expect_err("missing");
        assert!(matches!(err, BatchError::Input { .. }));
    }
}
