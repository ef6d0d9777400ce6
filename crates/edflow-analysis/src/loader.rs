//! Reading and joining the visit extracts
//!
//! Two delimited files feed the pipeline:
//!
//! - the **primary** extract with one row per visit: identifier, service
//!   category and sub-category, and the five stage timestamps
//! - the **priority** extract with the triage priority per visit identifier,
//!   possibly repeated and possibly in a legacy single-byte encoding
//!
//! Reading is strict: a file that does not decode, a missing column, or a
//! cell that does not parse aborts the load. Joining is lenient: duplicate
//! priority rows collapse to the first occurrence and visits without a
//! priority keep `None`.

use std::{
    collections::{HashMap, hash_map::Entry},
    fs,
    io,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::visit::{Priority, Visit};

/// How a delimited source file is decoded and split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// WHATWG encoding label such as `utf-8`, `windows-1252` or `latin1`.
    pub encoding: String,
    /// Field delimiter, a single ASCII character.
    pub delimiter: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_owned(),
            delimiter: ',',
        }
    }
}

/// Header names of the primary extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryColumns {
    pub visit_id: String,
    pub category: String,
    pub sub_category: String,
    pub counter_exit: String,
    pub triage_entry: String,
    pub triage_exit: String,
    pub service_entry: String,
    pub service_exit: String,
}

impl Default for PrimaryColumns {
    fn default() -> Self {
        Self {
            visit_id: "visit_id".to_owned(),
            category: "category".to_owned(),
            sub_category: "sub_category".to_owned(),
            counter_exit: "counter_exit".to_owned(),
            triage_entry: "triage_entry".to_owned(),
            triage_exit: "triage_exit".to_owned(),
            service_entry: "service_entry".to_owned(),
            service_exit: "service_exit".to_owned(),
        }
    }
}

/// Header names of the priority extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityColumns {
    pub visit_id: String,
    pub priority: String,
}

impl Default for PriorityColumns {
    fn default() -> Self {
        Self {
            visit_id: "visit_id".to_owned(),
            priority: "priority".to_owned(),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadError {
    #[display("failed to read {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("unknown encoding label {label:?} for {}", path.display())]
    UnknownEncoding {
        path: PathBuf,
        label: String,
    },
    #[display("{} is not valid {encoding}", path.display())]
    Encoding {
        path: PathBuf,
        encoding: &'static str,
    },
    #[display("delimiter {delimiter:?} for {} is not a single ASCII character", path.display())]
    Delimiter {
        path: PathBuf,
        delimiter: char,
    },
    #[display("malformed delimited data in {}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[display("{} has no column {column:?}", path.display())]
    MissingColumn {
        path: PathBuf,
        column: String,
    },
    #[display("{}:{line}: cannot parse timestamp {value:?} in column {column:?}", path.display())]
    Timestamp {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
    #[display("{}:{line}: cannot parse priority {value:?}", path.display())]
    Priority {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// A decoded delimited file: header names and string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub path: PathBuf,
    pub headers: Vec<String>,
    /// Data rows with the 1-based line number each came from.
    pub rows: Vec<(u64, Vec<String>)>,
}

impl Table {
    /// Index of the column named `name`.
    pub fn column(&self, name: &str) -> Result<usize, LoadError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| LoadError::MissingColumn {
                path: self.path.clone(),
                column: name.to_owned(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads and decodes `path`, then splits it into a [`Table`].
///
/// A byte-order mark overrides the configured encoding.
pub fn read_source(path: &Path, source: &SourceConfig) -> Result<Table, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    let text = decode(path, &bytes, &source.encoding)?;
    parse_table(path, &text, source)
}

fn decode(path: &Path, bytes: &[u8], label: &str) -> Result<String, LoadError> {
    let configured =
        Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| LoadError::UnknownEncoding {
            path: path.to_owned(),
            label: label.to_owned(),
        })?;
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (configured, bytes),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| LoadError::Encoding {
            path: path.to_owned(),
            encoding: encoding.name(),
        })
}

/// Parses delimited `text` with a header row. Cells are trimmed.
pub fn parse_table(path: &Path, text: &str, source: &SourceConfig) -> Result<Table, LoadError> {
    let delimiter = u8::try_from(source.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| LoadError::Delimiter {
            path: path.to_owned(),
            delimiter: source.delimiter,
        })?;
    let csv_error = |source| LoadError::Csv {
        path: path.to_owned(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_owned)
        .collect();
    let rows = reader
        .records()
        .enumerate()
        .map(|(index, record)| -> Result<_, LoadError> {
            let record = record.map_err(csv_error)?;
            // header is line 1
            let line = record.position().map_or(index as u64 + 2, csv::Position::line);
            Ok((line, record.iter().map(str::to_owned).collect()))
        })
        .collect::<Result<_, _>>()?;

    Ok(Table {
        path: path.to_owned(),
        headers,
        rows,
    })
}

/// Parses a timestamp cell with the first matching format.
///
/// An empty cell is a missing stage.
fn parse_timestamp(value: &str, formats: &[String]) -> Result<Option<NaiveDateTime>, ()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(Some)
        .ok_or(())
}

/// Parses a priority cell. A word prefix such as `P` or `Level` is ignored,
/// an empty cell has no priority. Signs and other symbols are rejected.
fn parse_priority(value: &str) -> Result<Option<Priority>, ()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let digits = value.trim_start_matches(|c: char| c.is_alphabetic() || c.is_whitespace());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    digits
        .parse::<u8>()
        .ok()
        .and_then(Priority::new)
        .map(Some)
        .ok_or(())
}

/// Converts the primary extract into visits with no priority yet.
pub fn parse_primary_visits(
    table: &Table,
    columns: &PrimaryColumns,
    timestamp_formats: &[String],
) -> Result<Vec<Visit>, LoadError> {
    let id = table.column(&columns.visit_id)?;
    let category = table.column(&columns.category)?;
    let sub_category = table.column(&columns.sub_category)?;
    let stages = [
        &columns.counter_exit,
        &columns.triage_entry,
        &columns.triage_exit,
        &columns.service_entry,
        &columns.service_exit,
    ]
    .map(|name| table.column(name).map(|index| (index, name)));
    let mut stage_columns = Vec::with_capacity(stages.len());
    for stage in stages {
        stage_columns.push(stage?);
    }

    table
        .rows
        .iter()
        .map(|(line, row)| -> Result<Visit, LoadError> {
            let cell = |index: usize| row.get(index).map_or("", String::as_str);
            let mut timestamps = [None; 5];
            for (slot, &(index, name)) in timestamps.iter_mut().zip(&stage_columns) {
                *slot = parse_timestamp(cell(index), timestamp_formats).map_err(|()| {
                    LoadError::Timestamp {
                        path: table.path.clone(),
                        line: *line,
                        column: name.clone(),
                        value: cell(index).to_owned(),
                    }
                })?;
            }
            let [counter_exit, triage_entry, triage_exit, service_entry, service_exit] =
                timestamps;
            Ok(Visit {
                id: cell(id).to_owned(),
                category: cell(category).to_owned(),
                sub_category: cell(sub_category).to_owned(),
                priority: None,
                counter_exit,
                triage_entry,
                triage_exit,
                service_entry,
                service_exit,
            })
        })
        .collect()
}

/// Converts the priority extract into `(visit id, priority)` pairs in file
/// order, duplicates included.
pub fn parse_priorities(
    table: &Table,
    columns: &PriorityColumns,
) -> Result<Vec<(String, Option<Priority>)>, LoadError> {
    let id = table.column(&columns.visit_id)?;
    let priority = table.column(&columns.priority)?;
    table
        .rows
        .iter()
        .map(|(line, row)| -> Result<_, LoadError> {
            let cell = |index: usize| row.get(index).map_or("", String::as_str);
            let level = parse_priority(cell(priority)).map_err(|()| LoadError::Priority {
                path: table.path.clone(),
                line: *line,
                value: cell(priority).to_owned(),
            })?;
            Ok((cell(id).to_owned(), level))
        })
        .collect()
}

/// Primary visits augmented with their priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedVisits {
    pub visits: Vec<Visit>,
    /// Identifiers that appear more than once in the priority extract.
    pub duplicate_keys: usize,
    /// Priority rows dropped because an earlier row had the same identifier.
    pub collapsed_rows: usize,
    /// Visits with no row in the priority extract.
    pub unmatched: usize,
}

/// Left-joins priorities onto `visits` by identifier.
///
/// Only the first priority row per identifier is used, so the result has
/// exactly as many visits as the input.
#[must_use]
pub fn join_priorities(
    visits: Vec<Visit>,
    priorities: Vec<(String, Option<Priority>)>,
) -> JoinedVisits {
    let mut first = HashMap::<String, (Option<Priority>, usize)>::new();
    for (id, priority) in priorities {
        match first.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert((priority, 1));
            }
            Entry::Occupied(mut entry) => entry.get_mut().1 += 1,
        }
    }
    let duplicate_keys = first.values().filter(|(_, count)| *count > 1).count();
    let collapsed_rows = first.values().map(|(_, count)| count - 1).sum();

    let mut unmatched = 0;
    let visits = visits
        .into_iter()
        .map(|visit| match first.get(&visit.id) {
            Some(&(priority, _)) => Visit { priority, ..visit },
            None => {
                unmatched += 1;
                visit
            }
        })
        .collect();

    if duplicate_keys > 0 {
        tracing::warn!(
            duplicate_keys,
            collapsed_rows,
            "priority extract has repeated visit ids, first occurrence kept"
        );
    }
    if unmatched > 0 {
        tracing::warn!(unmatched, "visits without a priority row");
    }

    JoinedVisits {
        visits,
        duplicate_keys,
        collapsed_rows,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<String> {
        vec!["%Y-%m-%d %H:%M:%S%.f".to_owned(), "%d/%m/%Y %H:%M".to_owned()]
    }

    fn table(text: &str) -> Table {
        parse_table(Path::new("test.csv"), text, &SourceConfig::default()).unwrap()
    }

    const PRIMARY: &str = "\
visit_id,category,sub_category,counter_exit,triage_entry,triage_exit,service_entry,service_exit
a,Adult,Trauma,2023-03-01 08:00:00,2023-03-01 08:00:05,2023-03-01 08:00:20,2023-03-01 08:00:25,2023-03-01 10:30:00
b,Pediatric, Respiratory ,01/03/2023 09:00,01/03/2023 09:05,,,
";

    #[test]
    fn test_parse_primary_visits() {
        let visits = parse_primary_visits(&table(PRIMARY), &PrimaryColumns::default(), &formats())
            .unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].id, "a");
        assert!(visits[0].service_exit.is_some());
        assert_eq!(visits[1].sub_category, "Respiratory");
        assert!(visits[1].triage_entry.is_some());
        assert!(visits[1].triage_exit.is_none());
    }

    #[test]
    fn test_bad_timestamp_is_fatal_with_line() {
        let text = "visit_id,category,sub_category,counter_exit,triage_entry,triage_exit,service_entry,service_exit\n\
                    a,Adult,Trauma,yesterday,,,,\n";
        let err = parse_primary_visits(&table(text), &PrimaryColumns::default(), &formats())
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Timestamp { line: 2, ref column, .. } if column == "counter_exit"
        ));
    }

    #[test]
    fn test_missing_column_is_named() {
        let err = parse_priorities(&table("visit_id,level\na,1\n"), &PriorityColumns::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "test.csv has no column \"priority\"");
    }

    #[test]
    fn test_signed_priority_is_fatal_with_line() {
        let err = parse_priorities(
            &table("visit_id,priority\na,P2\nb,-1\n"),
            &PriorityColumns::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "test.csv:3: cannot parse priority \"-1\"");
    }

    #[test]
    fn test_parse_priority_forms() {
        assert_eq!(parse_priority("3"), Ok(Priority::new(3)));
        assert_eq!(parse_priority(" P2 "), Ok(Priority::new(2)));
        assert_eq!(parse_priority("Level 1"), Ok(Priority::new(1)));
        assert_eq!(parse_priority(""), Ok(None));
        assert_eq!(parse_priority("7"), Err(()));
        assert_eq!(parse_priority("urgent"), Err(()));
        assert_eq!(parse_priority("-1"), Err(()));
        assert_eq!(parse_priority("P-3"), Err(()));
        assert_eq!(parse_priority("+2"), Err(()));
        assert_eq!(parse_priority("Level 2a"), Err(()));
    }

    #[test]
    fn test_decode_legacy_encoding() {
        // "Pediatría" in windows-1252
        let bytes = b"visit_id;category\na;Pediatr\xeda\n";
        let text = decode(Path::new("p.csv"), bytes, "latin1").unwrap();
        let source = SourceConfig {
            encoding: "latin1".to_owned(),
            delimiter: ';',
        };
        let table = parse_table(Path::new("p.csv"), &text, &source).unwrap();
        assert_eq!(table.rows[0].1[1], "Pediatría");
    }

    #[test]
    fn test_malformed_utf8_is_fatal() {
        let err = decode(Path::new("p.csv"), b"id\n\xff\xfe\xfd\n", "utf-8").unwrap_err();
        assert!(matches!(err, LoadError::Encoding { encoding: "UTF-8", .. }));
        assert!(matches!(
            decode(Path::new("p.csv"), b"id\n", "no-such-encoding"),
            Err(LoadError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let text = decode(Path::new("p.csv"), b"\xef\xbb\xbfvisit_id\na\n", "windows-1252").unwrap();
        assert!(text.starts_with("visit_id"));
    }

    #[test]
    fn test_join_keeps_first_priority_and_row_count() {
        let visits = parse_primary_visits(&table(PRIMARY), &PrimaryColumns::default(), &formats())
            .unwrap();
        let priorities = vec![
            ("a".to_owned(), Priority::new(2)),
            ("a".to_owned(), Priority::new(4)),
            ("a".to_owned(), Priority::new(1)),
            ("z".to_owned(), Priority::new(3)),
        ];
        let joined = join_priorities(visits.clone(), priorities);
        assert_eq!(joined.visits.len(), visits.len());
        assert_eq!(joined.visits[0].priority, Priority::new(2));
        assert_eq!(joined.visits[1].priority, None);
        assert_eq!(joined.duplicate_keys, 1);
        assert_eq!(joined.collapsed_rows, 2);
        assert_eq!(joined.unmatched, 1);
    }
}
