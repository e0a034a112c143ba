//! Comma-separated tables of assignments and results.
//!
//! Format: a header row with parameter names followed by output names, then
//! one row per assignment (or per replicate for raw results). Fields that
//! contain a comma, a double quote or a line break are double-quoted, with
//! embedded quotes doubled. Records never span lines.

use crate::error::{Error, Result};
use crate::evaluator::EvaluationResult;
use crate::param::{Assignment, Batch, ParameterSpec, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// A parsed table: header plus raw string rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parses CSV text. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] when the header is missing, a quote is
    /// unterminated or a row has the wrong number of fields.
    pub fn parse(source_name: &str, text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
            .filter(|(_, l)| !l.trim().is_empty());
        let Some((header_row, header_line)) = lines.next() else {
            return Err(Error::malformed(source_name, 1, "missing header"));
        };
        let header = split_record(header_line)
            .map_err(|m| Error::malformed(source_name, header_row, m))?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for (row, line) in lines {
            let fields = split_record(line).map_err(|m| Error::malformed(source_name, row, m))?;
            if fields.len() != header.len() {
                return Err(Error::malformed(
                    source_name,
                    row,
                    format!("expected {} fields, found {}", header.len(), fields.len()),
                ));
            }
            rows.push(fields);
        }
        Ok(Self { header, rows })
    }

    /// Reads and parses a file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Renders the table as CSV text, ending with a newline.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_record(&mut out, &self.header);
        for row in &self.rows {
            push_record(&mut out, row);
        }
        out
    }

    /// Writes the table to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_text(path, &self.to_csv())
    }
}

/// Splits one CSV record into fields.
fn split_record(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;
    let mut at_field_start = true;
    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                quoted = true;
                at_field_start = false;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            _ => {
                field.push(c);
                at_field_start = false;
            }
        }
    }
    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

/// Quotes a field when it needs it.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(f.as_ref()));
    }
    out.push('\n');
}

/// Writes `text` to `path`, mapping failures to [`Error::Io`].
pub fn write_text(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, text).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Builds assignments from a parsed table.
///
/// Every parameter in `specs` must have a column; other columns (outputs,
/// for instance) are ignored. Each field is coerced to its parameter kind.
pub fn assignments_from_table(source_name: &str, table: &Table, specs: &[ParameterSpec]) -> Result<Batch> {
    let mut columns = Vec::with_capacity(specs.len());
    for spec in specs {
        let idx = table.column(&spec.name).ok_or_else(|| {
            Error::malformed(source_name, 1, format!("no column for parameter '{}'", spec.name))
        })?;
        columns.push((spec, idx));
    }
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            // header is row 1
            let row_no = i + 2;
            columns
                .iter()
                .map(|(spec, idx)| {
                    spec.coerce(&row[*idx])
                        .map(|v| (spec.name.clone(), v))
                        .map_err(|m| Error::malformed(source_name, row_no, format!("{}: {m}", spec.name)))
                })
                .collect::<Result<Assignment>>()
        })
        .collect()
}

/// Reads a batch of assignments from a CSV file.
pub fn read_assignments(path: impl AsRef<Path>, specs: &[ParameterSpec]) -> Result<Batch> {
    let path = path.as_ref();
    let table = Table::read(path)?;
    let batch = assignments_from_table(&path.display().to_string(), &table, specs)?;
    debug!(path = %path.display(), rows = batch.len(), "read assignments");
    Ok(batch)
}

/// Builds assignments from in-memory records, one per record.
///
/// Values are converted to the declared kind of each parameter. Records
/// are numbered from 1 in errors.
pub fn assignments_from_list(records: &[BTreeMap<String, Value>], specs: &[ParameterSpec]) -> Result<Batch> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            specs
                .iter()
                .map(|spec| {
                    let raw = record.get(&spec.name).cloned().ok_or_else(|| {
                        Error::malformed("list", i + 1, format!("missing parameter '{}'", spec.name))
                    })?;
                    spec.coerce_value(raw)
                        .map(|v| (spec.name.clone(), v))
                        .map_err(|m| Error::malformed("list", i + 1, format!("{}: {m}", spec.name)))
                })
                .collect::<Result<Assignment>>()
        })
        .collect()
}

/// Table of a batch: one column per parameter, one row per assignment.
pub fn batch_table(specs: &[ParameterSpec], batch: &[Assignment]) -> Table {
    Table {
        header: specs.iter().map(|s| s.name.clone()).collect(),
        rows: batch
            .iter()
            .map(|a| {
                specs
                    .iter()
                    .map(|s| a.get(&s.name).map(Value::to_string).unwrap_or_default())
                    .collect()
            })
            .collect(),
    }
}

/// Writes a batch so that [`read_assignments`] reproduces it.
pub fn write_assignments(path: impl AsRef<Path>, specs: &[ParameterSpec], batch: &[Assignment]) -> Result<()> {
    batch_table(specs, batch).write(path)
}

/// Raw results table: parameters then outputs, one row per replicate.
///
/// Assignments are written in `order`. An assignment whose outputs have
/// different replicate counts is skipped with a warning; one without a
/// result is skipped silently.
pub fn results_table(
    parameters: &[String],
    outputs: &[String],
    order: &[Assignment],
    results: &HashMap<Assignment, EvaluationResult>,
) -> Table {
    let mut header = parameters.to_vec();
    header.extend(outputs.iter().cloned());
    let mut rows = Vec::new();
    for a in order {
        let Some(result) = results.get(a) else {
            continue;
        };
        let series: Vec<&[f64]> = outputs
            .iter()
            .map(|o| result.get(o).unwrap_or(&[]))
            .collect();
        let replicates = series.first().map_or(0, |s| s.len());
        if series.iter().any(|s| s.len() != replicates) {
            warn!(assignment = %a, "outputs have unequal replicate counts, skipped in export");
            continue;
        }
        let prefix: Vec<String> = parameters
            .iter()
            .map(|p| a.get(p).map(Value::to_string).unwrap_or_default())
            .collect();
        for r in 0..replicates {
            let mut row = prefix.clone();
            row.extend(series.iter().map(|s| s[r].to_string()));
            rows.push(row);
        }
    }
    Table { header, rows }
}

/// Writes the raw results table to `path`.
pub fn write_results(
    path: impl AsRef<Path>,
    parameters: &[String],
    outputs: &[String],
    order: &[Assignment],
    results: &HashMap<Assignment, EvaluationResult>,
) -> Result<()> {
    results_table(parameters, outputs, order, results).write(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Point;

    fn specs() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::int("n", 0, 10),
            ParameterSpec::float("rate", 0.0, 1.0),
            ParameterSpec::boolean("flag"),
            ParameterSpec::point("loc", Point::default(), Point::new(5.0, 5.0, 0.0)),
            ParameterSpec::enumerated("policy", ["greedy", "a,b"]),
        ]
    }

    #[test]
    fn test_split_record_quotes() {
        assert_eq!(
            split_record(r#"a,"b,c","say ""hi""",,"#).unwrap_or_default(),
            vec!["a", "b,c", r#"say "hi""#, "", ""]
        );
        assert!(split_record(r#""open"#).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let specs = specs();
        let batch = vec![
            Assignment::from_pairs([
                ("n", Value::Int(3)),
                ("rate", Value::Float(0.1 + 0.2)),
                ("flag", Value::Bool(true)),
                ("loc", Value::Point(Point::new(1.5, 2.0, 0.0))),
                ("policy", Value::from("a,b")),
            ]),
            Assignment::from_pairs([
                ("n", Value::Int(-7)),
                ("rate", Value::Float(1e-9)),
                ("flag", Value::Bool(false)),
                ("loc", Value::Point(Point::new(0.0, 0.0, 0.0))),
                ("policy", Value::from("greedy")),
            ]),
        ];
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.csv");
        write_assignments(&path, &specs, &batch).expect("write");
        let read = read_assignments(&path, &specs).expect("read");
        assert_eq!(read, batch);
    }

    #[test]
    fn test_malformed_row_is_named() {
        let text = "n,rate,flag,loc,policy\n1,0.5,true,\"{0,0}\",greedy\n2,oops,true,\"{0,0}\",greedy\n";
        let table = Table::parse("plan.csv", text).expect("parse");
        let err = assignments_from_table("plan.csv", &table, &specs());
        match err {
            Err(Error::MalformedInput { source_name, row, .. }) => {
                assert_eq!(source_name, "plan.csv");
                assert_eq!(row, 3);
            }
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_field_count() {
        let err = Table::parse("t", "a,b\n1\n");
        assert!(matches!(err, Err(Error::MalformedInput { row: 2, .. })));
    }

    #[test]
    fn test_missing_column() {
        let table = Table::parse("t", "n\n1\n").expect("parse");
        assert!(matches!(
            assignments_from_table("t", &table, &specs()),
            Err(Error::MalformedInput { row: 1, .. })
        ));
    }

    #[test]
    fn test_from_list_coerces() {
        let specs = vec![ParameterSpec::float("x", 0.0, 1.0), ParameterSpec::int("n", 0, 5)];
        let records = vec![BTreeMap::from([
            ("x".to_string(), Value::Int(1)),
            ("n".to_string(), Value::from("4")),
        ])];
        let batch = assignments_from_list(&records, &specs).expect("list");
        assert_eq!(batch[0].get("x"), Some(&Value::Float(1.0)));
        assert_eq!(batch[0].get("n"), Some(&Value::Int(4)));

        let incomplete = vec![BTreeMap::from([("x".to_string(), Value::Float(0.5))])];
        assert!(matches!(
            assignments_from_list(&incomplete, &specs),
            Err(Error::MalformedInput { row: 1, .. })
        ));
    }

    #[test]
    fn test_results_table_skips_ragged() {
        let a = Assignment::from_pairs([("x", 1)]);
        let b = Assignment::from_pairs([("x", 2)]);
        let results = HashMap::from([
            (
                a.clone(),
                EvaluationResult::new().with_output("y", [1.0, 2.0]).with_output("z", [3.0, 4.0]),
            ),
            (
                b.clone(),
                EvaluationResult::new().with_output("y", [1.0]).with_output("z", [3.0, 4.0]),
            ),
        ]);
        let table = results_table(
            &["x".to_string()],
            &["y".to_string(), "z".to_string()],
            &[a, b],
            &results,
        );
        assert_eq!(table.header, vec!["x", "y", "z"]);
        assert_eq!(
            table.rows,
            vec![vec!["1", "1", "3"], vec!["1", "2", "4"]]
        );
    }
}
