//! Bulk load of `name,unit` CSV rows into the ingredient catalog.

use std::path::Path;

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};

use super::repo;

const BATCH: usize = 1000;

/// Splits CSV text into records of fields. Quoted fields may contain
/// commas, doubled quotes and line breaks. `\r\n` and `\n` end a record.
pub fn records(contents: &str) -> Vec<Vec<String>> {
    let contents = contents.trim_start_matches('\u{feff}');
    let mut out = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                out.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        out.push(record);
    }
    out
}

/// Exactly two non-blank fields make a row; anything else is skipped.
pub fn parse(contents: &str) -> Vec<(String, String)> {
    records(contents)
        .into_iter()
        .enumerate()
        .filter_map(|(n, rec)| match rec.as_slice() {
            [only] if only.trim().is_empty() => None,
            [name, unit] if !name.trim().is_empty() && !unit.trim().is_empty() => {
                Some((name.trim().to_string(), unit.trim().to_string()))
            }
            _ => {
                warn!(record = n + 1, fields = rec.len(), "skipping malformed ingredient row");
                None
            }
        })
        .collect()
}

pub async fn import_file(db: &PgPool, path: &Path) -> anyhow::Result<u64> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let rows = parse(&contents);

    let mut inserted = 0;
    for chunk in rows.chunks(BATCH) {
        inserted += repo::insert_many(db, chunk).await?;
    }
    info!(path = %path.display(), parsed = rows.len(), inserted, "ingredients imported");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str) -> (String, String) {
        (name.into(), unit.into())
    }

    #[test]
    fn parses_plain_and_quoted_rows() {
        let rows = parse("абрикосы,г\n\"бульон, куриный\",мл\r\n\"12\"\" pizza dough\",pcs\n");
        assert_eq!(
            rows,
            vec![
                row("абрикосы", "г"),
                row("бульон, куриный", "мл"),
                row("12\" pizza dough", "pcs"),
            ]
        );
    }

    #[test]
    fn quoted_unit_may_contain_a_comma() {
        assert_eq!(parse("Saffron,\"pinch, small\"\n"), vec![row("Saffron", "pinch, small")]);
    }

    #[test]
    fn quoted_field_may_span_lines() {
        let rows = parse("\"Two-line\nname\",g\nSalt,g");
        assert_eq!(rows, vec![row("Two-line\nname", "g"), row("Salt", "g")]);
    }

    #[test]
    fn skips_blank_short_and_wide_rows() {
        let rows = parse("Sugar,g\n\nbroken\n,g\nFlour,g,extra\nSalt,g\n");
        assert_eq!(rows, vec![row("Sugar", "g"), row("Salt", "g")]);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        assert_eq!(parse("\u{feff}Milk,ml"), vec![row("Milk", "ml")]);
    }
}
