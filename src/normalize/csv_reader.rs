//! Already-decoded CSV text to source rows.

use csv::{ReaderBuilder, Trim};

use super::row::{RawValue, SourceRow};
use crate::core::GendocError;

const CANDIDATES: &[u8] = &[b';', b',', b'\t', b'|'];

/// Pick the delimiter that splits the first lines into the most columns
/// consistently. French exports mostly use `;`, which wins ties.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b';';
    let mut best_score = 0usize;
    for &delim in CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == target).count();
        let score = consistent * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }
    best
}

/// Read CSV text with a header line into source rows.
///
/// Row indices are 0-based and count data lines only. Empty cells become
/// [`RawValue::Empty`]; everything else stays text for the normalizer to
/// parse.
pub fn read_csv(text: &str) -> Result<Vec<SourceRow>, GendocError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter = sniff_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| GendocError::MalformedRow {
            row: 0,
            field: "header".into(),
            reason: e.to_string(),
        })?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| GendocError::MalformedRow {
            row: index,
            field: String::new(),
            reason: e.to_string(),
        })?;
        let row = SourceRow::from_pairs(
            index,
            headers.iter().zip(record.iter()).map(|(h, v)| (h, RawValue::from(v))),
        );
        rows.push(row);
    }

    tracing::debug!(
        rows = rows.len(),
        columns = headers.len(),
        delimiter = %char::from(delimiter),
        "read CSV source"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_french_semicolon() {
        let text = "client_nom;designation;prix_unitaire_ht\nACME;Conseil;1,5\n";
        assert_eq!(sniff_delimiter(text), b';');
    }

    #[test]
    fn sniffs_tab_and_pipe() {
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
        assert_eq!(sniff_delimiter("a|b\n1|2\n"), b'|');
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
    }

    #[test]
    fn reads_rows_with_normalized_headers() {
        let text = "\u{feff}Client_Nom;Quantite;Remise\nACME ; 2;\n";
        let rows = read_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index(), 0);
        assert_eq!(rows[0].get("client_nom"), Some(&RawValue::Text("ACME".into())));
        assert_eq!(rows[0].get("remise"), Some(&RawValue::Empty));
    }

    #[test]
    fn ragged_row_is_malformed() {
        let err = read_csv("a;b\n1;2\n3\n").unwrap_err();
        assert!(matches!(err, GendocError::MalformedRow { row: 1, .. }));
    }
}
