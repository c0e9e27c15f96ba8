//! Ledger lines to delimited text.

use super::dialect::DialectSpec;
use super::ledger::ExportLine;

/// Render ledger lines in the dialect's layout.
///
/// Lines end with CRLF. Delimiters and line breaks inside a value are
/// replaced by a space, since none of the target formats quote fields.
pub fn render(lines: &[ExportLine], spec: &DialectSpec) -> String {
    let delimiter = spec.delimiter.to_string();
    let mut out = String::new();

    if spec.header {
        let headers: Vec<String> = spec
            .columns
            .iter()
            .map(|c| sanitize(&c.header, spec.delimiter))
            .collect();
        out.push_str(&headers.join(&delimiter));
        out.push_str("\r\n");
    }

    for line in lines {
        let cells: Vec<String> = line
            .values
            .iter()
            .map(|(_, v)| sanitize(v, spec.delimiter))
            .collect();
        out.push_str(&cells.join(&delimiter));
        out.push_str("\r\n");
    }
    out
}

fn sanitize(value: &str, delimiter: char) -> String {
    value
        .chars()
        .map(|c| if c == delimiter || c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

/// Legal FEC file name: `{SIREN}FEC{YYYY}1231.txt`.
///
/// Whitespace is dropped from `siren` and only its first nine characters
/// are kept, so a SIRET works too.
///
/// ```
/// use gendoc::export::fec_file_name;
///
/// assert_eq!(fec_file_name("123 456 789 00012", 2024), "123456789FEC20241231.txt");
/// ```
pub fn fec_file_name(siren: &str, year: i32) -> String {
    let siren: String = siren.chars().filter(|c| !c.is_whitespace()).take(9).collect();
    format!("{siren}FEC{year}1231.txt")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::export::ExportColumn;

    fn line(values: &[(ExportColumn, &str)]) -> ExportLine {
        ExportLine {
            amount: Decimal::ZERO,
            account: "411000".into(),
            category: "receivable".into(),
            values: values.iter().map(|(c, v)| (*c, v.to_string())).collect(),
        }
    }

    #[test]
    fn sage_header_and_crlf() {
        let spec = DialectSpec::sage();
        let out = render(&[], &spec);
        assert_eq!(out, "Date;Journal;Compte;Libellé;Débit;Crédit;Référence\r\n");
    }

    #[test]
    fn cegid_has_no_header() {
        let spec = DialectSpec::cegid();
        let l = line(&[(ExportColumn::JournalCode, "VE"), (ExportColumn::Debit, "1.00")]);
        assert_eq!(render(&[l], &spec), "VE|1.00\r\n");
    }

    #[test]
    fn delimiter_inside_value_is_replaced() {
        let spec = DialectSpec::fec();
        let l = line(&[
            (ExportColumn::EcritureLib, "Facture\t12\r\nbis"),
            (ExportColumn::Debit, ""),
        ]);
        let out = render(&[l], &spec);
        assert!(out.ends_with("Facture 12  bis\t\r\n"));
    }
}
