//! Record normalizer: raw tabular rows to validated document records.
//!
//! Column mapping is explicit ([`SourceSchema`]); parsing failures name the
//! 0-based row index and the source column. Any failure rejects the whole
//! source: no partial documents are returned.

#[cfg(feature = "csv")]
mod csv_reader;
mod parse;
mod row;
mod schema;

#[cfg(feature = "csv")]
pub use csv_reader::*;
pub use parse::*;
pub use row::*;
pub use schema::*;

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use crate::core::*;

/// Turns source rows into [`DocumentRecord`]s.
///
/// ```
/// use gendoc::core::*;
/// use gendoc::normalize::*;
/// use rust_decimal_macros::dec;
///
/// let rows = vec![
///     SourceRow::new(0)
///         .with("client_nom", "Client SA")
///         .with("designation", "Conseil")
///         .with("quantite", "2")
///         .with("prix_unitaire_ht", "50,00")
///         .with("taux_tva", "20 %")
///         .with("date_facture", "15/03/2024"),
/// ];
///
/// let mut normalizer = Normalizer::new(SourceSchema::default())
///     .issuer(PartyBuilder::new("Votre Entreprise").build())
///     .numbering(DocumentNumberSequence::for_kind(DocumentKind::Invoice, 2024));
/// let record = normalizer.normalize(&rows, DocumentKind::Invoice).unwrap();
/// assert_eq!(record.id(), "FAC-2024-00001");
/// ```
#[derive(Debug, Clone)]
pub struct Normalizer {
    schema: SourceSchema,
    issuer: Option<Party>,
    numbering: Option<DocumentNumberSequence>,
}

impl Normalizer {
    pub fn new(schema: SourceSchema) -> Self {
        Self {
            schema,
            issuer: None,
            numbering: None,
        }
    }

    /// Issuing company: invoice issuer and payslip employer.
    pub fn issuer(mut self, party: Party) -> Self {
        self.issuer = Some(party);
        self
    }

    /// Sequence used for document numbers when no id column is mapped.
    pub fn numbering(mut self, sequence: DocumentNumberSequence) -> Self {
        self.numbering = Some(sequence);
        self
    }

    pub fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    /// Current state of the numbering sequence, for persisting between runs.
    pub fn numbering_state(&self) -> Option<&DocumentNumberSequence> {
        self.numbering.as_ref()
    }

    /// Normalize rows that describe exactly one document.
    pub fn normalize(
        &mut self,
        rows: &[SourceRow],
        kind: DocumentKind,
    ) -> Result<DocumentRecord, GendocError> {
        let groups = self.group(rows, kind)?;
        if groups.len() > 1 {
            return Err(GendocError::MalformedRow {
                row: groups[1][0].index(),
                field: self.label(Field::DocumentId),
                reason: "rows describe more than one document".into(),
            });
        }
        let group = groups.first().ok_or_else(|| GendocError::MalformedRow {
            row: 0,
            field: self.label(Field::DocumentId),
            reason: "no rows".into(),
        })?;
        self.build(group, kind)
    }

    /// Normalize a whole source, one record per document, in order of
    /// first appearance.
    pub fn normalize_batch(
        &mut self,
        rows: &[SourceRow],
        kind: DocumentKind,
    ) -> Result<Vec<DocumentRecord>, GendocError> {
        if let Some(row) = rows.iter().find(|r| !r.is_blank()) {
            let ignored = self.schema.unmapped_columns(row, kind);
            if !ignored.is_empty() {
                tracing::debug!(kind = kind.code(), columns = ?ignored, "ignoring unmapped columns");
            }
        }
        let groups = self.group(rows, kind)?;
        let checkpoint = self.numbering.clone();
        let records = match groups
            .iter()
            .map(|g| self.build(g, kind))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(records) => records,
            Err(e) => {
                // A rejected source must not consume document numbers.
                self.numbering = checkpoint;
                return Err(e);
            }
        };
        tracing::debug!(
            rows = rows.len(),
            documents = records.len(),
            kind = kind.code(),
            "normalized source rows"
        );
        Ok(records)
    }

    fn group<'a>(
        &self,
        rows: &'a [SourceRow],
        kind: DocumentKind,
    ) -> Result<Vec<Vec<&'a SourceRow>>, GendocError> {
        let mut groups: Vec<Vec<&SourceRow>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in rows {
            if row.is_blank() {
                tracing::debug!(row = row.index(), "skipping blank row");
                continue;
            }
            let key = self.group_key(row, kind)?;
            match positions.get(&key) {
                Some(&i) => groups[i].push(row),
                None => {
                    positions.insert(key, groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        Ok(groups)
    }

    fn group_key(&self, row: &SourceRow, kind: DocumentKind) -> Result<String, GendocError> {
        if self.schema.column(Field::DocumentId).is_some() {
            return Ok(format!("id\u{1f}{}", self.require(row, Field::DocumentId)?));
        }
        let part = |field| {
            self.cell(row, field)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        };
        Ok(match kind {
            DocumentKind::Invoice => format!(
                "client\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
                self.require(row, Field::RecipientName)?,
                part(Field::RecipientAddress),
                part(Field::RecipientPostalCode),
                part(Field::RecipientCity),
            ),
            DocumentKind::Payslip => match self.cell(row, Field::EmployeeId) {
                Some((_, id)) => format!("employee\u{1f}{id}"),
                None => format!(
                    "name\u{1f}{}\u{1f}{}",
                    self.require(row, Field::EmployeeLastName)?,
                    part(Field::EmployeeFirstName),
                ),
            },
        })
    }

    fn build(&mut self, rows: &[&SourceRow], kind: DocumentKind) -> Result<DocumentRecord, GendocError> {
        let issuer = self
            .issuer
            .clone()
            .ok_or_else(|| GendocError::Builder("issuer is required".into()))?;
        // Conflicts are reported before any value is interpreted.
        for field in Field::document_level(kind) {
            self.doc_cell(rows, field)?;
        }
        match kind {
            DocumentKind::Invoice => self.build_invoice(rows, issuer).map(DocumentRecord::Invoice),
            DocumentKind::Payslip => self.build_payslip(rows, issuer).map(DocumentRecord::Payslip),
        }
    }

    fn build_invoice(&mut self, rows: &[&SourceRow], issuer: Party) -> Result<Invoice, GendocError> {
        let first = rows[0];

        let name = self.doc_text(rows, Field::RecipientName)?;
        let name = name.ok_or_else(|| self.missing(first, Field::RecipientName))?;
        let street = self.doc_text(rows, Field::RecipientAddress)?;
        let locality = [
            self.doc_text(rows, Field::RecipientPostalCode)?,
            self.doc_text(rows, Field::RecipientCity)?,
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
        let address = match (street, locality.is_empty()) {
            (Some(s), false) => Some(format!("{s}, {locality}")),
            (Some(s), true) => Some(s),
            (None, false) => Some(locality),
            (None, true) => None,
        };
        let recipient = Party {
            name,
            address,
            registration_id: self.doc_text(rows, Field::RecipientRegistrationId)?,
            vat_id: self.doc_text(rows, Field::RecipientVatId)?,
            email: self.doc_text(rows, Field::RecipientEmail)?,
        };

        let issue_date = match self.doc_cell(rows, Field::IssueDate)? {
            Some((row, _)) => self.date(row, Field::IssueDate)?,
            None => None,
        };
        let issue_date = issue_date
            .or(self.schema.default_issue_date)
            .ok_or_else(|| self.missing(first, Field::IssueDate))?;

        let due_date = match self.doc_cell(rows, Field::DueDate)? {
            Some((row, _)) => {
                let due = self.date(row, Field::DueDate)?;
                if let Some(due) = due {
                    if due < issue_date {
                        return Err(GendocError::MalformedRow {
                            row: row.index(),
                            field: self.label(Field::DueDate),
                            reason: format!("due date {due} is before issue date {issue_date}"),
                        });
                    }
                }
                due
            }
            None => None,
        };
        let due_date = match due_date {
            Some(d) => d,
            None => issue_date
                .checked_add_days(Days::new(u64::from(self.schema.payment_terms_days)))
                .ok_or_else(|| self.malformed(first, Field::IssueDate, "due date out of range"))?,
        };

        let currency_code = self
            .doc_text(rows, Field::Currency)?
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| self.schema.currency_code.clone());
        if currency_code.len() != 3 || !currency_code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(self.malformed(
                first,
                Field::Currency,
                format!("'{currency_code}' is not an ISO 4217 code"),
            ));
        }

        let mut lines = Vec::with_capacity(rows.len());
        for &row in rows {
            let description = self.require(row, Field::Description)?;
            let quantity = self.non_negative(row, Field::Quantity)?;
            let unit_price = self.non_negative(row, Field::UnitPrice)?;
            let vat_rate = self
                .rate(row, Field::VatRate)?
                .or(self.schema.default_vat_rate)
                .ok_or_else(|| self.missing(row, Field::VatRate))?;
            let discount = self.rate(row, Field::Discount)?.unwrap_or(Decimal::ZERO);
            lines.push(LineItem {
                description,
                quantity,
                unit_price,
                vat_rate,
                discount,
            });
        }

        let number = self.document_number(rows, DocumentKind::Invoice, Field::IssueDate, issue_date)?;
        Ok(Invoice {
            number,
            issuer,
            recipient,
            issue_date,
            due_date,
            currency_code,
            lines,
        })
    }

    fn build_payslip(&mut self, rows: &[&SourceRow], employer: Party) -> Result<Payslip, GendocError> {
        let first = rows[0];

        let last_name = self
            .doc_text(rows, Field::EmployeeLastName)?
            .ok_or_else(|| self.missing(first, Field::EmployeeLastName))?;
        let first_name = self
            .doc_text(rows, Field::EmployeeFirstName)?
            .ok_or_else(|| self.missing(first, Field::EmployeeFirstName))?;
        let employee = Employee {
            id: self.doc_text(rows, Field::EmployeeId)?,
            last_name,
            first_name,
            position: self.doc_text(rows, Field::Position)?,
        };

        let gross_salary = match self.doc_cell(rows, Field::GrossSalary)? {
            Some((row, _)) => self.non_negative(row, Field::GrossSalary)?,
            None => return Err(self.missing(first, Field::GrossSalary)),
        };
        let hours_worked = match self.doc_cell(rows, Field::HoursWorked)? {
            Some((row, _)) => Some(self.non_negative(row, Field::HoursWorked)?),
            None => None,
        };

        let period = match self.doc_cell(rows, Field::Period)? {
            Some((row, value)) => {
                let text = value.to_string();
                Some(parse_period(&text, &self.schema.date_formats).ok_or_else(|| {
                    GendocError::UnparsableDate {
                        row: row.index(),
                        field: self.label(Field::Period),
                        value: text.clone(),
                    }
                })?)
            }
            None => None,
        };
        let period = period
            .or(self.schema.default_period)
            .ok_or_else(|| self.missing(first, Field::Period))?;

        let mut contributions = Vec::new();
        for &row in rows {
            let Some((_, scheme)) = self.cell(row, Field::ContributionScheme) else {
                let has_rates = self.cell(row, Field::EmployeeRate).is_some()
                    || self.cell(row, Field::EmployerRate).is_some();
                if has_rates {
                    return Err(self.malformed(
                        row,
                        Field::ContributionScheme,
                        "contribution rates given without a scheme",
                    ));
                }
                continue;
            };
            let base_amount = match self.cell(row, Field::ContributionBase) {
                Some(_) => self.non_negative(row, Field::ContributionBase)?,
                None => gross_salary,
            };
            contributions.push(ContributionLine {
                scheme: scheme.to_string(),
                base_amount,
                employee_rate: self.rate(row, Field::EmployeeRate)?,
                employer_rate: self.rate(row, Field::EmployerRate)?,
            });
        }

        let number = self.document_number(rows, DocumentKind::Payslip, Field::Period, period.last_day())?;
        Ok(Payslip {
            number,
            employer,
            employee,
            period,
            gross_salary,
            hours_worked,
            contributions,
        })
    }

    fn document_number(
        &mut self,
        rows: &[&SourceRow],
        kind: DocumentKind,
        date_field: Field,
        date: NaiveDate,
    ) -> Result<String, GendocError> {
        if self.schema.column(Field::DocumentId).is_some() {
            return self
                .doc_text(rows, Field::DocumentId)?
                .ok_or_else(|| self.missing(rows[0], Field::DocumentId));
        }
        let sequence = self.numbering.as_mut().ok_or_else(|| {
            GendocError::Builder(format!(
                "no document id column and no {} numbering sequence",
                kind.code()
            ))
        })?;
        if let Err(e) = sequence.auto_advance(date) {
            let reason = match e {
                GendocError::Builder(reason) => reason,
                other => other.to_string(),
            };
            return Err(self.malformed(rows[0], date_field, reason));
        }
        Ok(sequence.next_number())
    }

    // Cell access

    /// Column name for error messages; the field name when unmapped.
    fn label(&self, field: Field) -> String {
        self.schema
            .column(field)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{field:?}"))
    }

    fn malformed(&self, row: &SourceRow, field: Field, reason: impl Into<String>) -> GendocError {
        GendocError::MalformedRow {
            row: row.index(),
            field: self.label(field),
            reason: reason.into(),
        }
    }

    fn missing(&self, row: &SourceRow, field: Field) -> GendocError {
        self.malformed(row, field, "missing mandatory value")
    }

    /// Non-empty cell of a mapped field.
    fn cell<'r>(&self, row: &'r SourceRow, field: Field) -> Option<(&'r SourceRow, &'r RawValue)> {
        let column = self.schema.column(field)?;
        row.get(column)
            .filter(|v| !v.is_empty())
            .map(|v| (row, v))
    }

    fn require(&self, row: &SourceRow, field: Field) -> Result<String, GendocError> {
        self.cell(row, field)
            .map(|(_, v)| v.to_string())
            .ok_or_else(|| self.missing(row, field))
    }

    /// First non-empty value of a document-level field across the rows of
    /// one document. Later rows may leave it blank but must not disagree.
    fn doc_cell<'r>(
        &self,
        rows: &[&'r SourceRow],
        field: Field,
    ) -> Result<Option<(&'r SourceRow, &'r RawValue)>, GendocError> {
        let mut found: Option<(&SourceRow, &RawValue)> = None;
        for &row in rows {
            let Some((_, value)) = self.cell(row, field) else {
                continue;
            };
            let Some((first_row, first)) = found else {
                found = Some((row, value));
                continue;
            };
            if first.to_string() != value.to_string() {
                return Err(self.malformed(
                    row,
                    field,
                    format!(
                        "'{value}' conflicts with '{first}' from row {}",
                        first_row.index()
                    ),
                ));
            }
        }
        Ok(found)
    }

    fn doc_text(&self, rows: &[&SourceRow], field: Field) -> Result<Option<String>, GendocError> {
        Ok(self.doc_cell(rows, field)?.map(|(_, v)| v.to_string()))
    }

    fn decimal(&self, row: &SourceRow, field: Field) -> Result<Option<Decimal>, GendocError> {
        match self.cell(row, field) {
            None => Ok(None),
            Some((_, RawValue::Number(d))) => Ok(Some(*d)),
            Some((_, value)) => parse_decimal(&value.to_string())
                .map(Some)
                .map_err(|reason| self.malformed(row, field, reason)),
        }
    }

    fn non_negative(&self, row: &SourceRow, field: Field) -> Result<Decimal, GendocError> {
        let value = self
            .decimal(row, field)?
            .ok_or_else(|| self.missing(row, field))?;
        if value < Decimal::ZERO {
            return Err(self.malformed(row, field, format!("{value} must not be negative")));
        }
        Ok(value)
    }

    fn rate(&self, row: &SourceRow, field: Field) -> Result<Option<Decimal>, GendocError> {
        match self.cell(row, field) {
            None => Ok(None),
            Some((_, value)) => parse_rate(value, self.schema.rate_unit)
                .map(Some)
                .map_err(|reason| self.malformed(row, field, reason)),
        }
    }

    fn date(&self, row: &SourceRow, field: Field) -> Result<Option<NaiveDate>, GendocError> {
        let Some((_, value)) = self.cell(row, field) else {
            return Ok(None);
        };
        let text = value.to_string();
        parse_date(&text, &self.schema.date_formats)
            .map(Some)
            .ok_or_else(|| GendocError::UnparsableDate {
                row: row.index(),
                field: self.label(field),
                value: text,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn invoice_row(index: usize, client: &str, designation: &str) -> SourceRow {
        SourceRow::new(index)
            .with("client_nom", client)
            .with("client_adresse", "1 rue de la Paix")
            .with("designation", designation)
            .with("quantite", "1")
            .with("prix_unitaire_ht", "10")
            .with("taux_tva", "0.2")
            .with("date_facture", "01/03/2024")
    }

    fn normalizer(kind: DocumentKind) -> Normalizer {
        Normalizer::new(SourceSchema::default())
            .issuer(Party {
                name: "Votre Entreprise".into(),
                address: None,
                registration_id: None,
                vat_id: None,
                email: None,
            })
            .numbering(DocumentNumberSequence::for_kind(kind, 2024))
    }

    #[test]
    fn document_field_conflict_wins_over_parse_failure() {
        let rows = vec![
            invoice_row(0, "Beta", "a").with("date_facture", "32/13/2024").with("devise", "EUR"),
            invoice_row(1, "Beta", "b").with("date_facture", "32/13/2024").with("devise", "USD"),
        ];
        let err = normalizer(DocumentKind::Invoice)
            .normalize_batch(&rows, DocumentKind::Invoice)
            .unwrap_err();
        match err {
            GendocError::MalformedRow { row, field, reason } => {
                assert_eq!(row, 1);
                assert_eq!(field, "devise");
                assert!(reason.contains("conflicts with 'EUR'"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rows_grouped_by_client_in_first_appearance_order() {
        let rows = vec![
            invoice_row(0, "Beta", "a"),
            invoice_row(1, "Alpha", "b"),
            invoice_row(2, "Beta", "c"),
        ];
        let mut n = normalizer(DocumentKind::Invoice);
        let records = n.normalize_batch(&rows, DocumentKind::Invoice).unwrap();
        assert_eq!(records.len(), 2);
        let DocumentRecord::Invoice(first) = &records[0] else {
            panic!("expected invoice");
        };
        assert_eq!(first.number, "FAC-2024-00001");
        assert_eq!(first.recipient.name, "Beta");
        assert_eq!(first.lines.len(), 2);
        assert_eq!(first.due_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(records[1].id(), "FAC-2024-00002");
        assert_eq!(n.numbering_state().unwrap().next_raw(), 3);
    }

    #[test]
    fn missing_unit_price_names_row_and_column() {
        let rows = vec![
            invoice_row(0, "Beta", "a"),
            invoice_row(1, "Beta", "b").with("prix_unitaire_ht", ""),
        ];
        let err = normalizer(DocumentKind::Invoice)
            .normalize_batch(&rows, DocumentKind::Invoice)
            .unwrap_err();
        match err {
            GendocError::MalformedRow { row, field, .. } => {
                assert_eq!(row, 1);
                assert_eq!(field, "prix_unitaire_ht");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn conflicting_document_fields() {
        let schema = SourceSchema::default().map(Field::DocumentId, "numero");
        let rows = vec![
            invoice_row(0, "Beta", "a").with("numero", "F1"),
            invoice_row(1, "Beta", "b")
                .with("numero", "F1")
                .with("date_facture", "02/03/2024"),
        ];
        let mut n = Normalizer::new(schema).issuer(normalizer(DocumentKind::Invoice).issuer.unwrap());
        let err = n.normalize(&rows, DocumentKind::Invoice).unwrap_err();
        assert!(matches!(err, GendocError::MalformedRow { row: 1, ref field, .. } if field == "date_facture"));
    }

    #[test]
    fn blank_document_fields_on_later_rows_are_allowed() {
        let schema = SourceSchema::default().map(Field::DocumentId, "numero");
        let rows = vec![
            invoice_row(0, "Beta", "a").with("numero", "F1"),
            SourceRow::new(1)
                .with("numero", "F1")
                .with("designation", "b")
                .with("quantite", "2")
                .with("prix_unitaire_ht", "5")
                .with("taux_tva", "0.055"),
        ];
        let mut n = Normalizer::new(schema).issuer(normalizer(DocumentKind::Invoice).issuer.unwrap());
        let DocumentRecord::Invoice(inv) = n.normalize(&rows, DocumentKind::Invoice).unwrap() else {
            panic!("expected invoice");
        };
        assert_eq!(inv.number, "F1");
        assert_eq!(inv.lines[1].vat_rate, dec!(0.055));
    }

    #[test]
    fn single_normalize_rejects_two_documents() {
        let rows = vec![invoice_row(0, "Beta", "a"), invoice_row(1, "Alpha", "b")];
        let err = normalizer(DocumentKind::Invoice)
            .normalize(&rows, DocumentKind::Invoice)
            .unwrap_err();
        assert!(matches!(err, GendocError::MalformedRow { row: 1, .. }));
    }

    #[test]
    fn unparsable_date() {
        let rows = vec![invoice_row(0, "Beta", "a").with("date_facture", "le 3 mars")];
        let err = normalizer(DocumentKind::Invoice)
            .normalize(&rows, DocumentKind::Invoice)
            .unwrap_err();
        assert!(matches!(err, GendocError::UnparsableDate { row: 0, ref value, .. } if value == "le 3 mars"));
    }

    #[test]
    fn payslip_with_contribution_rows() {
        let rows = vec![
            SourceRow::new(0)
                .with("salarie_nom", "Martin")
                .with("salarie_prenom", "Claire")
                .with("salarie_matricule", "M042")
                .with("salaire_brut", "3 000,00")
                .with("periode_debut", "03/2024")
                .with("cotisation", "retraite")
                .with("taux_salarial", "0.10"),
            SourceRow::new(1)
                .with("salarie_matricule", "M042")
                .with("cotisation", "prevoyance")
                .with("base_cotisation", "1500")
                .with("taux_salarial", "0.01")
                .with("taux_patronal", "0.015"),
        ];
        let mut n = normalizer(DocumentKind::Payslip);
        let DocumentRecord::Payslip(slip) = n.normalize(&rows, DocumentKind::Payslip).unwrap() else {
            panic!("expected payslip");
        };
        assert_eq!(slip.number, "PAI-2024-00001");
        assert_eq!(slip.gross_salary, dec!(3000.00));
        assert_eq!(slip.period, PayPeriod::new(2024, 3).unwrap());
        assert_eq!(slip.contributions.len(), 2);
        assert_eq!(slip.contributions[0].base_amount, dec!(3000.00));
        assert_eq!(slip.contributions[0].employer_rate, None);
        assert_eq!(slip.contributions[1].base_amount, dec!(1500));
    }

    #[test]
    fn numbering_required_without_id_column() {
        let rows = vec![invoice_row(0, "Beta", "a")];
        let mut n = Normalizer::new(SourceSchema::default())
            .issuer(normalizer(DocumentKind::Invoice).issuer.unwrap());
        let err = n.normalize(&rows, DocumentKind::Invoice).unwrap_err();
        assert!(matches!(err, GendocError::Builder(_)));
    }
}
