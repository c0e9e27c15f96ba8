use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::row::SourceRow;
use crate::core::{DocumentKind, PayPeriod};

/// Logical fields a source column can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Document number; rows sharing it form one document.
    DocumentId,

    RecipientName,
    RecipientAddress,
    RecipientPostalCode,
    RecipientCity,
    RecipientRegistrationId,
    RecipientVatId,
    RecipientEmail,
    IssueDate,
    DueDate,
    Currency,
    Description,
    Quantity,
    UnitPrice,
    VatRate,
    Discount,

    EmployeeLastName,
    EmployeeFirstName,
    EmployeeId,
    Position,
    GrossSalary,
    HoursWorked,
    Period,
    ContributionScheme,
    ContributionBase,
    EmployeeRate,
    EmployerRate,
}

impl Field {
    /// Line-level fields differ from row to row of one document; all other
    /// fields are document-level and must agree.
    pub fn is_line_level(&self) -> bool {
        matches!(
            self,
            Self::Description
                | Self::Quantity
                | Self::UnitPrice
                | Self::VatRate
                | Self::Discount
                | Self::ContributionScheme
                | Self::ContributionBase
                | Self::EmployeeRate
                | Self::EmployerRate
        )
    }

    /// Fields of one document kind, excluding the document id.
    pub fn for_kind(kind: DocumentKind) -> &'static [Field] {
        match kind {
            DocumentKind::Invoice => &[
                Self::RecipientName,
                Self::RecipientAddress,
                Self::RecipientPostalCode,
                Self::RecipientCity,
                Self::RecipientRegistrationId,
                Self::RecipientVatId,
                Self::RecipientEmail,
                Self::IssueDate,
                Self::DueDate,
                Self::Currency,
                Self::Description,
                Self::Quantity,
                Self::UnitPrice,
                Self::VatRate,
                Self::Discount,
            ],
            DocumentKind::Payslip => &[
                Self::EmployeeLastName,
                Self::EmployeeFirstName,
                Self::EmployeeId,
                Self::Position,
                Self::GrossSalary,
                Self::HoursWorked,
                Self::Period,
                Self::ContributionScheme,
                Self::ContributionBase,
                Self::EmployeeRate,
                Self::EmployerRate,
            ],
        }
    }

    /// Document-level fields of one kind, in declaration order.
    pub fn document_level(kind: DocumentKind) -> impl Iterator<Item = Field> {
        Self::for_kind(kind)
            .iter()
            .copied()
            .filter(|f| !f.is_line_level())
    }
}

/// How rate cells are written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RateUnit {
    /// `0.20`
    #[default]
    Fraction,
    /// `20`
    Percent,
}

/// Explicit mapping from logical fields to source columns, plus parsing
/// settings.
///
/// The default maps the French column names of the usual spreadsheet
/// templates (`client_nom`, `designation`, `quantite`, `salaire_brut`, ...)
/// and maps no document id column, so rows are grouped by client or
/// employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    columns: BTreeMap<Field, String>,
    pub rate_unit: RateUnit,
    /// Accepted date formats (chrono syntax), tried in order.
    pub date_formats: Vec<String>,
    /// Due date = issue date + N days when the due date cell is empty.
    pub payment_terms_days: u32,
    /// VAT rate for lines with an empty rate cell; `None` makes it mandatory.
    pub default_vat_rate: Option<Decimal>,
    /// Issue date for rows with an empty date cell.
    pub default_issue_date: Option<NaiveDate>,
    /// Pay period for rows with an empty period cell.
    pub default_period: Option<PayPeriod>,
    /// Currency of rows with an empty currency cell.
    pub currency_code: String,
}

impl Default for SourceSchema {
    fn default() -> Self {
        let columns = [
            (Field::RecipientName, "client_nom"),
            (Field::RecipientAddress, "client_adresse"),
            (Field::RecipientPostalCode, "client_code_postal"),
            (Field::RecipientCity, "client_ville"),
            (Field::RecipientRegistrationId, "client_siret"),
            (Field::RecipientVatId, "client_tva_intra"),
            (Field::RecipientEmail, "client_email"),
            (Field::IssueDate, "date_facture"),
            (Field::DueDate, "date_echeance"),
            (Field::Currency, "devise"),
            (Field::Description, "designation"),
            (Field::Quantity, "quantite"),
            (Field::UnitPrice, "prix_unitaire_ht"),
            (Field::VatRate, "taux_tva"),
            (Field::Discount, "remise_pourcent"),
            (Field::EmployeeLastName, "salarie_nom"),
            (Field::EmployeeFirstName, "salarie_prenom"),
            (Field::EmployeeId, "salarie_matricule"),
            (Field::Position, "poste"),
            (Field::GrossSalary, "salaire_brut"),
            (Field::HoursWorked, "heures_travaillees"),
            (Field::Period, "periode_debut"),
            (Field::ContributionScheme, "cotisation"),
            (Field::ContributionBase, "base_cotisation"),
            (Field::EmployeeRate, "taux_salarial"),
            (Field::EmployerRate, "taux_patronal"),
        ]
        .into_iter()
        .map(|(f, c)| (f, c.to_string()))
        .collect();

        Self {
            columns,
            rate_unit: RateUnit::Fraction,
            date_formats: ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y", "%Y%m%d"]
                .into_iter()
                .map(String::from)
                .collect(),
            payment_terms_days: 30,
            default_vat_rate: None,
            default_issue_date: None,
            default_period: None,
            currency_code: "EUR".to_string(),
        }
    }
}

impl SourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema with no column mapped.
    pub fn empty() -> Self {
        Self {
            columns: BTreeMap::new(),
            ..Self::default()
        }
    }

    /// Map a field to a column (name is trimmed and lowercased).
    pub fn map(mut self, field: Field, column: impl AsRef<str>) -> Self {
        self.columns
            .insert(field, super::row::normalize_column(column.as_ref()));
        self
    }

    pub fn unmap(mut self, field: Field) -> Self {
        self.columns.remove(&field);
        self
    }

    pub fn column(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    /// Columns of `row` that no field of `kind` reads.
    pub fn unmapped_columns<'r>(&self, row: &'r SourceRow, kind: DocumentKind) -> Vec<&'r str> {
        let read: Vec<&str> = Field::for_kind(kind)
            .iter()
            .chain([&Field::DocumentId])
            .filter_map(|f| self.column(*f))
            .collect();
        row.columns().filter(|c| !read.contains(c)).collect()
    }

    pub fn rate_unit(mut self, unit: RateUnit) -> Self {
        self.rate_unit = unit;
        self
    }

    /// Replace the accepted date formats.
    pub fn date_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.date_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn payment_terms_days(mut self, days: u32) -> Self {
        self.payment_terms_days = days;
        self
    }

    pub fn default_vat_rate(mut self, rate: Decimal) -> Self {
        self.default_vat_rate = Some(rate);
        self
    }

    pub fn default_issue_date(mut self, date: NaiveDate) -> Self {
        self.default_issue_date = Some(date);
        self
    }

    pub fn default_period(mut self, period: PayPeriod) -> Self {
        self.default_period = Some(period);
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_maps_french_columns() {
        let schema = SourceSchema::default();
        assert_eq!(schema.column(Field::UnitPrice), Some("prix_unitaire_ht"));
        assert_eq!(schema.column(Field::GrossSalary), Some("salaire_brut"));
        assert_eq!(schema.column(Field::DocumentId), None);
    }

    #[test]
    fn document_level_fields_exclude_line_fields() {
        let fields: Vec<Field> = Field::document_level(DocumentKind::Payslip).collect();
        assert!(fields.contains(&Field::GrossSalary));
        assert!(fields.contains(&Field::Period));
        assert!(!fields.contains(&Field::ContributionScheme));
        assert!(Field::document_level(DocumentKind::Invoice).all(|f| f != Field::Quantity));
    }

    #[test]
    fn columns_of_the_other_kind_are_unmapped() {
        let row = SourceRow::new(0)
            .with("client_nom", "Client SA")
            .with("quantite", "1")
            .with("salaire_brut", "3000")
            .with("Commentaire", "x");
        let schema = SourceSchema::default();
        assert_eq!(
            schema.unmapped_columns(&row, DocumentKind::Invoice),
            ["commentaire", "salaire_brut"]
        );
        assert_eq!(
            schema.unmapped_columns(&row, DocumentKind::Payslip),
            ["client_nom", "commentaire", "quantite"]
        );
    }

    #[test]
    fn map_normalizes_column_names() {
        let schema = SourceSchema::empty().map(Field::DocumentId, " Numero ");
        assert_eq!(schema.column(Field::DocumentId), Some("numero"));
        assert_eq!(schema.column(Field::Quantity), None);
    }

    #[test]
    fn schema_round_trips_through_json() {
        let schema = SourceSchema::default().rate_unit(RateUnit::Percent);
        let json = serde_json::to_string(&schema).unwrap();
        let back: SourceSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
