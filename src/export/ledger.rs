//! Finalized documents to balanced ledger lines.

use rust_decimal::Decimal;

use super::accounts::account_label;
use super::dialect::{DecimalFormat, DialectSpec, ExportColumn, Journal};
use crate::core::{DocumentRecord, FinalizedDocument, GendocError, Totals};

/// One ledger line, already laid out in the dialect's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLine {
    /// Signed amount: debit positive, credit negative.
    pub amount: Decimal,
    pub account: String,
    /// Ledger category the account was mapped from (e.g. "vat.normal").
    pub category: String,
    /// Cell values in dialect column order.
    pub values: Vec<(ExportColumn, String)>,
}

impl ExportLine {
    /// Cell value of a column, if the dialect emits it.
    pub fn get(&self, column: ExportColumn) -> Option<&str> {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn debit(&self) -> Decimal {
        self.amount.max(Decimal::ZERO)
    }

    pub fn credit(&self) -> Decimal {
        (-self.amount).max(Decimal::ZERO)
    }
}

/// Posting before account mapping.
struct Posting {
    category: String,
    amount: Decimal,
    label: String,
}

impl Posting {
    fn new(category: impl Into<String>, amount: Decimal, label: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            amount,
            label: label.into(),
        }
    }
}

/// Turn a finalized document into ledger lines for a dialect.
///
/// Invoices credit revenue and VAT per bracket against a receivable debit
/// of the grand total. Payslips debit gross salary and employer charges
/// against contribution credits and the net payable. The signed amounts of
/// one document always sum to zero.
///
/// ```
/// use gendoc::core::*;
/// use gendoc::export::*;
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("FAC-2024-00001", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
///     .issuer(PartyBuilder::new("Votre Entreprise").build())
///     .recipient(PartyBuilder::new("Client SA").build())
///     .add_line(LineItemBuilder::new("Conseil", dec!(2), dec!(50)).build())
///     .build()
///     .unwrap();
/// let doc = compute(&invoice.into(), &RateTable::france_2024()).unwrap();
///
/// let lines = export(&doc, &DialectSpec::fec()).unwrap();
/// assert_eq!(lines.len(), 3);
/// assert_eq!(lines[0].account, "411000");
/// assert_eq!(lines[0].get(ExportColumn::Debit), Some("120,00"));
/// assert_eq!(lines.iter().map(|l| l.amount).sum::<Decimal>(), Decimal::ZERO);
/// ```
pub fn export(doc: &FinalizedDocument, spec: &DialectSpec) -> Result<Vec<ExportLine>, GendocError> {
    spec.validate()?;

    let (journal, postings) = match (doc.record(), doc.totals()) {
        (DocumentRecord::Invoice(inv), Totals::Invoice(totals)) => {
            let label = format!("Facture {} - {}", inv.number, inv.recipient.name);
            let mut postings = vec![Posting::new("receivable", Decimal::ZERO, label.clone())];
            for bracket in &totals.vat_breakdown {
                if !bracket.taxable_amount.is_zero() {
                    postings.push(Posting::new(
                        format!("revenue.{}", bracket.category),
                        -bracket.taxable_amount,
                        label.clone(),
                    ));
                }
                if !bracket.tax_amount.is_zero() {
                    postings.push(Posting::new(
                        format!("vat.{}", bracket.category),
                        -bracket.tax_amount,
                        format!("TVA Facture {}", inv.number),
                    ));
                }
            }
            let others: Decimal = postings.iter().map(|p| p.amount).sum();
            postings[0].amount = -others;
            (&spec.sales_journal, postings)
        }
        (DocumentRecord::Payslip(slip), Totals::Payslip(totals)) => {
            let who = format!("{} - {}", slip.period, slip.employee.full_name());
            let mut postings = vec![Posting::new(
                "salary_expense",
                totals.gross,
                format!("Salaire {who}"),
            )];
            if !totals.employer_contrib_total.is_zero() {
                postings.push(Posting::new(
                    "employer_contributions_expense",
                    totals.employer_contrib_total,
                    format!("Charges patronales {who}"),
                ));
            }
            for share in &totals.contributions {
                postings.push(Posting::new(
                    format!("contribution.{}", share.scheme),
                    -(share.employee_share + share.employer_share),
                    format!("Cotisation {} {who}", share.scheme),
                ));
            }
            let balance: Decimal = postings.iter().map(|p| p.amount).sum();
            postings.push(Posting::new(
                "net_payable",
                -balance,
                format!("Net à payer {who}"),
            ));
            (&spec.payroll_journal, postings)
        }
        _ => {
            return Err(GendocError::Builder(format!(
                "document {}: totals do not match the record kind",
                doc.id()
            )));
        }
    };

    let lines = postings
        .into_iter()
        .map(|posting| layout(doc, spec, journal, posting))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        document = doc.id(),
        dialect = %spec.name,
        lines = lines.len(),
        "exported ledger lines"
    );
    Ok(lines)
}

/// Export several documents into one ledger, in input order.
pub fn export_all<'a>(
    docs: impl IntoIterator<Item = &'a FinalizedDocument>,
    spec: &DialectSpec,
) -> Result<Vec<ExportLine>, GendocError> {
    let mut lines = Vec::new();
    for doc in docs {
        lines.extend(export(doc, spec)?);
    }
    Ok(lines)
}

fn layout(
    doc: &FinalizedDocument,
    spec: &DialectSpec,
    journal: &Journal,
    posting: Posting,
) -> Result<ExportLine, GendocError> {
    let account = spec
        .account_for(&posting.category)
        .ok_or_else(|| GendocError::UnmappedAccount {
            document: doc.id().to_string(),
            category: posting.category.clone(),
        })?
        .to_string();

    let date = doc.record().document_date().format(&spec.date_format).to_string();
    let amount_cell = |value: Decimal| {
        if value.is_zero() && spec.blank_zero_amounts {
            String::new()
        } else {
            format_amount(value, spec.decimal_format)
        }
    };
    let debit = posting.amount.max(Decimal::ZERO);
    let credit = (-posting.amount).max(Decimal::ZERO);

    let values = spec
        .columns
        .iter()
        .map(|c| {
            let value = match c.column {
                ExportColumn::JournalCode => journal.code.clone(),
                ExportColumn::JournalLib => journal.label.clone(),
                ExportColumn::EcritureNum | ExportColumn::PieceRef => doc.id().to_string(),
                ExportColumn::EcritureDate | ExportColumn::PieceDate | ExportColumn::ValidDate => {
                    date.clone()
                }
                ExportColumn::CompteNum => account.clone(),
                ExportColumn::CompteLib => account_label(&account).to_string(),
                ExportColumn::EcritureLib => posting.label.clone(),
                ExportColumn::Debit => amount_cell(debit),
                ExportColumn::Credit => amount_cell(credit),
                ExportColumn::CompAuxNum
                | ExportColumn::CompAuxLib
                | ExportColumn::EcritureLet
                | ExportColumn::DateLet
                | ExportColumn::Montantdevise
                | ExportColumn::Idevise => String::new(),
            };
            (c.column, value)
        })
        .collect();

    Ok(ExportLine {
        amount: posting.amount,
        account,
        category: posting.category,
        values,
    })
}

/// Two decimals with the dialect's separator, no grouping.
pub fn format_amount(amount: Decimal, format: DecimalFormat) -> String {
    let s = format!("{:.2}", amount.round_dp(2));
    match format {
        DecimalFormat::Comma => s.replace('.', ","),
        DecimalFormat::Dot => s,
    }
}
