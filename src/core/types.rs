use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which kind of document a source file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Facture: line items with VAT.
    Invoice,
    /// Bulletin de paie: gross salary with social contributions.
    Payslip,
}

impl DocumentKind {
    /// Stable lowercase code, used in canonical serialization.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Payslip => "payslip",
        }
    }

    /// Default document number prefix ("FAC" / "PAI").
    pub fn number_prefix(&self) -> &'static str {
        match self {
            Self::Invoice => "FAC",
            Self::Payslip => "PAI",
        }
    }
}

/// Company or person identity (issuer, recipient, employer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Legal or display name.
    pub name: String,
    /// Free-form postal address.
    pub address: Option<String>,
    /// Registration identifier (SIRET/SIREN).
    pub registration_id: Option<String>,
    /// Intra-community VAT number.
    pub vat_id: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

/// Invoice line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Désignation.
    pub description: String,
    pub quantity: Decimal,
    /// Net unit price (HT).
    pub unit_price: Decimal,
    /// VAT rate as a fraction, e.g. 0.20.
    pub vat_rate: Decimal,
    /// Discount as a fraction of the line amount, e.g. 0.10.
    pub discount: Decimal,
}

/// An invoice before computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice number, opaque and non-empty.
    pub number: String,
    pub issuer: Party,
    pub recipient: Party,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    /// ISO 4217 code; a document carries exactly one currency.
    pub currency_code: String,
    pub lines: Vec<LineItem>,
}

/// Employee identity on a payslip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Matricule.
    pub id: Option<String>,
    pub last_name: String,
    pub first_name: String,
    /// Poste.
    pub position: Option<String>,
}

impl Employee {
    /// "First Last", as printed on the payslip and in ledger labels.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Pay period: one calendar month.
///
/// Both bounds are resolved at construction, so every period held by a
/// payslip has a real first and last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodFields", into = "PeriodFields")]
pub struct PayPeriod {
    first: NaiveDate,
    last: NaiveDate,
}

/// Serialized form of [`PayPeriod`].
#[derive(Serialize, Deserialize)]
struct PeriodFields {
    year: i32,
    month: u32,
}

impl PayPeriod {
    /// Returns `None` unless `month` is 1-12 and the year is in chrono's range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self::containing)
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        // Days 1 and 28 exist in every month.
        let first = date.with_day(1).unwrap_or(date);
        let last = (28..=31)
            .rev()
            .find_map(|day| date.with_day(day))
            .unwrap_or(date);
        Self { first, last }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    /// 1-12.
    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.first..=self.last).contains(&date)
    }
}

impl TryFrom<PeriodFields> for PayPeriod {
    type Error = String;

    fn try_from(fields: PeriodFields) -> Result<Self, Self::Error> {
        Self::new(fields.year, fields.month)
            .ok_or_else(|| format!("no pay period {:02}/{}", fields.month, fields.year))
    }
}

impl From<PayPeriod> for PeriodFields {
    fn from(period: PayPeriod) -> Self {
        Self {
            year: period.year(),
            month: period.month(),
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month(), self.year())
    }
}

/// One social contribution scheme applied to a base amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionLine {
    /// Scheme name, the key into the rate table (e.g. "csg_deductible").
    pub scheme: String,
    pub base_amount: Decimal,
    /// Employee rate as a fraction; `None` defers to the rate table.
    pub employee_rate: Option<Decimal>,
    /// Employer rate as a fraction; `None` defers to the rate table.
    pub employer_rate: Option<Decimal>,
}

impl ContributionLine {
    /// Line whose rates come from the rate table.
    pub fn from_table(scheme: impl Into<String>, base_amount: Decimal) -> Self {
        Self {
            scheme: scheme.into(),
            base_amount,
            employee_rate: None,
            employer_rate: None,
        }
    }

    /// Line carrying its own rates.
    pub fn with_rates(
        scheme: impl Into<String>,
        base_amount: Decimal,
        employee_rate: Decimal,
        employer_rate: Decimal,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            base_amount,
            employee_rate: Some(employee_rate),
            employer_rate: Some(employer_rate),
        }
    }
}

/// A payslip before computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payslip {
    /// Payslip number, opaque and non-empty.
    pub number: String,
    pub employer: Party,
    pub employee: Employee,
    pub period: PayPeriod,
    pub gross_salary: Decimal,
    /// Heures travaillées, informational.
    pub hours_worked: Option<Decimal>,
    pub contributions: Vec<ContributionLine>,
}

/// A validated source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentRecord {
    Invoice(Invoice),
    Payslip(Payslip),
}

impl DocumentRecord {
    /// Document number.
    pub fn id(&self) -> &str {
        match self {
            Self::Invoice(inv) => &inv.number,
            Self::Payslip(slip) => &slip.number,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Invoice(_) => DocumentKind::Invoice,
            Self::Payslip(_) => DocumentKind::Payslip,
        }
    }

    /// Accounting date: issue date for invoices, last day of the period for payslips.
    pub fn document_date(&self) -> NaiveDate {
        match self {
            Self::Invoice(inv) => inv.issue_date,
            Self::Payslip(slip) => slip.period.last_day(),
        }
    }
}

impl From<Invoice> for DocumentRecord {
    fn from(invoice: Invoice) -> Self {
        Self::Invoice(invoice)
    }
}

impl From<Payslip> for DocumentRecord {
    fn from(payslip: Payslip) -> Self {
        Self::Payslip(payslip)
    }
}

/// VAT amount for one rate bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatBracket {
    /// Rate as a fraction.
    pub rate: Decimal,
    /// Category from the rate table (e.g. "normal", "reduit").
    pub category: String,
    /// Sum of rounded line amounts at this rate.
    pub taxable_amount: Decimal,
    pub tax_amount: Decimal,
}

/// Invoice totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Rounded net amount of each line, in line order.
    pub line_amounts: Vec<Decimal>,
    /// Total HT.
    pub subtotal: Decimal,
    /// Brackets ordered by ascending rate.
    pub vat_breakdown: Vec<VatBracket>,
    pub total_vat: Decimal,
    /// Total TTC.
    pub grand_total: Decimal,
}

impl InvoiceTotals {
    /// VAT amount keyed by rate.
    pub fn vat_by_rate(&self) -> BTreeMap<Decimal, Decimal> {
        self.vat_breakdown
            .iter()
            .map(|b| (b.rate, b.tax_amount))
            .collect()
    }
}

/// Resolved contribution for one scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionShare {
    pub scheme: String,
    /// Base after the scheme's ceiling, if any.
    pub base_amount: Decimal,
    pub employee_rate: Decimal,
    pub employer_rate: Decimal,
    pub employee_share: Decimal,
    pub employer_share: Decimal,
    /// Whether the employee share reduces the montant net social.
    pub counts_toward_net_social: bool,
}

/// Payslip totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayslipTotals {
    pub gross: Decimal,
    pub contributions: Vec<ContributionShare>,
    pub employee_contrib_total: Decimal,
    /// Informational; not subtracted from net.
    pub employer_contrib_total: Decimal,
    /// Net avant impôt.
    pub net: Decimal,
    /// Montant net social.
    pub net_social: Decimal,
    /// Coût total employeur.
    pub employer_cost: Decimal,
}

/// Computed totals for either document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Totals {
    Invoice(InvoiceTotals),
    Payslip(PayslipTotals),
}

/// A document together with its computed totals.
///
/// Only the computation engine constructs these; fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedDocument {
    record: DocumentRecord,
    totals: Totals,
}

impl FinalizedDocument {
    pub(crate) fn new(record: DocumentRecord, totals: Totals) -> Self {
        Self { record, totals }
    }

    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn id(&self) -> &str {
        self.record.id()
    }

    pub fn kind(&self) -> DocumentKind {
        self.record.kind()
    }

    /// Amount to be paid: grand total (TTC) or net salary.
    pub fn amount_due(&self) -> Decimal {
        match &self.totals {
            Totals::Invoice(t) => t.grand_total,
            Totals::Payslip(t) => t.net,
        }
    }

    /// Currency of `amount_due`.
    pub fn currency_code(&self) -> &str {
        match &self.record {
            DocumentRecord::Invoice(inv) => &inv.currency_code,
            DocumentRecord::Payslip(_) => "EUR",
        }
    }

    pub fn invoice_totals(&self) -> Option<&InvoiceTotals> {
        match &self.totals {
            Totals::Invoice(t) => Some(t),
            Totals::Payslip(_) => None,
        }
    }

    pub fn payslip_totals(&self) -> Option<&PayslipTotals> {
        match &self.totals {
            Totals::Payslip(t) => Some(t),
            Totals::Invoice(_) => None,
        }
    }
}
