//! Accounting dialect descriptions: columns, formats, journals and accounts.

use std::collections::BTreeMap;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use super::accounts::default_accounts;
use crate::core::GendocError;

/// A column a dialect can emit.
///
/// The names follow the 18 columns of the French Fichier des Écritures
/// Comptables; Sage and Cegid layouts use a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExportColumn {
    JournalCode,
    JournalLib,
    EcritureNum,
    EcritureDate,
    CompteNum,
    CompteLib,
    CompAuxNum,
    CompAuxLib,
    PieceRef,
    PieceDate,
    EcritureLib,
    Debit,
    Credit,
    EcritureLet,
    DateLet,
    ValidDate,
    Montantdevise,
    Idevise,
}

impl ExportColumn {
    /// All FEC columns in their legal order.
    pub const FEC: [ExportColumn; 18] = [
        Self::JournalCode,
        Self::JournalLib,
        Self::EcritureNum,
        Self::EcritureDate,
        Self::CompteNum,
        Self::CompteLib,
        Self::CompAuxNum,
        Self::CompAuxLib,
        Self::PieceRef,
        Self::PieceDate,
        Self::EcritureLib,
        Self::Debit,
        Self::Credit,
        Self::EcritureLet,
        Self::DateLet,
        Self::ValidDate,
        Self::Montantdevise,
        Self::Idevise,
    ];

    /// FEC header name.
    pub fn fec_name(&self) -> &'static str {
        match self {
            Self::JournalCode => "JournalCode",
            Self::JournalLib => "JournalLib",
            Self::EcritureNum => "EcritureNum",
            Self::EcritureDate => "EcritureDate",
            Self::CompteNum => "CompteNum",
            Self::CompteLib => "CompteLib",
            Self::CompAuxNum => "CompAuxNum",
            Self::CompAuxLib => "CompAuxLib",
            Self::PieceRef => "PieceRef",
            Self::PieceDate => "PieceDate",
            Self::EcritureLib => "EcritureLib",
            Self::Debit => "Debit",
            Self::Credit => "Credit",
            Self::EcritureLet => "EcritureLet",
            Self::DateLet => "DateLet",
            Self::ValidDate => "ValidDate",
            Self::Montantdevise => "Montantdevise",
            Self::Idevise => "Idevise",
        }
    }
}

/// Decimal separator for amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimalFormat {
    /// `1234,56`
    #[default]
    Comma,
    /// `1234.56`
    Dot,
}

/// One output column and its header text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub column: ExportColumn,
    pub header: String,
}

/// Journal code and label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub code: String,
    pub label: String,
}

impl Journal {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

/// Description of an accounting import format.
///
/// Dialects are data: the built-ins are ordinary values and a custom layout
/// is assembled with [`DialectSpecBuilder`] or deserialized from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectSpec {
    pub name: String,
    /// Ordered output columns.
    pub columns: Vec<ColumnSpec>,
    /// chrono strftime format for every date column.
    pub date_format: String,
    pub decimal_format: DecimalFormat,
    pub delimiter: char,
    /// Whether `render` writes a header line.
    pub header: bool,
    /// Render a zero debit or credit as an empty cell.
    pub blank_zero_amounts: bool,
    /// Journal for invoices.
    pub sales_journal: Journal,
    /// Journal for payslips.
    pub payroll_journal: Journal,
    /// Ledger category → account number.
    ///
    /// A key `"<prefix>.*"` matches every category under that prefix when
    /// no exact key exists.
    pub accounts: BTreeMap<String, String>,
}

impl Default for DialectSpec {
    fn default() -> Self {
        Self::fec()
    }
}

impl DialectSpec {
    /// Fichier des Écritures Comptables (article A47 A-1 LPF): 18
    /// tab-separated columns, `YYYYMMDD` dates, comma decimals.
    pub fn fec() -> Self {
        Self {
            name: "fec".into(),
            columns: ExportColumn::FEC
                .iter()
                .map(|&column| ColumnSpec {
                    column,
                    header: column.fec_name().into(),
                })
                .collect(),
            date_format: "%Y%m%d".into(),
            decimal_format: DecimalFormat::Comma,
            delimiter: '\t',
            header: true,
            blank_zero_amounts: true,
            sales_journal: Journal::new("VE", "Ventes"),
            payroll_journal: Journal::new("OD", "Opérations diverses"),
            accounts: default_accounts(),
        }
    }

    /// Sage import: semicolon-separated with a French header.
    pub fn sage() -> Self {
        Self {
            name: "sage".into(),
            columns: columns(&[
                (ExportColumn::EcritureDate, "Date"),
                (ExportColumn::JournalCode, "Journal"),
                (ExportColumn::CompteNum, "Compte"),
                (ExportColumn::EcritureLib, "Libellé"),
                (ExportColumn::Debit, "Débit"),
                (ExportColumn::Credit, "Crédit"),
                (ExportColumn::PieceRef, "Référence"),
            ]),
            date_format: "%d/%m/%Y".into(),
            decimal_format: DecimalFormat::Comma,
            delimiter: ';',
            header: true,
            blank_zero_amounts: true,
            ..Self::fec()
        }
    }

    /// Cegid import: pipe-separated, no header, dot decimals.
    pub fn cegid() -> Self {
        Self {
            name: "cegid".into(),
            columns: columns(&[
                (ExportColumn::JournalCode, "Journal"),
                (ExportColumn::EcritureDate, "Date"),
                (ExportColumn::CompteNum, "Compte"),
                (ExportColumn::EcritureLib, "Libellé"),
                (ExportColumn::Debit, "Débit"),
                (ExportColumn::Credit, "Crédit"),
                (ExportColumn::PieceRef, "Référence"),
            ]),
            date_format: "%d%m%Y".into(),
            decimal_format: DecimalFormat::Dot,
            delimiter: '|',
            header: false,
            blank_zero_amounts: false,
            ..Self::fec()
        }
    }

    /// Built-in dialect by name (case-insensitive).
    pub fn builtin(name: &str) -> Result<Self, GendocError> {
        match name.trim().to_lowercase().as_str() {
            "fec" => Ok(Self::fec()),
            "sage" => Ok(Self::sage()),
            "cegid" => Ok(Self::cegid()),
            other => Err(GendocError::UnsupportedDialect(format!(
                "unknown dialect '{other}' (expected fec, sage or cegid)"
            ))),
        }
    }

    /// Map a ledger category to an account, replacing any previous mapping.
    pub fn account(mut self, category: impl Into<String>, account: impl Into<String>) -> Self {
        self.accounts.insert(category.into(), account.into());
        self
    }

    /// Account for a ledger category, exact key first, then `"<prefix>.*"`.
    pub fn account_for(&self, category: &str) -> Option<&str> {
        if let Some(account) = self.accounts.get(category) {
            return Some(account);
        }
        let (prefix, _) = category.split_once('.')?;
        self.accounts.get(&format!("{prefix}.*")).map(String::as_str)
    }

    pub fn has_column(&self, column: ExportColumn) -> bool {
        self.columns.iter().any(|c| c.column == column)
    }

    /// Check that the dialect can render a ledger at all.
    pub fn validate(&self) -> Result<(), GendocError> {
        let fail = |reason: String| {
            Err(GendocError::UnsupportedDialect(format!(
                "{}: {reason}",
                self.name
            )))
        };

        if self.columns.is_empty() {
            return fail("no columns".into());
        }
        for (i, c) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|p| p.column == c.column) {
                return fail(format!("duplicate column {:?}", c.column));
            }
        }
        if !self.has_column(ExportColumn::Debit) || !self.has_column(ExportColumn::Credit) {
            return fail("both Debit and Credit columns are required".into());
        }
        if self.delimiter == '\r' || self.delimiter == '\n' {
            return fail("line breaks cannot delimit fields".into());
        }
        if self.delimiter == ',' && self.decimal_format == DecimalFormat::Comma {
            return fail("comma delimiter with comma decimals is ambiguous".into());
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return fail(format!("invalid date format '{}'", self.date_format));
        }
        Ok(())
    }
}

fn columns(spec: &[(ExportColumn, &str)]) -> Vec<ColumnSpec> {
    spec.iter()
        .map(|&(column, header)| ColumnSpec {
            column,
            header: header.into(),
        })
        .collect()
}

/// Builder for custom [`DialectSpec`]s.
///
/// Starts from the FEC journals and default account mapping, with no
/// columns.
///
/// # Example
///
/// ```
/// use gendoc::export::*;
///
/// let spec = DialectSpecBuilder::new("compact")
///     .column(ExportColumn::PieceRef, "Ref")
///     .column(ExportColumn::CompteNum, "Account")
///     .column(ExportColumn::Debit, "Debit")
///     .column(ExportColumn::Credit, "Credit")
///     .delimiter(',')
///     .decimal_format(DecimalFormat::Dot)
///     .build()
///     .unwrap();
/// assert_eq!(spec.columns.len(), 4);
/// ```
pub struct DialectSpecBuilder {
    spec: DialectSpec,
}

impl DialectSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: DialectSpec {
                name: name.into(),
                columns: Vec::new(),
                ..DialectSpec::fec()
            },
        }
    }

    /// Append an output column.
    pub fn column(mut self, column: ExportColumn, header: impl Into<String>) -> Self {
        self.spec.columns.push(ColumnSpec {
            column,
            header: header.into(),
        });
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.spec.date_format = format.into();
        self
    }

    pub fn decimal_format(mut self, format: DecimalFormat) -> Self {
        self.spec.decimal_format = format;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.spec.delimiter = delimiter;
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.spec.header = header;
        self
    }

    pub fn blank_zero_amounts(mut self, blank: bool) -> Self {
        self.spec.blank_zero_amounts = blank;
        self
    }

    pub fn sales_journal(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.spec.sales_journal = Journal::new(code, label);
        self
    }

    pub fn payroll_journal(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.spec.payroll_journal = Journal::new(code, label);
        self
    }

    /// Map a ledger category to an account.
    pub fn account(mut self, category: impl Into<String>, account: impl Into<String>) -> Self {
        self.spec.accounts.insert(category.into(), account.into());
        self
    }

    /// Replace the whole account mapping.
    pub fn accounts(mut self, accounts: BTreeMap<String, String>) -> Self {
        self.spec.accounts = accounts;
        self
    }

    /// Build and validate the dialect.
    pub fn build(self) -> Result<DialectSpec, GendocError> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}
