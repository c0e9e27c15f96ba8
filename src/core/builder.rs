use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use super::error::GendocError;
use super::types::*;
use super::validation;

/// Days between issue and due date when no due date is given.
pub const DEFAULT_PAYMENT_TERMS_DAYS: u64 = 30;

/// Builder for constructing valid invoices.
///
/// ```
/// use gendoc::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("FAC-2024-00001", NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
///     .issuer(PartyBuilder::new("Votre Entreprise SARL").registration_id("12345678900012").build())
///     .recipient(PartyBuilder::new("Client SA").address("1 rue de la Paix, 75002 Paris").build())
///     .add_line(LineItemBuilder::new("Conseil", dec!(2), dec!(50.00)).vat_rate(dec!(0.20)).build())
///     .build()
///     .unwrap();
/// assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2024, 4, 14).unwrap());
/// ```
pub struct InvoiceBuilder {
    number: String,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    currency_code: String,
    issuer: Option<Party>,
    recipient: Option<Party>,
    lines: Vec<LineItem>,
}

impl InvoiceBuilder {
    pub fn new(number: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self {
            number: number.into(),
            issue_date,
            due_date: None,
            currency_code: "EUR".to_string(),
            issuer: None,
            recipient: None,
            lines: Vec::new(),
        }
    }

    /// Échéance. Defaults to the issue date plus 30 days.
    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    pub fn issuer(mut self, party: Party) -> Self {
        self.issuer = Some(party);
        self
    }

    pub fn recipient(mut self, party: Party) -> Self {
        self.recipient = Some(party);
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.lines.push(line);
        self
    }

    /// Build the invoice and run validation.
    /// Returns all validation errors (not just the first).
    pub fn build(self) -> Result<Invoice, GendocError> {
        let invoice = self.build_unchecked()?;
        check(validation::validate_invoice(&invoice))?;
        Ok(invoice)
    }

    /// Build without record validation, for tests and trusted imports.
    pub fn build_unchecked(self) -> Result<Invoice, GendocError> {
        let issuer = self
            .issuer
            .ok_or_else(|| GendocError::Builder("issuer is required".into()))?;
        let recipient = self
            .recipient
            .ok_or_else(|| GendocError::Builder("recipient is required".into()))?;

        if self.lines.len() > 10_000 {
            return Err(GendocError::Builder(
                "invoice cannot have more than 10,000 line items".into(),
            ));
        }

        let due_date = match self.due_date {
            Some(date) => date,
            None => self
                .issue_date
                .checked_add_days(Days::new(DEFAULT_PAYMENT_TERMS_DAYS))
                .ok_or_else(|| GendocError::Builder("due date out of range".into()))?,
        };

        Ok(Invoice {
            number: self.number,
            issuer,
            recipient,
            issue_date: self.issue_date,
            due_date,
            currency_code: self.currency_code,
            lines: self.lines,
        })
    }
}

/// Builder for payslips.
///
/// ```
/// use gendoc::core::*;
/// use rust_decimal_macros::dec;
///
/// let slip = PayslipBuilder::new("PAI-2024-00001", PayPeriod::new(2024, 3).unwrap())
///     .employer(PartyBuilder::new("Votre Entreprise SARL").build())
///     .employee(EmployeeBuilder::new("Martin", "Claire").id("M042").build())
///     .gross_salary(dec!(3000))
///     .add_contribution(ContributionLine::with_rates("mutuelle", dec!(3000), dec!(0.01), dec!(0.01)))
///     .build()
///     .unwrap();
/// assert_eq!(slip.contributions.len(), 1);
/// ```
pub struct PayslipBuilder {
    number: String,
    period: PayPeriod,
    employer: Option<Party>,
    employee: Option<Employee>,
    gross_salary: Option<Decimal>,
    hours_worked: Option<Decimal>,
    contributions: Vec<ContributionLine>,
}

impl PayslipBuilder {
    pub fn new(number: impl Into<String>, period: PayPeriod) -> Self {
        Self {
            number: number.into(),
            period,
            employer: None,
            employee: None,
            gross_salary: None,
            hours_worked: None,
            contributions: Vec::new(),
        }
    }

    pub fn employer(mut self, party: Party) -> Self {
        self.employer = Some(party);
        self
    }

    pub fn employee(mut self, employee: Employee) -> Self {
        self.employee = Some(employee);
        self
    }

    pub fn gross_salary(mut self, amount: Decimal) -> Self {
        self.gross_salary = Some(amount);
        self
    }

    pub fn hours_worked(mut self, hours: Decimal) -> Self {
        self.hours_worked = Some(hours);
        self
    }

    /// Add a contribution line. Without any, every scheme of the rate
    /// table is applied to the gross salary.
    pub fn add_contribution(mut self, line: ContributionLine) -> Self {
        self.contributions.push(line);
        self
    }

    pub fn build(self) -> Result<Payslip, GendocError> {
        let employer = self
            .employer
            .ok_or_else(|| GendocError::Builder("employer is required".into()))?;
        let employee = self
            .employee
            .ok_or_else(|| GendocError::Builder("employee is required".into()))?;
        let gross_salary = self
            .gross_salary
            .ok_or_else(|| GendocError::Builder("gross salary is required".into()))?;

        let payslip = Payslip {
            number: self.number,
            employer,
            employee,
            period: self.period,
            gross_salary,
            hours_worked: self.hours_worked,
            contributions: self.contributions,
        };
        check(validation::validate_payslip(&payslip))?;
        Ok(payslip)
    }
}

/// Builder for Party (issuer, recipient, employer).
pub struct PartyBuilder {
    name: String,
    address: Option<String>,
    registration_id: Option<String>,
    vat_id: Option<String>,
    email: Option<String>,
}

impl PartyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            registration_id: None,
            vat_id: None,
            email: None,
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// SIRET or SIREN.
    pub fn registration_id(mut self, id: impl Into<String>) -> Self {
        self.registration_id = Some(id.into());
        self
    }

    pub fn vat_id(mut self, id: impl Into<String>) -> Self {
        self.vat_id = Some(id.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn build(self) -> Party {
        Party {
            name: self.name,
            address: self.address,
            registration_id: self.registration_id,
            vat_id: self.vat_id,
            email: self.email,
        }
    }
}

/// Builder for Employee.
pub struct EmployeeBuilder {
    last_name: String,
    first_name: String,
    id: Option<String>,
    position: Option<String>,
}

impl EmployeeBuilder {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            id: None,
            position: None,
        }
    }

    /// Matricule.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn build(self) -> Employee {
        Employee {
            id: self.id,
            last_name: self.last_name,
            first_name: self.first_name,
            position: self.position,
        }
    }
}

/// Builder for invoice line items.
pub struct LineItemBuilder {
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: Decimal,
    discount: Decimal,
}

impl LineItemBuilder {
    /// New line at the French standard rate (20 %), no discount.
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            vat_rate: Decimal::new(20, 2),
            discount: Decimal::ZERO,
        }
    }

    /// VAT rate as a fraction (0.055 for 5.5 %).
    pub fn vat_rate(mut self, rate: Decimal) -> Self {
        self.vat_rate = rate;
        self
    }

    /// Discount as a fraction (0.10 for 10 %).
    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn build(self) -> LineItem {
        LineItem {
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            vat_rate: self.vat_rate,
            discount: self.discount,
        }
    }
}

fn check(errors: Vec<super::error::ValidationError>) -> Result<(), GendocError> {
    if errors.is_empty() {
        return Ok(());
    }
    let msg = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(GendocError::Validation(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_recipient_is_builder_error() {
        let err = InvoiceBuilder::new("FAC-1", date(2024, 1, 1))
            .issuer(PartyBuilder::new("A").build())
            .add_line(LineItemBuilder::new("x", dec!(1), dec!(1)).build())
            .build()
            .unwrap_err();
        assert!(matches!(err, GendocError::Builder(_)));
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = InvoiceBuilder::new("", date(2024, 1, 1))
            .issuer(PartyBuilder::new("A").build())
            .recipient(PartyBuilder::new("B").build())
            .add_line(
                LineItemBuilder::new("x", dec!(1), dec!(1))
                    .vat_rate(dec!(20))
                    .build(),
            )
            .build()
            .unwrap_err();
        let GendocError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("number"));
        assert!(msg.contains("lines[0].vat_rate"));
        assert!(msg.contains("; "));
    }

    #[test]
    fn explicit_due_date_is_kept() {
        let inv = InvoiceBuilder::new("FAC-1", date(2024, 1, 1))
            .due_date(date(2024, 1, 15))
            .issuer(PartyBuilder::new("A").build())
            .recipient(PartyBuilder::new("B").build())
            .add_line(LineItemBuilder::new("x", dec!(1), dec!(1)).build())
            .build()
            .unwrap();
        assert_eq!(inv.due_date, date(2024, 1, 15));
        assert_eq!(inv.lines[0].vat_rate, dec!(0.20));
    }

    #[test]
    fn payslip_requires_gross() {
        let err = PayslipBuilder::new("PAI-1", PayPeriod::new(2024, 1).unwrap())
            .employer(PartyBuilder::new("A").build())
            .employee(EmployeeBuilder::new("Martin", "Claire").build())
            .build()
            .unwrap_err();
        assert!(matches!(err, GendocError::Builder(_)));
    }
}
