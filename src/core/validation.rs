use rust_decimal::Decimal;

use super::error::ValidationError;
use super::types::*;

/// Validate record invariants.
/// Returns all validation errors found (not just the first).
pub fn validate_record(record: &DocumentRecord) -> Vec<ValidationError> {
    match record {
        DocumentRecord::Invoice(inv) => validate_invoice(inv),
        DocumentRecord::Payslip(slip) => validate_payslip(slip),
    }
}

pub fn validate_invoice(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if invoice.number.trim().is_empty() {
        errors.push(ValidationError::new(
            "number",
            "invoice number must not be empty",
        ));
    }

    if invoice.currency_code.len() != 3
        || !invoice
            .currency_code
            .chars()
            .all(|c| c.is_ascii_uppercase())
    {
        errors.push(ValidationError::new(
            "currency_code",
            format!(
                "currency code '{}' must be 3 uppercase letters (ISO 4217)",
                invoice.currency_code
            ),
        ));
    }

    validate_party(&invoice.issuer, "issuer", &mut errors);
    validate_party(&invoice.recipient, "recipient", &mut errors);

    if invoice.due_date < invoice.issue_date {
        errors.push(ValidationError::new(
            "due_date",
            format!(
                "due date {} is before issue date {}",
                invoice.due_date, invoice.issue_date
            ),
        ));
    }

    if invoice.lines.is_empty() {
        errors.push(ValidationError::new(
            "lines",
            "invoice must have at least one line item",
        ));
    }

    for (i, line) in invoice.lines.iter().enumerate() {
        let prefix = format!("lines[{i}]");
        if line.description.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{prefix}.description"),
                "description must not be empty",
            ));
        }
        if line.quantity.is_sign_negative() && !line.quantity.is_zero() {
            errors.push(ValidationError::new(
                format!("{prefix}.quantity"),
                format!("quantity {} must not be negative", line.quantity),
            ));
        }
        if line.unit_price.is_sign_negative() && !line.unit_price.is_zero() {
            errors.push(ValidationError::new(
                format!("{prefix}.unit_price"),
                format!("unit price {} must not be negative", line.unit_price),
            ));
        }
        check_fraction(line.vat_rate, &format!("{prefix}.vat_rate"), &mut errors);
        check_fraction(line.discount, &format!("{prefix}.discount"), &mut errors);
    }

    errors
}

pub fn validate_payslip(payslip: &Payslip) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if payslip.number.trim().is_empty() {
        errors.push(ValidationError::new(
            "number",
            "payslip number must not be empty",
        ));
    }

    validate_party(&payslip.employer, "employer", &mut errors);

    if payslip.employee.last_name.trim().is_empty() {
        errors.push(ValidationError::new(
            "employee.last_name",
            "employee last name must not be empty",
        ));
    }

    if payslip.gross_salary < Decimal::ZERO {
        errors.push(ValidationError::new(
            "gross_salary",
            format!("gross salary {} must not be negative", payslip.gross_salary),
        ));
    }

    if let Some(hours) = payslip.hours_worked {
        if hours < Decimal::ZERO {
            errors.push(ValidationError::new(
                "hours_worked",
                "hours worked must not be negative",
            ));
        }
    }

    for (i, line) in payslip.contributions.iter().enumerate() {
        let prefix = format!("contributions[{i}]");
        if line.scheme.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{prefix}.scheme"),
                "scheme must not be empty",
            ));
        }
        if line.base_amount < Decimal::ZERO {
            errors.push(ValidationError::new(
                format!("{prefix}.base_amount"),
                format!("base amount {} must not be negative", line.base_amount),
            ));
        }
        if let Some(rate) = line.employee_rate {
            check_fraction(rate, &format!("{prefix}.employee_rate"), &mut errors);
        }
        if let Some(rate) = line.employer_rate {
            check_fraction(rate, &format!("{prefix}.employer_rate"), &mut errors);
        }
    }

    errors
}

/// Validate computed totals against the record they were computed from.
pub fn validate_arithmetic(doc: &FinalizedDocument) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match doc.totals() {
        Totals::Invoice(t) => {
            let line_sum: Decimal = t.line_amounts.iter().sum();
            if line_sum != t.subtotal {
                errors.push(ValidationError::new(
                    "totals.subtotal",
                    format!("subtotal {} != sum of lines {line_sum}", t.subtotal),
                ));
            }
            let base_sum: Decimal = t.vat_breakdown.iter().map(|b| b.taxable_amount).sum();
            if base_sum != t.subtotal {
                errors.push(ValidationError::new(
                    "totals.vat_breakdown",
                    format!("bracket bases {base_sum} != subtotal {}", t.subtotal),
                ));
            }
            let vat_sum: Decimal = t.vat_breakdown.iter().map(|b| b.tax_amount).sum();
            if vat_sum != t.total_vat {
                errors.push(ValidationError::new(
                    "totals.total_vat",
                    format!("total VAT {} != sum of brackets {vat_sum}", t.total_vat),
                ));
            }
            if t.subtotal + t.total_vat != t.grand_total {
                errors.push(ValidationError::new(
                    "totals.grand_total",
                    format!(
                        "grand total {} != {} + {}",
                        t.grand_total, t.subtotal, t.total_vat
                    ),
                ));
            }
        }
        Totals::Payslip(t) => {
            let employee: Decimal = t.contributions.iter().map(|c| c.employee_share).sum();
            if employee != t.employee_contrib_total {
                errors.push(ValidationError::new(
                    "totals.employee_contrib_total",
                    format!(
                        "employee total {} != sum of shares {employee}",
                        t.employee_contrib_total
                    ),
                ));
            }
            if t.gross - t.employee_contrib_total != t.net {
                errors.push(ValidationError::new(
                    "totals.net",
                    format!(
                        "net {} != {} - {}",
                        t.net, t.gross, t.employee_contrib_total
                    ),
                ));
            }
            if t.gross + t.employer_contrib_total != t.employer_cost {
                errors.push(ValidationError::new(
                    "totals.employer_cost",
                    format!(
                        "employer cost {} != {} + {}",
                        t.employer_cost, t.gross, t.employer_contrib_total
                    ),
                ));
            }
        }
    }

    errors
}

fn validate_party(party: &Party, prefix: &str, errors: &mut Vec<ValidationError>) {
    if party.name.trim().is_empty() {
        errors.push(ValidationError::new(
            format!("{prefix}.name"),
            "name must not be empty",
        ));
    }
}

fn check_fraction(value: Decimal, field: &str, errors: &mut Vec<ValidationError>) {
    if value < Decimal::ZERO || value > Decimal::ONE {
        errors.push(ValidationError::new(
            field,
            format!("rate {value} must be between 0 and 1"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn party(name: &str) -> Party {
        Party {
            name: name.into(),
            address: None,
            registration_id: None,
            vat_id: None,
            email: None,
        }
    }

    fn invoice(lines: Vec<LineItem>) -> Invoice {
        Invoice {
            number: "FAC-2024-00001".into(),
            issuer: party("Votre Entreprise"),
            recipient: party("Client SA"),
            issue_date: date(1),
            due_date: date(30),
            currency_code: "EUR".into(),
            lines,
        }
    }

    fn line(quantity: Decimal, price: Decimal, rate: Decimal) -> LineItem {
        LineItem {
            description: "Prestation".into(),
            quantity,
            unit_price: price,
            vat_rate: rate,
            discount: Decimal::ZERO,
        }
    }

    #[test]
    fn valid_invoice_has_no_errors() {
        let inv = invoice(vec![line(dec!(2), dec!(50), dec!(0.2))]);
        assert!(validate_invoice(&inv).is_empty());
    }

    #[test]
    fn negative_quantity_and_rate_out_of_range() {
        let inv = invoice(vec![line(dec!(-1), dec!(50), dec!(20))]);
        let errors = validate_invoice(&inv);
        assert!(errors.iter().any(|e| e.field == "lines[0].quantity"));
        assert!(errors.iter().any(|e| e.field == "lines[0].vat_rate"));
    }

    #[test]
    fn empty_invoice_and_bad_currency() {
        let mut inv = invoice(vec![]);
        inv.currency_code = "euro".into();
        let errors = validate_invoice(&inv);
        assert!(errors.iter().any(|e| e.field == "lines"));
        assert!(errors.iter().any(|e| e.field == "currency_code"));
    }

    #[test]
    fn due_date_before_issue_date() {
        let mut inv = invoice(vec![line(dec!(1), dec!(1), dec!(0))]);
        inv.due_date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let errors = validate_invoice(&inv);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "due_date");
    }

    #[test]
    fn payslip_rates_checked_only_when_present() {
        let slip = Payslip {
            number: "PAI-2024-00001".into(),
            employer: party("Votre Entreprise"),
            employee: Employee {
                id: None,
                last_name: "Martin".into(),
                first_name: "Claire".into(),
                position: None,
            },
            period: PayPeriod::new(2024, 3).unwrap(),
            gross_salary: dec!(3000),
            hours_worked: None,
            contributions: vec![
                ContributionLine {
                    scheme: "csg".into(),
                    base_amount: dec!(3000),
                    employee_rate: None,
                    employer_rate: None,
                },
                ContributionLine {
                    scheme: "retraite".into(),
                    base_amount: dec!(3000),
                    employee_rate: Some(dec!(1.5)),
                    employer_rate: None,
                },
            ],
        };
        let errors = validate_payslip(&slip);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "contributions[1].employee_rate");
    }
}
