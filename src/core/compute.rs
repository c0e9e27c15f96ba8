//! Computation engine: invoice VAT totals and payslip contributions.
//!
//! All rounding is to 2 decimal places, half-to-even, applied per line,
//! per VAT bracket and per contribution share.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::GendocError;
use super::rates::RateTable;
use super::types::*;
use super::validation;

/// Round a monetary amount to cents, half-to-even.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Compute totals for a record.
///
/// The record is validated first; invariant violations fail with
/// [`GendocError::Validation`].
///
/// ```
/// use gendoc::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("FAC-2024-00001", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
///     .issuer(PartyBuilder::new("Votre Entreprise").build())
///     .recipient(PartyBuilder::new("Client SA").build())
///     .add_line(LineItemBuilder::new("Conseil", dec!(2), dec!(50.00)).vat_rate(dec!(0.20)).build())
///     .build()
///     .unwrap();
///
/// let doc = compute(&invoice.into(), &RateTable::france_2024()).unwrap();
/// let totals = doc.invoice_totals().unwrap();
/// assert_eq!(totals.subtotal, dec!(100.00));
/// assert_eq!(totals.total_vat, dec!(20.00));
/// assert_eq!(totals.grand_total, dec!(120.00));
/// ```
pub fn compute(record: &DocumentRecord, rates: &RateTable) -> Result<FinalizedDocument, GendocError> {
    let errors = validation::validate_record(record);
    if !errors.is_empty() {
        let msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(GendocError::Validation(format!("{}: {msg}", record.id())));
    }

    let totals = match record {
        DocumentRecord::Invoice(inv) => Totals::Invoice(invoice_totals(inv, rates)?),
        DocumentRecord::Payslip(slip) => Totals::Payslip(payslip_totals(slip, rates)?),
    };
    Ok(FinalizedDocument::new(record.clone(), totals))
}

fn invoice_totals(invoice: &Invoice, rates: &RateTable) -> Result<InvoiceTotals, GendocError> {
    let doc = invoice.number.as_str();
    let mut line_amounts = Vec::with_capacity(invoice.lines.len());
    for (i, l) in invoice.lines.iter().enumerate() {
        let amount = l
            .quantity
            .checked_mul(l.unit_price)
            .and_then(|gross| gross.checked_mul(Decimal::ONE - l.discount))
            .ok_or_else(|| overflow(doc, format!("lines[{i}].amount")))?;
        line_amounts.push(round_money(amount));
    }

    // Keyed by normalized rate so 0.2 and 0.20 share a bracket
    let mut groups: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    for (line, amount) in invoice.lines.iter().zip(&line_amounts) {
        let rate = line.vat_rate.normalize();
        let taxable = groups.entry(rate).or_insert(Decimal::ZERO);
        *taxable = taxable
            .checked_add(*amount)
            .ok_or_else(|| overflow(doc, format!("taxable amount at rate {rate}")))?;
    }

    let mut vat_breakdown = Vec::with_capacity(groups.len());
    for (rate, taxable_amount) in groups {
        let category = rates.vat_category(rate).ok_or_else(|| GendocError::InvalidRate {
            document: invoice.number.clone(),
            rate: format!("VAT rate {rate}"),
        })?;
        let tax_amount = taxable_amount
            .checked_mul(rate)
            .ok_or_else(|| overflow(doc, format!("VAT at rate {rate}")))?;
        vat_breakdown.push(VatBracket {
            rate,
            category: category.to_string(),
            taxable_amount,
            tax_amount: round_money(tax_amount),
        });
    }

    let subtotal = checked_sum(line_amounts.iter().copied()).ok_or_else(|| overflow(doc, "subtotal".into()))?;
    let total_vat = checked_sum(vat_breakdown.iter().map(|b| b.tax_amount))
        .ok_or_else(|| overflow(doc, "total VAT".into()))?;
    let grand_total = subtotal
        .checked_add(total_vat)
        .ok_or_else(|| overflow(doc, "grand total".into()))?;

    tracing::debug!(
        document = %invoice.number,
        lines = line_amounts.len(),
        brackets = vat_breakdown.len(),
        %subtotal,
        %total_vat,
        %grand_total,
        "computed invoice totals"
    );

    Ok(InvoiceTotals {
        line_amounts,
        subtotal,
        vat_breakdown,
        total_vat,
        grand_total,
    })
}

fn payslip_totals(payslip: &Payslip, rates: &RateTable) -> Result<PayslipTotals, GendocError> {
    // No explicit lines: the whole schedule applies to the gross salary
    let lines: Vec<ContributionLine> = if payslip.contributions.is_empty() {
        rates
            .schemes()
            .map(|(name, _)| ContributionLine::from_table(name, payslip.gross_salary))
            .collect()
    } else {
        payslip.contributions.clone()
    };

    let mut contributions = Vec::with_capacity(lines.len());
    for line in &lines {
        contributions.push(resolve_share(&payslip.number, line, rates)?);
    }

    let doc = payslip.number.as_str();
    let gross = payslip.gross_salary;
    let employee_contrib_total = checked_sum(contributions.iter().map(|c| c.employee_share))
        .ok_or_else(|| overflow(doc, "employee contributions".into()))?;
    let employer_contrib_total = checked_sum(contributions.iter().map(|c| c.employer_share))
        .ok_or_else(|| overflow(doc, "employer contributions".into()))?;
    // Every amount the ledger posts must stay representable
    employee_contrib_total
        .checked_add(employer_contrib_total)
        .ok_or_else(|| overflow(doc, "total contributions".into()))?;
    let employer_cost = gross
        .checked_add(employer_contrib_total)
        .ok_or_else(|| overflow(doc, "employer cost".into()))?;

    let net = gross - employee_contrib_total;
    if net < Decimal::ZERO {
        return Err(GendocError::NegativeResult {
            document: payslip.number.clone(),
            net,
        });
    }

    let net_social = gross
        - contributions
            .iter()
            .filter(|c| c.counts_toward_net_social)
            .map(|c| c.employee_share)
            .sum::<Decimal>();

    tracing::debug!(
        document = %payslip.number,
        schemes = contributions.len(),
        %gross,
        %employee_contrib_total,
        %employer_contrib_total,
        %net,
        "computed payslip totals"
    );

    Ok(PayslipTotals {
        gross,
        contributions,
        employee_contrib_total,
        employer_contrib_total,
        net,
        net_social,
        employer_cost,
    })
}

fn resolve_share(
    document: &str,
    line: &ContributionLine,
    rates: &RateTable,
) -> Result<ContributionShare, GendocError> {
    let table = rates.scheme_rates(&line.scheme);
    if table.is_some_and(|t| !t.is_valid()) {
        return Err(GendocError::InvalidRate {
            document: document.to_string(),
            rate: format!("rates of scheme '{}' outside 0 to 1", line.scheme),
        });
    }
    let missing = |which: &str| GendocError::InvalidRate {
        document: document.to_string(),
        rate: format!("{which} rate of scheme '{}'", line.scheme),
    };

    let employee_rate = line
        .employee_rate
        .or(table.map(|t| t.employee_rate))
        .ok_or_else(|| missing("employee"))?;
    let employer_rate = line
        .employer_rate
        .or(table.map(|t| t.employer_rate))
        .ok_or_else(|| missing("employer"))?;

    let base_amount = match table.and_then(|t| t.ceiling) {
        Some(ceiling) => line.base_amount.min(ceiling),
        None => line.base_amount,
    };

    let share = |rate: Decimal, side: &str| {
        base_amount
            .checked_mul(rate)
            .map(round_money)
            .ok_or_else(|| overflow(document, format!("{side} share of scheme '{}'", line.scheme)))
    };
    let employee_share = share(employee_rate, "employee")?;
    let employer_share = share(employer_rate, "employer")?;
    employee_share
        .checked_add(employer_share)
        .ok_or_else(|| overflow(document, format!("contribution to scheme '{}'", line.scheme)))?;

    Ok(ContributionShare {
        scheme: line.scheme.clone(),
        base_amount,
        employee_rate,
        employer_rate,
        employee_share,
        employer_share,
        counts_toward_net_social: !table.is_some_and(|t| t.excluded_from_net_social),
    })
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

fn overflow(document: &str, amount: String) -> GendocError {
    GendocError::AmountOverflow {
        document: document.to_string(),
        amount,
    }
}
