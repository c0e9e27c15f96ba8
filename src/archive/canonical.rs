//! Canonical byte serialization and content hashing.
//!
//! One `key=value` pair per line in a fixed order. Values escape `\`, CR
//! and LF; an absent optional value is written as the bare key. Decimals
//! are normalized (`120.00` and `120` hash alike) and dates are ISO 8601.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::core::{
    DocumentRecord, FinalizedDocument, Invoice, InvoiceTotals, Party, Payslip, PayslipTotals,
    Totals,
};

/// Format tag written as the first line; bump when the layout changes.
pub const CANONICAL_VERSION: &str = "gendoc-canonical/1";

/// `previous_hash` of the first archive entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Canonical bytes of a finalized document.
pub fn canonical_bytes(doc: &FinalizedDocument) -> Vec<u8> {
    let mut w = Canon::default();
    w.field("version", CANONICAL_VERSION);
    w.field("kind", doc.kind().code());
    w.field("id", doc.id());

    match doc.record() {
        DocumentRecord::Invoice(inv) => write_invoice(&mut w, inv),
        DocumentRecord::Payslip(slip) => write_payslip(&mut w, slip),
    }
    match doc.totals() {
        Totals::Invoice(t) => write_invoice_totals(&mut w, t),
        Totals::Payslip(t) => write_payslip_totals(&mut w, t),
    }
    w.out.into_bytes()
}

/// SHA-256 of the canonical bytes, lowercase hex.
///
/// ```
/// use gendoc::archive::content_hash;
/// use gendoc::core::*;
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
/// let hash = content_hash(&doc);
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, content_hash(&doc.clone()));
/// ```
pub fn content_hash(doc: &FinalizedDocument) -> String {
    format!("{:x}", Sha256::digest(canonical_bytes(doc)))
}

#[derive(Default)]
struct Canon {
    out: String,
}

impl Canon {
    fn field(&mut self, key: &str, value: &str) {
        self.out.push_str(key);
        self.out.push('=');
        for c in value.chars() {
            match c {
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                _ => self.out.push(c),
            }
        }
        self.out.push('\n');
    }

    fn opt(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => self.field(key, v),
            None => {
                self.out.push_str(key);
                self.out.push('\n');
            }
        }
    }

    fn decimal(&mut self, key: &str, value: Decimal) {
        self.field(key, &value.normalize().to_string());
    }

    fn opt_decimal(&mut self, key: &str, value: Option<Decimal>) {
        self.opt(key, value.map(|d| d.normalize().to_string()).as_deref());
    }

    fn date(&mut self, key: &str, value: NaiveDate) {
        self.field(key, &value.format("%Y-%m-%d").to_string());
    }

    fn flag(&mut self, key: &str, value: bool) {
        self.field(key, if value { "1" } else { "0" });
    }

    fn count(&mut self, key: &str, n: usize) {
        self.field(key, &n.to_string());
    }

    fn party(&mut self, prefix: &str, party: &Party) {
        self.field(&format!("{prefix}.name"), &party.name);
        self.opt(&format!("{prefix}.address"), party.address.as_deref());
        self.opt(&format!("{prefix}.registration_id"), party.registration_id.as_deref());
        self.opt(&format!("{prefix}.vat_id"), party.vat_id.as_deref());
        self.opt(&format!("{prefix}.email"), party.email.as_deref());
    }
}

fn write_invoice(w: &mut Canon, inv: &Invoice) {
    w.party("issuer", &inv.issuer);
    w.party("recipient", &inv.recipient);
    w.date("issue_date", inv.issue_date);
    w.date("due_date", inv.due_date);
    w.field("currency", &inv.currency_code);
    w.count("lines", inv.lines.len());
    for (i, line) in inv.lines.iter().enumerate() {
        w.field(&format!("line.{i}.description"), &line.description);
        w.decimal(&format!("line.{i}.quantity"), line.quantity);
        w.decimal(&format!("line.{i}.unit_price"), line.unit_price);
        w.decimal(&format!("line.{i}.vat_rate"), line.vat_rate);
        w.decimal(&format!("line.{i}.discount"), line.discount);
    }
}

fn write_payslip(w: &mut Canon, slip: &Payslip) {
    w.party("employer", &slip.employer);
    w.opt("employee.id", slip.employee.id.as_deref());
    w.field("employee.last_name", &slip.employee.last_name);
    w.field("employee.first_name", &slip.employee.first_name);
    w.opt("employee.position", slip.employee.position.as_deref());
    w.field("period", &format!("{:04}-{:02}", slip.period.year(), slip.period.month()));
    w.decimal("gross_salary", slip.gross_salary);
    w.opt_decimal("hours_worked", slip.hours_worked);
    w.count("contributions", slip.contributions.len());
    for (i, c) in slip.contributions.iter().enumerate() {
        w.field(&format!("contribution.{i}.scheme"), &c.scheme);
        w.decimal(&format!("contribution.{i}.base"), c.base_amount);
        w.opt_decimal(&format!("contribution.{i}.employee_rate"), c.employee_rate);
        w.opt_decimal(&format!("contribution.{i}.employer_rate"), c.employer_rate);
    }
}

fn write_invoice_totals(w: &mut Canon, t: &InvoiceTotals) {
    for (i, amount) in t.line_amounts.iter().enumerate() {
        w.decimal(&format!("total.line.{i}"), *amount);
    }
    w.decimal("total.subtotal", t.subtotal);
    w.count("total.brackets", t.vat_breakdown.len());
    for (i, b) in t.vat_breakdown.iter().enumerate() {
        w.decimal(&format!("total.bracket.{i}.rate"), b.rate);
        w.field(&format!("total.bracket.{i}.category"), &b.category);
        w.decimal(&format!("total.bracket.{i}.taxable"), b.taxable_amount);
        w.decimal(&format!("total.bracket.{i}.tax"), b.tax_amount);
    }
    w.decimal("total.vat", t.total_vat);
    w.decimal("total.grand", t.grand_total);
}

fn write_payslip_totals(w: &mut Canon, t: &PayslipTotals) {
    w.decimal("total.gross", t.gross);
    w.count("total.shares", t.contributions.len());
    for (i, s) in t.contributions.iter().enumerate() {
        w.field(&format!("total.share.{i}.scheme"), &s.scheme);
        w.decimal(&format!("total.share.{i}.base"), s.base_amount);
        w.decimal(&format!("total.share.{i}.employee_rate"), s.employee_rate);
        w.decimal(&format!("total.share.{i}.employer_rate"), s.employer_rate);
        w.decimal(&format!("total.share.{i}.employee"), s.employee_share);
        w.decimal(&format!("total.share.{i}.employer"), s.employer_share);
        w.flag(&format!("total.share.{i}.net_social"), s.counts_toward_net_social);
    }
    w.decimal("total.employee", t.employee_contrib_total);
    w.decimal("total.employer", t.employer_contrib_total);
    w.decimal("total.net", t.net);
    w.decimal("total.net_social", t.net_social);
    w.decimal("total.employer_cost", t.employer_cost);
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::core::*;

    fn doc(recipient: &str, price: Decimal) -> FinalizedDocument {
        let invoice = InvoiceBuilder::new("FAC-2024-00001", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .issuer(PartyBuilder::new("Votre Entreprise").build())
            .recipient(PartyBuilder::new(recipient).build())
            .add_line(LineItemBuilder::new("Conseil", dec!(2), price).build())
            .build()
            .unwrap();
        compute(&invoice.into(), &RateTable::france_2024()).unwrap()
    }

    #[test]
    fn layout_is_line_oriented() {
        let text = String::from_utf8(canonical_bytes(&doc("Client SA", dec!(50)))).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "version=gendoc-canonical/1");
        assert_eq!(lines[1], "kind=invoice");
        assert_eq!(lines[2], "id=FAC-2024-00001");
        assert!(lines.contains(&"recipient.address"));
        assert!(lines.contains(&"total.grand=120"));
        assert!(lines.contains(&"line.0.vat_rate=0.2"));
    }

    #[test]
    fn newlines_are_escaped() {
        let text = String::from_utf8(canonical_bytes(&doc("Client\nSA\\", dec!(50)))).unwrap();
        assert!(text.contains("recipient.name=Client\\nSA\\\\\n"));
    }

    #[test]
    fn decimal_scale_does_not_change_hash() {
        assert_eq!(
            content_hash(&doc("Client SA", dec!(50))),
            content_hash(&doc("Client SA", dec!(50.000)))
        );
        assert_ne!(
            content_hash(&doc("Client SA", dec!(50))),
            content_hash(&doc("Client SA", dec!(50.01)))
        );
    }

    #[test]
    fn genesis_is_64_zeros() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }
}
