use chrono::NaiveDate;
use gendoc::core::*;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn issuer() -> Party {
    PartyBuilder::new("Votre Entreprise SARL")
        .address("12 rue des Lilas, 75011 Paris")
        .registration_id("12345678900012")
        .vat_id("FR12345678901")
        .build()
}

fn client() -> Party {
    PartyBuilder::new("Client SA")
        .address("1 avenue Foch, 69006 Lyon")
        .email("compta@client.fr")
        .build()
}

fn employee() -> Employee {
    EmployeeBuilder::new("Martin", "Alice")
        .id("M001")
        .position("Développeuse")
        .build()
}

// --- Invoices ---

#[test]
fn two_units_at_fifty_with_standard_vat() {
    let invoice = InvoiceBuilder::new("FAC-2024-00001", date(2024, 6, 15))
        .issuer(issuer())
        .recipient(client())
        .add_line(LineItemBuilder::new("Conseil", dec!(2), dec!(50.00)).vat_rate(dec!(0.20)).build())
        .build()
        .unwrap();
    assert_eq!(invoice.due_date, date(2024, 7, 15));

    let doc = compute(&invoice.into(), &RateTable::france_2024()).unwrap();
    let totals = doc.invoice_totals().unwrap();
    assert_eq!(totals.subtotal, dec!(100.00));
    assert_eq!(totals.vat_by_rate().get(&dec!(0.20)), Some(&dec!(20.00)));
    assert_eq!(totals.grand_total, dec!(120.00));
    assert_eq!(doc.amount_due(), dec!(120.00));
    assert_eq!(doc.currency_code(), "EUR");
    assert!(validate_arithmetic(&doc).is_empty());
}

#[test]
fn mixed_rates_with_discount() {
    let invoice = InvoiceBuilder::new("FAC-2024-00002", date(2024, 6, 15))
        .due_date(date(2024, 6, 30))
        .issuer(issuer())
        .recipient(client())
        .add_line(
            LineItemBuilder::new("Formation", dec!(3), dec!(333.33))
                .discount(dec!(0.10))
                .build(),
        )
        .add_line(
            LineItemBuilder::new("Repas", dec!(12), dec!(14.50))
                .vat_rate(dec!(0.10))
                .build(),
        )
        .add_line(
            LineItemBuilder::new("Livres", dec!(4), dec!(19.99))
                .vat_rate(dec!(0.055))
                .build(),
        )
        .build()
        .unwrap();

    let doc = compute(&invoice.into(), &RateTable::france_2024()).unwrap();
    let t = doc.invoice_totals().unwrap();
    // 3 × 333.33 × 0.90 = 899.991 → 899.99
    assert_eq!(t.line_amounts, vec![dec!(899.99), dec!(174.00), dec!(79.96)]);
    assert_eq!(t.subtotal, dec!(1153.95));

    let rates: Vec<_> = t.vat_breakdown.iter().map(|b| (b.rate, b.category.as_str())).collect();
    assert_eq!(
        rates,
        vec![
            (dec!(0.055), "reduit"),
            (dec!(0.10), "intermediaire"),
            (dec!(0.20), "normal"),
        ]
    );
    // 79.96 × 0.055 = 4.3978 → 4.40 ; 174 × 0.10 = 17.40 ; 899.99 × 0.2 = 179.998 → 180.00
    assert_eq!(t.total_vat, dec!(201.80));
    assert_eq!(t.grand_total, t.subtotal + t.total_vat);
}

#[test]
fn vat_rate_missing_from_table() {
    let invoice = InvoiceBuilder::new("FAC-2024-00003", date(2024, 6, 15))
        .issuer(issuer())
        .recipient(client())
        .add_line(LineItemBuilder::new("Import", dec!(1), dec!(10)).vat_rate(dec!(0.07)).build())
        .build()
        .unwrap();
    let err = compute(&invoice.into(), &RateTable::france_2024()).unwrap_err();
    assert!(matches!(err, GendocError::InvalidRate { .. }));
    assert_eq!(err.class(), ErrorClass::Configuration);
}

#[test]
fn amounts_beyond_decimal_range_fail_cleanly() {
    let huge = dec!(99999999999999999999);
    let invoice = InvoiceBuilder::new("FAC-2024-00004", date(2024, 6, 15))
        .issuer(issuer())
        .recipient(client())
        .add_line(LineItemBuilder::new("Lot", huge, huge).build())
        .build()
        .unwrap();
    let err = compute(&invoice.into(), &RateTable::france_2024()).unwrap_err();
    assert!(matches!(err, GendocError::AmountOverflow { ref document, .. } if document == "FAC-2024-00004"));
    assert_eq!(err.class(), ErrorClass::Configuration);
    assert!(err.to_string().contains("overflows"));
}

#[test]
fn builder_collects_every_violation() {
    let err = InvoiceBuilder::new("", date(2024, 6, 15))
        .due_date(date(2024, 6, 1))
        .currency("euro")
        .issuer(issuer())
        .recipient(client())
        .add_line(LineItemBuilder::new("Conseil", dec!(-1), dec!(10)).build())
        .build()
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("number"), "{msg}");
    assert!(msg.contains("currency"), "{msg}");
    assert!(msg.contains("due"), "{msg}");
    assert!(msg.contains("quantity"), "{msg}");
}

#[test]
fn builder_requires_parties() {
    let err = InvoiceBuilder::new("FAC-1", date(2024, 1, 1))
        .add_line(LineItemBuilder::new("x", dec!(1), dec!(1)).build())
        .build()
        .unwrap_err();
    assert!(matches!(err, GendocError::Builder(_)));
}

// --- Payslips ---

#[test]
fn payslip_single_contribution() {
    let slip = PayslipBuilder::new("PAI-2024-00001", PayPeriod::new(2024, 1).unwrap())
        .employer(issuer())
        .employee(employee())
        .gross_salary(dec!(3000.00))
        .add_contribution(ContributionLine::with_rates("retraite", dec!(3000.00), dec!(0.10), dec!(0)))
        .build()
        .unwrap();
    let doc = compute(&slip.into(), &RateTable::new()).unwrap();
    let t = doc.payslip_totals().unwrap();
    assert_eq!(t.contributions[0].employee_share, dec!(300.00));
    assert_eq!(t.net, dec!(2700.00));
    assert_eq!(doc.record().document_date(), date(2024, 1, 31));
}

#[test]
fn payslip_full_schedule_above_ceiling() {
    let slip = PayslipBuilder::new("PAI-2024-00002", PayPeriod::new(2024, 2).unwrap())
        .employer(issuer())
        .employee(employee())
        .gross_salary(dec!(5000))
        .build()
        .unwrap();
    let doc = compute(&slip.into(), &RateTable::france_2024()).unwrap();
    let t = doc.payslip_totals().unwrap();
    assert_eq!(t.contributions.len(), 10);

    let capped = t
        .contributions
        .iter()
        .find(|c| c.scheme == "vieillesse_plafonnee")
        .unwrap();
    assert_eq!(capped.base_amount, dec!(3864));
    assert_eq!(capped.employee_share, dec!(266.62));

    assert_eq!(t.net, t.gross - t.employee_contrib_total);
    assert_eq!(t.employer_cost, t.gross + t.employer_contrib_total);
    assert!(t.net_social > t.net);
    assert!(validate_arithmetic(&doc).is_empty());
}

#[test]
fn negative_net_is_reported_not_clamped() {
    let slip = PayslipBuilder::new("PAI-2024-00003", PayPeriod::new(2024, 3).unwrap())
        .employer(issuer())
        .employee(employee())
        .gross_salary(dec!(100))
        .add_contribution(ContributionLine::with_rates("a", dec!(100), dec!(0.8), dec!(0)))
        .add_contribution(ContributionLine::with_rates("b", dec!(100), dec!(0.3), dec!(0)))
        .build()
        .unwrap();
    let err = compute(&slip.into(), &RateTable::new()).unwrap_err();
    match err {
        GendocError::NegativeResult { document, net } => {
            assert_eq!(document, "PAI-2024-00003");
            assert_eq!(net, dec!(-10.00));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn payslip_rate_out_of_range_fails_validation() {
    let err = PayslipBuilder::new("PAI-2024-00004", PayPeriod::new(2024, 3).unwrap())
        .employer(issuer())
        .employee(employee())
        .gross_salary(dec!(100))
        .add_contribution(ContributionLine::with_rates("a", dec!(100), dec!(1.5), dec!(0)))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("contributions[0].employee_rate"));
}

// --- Numbering ---

#[test]
fn numbering_restarts_each_year() {
    let mut seq = DocumentNumberSequence::for_kind(DocumentKind::Invoice, 2024);
    assert_eq!(seq.next_number(), "FAC-2024-00001");
    assert_eq!(seq.next_number(), "FAC-2024-00002");
    assert!(seq.auto_advance(date(2025, 1, 2)).unwrap());
    assert_eq!(seq.next_number(), "FAC-2025-00001");
    assert!(seq.advance_year(2024).is_err());
}

#[test]
fn numbering_never_moves_back_a_year() {
    let mut seq = DocumentNumberSequence::for_kind(DocumentKind::Invoice, 2025);
    assert_eq!(seq.next_number(), "FAC-2025-00001");
    let err = seq.auto_advance(date(2024, 12, 31)).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Usage);
    assert_eq!(seq.next_number(), "FAC-2025-00002");
}

#[test]
fn numbering_state_serializes() {
    let mut seq = DocumentNumberSequence::for_kind(DocumentKind::Payslip, 2024);
    seq.next_number();
    let json = serde_json::to_string(&seq).unwrap();
    let mut back: DocumentNumberSequence = serde_json::from_str(&json).unwrap();
    assert_eq!(back.next_number(), "PAI-2024-00002");
}

// --- Errors ---

#[test]
fn error_messages_name_their_subject() {
    let err = GendocError::MalformedRow {
        row: 4,
        field: "prix_unitaire_ht".into(),
        reason: "missing mandatory value".into(),
    };
    assert_eq!(
        err.to_string(),
        "row 4, field 'prix_unitaire_ht': missing mandatory value"
    );
    assert_eq!(err.class(), ErrorClass::Input);

    let err = GendocError::ChainBroken {
        sequence_number: 3,
        reason: ChainBreak::SequenceGap { expected: 3, found: 4 },
    };
    assert_eq!(
        err.to_string(),
        "archive chain broken at sequence 3: expected sequence 3, found 4"
    );
    assert_eq!(err.class(), ErrorClass::Integrity);
}
