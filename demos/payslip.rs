use gendoc::core::*;
use gendoc::epc::{EpcOptions, PayerBankDetails, encode};
use gendoc::export::{DialectSpec, export, render};
use rust_decimal_macros::dec;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let slip = PayslipBuilder::new("PAI-2024-00003", PayPeriod::new(2024, 3).expect("valid month"))
        .employer(
            PartyBuilder::new("Votre Entreprise SARL")
                .registration_id("12345678900012")
                .build(),
        )
        .employee(
            EmployeeBuilder::new("Martin", "Alice")
                .id("M001")
                .position("Développeuse")
                .build(),
        )
        .gross_salary(dec!(4200.00))
        .hours_worked(dec!(151.67))
        .build()
        .expect("payslip valid");

    let doc = compute(&slip.into(), &RateTable::france_2024()).expect("computable");
    let totals = doc.payslip_totals().expect("payslip totals");

    println!("=== Bulletin de paie {} ===", doc.id());
    println!("{:<28} {:>10} {:>10} {:>10}", "Cotisation", "Base", "Salarié", "Employeur");
    for c in &totals.contributions {
        println!(
            "{:<28} {:>10} {:>10} {:>10}",
            c.scheme, c.base_amount, c.employee_share, c.employer_share
        );
    }
    println!("Brut:           {}", totals.gross);
    println!("Net à payer:    {}", totals.net);
    println!("Net social:     {}", totals.net_social);
    println!("Coût employeur: {}", totals.employer_cost);

    let account = PayerBankDetails::new("Alice Martin", "FR76 3000 4000 0312 3456 7890 143");
    match encode(&doc, &account, &EpcOptions::new().purpose("SALA")) {
        Ok(payload) => println!("\nVirement SEPA:\n{payload}"),
        Err(e) => println!("\nno QR payload: {e}"),
    }

    let spec = DialectSpec::sage();
    let lines = export(&doc, &spec).expect("exportable");
    println!("=== Écritures (Sage) ===");
    print!("{}", render(&lines, &spec));
}
