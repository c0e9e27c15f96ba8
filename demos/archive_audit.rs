use chrono::NaiveDate;
use gendoc::archive::*;
use gendoc::core::*;
use rust_decimal_macros::dec;

fn invoice(n: u32, amount: rust_decimal::Decimal) -> FinalizedDocument {
    let invoice = InvoiceBuilder::new(
        format!("FAC-2024-{n:05}"),
        NaiveDate::from_ymd_opt(2024, 4, n).expect("valid day"),
    )
    .issuer(PartyBuilder::new("Votre Entreprise SARL").build())
    .recipient(PartyBuilder::new("Client SA").build())
    .add_line(LineItemBuilder::new("Conseil", dec!(1), amount).build())
    .build()
    .expect("invoice valid");
    compute(&invoice.into(), &RateTable::france_2024()).expect("computable")
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let archive = LegalArchive::new(MemoryStore::new());
    for (n, amount) in [(1, dec!(800)), (2, dec!(1250)), (3, dec!(90)), (4, dec!(4300))] {
        let entry = archive.append(&invoice(n, amount)).expect("append");
        println!(
            "#{} {} {}.. <- {}..",
            entry.sequence_number,
            entry.document_id,
            &entry.content_hash[..12],
            &entry.previous_hash[..12]
        );
    }
    archive.verify().expect("fresh chain is intact");

    // Rewrite the amount of the third invoice after the fact.
    let mut entries = archive.entries().expect("entries");
    entries[2].document = invoice(3, dec!(9));
    match verify_chain(&entries) {
        Ok(()) => println!("chain intact"),
        Err(e) => println!("audit: {e}"),
    }

    println!("\ncanonical form of entry 1:");
    print!("{}", String::from_utf8_lossy(&canonical_bytes(&entries[0].document)));
}
