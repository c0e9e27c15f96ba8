#![no_main]

use gendoc::core::{DocumentKind, DocumentNumberSequence, PartyBuilder, RateTable, compute};
use gendoc::export::{DialectSpec, export, render};
use gendoc::normalize::{Normalizer, SourceSchema, read_csv};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(rows) = read_csv(text) else {
        return;
    };
    let mut normalizer = Normalizer::new(SourceSchema::default())
        .issuer(PartyBuilder::new("Votre Entreprise").build())
        .numbering(DocumentNumberSequence::for_kind(DocumentKind::Invoice, 2024));
    let Ok(records) = normalizer.normalize_batch(&rows, DocumentKind::Invoice) else {
        return;
    };
    let rates = RateTable::france_2024();
    let spec = DialectSpec::fec();
    for record in &records {
        // Errors are fine, panics are bugs.
        if let Ok(doc) = compute(record, &rates) {
            if let Ok(lines) = export(&doc, &spec) {
                let _ = render(&lines, &spec);
            }
        }
    }
});
