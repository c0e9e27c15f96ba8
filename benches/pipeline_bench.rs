use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use gendoc::archive::{LegalArchive, MemoryStore, content_hash};
use gendoc::batch::{BatchConfigBuilder, CancellationToken, process};
use gendoc::core::*;
use gendoc::epc::{EpcOptions, PayerBankDetails, encode};
use gendoc::export::{DialectSpec, export_all, render};
use gendoc::normalize::{Normalizer, SourceRow, SourceSchema};

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn issuer() -> Party {
    PartyBuilder::new("Votre Entreprise SARL")
        .registration_id("12345678900012")
        .vat_id("FR12345678901")
        .build()
}

fn build_10_line_invoice() -> DocumentRecord {
    let mut builder = InvoiceBuilder::new("FAC-2024-00001", test_date())
        .issuer(issuer())
        .recipient(PartyBuilder::new("Client SA").address("1 avenue Foch, 69006 Lyon").build());
    for i in 1..=10 {
        let rate = if i % 3 == 0 { dec!(0.055) } else { dec!(0.20) };
        builder = builder.add_line(
            LineItemBuilder::new(format!("Prestation {i}"), dec!(5), dec!(120))
                .vat_rate(rate)
                .build(),
        );
    }
    builder.build().unwrap().into()
}

fn build_100_records() -> Vec<DocumentRecord> {
    (1..=100)
        .map(|n| {
            InvoiceBuilder::new(format!("FAC-2024-{n:05}"), test_date())
                .issuer(issuer())
                .recipient(PartyBuilder::new(format!("Client {n}")).build())
                .add_line(LineItemBuilder::new("Conseil", dec!(8), dec!(150)).build())
                .add_line(
                    LineItemBuilder::new("Repas", dec!(1), dec!(25))
                        .vat_rate(dec!(0.10))
                        .build(),
                )
                .build()
                .unwrap()
                .into()
        })
        .collect()
}

fn build_rows(n: usize) -> Vec<SourceRow> {
    (0..n)
        .map(|i| {
            SourceRow::new(i)
                .with("client_nom", format!("Client {}", i / 5))
                .with("date_facture", "15/06/2024")
                .with("designation", format!("Ligne {i}"))
                .with("quantite", "2")
                .with("prix_unitaire_ht", "1 250,50")
                .with("taux_tva", "20%")
        })
        .collect()
}

fn bank() -> PayerBankDetails {
    PayerBankDetails::new("Votre Entreprise SARL", "FR7630006000011234567890189").bic("BNPAFRPP")
}

fn bench_compute(c: &mut Criterion) {
    let record = build_10_line_invoice();
    let rates = RateTable::france_2024();
    c.bench_function("compute_invoice_10_lines", |b| {
        b.iter(|| black_box(compute(black_box(&record), black_box(&rates))));
    });
}

fn bench_normalize(c: &mut Criterion) {
    let rows = build_rows(500);
    c.bench_function("normalize_500_rows", |b| {
        b.iter(|| {
            let mut normalizer = Normalizer::new(SourceSchema::default())
                .issuer(issuer())
                .numbering(DocumentNumberSequence::for_kind(DocumentKind::Invoice, 2024));
            black_box(normalizer.normalize_batch(black_box(&rows), DocumentKind::Invoice))
        });
    });
}

fn bench_epc_encode(c: &mut Criterion) {
    let doc = compute(&build_10_line_invoice(), &RateTable::france_2024()).unwrap();
    let bank = bank();
    let options = EpcOptions::default();
    c.bench_function("epc_encode", |b| {
        b.iter(|| black_box(encode(black_box(&doc), &bank, &options)));
    });
}

fn bench_fec_export(c: &mut Criterion) {
    let rates = RateTable::france_2024();
    let docs: Vec<_> = build_100_records()
        .iter()
        .map(|r| compute(r, &rates).unwrap())
        .collect();
    let spec = DialectSpec::fec();
    c.bench_function("fec_export_100_invoices", |b| {
        b.iter(|| {
            let lines = export_all(black_box(&docs), &spec).unwrap();
            black_box(render(&lines, &spec))
        });
    });
}

fn bench_content_hash(c: &mut Criterion) {
    let doc = compute(&build_10_line_invoice(), &RateTable::france_2024()).unwrap();
    c.bench_function("content_hash", |b| {
        b.iter(|| black_box(content_hash(black_box(&doc))));
    });
}

fn bench_batch(c: &mut Criterion) {
    let records = build_100_records();
    let config = BatchConfigBuilder::new().bank(bank()).verify_archive(false).build();
    c.bench_function("batch_100_invoices", |b| {
        b.iter(|| {
            let archive = LegalArchive::new(MemoryStore::new());
            black_box(process(
                black_box(&records),
                &config,
                &archive,
                &CancellationToken::new(),
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_compute,
    bench_normalize,
    bench_epc_encode,
    bench_fec_export,
    bench_content_hash,
    bench_batch,
);
criterion_main!(benches);
