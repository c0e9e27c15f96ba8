use gendoc::archive::{JsonLinesStore, LegalArchive};
use gendoc::batch::*;
use gendoc::core::*;
use gendoc::epc::PayerBankDetails;
use gendoc::export::{DialectSpec, fec_file_name, render};
use gendoc::normalize::{Normalizer, SourceSchema, read_csv};

const SOURCE: &str = "\
client_nom;client_adresse;client_code_postal;client_ville;date_facture;designation;quantite;prix_unitaire_ht;taux_tva
Client SA;1 avenue Foch;69006;Lyon;15/03/2024;Conseil;3;450,00;20%
Client SA;1 avenue Foch;69006;Lyon;15/03/2024;Ouvrages;2;39,90;5,5%
Atelier Dupont;8 rue Neuve;33000;Bordeaux;18/03/2024;Maintenance;1;1 200,00;20%
";

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let rows = read_csv(SOURCE).expect("readable CSV");
    let mut normalizer = Normalizer::new(SourceSchema::default())
        .issuer(
            PartyBuilder::new("Votre Entreprise SARL")
                .address("12 rue des Lilas, 75011 Paris")
                .registration_id("12345678900012")
                .build(),
        )
        .numbering(DocumentNumberSequence::for_kind(DocumentKind::Invoice, 2024));

    let config = BatchConfigBuilder::new()
        .dialect(DialectSpec::fec())
        .bank(PayerBankDetails::new("Votre Entreprise SARL", "FR7630006000011234567890189").bic("BNPAFRPP"))
        .build();

    let dir = std::env::temp_dir().join("gendoc-demo");
    std::fs::create_dir_all(&dir).expect("temp dir");
    let archive = LegalArchive::new(JsonLinesStore::open(dir.join("archive.jsonl")).expect("archive"));

    let report = process_rows(
        &mut normalizer,
        &rows,
        DocumentKind::Invoice,
        &config,
        &archive,
        &CancellationToken::new(),
    )
    .expect("source rows are well formed");

    for outcome in &report.outcomes {
        println!("{} -> {:?}", outcome.document_id, outcome.status());
        if let Some(doc) = &outcome.finalized {
            println!("  amount due: {} {}", doc.amount_due(), doc.currency_code());
        }
        if let Some(qr) = &outcome.qr {
            println!("  QR payload ({} bytes):", qr.byte_len());
            for line in qr.text().lines() {
                println!("    {line}");
            }
        }
    }

    let fec = render(&report.ledger(), &config.dialect);
    let name = fec_file_name("123456789", 2024);
    std::fs::write(dir.join(&name), &fec).expect("write FEC");
    println!("\n=== {name} ===");
    print!("{fec}");

    for (id, stage, error) in report.failures() {
        println!("{id}: {stage} failed: {error}");
    }
}
