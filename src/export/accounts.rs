//! Plan Comptable Général (PCG) accounts and the default category mapping.

use std::collections::BTreeMap;

/// A PCG account class with its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedAccount {
    /// Account number or class prefix (e.g. "411", "44571").
    pub number: &'static str,
    pub name: &'static str,
}

const PCG_ACCOUNTS: &[NamedAccount] = &[
    NamedAccount {
        number: "401",
        name: "Fournisseurs",
    },
    NamedAccount {
        number: "411",
        name: "Clients",
    },
    NamedAccount {
        number: "421",
        name: "Personnel - Rémunérations dues",
    },
    NamedAccount {
        number: "431",
        name: "Sécurité sociale",
    },
    NamedAccount {
        number: "437",
        name: "Autres organismes sociaux",
    },
    NamedAccount {
        number: "44566",
        name: "TVA déductible",
    },
    NamedAccount {
        number: "44571",
        name: "TVA collectée",
    },
    NamedAccount {
        number: "512",
        name: "Banque",
    },
    NamedAccount {
        number: "641",
        name: "Rémunérations du personnel",
    },
    NamedAccount {
        number: "645",
        name: "Charges de sécurité sociale et de prévoyance",
    },
    NamedAccount {
        number: "706",
        name: "Prestations de services",
    },
    NamedAccount {
        number: "707",
        name: "Ventes de marchandises",
    },
];

/// Label of an account by its longest known prefix; empty when unknown.
///
/// ```
/// use gendoc::export::account_label;
///
/// assert_eq!(account_label("445710"), "TVA collectée");
/// assert_eq!(account_label("411000"), "Clients");
/// assert_eq!(account_label("999000"), "");
/// ```
pub fn account_label(number: &str) -> &'static str {
    PCG_ACCOUNTS
        .iter()
        .filter(|a| number.starts_with(a.number))
        .max_by_key(|a| a.number.len())
        .map(|a| a.name)
        .unwrap_or("")
}

/// Default ledger category to account mapping.
///
/// Covers the VAT categories and contribution schemes of
/// [`RateTable::france_2024`](crate::core::RateTable::france_2024): sales
/// go to 706 and 44571, payroll to 641/645 against 421, 431 and 437.
pub fn default_accounts() -> BTreeMap<String, String> {
    let mut accounts = BTreeMap::new();
    let mut put = |category: &str, account: &str| {
        accounts.insert(category.to_string(), account.to_string());
    };

    put("receivable", "411000");
    for vat_category in ["normal", "intermediaire", "reduit", "super_reduit", "exonere"] {
        put(&format!("revenue.{vat_category}"), "706000");
        put(&format!("vat.{vat_category}"), "445710");
    }

    put("salary_expense", "641000");
    put("employer_contributions_expense", "645000");
    put("net_payable", "421000");
    for scheme in [
        "sante_maladie",
        "accidents_travail",
        "vieillesse_plafonnee",
        "vieillesse_deplafonnee",
        "famille",
        "chomage",
        "csg_deductible",
        "csg_non_deductible",
        "crds",
    ] {
        put(&format!("contribution.{scheme}"), "431000");
    }
    put("contribution.retraite_complementaire_t1", "437000");

    accounts
}
