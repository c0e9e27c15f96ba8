//! Rate tables: VAT rate brackets and social contribution schemes.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::core::error::GendocError;

/// A VAT rate and the category it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRateEntry {
    /// Rate as a fraction.
    pub rate: Decimal,
    /// Category name, used for account mapping (e.g. "normal").
    pub category: String,
}

/// Rates of one social contribution scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeRates {
    /// Part salariale, as a fraction.
    pub employee_rate: Decimal,
    /// Part patronale, as a fraction.
    pub employer_rate: Decimal,
    /// Cap applied to the base (plafond), if the scheme is capped.
    pub ceiling: Option<Decimal>,
    /// CSG non déductible and CRDS do not reduce the montant net social.
    pub excluded_from_net_social: bool,
}

impl SchemeRates {
    /// Both rates are fractions and must lie in `[0, 1]`.
    pub fn new(employee_rate: Decimal, employer_rate: Decimal) -> Result<Self, GendocError> {
        check_fraction(employee_rate, "employee rate")?;
        check_fraction(employer_rate, "employer rate")?;
        Ok(Self::fixed(employee_rate, employer_rate))
    }

    fn fixed(employee_rate: Decimal, employer_rate: Decimal) -> Self {
        Self {
            employee_rate,
            employer_rate,
            ceiling: None,
            excluded_from_net_social: false,
        }
    }

    /// Whether both rates lie in `[0, 1]`. Tables read back through serde
    /// skip the constructor, so computation checks this again.
    pub fn is_valid(&self) -> bool {
        is_fraction(self.employee_rate) && is_fraction(self.employer_rate)
    }

    pub fn ceiling(mut self, ceiling: Decimal) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    pub fn excluded_from_net_social(mut self) -> Self {
        self.excluded_from_net_social = true;
        self
    }
}

/// Externally supplied rates, immutable for the duration of a computation.
///
/// ```
/// use gendoc::core::*;
/// use rust_decimal_macros::dec;
///
/// let table = RateTable::new()
///     .vat_rate(dec!(0.20), "normal")?
///     .scheme("retraite", SchemeRates::new(dec!(0.069), dec!(0.0855))?);
/// assert_eq!(table.vat_category(dec!(0.2)), Some("normal"));
/// assert!(RateTable::new().vat_rate(dec!(20), "normal").is_err());
/// # Ok::<(), gendoc::GendocError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    vat: Vec<VatRateEntry>,
    schemes: BTreeMap<String, SchemeRates>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a VAT rate bracket. The rate is a fraction in `[0, 1]`.
    pub fn vat_rate(self, rate: Decimal, category: impl Into<String>) -> Result<Self, GendocError> {
        check_fraction(rate, "VAT rate")?;
        Ok(self.fixed_vat_rate(rate, category))
    }

    fn fixed_vat_rate(mut self, rate: Decimal, category: impl Into<String>) -> Self {
        let rate = rate.normalize();
        let category = category.into();
        match self.vat.iter_mut().find(|e| e.rate == rate) {
            Some(entry) => entry.category = category,
            None => self.vat.push(VatRateEntry { rate, category }),
        }
        self
    }

    /// Add or replace a contribution scheme.
    pub fn scheme(mut self, name: impl Into<String>, rates: SchemeRates) -> Self {
        self.schemes.insert(name.into(), rates);
        self
    }

    /// Category of a VAT rate, compared numerically (0.2 == 0.20).
    pub fn vat_category(&self, rate: Decimal) -> Option<&str> {
        self.vat
            .iter()
            .find(|e| e.rate == rate)
            .map(|e| e.category.as_str())
    }

    pub fn vat_rates(&self) -> &[VatRateEntry] {
        &self.vat
    }

    pub fn scheme_rates(&self, scheme: &str) -> Option<&SchemeRates> {
        self.schemes.get(scheme)
    }

    /// Schemes in name order.
    pub fn schemes(&self) -> impl Iterator<Item = (&str, &SchemeRates)> {
        self.schemes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// French VAT brackets and the simplified 2024 contribution schedule.
    ///
    /// Capped schemes use the 2024 monthly social security ceiling (PMSS) of
    /// 3 864 €.
    pub fn france_2024() -> Self {
        let pmss = dec!(3864);
        Self::new()
            .fixed_vat_rate(dec!(0.20), "normal")
            .fixed_vat_rate(dec!(0.10), "intermediaire")
            .fixed_vat_rate(dec!(0.055), "reduit")
            .fixed_vat_rate(dec!(0.021), "super_reduit")
            .fixed_vat_rate(dec!(0), "exonere")
            .scheme("sante_maladie", SchemeRates::fixed(dec!(0), dec!(0.07)))
            .scheme("accidents_travail", SchemeRates::fixed(dec!(0), dec!(0.0221)))
            .scheme(
                "vieillesse_plafonnee",
                SchemeRates::fixed(dec!(0.069), dec!(0.0855)).ceiling(pmss),
            )
            .scheme(
                "vieillesse_deplafonnee",
                SchemeRates::fixed(dec!(0.004), dec!(0.0202)),
            )
            .scheme("famille", SchemeRates::fixed(dec!(0), dec!(0.0345)))
            .scheme("chomage", SchemeRates::fixed(dec!(0), dec!(0.0405)))
            .scheme(
                "retraite_complementaire_t1",
                SchemeRates::fixed(dec!(0.0315), dec!(0.0472)).ceiling(pmss),
            )
            .scheme("csg_deductible", SchemeRates::fixed(dec!(0.068), dec!(0)))
            .scheme(
                "csg_non_deductible",
                SchemeRates::fixed(dec!(0.024), dec!(0)).excluded_from_net_social(),
            )
            .scheme(
                "crds",
                SchemeRates::fixed(dec!(0.005), dec!(0)).excluded_from_net_social(),
            )
    }
}

fn is_fraction(rate: Decimal) -> bool {
    (Decimal::ZERO..=Decimal::ONE).contains(&rate)
}

fn check_fraction(rate: Decimal, what: &str) -> Result<(), GendocError> {
    if is_fraction(rate) {
        Ok(())
    } else {
        Err(GendocError::Builder(format!("{what} {rate} must be between 0 and 1")))
    }
}
