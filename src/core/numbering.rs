use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::GendocError;
use super::types::DocumentKind;

/// Sequential document number generator.
///
/// Generates numbers in the format `{prefix}-{year}-{sequential}`, e.g.
/// "FAC-2024-00001", "PAI-2024-00002".
///
/// French invoices must be numbered in one chronological, gapless series
/// (article 242 nonies A of annex II to the CGI). The sequence tracks the
/// last issued number; persisting it between runs is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNumberSequence {
    prefix: String,
    year: i32,
    next_number: u64,
    zero_pad: usize,
}

impl DocumentNumberSequence {
    /// Create a new sequence starting at 1.
    pub fn new(prefix: impl Into<String>, year: i32) -> Self {
        Self::starting_at(prefix, year, 1)
    }

    /// Sequence with the default prefix of a document kind ("FAC" / "PAI").
    pub fn for_kind(kind: DocumentKind, year: i32) -> Self {
        Self::new(kind.number_prefix(), year)
    }

    /// Create a sequence continuing from a given number.
    pub fn starting_at(prefix: impl Into<String>, year: i32, next_number: u64) -> Self {
        Self {
            prefix: prefix.into(),
            year,
            next_number,
            zero_pad: 5,
        }
    }

    /// Set zero-padding width (default: 5, so "00001").
    pub fn with_padding(mut self, width: usize) -> Self {
        self.zero_pad = width;
        self
    }

    /// Generate the next document number.
    pub fn next_number(&mut self) -> String {
        let formatted = self.format(self.next_number);
        self.next_number += 1;
        formatted
    }

    /// Preview the next number without consuming it.
    pub fn peek(&self) -> String {
        self.format(self.next_number)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Next number to be issued, without prefix or formatting.
    pub fn next_raw(&self) -> u64 {
        self.next_number
    }

    /// Advance to a new year, resetting the counter to 1.
    pub fn advance_year(&mut self, new_year: i32) -> Result<(), GendocError> {
        if new_year <= self.year {
            return Err(GendocError::Builder(format!(
                "new year {new_year} must be greater than current year {}",
                self.year
            )));
        }
        self.year = new_year;
        self.next_number = 1;
        Ok(())
    }

    /// Auto-advance year if the given date is in a new year.
    /// Returns true if the year was advanced.
    ///
    /// The series only moves forward: a date in a year before the current
    /// one is an error, since any number issued for it would carry the later
    /// year's prefix.
    pub fn auto_advance(&mut self, date: NaiveDate) -> Result<bool, GendocError> {
        match date.year().cmp(&self.year) {
            Ordering::Greater => {
                self.year = date.year();
                self.next_number = 1;
                Ok(true)
            }
            Ordering::Equal => Ok(false),
            Ordering::Less => Err(GendocError::Builder(format!(
                "date {date} precedes the {}-{} series",
                self.prefix, self.year
            ))),
        }
    }

    fn format(&self, number: u64) -> String {
        format!(
            "{}-{}-{:0>width$}",
            self.prefix,
            self.year,
            number,
            width = self.zero_pad
        )
    }
}
