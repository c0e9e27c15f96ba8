#![no_main]

use gendoc::normalize::{RateUnit, RawValue, parse_date, parse_decimal, parse_period, parse_rate};
use libfuzzer_sys::fuzz_target;

const FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y"];

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_decimal(s);
        let _ = parse_rate(&RawValue::from(s), RateUnit::Percent);
        let _ = parse_date(s, FORMATS);
        let _ = parse_period(s, FORMATS);
    }
});
