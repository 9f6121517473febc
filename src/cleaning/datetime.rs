//! Date/time repair for raw entry and exit cells.
//!
//! Repair never fails: a cell that is empty, carries a sentinel code, or matches none of the
//! accepted formats becomes [`Checked::Invalid`] with the matching [`InvalidReason`].

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{PipelineConfig, DEFAULT_DATE_FORMATS};
use crate::types::{Checked, InvalidReason, SentinelSet, Timestamp};

/// Parses date cells under a sentinel policy and a list of accepted formats.
#[derive(Debug, Clone, PartialEq)]
pub struct DatetimeRepair {
    sentinels: SentinelSet,
    formats: Vec<String>,
}

impl Default for DatetimeRepair {
    fn default() -> Self {
        Self::new(
            SentinelSet::default(),
            DEFAULT_DATE_FORMATS.iter().map(|f| (*f).to_string()).collect(),
        )
    }
}

impl DatetimeRepair {
    pub fn new(sentinels: SentinelSet, formats: Vec<String>) -> Self {
        Self { sentinels, formats }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(cfg.sentinels.clone(), cfg.date_formats.clone())
    }

    pub fn sentinels(&self) -> &SentinelSet {
        &self.sentinels
    }

    /// Repair one raw cell.
    ///
    /// Sentinels are checked before parsing, against the whole value and against each of its
    /// numeric components, so `999`, `999/01/2021` and `2021-01-01 999:00` are all invalid.
    pub fn repair(&self, raw: &str) -> Timestamp {
        let raw = raw.trim();
        if raw.is_empty() {
            return Checked::Invalid(InvalidReason::Empty);
        }

        let sentinel = self
            .sentinels
            .match_text(raw)
            .or_else(|| self.sentinels.match_component(raw));
        if let Some(code) = sentinel {
            return Checked::Invalid(InvalidReason::Sentinel(code));
        }

        match parse_datetime(raw, &self.formats) {
            Some(dt) => Checked::Valid(dt),
            None => Checked::Invalid(InvalidReason::Unparsable),
        }
    }

    /// Repair an entry/exit pair. The two sides are repaired independently.
    pub fn repair_pair(&self, entry: &str, exit: &str) -> (Timestamp, Timestamp) {
        (self.repair(entry), self.repair(exit))
    }
}

/// Repair `raw` with the default formats and the given sentinels.
pub fn repair(raw: &str, sentinels: &SentinelSet) -> Timestamp {
    DatetimeRepair::new(
        sentinels.clone(),
        DEFAULT_DATE_FORMATS.iter().map(|f| (*f).to_string()).collect(),
    )
    .repair(raw)
}

/// Try each format as a date-time, then as a date (resolved to midnight).
fn parse_datetime(value: &str, formats: &[String]) -> Option<NaiveDateTime> {
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{repair, DatetimeRepair};
    use crate::types::{Checked, InvalidReason, SentinelSet};

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn repairs_common_formats() {
        let r = DatetimeRepair::default();
        assert_eq!(r.repair("2021-03-04 10:15:30"), Checked::Valid(dt(2021, 3, 4, 10, 15, 30)));
        assert_eq!(r.repair("2021-03-04T10:15"), Checked::Valid(dt(2021, 3, 4, 10, 15, 0)));
        assert_eq!(r.repair(" 04/03/2021 10:15 "), Checked::Valid(dt(2021, 3, 4, 10, 15, 0)));
        assert_eq!(r.repair("2021-03-04"), Checked::Valid(dt(2021, 3, 4, 0, 0, 0)));
    }

    #[test]
    fn fractional_seconds_are_not_mistaken_for_sentinels() {
        let r = DatetimeRepair::default();
        let parsed = r.repair("2021-03-04 10:15:30.999");
        assert!(parsed.is_valid());
    }

    #[test]
    fn sentinel_values_are_invalid_not_errors() {
        let r = DatetimeRepair::default();
        assert_eq!(r.repair("999"), Checked::Invalid(InvalidReason::Sentinel(999)));
        assert_eq!(
            r.repair("999/03/2021 10:00"),
            Checked::Invalid(InvalidReason::Sentinel(999))
        );
        assert_eq!(
            r.repair("2021-03-04 999:00"),
            Checked::Invalid(InvalidReason::Sentinel(999))
        );
    }

    #[test]
    fn empty_and_garbage_are_invalid() {
        let r = DatetimeRepair::default();
        assert_eq!(r.repair("  "), Checked::Invalid(InvalidReason::Empty));
        assert_eq!(r.repair("yesterday"), Checked::Invalid(InvalidReason::Unparsable));
        assert_eq!(r.repair("2021-02-30 10:00"), Checked::Invalid(InvalidReason::Unparsable));
    }

    #[test]
    fn custom_sentinels_and_formats() {
        let r = DatetimeRepair::new(SentinelSet::new([0]), vec!["%d.%m.%Y %H:%M".to_string()]);
        assert_eq!(r.repair("04.03.2021 10:15"), Checked::Valid(dt(2021, 3, 4, 10, 15, 0)));
        assert_eq!(r.repair("0"), Checked::Invalid(InvalidReason::Sentinel(0)));
        assert_eq!(r.repair("2021-03-04 10:15"), Checked::Invalid(InvalidReason::Unparsable));
    }

    #[test]
    fn pair_sides_are_independent() {
        let r = DatetimeRepair::default();
        let (entry, exit) = r.repair_pair("2021-03-04 10:00", "999");
        assert!(entry.is_valid());
        assert_eq!(exit, Checked::Invalid(InvalidReason::Sentinel(999)));
    }

    #[test]
    fn free_function_uses_default_formats() {
        let sentinels = SentinelSet::new([999]);
        assert!(repair("2021-03-04 10:00:00", &sentinels).is_valid());
        assert!(!repair("999", &sentinels).is_valid());
    }
}
