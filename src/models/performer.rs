use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

lazy_static! {
    static ref BRA_SIZE_REGEX: Regex =
        Regex::new(r"(\d{2})\s*([A-Ka-k]{1,3})").expect("Invalid bra size regex");
}

/// Cup letter on an ordinal scale
///
/// US double letters are aliases: DD is E, DDD is F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CupSize {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
}

impl CupSize {
    /// Ordinal value, A = 1
    pub fn ordinal(self) -> u8 {
        self as u8 + 1
    }

    pub fn letter(self) -> &'static str {
        match self {
            CupSize::A => "A",
            CupSize::B => "B",
            CupSize::C => "C",
            CupSize::D => "D",
            CupSize::E => "E",
            CupSize::F => "F",
            CupSize::G => "G",
            CupSize::H => "H",
            CupSize::I => "I",
            CupSize::J => "J",
            CupSize::K => "K",
        }
    }
}

impl FromStr for CupSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cup = match s.trim().to_ascii_uppercase().as_str() {
            "A" => CupSize::A,
            "B" => CupSize::B,
            "C" => CupSize::C,
            "D" => CupSize::D,
            "E" | "DD" => CupSize::E,
            "F" | "DDD" => CupSize::F,
            "G" => CupSize::G,
            "H" => CupSize::H,
            "I" => CupSize::I,
            "J" => CupSize::J,
            "K" => CupSize::K,
            other => return Err(AppError::Data(format!("Unknown cup letter: {:?}", other))),
        };
        Ok(cup)
    }
}

impl TryFrom<String> for CupSize {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CupSize> for String {
    fn from(cup: CupSize) -> Self {
        cup.letter().to_string()
    }
}

impl Display for CupSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Bra measurement decomposed into band and cup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BraSize {
    pub band: u8,
    pub cup: CupSize,
}

impl BraSize {
    /// Extracts the bra size from a free-form measurements string such as "34C-24-36"
    pub fn from_measurements(measurements: &str) -> AppResult<Self> {
        let captures = BRA_SIZE_REGEX.captures(measurements).ok_or_else(|| {
            AppError::Data(format!("No bra size in measurements {:?}", measurements))
        })?;

        let band = captures[1]
            .parse::<u8>()
            .map_err(|e| AppError::Data(format!("Invalid band size: {}", e)))?;
        let cup = captures[2].parse::<CupSize>()?;

        Ok(Self { band, cup })
    }
}

impl Display for BraSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.band, self.cup)
    }
}

/// Performer profile as materialized by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformerProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub bra_size: Option<BraSize>,
    /// Free-form measurements such as "34C-24-36", used when `bra_size` is absent
    #[serde(default)]
    pub measurements: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub scene_types: BTreeSet<String>,
    /// Average rating of the performer's scenes
    #[serde(default)]
    pub rating: Option<f64>,
    /// O-counter
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PerformerProfile {
    /// Creates a profile with only identity set
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            height_cm: None,
            weight_kg: None,
            birthdate: None,
            bra_size: None,
            measurements: None,
            tags: BTreeSet::new(),
            scene_types: BTreeSet::new(),
            rating: None,
            view_count: 0,
            favorite: false,
            created_at: None,
        }
    }

    pub fn cup_ordinal(&self) -> Option<f64> {
        self.bra_size.map(|b| f64::from(b.cup.ordinal()))
    }

    pub fn height(&self) -> Option<f64> {
        self.height_cm.filter(|h| *h > 0.0)
    }

    pub fn bmi(&self) -> Option<f64> {
        let height_m = self.height()? / 100.0;
        let weight = self.weight_kg.filter(|w| *w > 0.0)?;
        Some(weight / (height_m * height_m))
    }

    pub fn bmi_to_cup_ratio(&self) -> Option<f64> {
        Some(self.bmi()? / self.cup_ordinal()?)
    }

    pub fn height_to_cup_ratio(&self) -> Option<f64> {
        Some(self.height()? / self.cup_ordinal()?)
    }

    /// Age in whole years on the given date
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<f64> {
        let birthdate = self.birthdate?;
        let today = now.date_naive();
        let mut age = today.year() - birthdate.year();
        if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
            age -= 1;
        }
        (age >= 0).then_some(f64::from(age))
    }

    /// Checks record-level invariants
    pub fn validate(&self, rating_scale: f64) -> AppResult<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::Data(format!(
                "Performer {:?} has an empty id",
                self.name
            )));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=rating_scale).contains(&rating) {
                return Err(AppError::Data(format!(
                    "Performer {} has rating {} outside 0..={}",
                    self.id, rating, rating_scale
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn performer_with(height: f64, weight: f64, cup: CupSize) -> PerformerProfile {
        let mut p = PerformerProfile::new("p1", "Test");
        p.height_cm = Some(height);
        p.weight_kg = Some(weight);
        p.bra_size = Some(BraSize { band: 34, cup });
        p
    }

    #[test]
    fn test_cup_ordinal_is_monotonic() {
        let cups = [
            CupSize::A,
            CupSize::B,
            CupSize::C,
            CupSize::D,
            CupSize::E,
            CupSize::F,
            CupSize::G,
            CupSize::H,
            CupSize::I,
            CupSize::J,
            CupSize::K,
        ];
        for pair in cups.windows(2) {
            assert!(pair[0].ordinal() < pair[1].ordinal());
        }
        assert_eq!(CupSize::A.ordinal(), 1);
        assert_eq!(CupSize::D.ordinal(), 4);
    }

    #[test]
    fn test_cup_aliases() {
        assert_eq!("DD".parse::<CupSize>().unwrap(), CupSize::E);
        assert_eq!("ddd".parse::<CupSize>().unwrap(), CupSize::F);
        assert!("Z".parse::<CupSize>().is_err());
    }

    #[test]
    fn test_bra_size_from_measurements() {
        let size = BraSize::from_measurements("34C-24-36").unwrap();
        assert_eq!(size.band, 34);
        assert_eq!(size.cup, CupSize::C);

        let size = BraSize::from_measurements("32DD-25-35").unwrap();
        assert_eq!(size.cup, CupSize::E);
        assert_eq!(size.to_string(), "32E");

        assert!(BraSize::from_measurements("unknown").is_err());
    }

    #[test]
    fn test_cup_serde_uses_letters() {
        let json = serde_json::to_string(&BraSize { band: 30, cup: CupSize::B }).unwrap();
        assert_eq!(json, r#"{"band":30,"cup":"B"}"#);

        let parsed: BraSize = serde_json::from_str(r#"{"band":36,"cup":"DD"}"#).unwrap();
        assert_eq!(parsed.cup, CupSize::E);
    }

    #[test]
    fn test_derived_ratios() {
        let p = performer_with(170.0, 57.8, CupSize::B);
        let bmi = p.bmi().unwrap();
        assert!((bmi - 20.0).abs() < 0.01);
        assert!((p.bmi_to_cup_ratio().unwrap() - 10.0).abs() < 0.01);
        assert!((p.height_to_cup_ratio().unwrap() - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_attributes_stay_undefined() {
        let p = PerformerProfile::new("p1", "Test");
        assert_eq!(p.bmi(), None);
        assert_eq!(p.cup_ordinal(), None);
        assert_eq!(p.height_to_cup_ratio(), None);
        assert_eq!(p.age_at(Utc::now()), None);
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let mut p = PerformerProfile::new("p1", "Test");
        p.birthdate = NaiveDate::from_ymd_opt(1990, 6, 15);

        let before = Utc.with_ymd_and_hms(2020, 6, 14, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2020, 6, 15, 0, 0, 0).unwrap();
        assert_eq!(p.age_at(before), Some(29.0));
        assert_eq!(p.age_at(after), Some(30.0));
    }

    #[test]
    fn test_validate_rating_range() {
        let mut p = PerformerProfile::new("p1", "Test");
        p.rating = Some(120.0);
        assert!(p.validate(100.0).is_err());
        p.rating = Some(80.0);
        assert!(p.validate(100.0).is_ok());
    }
}
