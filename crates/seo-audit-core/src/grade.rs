use serde::Serialize;

/// Minimum factor score rendered as passing. Independent of the letter-grade scale.
pub const PASS_THRESHOLD: u8 = 70;

/// Letter grade for an overall score. Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

/// Display tier shared by the badge ring and the grade text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Emerald,
    Sky,
    Amber,
    Orange,
    Red,
}

impl Tier {
    pub fn hex(self) -> &'static str {
        match self {
            Self::Emerald => "#10b981",
            Self::Sky => "#0ea5e9",
            Self::Amber => "#f59e0b",
            Self::Orange => "#f97316",
            Self::Red => "#ef4444",
        }
    }
}

impl Grade {
    /// Map a score onto the fixed letter scale: 90/80/70/60/50.
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::APlus,
            80..=89 => Self::A,
            70..=79 => Self::B,
            60..=69 => Self::C,
            50..=59 => Self::D,
            _ => Self::F,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }

    pub fn tier(self) -> Tier {
        match self {
            Self::APlus | Self::A => Tier::Emerald,
            Self::B => Tier::Sky,
            Self::C => Tier::Amber,
            Self::D => Tier::Orange,
            Self::F => Tier::Red,
        }
    }
}

/// Grade plus the tier it is displayed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeInfo {
    pub grade: Grade,
    pub tier: Tier,
}

pub fn grade(score: u8) -> GradeInfo {
    let grade = Grade::from_score(score);
    GradeInfo {
        grade,
        tier: grade.tier(),
    }
}

/// Pass/fail marker for a single factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Pass,
    Fail,
}

impl FactorStatus {
    pub fn from_score(score: u8) -> Self {
        if score >= PASS_THRESHOLD {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            Self::Pass => "#059669",
            Self::Fail => "#dc2626",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thresholds_match_letter_scale() {
        assert_eq!(Grade::from_score(100), Grade::APlus);
        assert_eq!(Grade::from_score(90), Grade::APlus);
        assert_eq!(Grade::from_score(89), Grade::A);
        assert_eq!(Grade::from_score(82), Grade::A);
        assert_eq!(Grade::from_score(80), Grade::A);
        assert_eq!(Grade::from_score(79), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::B);
        assert_eq!(Grade::from_score(60), Grade::C);
        assert_eq!(Grade::from_score(50), Grade::D);
        assert_eq!(Grade::from_score(49), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn pass_threshold_is_separate_from_grades() {
        assert_eq!(FactorStatus::from_score(70), FactorStatus::Pass);
        assert_eq!(FactorStatus::from_score(69), FactorStatus::Fail);
        // 65 is a C but still fails.
        assert_eq!(Grade::from_score(65), Grade::C);
        assert_eq!(FactorStatus::from_score(65), FactorStatus::Fail);
    }

    #[test]
    fn tiers_follow_grades() {
        assert_eq!(grade(95).tier, Tier::Emerald);
        assert_eq!(grade(82).tier, Tier::Emerald);
        assert_eq!(grade(75).tier, Tier::Sky);
        assert_eq!(grade(10).tier.hex(), "#ef4444");
    }

    #[test]
    fn grade_serializes_with_plus_sign() {
        assert_eq!(serde_json::to_value(Grade::APlus).unwrap(), "A+");
    }

    proptest! {
        #[test]
        fn grade_is_monotonic(a in 0u8..=100, b in 0u8..=100) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Grade::from_score(low) <= Grade::from_score(high));
        }

        #[test]
        fn grade_is_total(score in any::<u8>()) {
            let label = Grade::from_score(score).as_str();
            prop_assert!(["A+", "A", "B", "C", "D", "F"].contains(&label));
        }
    }
}
