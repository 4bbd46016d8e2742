//! Score derivation rules.
//!
//! Pure, total functions from the numeric analysis score to the categorical
//! judgments shown to the user. Scores are fractional; anything outside
//! [0, 100] is clamped before bucketing so the rules stay total.

/// Letter grade derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    D,
    C,
    B,
    A,
    APlus,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        write!(f, "{}", s)
    }
}

/// Complexity category derived from the score. Higher scores mean simpler,
/// more maintainable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// Severity color name used by the presentation layer.
    pub fn severity(&self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "orange",
            Self::High => "red",
        }
    }

    /// Fixed bar-fill percentage for display. Callers needing only the
    /// categorical judgment should ignore this.
    pub fn visual_weight(&self) -> u8 {
        match self {
            Self::Low => 40,
            Self::Medium => 65,
            Self::High => 90,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        write!(f, "{}", s)
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Map a score to its letter grade.
pub fn grade(score: f64) -> Grade {
    let score = clamp_score(score);
    if score >= 90.0 {
        Grade::APlus
    } else if score >= 80.0 {
        Grade::A
    } else if score >= 70.0 {
        Grade::B
    } else if score >= 60.0 {
        Grade::C
    } else {
        Grade::D
    }
}

/// Map a score to its complexity category.
pub fn complexity(score: f64) -> Complexity {
    let score = clamp_score(score);
    if score >= 85.0 {
        Complexity::Low
    } else if score >= 65.0 {
        Complexity::Medium
    } else {
        Complexity::High
    }
}

/// Render a service timestamp for display.
///
/// Accepts RFC-3339 as well as the bare `YYYY-MM-DDTHH:MM:SS` form the
/// service emits. Unparseable input is returned unchanged; formatting is
/// presentation and must not fail.
pub fn format_timestamp(iso: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(iso) {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    iso.to_string()
}
