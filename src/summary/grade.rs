//! Letter grades for how closely two sources agree on a parameter.

/// Lowest agreement score for each grade, best grade first. An agreement of
/// 0.95 means the matched values differ by 5 % on average; anything below the
/// last threshold is an `F`.
const GRADES: &[(f64, &str)] = &[
    (0.95, "A+"),
    (0.90, "A"),
    (0.80, "B"),
    (0.65, "C"),
    (0.40, "D"),
];

/// Grades an agreement score from [`agreement`]. `A+` means the two sources
/// are within a few percent of each other. `F` means they differ by more than
/// 60 % on average, which usually points at a unit or modeling mismatch
/// rather than a data error.
pub fn grade(agreement: f64) -> String {
    GRADES
        .iter()
        .find(|(min, _)| agreement >= *min)
        .map_or("F", |&(_, grade)| grade)
        .to_string()
}

/// Agreement score for a mean relative difference: 1.0 for identical values,
/// falling linearly to 0.0 at a 100 % difference and clamped there.
pub fn agreement(mean_difference: f64) -> f64 {
    (1.0 - mean_difference).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade(1.00), "A+");
        assert_eq!(grade(0.95), "A+");
        assert_eq!(grade(0.94), "A");
        assert_eq!(grade(0.80), "B");
        assert_eq!(grade(0.65), "C");
        assert_eq!(grade(0.40), "D");
        assert_eq!(grade(0.39), "F");
    }

    #[test]
    fn test_grade_of_mean_difference() {
        assert_eq!(grade(agreement(0.03)), "A+");
        assert_eq!(grade(agreement(0.25)), "C");
        assert_eq!(grade(agreement(2.0)), "F");
    }

    #[test]
    fn test_agreement_is_clamped() {
        assert_eq!(agreement(0.0), 1.0);
        assert_eq!(agreement(0.25), 0.75);
        assert_eq!(agreement(1.7), 0.0);
    }
}
