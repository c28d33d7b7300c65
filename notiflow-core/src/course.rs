//! Course name normalization.
//!
//! The LMS, the exam schedule and the extension all spell the same course
//! differently (`CPEN_V 221 101`, `CPEN_V 221 L1A`, ...). The simplified
//! `DEPT NUM` form is the key used to correlate them.

/// Shortest department token accepted by [`simplify`]. Shorter first tokens
/// are section or lab codes, not departments.
pub const MIN_DEPARTMENT_LEN: usize = 6;

const CAMPUS_SUFFIX: &str = "_V";

/// Reduce a raw course name to `DEPT NUM`, or `None` if it doesn't look like one.
pub fn simplify(raw_name: &str) -> Option<String> {
    let mut parts = raw_name.split_whitespace();
    let dept = parts.next()?;
    let number_token = parts.next()?;

    let digits: String = number_token
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }

    if dept.chars().count() < MIN_DEPARTMENT_LEN {
        return None;
    }

    Some(format!("{} {}", dept, digits))
}

/// First two tokens of a course name with the campus suffix dropped
/// (`CPEN_V 311 101` -> `CPEN 311`).
pub fn short_course_name(raw_name: &str) -> String {
    raw_name
        .split(' ')
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
        .replace(CAMPUS_SUFFIX, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_keeps_department_and_number() {
        assert_eq!(simplify("CPEN_V 221 101").as_deref(), Some("CPEN_V 221"));
        assert_eq!(simplify("MATH_V 256A L1A").as_deref(), Some("MATH_V 256"));
    }

    #[test]
    fn test_simplify_rejects_short_department() {
        assert_eq!(simplify("CS 221"), None);
        assert_eq!(simplify("CPEN 221 101"), None);
    }

    #[test]
    fn test_simplify_requires_two_tokens() {
        assert_eq!(simplify("ONETOKEN"), None);
        assert_eq!(simplify(""), None);
    }

    #[test]
    fn test_simplify_requires_leading_digits() {
        assert_eq!(simplify("CPEN_V L1A 221"), None);
    }

    #[test]
    fn test_short_course_name() {
        assert_eq!(short_course_name("CPEN_V 311 101 2025W1"), "CPEN 311");
        assert_eq!(short_course_name("ELEC_V 201"), "ELEC 201");
    }
}
