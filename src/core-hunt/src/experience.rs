use std::sync::LazyLock;

use regex::Regex;

static SINGLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+)\s*\+?\s*(?:years?|yrs?)\s*(?:and above|and up|or more|or greater|or higher|plus)?\s*(?:of)?\s*(?:relevant\s*)?(?:experience|exp)",
        r"(?i)minimum\s*(\d+)\s*(?:years?|yrs?)",
        r"(?i)at least\s*(\d+)\s*(?:years?|yrs?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static RANGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+)[-–](\d+)\s*(?:years?|yrs?)",
        r"(?i)(\d+)\s*to\s*(\d+)\s*(?:years?|yrs?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Pulls the required years of experience out of a job description.
///
/// Returns `(min, max)`. Every "N years" style mention lowers the minimum; a
/// range like "3-5 years" also raises the maximum.
pub fn extract_experience_years(description: Option<&str>) -> (Option<u32>, Option<u32>) {
    let Some(text) = description.filter(|d| !d.trim().is_empty()) else {
        return (None, None);
    };

    let mut min_years: Option<u32> = None;
    let mut max_years: Option<u32> = None;

    for pattern in SINGLE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(years) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                min_years = Some(min_years.map_or(years, |m| m.min(years)));
            }
        }
    }

    for pattern in RANGE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let low = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
            let high = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            if let (Some(low), Some(high)) = (low, high) {
                min_years = Some(min_years.map_or(low, |m| m.min(low)));
                max_years = Some(max_years.map_or(high, |m| m.max(high)));
            }
        }
    }

    (min_years, max_years)
}
