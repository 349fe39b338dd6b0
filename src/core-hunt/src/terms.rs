//! Search term lists and expansion.

/// Used when a scrape asks for no particular terms.
pub const DEFAULT_SEARCH_TERMS: [&str; 6] = [
    "software engineer",
    "developer",
    "data scientist",
    "product manager",
    "analyst",
    "designer",
];

/// Broad terms that together cover most postings a company has open.
pub const COMPREHENSIVE_TERMS: [&str; 23] = [
    "tech",
    "analyst",
    "manager",
    "product",
    "engineer",
    "market",
    "finance",
    "business",
    "associate",
    "senior",
    "director",
    "president",
    "lead",
    "data",
    "science",
    "software",
    "cloud",
    "developer",
    "staff",
    "program",
    "quality",
    "security",
    "specialist",
];

pub const DEFAULT_LOCATIONS: [&str; 3] = ["USA", "Remote", "United States"];

/// Roles scored by the filtered job views when a user has configured none.
pub const DEFAULT_FILTER_TERMS: [&str; 4] = ["software engineer", "product manager", "developer", "engineer"];

pub fn to_strings(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

/// True for a lone `all`, `*` or `all jobs`: the caller wants everything.
pub fn is_comprehensive_request<S: AsRef<str>>(terms: &[S]) -> bool {
    match terms {
        [only] => {
            let only = only.as_ref().trim().to_lowercase();
            only == "all" || only == "*" || only == "all jobs"
        }
        _ => false,
    }
}

/// The terms to search for at one company.
///
/// An empty list becomes [`DEFAULT_SEARCH_TERMS`]; a comprehensive request becomes
/// `comprehensive` (or [`COMPREHENSIVE_TERMS`] if that is empty). The company name
/// is appended unless it is already one of the terms.
pub fn expand_search_terms(terms: &[String], company: &str, comprehensive: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if expanded.is_empty() {
        expanded = to_strings(&DEFAULT_SEARCH_TERMS);
    } else if is_comprehensive_request(&expanded) {
        expanded = if comprehensive.is_empty() {
            to_strings(&COMPREHENSIVE_TERMS)
        } else {
            comprehensive.to_vec()
        };
    }

    let company = company.trim();
    if !company.is_empty() && !expanded.iter().any(|t| t.eq_ignore_ascii_case(company)) {
        expanded.push(company.to_string());
    }
    expanded
}

/// Drops repeats (case-insensitive), keeping the first spelling and the order.
pub fn dedup_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    terms
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(terms: &[&str]) -> Vec<String> {
        to_strings(terms)
    }

    #[test]
    fn test_empty_terms_use_defaults_plus_company() {
        let terms = expand_search_terms(&[], "Acme", &[]);
        assert_eq!(terms.len(), 7);
        assert_eq!(terms[0], "software engineer");
        assert_eq!(terms.last().unwrap(), "Acme");
    }

    #[test]
    fn test_company_not_repeated() {
        let terms = expand_search_terms(&strings(&["analyst", "ACME"]), "Acme", &[]);
        assert_eq!(terms, strings(&["analyst", "ACME"]));
    }

    #[test]
    fn test_comprehensive_request() {
        assert!(is_comprehensive_request(&["All Jobs"]));
        assert!(is_comprehensive_request(&[" * "]));
        assert!(!is_comprehensive_request(&["all", "analyst"]));

        let terms = expand_search_terms(&strings(&["all"]), "Acme", &[]);
        assert_eq!(terms.len(), COMPREHENSIVE_TERMS.len() + 1);

        let stored = strings(&["nurse", "chemist"]);
        let terms = expand_search_terms(&strings(&["*"]), "Acme", &stored);
        assert_eq!(terms, strings(&["nurse", "chemist", "Acme"]));
    }

    #[test]
    fn test_dedup_terms() {
        assert_eq!(
            dedup_terms(["Analyst", "manager", "analyst", " ", "Manager", "director"]),
            strings(&["Analyst", "manager", "director"])
        );
    }
}
