//! Hashes used to recognise the same posting across sites and re-scrapes.
//!
//! `job_hash` identifies a posting by its URL (falling back to its title, company
//! and location). `content_hash` identifies the same role even when it is posted
//! under different URLs.

use std::sync::LazyLock;

use regex::Regex;

use crate::scraper::RawPosting;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// md5 of the lowercased URL, or of `title|company|location` when there is no URL.
pub fn job_hash(url: &str, title: &str, company: &str, location: &str) -> String {
    let url = url.trim();
    if !url.is_empty() {
        return md5_hex(&url.to_lowercase());
    }
    let key = [title, company, location]
        .iter()
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|");
    md5_hex(&key)
}

/// md5 of `title|company|location` with punctuation and extra whitespace removed.
pub fn content_hash(title: &str, company: &str, location: &str) -> String {
    let key = [title, company, location]
        .iter()
        .map(|part| normalize_text(part))
        .collect::<Vec<_>>()
        .join("|");
    md5_hex(&key)
}

/// Lowercase, drop non-word characters, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Key for deduplicating postings within a single company scrape.
pub fn dedup_key(posting: &RawPosting) -> String {
    let url = posting
        .job_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .or_else(|| posting.job_url_direct.as_deref().map(str::trim).filter(|u| !u.is_empty()));

    match url {
        Some(url) => format!("url::{}", url),
        None => format!(
            "tcl::{}|{}|{}",
            posting.title.trim().to_lowercase(),
            posting.company.trim().to_lowercase(),
            posting.location.as_deref().unwrap_or_default().trim().to_lowercase()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_hash_prefers_url() {
        let a = job_hash("https://Example.com/job/1 ", "Analyst", "Acme", "NYC");
        let b = job_hash("https://example.com/job/1", "Different", "Other", "");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(a, format!("{:x}", md5::compute("https://example.com/job/1")));
    }

    #[test]
    fn test_job_hash_without_url() {
        let a = job_hash("  ", " Analyst", "ACME ", "NYC");
        assert_eq!(a, format!("{:x}", md5::compute("analyst|acme|nyc")));
        assert_ne!(a, job_hash("", "Analyst", "Acme", "Boston"));
    }

    #[test]
    fn test_content_hash_ignores_punctuation_and_spacing() {
        let a = content_hash("Sr. Data  Analyst!", "Acme, Inc.", "New York, NY");
        let b = content_hash("sr data analyst", "acme inc", "new york ny");
        assert_eq!(a, b);
        assert_eq!(normalize_text("  Hello,   World!! "), "hello world");
    }

    #[test]
    fn test_dedup_key() {
        let mut posting = RawPosting::new("Data Analyst", "Acme");
        posting.location = Some("NYC".to_string());
        assert_eq!(dedup_key(&posting), "tcl::data analyst|acme|nyc");

        posting.job_url_direct = Some("https://acme.com/careers/9".to_string());
        assert_eq!(dedup_key(&posting), "url::https://acme.com/careers/9");

        posting.job_url = Some(" https://board.com/9 ".to_string());
        assert_eq!(dedup_key(&posting), "url::https://board.com/9");
    }
}
