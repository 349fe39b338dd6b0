//! Rule-based relevance scoring of scraped postings against search terms.

use chrono::{DateTime, Utc};
use data_model_hunt::models::ScrapedJob;

const STOP_WORDS: [&str; 13] = ["and", "or", "the", "a", "an", "in", "at", "for", "with", "by", "to", "of", "from"];

const EXACT_TITLE_MATCH: f64 = 100.0;
const EXACT_DESCRIPTION_MATCH: f64 = 80.0;
const ALL_TITLE_WORDS: f64 = 60.0;
const TITLE_WORD: f64 = 15.0;
const DESCRIPTION_WORD: f64 = 10.0;
const COMPANY_MATCH: f64 = 25.0;
const SALARY_MEETS: f64 = 20.0;
const SALARY_CLOSE: f64 = 10.0;
const POSTED_THIS_HALF_WEEK: f64 = 15.0;
const POSTED_THIS_WEEK: f64 = 5.0;
const REMOTE: f64 = 10.0;
const EXCLUDED_KEYWORD: f64 = -30.0;

/// Bonus per additional term that also clears the minimum score.
pub const CORROBORATION_BONUS: f64 = 10.0;

/// Everything about a scoring pass that is not the job or the search terms.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    pub expected_salary: Option<f64>,
    pub exclude_keywords: Vec<String>,
    pub now: DateTime<Utc>,
}

impl RelevanceScorer {
    pub fn new(now: DateTime<Utc>) -> Self {
        RelevanceScorer {
            expected_salary: None,
            exclude_keywords: Vec::new(),
            now,
        }
    }

    pub fn with_expected_salary(mut self, expected_salary: Option<f64>) -> Self {
        self.expected_salary = expected_salary;
        self
    }

    pub fn with_exclude_keywords(mut self, exclude_keywords: Vec<String>) -> Self {
        self.exclude_keywords = exclude_keywords;
        self
    }

    /// Scores `job` against all of `search_terms` at once. Never negative.
    pub fn score<S: AsRef<str>>(&self, job: &ScrapedJob, search_terms: &[S]) -> f64 {
        let search_text = search_terms
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let search_words = search_words(&search_text);
        if search_words.is_empty() {
            return 0.0;
        }
        let search_text = search_text.trim();

        let title = job.title.to_lowercase();
        let description = job.description.as_deref().unwrap_or_default().to_lowercase();
        let company = job.company.to_lowercase();

        let mut score = 0.0;

        if title.contains(search_text) {
            score += EXACT_TITLE_MATCH;
        }
        if description.contains(search_text) {
            score += EXACT_DESCRIPTION_MATCH;
        }

        let title_words: Vec<&str> = title.split_whitespace().collect();
        let matched = search_words
            .iter()
            .filter(|word| {
                title_words
                    .iter()
                    .any(|tw| tw.contains(word.as_str()) || word.contains(*tw))
            })
            .count();
        if matched == search_words.len() {
            score += ALL_TITLE_WORDS;
        } else {
            score += TITLE_WORD * matched as f64;
        }

        let in_description = search_words.iter().filter(|w| description.contains(w.as_str())).count();
        score += DESCRIPTION_WORD * in_description as f64;

        if search_words.iter().any(|w| company.contains(w.as_str())) {
            score += COMPANY_MATCH;
        }

        score += self.salary_bonus(job);
        score += self.recency_bonus(job);

        if job.is_remote == Some(true) {
            score += REMOTE;
        }

        for keyword in &self.exclude_keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && (title.contains(&keyword) || description.contains(&keyword)) {
                score += EXCLUDED_KEYWORD;
            }
        }

        score.max(0.0)
    }

    /// Zero or negative amounts mean "not stated" and earn nothing.
    fn salary_bonus(&self, job: &ScrapedJob) -> f64 {
        match (self.expected_salary, job.min_amount, job.max_amount) {
            (Some(expected), Some(min), Some(max)) if expected > 0.0 && min > 0.0 && max > 0.0 => {
                let average = (min + max) / 2.0;
                if average >= expected {
                    SALARY_MEETS
                } else if average >= expected * 0.8 {
                    SALARY_CLOSE
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn recency_bonus(&self, job: &ScrapedJob) -> f64 {
        let Some(posted) = job.date_posted else {
            return 0.0;
        };
        let days_old = (self.now - posted).num_days();
        if days_old <= 3 {
            POSTED_THIS_HALF_WEEK
        } else if days_old <= 7 {
            POSTED_THIS_WEEK
        } else {
            0.0
        }
    }

    /// Scores each term on its own and returns the best one. Ties go to the
    /// earlier term; a best score of zero means no match.
    pub fn best_matching_keyword<S: AsRef<str>>(&self, job: &ScrapedJob, terms: &[S]) -> Option<(String, f64)> {
        let mut best: Option<(String, f64)> = None;
        for term in terms {
            let score = self.score(job, &[term.as_ref()]);
            if score > 0.0 && best.as_ref().is_none_or(|(_, s)| score > *s) {
                best = Some((term.as_ref().to_string(), score));
            }
        }
        best
    }

    /// Best keyword plus how many other terms corroborate it.
    pub fn match_keywords<S: AsRef<str>>(&self, job: &ScrapedJob, terms: &[S], min_score: f64) -> Option<KeywordMatch> {
        let scores: Vec<f64> = terms.iter().map(|t| self.score(job, &[t.as_ref()])).collect();
        let (keyword, score) = self.best_matching_keyword(job, terms)?;
        if score < min_score {
            return None;
        }
        let corroborating_terms = scores.iter().filter(|s| **s >= min_score).count().saturating_sub(1);
        let enhanced_score = score + CORROBORATION_BONUS * corroborating_terms as f64;
        Some(KeywordMatch {
            keyword,
            score,
            enhanced_score,
            corroborating_terms,
            relevance: AiRelevance::from_enhanced_score(enhanced_score),
        })
    }
}

/// Convenience for one-off scoring.
pub fn calculate_relevance_score<S: AsRef<str>>(
    job: &ScrapedJob,
    search_terms: &[S],
    expected_salary: Option<f64>,
    exclude_keywords: &[String],
    now: DateTime<Utc>,
) -> f64 {
    RelevanceScorer::new(now)
        .with_expected_salary(expected_salary)
        .with_exclude_keywords(exclude_keywords.to_vec())
        .score(job, search_terms)
}

fn search_words(search_text: &str) -> Vec<String> {
    search_text
        .split_whitespace()
        .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub keyword: String,
    pub score: f64,
    pub enhanced_score: f64,
    pub corroborating_terms: usize,
    pub relevance: AiRelevance,
}

/// Coarse relevance label shown next to a filtered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiRelevance {
    High,
    Medium,
    Low,
}

impl AiRelevance {
    pub fn from_enhanced_score(enhanced_score: f64) -> Self {
        if enhanced_score >= 120.0 {
            AiRelevance::High
        } else if enhanced_score >= 80.0 {
            AiRelevance::Medium
        } else {
            AiRelevance::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AiRelevance::High => "high",
            AiRelevance::Medium => "medium",
            AiRelevance::Low => "low",
        }
    }
}
