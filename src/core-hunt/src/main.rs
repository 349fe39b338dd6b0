use chrono::Utc;
use clap::{Parser, Subcommand};
use core_hunt::dedup::{content_hash, job_hash};
use core_hunt::experience::extract_experience_years;
use core_hunt::relevance::RelevanceScorer;
use core_hunt::scraper::supported_sites;
use core_hunt::terms::expand_search_terms;
use data_model_hunt::models::ScrapedJob;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "core-hunt")]
#[command(about = "One-off tools for the job hunt pipeline", long_about = None)]
struct CoreCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dedup hashes of a posting
    Hash {
        #[arg(long, default_value = "")]
        url: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
        #[arg(long, default_value = "")]
        location: String,
    },

    /// Extract required years of experience from a description file
    Experience {
        #[arg(short, long, value_parser = validate_input_file)]
        file: PathBuf,
    },

    /// Score a scraped job (JSON file) against search terms
    Score {
        #[arg(short, long, value_parser = validate_input_file)]
        job: PathBuf,
        /// Search terms, repeatable
        #[arg(short, long, required = true)]
        term: Vec<String>,
        #[arg(long)]
        expected_salary: Option<f64>,
        /// Keywords that cost points, repeatable
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Show the search terms a company scrape would use
    Terms {
        #[arg(short, long)]
        company: String,
        #[arg(short, long)]
        term: Vec<String>,
    },

    /// List the job boards the scraper supports
    Sites,
}

fn validate_input_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);

    if !path.exists() {
        return Err(format!("Input path does not exist: {}", path.display()));
    }

    if !path.is_file() {
        return Err(format!("Input path is not a file: {}", path.display()));
    }

    Ok(path)
}

fn read_or_exit(file: &PathBuf) -> String {
    match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Cannot read file ({file:?}) due to: {e:?}");
            std::process::exit(1)
        }
    }
}

fn main() {
    let cli = CoreCli::parse();

    match &cli.command {
        Commands::Hash {
            url,
            title,
            company,
            location,
        } => {
            println!("job_hash:     {}", job_hash(url, title, company, location));
            println!("content_hash: {}", content_hash(title, company, location));
        }

        Commands::Experience { file } => {
            let content = read_or_exit(file);
            match extract_experience_years(Some(&content)) {
                (None, None) => println!("No experience requirement found"),
                (min, max) => println!(
                    "min: {}, max: {}",
                    min.map_or("-".to_string(), |v| v.to_string()),
                    max.map_or("-".to_string(), |v| v.to_string())
                ),
            }
        }

        Commands::Score {
            job,
            term,
            expected_salary,
            exclude,
        } => {
            let content = read_or_exit(job);
            let job: ScrapedJob = match serde_json::from_str(&content) {
                Ok(job) => job,
                Err(e) => {
                    eprintln!("Not a scraped job ({job:?}): {e}");
                    std::process::exit(1)
                }
            };
            let scorer = RelevanceScorer::new(Utc::now())
                .with_expected_salary(*expected_salary)
                .with_exclude_keywords(exclude.clone());
            println!("score: {}", scorer.score(&job, term.as_slice()));
            match scorer.best_matching_keyword(&job, term.as_slice()) {
                Some((keyword, score)) => println!("best keyword: {keyword} ({score})"),
                None => println!("best keyword: none"),
            }
        }

        Commands::Terms { company, term } => {
            for t in expand_search_terms(term, company, &[]) {
                println!("{t}");
            }
        }

        Commands::Sites => {
            for site in supported_sites() {
                println!("{site}");
            }
        }
    }
}
