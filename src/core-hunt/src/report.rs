//! CSV export of scraped jobs and the daily e-mail report.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use data_model_hunt::models::ScrapedJob;
use indoc::formatdoc;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::Error;
use crate::common::auth_config::is_flag_set;

pub const CSV_HEADERS: [&str; 16] = [
    "Company",
    "Title",
    "Location",
    "Description",
    "Salary_Min",
    "Salary_Max",
    "Salary_Interval",
    "Currency",
    "Date_Posted",
    "Date_Scraped",
    "Job_URL",
    "Site",
    "Job_Type",
    "Is_Remote",
    "Min_Experience_Years",
    "Max_Experience_Years",
];

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn csv_row(job: &ScrapedJob) -> [String; 16] {
    let description = job
        .description
        .as_deref()
        .unwrap_or_default()
        .replace(['\r', '\n'], " ");
    [
        job.company.clone(),
        job.title.clone(),
        opt(&job.location),
        description,
        opt(&job.min_amount),
        opt(&job.max_amount),
        opt(&job.salary_interval),
        opt(&job.currency),
        job.date_posted.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        job.date_scraped.format("%Y-%m-%d %H:%M:%S").to_string(),
        job.job_url.clone(),
        job.site.clone(),
        opt(&job.job_type),
        if job.is_remote == Some(true) { "Yes" } else { "No" }.to_string(),
        opt(&job.min_experience_years),
        opt(&job.max_experience_years),
    ]
}

/// The jobs as a CSV document with a header row.
pub fn jobs_csv(jobs: &[ScrapedJob]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for job in jobs {
        writer.write_record(csv_row(job))?;
    }
    Ok(writer.into_inner()?)
}

pub fn csv_attachment_name(date: NaiveDate) -> String {
    format!("JobHunt_Daily_Jobs_{}.csv", date.format("%Y-%m-%d"))
}

/// Jobs found for one company during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyCount {
    pub company: String,
    pub jobs: usize,
}

/// What happened in one finished scheduled run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub companies: Vec<CompanyCount>,
    pub search_terms: Vec<String>,
    pub total_jobs_found: i32,
    pub new_jobs_added: i32,
    pub duplicate_jobs_skipped: i32,
    /// Jobs on the daily review list built after the run, if one was built.
    pub review_jobs: Option<usize>,
}

impl RunReport {
    pub fn body(&self) -> String {
        let companies = if self.companies.is_empty() {
            "  (none)".to_string()
        } else {
            self.companies
                .iter()
                .map(|c| format!("  - {}: {} jobs", c.company, c.jobs))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let review = match self.review_jobs {
            Some(n) => format!("{} jobs added to today's review list", n),
            None => "No review list was created".to_string(),
        };
        let duration = (self.completed_at - self.started_at).num_seconds();

        formatdoc! {"
            Job Hunt Daily Scraping Report

            Summary
              Run: {run_id}
              Total jobs found: {total}
              New jobs added: {new}
              Duplicates skipped: {dups}
              {review}

            Companies
            {companies}

            Search terms
              {terms}

            Times (UTC)
              Started: {started}
              Completed: {completed}
              Duration: {duration}s

            The attached CSV lists every job found in this run.
            ",
            run_id = self.run_id,
            total = self.total_jobs_found,
            new = self.new_jobs_added,
            dups = self.duplicate_jobs_skipped,
            review = review,
            companies = companies,
            terms = self.search_terms.join(", "),
            started = self.started_at.format("%Y-%m-%d %H:%M:%S"),
            completed = self.completed_at.format("%Y-%m-%d %H:%M:%S"),
            duration = duration,
        }
    }

    pub fn subject(&self) -> String {
        format!(
            "Job Hunt Daily Report {}: {} new jobs",
            self.completed_at.format("%Y-%m-%d"),
            self.new_jobs_added
        )
    }
}

pub fn failure_body(run_id: &str, companies: &[String], error: &str, at: DateTime<Utc>) -> String {
    formatdoc! {"
        Job Hunt Daily Scraping Report

        The scheduled scraping run failed.

          Run: {run_id}
          Companies: {companies}
          Error: {error}
          Time (UTC): {at}
        ",
        run_id = run_id,
        companies = companies.join(", "),
        error = error,
        at = at.format("%Y-%m-%d %H:%M:%S"),
    }
}

/// A message for the notification recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// (file name, CSV bytes)
    pub attachment: Option<(String, Vec<u8>)>,
}

/// Interface to something that delivers notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub user: String,
    pub password: String,
    pub recipient: String,
}

impl EmailConfig {
    /// Reads EMAIL_NOTIFICATIONS_ENABLED, SMTP_SERVER, SMTP_PORT, EMAIL_USER,
    /// EMAIL_PASSWORD and NOTIFICATION_EMAIL.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default().trim().to_string();
        let smtp_server = Some(var("SMTP_SERVER"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "smtp.gmail.com".to_string());
        EmailConfig {
            enabled: is_flag_set("EMAIL_NOTIFICATIONS_ENABLED"),
            smtp_server,
            smtp_port: var("SMTP_PORT").parse().unwrap_or(587),
            user: var("EMAIL_USER"),
            password: var("EMAIL_PASSWORD"),
            recipient: var("NOTIFICATION_EMAIL"),
        }
    }

    /// Enabled and has somewhere to send to.
    pub fn can_send(&self) -> bool {
        self.enabled && !self.recipient.is_empty() && !self.user.is_empty()
    }
}

/// Sends notifications over SMTP with STARTTLS.
pub struct SmtpNotifier {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, Error> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.user.clone(), config.password.clone()))
            .build();
        Ok(SmtpNotifier { config, transport })
    }

    fn message(&self, notification: &Notification) -> Result<Message, Error> {
        let from: Mailbox = self.config.user.parse()?;
        let to: Mailbox = self.config.recipient.parse()?;
        let builder = Message::builder().from(from).to(to).subject(notification.subject.clone());

        let message = match &notification.attachment {
            Some((name, bytes)) => {
                let csv_type = ContentType::parse("text/csv").map_err(|e| Error::Email(e.to_string()))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(notification.body.clone()))
                        .singlepart(Attachment::new(name.clone()).body(bytes.clone(), csv_type)),
                )?
            }
            None => builder.header(ContentType::TEXT_PLAIN).body(notification.body.clone())?,
        };
        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), Error> {
        let message = self.message(notification)?;
        self.transport.send(message).await?;
        info!("Sent '{}' to {}", notification.subject, self.config.recipient);
        Ok(())
    }
}
