//! Monthly financial analyses.
//!
//! - [`period`]: calendar-month periods (`YYYY-MM`)
//! - [`summary`]: pure aggregation of a month's transactions, goals and investments
//! - [`prompt`]: instruction and message sent to the text generator
//! - [`llm`]: the [`TextGenerator`](llm::TextGenerator) seam and its HTTP client
//!
//! [`generate_monthly_analysis`] ties them together: one analysis per user per UTC day, and
//! never for a month without transactions.

pub mod llm;
pub mod period;
pub mod prompt;
pub mod summary;

use crate::{
    api::models::users::CurrentUser,
    config::AnalysisConfig,
    db::{
        Database,
        errors::DbError,
        handlers::{
            Analyses, Goals, Investments, Repository, Transactions, goals::GoalFilter, investments::InvestmentFilter,
            transactions::TransactionFilter,
        },
        models::analyses::{AnalysisCreateDBRequest, AnalysisDBResponse},
    },
    errors::Error,
    types::abbrev_uuid,
};
use chrono::NaiveDate;
use llm::TextGenerator;
use period::MonthPeriod;
use tracing::{error, info, instrument};

/// Generate, store and return the analysis of `period` for `user`.
///
/// `today` is the current UTC date, used for the once-per-day limit. The database connection is
/// released while the text generator runs.
#[instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id), period = %period), err)]
pub async fn generate_monthly_analysis(
    db: &Database,
    generator: &dyn TextGenerator,
    settings: &AnalysisConfig,
    user: &CurrentUser,
    period: MonthPeriod,
    today: NaiveDate,
) -> Result<AnalysisDBResponse, Error> {
    let (transactions, goals, investments) = {
        let mut conn = db.acquire().await?;

        if Analyses::new(&mut conn).exists_created_on(user.id, today).await? {
            return Err(already_generated());
        }

        let filter = TransactionFilter::new(user.id).between(Some(period.first_day()), Some(period.last_day()));
        let transactions = Transactions::new(&mut conn).list(&filter).await?;
        if transactions.is_empty() {
            return Err(Error::BadRequest {
                message: format!("No transactions recorded for {period}"),
            });
        }

        let goals = Goals::new(&mut conn).list(&GoalFilter::new(user.id)).await?;
        let investments = Investments::new(&mut conn).list(&InvestmentFilter::new(user.id)).await?;
        (transactions, goals, investments)
    };

    let summary = summary::summarize(period, &transactions, &goals, &investments, settings);
    let message = prompt::user_message(&user.name, &summary).map_err(|e| {
        error!("Failed to serialize monthly summary: {}", e);
        Error::Internal {
            operation: "prepare analysis".to_string(),
        }
    })?;

    let content = generator.generate(prompt::SYSTEM_PROMPT, &message).await.map_err(|e| {
        error!("Text generation failed: {:#}", e);
        Error::Upstream {
            service: "Analysis generation".to_string(),
            message: "the text generator did not return a result".to_string(),
        }
    })?;

    let mut tx = db.begin().await?;
    let mut analyses = Analyses::new(&mut tx);
    // A concurrent request may have finished while the generator ran.
    analyses.lock_user(user.id).await?;
    if analyses.exists_created_on(user.id, today).await? {
        return Err(already_generated());
    }
    let analysis = analyses
        .create(&AnalysisCreateDBRequest {
            user_id: user.id,
            content,
            insights: summary,
            period_start: period.first_day(),
            period_end: period.last_day(),
        })
        .await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(analysis_id = %abbrev_uuid(&analysis.id), "Monthly analysis generated");
    Ok(analysis)
}

fn already_generated() -> Error {
    Error::Conflict {
        message: "An analysis was already generated today. Try again tomorrow.".to_string(),
    }
}
