//! Prompt construction for monthly analyses.

use crate::analysis::summary::MonthlySummary;

/// Fixed instruction sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are a personal finance assistant. You receive a JSON summary of one \
person's month: income, expenses, investments, their largest categories, unusual expenses, savings \
goals and how their investments are spread. Write a short, friendly analysis in plain prose with \
three parts: an overview of the month, what stood out (mention specific categories and amounts), \
and two or three concrete, realistic suggestions for next month. Do not invent figures that are not \
in the summary. Do not give regulated investment advice.";

/// The user message: the person's name and the serialized summary.
pub fn user_message(name: &str, summary: &MonthlySummary) -> serde_json::Result<String> {
    let figures = serde_json::to_string_pretty(summary)?;
    Ok(format!(
        "Name: {name}\nPeriod: {} to {}\n\nSummary:\n{figures}",
        summary.period_start, summary.period_end
    ))
}
