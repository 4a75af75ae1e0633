//! Terminal rendering of views

use examvault_common::models::BatchOutcome;
use examvault_common::mutation::BulkOutcome;
use examvault_common::remote::FilterOptions;
use examvault_common::views::{DashboardSummary, RankedUser};
use examvault_common::Record;
use serde::Serialize;
use std::collections::BTreeMap;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value.trim()
    }
}

pub fn records(records: &[Record], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(records);
    }
    if records.is_empty() {
        println!("No papers found");
        return Ok(());
    }

    println!(
        "{:<22} {:>4} {:>3} {:<10} {:<30} {:<7} {:<12} {:<8} {}",
        "ID", "YEAR", "SEM", "CODE", "SUBJECT", "TYPE", "BRANCH", "STATUS", "PDF"
    );
    for r in records {
        let subject: String = or_dash(&r.subject_name).chars().take(30).collect();
        println!(
            "{:<22} {:>4} {:>3} {:<10} {:<30} {:<7} {:<12} {:<8} {}",
            or_dash(&r.id),
            or_dash(&r.year),
            or_dash(&r.semester),
            or_dash(&r.paper_code),
            subject,
            or_dash(&r.paper_type),
            or_dash(&r.branch),
            r.status,
            r.document_url().unwrap_or("(not available)"),
        );
    }
    let incomplete = records.iter().filter(|r| r.is_incomplete()).count();
    if incomplete > 0 {
        println!("{} of {} rows are incomplete", incomplete, records.len());
    }
    Ok(())
}

pub fn leaderboard(ranked: &[RankedUser], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(ranked);
    }
    for user in ranked {
        println!("{:>3}. {:<40} {:>4}  latest {}", user.rank, user.email, user.submissions, or_dash(&user.latest));
    }
    Ok(())
}

fn counts(title: &str, counts: &BTreeMap<String, usize>) {
    let line: Vec<String> = counts.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    println!("{:<10} {}", title, line.join("  "));
}

pub fn summary(summary: &DashboardSummary, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(summary);
    }
    println!(
        "total {}  enabled {}  disabled {}  incomplete {}",
        summary.total, summary.enabled, summary.disabled, summary.incomplete
    );
    counts("year", &summary.by_year);
    counts("semester", &summary.by_semester);
    counts("branch", &summary.by_branch);
    counts("type", &summary.by_type);
    Ok(())
}

pub fn filter_options(options: &FilterOptions, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(options);
    }
    println!("years      {}", options.years.join(", "));
    println!("semesters  {}", options.sems.join(", "));
    println!("branches   {}", options.branches.join(", "));
    Ok(())
}

#[derive(Serialize)]
struct BulkLine<'a> {
    id: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn bulk(outcomes: &[BulkOutcome], json: bool) -> anyhow::Result<()> {
    let lines: Vec<BulkLine> = outcomes
        .iter()
        .map(|o| BulkLine {
            id: &o.id,
            ok: o.is_ok(),
            error: o.result.as_ref().err().map(|e| e.user_message()),
        })
        .collect();
    if json {
        return print_json(&lines);
    }
    for line in lines {
        match line.error {
            None => println!("{:<22} ok", line.id),
            Some(error) => println!("{:<22} FAILED  {}", line.id, error),
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchReport<'a> {
    batch_id: &'a str,
    saved: Vec<(&'a str, &'a str)>,
    failed: Vec<(&'a str, String)>,
}

pub fn batch(outcome: &BatchOutcome, json: bool) -> anyhow::Result<()> {
    let report = BatchReport {
        batch_id: &outcome.batch_id,
        saved: outcome.saved.iter().map(|(b, id)| (b.code(), id.as_str())).collect(),
        failed: outcome
            .failed
            .iter()
            .map(|f| (f.branch.code(), f.error.user_message()))
            .collect(),
    };
    if json {
        return print_json(&report);
    }
    for (branch, id) in &report.saved {
        println!("{:<12} saved as {}", branch, id);
    }
    for (branch, error) in &report.failed {
        println!("{:<12} FAILED  {}", branch, error);
    }
    if report.failed.is_empty() {
        println!("Submitted for moderation; it appears once an admin enables it");
    }
    Ok(())
}
