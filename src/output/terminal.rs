// Colored terminal output for analyses, similar URLs and manifest checks.
//
// main.rs does the work and hands the results here for display.

use colored::Colorize;

use crate::analyzer::AnalysisOutcome;
use crate::db::models::SimilarUrl;
use crate::manifest::{Manifest, Requirement, Resolution, Tier, UrlCheck};
use crate::pipeline::reanalyze::ReanalyzeSummary;
use crate::pipeline::visits::VisitSummary;
use crate::topics::corpus::topics_for_keywords;

/// Display the result of analyzing a single URL.
pub fn display_analysis(outcome: &AnalysisOutcome) {
    println!("\n{}", format!("=== {} ===", outcome.url).bold());

    if let Some(title) = &outcome.title {
        println!("  Title: {}", super::truncate_chars(title, 100));
    }
    if let Some(guess) = &outcome.language {
        println!(
            "  Language: {} (confidence {:.2})",
            guess.language, guess.confidence
        );
    }

    match &outcome.keywords {
        None => println!("  Keywords: {}", "not fetched".red()),
        Some(keywords) if keywords.is_empty() => println!("  Keywords: {}", "none".dimmed()),
        Some(keywords) => {
            println!("  Keywords: {}", keywords.join(", ").green());
            let topics = topics_for_keywords(keywords.as_slice());
            if !topics.is_empty() {
                println!("  Topics:   {}", topics.join(", "));
            }
        }
    }

    if let Some(embedding) = &outcome.embedding {
        println!("  Embedding: {}-dim vector", embedding.len());
    }
}

/// Display stored URLs ranked by distance to a query page.
pub fn display_similar(query: &str, similar: &[SimilarUrl]) {
    if similar.is_empty() {
        println!("No stored embeddings to compare against. Analyze some pages first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== {} pages similar to {} ===", similar.len(), query).bold()
    );
    println!();
    println!(
        "  {:>4}  {:>8}  {:<16} {}",
        "Rank".dimmed(),
        "Distance".dimmed(),
        "Publisher".dimmed(),
        "URL".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for (i, entry) in similar.iter().enumerate() {
        println!(
            "  {:>4}. {:>8.4}  {:<16} {}",
            i + 1,
            entry.distance,
            entry.publisher,
            super::truncate_chars(&entry.url, 80),
        );
    }
}

pub fn display_visit_summary(summary: &VisitSummary) {
    println!(
        "Recorded {} visits across {} URLs",
        summary.visits, summary.urls
    );
    if summary.skipped > 0 {
        println!("  {} {} records skipped", "~".yellow(), summary.skipped);
    }
}

pub fn display_reanalyze_summary(summary: &ReanalyzeSummary) {
    if summary.due == 0 {
        println!("No URLs are due for re-analysis.");
        return;
    }
    println!(
        "Re-analyzed {} of {} due URLs",
        summary.analyzed, summary.due
    );
    if summary.failed > 0 {
        println!("  {} {} failed (see log)", "!".bright_red(), summary.failed);
    }
}

/// Display a manifest grouped by section, with each section's tier.
pub fn display_manifest(manifest: &Manifest) {
    for section in &manifest.sections {
        let title = section.title.as_deref().unwrap_or("(untitled)");
        println!("\n{} [{}]", title.bold(), colorize_tier(section.tier));
        for requirement in section.requirements() {
            match &requirement.note {
                Some(note) => println!("  {}  {}", requirement, note.dimmed()),
                None => println!("  {}", requirement),
            }
        }
    }

    let directives = manifest.directives();
    if !directives.is_empty() {
        println!("\n{}", "Options".bold());
        for directive in directives {
            println!("  {}", directive.dimmed());
        }
    }
}

/// Details of one manifest entry.
pub fn display_requirement(requirement: &Requirement) {
    println!("\n{}", format!("line {}: {}", requirement.line, requirement).bold());
    if let Some(note) = &requirement.note {
        println!("  Note:   {}", note.dimmed());
    }
    if !requirement.spec.is_empty() {
        println!("  Range:  {}", requirement.spec);
    }
    if let Some(marker) = &requirement.marker {
        println!("  Marker: {}", marker);
    }
    if let Some(url) = requirement.direct_url() {
        println!("  URL:    {}", url);
    }
}

pub fn display_resolution(resolution: &Resolution) {
    println!(
        "\n{}",
        format!("=== Resolved {} packages ===", resolution.packages.len()).bold()
    );
    for line in resolution.to_lines() {
        println!("  {}", line);
    }
}

pub fn display_url_checks(checks: &[UrlCheck]) {
    if checks.is_empty() {
        println!("No direct URLs to check.");
        return;
    }
    for check in checks {
        let status = match check.status {
            Some(code) if check.is_fetchable() => code.to_string().green(),
            Some(code) => code.to_string().red(),
            None => "unreachable".red(),
        };
        println!(
            "  line {:>3}  {:<24} {}  {}",
            check.line,
            check.name,
            status,
            check.url.dimmed()
        );
    }
}

fn colorize_tier(tier: Tier) -> colored::ColoredString {
    match tier {
        Tier::Base => tier.to_string().green(),
        Tier::MachineLearning => tier.to_string().yellow(),
    }
}
