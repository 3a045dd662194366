use crate::classify::WorksheetRole;
use crate::report::AnalysisBundle;
use std::fmt::Write;

/// Critical cases quoted in the summary.
const SUMMARY_CASES: usize = 3;

pub const SYSTEM_PROMPT: &str =
    "You are a consultant specialized in NPS and customer experience. Be precise and actionable.";

/// Insights used when the text-generation service is unavailable.
pub const TEMPLATE_INSIGHTS: &str = "\
KEY INSIGHTS:
- Survey data extracted and processed
- NPS metrics computed with the standard 0-6 / 7-8 / 9-10 buckets
- Results split by survey type

COMPARISON:
- Review D+1 (service) against D+30 (product) scores above

ATTENTION POINTS:
- Configure a text-generation API key for detailed insights

RECOMMENDATIONS:
1. Monitor NPS metrics regularly
2. Follow up every critical case until resolution
3. Act on recurring themes in detractor comments
";

/// Plain-text digest of the computed metrics, fed to the text-generation service.
pub fn metrics_summary(bundle: &AnalysisBundle, store: Option<&str>) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "=== NPS ANALYSIS {} ===\n", store.unwrap_or(&bundle.spreadsheet).to_uppercase());

    for worksheet in &bundle.worksheets {
        if let Some(metrics) = worksheet.score().filter(|_| worksheet.role.is_scored()) {
            let _ = writeln!(text, "{}:", worksheet.role.label().to_uppercase());
            let _ = writeln!(text, "  - Responses: {}", metrics.respondents);
            let _ = writeln!(text, "  - NPS score: {:.1}", metrics.nps_score);
            let _ = writeln!(text, "  - Mean rating: {:.2}", metrics.mean_rating);
            let _ = writeln!(text, "  - Promoters: {} ({:.1}%)", metrics.promoters.count, metrics.promoters.percentage);
            let _ = writeln!(text, "  - Passives: {} ({:.1}%)", metrics.passives.count, metrics.passives.percentage);
            let _ = writeln!(text, "  - Detractors: {} ({:.1}%)\n", metrics.detractors.count, metrics.detractors.percentage);
        } else if let Some(cases) = worksheet.cases() {
            let _ = writeln!(text, "CRITICAL CASES:");
            let _ = writeln!(text, "  - Total cases: {}", cases.total_cases);
            if !cases.cases.is_empty() {
                let _ = writeln!(text, "  - Main problems:");
                for case in cases.cases.iter().take(SUMMARY_CASES) {
                    let rating = case.rating.map(|rating| format!("{rating}")).unwrap_or_else(|| "N/A".to_owned());
                    let _ = writeln!(
                        text,
                        "    - Rating {} | {} | {}",
                        rating,
                        case.agent.as_deref().unwrap_or("N/A"),
                        case.store.as_deref().unwrap_or("N/A"),
                    );
                }
            }
            let _ = writeln!(text);
        }
    }

    let _ = writeln!(text, "AGENTS:");
    for worksheet in &bundle.worksheets {
        if let Some(agents) = &worksheet.agents {
            let _ = writeln!(text, "  - {}: {} distinct agents", worksheet.role.label(), agents.agents);
            let _ = writeln!(text, "    Top: {} (mean {:.2})", agents.top.name, agents.top.mean_rating);
        }
    }

    if !bundle.missing_roles.is_empty() {
        let missing: Vec<&str> = bundle.missing_roles.iter().map(|role| role.label()).collect();
        let _ = writeln!(text, "\nMISSING WORKSHEETS: {}", missing.join(", "));
    }
    text
}

/// User prompt asking for insights in a fixed section layout.
pub fn insight_prompt(bundle: &AnalysisBundle, store: Option<&str>) -> String {
    let company = store.map(|store| format!(" of {store}")).unwrap_or_default();
    let service = WorksheetRole::ServiceFeedback.label();
    let product = WorksheetRole::ProductFeedback.label();
    format!(
        "Analyze the NPS data{company} and produce strategic insights.

DATA SUMMARY:
{summary}
WRITE AN INSIGHT REPORT IN THIS FORMAT:

KEY INSIGHTS:
- [Main insight about performance]
- [Insight about strengths]
- [Insight about opportunities]

COMPARISON:
- {service} vs {product}: [service compared with product]
- Patterns: [patterns found in the data]

ATTENTION POINTS:
- [Main problem found]
- [Agents or stores needing attention]

RECOMMENDATIONS:
1. [Urgent recommendation]
2. [Improvement recommendation]
3. [Preventive recommendation]

Be specific, use the actual figures and focus on practical actions.
",
        summary = metrics_summary(bundle, store),
    )
}
