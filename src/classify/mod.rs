//! # Worksheet Classification
//!
//! Assigns a [`WorksheetRole`] to a downloaded table in two tiers:
//! a column-label cascade where the first matching rule wins, then a
//! content-scoring fallback for tables that carry a rating column.
//! A messaging-app column always makes a table product feedback.
pub(crate) mod criteria;

use crate::classify::criteria::keyword_set;
use crate::classify::criteria::Signal;
use crate::classify::criteria::Tier;
use crate::helpers::string::fold;
use crate::helpers::string::normalize;
use crate::spreadsheet::column::ColumnKind;
use crate::spreadsheet::sheet::RawTable;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Rows sampled by the content-scoring tier.
pub const CONTENT_SAMPLE_ROWS: usize = 10;

/// Semantic category of a worksheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorksheetRole {
    /// Next-day survey about the service
    ServiceFeedback,
    /// 30-day survey about the product, often sent over a messaging app
    ProductFeedback,
    /// Low-score cases tracked until resolution
    CriticalFeedback,
    /// Recognized but not a survey worksheet
    GeneralData,
    Unknown,
}

impl WorksheetRole {
    /// Roles a complete report needs.
    pub const REQUIRED: [WorksheetRole; 3] = [
        WorksheetRole::ServiceFeedback,
        WorksheetRole::ProductFeedback,
        WorksheetRole::CriticalFeedback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorksheetRole::ServiceFeedback => "service_feedback",
            WorksheetRole::ProductFeedback => "product_feedback",
            WorksheetRole::CriticalFeedback => "critical_feedback",
            WorksheetRole::GeneralData => "general_data",
            WorksheetRole::Unknown => "unknown",
        }
    }

    /// Survey name as shown in reports.
    pub fn label(self) -> &'static str {
        match self {
            WorksheetRole::ServiceFeedback => "NPS D+1 (service)",
            WorksheetRole::ProductFeedback => "NPS D+30 (product)",
            WorksheetRole::CriticalFeedback => "NPS Ruim (critical cases)",
            WorksheetRole::GeneralData => "General data",
            WorksheetRole::Unknown => "Unknown",
        }
    }

    /// Survey roles scored as NPS rather than listed as cases.
    pub fn is_scored(self) -> bool {
        matches!(self, WorksheetRole::ServiceFeedback | WorksheetRole::ProductFeedback)
    }
}

impl fmt::Display for WorksheetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification rule that decided a role, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Messaging,
    ProductKeywords,
    PhoneWithoutMessaging,
    CaseTracking,
    CaseManagement,
    BotOnly,
    ContentCritical,
    ContentProduct,
    ContentService,
    RatingDefault,
    NoRating,
}

/// A role together with the rule and keywords that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Assigned role
    pub role: WorksheetRole,
    /// Deciding rule
    pub rule: Rule,
    /// Keywords that fired for the deciding rule
    pub evidence: Vec<&'static str>,
}

impl Classification {
    fn new(role: WorksheetRole, rule: Rule, evidence: Vec<&'static str>) -> Self {
        Self { role, rule, evidence }
    }
}

/// Assigns a role to a table.
pub fn classify(table: &RawTable) -> WorksheetRole {
    explain(table).role
}

/// Assigns a role to a table and reports why.
pub fn explain(table: &RawTable) -> Classification {
    let columns = column_text(table);

    // Tier 1: column labels, first match wins
    let messaging = keyword_set(Tier::Columns, Signal::Messaging).matches(&columns);
    if !messaging.is_empty() {
        return Classification::new(WorksheetRole::ProductFeedback, Rule::Messaging, messaging);
    }

    let product = keyword_set(Tier::Columns, Signal::Product).matches(&columns);
    if !product.is_empty() {
        return Classification::new(WorksheetRole::ProductFeedback, Rule::ProductKeywords, product);
    }

    let phone = keyword_set(Tier::Columns, Signal::Phone).matches(&columns);
    if !phone.is_empty() {
        return Classification::new(WorksheetRole::ServiceFeedback, Rule::PhoneWithoutMessaging, phone);
    }

    let bot = keyword_set(Tier::Columns, Signal::Bot).matches(&columns);
    if !bot.is_empty() {
        let tracking: Vec<&'static str> = [Signal::Status, Signal::Resolution, Signal::Source]
            .into_iter()
            .flat_map(|signal| keyword_set(Tier::Columns, signal).matches(&columns))
            .collect();
        if !tracking.is_empty() {
            let evidence = bot.iter().copied().chain(tracking).collect();
            return Classification::new(WorksheetRole::CriticalFeedback, Rule::CaseTracking, evidence);
        }
    }

    let management = keyword_set(Tier::Columns, Signal::CaseManagement).matches(&columns);
    if management.len() >= 2 {
        return Classification::new(WorksheetRole::CriticalFeedback, Rule::CaseManagement, management);
    }

    if !bot.is_empty() {
        return Classification::new(WorksheetRole::GeneralData, Rule::BotOnly, bot);
    }

    // Tier 2: content scoring, only for tables with a rating column
    if ColumnKind::Rating.find(table).is_none() {
        return Classification::new(WorksheetRole::Unknown, Rule::NoRating, Vec::new());
    }

    let content = fold(&table.sample_text(CONTENT_SAMPLE_ROWS));
    let critical = keyword_set(Tier::Content, Signal::Critical).matches(&content);
    if critical.len() >= 2 {
        return Classification::new(WorksheetRole::CriticalFeedback, Rule::ContentCritical, critical);
    }
    let product = keyword_set(Tier::Content, Signal::Product).matches(&content);
    if !product.is_empty() {
        return Classification::new(WorksheetRole::ProductFeedback, Rule::ContentProduct, product);
    }
    let service = keyword_set(Tier::Content, Signal::Service).matches(&content);
    if !service.is_empty() {
        return Classification::new(WorksheetRole::ServiceFeedback, Rule::ContentService, service);
    }
    Classification::new(WorksheetRole::ServiceFeedback, Rule::RatingDefault, Vec::new())
}

/// True if any column label carries a messaging-app keyword.
pub fn has_messaging(table: &RawTable) -> bool {
    keyword_set(Tier::Columns, Signal::Messaging).any(&column_text(table))
}

/// True if a column label carries a phone keyword and none carries a messaging keyword.
pub fn has_phone_without_messaging(table: &RawTable) -> bool {
    let columns = column_text(table);
    keyword_set(Tier::Columns, Signal::Phone).any(&columns)
        && !keyword_set(Tier::Columns, Signal::Messaging).any(&columns)
}

/// Normalized labels joined by spaces.
fn column_text(table: &RawTable) -> String {
    table
        .header()
        .iter()
        .map(|label| normalize(label))
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(header: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::from_literal(header, rows)
    }

    #[test]
    fn test_whatsapp_table_is_product_feedback() {
        let table = table(
            &["Data", "Nome", "WhatsApp", "Avaliacao"],
            &[&["01/01", "Ana", "119", "9"], &["02/01", "Rui", "118", "10"], &["03/01", "Lia", "117", "6"]],
        );
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::ProductFeedback);
        assert_eq!(classification.rule, Rule::Messaging);
    }

    #[test]
    fn test_phone_table_is_service_feedback() {
        let table = table(&["ID", "Telefone", "Avaliacao", "Comentario"], &[&["1", "1133334444", "8", "ok"]]);
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::ServiceFeedback);
        assert_eq!(classification.rule, Rule::PhoneWithoutMessaging);
    }

    #[test]
    fn test_bot_with_status_and_source_is_critical_feedback() {
        let table = table(&["Id_Bot", "Situacao", "Fonte", "Avaliacao"], &[&["7", "Pendente", "D+1", "2"]]);
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::CriticalFeedback);
        assert_eq!(classification.rule, Rule::CaseTracking);
        assert!(classification.evidence.contains(&"bot"));
        assert!(classification.evidence.contains(&"situacao"));
        assert!(classification.evidence.contains(&"fonte"));
    }

    #[test]
    fn test_messaging_outranks_phone_and_case_columns() {
        let headers: [&[&str]; 4] = [
            &["Telefone", "WhatsApp", "Avaliacao"],
            &["Fone", "Zap", "Nota"],
            &["Id Bot", "Situação", "Resolução", "Telefone", "Wpp"],
            &["WhatsApp"],
        ];
        for header in headers {
            assert_eq!(classify(&table(header, &[&["x"]])), WorksheetRole::ProductFeedback, "{header:?}");
        }
    }

    #[test]
    fn test_product_keywords_without_messaging() {
        let table = table(&["Data", "Produto", "Telefone", "Nota"], &[&["x", "y", "z", "9"]]);
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::ProductFeedback);
        assert_eq!(classification.rule, Rule::ProductKeywords);
    }

    #[test]
    fn test_two_case_management_columns_are_critical() {
        let table = table(&["Cliente", "Motivo", "Canal", "Nota"], &[&["a", "b", "c", "3"]]);
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::CriticalFeedback);
        assert_eq!(classification.rule, Rule::CaseManagement);
        assert_eq!(classification.evidence, vec!["canal", "motivo"]);
    }

    #[test]
    fn test_bot_without_case_columns_is_general_data() {
        let table = table(&["Id Bot", "Cliente", "Avaliacao"], &[&["1", "Ana", "9"]]);
        assert_eq!(explain(&table).rule, Rule::BotOnly);
        assert_eq!(classify(&table), WorksheetRole::GeneralData);
    }

    #[test]
    fn test_no_rating_column_is_unknown() {
        let table = table(&["Loja", "Cidade"], &[&["Centro", "Recife"]]);
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::Unknown);
        assert_eq!(classification.rule, Rule::NoRating);
    }

    #[test]
    fn test_content_scoring_critical() {
        let table = table(
            &["Cliente", "Nota", "Comentario"],
            &[&["Ana", "2", "Reclamação em andamento"], &["Rui", "1", "Problema não resolvido"]],
        );
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::CriticalFeedback);
        assert_eq!(classification.rule, Rule::ContentCritical);
    }

    #[test]
    fn test_content_scoring_product() {
        let table = table(&["Cliente", "Nota", "Comentario"], &[&["Ana", "9", "Óculos chegaram perfeitos"]]);
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::ProductFeedback);
        assert_eq!(classification.rule, Rule::ContentProduct);
    }

    #[test]
    fn test_content_scoring_service() {
        let table = table(&["Cliente", "Nota", "Comentario"], &[&["Ana", "10", "Excelente atendimento"]]);
        let classification = explain(&table);
        assert_eq!(classification.role, WorksheetRole::ServiceFeedback);
        assert_eq!(classification.rule, Rule::ContentService);
    }

    #[test]
    fn test_rating_without_signals_defaults_to_service() {
        let table = table(&["Cliente", "Nota"], &[&["Ana", "10"]]);
        assert_eq!(explain(&table).rule, Rule::RatingDefault);
        assert_eq!(classify(&table), WorksheetRole::ServiceFeedback);
    }

    #[test]
    fn test_single_pending_word_in_service_comments_stays_service() {
        let table = table(
            &["Data", "Loja", "Avaliacao", "Comentario"],
            &[&["01/01", "Centro", "8", "Bom atendimento, mas a nota fiscal ficou pendente"]],
        );
        assert_eq!(classify(&table), WorksheetRole::ServiceFeedback);
    }

    #[test]
    fn test_two_case_words_in_service_comments_become_critical() {
        // Content scoring decides on keyword counts alone
        let table = table(
            &["Data", "Loja", "Avaliacao", "Comentario"],
            &[&["01/01", "Centro", "8", "Atendimento bom, problema pendente com a troca"]],
        );
        assert_eq!(classify(&table), WorksheetRole::CriticalFeedback);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(WorksheetRole::ServiceFeedback.to_string(), "service_feedback");
        assert_eq!(serde_json::to_string(&WorksheetRole::CriticalFeedback).unwrap(), "\"critical_feedback\"");
        assert!(WorksheetRole::ProductFeedback.is_scored());
        assert!(!WorksheetRole::CriticalFeedback.is_scored());
    }
}
