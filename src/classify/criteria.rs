//! Keyword tables driving worksheet classification.
//!
//! Column keywords are compared against normalized labels (underscores, no
//! accents); content keywords against folded cell text (lowercase, no
//! accents, punctuation kept).
use crate::classify::WorksheetRole;

/// Which part of the worksheet a keyword set is matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tier {
    /// Normalized column labels, substring match
    Columns,
    /// Folded sample of cell values, match at the start of a word
    Content,
}

/// What a keyword set detects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Signal {
    Messaging,
    Product,
    Phone,
    Bot,
    Status,
    Resolution,
    Source,
    CaseManagement,
    Critical,
    Service,
}

/// One row of the keyword table.
#[derive(Debug)]
pub(crate) struct KeywordSet {
    /// Matched against labels or content
    pub(crate) tier: Tier,
    /// Detected signal
    pub(crate) signal: Signal,
    /// Role the signal points to
    pub(crate) role: WorksheetRole,
    /// Keywords, most specific first
    pub(crate) keywords: &'static [&'static str],
}

pub(crate) const KEYWORD_SETS: &[KeywordSet] = &[
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::Messaging,
        role: WorksheetRole::ProductFeedback,
        keywords: &["whatsapp", "whats", "zapzap", "zap", "wpp", "watts"],
    },
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::Product,
        role: WorksheetRole::ProductFeedback,
        keywords: &[
            "produto",
            "product",
            "d_30",
            "d30",
            "trinta",
            "pos_venda",
            "satisfacao_produto",
            "qualidade",
            "mercadoria",
            "oculos",
        ],
    },
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::Phone,
        role: WorksheetRole::ServiceFeedback,
        keywords: &["telefone", "fone", "phone", "tel"],
    },
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::Bot,
        role: WorksheetRole::GeneralData,
        keywords: &["bot"],
    },
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::Status,
        role: WorksheetRole::CriticalFeedback,
        keywords: &["situacao", "situacaao", "situaacaao", "status"],
    },
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::Resolution,
        role: WorksheetRole::CriticalFeedback,
        keywords: &["resolucao", "resoucao", "resoluacaao"],
    },
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::Source,
        role: WorksheetRole::CriticalFeedback,
        keywords: &["fonte", "origem"],
    },
    KeywordSet {
        tier: Tier::Columns,
        signal: Signal::CaseManagement,
        role: WorksheetRole::CriticalFeedback,
        keywords: &[
            "situacao",
            "resolucao",
            "resoucao",
            "fonte",
            "origem",
            "canal",
            "motivo",
            "problema",
            "resolvido",
            "pendente",
            "analise",
            "tratamento",
            "followup",
            "follow_up",
            "ruim",
            "critico",
            "reclamacao",
            "status",
        ],
    },
    KeywordSet {
        tier: Tier::Content,
        signal: Signal::Critical,
        role: WorksheetRole::CriticalFeedback,
        keywords: &[
            "ruim",
            "critico",
            "problema",
            "reclamacao",
            "insatisfeito",
            "pendente",
            "resolvido",
            "em andamento",
            "analise",
            "fonte",
            "canal",
            "motivo",
            "situacao",
            "status",
        ],
    },
    KeywordSet {
        tier: Tier::Content,
        signal: Signal::Product,
        role: WorksheetRole::ProductFeedback,
        keywords: &[
            "whats",
            "zap",
            "wpp",
            "+55",
            "produto",
            "product",
            "d+30",
            "d30",
            "trinta",
            "pos-venda",
            "satisfacao",
            "qualidade",
            "mercadoria",
            "oculos",
            "lente",
            "armacao",
            "grau",
            "receita",
            "laboratorio",
        ],
    },
    KeywordSet {
        tier: Tier::Content,
        signal: Signal::Service,
        role: WorksheetRole::ServiceFeedback,
        keywords: &["atendimento", "servico", "telefone"],
    },
];

/// Looks up the keyword set for a tier and signal.
pub(crate) fn keyword_set(tier: Tier, signal: Signal) -> &'static KeywordSet {
    KEYWORD_SETS
        .iter()
        .find(|set| set.tier == tier && set.signal == signal)
        .unwrap_or_else(|| unreachable!("no {:?} keywords for {:?}", tier, signal))
}

impl KeywordSet {
    /// Distinct keywords of this set present in `text`.
    pub(crate) fn matches(&self, text: &str) -> Vec<&'static str> {
        self.keywords
            .iter()
            .copied()
            .filter(|keyword| match self.tier {
                Tier::Columns => text.contains(keyword),
                Tier::Content => contains_word_start(text, keyword),
            })
            .collect()
    }

    pub(crate) fn any(&self, text: &str) -> bool {
        !self.matches(text).is_empty()
    }
}

/// True if `keyword` occurs in `text` at the start of a word, so `lente`
/// does not match inside `excelente`.
fn contains_word_start(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(position, _)| {
        text[..position]
            .chars()
            .next_back()
            .map_or(true, |previous| !previous.is_alphanumeric())
    })
}
