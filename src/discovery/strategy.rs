//! Discovery strategies and the worksheet handles each one probes.
use crate::classify::WorksheetRole;
use crate::spreadsheet::handle::WorksheetHandle;
use sha2::Digest;
use sha2::Sha256;
use std::collections::HashSet;

/// Strategies in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// One worksheet holding every survey, split by a survey-type column
    SingleWorksheet,
    /// Handles supplied by the caller
    ExplicitHandles,
    /// Well-known tab positions
    PositionalIndices,
    /// The three canonical tab names
    ExactNames,
    /// Synonyms and variants of the tab names
    NameSearch,
    /// Ids derived from hashes of common tab names
    HashedGuesses,
    /// Ids near the URL's id, small ranges and known large ids
    NumericSweep,
    /// Large sequential ranges, last resort
    ExhaustiveSweep,
}

impl StrategyKind {
    pub const ORDER: [StrategyKind; 8] = [
        StrategyKind::SingleWorksheet,
        StrategyKind::ExplicitHandles,
        StrategyKind::PositionalIndices,
        StrategyKind::ExactNames,
        StrategyKind::NameSearch,
        StrategyKind::HashedGuesses,
        StrategyKind::NumericSweep,
        StrategyKind::ExhaustiveSweep,
    ];

    /// Number of discovered roles that ends discovery after this strategy.
    pub fn exit_threshold(self) -> usize {
        match self {
            StrategyKind::NumericSweep | StrategyKind::ExhaustiveSweep => 1,
            _ => 2,
        }
    }
}

/// Tab positions and the role usually found there.
pub const POSITIONAL_ROLES: [(u32, WorksheetRole); 3] = [
    (0, WorksheetRole::CriticalFeedback),
    (1, WorksheetRole::ServiceFeedback),
    (4, WorksheetRole::ProductFeedback),
];

/// Canonical tab names and their roles.
pub const EXACT_NAMES: [(&str, WorksheetRole); 3] = [
    ("NPS D+1", WorksheetRole::ServiceFeedback),
    ("NPS D+30", WorksheetRole::ProductFeedback),
    ("NPS Ruim", WorksheetRole::CriticalFeedback),
];

/// The exact name whose role is imposed regardless of classification.
pub const FORCED_NAME: &str = "NPS Ruim";

const PRODUCT_NAMES: &[&str] = &[
    "NPS D+30", "NPS D30", "nps d+30", "nps d30", "D+30", "D30", "d+30", "d30", "NPS D +30", "Produto", "PRODUTO",
    "produto", "Satisfação Produto", "Avaliação Produto", "Pós-venda", "WhatsApp", "Zap", "WPP", "Contato WhatsApp",
    "Óculos D+30", "Trinta dias", "30 dias", "Pos venda", "Qualidade",
];

const SERVICE_NAMES: &[&str] = &[
    "NPS D+1", "NPS D1", "nps d+1", "nps d1", "D+1", "D1", "d+1", "d1", "NPS D +1", "Atendimento", "ATENDIMENTO",
    "atendimento", "Telefone", "Contato Telefone", "Servico", "Serviço", "Um dia", "1 dia",
];

const CRITICAL_NAMES: &[&str] = &[
    "NPS Ruim", "NPS RUIM", "nps ruim", "Ruim", "RUIM", "ruim", "Crítico", "CRITICO", "critico", "Casos Críticos",
    "Problemas", "Reclamações", "Detratores", "Insatisfeitos", "Follow Up", "Follow-up", "Pendentes", "Resolução",
];

/// Tab-name candidates per role, in search order.
pub fn name_candidates() -> [(WorksheetRole, &'static [&'static str]); 3] {
    [
        (WorksheetRole::ProductFeedback, PRODUCT_NAMES),
        (WorksheetRole::ServiceFeedback, SERVICE_NAMES),
        (WorksheetRole::CriticalFeedback, CRITICAL_NAMES),
    ]
}

/// Tab names whose hashes seed id guesses.
const COMMON_NAMES: &[&str] = &[
    "d+1",
    "d+30",
    "ruim",
    "nps d+1",
    "nps d+30",
    "nps ruim",
    "atendimento",
    "produto",
    "crítico",
    "casos críticos",
    "nps d30",
    "nps d1",
    "d30",
    "d1",
    "pos venda",
    "pos-venda",
    "satisfacao produto",
    "avaliacao produto",
    "qualidade",
    "oculos",
    "óculos",
    "whatsapp",
    "telefone",
    "contato",
    "follow up",
    "feedback",
];

const MAX_GUESSED_ID: u64 = 2_000_000_000;

/// Deterministic id guesses: for each common name, `h`, `h+1`, `h+10` and
/// `h+100` where `h` is its SHA-256 reduced below one million. Deduplicated in
/// order and capped at `limit`.
pub fn hashed_guesses(limit: usize) -> Vec<WorksheetHandle> {
    let ids = COMMON_NAMES.iter().flat_map(|name| {
        let base = name_hash(name) % 1_000_000;
        [base, base + 1, base + 10, base + 100]
    });
    unique(ids.filter(|id| *id <= MAX_GUESSED_ID).map(WorksheetHandle::from))
        .into_iter()
        .take(limit)
        .collect()
}

fn name_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

const KNOWN_LARGE_IDS: [u64; 8] = [
    1410159651, 476804694, 1234567890, 987654321, 1000000000, 1200000000, 1300000000, 1400000000,
];

/// Ids around the URL's id, small sequential ranges, legacy ids and known large ids.
pub fn numeric_sweep(url_gid: Option<u64>) -> Vec<WorksheetHandle> {
    let mut ids: Vec<u64> = Vec::new();
    if let Some(gid) = url_gid {
        for offset in 1..=10 {
            ids.extend(gid.checked_sub(offset));
            ids.extend(gid.checked_add(offset));
        }
        ids.push(gid / 2);
        ids.extend(gid.checked_mul(2));
        for offset in [100, 1000] {
            ids.extend(gid.checked_add(offset));
            ids.extend(gid.checked_sub(offset));
        }
    }
    ids.extend(0..30);
    ids.extend(100..120);

    let mut handles: Vec<WorksheetHandle> = ids.into_iter().map(WorksheetHandle::from).collect();
    handles.extend(legacy_ids(6..=10));
    handles.extend(KNOWN_LARGE_IDS.into_iter().map(WorksheetHandle::from));
    unique(handles)
}

/// Large sequential ranges followed by legacy ids.
pub fn exhaustive_sweep() -> Vec<WorksheetHandle> {
    let ranges: [std::ops::Range<u64>; 4] = [0..100, 1000..1100, 10000..10050, 100000..100050];
    let mut handles: Vec<WorksheetHandle> = ranges.into_iter().flatten().map(WorksheetHandle::from).collect();
    handles.extend(legacy_ids(6..=29));
    handles
}

fn legacy_ids(range: std::ops::RangeInclusive<u32>) -> impl Iterator<Item = WorksheetHandle> {
    range.map(|n| WorksheetHandle::Id(format!("od{}", n)))
}

/// Removes repeated handles, keeping the first occurrence.
fn unique(handles: impl IntoIterator<Item = WorksheetHandle>) -> Vec<WorksheetHandle> {
    let mut seen = HashSet::new();
    handles.into_iter().filter(|handle| seen.insert(handle.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_guesses_are_deterministic_and_capped() {
        let first = hashed_guesses(100);
        assert_eq!(first, hashed_guesses(100));
        assert!(first.len() <= 100);
        assert_eq!(first.len(), unique(first.clone()).len());
        assert_eq!(hashed_guesses(7).len(), 7);
        assert_eq!(hashed_guesses(7), first[..7].to_vec());
    }

    #[test]
    fn test_hashed_guess_pattern() {
        let guesses = hashed_guesses(4);
        let base = name_hash("d+1") % 1_000_000;
        let expected: Vec<WorksheetHandle> =
            [base, base + 1, base + 10, base + 100].into_iter().map(WorksheetHandle::from).collect();
        assert_eq!(guesses, expected);
    }

    #[test]
    fn test_numeric_sweep_without_url_gid() {
        let handles = numeric_sweep(None);
        assert_eq!(handles.len(), 30 + 20 + 5 + 8);
        assert_eq!(handles[0], WorksheetHandle::from(0u64));
        assert!(handles.contains(&WorksheetHandle::Id("od10".to_owned())));
        assert!(handles.contains(&WorksheetHandle::from(1410159651u64)));
    }

    #[test]
    fn test_numeric_sweep_around_url_gid() {
        let handles = numeric_sweep(Some(5000));
        assert_eq!(handles[0], WorksheetHandle::from(4999u64));
        assert_eq!(handles[1], WorksheetHandle::from(5001u64));
        for id in [2500u64, 10000, 5100, 4900, 6000, 4000, 4990, 5010] {
            assert!(handles.contains(&WorksheetHandle::from(id)), "{id}");
        }
        assert!(!handles.contains(&WorksheetHandle::from(5000u64)));
    }

    #[test]
    fn test_numeric_sweep_small_url_gid_never_underflows() {
        let handles = numeric_sweep(Some(3));
        assert_eq!(handles.len(), unique(handles.clone()).len());
        assert!(handles.contains(&WorksheetHandle::from(1003u64)));
        assert!(handles.contains(&WorksheetHandle::from(13u64)));
    }

    #[test]
    fn test_exhaustive_sweep_size() {
        let handles = exhaustive_sweep();
        assert_eq!(handles.len(), 100 + 100 + 50 + 50 + 24);
        assert_eq!(handles.last(), Some(&WorksheetHandle::Id("od29".to_owned())));
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(StrategyKind::ExplicitHandles.exit_threshold(), 2);
        assert_eq!(StrategyKind::NumericSweep.exit_threshold(), 1);
        assert_eq!(StrategyKind::ORDER[0], StrategyKind::SingleWorksheet);
    }
}
