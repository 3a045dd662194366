//! Text canonicalization for column labels and free-text cells.
//! Repairs known mis-encoded accents, strips diacritics and folds case.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Known corrupted sequences (already lowercased) and their plain replacements.
/// Whole-word repairs come first so they win over the single-character ones.
const REPAIRS: &[(&str, &str)] = &[
    ("avaliaãão", "avaliacao"),
    ("avaliaa§a£o", "avaliacao"),
    ("comentãrio", "comentario"),
    ("comenta¡rio", "comentario"),
    ("situaãão", "situacao"),
    ("resoluãão", "resolucao"),
    ("telefonãª", "telefone"),
    ("whatsapãª", "whatsapp"),
    // UTF-8 accents read back as Latin-1 / Windows-1252
    ("ã§", "c"),
    ("ã‡", "c"),
    ("ã£", "a"),
    ("ã¡", "a"),
    ("ã¢", "a"),
    ("ã\u{a0}", "a"),
    ("ã©", "e"),
    ("ãª", "e"),
    ("ã\u{ad}", "i"),
    ("ã³", "o"),
    ("ã´", "o"),
    ("ãµ", "o"),
    ("ãº", "u"),
    ("§", "c"),
    ("£", "a"),
    ("¡", "a"),
];

/// Lowercases, repairs mis-encoded sequences and strips diacritics.
/// Punctuation and whitespace are preserved.
pub fn fold(text: &str) -> String {
    let mut folded = text.to_lowercase();
    for (corrupted, replacement) in REPAIRS {
        if folded.contains(corrupted) {
            folded = folded.replace(corrupted, replacement);
        }
    }
    folded.nfd().filter(|character| !is_combining_mark(*character)).collect()
}

/// Canonical column label: folded, with every run of characters other than
/// ASCII letters and digits collapsed to a single underscore and no leading
/// or trailing underscore. Idempotent.
pub fn normalize(label: &str) -> String {
    let folded = fold(label);
    let mut normalized = String::with_capacity(folded.len());
    let mut pending_separator = false;
    for character in folded.chars() {
        if character.is_ascii_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.push(character);
        } else {
            pending_separator = true;
        }
    }
    normalized
}

/// Strips everything but ASCII letters and digits from folded text,
/// so `NPS D+30` and `nps-d30` compare equal.
pub fn compact(text: &str) -> String {
    fold(text).chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_labels() {
        assert_eq!(normalize("Avaliação"), "avaliacao");
        assert_eq!(normalize("Comentário da Resolução"), "comentario_da_resolucao");
        assert_eq!(normalize("  Id Bot "), "id_bot");
        assert_eq!(normalize("NPS D+30"), "nps_d_30");
        assert_eq!(normalize("Data/Hora -- (envio)"), "data_hora_envio");
    }

    #[test]
    fn test_normalize_repairs_mis_encoded_labels() {
        assert_eq!(normalize("AvaliaÃ§Ã£o"), "avaliacao");
        assert_eq!(normalize("ComentÃ¡rio"), "comentario");
        assert_eq!(normalize("SituaÃ§Ã£o"), "situacao");
        assert_eq!(normalize("TelefonÃª"), "telefone");
        assert_eq!(normalize("avaliaa§a£o"), "avaliacao");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let labels = [
            "Avaliação",
            "AvaliaÃ§Ã£o",
            "__Nota  Final__",
            "WhatsApp (contato)",
            "Resolução: data",
            "Ünïcödé ß label",
            "",
            "___",
            "a__b",
        ];
        for label in labels {
            let once = normalize(label);
            assert_eq!(normalize(&once), once, "label {label:?}");
        }
    }

    #[test]
    fn test_normalize_empty_and_symbol_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("--- ///"), "");
    }

    #[test]
    fn test_fold_keeps_punctuation() {
        assert_eq!(fold("Óculos D+30, Pós-venda"), "oculos d+30, pos-venda");
        assert_eq!(fold("PENDENTE"), "pendente");
    }

    #[test]
    fn test_compact_removes_separators() {
        assert_eq!(compact("NPS D+30"), "npsd30");
        assert_eq!(compact("nps-d30"), "npsd30");
        assert_eq!(compact("Ruim!"), "ruim");
    }
}
