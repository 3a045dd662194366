use crate::helpers::string::normalize;
use crate::spreadsheet::sheet::RawTable;

/// Semantic columns looked up by label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Rating,
    Comment,
    Agent,
    Store,
    SurveyType,
}

impl ColumnKind {
    /// Candidate labels, already in normalized form.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            ColumnKind::Rating => &["avaliacao", "avaliaacaao", "avaliacaao", "nota", "score", "rating", "pontuacao"],
            ColumnKind::Comment => &["comentario", "comment", "feedback", "observacao", "comentaario"],
            ColumnKind::Agent => &["vendedor", "atendente", "consultor", "funcionario", "agent"],
            ColumnKind::Store => &["loja", "store", "filial", "unidade"],
            ColumnKind::SurveyType => &["fonte", "origem", "tipo", "pesquisa"],
        }
    }

    /// Position of this column in `table`, if any.
    pub fn find(self, table: &RawTable) -> Option<usize> {
        find_column(table, self.candidates())
    }
}

/// Returns the position of the first column, in original order, whose
/// normalized label contains any normalized candidate.
pub fn find_column(table: &RawTable, candidates: &[&str]) -> Option<usize> {
    let candidates: Vec<String> = candidates
        .iter()
        .map(|candidate| normalize(candidate))
        .filter(|candidate| !candidate.is_empty())
        .collect();
    table
        .header()
        .iter()
        .map(|label| normalize(label))
        .position(|label| candidates.iter().any(|candidate| label.contains(candidate.as_str())))
}
