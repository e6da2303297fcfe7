//! Canonical correction feedback.
//!
//! [`Feedback`] is the only shape ever attached to a submission. It is
//! serialized with the grader's Portuguese keys so a stored feedback, fed
//! back through the normalizer, comes out unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Comment used whenever no source text yields one.
pub const FEEDBACK_PLACEHOLDER: &str = "Feedback não disponível";

/// Highest competency index.
pub const COMPETENCY_COUNT: u8 = 5;

/// Fixed titles for competencies 1..=5.
const COMPETENCY_TITLES: [&str; COMPETENCY_COUNT as usize] = [
    "Domínio da norma culta",
    "Compreensão do tema",
    "Argumentação e dados",
    "Coesão textual",
    "Proposta de intervenção",
];

/// Look up the fixed title for a competency index (1-based).
pub fn competency_title(index: u8) -> Option<&'static str> {
    if is_competency_index(index) {
        Some(COMPETENCY_TITLES[usize::from(index - 1)])
    } else {
        None
    }
}

/// Whether `index` names one of the five competencies.
pub fn is_competency_index(index: u8) -> bool {
    (1..=COMPETENCY_COUNT).contains(&index)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Score and comment for one evaluation criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    #[serde(alias = "titulo", default)]
    pub title: String,
    #[serde(alias = "nota", alias = "pontuacao")]
    pub score: u32,
    #[serde(alias = "comentario", default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// A fully-populated correction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "nota_final")]
    pub final_score: u32,
    #[serde(rename = "comentario_geral")]
    pub overall_comment: String,
    #[serde(rename = "feedback_geral")]
    pub general_feedback: String,
    #[serde(rename = "competencias")]
    pub competencies: BTreeMap<u8, Competency>,
}

impl Feedback {
    /// The "no feedback available" result: score 0, no competencies.
    pub fn placeholder() -> Self {
        Self {
            final_score: 0,
            overall_comment: FEEDBACK_PLACEHOLDER.to_string(),
            general_feedback: FEEDBACK_PLACEHOLDER.to_string(),
            competencies: BTreeMap::new(),
        }
    }

    /// Whether this is exactly the placeholder produced for unusable replies.
    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }
}
