//! Grading reply normalization.
//!
//! The external grader answers either with JSON or with a free-form report.
//! [`normalize`] accepts both and always returns a fully-populated
//! [`Feedback`]:
//!
//! 1. blank input yields [`Feedback::placeholder`];
//! 2. a JSON object is read field by field (`nota_final`,
//!    `comentario_geral` / `feedback_geral`, `competencias`);
//! 3. the [`NARRATIVE_RULES`] run over any narrative text to fill what the
//!    structured path left empty;
//! 4. a still-empty comment is replaced by the placeholder text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::feedback::{
    competency_title, is_competency_index, Competency, Feedback, COMPETENCY_COUNT,
    FEEDBACK_PLACEHOLDER,
};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// "Nota Final", optional emphasis and separator, then 1-4 digits.
static FINAL_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)nota\s+final[\s*_]*[:\-–]?[\s*_]*(\d{1,4})").expect("valid regex")
});

/// "Comentários Finais" heading, accents optional.
static CLOSING_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)coment[aá]rios?\s+finais").expect("valid regex")
});

/// "Critério <n>" block header.
static CRITERION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)crit[eé]rio\s*(\d+)").expect("valid regex"));

/// "Pontuação" label followed by the competency score.
static COMPETENCY_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)pontua[cç][aã]o[\s*_]*[:\-–]?[\s*_]*(\d{1,3})").expect("valid regex")
});

/// "Pontos a Melhorar" label; the improvement text follows it.
static IMPROVEMENT_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)pontos\s+a\s+melhorar[\s*_]*[:\-–]?[\s*_]*").expect("valid regex")
});

/// Delimiter closing an improvement paragraph.
const SECTION_DELIMITER: &str = "---";

/// Markdown and separator characters trimmed around extracted prose.
const PROSE_TRIM: &[char] = &[':', '-', '–', '*', '#', '_', ' ', '\t', '\r', '\n'];

/// JSON fields that may carry the narrative report, in priority order.
const NARRATIVE_FIELDS: &[&str] = &["resposta", "explicacao", "text"];

// ---------------------------------------------------------------------------
// Reply classification
// ---------------------------------------------------------------------------

/// A grading reply, classified once by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    PlainText(String),
}

impl ReplyBody {
    /// Classify raw body text: valid JSON or plain text.
    pub fn parse(body_text: &str) -> Self {
        match serde_json::from_str::<Value>(body_text.trim()) {
            Ok(value) => ReplyBody::Json(value),
            Err(_) => ReplyBody::PlainText(body_text.to_string()),
        }
    }

    /// Classify an already-decoded value. Strings are re-classified, since
    /// callers often forward the grader's body as a JSON string.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::parse(&text),
            other => ReplyBody::Json(other),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            ReplyBody::PlainText(text) => text.trim().is_empty(),
            ReplyBody::Json(Value::Null) => true,
            ReplyBody::Json(Value::String(text)) => text.trim().is_empty(),
            ReplyBody::Json(_) => false,
        }
    }

    /// The text the narrative rules should scan, if any.
    fn narrative(&self) -> Option<&str> {
        match self {
            ReplyBody::PlainText(text) => Some(text),
            ReplyBody::Json(Value::String(text)) => Some(text),
            ReplyBody::Json(value) => {
                let record = primary_record(value).as_object()?;
                NARRATIVE_FIELDS.iter().find_map(|field| {
                    record
                        .get(*field)
                        .and_then(Value::as_str)
                        .filter(|text| !text.trim().is_empty())
                })
            }
        }
    }
}

/// Webhooks often wrap a single result in an array; read its first element.
fn primary_record(value: &Value) -> &Value {
    match value {
        Value::Array(items) => items.first().unwrap_or(value),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Normalize raw reply text into canonical feedback. Never fails.
pub fn normalize(body_text: &str) -> Feedback {
    if body_text.trim().is_empty() {
        return Feedback::placeholder();
    }
    normalize_reply(&ReplyBody::parse(body_text))
}

/// Normalize an already-classified reply. Never fails.
pub fn normalize_reply(reply: &ReplyBody) -> Feedback {
    if reply.is_blank() {
        return Feedback::placeholder();
    }

    let mut feedback = Feedback {
        final_score: 0,
        overall_comment: String::new(),
        general_feedback: String::new(),
        competencies: BTreeMap::new(),
    };

    if let ReplyBody::Json(value) = reply {
        if let Some(record) = primary_record(value).as_object() {
            apply_structured(record, &mut feedback);
        }
    }

    if let Some(text) = reply.narrative() {
        for rule in NARRATIVE_RULES {
            rule.apply(text, &mut feedback);
        }
    }

    coalesce(&mut feedback);
    feedback
}

// ---------------------------------------------------------------------------
// Structured path
// ---------------------------------------------------------------------------

fn apply_structured(record: &Map<String, Value>, feedback: &mut Feedback) {
    feedback.final_score = record.get("nota_final").and_then(read_score).unwrap_or(0);

    let comment = non_empty_text(record.get("comentario_geral"));
    let general = non_empty_text(record.get("feedback_geral"));
    feedback.overall_comment = comment.clone().or_else(|| general.clone()).unwrap_or_default();
    feedback.general_feedback = general.or(comment).unwrap_or_default();

    if let Some(entries) = record.get("competencias").and_then(Value::as_object) {
        for (key, entry) in entries {
            let Ok(index) = key.trim().parse::<u8>() else {
                continue;
            };
            if !is_competency_index(index) {
                continue;
            }
            if let Some(competency) = read_competency(index, entry) {
                feedback.competencies.insert(index, competency);
            }
        }
    }
}

/// Read one `competencias` entry. Entries without a readable score are skipped.
fn read_competency(index: u8, entry: &Value) -> Option<Competency> {
    let fields = entry.as_object()?;
    let score = ["score", "nota", "pontuacao"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(read_score))?;
    let title = ["title", "titulo"]
        .iter()
        .find_map(|key| non_empty_text(fields.get(*key)))
        .or_else(|| competency_title(index).map(str::to_string))
        .unwrap_or_default();
    let feedback = ["feedback", "comentario", "pontos_a_melhorar"]
        .iter()
        .find_map(|key| non_empty_text(fields.get(*key)));

    Some(Competency {
        title,
        score,
        feedback,
    })
}

/// Read a score from a number or numeric string. Negatives clamp to 0,
/// fractions round to the nearest integer.
fn read_score(value: &Value) -> Option<u32> {
    let raw = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() || raw <= 0.0 {
        return Some(0);
    }
    Some(raw.round().min(f64::from(u32::MAX)) as u32)
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

// ---------------------------------------------------------------------------
// Narrative rules
// ---------------------------------------------------------------------------

/// One text-mining rule. Each rule only fills fields that are still empty,
/// so applying the list twice gives the same result as applying it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeRule {
    /// "Nota Final: N" into `final_score` when it is still 0.
    FinalScore,
    /// Text after "Comentários Finais" into both comment fields.
    ClosingComment,
    /// "Critério i" blocks into missing competencies.
    Competencies,
}

/// Rules in application order.
pub const NARRATIVE_RULES: [NarrativeRule; 3] = [
    NarrativeRule::FinalScore,
    NarrativeRule::ClosingComment,
    NarrativeRule::Competencies,
];

impl NarrativeRule {
    pub fn apply(self, text: &str, feedback: &mut Feedback) {
        match self {
            NarrativeRule::FinalScore => {
                if feedback.final_score == 0 {
                    if let Some(score) = extract_final_score(text) {
                        feedback.final_score = score;
                    }
                }
            }
            NarrativeRule::ClosingComment => {
                if feedback.overall_comment.is_empty() {
                    if let Some(comment) = extract_closing_comment(text) {
                        feedback.general_feedback = comment.clone();
                        feedback.overall_comment = comment;
                    }
                }
            }
            NarrativeRule::Competencies => {
                for index in 1..=COMPETENCY_COUNT {
                    if feedback.competencies.contains_key(&index) {
                        continue;
                    }
                    if let Some(competency) = extract_competency(text, index) {
                        feedback.competencies.insert(index, competency);
                    }
                }
            }
        }
    }
}

/// First "Nota Final" score in the text.
pub fn extract_final_score(text: &str) -> Option<u32> {
    let captures = FINAL_SCORE_RE.captures(text)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Everything after the "Comentários Finais" heading, heading excluded.
pub fn extract_closing_comment(text: &str) -> Option<String> {
    let heading = CLOSING_HEADING_RE.find(text)?;
    let comment = text[heading.end()..].trim_matches(PROSE_TRIM);
    (!comment.is_empty()).then(|| comment.to_string())
}

/// Score and improvement text from the "Critério `index`" block.
///
/// Returns `None` when the block or its "Pontuação" label is missing; the
/// improvement text is optional.
pub fn extract_competency(text: &str, index: u8) -> Option<Competency> {
    let title = competency_title(index)?;
    let block = criterion_block(text, index)?;

    let score: u32 = COMPETENCY_SCORE_RE
        .captures(block)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;

    let feedback = IMPROVEMENT_LABEL_RE.find(block).and_then(|label| {
        let rest = &block[label.end()..];
        let end = rest.find(SECTION_DELIMITER).unwrap_or(rest.len());
        let improvement = rest[..end].trim_matches(PROSE_TRIM);
        (!improvement.is_empty()).then(|| improvement.to_string())
    });

    Some(Competency {
        title: title.to_string(),
        score,
        feedback,
    })
}

/// Text between the first "Critério `index`" header and whichever comes
/// next: another criterion header, the final score line or the closing
/// comments heading.
fn criterion_block(text: &str, index: u8) -> Option<&str> {
    let mut headers = CRITERION_RE.captures_iter(text).filter_map(|captures| {
        let whole = captures.get(0)?;
        let number = captures.get(1)?.as_str().parse::<u32>().ok();
        Some((whole.start(), whole.end(), number))
    });

    let start = headers
        .by_ref()
        .find(|(_, _, number)| *number == Some(u32::from(index)))
        .map(|(_, end, _)| end)?;
    let next_header = headers.next().map(|(begin, _, _)| begin);
    let final_score = FINAL_SCORE_RE.find_at(text, start).map(|m| m.start());
    let closing = CLOSING_HEADING_RE
        .find_at(text, start)
        .map(|heading| heading.start());

    let end = [next_header, final_score, closing]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
    Some(&text[start..end])
}

// ---------------------------------------------------------------------------
// Coalescing
// ---------------------------------------------------------------------------

fn coalesce(feedback: &mut Feedback) {
    if feedback.overall_comment.trim().is_empty() {
        feedback.overall_comment = if feedback.general_feedback.trim().is_empty() {
            FEEDBACK_PLACEHOLDER.to_string()
        } else {
            feedback.general_feedback.clone()
        };
    }
    if feedback.general_feedback.trim().is_empty() {
        feedback.general_feedback = feedback.overall_comment.clone();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
## Correção da Redação

### Critério 1 - Norma culta
**Pontuação:** 160
**Pontos a Melhorar:** Revise a concordância verbal.
---
### Critério 2 - Tema
**Pontuação:** 200
---
### Critério 3 - Argumentação
Pontuação: 120
Pontos a Melhorar: Traga dados de fontes confiáveis.
---
### Critério 5 - Proposta
Pontuação - 80
Pontos a Melhorar: Detalhe o agente e o meio de execução.

**Nota Final:** 560

## Comentários Finais
Bom texto, mas a proposta precisa de detalhamento.";

    #[test]
    fn structured_reply_yields_score_and_comment() {
        let feedback =
            normalize(r#"{"nota_final": 780, "comentario_geral": "Bom texto", "competencias": {}}"#);
        assert_eq!(feedback.final_score, 780);
        assert_eq!(feedback.overall_comment, "Bom texto");
        assert_eq!(feedback.general_feedback, "Bom texto");
        assert!(feedback.competencies.is_empty());
    }

    #[test]
    fn plain_text_score_is_extracted() {
        let feedback = normalize("A redação obteve Nota Final: 640 nesta avaliação.");
        assert_eq!(feedback.final_score, 640);
        assert_eq!(feedback.overall_comment, FEEDBACK_PLACEHOLDER);
    }

    #[test]
    fn competency_block_is_extracted_with_title() {
        let feedback = normalize(
            "Critério 3 ... Pontuação: 160 ... Pontos a Melhorar: Melhore conectivos --- ",
        );
        assert_eq!(
            feedback.competencies.get(&3),
            Some(&Competency {
                title: "Argumentação e dados".into(),
                score: 160,
                feedback: Some("Melhore conectivos".into()),
            })
        );
        assert_eq!(feedback.competencies.len(), 1);
    }

    #[test]
    fn blank_input_yields_placeholder() {
        for input in ["", "   ", "\n\t  \r\n"] {
            let feedback = normalize(input);
            assert_eq!(feedback.final_score, 0);
            assert_eq!(feedback.overall_comment, FEEDBACK_PLACEHOLDER);
            assert!(feedback.competencies.is_empty());
        }
    }

    #[test]
    fn garbage_input_always_has_a_comment() {
        let inputs = [
            "null",
            "[]",
            "{}",
            "42",
            "\"\"",
            "{\"nota_final\": \"abc\"}",
            "{{{{ not json",
            "Critério Critério Pontuação: Pontos a Melhorar:",
            "Comentários Finais",
            "Comentários Finais ---   ",
            "\u{0}\u{1}\u{fffd}",
        ];
        for input in inputs {
            let feedback = normalize(input);
            assert!(
                !feedback.overall_comment.trim().is_empty(),
                "empty comment for input {input:?}"
            );
            assert_eq!(feedback.general_feedback, feedback.overall_comment);
        }
    }

    #[test]
    fn full_report_is_mined() {
        let feedback = normalize(REPORT);

        assert_eq!(feedback.final_score, 560);
        assert_eq!(
            feedback.overall_comment,
            "Bom texto, mas a proposta precisa de detalhamento."
        );
        assert_eq!(feedback.general_feedback, feedback.overall_comment);

        let indices: Vec<u8> = feedback.competencies.keys().copied().collect();
        assert_eq!(indices, vec![1, 2, 3, 5]);

        let first = &feedback.competencies[&1];
        assert_eq!(first.title, "Domínio da norma culta");
        assert_eq!(first.score, 160);
        assert_eq!(first.feedback.as_deref(), Some("Revise a concordância verbal."));

        let second = &feedback.competencies[&2];
        assert_eq!(second.score, 200);
        assert_eq!(second.feedback, None);

        let fifth = &feedback.competencies[&5];
        assert_eq!(fifth.score, 80);
        assert_eq!(
            fifth.feedback.as_deref(),
            Some("Detalhe o agente e o meio de execução.")
        );
    }

    #[test]
    fn closing_heading_matches_without_accent() {
        assert_eq!(
            extract_closing_comment("COMENTARIOS FINAIS: Excelente trabalho."),
            Some("Excelente trabalho.".into())
        );
        assert_eq!(extract_closing_comment("Comentários finais:   "), None);
        assert_eq!(extract_closing_comment("Sem cabeçalho"), None);
    }

    #[test]
    fn final_score_accepts_separators() {
        assert_eq!(extract_final_score("nota final 900"), Some(900));
        assert_eq!(extract_final_score("Nota Final - 720"), Some(720));
        assert_eq!(extract_final_score("Nota Final – 680"), Some(680));
        assert_eq!(extract_final_score("**NOTA FINAL**: 1000"), Some(1000));
        assert_eq!(extract_final_score("Nota parcial: 300"), None);
    }

    #[test]
    fn first_final_score_match_wins() {
        assert_eq!(
            extract_final_score("Nota Final: 400 ... revisão: Nota Final: 800"),
            Some(400)
        );
    }

    #[test]
    fn competency_without_score_label_is_absent() {
        let text = "Critério 4\nPontos a Melhorar: Use mais conectivos.\n---";
        assert_eq!(extract_competency(text, 4), None);
        assert!(normalize(text).competencies.is_empty());
    }

    #[test]
    fn competency_header_does_not_match_other_indices() {
        let text = "Critério 12\nPontuação: 100";
        assert_eq!(extract_competency(text, 1), None);
        assert_eq!(extract_competency(text, 2), None);
    }

    #[test]
    fn structured_score_takes_precedence_when_non_zero() {
        let feedback = normalize(r#"{"nota_final": 880, "resposta": "Nota Final: 320"}"#);
        assert_eq!(feedback.final_score, 880);
    }

    #[test]
    fn narrative_score_replaces_zero_structured_score() {
        let feedback = normalize(r#"{"nota_final": 0, "explicacao": "Nota Final: 320"}"#);
        assert_eq!(feedback.final_score, 320);
    }

    #[test]
    fn narrative_fields_are_read_in_priority_order() {
        let feedback = normalize(
            r#"{"text": "Nota Final: 100", "resposta": "Nota Final: 600\nComentários Finais: Ok"}"#,
        );
        assert_eq!(feedback.final_score, 600);
        assert_eq!(feedback.overall_comment, "Ok");
    }

    #[test]
    fn blank_narrative_field_does_not_hide_later_ones() {
        let feedback = normalize(
            r#"{"resposta": "  ", "explicacao": "Nota Final: 700\nComentários Finais: Bom"}"#,
        );
        assert_eq!(feedback.final_score, 700);
        assert_eq!(feedback.overall_comment, "Bom");
    }

    #[test]
    fn comment_fields_fill_each_other() {
        let feedback = normalize(r#"{"feedback_geral": "Texto coeso"}"#);
        assert_eq!(feedback.overall_comment, "Texto coeso");
        assert_eq!(feedback.general_feedback, "Texto coeso");

        let both = normalize(r#"{"comentario_geral": "A", "feedback_geral": "B"}"#);
        assert_eq!(both.overall_comment, "A");
        assert_eq!(both.general_feedback, "B");
    }

    #[test]
    fn structured_comment_is_not_overwritten_by_narrative() {
        let feedback = normalize(
            r#"{"comentario_geral": "Estruturado", "resposta": "Comentários Finais: Narrativo"}"#,
        );
        assert_eq!(feedback.overall_comment, "Estruturado");
    }

    #[test]
    fn structured_competencies_pass_through() {
        let feedback = normalize(
            r#"{
                "nota_final": "720",
                "competencias": {
                    "1": {"titulo": "Norma", "nota": 160, "comentario": "Bom"},
                    "2": {"score": 120.4},
                    "7": {"score": 200},
                    "x": {"score": 200},
                    "4": {"feedback": "sem nota"}
                }
            }"#,
        );
        assert_eq!(feedback.final_score, 720);
        assert_eq!(
            feedback.competencies[&1],
            Competency {
                title: "Norma".into(),
                score: 160,
                feedback: Some("Bom".into()),
            }
        );
        assert_eq!(feedback.competencies[&2].title, "Compreensão do tema");
        assert_eq!(feedback.competencies[&2].score, 120);
        let indices: Vec<u8> = feedback.competencies.keys().copied().collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn narrative_fills_only_missing_competencies() {
        let feedback = normalize(
            r#"{
                "competencias": {"1": {"score": 200}},
                "resposta": "Critério 1\nPontuação: 40\nCritério 2\nPontuação: 120"
            }"#,
        );
        assert_eq!(feedback.competencies[&1].score, 200);
        assert_eq!(feedback.competencies[&2].score, 120);
    }

    #[test]
    fn negative_and_fractional_scores_are_clamped() {
        assert_eq!(normalize(r#"{"nota_final": -40}"#).final_score, 0);
        assert_eq!(normalize(r#"{"nota_final": 599.6}"#).final_score, 600);
        assert_eq!(normalize(r#"{"nota_final": true}"#).final_score, 0);
    }

    #[test]
    fn array_reply_reads_first_element() {
        let feedback = normalize(r#"[{"nota_final": 500, "comentario_geral": "Ok"}, {"nota_final": 1}]"#);
        assert_eq!(feedback.final_score, 500);
        assert_eq!(feedback.overall_comment, "Ok");
    }

    #[test]
    fn json_string_reply_is_mined_as_narrative() {
        let feedback = normalize(r#""Nota Final: 840""#);
        assert_eq!(feedback.final_score, 840);
    }

    #[test]
    fn from_value_reclassifies_strings() {
        assert_eq!(
            ReplyBody::from_value(Value::String(r#"{"nota_final": 10}"#.into())),
            ReplyBody::Json(serde_json::json!({"nota_final": 10}))
        );
        assert_eq!(
            ReplyBody::from_value(Value::String("Nota Final: 10".into())),
            ReplyBody::PlainText("Nota Final: 10".into())
        );
        assert_eq!(
            normalize_reply(&ReplyBody::from_value(Value::Null)),
            Feedback::placeholder()
        );
    }

    #[test]
    fn stored_feedback_normalizes_to_itself() {
        let feedback = normalize(REPORT);
        let stored = serde_json::to_value(&feedback).unwrap();
        assert_eq!(normalize_reply(&ReplyBody::from_value(stored)), feedback);
    }

    #[test]
    fn rules_are_idempotent() {
        let mut once = normalize(REPORT);
        let snapshot = once.clone();
        for rule in NARRATIVE_RULES {
            rule.apply(REPORT, &mut once);
        }
        assert_eq!(once, snapshot);
    }
}
