use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Metadata describing the chapter a pack was generated for
#[derive(Debug, Clone, Serialize)]
pub struct PackMeta {
    pub subject: String,
    pub grade: String,
    pub chapter_title: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub tl_dr: String,
    #[serde(default)]
    pub important_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyTerm {
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub example: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub a: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkedQuestion {
    pub question: String,
    pub answer: String,
}

/// Exam-style questions grouped by mark weight
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportantQuestions {
    pub one_mark: Vec<MarkedQuestion>,
    pub three_mark: Vec<MarkedQuestion>,
    pub five_mark: Vec<MarkedQuestion>,
}

impl ImportantQuestions {
    pub fn is_empty(&self) -> bool {
        self.one_mark.is_empty() && self.three_mark.is_empty() && self.five_mark.is_empty()
    }

    pub fn total(&self) -> usize {
        self.one_mark.len() + self.three_mark.len() + self.five_mark.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: String,
}

/// Pack shape as the model returns it, before metadata is attached and the
/// important questions are normalized. Every section defaults so a partial
/// answer still yields a usable pack.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedPack {
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub notes: Vec<NoteSection>,
    #[serde(default)]
    pub key_terms: Vec<KeyTerm>,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub important_questions: serde_json::Value,
    #[serde(default)]
    pub quiz: Quiz,
}

/// The full study pack written to the output path
#[derive(Debug, Clone, Serialize)]
pub struct StudyPack {
    pub meta: PackMeta,
    pub summary: Summary,
    pub notes: Vec<NoteSection>,
    pub key_terms: Vec<KeyTerm>,
    pub flashcards: Vec<Flashcard>,
    pub important_questions: ImportantQuestions,
    pub quiz: Quiz,
}

impl StudyPack {
    pub fn assemble(
        meta: PackMeta,
        generated: GeneratedPack,
        important_questions: ImportantQuestions,
    ) -> Self {
        Self {
            meta,
            summary: generated.summary,
            notes: generated.notes,
            key_terms: generated.key_terms,
            flashcards: generated.flashcards,
            important_questions,
            quiz: generated.quiz,
        }
    }
}

/// Strip the Markdown code fences models sometimes wrap JSON answers in.
pub fn strip_code_fences(content: &str) -> &str {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse the model's answer to the main pack request.
pub fn parse_generated_pack(content: &str) -> anyhow::Result<GeneratedPack> {
    serde_json::from_str(strip_code_fences(content))
        .context("failed to parse study pack JSON from LLM response")
}

/// Parse the model's answer to the fallback important-questions request.
pub fn parse_important_questions(content: &str) -> anyhow::Result<ImportantQuestions> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(content))
        .context("failed to parse important questions JSON from LLM response")?;
    Ok(normalize_important_questions(&value))
}

// Key aliases observed in model answers for each question group.
const ONE_MARK_KEYS: [&str; 4] = ["one_mark", "oneMark", "1_mark", "one_mark_questions"];
const THREE_MARK_KEYS: [&str; 4] = ["three_mark", "threeMark", "3_mark", "three_mark_questions"];
const FIVE_MARK_KEYS: [&str; 4] = ["five_mark", "fiveMark", "5_mark", "five_mark_questions"];

/// Normalize a loosely-shaped important-questions value: accept key aliases,
/// drop entries whose question or answer is missing or blank.
pub fn normalize_important_questions(value: &serde_json::Value) -> ImportantQuestions {
    let Some(obj) = value.as_object() else {
        return ImportantQuestions::default();
    };
    let pick = |keys: &[&str]| keys.iter().find_map(|key| obj.get(*key));
    ImportantQuestions {
        one_mark: normalize_list(pick(&ONE_MARK_KEYS)),
        three_mark: normalize_list(pick(&THREE_MARK_KEYS)),
        five_mark: normalize_list(pick(&FIVE_MARK_KEYS)),
    }
}

fn normalize_list(list: Option<&serde_json::Value>) -> Vec<MarkedQuestion> {
    let Some(items) = list.and_then(|value| value.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let question = item.get("question")?.as_str()?.trim();
            let answer = item.get("answer")?.as_str()?.trim();
            if question.is_empty() || answer.is_empty() {
                return None;
            }
            Some(MarkedQuestion {
                question: question.to_string(),
                answer: answer.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod strip_code_fences {
        use super::*;

        #[test]
        fn json_fence() {
            assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        }

        #[test]
        fn bare_fence() {
            assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        }

        #[test]
        fn unfenced_content_untouched() {
            assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
        }
    }

    mod parse_generated_pack {
        use super::*;

        #[test]
        fn partial_answer_gets_defaults() {
            let pack = parse_generated_pack(
                r#"{"summary": {"tl_dr": "Short version.", "important_points": ["one"]}}"#,
            )
            .unwrap();
            assert_eq!(pack.summary.tl_dr, "Short version.");
            assert!(pack.notes.is_empty());
            assert!(pack.flashcards.is_empty());
            assert!(pack.quiz.questions.is_empty());
        }

        #[test]
        fn fenced_answer() {
            let pack = parse_generated_pack(
                "```json\n{\"flashcards\": [{\"q\": \"Q?\", \"a\": \"A.\"}]}\n```",
            )
            .unwrap();
            assert_eq!(pack.flashcards.len(), 1);
        }

        #[test]
        fn non_json_answer_is_an_error() {
            assert!(parse_generated_pack("Sorry, I cannot do that.").is_err());
        }
    }

    mod normalize_important_questions {
        use super::*;

        #[test]
        fn canonical_keys() {
            let value = serde_json::json!({
                "one_mark": [{"question": "Q1?", "answer": "A1."}],
                "three_mark": [{"question": "Q3?", "answer": "A3."}],
                "five_mark": [],
            });
            let questions = normalize_important_questions(&value);
            assert_eq!(questions.one_mark.len(), 1);
            assert_eq!(questions.three_mark.len(), 1);
            assert!(questions.five_mark.is_empty());
            assert_eq!(questions.total(), 2);
        }

        #[test]
        fn camel_case_and_numeric_aliases() {
            let value = serde_json::json!({
                "oneMark": [{"question": "Q?", "answer": "A."}],
                "3_mark": [{"question": "Q?", "answer": "A."}],
                "five_mark_questions": [{"question": "Q?", "answer": "A."}],
            });
            let questions = normalize_important_questions(&value);
            assert_eq!(questions.total(), 3);
        }

        #[test]
        fn blank_entries_dropped() {
            let value = serde_json::json!({
                "one_mark": [
                    {"question": "  ", "answer": "A."},
                    {"question": "Q?"},
                    {"question": "Kept?", "answer": " Yes. "},
                ],
            });
            let questions = normalize_important_questions(&value);
            assert_eq!(questions.one_mark.len(), 1);
            assert_eq!(questions.one_mark[0].answer, "Yes.");
        }

        #[test]
        fn non_object_value_is_empty() {
            assert!(normalize_important_questions(&serde_json::json!(null)).is_empty());
            assert!(normalize_important_questions(&serde_json::json!([1, 2])).is_empty());
        }
    }
}
