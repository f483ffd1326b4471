use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use genai::chat::{ChatMessage, ChatRole};
use handlebars::Handlebars;
use validator::Validate;

use crate::validate::validate_file_not_exists;

pub const DEFAULT_SYSTEM_TEMPLATE: &str = include_str!("../assets/system.hbs");
pub const DEFAULT_USER_TEMPLATE: &str = include_str!("../assets/user.hbs");
pub const QUESTIONS_SYSTEM_TEMPLATE: &str = include_str!("../assets/questions_system.hbs");
pub const QUESTIONS_USER_TEMPLATE: &str = include_str!("../assets/questions_user.hbs");

/// Options to create chat messages
#[derive(Debug, Clone, Args, Validate)]
pub struct ChatMessageOptions {
    #[arg(
        long = "system-template",
        value_name = "PATH",
        help = "Path to the system message template file (defaults to built-in template)"
    )]
    #[validate(custom(function = "validate_file_not_exists"))]
    pub system_template: Option<PathBuf>,

    #[arg(
        long = "user-template",
        value_name = "PATH",
        help = "Path to the user message template file (defaults to built-in template)"
    )]
    #[validate(custom(function = "validate_file_not_exists"))]
    pub user_template: Option<PathBuf>,
}

/// Guideline text injected into the system prompt, tiered by grade level
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GradeGuidelines {
    pub difficulty: &'static str,
    pub notes: &'static str,
}

/// Pick guideline tiers for a grade. Unparseable grades land in the most
/// advanced tier.
pub fn guidelines_for_grade(grade: &str) -> GradeGuidelines {
    let grade_num = grade.trim().parse::<u32>().unwrap_or(u32::MAX);
    if grade_num <= 5 {
        GradeGuidelines {
            difficulty: "Use very simple words and 1-line explanations. \
                         Create mostly direct fact questions.",
            notes: "Write notes like you're explaining to a curious child. \
                    Use simple words, short sentences, and fun examples. \
                    Break down every concept into tiny, easy-to-understand pieces.",
        }
    } else if grade_num <= 8 {
        GradeGuidelines {
            difficulty: "Use simple but detailed language with 1-2 line explanations. \
                         Include a mix of fact and 'why' questions.",
            notes: "Write notes that explain the 'why' behind concepts. \
                    Use relatable examples from everyday life. \
                    Include cause-and-effect relationships.",
        }
    } else if grade_num <= 10 {
        GradeGuidelines {
            difficulty: "Provide more detailed explanations with reasoning (2-3 lines). \
                         Include application questions.",
            notes: "Write comprehensive notes that connect concepts together. \
                    Include practical applications, diagrams descriptions, and \
                    real-world examples. Explain underlying principles.",
        }
    } else {
        GradeGuidelines {
            difficulty: "Provide in-depth explanations with definitions and short reasoning. \
                         Include concept-based questions.",
            notes: "Write detailed academic notes with thorough explanations of theories, \
                    mechanisms, and processes. Include derivations where applicable, \
                    exceptions, and advanced applications.",
        }
    }
}

/// Variables for the system prompt of the main pack request
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemPromptVariables {
    pub difficulty_guidelines: &'static str,
    pub notes_guidelines: &'static str,
}

impl From<GradeGuidelines> for SystemPromptVariables {
    fn from(guidelines: GradeGuidelines) -> Self {
        Self {
            difficulty_guidelines: guidelines.difficulty,
            notes_guidelines: guidelines.notes,
        }
    }
}

/// Variables for the user prompt of both pack and questions requests
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserPromptVariables {
    pub grade: String,
    pub subject: String,
    pub chapter_title: String,
    pub language: String,
    pub chapter_text: String,
}

/// Create system and user chat messages from templates and variables.
pub fn create_chat_messages(
    opts: &ChatMessageOptions,
    system_vars: &impl serde::Serialize,
    user_vars: &impl serde::Serialize,
) -> anyhow::Result<Vec<ChatMessage>> {
    opts.validate()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    let system_template = match &opts.system_template {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read system template file: {path:?}"))?,
        None => DEFAULT_SYSTEM_TEMPLATE.to_string(),
    };
    let user_template = match &opts.user_template {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read user template file: {path:?}"))?,
        None => DEFAULT_USER_TEMPLATE.to_string(),
    };

    let system_message = create_message(ChatRole::System, &system_template, system_vars)?;
    let user_message = create_message(ChatRole::User, &user_template, user_vars)?;

    Ok(vec![system_message, user_message])
}

/// Create the chat messages for the fallback important-questions request.
/// Always uses the built-in templates; the override flags only apply to the
/// main pack request.
pub fn create_questions_messages(
    user_vars: &impl serde::Serialize,
) -> anyhow::Result<Vec<ChatMessage>> {
    let system_message = create_message(
        ChatRole::System,
        QUESTIONS_SYSTEM_TEMPLATE,
        &serde_json::json!({}),
    )?;
    let user_message = create_message(ChatRole::User, QUESTIONS_USER_TEMPLATE, user_vars)?;
    Ok(vec![system_message, user_message])
}

/// Create a chat message from a template and variables.
fn create_message(
    role: ChatRole,
    template: &str,
    variables: &impl serde::Serialize,
) -> anyhow::Result<ChatMessage> {
    let mut handlebars = Handlebars::new();
    handlebars.register_template_string("template", template)?;
    let content = handlebars.render("template", variables)?;

    Ok(ChatMessage {
        role,
        content: content.into(),
        options: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod guidelines_for_grade {
        use super::*;

        #[test]
        fn lower_primary() {
            assert!(guidelines_for_grade("3").notes.contains("curious child"));
        }

        #[test]
        fn middle_school() {
            assert!(guidelines_for_grade("8").notes.contains("'why'"));
        }

        #[test]
        fn secondary() {
            assert!(guidelines_for_grade("10").difficulty.contains("application"));
        }

        #[test]
        fn senior_secondary() {
            assert!(guidelines_for_grade("12").notes.contains("academic"));
        }

        #[test]
        fn unparseable_grade_gets_advanced_tier() {
            assert!(guidelines_for_grade("college").notes.contains("academic"));
        }
    }

    mod create_chat_messages {
        use super::*;

        #[test]
        fn defaults_to_built_in_templates() {
            let system_vars: SystemPromptVariables = guidelines_for_grade("7").into();
            let user_vars = UserPromptVariables {
                grade: "7".to_string(),
                subject: "Biology".to_string(),
                chapter_title: "Photosynthesis".to_string(),
                language: "English".to_string(),
                chapter_text: "Plants make food from light.".to_string(),
            };

            let opts = ChatMessageOptions {
                system_template: None,
                user_template: None,
            };

            let messages = create_chat_messages(&opts, &system_vars, &user_vars).unwrap();
            assert_eq!(messages.len(), 2);
            assert!(matches!(messages[0].role, ChatRole::System));
            assert!(matches!(messages[1].role, ChatRole::User));
            assert!(
                messages[1]
                    .content
                    .first_text()
                    .is_some_and(|text| text.contains("Photosynthesis"))
            );
        }
    }

    mod create_questions_messages {
        use super::*;

        #[test]
        fn renders_chapter_fields() {
            let user_vars = UserPromptVariables {
                grade: "9".to_string(),
                subject: "History".to_string(),
                chapter_title: "The Industrial Revolution".to_string(),
                language: "English".to_string(),
                chapter_text: "Steam engines changed everything.".to_string(),
            };

            let messages = create_questions_messages(&user_vars).unwrap();
            assert_eq!(messages.len(), 2);
            assert!(
                messages[1]
                    .content
                    .first_text()
                    .is_some_and(|text| text.contains("Industrial Revolution"))
            );
        }
    }

    mod create_message {
        use super::*;

        #[test]
        fn test_create_message() {
            #[derive(serde::Serialize)]
            struct Vars {
                name: String,
            }

            let vars = Vars {
                name: "Alice".to_string(),
            };

            let message = create_message(ChatRole::User, "Hello, {{name}}!", &vars).unwrap();

            assert!(matches!(message.role, ChatRole::User));
            assert_eq!(message.content.first_text(), Some("Hello, Alice!"));
        }
    }
}
