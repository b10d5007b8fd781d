use crate::questions::QuestionCategory;

pub const ESSAY_MIN_CHARS: u32 = 300;
pub const ESSAY_MAX_CHARS: u32 = 500;

pub fn system_prompt(category: &QuestionCategory) -> String {
    match category {
        QuestionCategory::MultipleChoice => MULTIPLE_CHOICE_SYSTEM.to_string(),
        QuestionCategory::FillBlank => FILL_BLANK_SYSTEM.to_string(),
        QuestionCategory::Essay => ESSAY_QUESTION_SYSTEM.to_string(),
        QuestionCategory::Custom { subject, .. } => format!(
            "You are an expert at writing questions in the field of {}.",
            subject
        ),
    }
}

pub fn user_prompt(
    category: &QuestionCategory,
    source_text: &str,
    count: u32,
    language: &str,
) -> String {
    let kind = match category {
        QuestionCategory::MultipleChoice => "multiple-choice questions".to_string(),
        QuestionCategory::FillBlank => "fill-in-the-blank questions".to_string(),
        QuestionCategory::Essay => "open-ended essay questions".to_string(),
        QuestionCategory::Custom { tone, .. } => format!("{} questions", tone),
    };
    format!(
        "Based on the following text, write {} {}. The questions must be written in {}:\n\n{}",
        count, kind, language, source_text
    )
}

pub fn essay_system_prompt(language: &str) -> String {
    format!(
        "You are an excellent essay-writing assistant who writes model essays in {}.",
        language
    )
}

pub fn essay_user_prompt(topic: &str) -> String {
    format!(
        "Write an essay about \u{2018}{}\u{2019}, between {} and {} characters long.",
        topic, ESSAY_MIN_CHARS, ESSAY_MAX_CHARS
    )
}

const MULTIPLE_CHOICE_SYSTEM: &str = "You are an expert at writing multiple-choice questions. \
    Each question has four options labelled A to D and exactly one correct answer, \
    which you state after the options.";

const FILL_BLANK_SYSTEM: &str = "You are an expert at writing fill-in-the-blank questions. \
    Mark each blank with ____ and list the answers after the questions.";

const ESSAY_QUESTION_SYSTEM: &str = "You are an expert at writing open-ended essay questions \
    that test understanding rather than recall.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_embeds_text_and_count() {
        let prompt = user_prompt(&QuestionCategory::FillBlank, "Water boils at 100 C.", 7, "English");
        assert!(prompt.contains("write 7 fill-in-the-blank questions"));
        assert!(prompt.contains("written in English"));
        assert!(prompt.ends_with("Water boils at 100 C."));
    }

    #[test]
    fn test_custom_prompts_substitute_subject_and_tone() {
        let category = QuestionCategory::Custom {
            subject: "biology".to_string(),
            tone: "challenging".to_string(),
        };
        assert!(system_prompt(&category).contains("biology"));
        assert!(user_prompt(&category, "Cells divide.", 3, "Chinese")
            .contains("3 challenging questions"));
    }

    #[test]
    fn test_essay_prompt_names_topic_and_length() {
        let prompt = essay_user_prompt("my hometown");
        assert!(prompt.contains("my hometown"));
        assert!(prompt.contains("300 and 500"));
    }
}
