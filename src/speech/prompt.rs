// Prompt construction for the speech model
use super::style::StyleParameters;

/// Wrap the user's text with the style instructions the model follows
pub fn build_prompt(text: &str, style: &StyleParameters) -> String {
    let mut instructions = format!(
        "Style: {}. Age: {}. Gender: {}. ",
        style.mood, style.age, style.gender
    );
    if let Some(preset) = style.preset() {
        instructions.push_str(&format!("Character Profile: {} ", preset.instruction));
    }

    format!(
        "Speak the following text exactly as written: \"{}\". Instructions: {}",
        text, instructions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::style::{Age, Gender, Mood, PresetId};

    #[test]
    fn test_prompt_without_preset() {
        let style = StyleParameters {
            mood: Mood::Happy,
            gender: Gender::Female,
            age: Age::Young,
            preset: None,
        };
        assert_eq!(
            build_prompt("Hello there", &style),
            "Speak the following text exactly as written: \"Hello there\". Instructions: Style: Happy. Age: Young. Gender: Female. "
        );
    }

    #[test]
    fn test_prompt_with_preset() {
        let mut style = StyleParameters::default();
        style.select_preset(Some(PresetId::TomHanks));
        let prompt = build_prompt("Hi", &style);

        assert!(prompt.starts_with(
            "Speak the following text exactly as written: \"Hi\". Instructions: Style: Neutral. Age: Adult. Gender: Male. Character Profile: Speak with a friendly"
        ));
        assert!(prompt.ends_with("trustworthy neighbor. "));
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let text = "She said \"wait\"\nthen left.";
        let prompt = build_prompt(text, &StyleParameters::default());
        assert!(prompt.contains(text));
    }
}
