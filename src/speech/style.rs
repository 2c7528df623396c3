// Voice style model and the celebrity preset catalog
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Professional,
    Dramatic,
    Excited,
    Serious,
    Sad,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Neutral,
        Mood::Happy,
        Mood::Professional,
        Mood::Dramatic,
        Mood::Excited,
        Mood::Serious,
        Mood::Sad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "Neutral",
            Mood::Happy => "Happy",
            Mood::Professional => "Professional",
            Mood::Dramatic => "Dramatic",
            Mood::Excited => "Excited",
            Mood::Serious => "Serious",
            Mood::Sad => "Sad",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    /// Prebuilt voice used when no preset is selected
    pub fn default_voice(&self) -> &'static str {
        match self {
            Gender::Female => "Puck",
            Gender::Male => "Kore",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Age {
    Young,
    #[default]
    Adult,
    Senior,
}

impl Age {
    pub const ALL: [Age; 3] = [Age::Young, Age::Adult, Age::Senior];

    pub fn as_str(&self) -> &'static str {
        match self {
            Age::Young => "Young",
            Age::Adult => "Adult",
            Age::Senior => "Senior",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Mood, Gender, Age);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetId {
    MorganFreeman,
    ScarlettJohansson,
    TomHanks,
}

impl PresetId {
    pub fn preset(&self) -> &'static VoicePreset {
        match self {
            PresetId::MorganFreeman => &VOICE_PRESETS[0],
            PresetId::ScarlettJohansson => &VOICE_PRESETS[1],
            PresetId::TomHanks => &VOICE_PRESETS[2],
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        VOICE_PRESETS.iter().find(|p| p.slug == id).map(|p| p.id)
    }
}

/// A named bundle that overrides the voice and adds a character instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicePreset {
    pub id: PresetId,
    #[serde(skip)]
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Prebuilt API voice (Kore, Puck, Charon, ...)
    pub voice_name: &'static str,
    pub instruction: &'static str,
    pub icon: &'static str,
    /// Gender the character is voiced with; selecting the preset forces it
    pub gender: Gender,
}

pub static VOICE_PRESETS: [VoicePreset; 3] = [
    VoicePreset {
        id: PresetId::MorganFreeman,
        slug: "morgan-freeman",
        name: "Morgan Freeman",
        description: "Deep, authoritative, and warm narration.",
        voice_name: "Charon",
        instruction: "Speak with a very deep, calm, and wise tone. Emphasize pauses for gravitas. Sound like a legendary narrator.",
        icon: "🎙️",
        gender: Gender::Male,
    },
    VoicePreset {
        id: PresetId::ScarlettJohansson,
        slug: "scarlett-johansson",
        name: "Scarlett Johansson",
        description: "Sultry, intelligent, and husky voice.",
        voice_name: "Puck",
        instruction: "Speak with a slightly husky, intelligent, and warm tone. Sound modern, friendly, yet sophisticated.",
        icon: "✨",
        gender: Gender::Female,
    },
    VoicePreset {
        id: PresetId::TomHanks,
        slug: "tom-hanks",
        name: "Tom Hanks",
        description: "Friendly, relatable, and trustworthy.",
        voice_name: "Kore",
        instruction: "Speak with a friendly, everyday-hero quality. Relatable, honest, and warm. Sound like a trustworthy neighbor.",
        icon: "🤝",
        gender: Gender::Male,
    },
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleParameters {
    pub mood: Mood,
    pub gender: Gender,
    pub age: Age,
    #[serde(default)]
    pub preset: Option<PresetId>,
}

impl StyleParameters {
    /// Select a preset (forcing its gender) or clear the selection.
    /// Clearing leaves the gender as it was.
    pub fn select_preset(&mut self, preset: Option<PresetId>) {
        self.preset = preset;
        if let Some(id) = preset {
            self.gender = id.preset().gender;
        }
    }

    /// Clicking the selected preset again deselects it
    pub fn toggle_preset(&mut self, preset: PresetId) {
        if self.preset == Some(preset) {
            self.select_preset(None);
        } else {
            self.select_preset(Some(preset));
        }
    }

    pub fn preset(&self) -> Option<&'static VoicePreset> {
        self.preset.as_ref().map(PresetId::preset)
    }

    /// The preset's voice, else a default for the gender
    pub fn voice_name(&self) -> &'static str {
        self.preset()
            .map(|p| p.voice_name)
            .unwrap_or_else(|| self.gender.default_voice())
    }
}

/// Every choice the UI selectors offer
#[derive(Debug, Clone, Serialize)]
pub struct StyleOptions {
    pub moods: Vec<Mood>,
    pub genders: Vec<Gender>,
    pub ages: Vec<Age>,
    pub presets: Vec<VoicePreset>,
}

impl StyleOptions {
    pub fn all() -> Self {
        Self {
            moods: Mood::ALL.to_vec(),
            genders: Gender::ALL.to_vec(),
            ages: Age::ALL.to_vec(),
            presets: VOICE_PRESETS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_female_preset_forces_female() {
        let mut style = StyleParameters::default();
        style.select_preset(Some(PresetId::ScarlettJohansson));
        assert_eq!(style.gender, Gender::Female);
        assert_eq!(style.voice_name(), "Puck");
    }

    #[test]
    fn test_other_presets_force_male() {
        for id in [PresetId::MorganFreeman, PresetId::TomHanks] {
            let mut style = StyleParameters {
                gender: Gender::Female,
                ..Default::default()
            };
            style.select_preset(Some(id));
            assert_eq!(style.gender, Gender::Male);
        }
    }

    #[test]
    fn test_deselect_keeps_gender() {
        let mut style = StyleParameters::default();
        style.toggle_preset(PresetId::ScarlettJohansson);
        assert_eq!(style.preset, Some(PresetId::ScarlettJohansson));

        style.toggle_preset(PresetId::ScarlettJohansson);
        assert_eq!(style.preset, None);
        assert_eq!(style.gender, Gender::Female);

        // Unconstrained again
        style.gender = Gender::Male;
        assert_eq!(style.voice_name(), "Kore");
    }

    #[test]
    fn test_toggle_switches_between_presets() {
        let mut style = StyleParameters::default();
        style.toggle_preset(PresetId::ScarlettJohansson);
        style.toggle_preset(PresetId::MorganFreeman);
        assert_eq!(style.preset, Some(PresetId::MorganFreeman));
        assert_eq!(style.gender, Gender::Male);
        assert_eq!(style.voice_name(), "Charon");
    }

    #[test]
    fn test_default_voices() {
        let female = StyleParameters {
            gender: Gender::Female,
            ..Default::default()
        };
        assert_eq!(female.voice_name(), "Puck");
        assert_eq!(StyleParameters::default().voice_name(), "Kore");
    }

    #[test]
    fn test_preset_lookup() {
        for preset in &VOICE_PRESETS {
            assert_eq!(PresetId::from_id(preset.slug), Some(preset.id));
            assert_eq!(preset.id.preset(), preset);
        }
        assert_eq!(PresetId::from_id("unknown"), None);
    }

    #[test]
    fn test_style_wire_format() {
        let style: StyleParameters = serde_json::from_str(
            r#"{"mood":"Dramatic","gender":"Female","age":"Senior","preset":"tom-hanks"}"#,
        )
        .unwrap();
        assert_eq!(style.mood, Mood::Dramatic);
        assert_eq!(style.age, Age::Senior);
        assert_eq!(style.preset, Some(PresetId::TomHanks));

        let without_preset: StyleParameters =
            serde_json::from_str(r#"{"mood":"Sad","gender":"Male","age":"Young"}"#).unwrap();
        assert_eq!(without_preset.preset, None);
    }

    #[test]
    fn test_options_cover_every_choice() {
        let options = StyleOptions::all();
        assert_eq!(options.moods.len(), 7);
        assert_eq!(options.genders.len(), 2);
        assert_eq!(options.ages.len(), 3);
        assert_eq!(options.presets.len(), 3);
    }
}
