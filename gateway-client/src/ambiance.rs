//! Built-in ambiance catalogue

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::profile::Template;

/// A named musical mood and the defaults it implies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambiance {
    /// Filled from the table key when read from config
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Short genre label shown next to the name
    #[serde(default)]
    pub style_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Ambiance {
    pub fn template(&self) -> Template {
        Template {
            prompt: self.prompt.clone(),
            style: self.style.clone(),
            title: self.title.clone(),
            negative_tags: self.negative_tags.clone(),
            description: self.description.clone(),
        }
    }

    /// Fields set here win; empty names and labels and missing template
    /// fields are filled from `base`
    pub fn over(&self, base: &Ambiance) -> Ambiance {
        let pick = |own: &String, other: &String| {
            if own.is_empty() { other.clone() } else { own.clone() }
        };
        Ambiance {
            id: pick(&self.id, &base.id),
            name: pick(&self.name, &base.name),
            style_label: pick(&self.style_label, &base.style_label),
            prompt: self.prompt.clone().or_else(|| base.prompt.clone()),
            style: self.style.clone().or_else(|| base.style.clone()),
            title: self.title.clone().or_else(|| base.title.clone()),
            negative_tags: self.negative_tags.clone().or_else(|| base.negative_tags.clone()),
            description: self.description.clone().or_else(|| base.description.clone()),
        }
    }
}

// id, name, style label, prompt, style, title, negative tags, description
type Row = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const ROWS: [Row; 8] = [
    (
        "foret-mysterieuse",
        "Forêt Mystérieuse",
        "Ambient, Nature",
        "Mysterious forest ambience with soft nature sounds, gentle strings and ethereal pads creating a mystical atmosphere",
        "Ambient, Cinematic",
        "Mysterious Forest Ambience",
        "Vocals, Drums, Heavy Bass",
        "Ambient forest sounds with mysterious piano and ethereal pads",
    ),
    (
        "cyberpunk-pluie",
        "Cyberpunk sous la Pluie",
        "Electronic, Synthwave",
        "Dark cyberpunk atmosphere with rain sounds, synthetic textures, deep bass and futuristic soundscapes",
        "Electronic, Synthwave",
        "Cyberpunk Rain",
        "Vocals, Acoustic, Bright",
        "Cyberpunk synthwave with rain sounds and electronic beats",
    ),
    (
        "plage-coucher-soleil",
        "Plage au Coucher du Soleil",
        "Chill, Tropical",
        "Relaxing beach sunset with soft waves, tropical guitars, warm pads and peaceful melodies",
        "Chill, Tropical",
        "Sunset Beach",
        "Vocals, Heavy, Dark",
        "Relaxing tropical beach music with soft guitar and ocean waves",
    ),
    (
        "meditation-zen",
        "Méditation Zen",
        "Ambient, Peaceful",
        "Peaceful zen meditation music with calming tones, soft bells, gentle drones and tranquil atmosphere",
        "Ambient, Peaceful",
        "Zen Meditation",
        "Vocals, Drums, Fast tempo",
        "Peaceful zen meditation music with bells and nature sounds",
    ),
    (
        "cafe-jazz",
        "Café Jazz",
        "Jazz, Relaxing",
        "Relaxing cafe jazz with smooth piano, soft brushes drums, walking bass and warm atmosphere",
        "Jazz, Relaxing",
        "Cafe Jazz Lounge",
        "Vocals, Heavy, Aggressive",
        "Smooth jazz music perfect for a cozy café atmosphere",
    ),
    (
        "montagne-majestueuse",
        "Montagne Majestueuse",
        "Orchestral, Epic",
        "Epic mountain landscape with orchestral strings, majestic horns, cinematic percussion and grandiose atmosphere",
        "Orchestral, Epic",
        "Majestic Mountains",
        "Vocals, Electronic, Modern",
        "Epic orchestral music with majestic mountain atmosphere",
    ),
    (
        "desert-nocturne",
        "Désert Nocturne",
        "Ethnic, Atmospheric",
        "Nocturnal desert ambience with ethnic instruments, mystical drones, soft percussion and atmospheric textures",
        "Ethnic, Atmospheric",
        "Desert Night",
        "Vocals, Heavy, Fast",
        "Atmospheric ethnic music with desert night ambiance",
    ),
    (
        "ville-futuriste",
        "Ville Futuriste",
        "Electronic, Cinematic",
        "Futuristic city soundscape with electronic textures, cinematic pads, subtle rhythms and sci-fi atmosphere",
        "Electronic, Cinematic",
        "Futuristic City",
        "Vocals, Acoustic, Organic",
        "Futuristic electronic cinematic music with urban atmosphere",
    ),
];

static CATALOGUE: Lazy<Vec<Ambiance>> = Lazy::new(|| {
    ROWS.iter()
        .map(
            |&(id, name, style_label, prompt, style, title, negative_tags, description)| Ambiance {
                id: id.to_string(),
                name: name.to_string(),
                style_label: style_label.to_string(),
                prompt: Some(prompt.to_string()),
                style: Some(style.to_string()),
                title: Some(title.to_string()),
                negative_tags: Some(negative_tags.to_string()),
                description: Some(description.to_string()),
            },
        )
        .collect()
});

/// All built-in ambiances, in display order
pub fn builtin() -> &'static [Ambiance] {
    &CATALOGUE
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_ids_are_unique() {
        let mut ids: Vec<&str> = builtin().iter().map(|a| a.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_catalogue_strings() {
        let jazz = builtin().iter().find(|a| a.id == "cafe-jazz").unwrap();
        assert_eq!(jazz.name, "Café Jazz");
        assert_eq!(jazz.template().style.as_deref(), Some("Jazz, Relaxing"));
        assert_eq!(jazz.title.as_deref(), Some("Cafe Jazz Lounge"));
        assert_eq!(
            jazz.description.as_deref(),
            Some("Smooth jazz music perfect for a cozy café atmosphere")
        );
        assert_eq!(builtin()[0].name, "Forêt Mystérieuse");
    }

    #[test]
    fn test_override_fills_gaps_from_base() {
        let base = builtin().iter().find(|a| a.id == "cafe-jazz").unwrap();
        let custom = Ambiance {
            id: "cafe-jazz".into(),
            name: String::new(),
            style_label: String::new(),
            prompt: Some("Smoky late-night jazz trio".into()),
            style: None,
            title: None,
            negative_tags: None,
            description: None,
        };

        let merged = custom.over(base);
        assert_eq!(merged.name, "Café Jazz");
        assert_eq!(merged.prompt.as_deref(), Some("Smoky late-night jazz trio"));
        assert_eq!(merged.style.as_deref(), Some("Jazz, Relaxing"));
        assert_eq!(merged.negative_tags.as_deref(), Some("Vocals, Heavy, Aggressive"));
    }

    #[test]
    fn test_every_template_is_complete() {
        for ambiance in builtin() {
            assert_eq!(ambiance.template().params().len(), 5, "{}", ambiance.id);
        }
    }
}
