//! Prompt selection: a base style description plus a random tonal modifier.
//!
//! Every generated track gets a prompt of the form
//! `<catalog entry><modifier>`, where the modifier names two keys drawn from
//! the 12 pitch classes × {major, minor}. All randomness comes from the
//! caller's RNG, so seeding it makes selection reproducible.

use std::fmt;

use rand::Rng;

use crate::{Error, Result};

/// The twelve pitch classes, sharps only.
pub const NOTES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Phrase templates as `(prefix, separator, suffix)` around the two keys.
pub const TEMPLATES: [(&str, &str, &str); 4] = [
    (" The melody modulates between ", " and ", "."),
    (" This piece explores a fusion of ", " and ", " tonalities."),
    (" The harmony shifts unpredictably from ", " to ", "."),
    (" Written in the keys of ", " and ", "."),
];

/// Stock catalog of base descriptions.
pub const BASE_PROMPTS: [&str; 10] = [
    "This is an 80s-style synthwave track. The tempo is driving and energetic, featuring a classic gated reverb snare drum pattern. A warm, analog synthesizer plays a nostalgic melody over a rolling bassline. The atmosphere is neon-soaked and futuristic, perfect for a night drive scene or a retro video game level.",
    "This song is a lo-fi hip hop beat. The tempo is slow and relaxed, featuring a dusty drum break with a heavy swing. A jazz piano sample plays a melancholic chord progression, accompanied by the sound of vinyl crackle and rain in the background. The vibe is chill, nostalgic, and study-focused.",
    "This track is a liquid drum and bass instrumental. The tempo is fast, around 170 BPM, featuring a complex, high-energy breakbeat rhythm. A deep, sub-bass wobble underpins ethereal synthesizer pads that float in the background. The mood is soulful yet energetic, suitable for a racing game or a high-speed travel montage.",
    "This is a deep house track. The rhythm is a steady four-on-the-floor beat with a grooving hi-hat pattern. A smooth electric piano plays deep, jazzy chords while a soulful vocal chop loops in the distance. The atmosphere is sophisticated and hypnotic, perfect for a late-night lounge or a fashion runway.",
    "This instrumental is an industrial techno piece. The tempo is moderate but heavy, featuring distorted kick drums and metallic percussion clangs. A gritty, aggressive bass synthesizer pulses rhythmically, creating a dark and dystopian atmosphere. It sounds like the soundtrack to a cyberpunk action movie or a futuristic underground club.",
    "This song is an upbeat funk instrumental. It features a prominent slap bass guitar playing a syncopated groove locked in with tight acoustic drums. A brass section punches in with bright stabs, and a wah-wah guitar adds texture. The vibe is energetic, happy, and danceable, reminiscent of 70s cop shows or a block party.",
    "This is an atmospheric ambient track. There are no drums, only layers of washing synthesizer pads and shimmering textures. The sound is wide and expansive, creating a sense of floating in deep space. The mood is serene, mysterious, and meditative, suitable for a sci-fi documentary or a yoga session.",
    "This track is a melodic dubstep instrumental. It builds up from a soft piano intro into a heavy, half-time drum beat. The drop features a growling, modulated bass synthesizer and powerful saw waves. The music is emotional yet intense, combining beautiful melodies with aggressive sound design.",
    "This is a modern trap beat. The tempo is slow but bouncy, dominated by booming 808 sub-bass glides and sharp, rapid-fire hi-hat rolls. A dark, minor-key bell melody loops hypnotically. The atmosphere is ominous and hard-hitting, typical of modern hip-hop production.",
    "This is a jazz fusion performance. The drums are playing a complex, fast-paced rhythm with plenty of cymbal work. A saxophone takes the lead with an intricate, improvised solo over a walking upright bass line. The vibe is sophisticated, chaotic, and energetic, sounding like a live performance in a smoky club.",
];

/// Scale quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    pub const ALL: [Scale; 2] = [Scale::Major, Scale::Minor];

    pub fn name(self) -> &'static str {
        match self {
            Scale::Major => "Major",
            Scale::Minor => "Minor",
        }
    }
}

/// A (pitch class, scale) pair, rendered as e.g. `F# Minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub note: &'static str,
    pub scale: Scale,
}

impl Key {
    /// Uniform draw over all 24 keys.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            note: NOTES[rng.gen_range(0..NOTES.len())],
            scale: Scale::ALL[rng.gen_range(0..Scale::ALL.len())],
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.note, self.scale.name())
    }
}

/// Tonal modifier appended to a base description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyModifier {
    pub first: Key,
    pub second: Key,
    /// Index into [`TEMPLATES`].
    pub template: usize,
}

impl KeyModifier {
    /// Two independent keys and a uniformly chosen template.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first = Key::random(rng);
        let second = Key::random(rng);
        let template = rng.gen_range(0..TEMPLATES.len());
        Self {
            first,
            second,
            template,
        }
    }
}

impl fmt::Display for KeyModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, separator, suffix) = TEMPLATES[self.template];
        write!(f, "{prefix}{}{separator}{}{suffix}", self.first, self.second)
    }
}

/// Picks generation prompts from a fixed catalog.
#[derive(Debug, Clone)]
pub struct PromptSelector {
    catalog: Vec<String>,
}

impl Default for PromptSelector {
    fn default() -> Self {
        Self {
            catalog: BASE_PROMPTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PromptSelector {
    /// Use a custom catalog of base descriptions.
    pub fn new(catalog: Vec<String>) -> Result<Self> {
        if catalog.is_empty() {
            return Err(Error::Config("prompt catalog must not be empty".into()));
        }
        Ok(Self { catalog })
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Base description chosen uniformly, followed by a random key modifier.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let base = &self.catalog[rng.gen_range(0..self.catalog.len())];
        let modifier = KeyModifier::random(rng);
        format!("{base}{modifier}")
    }
}
