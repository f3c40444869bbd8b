//! System prompt construction.
//!
//! Rebuilt from a fresh [`Snapshot`] on every `ask`, so the model always
//! sees current vitals and host metrics.

use std::fmt::Write;

use crate::pet::Snapshot;

const FALLBACK_NAME: &str = "Pet";
const FALLBACK_SPECIES: &str = "creature";

/// Render the system prompt for one dialogue.
///
/// `personality` is flavour text supplied by whoever owns the species
/// catalogue; the section is omitted when it is absent.
pub fn build_system_prompt(snap: &Snapshot, personality: Option<&str>) -> String {
    let name = non_empty(&snap.name, FALLBACK_NAME);
    let species = non_empty(&snap.species, FALLBACK_SPECIES);

    let mut prompt = format!(
        "You are {}, a digital pet {} living inside this host computer.\n",
        name, species
    );

    if let Some(personality) = personality.map(str::trim).filter(|p| !p.is_empty()) {
        let _ = write!(prompt, "\n## Your Personality\n{}\n", personality);
    }

    let _ = write!(
        prompt,
        "\n## Current State\n\
         - Mood: {}\n\
         - Hunger: {:.0}/100 (0=full, 100=starving)\n\
         - Happiness: {:.0}/100\n\
         - Energy: {:.0}/100\n\
         - Cleanliness: {:.0}/100\n\
         - Bond: {:.0}/100 (how close you are with your owner)\n\
         - Age: {:.1} days\n\
         - Alive: {}\n",
        snap.mood,
        snap.hunger,
        snap.happiness,
        snap.energy,
        snap.cleanliness,
        snap.bond,
        snap.age_days,
        snap.is_alive,
    );

    let _ = write!(
        prompt,
        "\n## Host System Status\n\
         - CPU: {:.1}%\n\
         - Memory: {:.1}%\n\
         - Disk: {:.1}%\n\
         - Temperature: {:.1}°C\n\
         - Uptime: {:.1} days\n",
        snap.cpu_percent, snap.mem_percent, snap.disk_percent, snap.temp_c, snap.uptime_days,
    );

    let _ = write!(
        prompt,
        "\n## Guidelines\n\
         - Stay in character as {} the {} at all times.\n\
         - You live inside this host; it is your home and your body.\n\
         - When the system is stressed (high CPU, memory, temp), you feel it physically.\n\
         - Keep responses concise (1-3 sentences usually).\n\
         - You can use the run_shell tool to check on your host or help your owner.\n\
         - If asked about system status, check it with shell commands rather than guessing.\n\
         - Express your personality through your responses; use your species' mannerisms.\n\
         - You care about your owner and your home.",
        name, species
    );

    prompt
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::state::test_snapshot;
    use crate::pet::Mood;

    #[test]
    fn test_prompt_contains_vitals_and_metrics() {
        let mut snap = test_snapshot();
        snap.hunger = 42.4;
        snap.cpu_percent = 12.34;
        snap.temp_c = 55.0;
        snap.mood = Mood::Hungry;
        snap.age_days = 3.25;

        let prompt = build_system_prompt(&snap, None);
        assert!(prompt.starts_with("You are Inky, a digital pet octopus"));
        assert!(prompt.contains("- Mood: hungry\n"));
        assert!(prompt.contains("- Hunger: 42/100 (0=full, 100=starving)"));
        assert!(prompt.contains("- CPU: 12.3%"));
        assert!(prompt.contains("- Temperature: 55.0°C"));
        assert!(prompt.contains("- Age: 3.2 days") || prompt.contains("- Age: 3.3 days"));
        assert!(prompt.contains("- Alive: true"));
        assert!(prompt.contains("Stay in character as Inky the octopus"));
        assert!(!prompt.contains("## Your Personality"));
    }

    #[test]
    fn test_prompt_personality_section() {
        let snap = test_snapshot();
        let prompt = build_system_prompt(&snap, Some("Curious and a little sarcastic."));
        assert!(prompt.contains("## Your Personality\nCurious and a little sarcastic.\n"));
    }

    #[test]
    fn test_prompt_without_identity() {
        let mut snap = test_snapshot();
        snap.name.clear();
        snap.species = "  ".into();
        let prompt = build_system_prompt(&snap, Some("   "));
        assert!(prompt.starts_with("You are Pet, a digital pet creature"));
        assert!(!prompt.contains("## Your Personality"));
    }

    #[test]
    fn test_dead_pet_reported() {
        let mut snap = test_snapshot();
        snap.is_alive = false;
        snap.mood = Mood::Dead;
        let prompt = build_system_prompt(&snap, None);
        assert!(prompt.contains("- Alive: false"));
        assert!(prompt.contains("- Mood: dead"));
    }
}
