//! Mood derivation.
//!
//! Mood is never stored. It is recomputed from a [`Snapshot`] every time one
//! is taken, so it cannot drift away from the vitals it describes.

use std::fmt;

use super::state::Snapshot;

/// The pet's mood, in priority order (first matching rule wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    Dead,
    Sick,
    Anxious,
    Sleepy,
    Hungry,
    Bored,
    Happy,
    Content,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Dead => "dead",
            Mood::Sick => "sick",
            Mood::Anxious => "anxious",
            Mood::Sleepy => "sleepy",
            Mood::Hungry => "hungry",
            Mood::Bored => "bored",
            Mood::Happy => "happy",
            Mood::Content => "content",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a snapshot.
///
/// Priority: dead > sick (mem > 90%) > anxious (temp > 70°C) > sleepy
/// (energy < 20) > hungry (hunger > 70) > bored (happiness < 30) > happy
/// (happiness > 70, hunger < 40, energy > 40) > content.
pub fn determine_mood(s: &Snapshot) -> Mood {
    if !s.is_alive {
        return Mood::Dead;
    }
    if s.mem_percent > 90.0 {
        return Mood::Sick;
    }
    if s.temp_c > 70.0 {
        return Mood::Anxious;
    }
    if s.energy < 20.0 {
        return Mood::Sleepy;
    }
    if s.hunger > 70.0 {
        return Mood::Hungry;
    }
    if s.happiness < 30.0 {
        return Mood::Bored;
    }
    if s.happiness > 70.0 && s.hunger < 40.0 && s.energy > 40.0 {
        return Mood::Happy;
    }
    Mood::Content
}

/// Why the host is in distress, if it is.
///
/// Checked in order: memory, temperature, CPU, disk.
pub fn distress_reason(s: &Snapshot) -> Option<&'static str> {
    if s.mem_percent > 90.0 {
        Some("Memory usage is critical! I'm not feeling well...")
    } else if s.temp_c > 75.0 {
        Some("It's getting really hot in here! The host is overheating!")
    } else if s.cpu_percent > 90.0 {
        Some("The CPU is maxed out! I can barely think...")
    } else if s.disk_percent > 95.0 {
        Some("Disk is almost full! I'm running out of space...")
    } else {
        None
    }
}
