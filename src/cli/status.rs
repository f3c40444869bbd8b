//! Status command handler.

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use petclaw::pet::{distress_reason, Snapshot};

use super::common::{load_config, load_state, progress_bar};

pub(crate) fn cmd_status(config_path: Option<&Path>, as_json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let state = load_state(&config)?;
    let snap = state.snapshot();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot_json(&snap))?);
    } else {
        print!("{}", render_status(&snap));
    }
    Ok(())
}

fn snapshot_json(snap: &Snapshot) -> serde_json::Value {
    json!({
        "name": snap.name,
        "species": snap.species,
        "mood": snap.mood.as_str(),
        "is_alive": snap.is_alive,
        "age_days": snap.age_days,
        "vitals": {
            "hunger": snap.hunger,
            "happiness": snap.happiness,
            "energy": snap.energy,
            "cleanliness": snap.cleanliness,
            "bond": snap.bond,
        },
        "system": {
            "cpu_percent": snap.cpu_percent,
            "mem_percent": snap.mem_percent,
            "disk_percent": snap.disk_percent,
            "temp_c": snap.temp_c,
            "uptime_days": snap.uptime_days,
        },
        "last_interaction": snap.last_interaction.to_rfc3339(),
        "last_fed": snap.last_fed.to_rfc3339(),
        "distress": distress_reason(snap),
    })
}

fn render_status(snap: &Snapshot) -> String {
    let name = if snap.name.is_empty() { "(unnamed)" } else { snap.name.as_str() };
    let species = if snap.species.is_empty() { "?" } else { snap.species.as_str() };
    let alive = if snap.is_alive { "alive" } else { "DEAD" };

    let mut out = String::new();
    out.push_str(&format!("{} the {}\n", name, species));
    out.push_str(&format!("mood: {} | status: {}\n\n", snap.mood, alive));

    out.push_str("Stats\n-----\n");
    out.push_str(&format!("happiness {}\n", progress_bar(snap.happiness, 10)));
    out.push_str(&format!("energy    {}\n", progress_bar(snap.energy, 10)));
    out.push_str(&format!("hunger    {}\n", progress_bar(snap.hunger, 10)));
    out.push_str(&format!("clean     {}\n", progress_bar(snap.cleanliness, 10)));
    out.push_str(&format!("bond      {}\n\n", progress_bar(snap.bond, 10)));

    out.push_str("System\n------\n");
    out.push_str(&format!(
        "CPU {:.1}% | {:.1}°C | {:.0}% mem | {:.0}% disk | uptime {:.1}d\n",
        snap.cpu_percent, snap.temp_c, snap.mem_percent, snap.disk_percent, snap.uptime_days
    ));
    out.push_str(&format!("age: {:.1} days\n", snap.age_days));

    if snap.is_alive {
        if let Some(reason) = distress_reason(snap) {
            out.push_str(&format!("\n! {}\n", reason));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use petclaw::pet::{Mood, StateStore, SystemStats};

    fn sample() -> Snapshot {
        let state = StateStore::new("Inky", "octopus");
        state.apply_system_stats(SystemStats {
            cpu_percent: 12.5,
            mem_percent: 40.0,
            disk_percent: 30.0,
            temp_c: 48.2,
            uptime_days: 2.0,
        });
        state.snapshot()
    }

    #[test]
    fn test_render_status() {
        let out = render_status(&sample());
        assert!(out.starts_with("Inky the octopus\n"));
        assert!(out.contains("status: alive"));
        assert!(out.contains("CPU 12.5% | 48.2°C | 40% mem | 30% disk | uptime 2.0d"));
        assert!(!out.contains("! "));
    }

    #[test]
    fn test_render_dead_pet() {
        let mut snap = sample();
        snap.is_alive = false;
        snap.mood = Mood::Dead;
        snap.mem_percent = 99.0;
        let out = render_status(&snap);
        assert!(out.contains("mood: dead | status: DEAD"));
        assert!(!out.contains("! "));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let value = snapshot_json(&sample());
        assert_eq!(value["name"], "Inky");
        assert_eq!(value["vitals"]["hunger"], 12.5);
        assert_eq!(value["system"]["temp_c"], 48.2);
        assert!(value["distress"].is_null());
    }
}
