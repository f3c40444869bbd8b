//! Plain care commands: no provider involved.

use std::path::Path;

use anyhow::Result;

use petclaw::pet::StateStore;

use super::common::{display_name, load_config, load_state_for_update, save_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CareAction {
    Feed,
    Play,
    Pet,
}

/// Apply one care action and describe the result.
pub(crate) fn apply_care(state: &StateStore, action: CareAction) -> String {
    let name = display_name(state);
    if !state.is_alive() {
        return format!("{} has passed away... Use `petclaw revive` to bring them back.", name);
    }

    match action {
        CareAction::Feed => {
            state.feed();
            format!(
                "{} munches happily! Hunger is now at {:.0}%.",
                name,
                state.snapshot().hunger
            )
        }
        CareAction::Play => {
            state.play();
            format!(
                "{} bounces around! Happiness {:.0}%, energy {:.0}%.",
                name,
                state.snapshot().happiness,
                state.snapshot().energy
            )
        }
        CareAction::Pet => {
            state.pet();
            format!("You give {} a gentle scratch. Bond is now {:.0}%.", name, state.snapshot().bond)
        }
    }
}

pub(crate) fn cmd_care(config_path: Option<&Path>, action: CareAction) -> Result<()> {
    let config = load_config(config_path)?;
    let state = load_state_for_update(&config)?;
    println!("{}", apply_care(&state, action));
    save_state(&config, &state)
}

pub(crate) fn cmd_name(config_path: Option<&Path>, name: &str, species: &str) -> Result<()> {
    let name = name.trim();
    let species = species.trim();
    if name.is_empty() || species.is_empty() {
        anyhow::bail!("Name and species must not be empty");
    }

    let config = load_config(config_path)?;
    let state = load_state_for_update(&config)?;
    state.set_identity(name, species);
    save_state(&config, &state)?;
    println!("Say hello to {} the {}!", name, species);
    Ok(())
}

/// Revive only when dead.
pub(crate) fn revive_message(state: &StateStore) -> String {
    let name = display_name(state);
    if state.is_alive() {
        format!("{} is alive and well!", name)
    } else {
        state.revive();
        format!("{} has been revived!", name)
    }
}

pub(crate) fn cmd_revive(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = load_state_for_update(&config)?;
    println!("{}", revive_message(&state));
    save_state(&config, &state)
}

pub(crate) fn cmd_kill(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = load_state_for_update(&config)?;
    state.kill();
    save_state(&config, &state)?;
    println!("{} has passed away...", display_name(&state));
    Ok(())
}
