//! The pet's mutable state.
//!
//! [`StateStore`] wraps a [`PetRecord`] in a read/write lock. Every mutator
//! takes the write lock once, clamps each vital it touches into `[0, 100]`,
//! and releases it. [`StateStore::snapshot`] copies the record under the read
//! lock and derives mood and age after the lock is dropped.

use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PetError, Result};

use super::mood::{determine_mood, Mood};

/// Happiness lost per idle hour.
pub const HAPPINESS_DECAY_PER_HOUR: f64 = 2.0;
/// Bond lost per idle hour.
pub const BOND_DECAY_PER_HOUR: f64 = 0.5;
/// Energy lost per day of host uptime.
pub const ENERGY_DRAIN_PER_UPTIME_DAY: f64 = 14.0;

/// One sample of host telemetry, as handed over by the sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub disk_percent: f64,
    pub temp_c: f64,
    pub uptime_days: f64,
}

/// Everything the store persists. Derived values (mood, age) are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: String,

    /// 0 = full, 100 = starving
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub cleanliness: f64,
    /// 0 = stranger, 100 = soulmates
    pub bond: f64,

    pub born_at: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub last_fed: DateTime<Utc>,
    /// Idle decay has been charged up to this instant.
    #[serde(default = "Utc::now")]
    pub decayed_through: DateTime<Utc>,
    pub is_alive: bool,

    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub mem_percent: f64,
    #[serde(default)]
    pub disk_percent: f64,
    #[serde(default)]
    pub temp_c: f64,
    #[serde(default)]
    pub uptime_days: f64,
}

impl PetRecord {
    /// A freshly hatched pet.
    pub fn hatch(name: &str, species: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            species: species.to_string(),
            hunger: 20.0,
            happiness: 80.0,
            energy: 80.0,
            cleanliness: 80.0,
            bond: 10.0,
            born_at: now,
            last_interaction: now,
            last_fed: now,
            decayed_through: now,
            is_alive: true,
            cpu_percent: 0.0,
            mem_percent: 0.0,
            disk_percent: 0.0,
            temp_c: 0.0,
            uptime_days: 0.0,
        }
    }

    fn clamp_vitals(&mut self) {
        self.hunger = clamp(self.hunger);
        self.happiness = clamp(self.happiness);
        self.energy = clamp(self.energy);
        self.cleanliness = clamp(self.cleanliness);
        self.bond = clamp(self.bond);
    }

    /// Bond grows with diminishing returns.
    fn bump_bond(&mut self) {
        let gain = if self.bond > 80.0 {
            0.5
        } else if self.bond > 50.0 {
            1.0
        } else {
            2.0
        };
        self.bond = clamp(self.bond + gain);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction = now;
        self.bump_bond();
    }
}

/// An immutable point-in-time copy of the pet, with derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub name: String,
    pub species: String,

    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub cleanliness: f64,
    pub bond: f64,

    pub born_at: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub last_fed: DateTime<Utc>,
    pub is_alive: bool,

    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub disk_percent: f64,
    pub temp_c: f64,
    pub uptime_days: f64,

    pub mood: Mood,
    pub age_days: f64,
}

impl Snapshot {
    fn from_record(r: PetRecord, now: DateTime<Utc>) -> Self {
        let mut snap = Self {
            name: r.name,
            species: r.species,
            hunger: r.hunger,
            happiness: r.happiness,
            energy: r.energy,
            cleanliness: r.cleanliness,
            bond: r.bond,
            born_at: r.born_at,
            last_interaction: r.last_interaction,
            last_fed: r.last_fed,
            is_alive: r.is_alive,
            cpu_percent: r.cpu_percent,
            mem_percent: r.mem_percent,
            disk_percent: r.disk_percent,
            temp_c: r.temp_c,
            uptime_days: r.uptime_days,
            mood: Mood::Content,
            age_days: 0.0,
        };
        snap.mood = determine_mood(&snap);
        snap.age_days = hours_between(snap.born_at, now) / 24.0;
        snap
    }
}

/// Concurrently shared pet state.
///
/// Construct once per process and share it behind an `Arc` with every
/// collaborator that reads or mutates the pet.
#[derive(Debug)]
pub struct StateStore {
    inner: RwLock<PetRecord>,
}

impl StateStore {
    /// A brand-new pet born now.
    pub fn new(name: &str, species: &str) -> Self {
        Self::from_record(PetRecord::hatch(name, species, Utc::now()))
    }

    /// Reconstitute a store from a record, clamping any out-of-range vitals.
    pub fn from_record(mut record: PetRecord) -> Self {
        record.clamp_vitals();
        Self {
            inner: RwLock::new(record),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PetRecord> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PetRecord> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the persisted fields.
    pub fn record(&self) -> PetRecord {
        self.read().clone()
    }

    /// Copy the state under the read lock, then derive mood and age.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Snapshot {
        let record = self.read().clone();
        Snapshot::from_record(record, now)
    }

    pub fn is_alive(&self) -> bool {
        self.read().is_alive
    }

    /// True once the external onboarding flow has named the pet.
    pub fn is_onboarded(&self) -> bool {
        let r = self.read();
        !r.name.is_empty() && !r.species.is_empty()
    }

    /// Name the pet and restart its life with fresh vitals.
    pub fn set_identity(&self, name: &str, species: &str) {
        let mut r = self.write();
        let old = r.clone();
        *r = PetRecord::hatch(name, species, Utc::now());
        r.cpu_percent = old.cpu_percent;
        r.mem_percent = old.mem_percent;
        r.disk_percent = old.disk_percent;
        r.temp_c = old.temp_c;
        r.uptime_days = old.uptime_days;
    }

    pub fn feed(&self) {
        self.feed_at(Utc::now());
    }

    /// Hunger −30, happiness +5.
    pub fn feed_at(&self, now: DateTime<Utc>) {
        let mut r = self.write();
        r.hunger = clamp(r.hunger - 30.0);
        r.happiness = clamp(r.happiness + 5.0);
        r.last_fed = now;
        r.touch(now);
    }

    pub fn play(&self) {
        self.play_at(Utc::now());
    }

    /// Happiness +20, energy −10, hunger +5.
    pub fn play_at(&self, now: DateTime<Utc>) {
        let mut r = self.write();
        r.happiness = clamp(r.happiness + 20.0);
        r.energy = clamp(r.energy - 10.0);
        r.hunger = clamp(r.hunger + 5.0);
        r.touch(now);
    }

    pub fn pet(&self) {
        self.pet_at(Utc::now());
    }

    /// Affection: happiness +10.
    pub fn pet_at(&self, now: DateTime<Utc>) {
        let mut r = self.write();
        r.happiness = clamp(r.happiness + 10.0);
        r.touch(now);
    }

    pub fn touch_interaction(&self) {
        self.touch_interaction_at(Utc::now());
    }

    /// Any contact at all: records the interaction and bumps bond.
    pub fn touch_interaction_at(&self, now: DateTime<Utc>) {
        self.write().touch(now);
    }

    pub fn apply_system_stats(&self, stats: SystemStats) {
        self.apply_system_stats_at(stats, Utc::now());
    }

    /// Map host telemetry onto vitals.
    ///
    /// CPU drives hunger, free disk drives cleanliness and uptime drains
    /// energy. Happiness and bond decay linearly with idle time; each idle
    /// interval is charged once no matter how often this is called. The pet
    /// dies when hunger ≥ 95, memory ≥ 95 and energy ≤ 5 hold together, and
    /// stays dead until [`StateStore::revive`].
    pub fn apply_system_stats_at(&self, stats: SystemStats, now: DateTime<Utc>) {
        let mut r = self.write();

        r.cpu_percent = stats.cpu_percent;
        r.mem_percent = stats.mem_percent;
        r.disk_percent = stats.disk_percent;
        r.temp_c = stats.temp_c;
        r.uptime_days = stats.uptime_days;

        r.hunger = clamp(stats.cpu_percent);
        r.cleanliness = clamp(100.0 - stats.disk_percent);
        r.energy = clamp(100.0 - stats.uptime_days * ENERGY_DRAIN_PER_UPTIME_DAY);

        let idle_since = r.last_interaction.max(r.decayed_through);
        let idle_hours = hours_between(idle_since, now);
        if idle_hours > 0.0 {
            r.happiness = clamp(r.happiness - idle_hours * HAPPINESS_DECAY_PER_HOUR);
            r.bond = clamp(r.bond - idle_hours * BOND_DECAY_PER_HOUR);
        }
        if now > r.decayed_through {
            r.decayed_through = now;
        }

        if r.is_alive && r.hunger >= 95.0 && r.mem_percent >= 95.0 && r.energy <= 5.0 {
            r.is_alive = false;
            warn!(
                hunger = r.hunger,
                mem = r.mem_percent,
                energy = r.energy,
                "Pet died from sustained critical host state"
            );
        }
    }

    pub fn kill(&self) {
        self.write().is_alive = false;
    }

    pub fn revive(&self) {
        self.revive_at(Utc::now());
    }

    /// Back to life with baseline vitals; half the bond survives.
    pub fn revive_at(&self, now: DateTime<Utc>) {
        let mut r = self.write();
        r.is_alive = true;
        r.hunger = 20.0;
        r.happiness = 50.0;
        r.energy = 50.0;
        r.cleanliness = 50.0;
        r.bond = clamp(r.bond * 0.5);
        r.last_interaction = now;
    }

    /// Write the record atomically: serialize, write `<path>.tmp`, rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let record = self.record();
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| PetError::Persistence(format!("marshal state: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PetError::Persistence(format!("create {}: {}", parent.display(), e))
            })?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| PetError::Persistence(format!("write tmp state: {}", e)))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| PetError::Persistence(format!("rename state: {}", e)))?;

        debug!(path = %path.display(), "Pet state saved");
        Ok(())
    }

    /// Read a previously saved record.
    ///
    /// Returns `Ok(None)` when no file exists yet (first run).
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PetError::Persistence(format!("read state: {}", e))),
        };
        let record: PetRecord = serde_json::from_str(&content)
            .map_err(|e| PetError::Persistence(format!("unmarshal state: {}", e)))?;
        Ok(Some(Self::from_record(record)))
    }
}

fn clamp(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 100.0)
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
pub(crate) fn test_snapshot() -> Snapshot {
    let now = Utc::now();
    let mut record = PetRecord::hatch("Inky", "octopus", now);
    record.happiness = 50.0;
    record.hunger = 50.0;
    record.energy = 50.0;
    record.mem_percent = 40.0;
    record.temp_c = 45.0;
    Snapshot::from_record(record, now)
}
