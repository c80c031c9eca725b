//! In-memory entity store for tests and single-process play.

use crate::store::{EntityStore, StoreError, WarFilter};
use nation_wars_core::{
    Alliance, BattleLog, Message, Military, Nation, NationId, UnitType, War, WarId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    nations: HashMap<NationId, Nation>,
    militaries: HashMap<NationId, Military>,
    alliances: HashMap<String, Alliance>,
    wars: HashMap<WarId, War>,
    battle_logs: Vec<BattleLog>,
    messages: Vec<Message>,
}

/// Thread-safe store backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Number of stored battle logs across all wars.
    pub fn battle_log_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables()?.battle_logs.len())
    }
}

impl EntityStore for MemoryStore {
    fn nations_owned_by(&self, owner: &str) -> Result<Vec<Nation>, StoreError> {
        let tables = self.tables()?;
        let mut nations: Vec<Nation> = tables
            .nations
            .values()
            .filter(|n| n.owner == owner)
            .cloned()
            .collect();
        nations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nations)
    }

    fn get_nation(&self, id: &str) -> Result<Option<Nation>, StoreError> {
        Ok(self.tables()?.nations.get(id).cloned())
    }

    fn put_nation(&self, nation: &Nation) -> Result<(), StoreError> {
        self.tables()?
            .nations
            .insert(nation.id.clone(), nation.clone());
        Ok(())
    }

    fn adjust_treasury(&self, nation_id: &str, delta: i64) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let nation = tables
            .nations
            .get_mut(nation_id)
            .ok_or_else(|| StoreError::not_found("nation", nation_id))?;
        nation.treasury = nation.treasury.saturating_add_signed(delta);
        Ok(())
    }

    fn get_military(&self, nation_id: &str) -> Result<Option<Military>, StoreError> {
        Ok(self.tables()?.militaries.get(nation_id).cloned())
    }

    fn put_military(&self, military: &Military) -> Result<(), StoreError> {
        self.tables()?
            .militaries
            .insert(military.nation_id.clone(), military.clone());
        Ok(())
    }

    fn apply_unit_losses(
        &self,
        nation_id: &str,
        losses: &BTreeMap<UnitType, u64>,
    ) -> Result<(), StoreError> {
        if let Some(military) = self.tables()?.militaries.get_mut(nation_id) {
            military.apply_losses(losses);
        }
        Ok(())
    }

    fn get_alliance(&self, id: &str) -> Result<Option<Alliance>, StoreError> {
        Ok(self.tables()?.alliances.get(id).cloned())
    }

    fn put_alliance(&self, alliance: &Alliance) -> Result<(), StoreError> {
        self.tables()?
            .alliances
            .insert(alliance.id.clone(), alliance.clone());
        Ok(())
    }

    fn create_war(&self, war: &War) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.wars.contains_key(&war.id) {
            return Err(StoreError::Conflict(format!("war {} already exists", war.id)));
        }
        tables.wars.insert(war.id.clone(), war.clone());
        Ok(())
    }

    fn get_war(&self, id: &str) -> Result<Option<War>, StoreError> {
        Ok(self.tables()?.wars.get(id).cloned())
    }

    fn update_war(&self, war: &War) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables.wars.get_mut(&war.id) {
            Some(slot) => {
                *slot = war.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("war", &war.id)),
        }
    }

    fn find_wars(&self, filter: &WarFilter) -> Result<Vec<War>, StoreError> {
        let tables = self.tables()?;
        let mut wars: Vec<War> = tables
            .wars
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        wars.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        Ok(wars)
    }

    fn create_battle_log(&self, log: &BattleLog) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.battle_logs.iter().any(|l| l.id == log.id) {
            return Err(StoreError::Conflict(format!("battle log {} already exists", log.id)));
        }
        tables.battle_logs.push(log.clone());
        Ok(())
    }

    fn battle_logs(&self, war_id: &str) -> Result<Vec<BattleLog>, StoreError> {
        let tables = self.tables()?;
        let mut logs: Vec<BattleLog> = tables
            .battle_logs
            .iter()
            .filter(|l| l.war_id == war_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.battle_number);
        Ok(logs)
    }

    fn create_message(&self, message: &Message) -> Result<(), StoreError> {
        self.tables()?.messages.push(message.clone());
        Ok(())
    }

    fn messages_for(&self, nation_id: &str) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.recipient_nation_id == nation_id)
            .cloned()
            .collect())
    }
}
