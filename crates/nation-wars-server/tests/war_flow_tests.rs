//! End-to-end tests for war declaration and battle resolution.
//!
//! These tests drive the full service against an in-memory store:
//! - Declaration preconditions and their statuses
//! - Pinned-roll battles and the records they mutate
//! - Role reversal, concurrency and partial-failure handling
//! - The JSON command surface

use nation_wars_core::{
    Alliance, AttackType, BalanceConfig, BattleLog, Message, MessageKind, Military, Nation, Rolls,
    UnitType, War, WarStatus,
};
use nation_wars_server::{
    DeclareWar, ErrorKind, FixedRolls, ResolveBattle, StaticConfigProvider,
    WarError, WarService,
};
use nation_wars_store::{
    BackoffConfig, EntityStore, MemoryStore, RetryPolicy, StoreError, WarFilter,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const BALANCE_JSON: &str = include_str!("../../../config/balance.json");

/// Memory store with switchable failures.
#[derive(Default)]
struct Faulty {
    inner: MemoryStore,
    fail_messages: AtomicBool,
    fail_war_updates: AtomicBool,
}

impl EntityStore for Faulty {
    fn nations_owned_by(&self, owner: &str) -> Result<Vec<Nation>, StoreError> {
        self.inner.nations_owned_by(owner)
    }
    fn get_nation(&self, id: &str) -> Result<Option<Nation>, StoreError> {
        self.inner.get_nation(id)
    }
    fn put_nation(&self, nation: &Nation) -> Result<(), StoreError> {
        self.inner.put_nation(nation)
    }
    fn adjust_treasury(&self, nation_id: &str, delta: i64) -> Result<(), StoreError> {
        self.inner.adjust_treasury(nation_id, delta)
    }
    fn get_military(&self, nation_id: &str) -> Result<Option<Military>, StoreError> {
        self.inner.get_military(nation_id)
    }
    fn put_military(&self, military: &Military) -> Result<(), StoreError> {
        self.inner.put_military(military)
    }
    fn apply_unit_losses(
        &self,
        nation_id: &str,
        losses: &BTreeMap<UnitType, u64>,
    ) -> Result<(), StoreError> {
        self.inner.apply_unit_losses(nation_id, losses)
    }
    fn get_alliance(&self, id: &str) -> Result<Option<Alliance>, StoreError> {
        self.inner.get_alliance(id)
    }
    fn put_alliance(&self, alliance: &Alliance) -> Result<(), StoreError> {
        self.inner.put_alliance(alliance)
    }
    fn create_war(&self, war: &War) -> Result<(), StoreError> {
        self.inner.create_war(war)
    }
    fn get_war(&self, id: &str) -> Result<Option<War>, StoreError> {
        self.inner.get_war(id)
    }
    fn update_war(&self, war: &War) -> Result<(), StoreError> {
        if self.fail_war_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.update_war(war)
    }
    fn find_wars(&self, filter: &WarFilter) -> Result<Vec<War>, StoreError> {
        self.inner.find_wars(filter)
    }
    fn create_battle_log(&self, log: &BattleLog) -> Result<(), StoreError> {
        self.inner.create_battle_log(log)
    }
    fn battle_logs(&self, war_id: &str) -> Result<Vec<BattleLog>, StoreError> {
        self.inner.battle_logs(war_id)
    }
    fn create_message(&self, message: &Message) -> Result<(), StoreError> {
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("inbox offline".into()));
        }
        self.inner.create_message(message)
    }
    fn messages_for(&self, nation_id: &str) -> Result<Vec<Message>, StoreError> {
        self.inner.messages_for(nation_id)
    }
}

fn world() -> Faulty {
    let store = Faulty::default();
    let put = |nation: Nation, military: Military| {
        store.inner.put_nation(&nation).unwrap();
        store.inner.put_military(&military).unwrap();
    };
    put(
        Nation::new("a", "Avalon", "alice"),
        Military::new("m-a", "a")
            .with(UnitType::Tanks, 50)
            .with(UnitType::Artillery, 100),
    );
    put(
        Nation::new("b", "Brigadoon", "bob").with_treasury(1_000_000),
        Military::new("m-b", "b").with(UnitType::Soldiers, 1000),
    );
    put(
        Nation::new("c", "Camelot", "carol"),
        Military::new("m-c", "c").with(UnitType::Soldiers, 10),
    );
    put(
        Nation::new("d1", "Dun One", "dave").with_alliance("pact"),
        Military::new("m-d1", "d1"),
    );
    put(
        Nation::new("d2", "Dun Two", "dave"),
        Military::new("m-d2", "d2"),
    );
    put(
        Nation::new("e", "Elysium", "erin").with_alliance("pact"),
        Military::new("m-e", "e").with(UnitType::Soldiers, 5),
    );
    put(
        Nation::new("f", "Fairhaven", "frank").with_alliance("pact"),
        Military::new("m-f", "f"),
    );
    store
}

fn service_with(store: Faulty, config: BalanceConfig, rolls: Rolls) -> WarService<Faulty> {
    WarService::new(store, Arc::new(StaticConfigProvider::new(config)))
        .with_retry_policy(RetryPolicy::new(BackoffConfig::immediate(2)))
        .with_rolls(Arc::new(FixedRolls(rolls)))
}

fn service(rolls: Rolls) -> WarService<Faulty> {
    service_with(world(), BalanceConfig::from_json(BALANCE_JSON).unwrap(), rolls)
}

fn declaration(defender: &str) -> DeclareWar {
    DeclareWar {
        defender_nation_id: defender.to_string(),
        reason: "Border dispute".to_string(),
        war_name: None,
    }
}

fn battle(war_id: &str, attack_type: AttackType, units: &[(UnitType, u64)]) -> ResolveBattle {
    ResolveBattle {
        war_id: war_id.to_string(),
        attack_type: Some(attack_type),
        units_committed: units.iter().copied().collect(),
        selected_target: None,
    }
}

const PINNED: Rolls = Rolls {
    base_roll: 60,
    loot_draw: 0.5,
};

// ============================================================================
// 1. Declaration
// ============================================================================

mod declaration {
    use super::*;

    #[tokio::test]
    async fn test_declares_war_with_full_pools() {
        let service = service(PINNED);
        let war = service.declare_war("alice", declaration("b")).await.unwrap();

        assert_eq!(war.attacker_nation_id, "a");
        assert_eq!(war.defender_nation_id, "b");
        assert_eq!(war.status, WarStatus::Active);
        assert_eq!(war.war_name, "Avalon - Brigadoon War");
        assert_eq!(war.war_reason, "Border dispute");
        assert_eq!(war.attacker_resistance_points, 100.0);
        assert_eq!(war.defender_resistance_points, 100.0);
        assert_eq!(war.attacker_tactical_points, 12);
        assert_eq!(war.defender_tactical_points, 12);
        assert_eq!(war.total_battles, 0);

        let inner = &service.store().inner().inner;
        assert_eq!(inner.get_war(&war.id).unwrap(), Some(war));
        for nation in ["a", "b"] {
            let inbox = inner.messages_for(nation).unwrap();
            assert_eq!(inbox.len(), 1, "one message for {nation}");
            assert_eq!(inbox[0].kind, MessageKind::WarDeclared);
        }
    }

    #[tokio::test]
    async fn test_custom_war_name() {
        let service = service(PINNED);
        let mut request = declaration("b");
        request.war_name = Some("The Great War".to_string());
        let war = service.declare_war("alice", request).await.unwrap();
        assert_eq!(war.war_name, "The Great War");
    }

    #[tokio::test]
    async fn test_caller_resolution_failures() {
        let service = service(PINNED);

        let err = service.declare_war("", declaration("b")).await.unwrap_err();
        assert!(matches!(err, WarError::Unauthenticated));
        assert_eq!(err.http_status(), 401);

        let err = service.declare_war("mallory", declaration("b")).await.unwrap_err();
        assert!(matches!(err, WarError::MissingNation));

        let err = service.declare_war("dave", declaration("b")).await.unwrap_err();
        assert!(matches!(err, WarError::MultipleNations(2)));
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let service = service(PINNED);

        let err = service
            .declare_war("alice", DeclareWar::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WarError::MissingFields(ref f) if f == "defender_nation_id, reason"));

        let err = service.declare_war("alice", declaration("a")).await.unwrap_err();
        assert!(matches!(err, WarError::SelfTarget));

        let err = service.declare_war("alice", declaration("zz")).await.unwrap_err();
        assert!(matches!(err, WarError::NationNotFound(_)));
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn test_already_at_war_in_either_direction() {
        let service = service(PINNED);
        service.declare_war("alice", declaration("b")).await.unwrap();

        let again = service.declare_war("alice", declaration("b")).await.unwrap_err();
        assert!(matches!(again, WarError::AlreadyAtWar(..)));
        assert_eq!(again.http_status(), 409);

        let reverse = service.declare_war("bob", declaration("a")).await.unwrap_err();
        assert!(matches!(reverse, WarError::AlreadyAtWar(..)));

        // Other pairs are unaffected.
        service.declare_war("carol", declaration("b")).await.unwrap();
    }

    #[tokio::test]
    async fn test_ended_war_allows_new_declaration() {
        let service = service(PINNED);
        let mut war = service.declare_war("alice", declaration("b")).await.unwrap();
        war.status = WarStatus::PeaceTreaty;
        service.store().inner().inner.update_war(&war).unwrap();

        service.declare_war("bob", declaration("a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_alliance_members_are_protected() {
        let service = service(PINNED);
        let err = service.declare_war("erin", declaration("f")).await.unwrap_err();
        assert!(matches!(err, WarError::AllianceProtected(..)));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_concurrent_declarations_create_one_war() {
        let service = Arc::new(service(PINNED));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = Arc::clone(&service);
                let (caller, defender) = if i % 2 == 0 { ("alice", "b") } else { ("bob", "a") };
                tokio::spawn(async move { service.declare_war(caller, declaration(defender)).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, WarError::AlreadyAtWar(..))),
            }
        }
        assert_eq!(created, 1);
        let wars = service
            .store()
            .inner()
            .inner
            .find_wars(&WarFilter::between("a", "b"))
            .unwrap();
        assert_eq!(wars.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_notifications_do_not_fail_declaration() {
        let service = service(PINNED);
        service.store().inner().fail_messages.store(true, Ordering::SeqCst);

        let war = service.declare_war("alice", declaration("b")).await.unwrap();
        let inner = &service.store().inner().inner;
        assert!(inner.get_war(&war.id).unwrap().is_some());
        assert!(inner.messages_for("b").unwrap().is_empty());
    }
}

// ============================================================================
// 2. Battle resolution
// ============================================================================

mod resolution {
    use super::*;

    async fn at_war(service: &WarService<Faulty>) -> War {
        service.declare_war("alice", declaration("b")).await.unwrap()
    }

    #[tokio::test]
    async fn test_pinned_ground_battle() {
        let service = service(PINNED);
        let war = at_war(&service).await;

        let outcome = service
            .resolve_battle("alice", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Tanks, 50)]))
            .await
            .unwrap();
        let log = &outcome.battle_log;

        // 500 tank power against 1000 soldiers: ratio 0.5, modifier -15.
        assert_eq!(log.power_ratio, 0.5);
        assert_eq!(log.roll_modifier, -15);
        assert_eq!(log.base_roll, 60);
        assert_eq!(log.final_roll, 45);
        assert_eq!(log.outcome, "pyrrhic_victory");
        assert_eq!(log.resistance_damage, 5.0);
        assert_eq!(log.attacker_losses, BTreeMap::from([(UnitType::Tanks, 3)]));
        assert_eq!(log.defender_losses, BTreeMap::from([(UnitType::Soldiers, 25)]));
        assert_eq!(log.loot_gained, 200);
        assert_eq!(log.battle_number, 1);
        assert_eq!(log.attacker_nation_id, "a");
        assert_eq!(log.defender_nation_id, "b");

        assert_eq!(outcome.war_update.resistance_damage, 5.0);
        assert_eq!(outcome.war_update.new_resistance, 95.0);
        assert_eq!(outcome.war_update.tactical_points_remaining, 9);

        let inner = &service.store().inner().inner;
        assert_eq!(inner.get_military("a").unwrap().unwrap().tanks, 47);
        assert_eq!(inner.get_military("b").unwrap().unwrap().soldiers, 975);
        assert_eq!(inner.get_nation("a").unwrap().unwrap().treasury, 200);
        assert_eq!(inner.get_nation("b").unwrap().unwrap().treasury, 999_800);

        let stored = inner.get_war(&war.id).unwrap().unwrap();
        assert_eq!(stored.defender_resistance_points, 95.0);
        assert_eq!(stored.attacker_resistance_points, 100.0);
        assert_eq!(stored.attacker_tactical_points, 9);
        assert_eq!(stored.total_battles, 1);
        assert_eq!(stored.total_casualties_attacker, 3);
        assert_eq!(stored.total_casualties_defender, 25);

        assert_eq!(inner.battle_logs(&war.id).unwrap(), vec![log.clone()]);
        let reports: Vec<_> = inner
            .messages_for("b")
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == MessageKind::BattleReport)
            .collect();
        assert_eq!(reports.len(), 1);
    }

    #[tokio::test]
    async fn test_defender_can_strike_back() {
        let service = service(PINNED);
        let war = at_war(&service).await;

        let outcome = service
            .resolve_battle("bob", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Soldiers, 500)]))
            .await
            .unwrap();
        let log = &outcome.battle_log;

        // 500 soldiers against 50 tanks and 100 artillery (1300).
        assert_eq!(log.attacker_nation_id, "b");
        assert_eq!(log.defender_nation_id, "a");
        assert_eq!(log.attacker_power, 500.0);
        assert_eq!(log.defender_power, 1300.0);

        let stored = service.store().inner().inner.get_war(&war.id).unwrap().unwrap();
        assert!(stored.attacker_resistance_points < 100.0);
        assert_eq!(stored.defender_resistance_points, 100.0);
        assert_eq!(stored.defender_tactical_points, 9);
        assert_eq!(stored.attacker_tactical_points, 12);
        assert_eq!(stored.total_casualties_defender, log.attacker_losses.values().sum::<u64>());
    }

    #[tokio::test]
    async fn test_insufficient_units_mutate_nothing() {
        let service = service(PINNED);
        let war = at_war(&service).await;

        let err = service
            .resolve_battle("alice", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Tanks, 51)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WarError::Battle(nation_wars_core::BattleError::InsufficientUnits {
                unit_type: UnitType::Tanks,
                available: 50,
                requested: 51,
            })
        ));
        assert_eq!(err.http_status(), 400);

        let inner = &service.store().inner().inner;
        assert_eq!(inner.get_war(&war.id).unwrap(), Some(war.clone()));
        assert_eq!(inner.get_military("a").unwrap().unwrap().tanks, 50);
        assert_eq!(inner.battle_log_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let service = service(PINNED);
        let war = at_war(&service).await;

        let err = service
            .resolve_battle("alice", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Tanks, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WarError::MissingFields(ref f) if f == "units_committed"));

        let err = service
            .resolve_battle("alice", ResolveBattle::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WarError::MissingFields(ref f) if f == "war_id, attack_type, units_committed"));
    }

    #[tokio::test]
    async fn test_war_lookup_failures() {
        let service = service(PINNED);
        let mut war = at_war(&service).await;
        let units = [(UnitType::Soldiers, 1)];

        let err = service
            .resolve_battle("alice", battle("nope", AttackType::GroundBattle, &units))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 404);

        let err = service
            .resolve_battle("carol", battle(&war.id, AttackType::GroundBattle, &units))
            .await
            .unwrap_err();
        assert!(matches!(err, WarError::NotCombatant { .. }));

        war.status = WarStatus::Ceasefire;
        service.store().inner().inner.update_war(&war).unwrap();
        let err = service
            .resolve_battle("bob", battle(&war.id, AttackType::GroundBattle, &units))
            .await
            .unwrap_err();
        assert!(matches!(err, WarError::WarNotActive { status: WarStatus::Ceasefire, .. }));
    }

    #[tokio::test]
    async fn test_misconfigured_attack_type() {
        let config = BalanceConfig::from_json(
            r#"{
                "success_levels": {
                    "ground_battle": [{"name": "hit", "min_roll": 1, "max_roll": 200, "multiplier": 1.0}]
                },
                "max_resistance_damage_per_attack": {"ground_battle": 10},
                "action_point_costs": {"ground_battle": 3}
            }"#,
        )
        .unwrap();
        let service = service_with(world(), config, PINNED);
        let war = at_war(&service).await;

        let err = service
            .resolve_battle("alice", battle(&war.id, AttackType::Bombardment, &[(UnitType::Artillery, 10)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WarError::Battle(nation_wars_core::BattleError::MisconfiguredAttackType {
                attack_type: AttackType::Bombardment,
                ..
            })
        ));
        assert_eq!(service.store().inner().inner.battle_log_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_uncovered_roll_uses_first_level() {
        let config = BalanceConfig::from_json(
            r#"{
                "success_levels": {
                    "ground_battle": [
                        {"name": "low", "min_roll": 1, "max_roll": 10, "multiplier": 0.0},
                        {"name": "high", "min_roll": 150, "max_roll": 200, "multiplier": 2.0}
                    ]
                },
                "max_resistance_damage_per_attack": {"ground_battle": 10},
                "action_point_costs": {"ground_battle": 3}
            }"#,
        )
        .unwrap();
        let service = service_with(world(), config, PINNED);
        let war = at_war(&service).await;

        let outcome = service
            .resolve_battle("alice", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Tanks, 10)]))
            .await
            .unwrap();
        assert_eq!(outcome.battle_log.outcome, "low");
        assert_eq!(outcome.war_update.resistance_damage, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_battles_are_serialized() {
        let service = Arc::new(service(PINNED));
        let war = at_war(&service).await;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = Arc::clone(&service);
                let war_id = war.id.clone();
                tokio::spawn(async move {
                    service
                        .resolve_battle("alice", battle(&war_id, AttackType::Bombardment, &[(UnitType::Artillery, 5)]))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let inner = &service.store().inner().inner;
        let stored = inner.get_war(&war.id).unwrap().unwrap();
        assert_eq!(stored.total_battles, 10);
        assert_eq!(stored.attacker_tactical_points, 0);

        let numbers: Vec<u32> = inner
            .battle_logs(&war.id)
            .unwrap()
            .iter()
            .map(|l| l.battle_number)
            .collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<_>>());

        // Casualty totals match the soldiers actually removed.
        let soldiers = inner.get_military("b").unwrap().unwrap().soldiers;
        assert_eq!(stored.total_casualties_defender, 1000 - soldiers);
    }

    #[tokio::test]
    async fn test_failure_after_first_write_requires_reconciliation() {
        let service = service(PINNED);
        let war = at_war(&service).await;
        service.store().inner().fail_war_updates.store(true, Ordering::SeqCst);

        let err = service
            .resolve_battle("alice", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Tanks, 50)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WarError::ReconciliationRequired { stage: "war", .. }));
        assert_eq!(err.http_status(), 500);

        // Earlier writes stay; no log was written.
        let inner = &service.store().inner().inner;
        assert_eq!(inner.get_military("a").unwrap().unwrap().tanks, 47);
        assert_eq!(inner.battle_log_count().unwrap(), 0);
        assert_eq!(inner.get_war(&war.id).unwrap().unwrap().total_battles, 0);
    }
}

// ============================================================================
// 3. Command surface
// ============================================================================

mod commands {
    use super::*;
    use serde_json::{json, Value};

    async fn send(service: &WarService<Faulty>, request: Value) -> Value {
        serde_json::from_str(&service.handle_line(&request.to_string()).await).unwrap()
    }

    #[tokio::test]
    async fn test_declare_and_battle_round_trip() {
        let service = service(PINNED);

        let declared = send(
            &service,
            json!({"caller": "alice", "command": "declare_war", "payload": {"defender_nation_id": "b", "reason": "Border dispute"}}),
        )
        .await;
        assert_eq!(declared["success"], true);
        assert_eq!(declared["status"], 200);
        let war_id = declared["war"]["id"].as_str().unwrap().to_string();

        let fought = send(
            &service,
            json!({
                "caller": "alice",
                "command": "resolve_battle",
                "payload": {"war_id": war_id, "attack_type": "ground_battle", "units_committed": {"tanks": 50}}
            }),
        )
        .await;
        assert_eq!(fought["success"], true);
        assert_eq!(fought["battle_log"]["outcome"], "pyrrhic_victory");
        assert_eq!(fought["war_update"]["new_resistance"], 95.0);
        assert_eq!(fought["war_update"]["tactical_points_remaining"], 9);
    }

    #[tokio::test]
    async fn test_failures_carry_status() {
        let service = service(PINNED);

        let unknown_unit = send(
            &service,
            json!({"caller": "alice", "command": "resolve_battle", "payload": {"war_id": "w", "attack_type": "ground_battle", "units_committed": {"dragons": 5}}}),
        )
        .await;
        assert_eq!(unknown_unit["success"], false);
        assert_eq!(unknown_unit["status"], 400);

        let unauthenticated = send(
            &service,
            json!({"command": "declare_war", "payload": {"defender_nation_id": "b", "reason": "r"}}),
        )
        .await;
        assert_eq!(unauthenticated["status"], 401);
        assert_eq!(unauthenticated["error_kind"], "authentication");

        let unknown_command = send(&service, json!({"caller": "alice", "command": "annex"})).await;
        assert_eq!(unknown_command["status"], 400);

        let garbage: Value = serde_json::from_str(&service.handle_line("{ not json").await).unwrap();
        assert_eq!(garbage["success"], false);
        assert_eq!(garbage["status"], 400);
    }
}

// ============================================================================
// 4. Records owned by the game
// ============================================================================

mod game_records {
    use super::*;
    use nation_wars_store::SqliteStore;
    use rusqlite::{params, Connection};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    /// Nation and military rows as the game writes them, with fields the
    /// war engine does not model.
    fn seeded_sqlite(dir: &TempDir) -> SqliteStore {
        let path = dir.path().join("game.db");
        let store = SqliteStore::open(&path).unwrap();
        let conn = Connection::open(&path).unwrap();
        let nations = [
            ("a", "alice", json!({"id": "a", "name": "Avalon", "owner": "alice", "treasury": 0, "flag": "red"})),
            (
                "b",
                "bob",
                json!({"id": "b", "name": "Brigadoon", "owner": "bob", "treasury": 1000000.75, "population": 52000, "gdp": 9.5}),
            ),
        ];
        for (id, owner, raw) in nations {
            conn.execute(
                "INSERT INTO nations (id, owner, raw) VALUES (?1, ?2, ?3)",
                params![id, owner, raw.to_string()],
            )
            .unwrap();
        }
        let militaries = [
            ("a", json!({"id": "m-a", "nation_id": "a", "tanks": 50, "artillery": 100, "supply": "full"})),
            // No identity fields at all.
            ("b", json!({"soldiers": 1000, "morale": 0.7})),
        ];
        for (nation_id, raw) in militaries {
            conn.execute(
                "INSERT INTO militaries (nation_id, raw) VALUES (?1, ?2)",
                params![nation_id, raw.to_string()],
            )
            .unwrap();
        }
        store
    }

    fn raw_row(dir: &TempDir, sql: &str, key: &str) -> Value {
        let conn = Connection::open(dir.path().join("game.db")).unwrap();
        let raw: String = conn.query_row(sql, params![key], |row| row.get(0)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_battle_keeps_unmodelled_fields_and_fractions() {
        let dir = TempDir::new().unwrap();
        let config = BalanceConfig::from_json(BALANCE_JSON).unwrap();
        let service = WarService::new(seeded_sqlite(&dir), Arc::new(StaticConfigProvider::new(config)))
            .with_retry_policy(RetryPolicy::new(BackoffConfig::immediate(2)))
            .with_rolls(Arc::new(FixedRolls(PINNED)));

        let war = service.declare_war("alice", declaration("b")).await.unwrap();
        let outcome = service
            .resolve_battle("alice", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Tanks, 50)]))
            .await
            .unwrap();
        assert_eq!(outcome.battle_log.loot_gained, 200);
        assert_eq!(outcome.battle_log.defender_nation_name, "Brigadoon");

        let b = raw_row(&dir, "SELECT raw FROM nations WHERE id = ?1", "b");
        assert_eq!(b["treasury"], json!(999800.75));
        assert_eq!(b["population"], json!(52000));
        assert_eq!(b["gdp"], json!(9.5));
        let a = raw_row(&dir, "SELECT raw FROM nations WHERE id = ?1", "a");
        assert_eq!(a["treasury"], json!(200));
        assert_eq!(a["flag"], json!("red"));

        let mb = raw_row(&dir, "SELECT raw FROM militaries WHERE nation_id = ?1", "b");
        assert_eq!(mb["soldiers"], json!(975));
        assert_eq!(mb["morale"], json!(0.7));
        let ma = raw_row(&dir, "SELECT raw FROM militaries WHERE nation_id = ?1", "a");
        assert_eq!(ma["tanks"], json!(47));
        assert_eq!(ma["artillery"], json!(100));
        assert_eq!(ma["supply"], json!("full"));
    }

    #[tokio::test]
    async fn test_unmodelled_fields_survive_a_memory_battle() {
        let store = world();
        let mut nation = store.inner.get_nation("b").unwrap().unwrap();
        nation.extra.insert("population".to_string(), Value::from(52000));
        store.inner.put_nation(&nation).unwrap();
        let service = service_with(store, BalanceConfig::from_json(BALANCE_JSON).unwrap(), PINNED);

        let war = service.declare_war("alice", declaration("b")).await.unwrap();
        service
            .resolve_battle("alice", battle(&war.id, AttackType::GroundBattle, &[(UnitType::Tanks, 50)]))
            .await
            .unwrap();

        let stored = service.store().inner().inner.get_nation("b").unwrap().unwrap();
        assert_eq!(stored.treasury, 999_800);
        assert_eq!(stored.extra.get("population"), Some(&Value::from(52000)));
    }
}
