//! Damage and healing.

use crate::actions::GameEvent;
use crate::board::TileId;
use crate::config::BossConfig;
use crate::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};

/// Where damage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    AttackTile(TileId),
    NegaTile(TileId),
    Boss(TileId),
}

/// The boss of the boss sub-mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossState {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
}

impl BossState {
    pub fn from_config(config: &BossConfig) -> Self {
        Self {
            name: config.name.clone(),
            hp: config.max_hp,
            max_hp: config.max_hp,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}

/// Apply damage to a player after their flat defense. Emits a damage event
/// even when everything was blocked, and a death event when hit points reach
/// zero. Returns the new hit points.
pub fn apply_damage(
    target: &mut Player,
    amount: u32,
    source: DamageSource,
    events: &mut Vec<GameEvent>,
) -> u32 {
    let dealt = amount.saturating_sub(target.defense);
    let was_alive = target.hp > 0;
    target.hp = target.hp.saturating_sub(dealt);

    events.push(GameEvent::DamageTaken {
        player: target.id,
        amount,
        dealt,
        hp: target.hp,
        source,
    });

    if was_alive && target.hp == 0 {
        target.is_eliminated = true;
        events.push(GameEvent::PlayerDied { player: target.id });
    }

    target.hp
}

/// Restore hit points up to the maximum. Returns the new hit points.
pub fn heal(target: &mut Player, amount: u32, events: &mut Vec<GameEvent>) -> u32 {
    let before = target.hp;
    target.hp = target.hp.saturating_add(amount).min(target.max_hp);

    events.push(GameEvent::Healed {
        player: target.id,
        amount: target.hp - before,
        hp: target.hp,
    });

    target.hp
}

/// Damage the boss. Bosses have no defense. Returns the boss's new hit points.
pub fn strike_boss(
    boss: &mut BossState,
    attacker: PlayerId,
    amount: u32,
    events: &mut Vec<GameEvent>,
) -> u32 {
    let was_alive = !boss.is_defeated();
    boss.hp = boss.hp.saturating_sub(amount);

    events.push(GameEvent::BossDamaged {
        by: attacker,
        amount,
        hp: boss.hp,
    });

    if was_alive && boss.is_defeated() {
        events.push(GameEvent::BossDefeated { by: attacker });
    }

    boss.hp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(hp: u32, defense: u32) -> Player {
        let mut p = Player::new(0, "Test".to_string(), 20);
        p.hp = hp;
        p.defense = defense;
        p
    }

    #[test]
    fn test_defense_mitigates() {
        let mut target = player(20, 2);
        let mut events = Vec::new();
        assert_eq!(apply_damage(&mut target, 5, DamageSource::AttackTile(12), &mut events), 17);
        assert!(matches!(
            events[0],
            GameEvent::DamageTaken {
                amount: 5,
                dealt: 3,
                hp: 17,
                ..
            }
        ));
    }

    #[test]
    fn test_fully_blocked_damage_still_reported() {
        let mut target = player(20, 5);
        let mut events = Vec::new();
        apply_damage(&mut target, 3, DamageSource::NegaTile(22), &mut events);
        assert_eq!(target.hp, 20);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GameEvent::DamageTaken { dealt: 0, .. }));
    }

    #[test]
    fn test_lethal_damage_eliminates_once() {
        let mut target = player(3, 0);
        let mut events = Vec::new();
        apply_damage(&mut target, 10, DamageSource::Boss(50), &mut events);
        assert_eq!(target.hp, 0);
        assert!(target.is_eliminated);
        assert!(events.contains(&GameEvent::PlayerDied { player: 0 }));

        events.clear();
        apply_damage(&mut target, 10, DamageSource::Boss(50), &mut events);
        assert!(!events.contains(&GameEvent::PlayerDied { player: 0 }));
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut target = player(18, 0);
        let mut events = Vec::new();
        assert_eq!(heal(&mut target, 5, &mut events), 20);
        assert_eq!(
            events,
            vec![GameEvent::Healed {
                player: 0,
                amount: 2,
                hp: 20
            }]
        );
    }

    #[test]
    fn test_boss_has_no_defense() {
        let mut boss = BossState::from_config(&BossConfig {
            name: "Boss".to_string(),
            max_hp: 8,
            player_strike: 5,
        });
        let mut events = Vec::new();
        assert_eq!(strike_boss(&mut boss, 1, 5, &mut events), 3);
        assert_eq!(strike_boss(&mut boss, 1, 5, &mut events), 0);
        assert!(events.contains(&GameEvent::BossDefeated { by: 1 }));
    }
}
