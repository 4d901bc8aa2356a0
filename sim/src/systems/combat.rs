//! Combat system - turns move intents into melee attacks.
//!
//! A move intent whose target tile holds another entity with both `Combat`
//! and `Health` becomes an attack and never reaches movement. The attack
//! hits when a uniform roll in [0, 1) is at or under the hit chance; the
//! margin of the hit, in percent, must beat the defender's armor for damage
//! to land, and every point beyond the armor adds a fifth of a point.

use crate::components::*;
use crate::signals::{MoveIntents, SimRng};
use crate::spatial::SpatialIndex;
use bevy_ecs::prelude::*;
use rand::Rng;

/// Combat configuration constants.
const BASE_HIT_CHANCE: f64 = 0.5;
const DISPARITY_MODIFIER: f64 = 0.5;
const OVER_DAMAGE_FACTOR: f64 = 0.2;

/// How a single swing played out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Miss,
    /// Connected but did not beat the defender's armor.
    Absorbed,
    Hit { damage: i32 },
}

/// Chance for `attacker` to connect with `defender`.
///
/// The result is not clamped: a much better fighter can exceed 1.0. The
/// defender's skill is floored at 1 only to keep the division defined when a
/// stat block carries zero or negative skill.
pub fn hit_chance(attacker: &Combat, defender: &Combat) -> f64 {
    let ratio = f64::from(attacker.skill) / f64::from(defender.skill.max(1));
    BASE_HIT_CHANCE + (ratio - 1.0) * DISPARITY_MODIFIER
}

/// Resolve one swing for a given roll in [0, 1).
pub fn resolve_attack(attacker: &Combat, defender: &Combat, roll: f64) -> AttackOutcome {
    let chance = hit_chance(attacker, defender);
    if roll > chance {
        return AttackOutcome::Miss;
    }
    let power = (chance - roll) * 100.0;
    let armor = f64::from(defender.armor);
    if power <= armor {
        return AttackOutcome::Absorbed;
    }
    let damage = (f64::from(attacker.damage) + (power - armor) * OVER_DAMAGE_FACTOR).round() as i32;
    AttackOutcome::Hit { damage }
}

/// System that resolves melee for every mover with a combat stat block.
///
/// ## Data Access
/// - Reads: SpatialIndex, Combat
/// - Writes: MoveIntents (consumes intents that became attacks), Health
pub fn combat_system(
    mut intents: ResMut<MoveIntents>,
    mut rng: ResMut<SimRng>,
    index: Res<SpatialIndex>,
    attackers: Query<&Combat>,
    mut defenders: Query<(&Combat, &mut Health)>,
) {
    for intent in intents.snapshot() {
        let Ok(attacker) = attackers.get(intent.entity) else {
            continue;
        };

        // The last matching occupant defends the tile.
        let Some(defender) = index
            .at(&intent.target)
            .iter()
            .rev()
            .copied()
            .find(|e| *e != intent.entity && defenders.contains(*e))
        else {
            continue;
        };

        let Ok((defender_stats, mut health)) = defenders.get_mut(defender) else {
            continue;
        };

        let roll: f64 = rng.0.gen();
        match resolve_attack(attacker, defender_stats, roll) {
            AttackOutcome::Hit { damage } => {
                health.damage(damage);
                tracing::debug!(
                    attacker = ?intent.entity,
                    ?defender,
                    damage,
                    remaining = health.current,
                    "melee hit"
                );
            }
            outcome => {
                tracing::debug!(attacker = ?intent.entity, ?defender, ?outcome, "melee no damage");
            }
        }

        // Converted into an attack whether or not it connected.
        intents.consume(intent.entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::spatial_index_update_system;

    fn setup() -> World {
        let mut world = World::new();
        world.insert_resource(SpatialIndex::new());
        world.insert_resource(MoveIntents::default());
        world.insert_resource(SimRng::seeded(7));
        world
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems((spatial_index_update_system, combat_system).chain());
        schedule.run(world);
    }

    #[test]
    fn test_hit_chance_formula() {
        let even = Combat::new(6, 4, 0);
        assert!((hit_chance(&even, &even) - 0.5).abs() < 1e-12);
        let strong = Combat::new(12, 4, 0);
        assert!((hit_chance(&strong, &even) - 1.0).abs() < 1e-12);
        let weak = Combat::new(3, 4, 0);
        assert!((hit_chance(&weak, &even) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_unskilled_defender_guards_division() {
        let attacker = Combat::new(6, 4, 0);
        let floored = hit_chance(&attacker, &Combat::new(1, 0, 0));
        assert_eq!(hit_chance(&attacker, &Combat::new(0, 0, 0)), floored);
        assert_eq!(hit_chance(&attacker, &Combat::new(-3, 0, 0)), floored);
        assert!(floored.is_finite());
    }

    #[test]
    fn test_resolve_attack_damage() {
        let attacker = Combat::new(8, 5, 0);
        let defender = Combat::new(8, 0, 4);
        // chance 0.5, roll 0.1 -> power 40, over armor 36 -> 5 + 7.2
        assert_eq!(
            resolve_attack(&attacker, &defender, 0.1),
            AttackOutcome::Hit { damage: 12 }
        );
        // power 3 does not beat armor 4
        assert_eq!(resolve_attack(&attacker, &defender, 0.47), AttackOutcome::Absorbed);
        assert_eq!(resolve_attack(&attacker, &defender, 0.9), AttackOutcome::Miss);
    }

    #[test]
    fn test_equal_skill_connects_half_the_time() {
        let mut rng = SimRng::seeded(1234);
        let fighter = Combat::new(5, 3, 0);
        let trials = 10_000;
        let connected = (0..trials)
            .filter(|_| resolve_attack(&fighter, &fighter, rng.0.gen()) != AttackOutcome::Miss)
            .count();
        let rate = connected as f64 / trials as f64;
        assert!((rate - 0.5).abs() <= 0.03, "rate was {rate}");
    }

    #[test]
    fn test_attack_consumes_intent() {
        let mut world = setup();
        let attacker = world
            .spawn((Position::tile(0, 0), Combat::new(8, 5, 4), Health::new(100)))
            .id();
        let defender = world
            .spawn((Position::tile(1, 0), Combat::new(6, 4, 0), Health::new(10)))
            .id();
        world
            .resource_mut::<MoveIntents>()
            .push(attacker, Position::tile(1, 0));

        run(&mut world);

        assert!(world.resource::<MoveIntents>().is_empty());
        assert!(world.get::<Health>(defender).unwrap().current <= 10);
        assert_eq!(world.get::<Position>(attacker), Some(&Position::tile(0, 0)));
    }

    #[test]
    fn test_no_defender_passes_through() {
        let mut world = setup();
        let mover = world
            .spawn((Position::tile(0, 0), Combat::new(8, 5, 4), Health::new(100)))
            .id();
        // A wall has no combat stats and is not a defender.
        world.spawn(WallBundle::new(1, 0));
        world
            .resource_mut::<MoveIntents>()
            .push(mover, Position::tile(1, 0));

        run(&mut world);

        assert_eq!(
            world.resource::<MoveIntents>().target_of(mover),
            Some(Position::tile(1, 0))
        );
    }
}
