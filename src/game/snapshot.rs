//! Snapshot building: project visible registry state into wire records.

use tracing::warn;

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::game::components::{Health, KindTag, Position, Sprite};
use crate::net::protocol::{EntityRecord, Snapshot, MAX_SNAPSHOT_ENTITIES};

/// Builds the tick's snapshot. Visibility predicate: a live entity with
/// both a position and a sprite. Records come out in entity id order, so
/// identical registry state always yields an identical snapshot.
pub fn build(registry: &Registry, tick: u64) -> Snapshot {
    let mut entities = Vec::new();
    registry.for_each2::<Position, Sprite>(|entity, pos, sprite| {
        let health = registry
            .get::<Health>(entity)
            .map(|h| h.hp.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            .unwrap_or(-1);
        let kind = registry
            .get::<KindTag>(entity)
            .map(|k| k.0.code())
            .unwrap_or(0);
        entities.push(EntityRecord {
            id: entity.raw(),
            pos: pos.0,
            sprite: sprite.id,
            frame: sprite.frame,
            health,
            kind,
        });
    });
    if entities.len() > MAX_SNAPSHOT_ENTITIES {
        warn!(
            tick,
            dropped = entities.len() - MAX_SNAPSHOT_ENTITIES,
            "snapshot over entity limit; truncating"
        );
        entities.truncate(MAX_SNAPSHOT_ENTITIES);
    }
    Snapshot { tick, entities }
}

/// Convenience for tests and tools: the record for one entity, if visible.
pub fn record_for(snapshot: &Snapshot, entity: Entity) -> Option<&EntityRecord> {
    snapshot.entities.iter().find(|r| r.id == entity.raw())
}
