//! Interaction scan and blocking rollback.
//!
//! [`interaction_scan`] visits every unordered pair of active events once,
//! outer index ascending, then inner index ascending. For each pair it
//! rebuilds collisions, maintains reachability and, when the pair blocks,
//! rolls back moves with [`resolve_blocking`]. After the inner loop of an
//! event is done, a surviving move is checked once more against every
//! earlier event at its settled position ([`settle_against`]), then against
//! the map polygons ([`scan_polygon`]), and committed.
//!
//! The evaluation order is the tie-break: when two events walk into each
//! other the earlier one is stopped, unless the later one would still run
//! into it, in which case the later one is stopped instead.

use bevy_ecs::prelude::*;
use log::{debug, warn};

use crate::components::eventobject::EventObject;
use crate::components::interaction::Interaction;
use crate::components::movehandler::MoveHandler;
use crate::components::polygon::PolygonObject;
use crate::resources::activeevents::ActiveEvents;
use crate::resources::blockingrules::BlockingRules;

/// Which moves of a blocking pair were rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    None,
    /// The outer (earlier in list order) event.
    First,
    /// The inner event.
    Second,
    Both,
}

/// One side of a pair during the scan.
pub struct PairSide<'a> {
    pub event: &'a mut EventObject,
    pub interaction: &'a mut Interaction,
    pub mover: &'a mut MoveHandler,
}

pub fn interaction_scan(
    active: Res<ActiveEvents>,
    rules: Option<Res<BlockingRules>>,
    mut query: Query<(&mut EventObject, &mut Interaction, &mut MoveHandler)>,
    polygons: Query<&PolygonObject>,
) {
    let default_rules = BlockingRules::default();
    let rules = rules.as_deref().unwrap_or(&default_rules);
    let entities = active.entities();

    for (i, &first) in entities.iter().enumerate() {
        for &second in &entities[i + 1..] {
            let Ok([a, b]) = query.get_many_mut([first, second]) else {
                warn!("Skipping pair {:?}/{:?}: missing event data", first, second);
                continue;
            };
            let (mut a_event, mut a_interaction, mut a_mover) = a;
            let (mut b_event, mut b_interaction, mut b_mover) = b;
            let rollback = scan_pair(
                PairSide {
                    event: &mut a_event,
                    interaction: &mut a_interaction,
                    mover: &mut a_mover,
                },
                PairSide {
                    event: &mut b_event,
                    interaction: &mut b_interaction,
                    mover: &mut b_mover,
                },
                rules,
            );
            if rollback != Rollback::None {
                debug!("{} / {}: rolled back {:?}", *a_event, *b_event, rollback);
            }
        }

        // Earlier events may have been rolled back after their pair with
        // `first` was scanned.
        let moves = query.get(first).is_ok_and(|(event, _, _)| event.moves);
        if moves {
            for &earlier in &entities[..i] {
                let Ok([a, b]) = query.get_many_mut([first, earlier]) else {
                    continue;
                };
                let (mut a_event, mut a_interaction, mut a_mover) = a;
                let (b_event, _, _) = b;
                let stopped = settle_against(
                    PairSide {
                        event: &mut a_event,
                        interaction: &mut a_interaction,
                        mover: &mut a_mover,
                    },
                    &b_event,
                    rules,
                );
                if stopped {
                    debug!("{}: blocked by settled {}", *a_event, *b_event);
                    break;
                }
            }
        }

        if let Ok((mut event, mut interaction, mut mover)) = query.get_mut(first) {
            for &polygon_entity in active.polygons() {
                let Ok(polygon) = polygons.get(polygon_entity) else {
                    continue;
                };
                let side = PairSide {
                    event: &mut event,
                    interaction: &mut interaction,
                    mover: &mut mover,
                };
                if scan_polygon(side, polygon) {
                    debug!("{}: blocked by polygon {}", *event, polygon);
                }
            }
            event.commit_move();
        }
    }

    for (_, interaction, _) in query.iter() {
        interaction.prune_touching();
    }
}

/// Update the interaction lists of one pair and resolve blocking.
pub fn scan_pair(a: PairSide<'_>, b: PairSide<'_>, rules: &BlockingRules) -> Rollback {
    let a_id = a.event.id;
    let b_id = b.event.id;

    if a.event.overlaps(b.event) {
        a.interaction.add_collision(b_id);
        b.interaction.add_collision(a_id);
        if b.event.pushable {
            a.interaction.add_reachable(b_id);
        }
        if a.event.pushable {
            b.interaction.add_reachable(a_id);
        }
        if rules.blocks(a.event, b.event) {
            return resolve_blocking(a, b);
        }
        return Rollback::None;
    }

    // Contact episode over, the next touch fires again.
    a.interaction.just_touching.remove(b_id);
    b.interaction.just_touching.remove(a_id);

    let may_reach = a.event.pushable
        || b.event.pushable
        || !a.interaction.reachable.is_empty()
        || !b.interaction.reachable.is_empty();
    if may_reach {
        update_reach(a.event, a.interaction, b.event);
        update_reach(b.event, b.interaction, a.event);
    }
    Rollback::None
}

/// Stop a moving `a` whose proposed bound overlaps the settled bound of
/// `settled`, an event earlier in list order that is already committed.
pub fn settle_against(a: PairSide<'_>, settled: &EventObject, rules: &BlockingRules) -> bool {
    if !a.event.moves || !a.event.overlaps(settled) || !rules.blocks(a.event, settled) {
        return false;
    }
    a.event.moves = false;
    a.mover.move_blocked(a.event);
    true
}

/// Check one event against the edges of a polygon.
///
/// Input-consuming events record touchable polygons in their collision list.
/// A moving event whose proposed bound crosses an edge is rolled back when
/// the polygon's blocking rank blocks it. Returns whether it was rolled
/// back.
pub fn scan_polygon(a: PairSide<'_>, polygon: &PolygonObject) -> bool {
    let touching = a.event.intersects_polygon(polygon);
    if polygon.touchable && a.event.consume_input {
        if touching {
            a.interaction.add_collision(polygon.id);
        } else {
            a.interaction.just_touching.remove(polygon.id);
        }
    }
    if touching && a.event.moves && polygon.blocking.blocks(a.event.blocking) {
        a.event.moves = false;
        a.mover.move_blocked(a.event);
        return true;
    }
    false
}

fn update_reach(viewer: &EventObject, interaction: &mut Interaction, target: &EventObject) {
    if !viewer.reaches(target) {
        interaction.remove_reachable(target.id);
    } else if target.pushable {
        interaction.add_reachable(target.id);
    }
}

/// Roll back moves of an overlapping, blocking pair.
///
/// `a` is the event earlier in list order. A moving `a` is stopped first,
/// unless `b` is also moving and would still overlap a stationary `a`: then
/// `b` is stopped instead, and `a` only as well if the pair still overlaps.
/// Every rolled back policy is told through `move_blocked`.
pub fn resolve_blocking(a: PairSide<'_>, b: PairSide<'_>) -> Rollback {
    if a.event.moves {
        a.event.moves = false;
        if b.event.moves && a.event.overlaps(b.event) {
            a.event.moves = true;
            b.event.moves = false;
            b.mover.move_blocked(b.event);
            if a.event.overlaps(b.event) {
                a.event.moves = false;
                a.mover.move_blocked(a.event);
                return Rollback::Both;
            }
            return Rollback::Second;
        }
        a.mover.move_blocked(a.event);
        return Rollback::First;
    }
    if b.event.moves {
        b.event.moves = false;
        b.mover.move_blocked(b.event);
        return Rollback::Second;
    }
    Rollback::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::blocking::BlockingBehavior;
    use crate::components::eventobject::{EventId, EventKind};
    use crate::components::rect::Rect;
    use glam::Vec2;

    struct Side {
        event: EventObject,
        interaction: Interaction,
        mover: MoveHandler,
    }

    impl Side {
        fn new(id: u32, x: f32) -> Self {
            Self {
                event: EventObject::new(EventId(id), Rect::new(x, 0.0, 10.0, 10.0))
                    .with_blocking(BlockingBehavior::PassesNoBarrier),
                interaction: Interaction::default(),
                mover: MoveHandler::default(),
            }
        }

        fn side(&mut self) -> PairSide<'_> {
            PairSide {
                event: &mut self.event,
                interaction: &mut self.interaction,
                mover: &mut self.mover,
            }
        }
    }

    fn scan(a: &mut Side, b: &mut Side) -> Rollback {
        scan_pair(a.side(), b.side(), &BlockingRules::none())
    }

    #[test]
    fn static_overlap_rolls_nothing_back() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 5.0);
        assert_eq!(scan(&mut a, &mut b), Rollback::None);
        assert_eq!(a.interaction.collision.as_slice(), &[EventId(2)]);
        assert_eq!(b.interaction.collision.as_slice(), &[EventId(1)]);
    }

    #[test]
    fn mover_into_stationary_is_stopped() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 12.0);
        a.event.offer_move(5.0, 0.0);
        assert_eq!(scan(&mut a, &mut b), Rollback::First);
        assert!(!a.event.moves);
        assert!(!a.event.commit_move());
        assert_eq!(a.event.position().x, 0.0);
    }

    #[test]
    fn inner_mover_into_stationary_is_stopped() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 12.0);
        b.event.offer_move(-5.0, 0.0);
        assert_eq!(scan(&mut a, &mut b), Rollback::Second);
        assert!(!b.event.moves);
    }

    #[test]
    fn single_sided_resolution_keeps_first_move() {
        // `a` backs off, `b` follows too far. Stopping `b` is enough.
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 12.0);
        a.event.offer_move(-4.0, 0.0);
        b.event.offer_move(-10.0, 0.0);
        assert_eq!(scan(&mut a, &mut b), Rollback::Second);
        assert!(a.event.moves);
        assert!(!b.event.moves);
    }

    #[test]
    fn head_on_collision_rolls_back_both() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 12.0);
        a.event.offer_move(5.0, 0.0);
        b.event.offer_move(-5.0, 0.0);
        assert_eq!(scan(&mut a, &mut b), Rollback::Both);
        assert!(!a.event.moves);
        assert!(!b.event.moves);
    }

    #[test]
    fn exempt_pair_collides_without_rollback() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 12.0);
        a.event.kind = EventKind::Player;
        b.event.kind = EventKind::Player;
        a.event.offer_move(5.0, 0.0);
        let rollback = scan_pair(a.side(), b.side(), &BlockingRules::default());
        assert_eq!(rollback, Rollback::None);
        assert!(a.event.moves);
        assert_eq!(a.interaction.collision.as_slice(), &[EventId(2)]);
    }

    #[test]
    fn low_ranks_never_block() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 12.0);
        a.event.blocking = BlockingBehavior::FlyingHigh;
        a.event.offer_move(5.0, 0.0);
        assert_eq!(scan(&mut a, &mut b), Rollback::None);
        assert!(a.event.moves);
    }

    #[test]
    fn overlap_adds_pushable_partner_once() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 5.0);
        b.event.pushable = true;
        scan(&mut a, &mut b);
        scan(&mut a, &mut b);
        assert_eq!(a.interaction.reachable.as_slice(), &[EventId(2)]);
        assert!(b.interaction.reachable.is_empty());
    }

    #[test]
    fn reach_follows_distance() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 15.0);
        b.event.pushable = true;
        scan(&mut a, &mut b);
        assert_eq!(a.interaction.reachable.as_slice(), &[EventId(2)]);
        assert!(a.interaction.collision.is_empty());

        b.event.force_move_to(40.0, 0.0);
        scan(&mut a, &mut b);
        assert!(a.interaction.reachable.is_empty());
    }

    #[test]
    fn separation_ends_touch_episode() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, 30.0);
        a.interaction.just_touching.insert(EventId(2));
        b.interaction.just_touching.insert(EventId(1));
        scan(&mut a, &mut b);
        assert!(a.interaction.just_touching.is_empty());
        assert!(b.interaction.just_touching.is_empty());
    }

    // ==================== SETTLED RE-CHECK ====================

    #[test]
    fn mover_is_stopped_by_settled_neighbour() {
        let mut a = Side::new(1, 0.0);
        let mut b = Side::new(2, -12.0);
        b.event.offer_move(5.0, 0.0);
        assert!(settle_against(b.side(), &a.event, &BlockingRules::none()));
        assert!(!b.event.moves);
        assert!(!a.event.overlaps(&b.event));
        a.event.blocking = BlockingBehavior::FlyingHigh;
        b.event.offer_move(5.0, 0.0);
        assert!(!settle_against(b.side(), &a.event, &BlockingRules::none()));
        assert!(b.event.moves);
    }

    // ==================== POLYGONS ====================

    fn wall(x: f32) -> PolygonObject {
        PolygonObject::new(EventId(90), vec![Vec2::new(x, -20.0), Vec2::new(x, 20.0)]).unwrap()
    }

    #[test]
    fn polygon_edge_stops_blocked_mover() {
        let mut a = Side::new(1, 0.0);
        a.event.offer_move(5.0, 0.0);
        assert!(scan_polygon(a.side(), &wall(12.0)));
        assert!(!a.event.moves);
        // Untouchable walls never show up in the collision list.
        assert!(a.interaction.collision.is_empty());
    }

    #[test]
    fn flying_mover_crosses_polygon() {
        let mut a = Side::new(1, 0.0);
        a.event.blocking = BlockingBehavior::FlyingHigh;
        a.event.offer_move(5.0, 0.0);
        assert!(!scan_polygon(a.side(), &wall(12.0)));
        assert!(a.event.moves);
    }

    #[test]
    fn touchable_polygon_tracks_contact() {
        let mut a = Side::new(1, 0.0);
        a.event.consume_input = true;
        a.event.blocking = BlockingBehavior::FlyingHigh;
        let line = wall(5.0).touchable(true);
        scan_polygon(a.side(), &line);
        assert_eq!(a.interaction.collision.as_slice(), &[EventId(90)]);

        a.interaction.just_touching.insert(EventId(90));
        a.interaction.collision.clear();
        a.event.force_move_to(30.0, 0.0);
        scan_polygon(a.side(), &line);
        assert!(a.interaction.collision.is_empty());
        assert!(a.interaction.just_touching.is_empty());
    }
}
