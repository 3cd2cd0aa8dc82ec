//! Event handler dispatch.
//!
//! This module hosts the dispatch thread and the system that feeds it:
//! - [`publish_frame`] runs last in the frame schedule. It captures the
//!   post-commit state of every active event into an immutable
//!   [`FrameSnapshot`] and hands it to the
//!   [`EventDispatcher`](crate::resources::dispatcher::EventDispatcher).
//! - [`dispatch_thread`] runs on its own OS thread. It sleeps on the
//!   handoff's condition variable, takes one batch at a time and runs
//!   [`call_event_handlers`] on it.
//!
//! Handlers may block for as long as they like (a dialog waiting for the
//! player); the simulation keeps running and later frames merge into the
//! pending handoff.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bevy_ecs::prelude::*;
use log::{debug, error, info};

use crate::components::eventhandler::{EventContext, EventHandlerRef, HandlerResult};
use crate::components::eventobject::EventObject;
use crate::components::interaction::Interaction;
use crate::components::polygon::PolygonObject;
use crate::error::panic_message;
use crate::events::frame::{EventView, FrameSnapshot};
use crate::resources::activeevents::ActiveEvents;
use crate::resources::dispatcher::{
    BatchOutcome, BatchReport, DispatchBatch, EventDispatcher, Handoff,
};
use crate::resources::frameinput::{FrameInput, LastFrame};
use crate::resources::worldtime::WorldTime;

/// Build the frame snapshot and hand it to the dispatcher.
///
/// Must run after the interaction scan so the dispatcher only ever sees
/// committed positions.
pub fn publish_frame(
    active: Res<ActiveEvents>,
    time: Res<WorldTime>,
    mut input: ResMut<FrameInput>,
    mut last: ResMut<LastFrame>,
    dispatcher: Option<Res<EventDispatcher>>,
    query: Query<(&EventObject, &Interaction, Option<&EventHandlerRef>)>,
    polygon_query: Query<(&PolygonObject, Option<&EventHandlerRef>)>,
) {
    let views = active
        .entities()
        .iter()
        .filter_map(|entity| {
            let (event, interaction, handler) = query.get(*entity).ok()?;
            Some(EventView::capture(
                *entity,
                event,
                interaction,
                handler.map(|h| Arc::clone(&h.0)),
            ))
        })
        .collect();
    let polygons = active
        .polygons()
        .iter()
        .filter_map(|entity| {
            let (polygon, handler) = polygon_query.get(*entity).ok()?;
            Some(EventView::from_polygon(
                *entity,
                polygon,
                handler.map(|h| Arc::clone(&h.0)),
            ))
        })
        .collect();
    let frame = Arc::new(FrameSnapshot::with_polygons(
        time.frame_count,
        views,
        polygons,
    ));
    let triggers = std::mem::take(&mut input.custom_triggers);

    if let Some(dispatcher) = dispatcher {
        dispatcher.publish(
            Arc::clone(&frame),
            time.delta,
            input.action_key_down,
            triggers,
        );
    } else if !triggers.is_empty() {
        debug!("Dropping {} custom trigger(s), dispatch disabled", triggers.len());
    }
    last.0 = Some(frame);
}

/// Entry point of the dispatch thread.
///
/// Blocks on the handoff until a frame is published, runs one batch, and
/// repeats until the dispatcher is disposed.
pub fn dispatch_thread(handoff: Arc<Handoff>, ctx: EventContext) {
    info!(
        "Event dispatch thread starting (id={:?})",
        std::thread::current().id()
    );
    // No baseline yet: the first batch always reports a state change.
    let mut last_change_count = None;

    while let Some(batch) = handoff.wait_for_batch() {
        let outcome = call_event_handlers(&ctx, &batch, &mut last_change_count);
        debug!(
            "Dispatched frame {} (dt={}, action={}): {:?}",
            batch.frame.frame, batch.delta_time, batch.action_key_down, outcome
        );
        handoff.finish_batch(BatchReport {
            frame: batch.frame.frame,
            delta_time: batch.delta_time,
            action_key_down: batch.action_key_down,
            outcome,
        });
    }
    info!("Event dispatch thread exiting");
}

/// Run every handler callback due for one batch.
///
/// Pending custom triggers go first. Then events are visited in list order:
/// 1. `on_timer` of the event's own handler
/// 2. `on_state_change` if the global change counter moved
/// 3. for events consuming input: `on_touch` of each newly touched partner
///    (event or polygon)
/// 4. for events consuming input, with the action key down: `on_push` of
///    each reachable pushable partner
///
/// Polygons follow with steps 1 and 2. The first consumed timer, touch or
/// push ends the whole batch.
///
/// `last_change_count` is the counter value seen by the previous batch;
/// `None` counts as changed.
pub fn call_event_handlers(
    ctx: &EventContext,
    batch: &DispatchBatch,
    last_change_count: &mut Option<u64>,
) -> BatchOutcome {
    let frame = &batch.frame;

    for (id, trigger_id) in &batch.custom_triggers {
        let Some(view) = frame.get(*id) else {
            debug!("Custom trigger {} for unknown event {}", trigger_id, id);
            continue;
        };
        if let Some(handler) = &view.handler {
            guarded(view, "on_custom_trigger", || {
                handler.on_custom_trigger(ctx, view, *trigger_id)
            });
        }
    }

    let change_count = ctx.global_state().change_count();
    let state_changed = *last_change_count != Some(change_count);
    *last_change_count = Some(change_count);

    for view in frame.events() {
        if ctx.is_disposed() {
            return BatchOutcome::Interrupted;
        }

        if let Some(handler) = &view.handler {
            if guarded(view, "on_timer", || {
                handler.on_timer(ctx, view, batch.delta_time)
            }) {
                return BatchOutcome::Consumed(view.id);
            }
            if state_changed {
                guarded(view, "on_state_change", || {
                    handler
                        .on_state_change(ctx, view, ctx.global_state())
                        .map(|()| false)
                });
            }
        }

        if !view.consume_input {
            continue;
        }

        for partner_id in &view.collision {
            let Some(partner) = frame.get(*partner_id) else {
                continue;
            };
            let Some(handler) = &partner.handler else {
                continue;
            };
            if !partner.touchable || !view.just_touching.insert(partner.id) {
                continue;
            }
            if guarded(partner, "on_touch", || handler.on_touch(ctx, partner, view)) {
                return BatchOutcome::Consumed(partner.id);
            }
        }

        if batch.action_key_down {
            for partner_id in &view.reachable {
                let Some(partner) = frame.get(*partner_id) else {
                    continue;
                };
                let Some(handler) = &partner.handler else {
                    continue;
                };
                if !partner.pushable {
                    continue;
                }
                if guarded(partner, "on_push", || handler.on_push(ctx, partner, view)) {
                    return BatchOutcome::Consumed(partner.id);
                }
            }
        }
    }

    for view in frame.polygons() {
        if ctx.is_disposed() {
            return BatchOutcome::Interrupted;
        }
        let Some(handler) = &view.handler else {
            continue;
        };
        if guarded(view, "on_timer", || {
            handler.on_timer(ctx, view, batch.delta_time)
        }) {
            return BatchOutcome::Consumed(view.id);
        }
        if state_changed {
            guarded(view, "on_state_change", || {
                handler
                    .on_state_change(ctx, view, ctx.global_state())
                    .map(|()| false)
            });
        }
    }
    BatchOutcome::Completed
}

/// Run one callback. Errors and panics are logged and count as "not
/// consumed".
fn guarded(view: &EventView, callback: &str, f: impl FnOnce() -> HandlerResult) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(consumed)) => consumed,
        Ok(Err(e)) => {
            error!("{} of event {} failed: {}", callback, view.id, e);
            false
        }
        Err(payload) => {
            error!(
                "{} of event {} panicked: {}",
                callback,
                view.id,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}
