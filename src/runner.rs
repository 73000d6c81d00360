use crate::{
    action::Action,
    error::{KinemaError, KinemaResult},
    node::NodeState,
    run::{Run, instantiate},
};

/// Identifies one dispatched running copy on one node. Returned by
/// [`Scene::run_action`](crate::Scene::run_action); keep it to stop the copy
/// later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionHandle(u64);

impl ActionHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct RunningAction {
    handle: ActionHandle,
    run: Run,
    /// Set on the first removal request (explicit or natural completion);
    /// guarantees `stop` fires exactly once however many times removal is
    /// asked for.
    scheduled_to_remove: bool,
}

/// Per-node action list: dispatch, tick, and two-phase removal.
///
/// Removal never mutates the list mid-iteration: a removed action is stopped
/// immediately but only drained from the list at the start of the next step
/// pass. Likewise an action dispatched during a step pass is not ticked until
/// the following one.
#[derive(Debug, Default)]
pub(crate) struct ActionRunner {
    actions: Vec<RunningAction>,
    to_remove: Vec<ActionHandle>,
    next_handle: u64,
    skip_frame: bool,
}

impl ActionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| !a.scheduled_to_remove)
            .count()
    }

    /// Treat the next tick's dt as not-yet-elapsed (set on resume).
    pub fn skip_next_frame(&mut self) {
        self.skip_frame = true;
    }

    /// Validate, instantiate a fresh running copy, bind it to the target and
    /// start it.
    pub fn start_action(
        &mut self,
        target: &mut NodeState,
        action: &Action,
    ) -> KinemaResult<ActionHandle> {
        action.validate()?;
        let mut run = instantiate(action)?;
        run.start(target)?;
        let handle = ActionHandle(self.next_handle);
        self.next_handle += 1;
        self.actions.push(RunningAction {
            handle,
            run,
            scheduled_to_remove: false,
        });
        Ok(handle)
    }

    /// Stop and schedule removal of a running copy. Calling this again for
    /// the same pending copy is a no-op; a handle this node never owned (or
    /// one already drained) is a config error.
    pub fn remove(&mut self, target: &mut NodeState, handle: ActionHandle) -> KinemaResult<()> {
        let Some(entry) = self.actions.iter_mut().find(|a| a.handle == handle) else {
            return Err(KinemaError::config("action not owned by this node"));
        };
        if entry.scheduled_to_remove {
            return Ok(());
        }
        entry.scheduled_to_remove = true;
        entry.run.stop(target);
        self.to_remove.push(handle);
        tracing::trace!(handle = handle.raw(), "action removed");
        Ok(())
    }

    /// One tick: drain pending removals, then step every live action,
    /// routing naturally-completed ones through the removal guard.
    pub fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<()> {
        if !self.to_remove.is_empty() {
            let pending = std::mem::take(&mut self.to_remove);
            self.actions.retain(|a| !pending.contains(&a.handle));
        }

        if self.skip_frame {
            self.skip_frame = false;
            return Ok(());
        }

        // Actions appended during this pass wait for the next tick.
        let live = self.actions.len();
        for i in 0..live {
            let entry = &mut self.actions[i];
            if entry.scheduled_to_remove {
                continue;
            }
            entry.run.step(target, dt)?;
            if entry.run.done() {
                entry.scheduled_to_remove = true;
                entry.run.stop(target);
                self.to_remove.push(entry.handle);
                tracing::trace!(handle = entry.handle.raw(), "action completed");
            }
        }
        Ok(())
    }
}
