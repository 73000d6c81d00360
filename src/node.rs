use crate::{
    action::Action,
    core::{Point, Vec2},
    error::{KinemaError, KinemaResult},
    grid::GridAttachment,
    runner::{ActionHandle, ActionRunner},
};

/// Non-owning handle into the [`Scene`] arena. Parent/child links are stored
/// as ids so the tree cannot form ownership cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// The mutable, render-visible state of a node: the properties actions drive.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeState {
    pub position: Point,
    pub rotation_deg: f64,
    pub scale: Vec2,
    /// Content surface in local units; grids are sized from it.
    pub size: Vec2,
    /// 0 = transparent, 1 = opaque.
    pub opacity: f64,
    pub visible: bool,
    /// Active deformation grid, if a grid action has attached one.
    pub grid: Option<GridAttachment>,
}

impl NodeState {
    pub fn new(size: Vec2) -> Self {
        Self {
            position: Point::ZERO,
            rotation_deg: 0.0,
            scale: Vec2::new(1.0, 1.0),
            size,
            opacity: 1.0,
            visible: true,
            grid: None,
        }
    }
}

/// A positionable entity in the scene tree. Owns its running actions; owned
/// by the [`Scene`] arena.
#[derive(Debug)]
pub struct Node {
    name: Option<String>,
    pub state: NodeState,
    pub(crate) runner: ActionRunner,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    scheduled: bool,
}

impl Node {
    pub fn new(size: Vec2) -> Self {
        Self {
            name: None,
            state: NodeState::new(size),
            runner: ActionRunner::new(),
            parent: None,
            children: Vec::new(),
            scheduled: false,
        }
    }

    pub fn named(name: impl Into<String>, size: Vec2) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(size)
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Number of actions currently running on this node.
    pub fn running_actions(&self) -> usize {
        self.runner.len()
    }
}

/// Arena-owned scene tree plus the per-frame step loop.
///
/// Single-threaded cooperative scheduling: one `step(dt)` per rendered frame
/// delivers `dt` synchronously to every scheduled node's runner, in arena
/// order. Everything in the action/grid subsystem relies on being called from
/// this single tick path.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Attach `node` under `parent`. Named siblings must be unique.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> KinemaResult<NodeId> {
        if let Some(name) = node.name.as_deref() {
            let siblings = self.node(parent)?.children.clone();
            for sib in siblings {
                if self.node(sib)?.name() == Some(name) {
                    return Err(KinemaError::config(format!(
                        "duplicate child name '{name}'"
                    )));
                }
            }
        }
        let id = self.add(node);
        if let Some(n) = self.nodes[id.0 as usize].as_mut() {
            n.parent = Some(parent);
        }
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove `id` and its whole subtree from the arena.
    pub fn remove(&mut self, id: NodeId) -> KinemaResult<()> {
        let parent = self.node(id)?.parent;
        if let Some(p) = parent
            && let Some(pn) = self.nodes.get_mut(p.0 as usize).and_then(Option::as_mut)
        {
            pn.children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes[cur.0 as usize].take() {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> KinemaResult<&Node> {
        self.nodes
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| KinemaError::node("unknown node id"))
    }

    pub fn node_mut(&mut self, id: NodeId) -> KinemaResult<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| KinemaError::node("unknown node id"))
    }

    /// Dispatch a fresh running copy of `action` on the node and schedule the
    /// node's step callback (idempotently). The returned handle is what
    /// [`Scene::stop_action`] takes.
    pub fn run_action(&mut self, id: NodeId, action: &Action) -> KinemaResult<ActionHandle> {
        let node = self.node_mut(id)?;
        let handle = node.runner.start_action(&mut node.state, action)?;
        node.scheduled = true;
        tracing::debug!(node = id.0, handle = handle.raw(), "action dispatched");
        Ok(handle)
    }

    /// Stop and remove a running action. Safe to call twice for a pending
    /// copy; the action's `stop` fires exactly once.
    pub fn stop_action(&mut self, id: NodeId, handle: ActionHandle) -> KinemaResult<()> {
        let node = self.node_mut(id)?;
        node.runner.remove(&mut node.state, handle)
    }

    /// Unschedule the node's step callback. Its actions stay attached but
    /// receive no ticks until [`Scene::resume`].
    pub fn pause(&mut self, id: NodeId) -> KinemaResult<()> {
        self.node_mut(id)?.scheduled = false;
        Ok(())
    }

    /// Re-schedule the node. The first tick after resuming is skipped so a
    /// long pause does not land as one artificial jumbo `dt`.
    pub fn resume(&mut self, id: NodeId) -> KinemaResult<()> {
        let node = self.node_mut(id)?;
        node.scheduled = true;
        node.runner.skip_next_frame();
        Ok(())
    }

    /// One scheduler tick. `dt` is seconds since the previous tick and must be
    /// non-negative and finite.
    #[tracing::instrument(skip(self))]
    pub fn step(&mut self, dt: f64) -> KinemaResult<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(KinemaError::config("step dt must be finite and >= 0"));
        }
        for slot in &mut self.nodes {
            let Some(node) = slot.as_mut() else { continue };
            if !node.scheduled {
                continue;
            }
            node.runner.step(&mut node.state, dt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Node {
        Node::new(Vec2::new(100.0, 50.0))
    }

    #[test]
    fn add_child_links_both_ways() {
        let mut scene = Scene::new();
        let root = scene.add(leaf());
        let kid = scene.add_child(root, Node::named("hud", Vec2::new(10.0, 10.0))).unwrap();
        assert_eq!(scene.node(root).unwrap().children(), &[kid]);
        assert_eq!(scene.node(kid).unwrap().parent(), Some(root));
    }

    #[test]
    fn duplicate_sibling_name_is_config_error() {
        let mut scene = Scene::new();
        let root = scene.add(leaf());
        scene.add_child(root, Node::named("hud", Vec2::new(1.0, 1.0))).unwrap();
        let err = scene
            .add_child(root, Node::named("hud", Vec2::new(1.0, 1.0)))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate child name"));
    }

    #[test]
    fn unnamed_siblings_may_repeat() {
        let mut scene = Scene::new();
        let root = scene.add(leaf());
        scene.add_child(root, leaf()).unwrap();
        assert!(scene.add_child(root, leaf()).is_ok());
    }

    #[test]
    fn remove_drops_subtree() {
        let mut scene = Scene::new();
        let root = scene.add(leaf());
        let mid = scene.add_child(root, leaf()).unwrap();
        let deep = scene.add_child(mid, leaf()).unwrap();
        scene.remove(mid).unwrap();
        assert!(scene.node(mid).is_err());
        assert!(scene.node(deep).is_err());
        assert!(scene.node(root).unwrap().children().is_empty());
    }

    #[test]
    fn negative_dt_is_rejected() {
        let mut scene = Scene::new();
        assert!(scene.step(-0.01).is_err());
        assert!(scene.step(f64::NAN).is_err());
        assert!(scene.step(0.0).is_ok());
    }
}
