//! A hierarchical state machine.
//!
//! A [`Machine`] is a tree of named states stored in an arena and addressed by [`StateId`]. Every
//! state may have children, of which at most one is *current*, so any state can act as a
//! sub-machine for its own children. Each state carries a data value of type `D` and a tick counter
//! reset on entry and advanced by [`Machine::process`].
//!
//! Callbacks receive the machine and the id of the state they belong to, and may transition any
//! state, including the one that is running them:
//!
//! ```ignore
//! let mut machine = Machine::<Swap>::new("gem");
//! let root = machine.root();
//! let idle = machine.add_state(root, "idle");
//! let falling = machine.add_state(root, "falling");
//!
//! machine.on_process(falling, |machine, state| {
//!     if machine.tick(state) >= 10 {
//!         machine.set_state(machine.root(), "idle", Swap::default());
//!     }
//! });
//!
//! machine.set_state(root, "falling", Swap::default());
//! for _ in 0..=10 {
//!     machine.process(root);
//! }
//! assert_eq!(machine.current(root), Some(idle));
//! ```

use std::{collections::HashMap, rc::Rc};

use log::{debug, warn};

/// A state in a [`Machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(usize);

impl StateId {
    /// The root state of every machine.
    pub const ROOT: Self = Self(0);

    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A state callback.
pub type Callback<D> = Rc<dyn Fn(&mut Machine<D>, StateId)>;

struct Node<D> {
    name: String,
    parent: Option<StateId>,
    children: HashMap<String, StateId>,
    data: D,
    tick: u64,

    current: Option<StateId>,
    last: Option<StateId>,

    /// Sibling to go back to on `return_state`.
    return_to: Option<StateId>,

    on_enter: Option<Callback<D>>,
    on_process: Option<Callback<D>>,
    on_exit: Option<Callback<D>>,
    on_render: Option<Callback<D>>,
}

impl<D: Default> Node<D> {
    fn new(name: String, parent: Option<StateId>) -> Self {
        Self {
            name,
            parent,
            children: HashMap::new(),
            data: D::default(),
            tick: 0,
            current: None,
            last: None,
            return_to: None,
            on_enter: None,
            on_process: None,
            on_exit: None,
            on_render: None,
        }
    }
}

/// Selects a callback slot of a node.
type Slot<D> = fn(&Node<D>) -> &Option<Callback<D>>;

/// A tree of states.
///
/// Ids are only meaningful for the machine that created them. Transitions, callbacks and lookups
/// treat an unknown id as a state with no children. [`add_state`](Machine::add_state),
/// [`name`](Machine::name), [`tick`](Machine::tick) and the data accessors panic on one.
pub struct Machine<D> {
    nodes: Vec<Node<D>>,
}

impl<D: Default> Machine<D> {
    /// Create a machine whose root state is called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(name.into(), None)],
        }
    }

    #[inline]
    pub fn root(&self) -> StateId {
        StateId::ROOT
    }

    /// Total number of states, the root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, state: StateId) -> Option<&Node<D>> {
        self.nodes.get(state.0)
    }

    fn node_mut(&mut self, state: StateId) -> Option<&mut Node<D>> {
        self.nodes.get_mut(state.0)
    }

    /// Add a child state called `name` under `parent`.
    ///
    /// If `parent` already has a child with that name, that child is returned unchanged.
    pub fn add_state(&mut self, parent: StateId, name: impl Into<String>) -> StateId {
        let name = name.into();
        if let Some(&existing) = self.nodes[parent.0].children.get(&name) {
            return existing;
        }
        let id = StateId(self.nodes.len());
        self.nodes[parent.0].children.insert(name.clone(), id);
        self.nodes.push(Node::new(name, Some(parent)));
        id
    }

    // ---------------------------------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------------------------------

    /// Make the child `name` of `node` current, replacing its data.
    ///
    /// The outgoing child's exit callback runs before the new child's enter callback. Returns the
    /// current child of `node` once the callbacks are done, or `None` without changing anything if
    /// `node` has no child called `name`.
    pub fn set_state(&mut self, node: StateId, name: &str, data: D) -> Option<StateId> {
        let target = self.child(node, name)?;
        self.transition(node, target, Some(data), None)
    }

    /// Like [`set_state`](Self::set_state), and remember the sibling `return_to` so that
    /// [`return_state`](Self::return_state) can go back to it later.
    pub fn set_state_returning(
        &mut self,
        node: StateId,
        name: &str,
        data: D,
        return_to: &str,
    ) -> Option<StateId> {
        let target = self.child(node, name)?;
        let back = self.child(node, return_to);
        if back.is_none() {
            warn!("{} has no state {return_to:?} to return to", self.path(node));
        }
        self.transition(node, target, Some(data), back)
    }

    /// Go back to the state the current child of `node` was entered from, keeping that state's
    /// data. Returns `None` if there is nothing to return to.
    pub fn return_state(&mut self, node: StateId) -> Option<StateId> {
        let current = self.node(node)?.current?;
        let target = self.node(current)?.return_to?;
        self.transition(node, target, None, None)
    }

    fn transition(
        &mut self,
        node: StateId,
        target: StateId,
        data: Option<D>,
        return_to: Option<StateId>,
    ) -> Option<StateId> {
        let returning = data.is_none();
        if let Some(data) = data {
            self.node_mut(target)?.data = data;
        }

        if let Some(current) = self.current(node) {
            self.call(current, |node| &node.on_exit);
        }

        let parent = self.node_mut(node)?;
        parent.last = parent.current;
        parent.current = Some(target);

        let state = self.node_mut(target)?;
        if !returning {
            state.return_to = return_to;
        }
        state.tick = 0;
        debug!("{} entered", self.path(target));

        self.call(target, |node| &node.on_enter);
        self.current(node)
    }

    /// Run the process callback of the current child of `node`, then advance that child's tick.
    ///
    /// Returns `false` if `node` has no current child.
    pub fn process(&mut self, node: StateId) -> bool {
        let Some(current) = self.current(node) else {
            return false;
        };
        self.call(current, |node| &node.on_process);
        if let Some(state) = self.node_mut(current) {
            state.tick += 1;
        }
        true
    }

    /// Run the render callback of the current child of `node`.
    pub fn render(&mut self, node: StateId) -> bool {
        let Some(current) = self.current(node) else {
            return false;
        };
        self.call(current, |node| &node.on_render);
        true
    }

    /// Run the exit callback of the current child of `node`. The child stays current.
    pub fn exit(&mut self, node: StateId) -> bool {
        let Some(current) = self.current(node) else {
            return false;
        };
        self.call(current, |node| &node.on_exit);
        true
    }

    fn call(&mut self, state: StateId, slot: Slot<D>) {
        if let Some(callback) = self.node(state).and_then(|node| slot(node).clone()) {
            callback(self, state);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Callbacks
    // ---------------------------------------------------------------------------------------------

    pub fn on_enter(&mut self, state: StateId, f: impl Fn(&mut Machine<D>, StateId) + 'static) {
        self.set_callback(state, "enter", |node| &mut node.on_enter, Rc::new(f));
    }

    pub fn on_process(&mut self, state: StateId, f: impl Fn(&mut Machine<D>, StateId) + 'static) {
        self.set_callback(state, "process", |node| &mut node.on_process, Rc::new(f));
    }

    pub fn on_exit(&mut self, state: StateId, f: impl Fn(&mut Machine<D>, StateId) + 'static) {
        self.set_callback(state, "exit", |node| &mut node.on_exit, Rc::new(f));
    }

    pub fn on_render(&mut self, state: StateId, f: impl Fn(&mut Machine<D>, StateId) + 'static) {
        self.set_callback(state, "render", |node| &mut node.on_render, Rc::new(f));
    }

    fn set_callback(
        &mut self,
        state: StateId,
        event: &str,
        slot: fn(&mut Node<D>) -> &mut Option<Callback<D>>,
        callback: Callback<D>,
    ) {
        match self.node_mut(state) {
            Some(node) => *slot(node) = Some(callback),
            None => warn!("cannot set the {event} callback of unknown state {}", state.0),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------------------------------

    #[inline]
    pub fn name(&self, state: StateId) -> &str {
        &self.nodes[state.0].name
    }

    #[inline]
    pub fn parent(&self, state: StateId) -> Option<StateId> {
        self.node(state)?.parent
    }

    /// The child of `state` called `name`.
    pub fn child(&self, state: StateId, name: &str) -> Option<StateId> {
        self.node(state)?.children.get(name).copied()
    }

    pub fn children(&self, state: StateId) -> impl Iterator<Item = (&str, StateId)> + '_ {
        self.node(state)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .map(|(name, id)| (name.as_str(), *id))
    }

    /// The current child of `state`.
    #[inline]
    pub fn current(&self, state: StateId) -> Option<StateId> {
        self.node(state)?.current
    }

    /// The child of `state` that was current before the last transition.
    #[inline]
    pub fn last(&self, state: StateId) -> Option<StateId> {
        self.node(state)?.last
    }

    #[inline]
    pub fn return_to(&self, state: StateId) -> Option<StateId> {
        self.node(state)?.return_to
    }

    /// Number of times `state` was processed since it was last entered.
    #[inline]
    pub fn tick(&self, state: StateId) -> u64 {
        self.nodes[state.0].tick
    }

    #[inline]
    pub fn data(&self, state: StateId) -> &D {
        &self.nodes[state.0].data
    }

    #[inline]
    pub fn data_mut(&mut self, state: StateId) -> &mut D {
        &mut self.nodes[state.0].data
    }

    /// Slash separated names from the root down to `state`.
    pub fn path(&self, state: StateId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(state);
        while let Some(node) = cursor.and_then(|state| self.node(state)) {
            names.push(node.name.as_str());
            cursor = node.parent;
        }
        names.reverse();
        names.join("/")
    }
}
