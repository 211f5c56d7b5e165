//! Generic stack-based state machine.
//!
//! States queue transitions (`change`/`back`/`clear`) at any point during
//! a frame; the queue is flushed only at the end of `update()` so the
//! active frame always sees a consistent stack. A state may return
//! [`Flow::Repeat`] to have the driver rerun the frame immediately
//! without new input, letting a pop+push settle within one wall-clock
//! frame.

use std::collections::{BTreeMap, VecDeque};

use crate::context::GameContext;
use crate::input::InputEvent;
use crate::surface::{DrawOp, Surface};

/// Hook result: continue the frame or rerun it immediately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Flow {
    #[default]
    Continue,
    Repeat,
}

impl Flow {
    pub fn is_repeat(self) -> bool {
        matches!(self, Flow::Repeat)
    }
}

/// A gameplay state. All hooks default to no-ops; concrete states
/// override what they need.
///
/// Hook order within a frame: `start` (once per push), `begin` (each time
/// the state becomes the processed top), `take_input`, `update`, `draw`.
/// `end` fires when another state is pushed on top; `finish` fires when
/// the state is popped for good.
pub trait State {
    fn name(&self) -> &'static str;

    /// Transparent states let the states below them draw first.
    fn transparent(&self) -> bool {
        false
    }

    /// Whether the tile map is drawn underneath this state.
    fn show_map(&self) -> bool {
        true
    }

    fn start(&mut self, _ctx: &mut GameContext) -> Flow {
        Flow::Continue
    }

    fn begin(&mut self, _ctx: &mut GameContext) -> Flow {
        Flow::Continue
    }

    fn take_input(&mut self, _ctx: &mut GameContext, _event: InputEvent) -> Flow {
        Flow::Continue
    }

    fn update(&mut self, _ctx: &mut GameContext) -> Flow {
        Flow::Continue
    }

    fn draw(&self, _ctx: &GameContext, _surface: &mut Surface) {}

    fn end(&mut self, _ctx: &mut GameContext) {}

    fn finish(&mut self, _ctx: &mut GameContext) {}
}

/// Deferred transition operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TempOp {
    Change(String),
    Back,
    Clear,
}

/// Queue of deferred transitions, owned by the game context so states
/// can queue ops while the machine drives them.
#[derive(Debug, Default)]
pub struct TransitionQueue {
    ops: VecDeque<TempOp>,
}

impl TransitionQueue {
    /// Queues a push of the named state.
    pub fn change(&mut self, name: impl Into<String>) {
        self.ops.push_back(TempOp::Change(name.into()));
    }

    /// Queues a pop of the current state.
    pub fn back(&mut self) {
        self.ops.push_back(TempOp::Back);
    }

    /// Queues draining the whole stack.
    pub fn clear(&mut self) {
        self.ops.push_back(TempOp::Clear);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn drain(&mut self) -> Vec<TempOp> {
        self.ops.drain(..).collect()
    }
}

type StateFactory = fn() -> Box<dyn State>;

struct StackEntry {
    state: Box<dyn State>,
    started: bool,
    processed: bool,
}

impl StackEntry {
    fn fresh(state: Box<dyn State>) -> Self {
        Self {
            state,
            started: false,
            processed: false,
        }
    }
}

/// The stack machine. States are registered by name; pushes instantiate
/// a fresh state from the factory so per-state local data never leaks
/// between visits.
#[derive(Default)]
pub struct StateMachine {
    stack: Vec<StackEntry>,
    registry: BTreeMap<&'static str, StateFactory>,
    underflow_logged: bool,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, factory: StateFactory) {
        self.registry.insert(name, factory);
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn top_name(&self) -> Option<&'static str> {
        self.stack.last().map(|e| e.state.name())
    }

    /// Stack names bottom-to-top, for persistence.
    pub fn stack_names(&self) -> Vec<String> {
        self.stack.iter().map(|e| e.state.name().to_owned()).collect()
    }

    /// Rebuilds the stack from persisted names without firing hooks;
    /// each state starts on its next exposure. Unknown names are skipped
    /// with a warning.
    pub fn seed_stack(&mut self, names: &[String]) {
        self.stack.clear();
        for name in names {
            match self.registry.get(name.as_str()) {
                Some(factory) => self.stack.push(StackEntry::fresh(factory())),
                None => tracing::warn!(state = %name, "unknown state in saved stack, skipping"),
            }
        }
    }

    /// Runs one frame. Returns `true` when the frame should be rerun
    /// immediately without new input.
    pub fn update(
        &mut self,
        ctx: &mut GameContext,
        event: InputEvent,
        surface: &mut Surface,
    ) -> bool {
        if self.stack.is_empty() {
            return self.flush(ctx);
        }

        let mut repeat = false;
        if let Some(top) = self.stack.last_mut() {
            if !top.started {
                top.started = true;
                repeat |= top.state.start(ctx).is_repeat();
            }
            if !top.processed {
                top.processed = true;
                repeat |= top.state.begin(ctx).is_repeat();
            }
            repeat |= top.state.take_input(ctx, event).is_repeat();
            repeat |= top.state.update(ctx).is_repeat();
        }

        self.draw(ctx, surface);

        if self.flush(ctx) {
            repeat = true;
        }
        repeat
    }

    /// Composites from the first non-transparent state upward. The base
    /// state decides whether the tile map is drawn underneath.
    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        let base = self.draw_base_index();
        if let Some(entry) = self.stack.get(base) {
            if entry.state.show_map() && ctx.board.width() > 0 {
                surface.push(DrawOp::Map {
                    viewing_team: ctx.viewing_team(),
                });
            }
        }
        for entry in &self.stack[base..] {
            entry.state.draw(ctx, surface);
        }
    }

    fn draw_base_index(&self) -> usize {
        let mut base = self.stack.len().saturating_sub(1);
        while base > 0 && self.stack[base].state.transparent() {
            base -= 1;
        }
        base
    }

    /// Applies deferred ops in insertion order. Returns whether anything
    /// was pushed (the empty-stack repeat signal).
    fn flush(&mut self, ctx: &mut GameContext) -> bool {
        let mut pushed = false;
        for op in ctx.transitions.drain() {
            match op {
                TempOp::Change(name) => {
                    let Some(factory) = self.registry.get(name.as_str()) else {
                        tracing::error!(state = %name, "change to unknown state ignored");
                        continue;
                    };
                    if let Some(top) = self.stack.last_mut() {
                        top.state.end(ctx);
                        top.processed = false;
                    }
                    self.stack.push(StackEntry::fresh(factory()));
                    pushed = true;
                }
                TempOp::Back => {
                    match self.stack.pop() {
                        Some(mut popped) => popped.state.finish(ctx),
                        None => {
                            if !self.underflow_logged {
                                tracing::error!("state stack underflow on back(), ignoring");
                                self.underflow_logged = true;
                            }
                            continue;
                        }
                    }
                    if let Some(top) = self.stack.last_mut() {
                        top.processed = false;
                    }
                }
                TempOp::Clear => {
                    while let Some(mut popped) = self.stack.pop() {
                        popped.state.finish(ctx);
                    }
                }
            }
        }
        pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;
    use crate::context::GameContext;
    use crate::data::Database;
    use std::sync::Arc;

    // Lifecycle counts live in the per-test context so parallel tests
    // never share state.
    fn bump(ctx: &mut GameContext, key: &str) {
        let n = ctx.game_vars.get(key).and_then(Value::as_int).unwrap_or(0);
        ctx.game_vars.insert(key.to_owned(), Value::Int(n + 1));
    }

    fn count(ctx: &GameContext, key: &str) -> i64 {
        ctx.game_vars.get(key).and_then(Value::as_int).unwrap_or(0)
    }

    /// Pushes "b" from its input hook; counts starts and ends.
    struct StateA;
    impl State for StateA {
        fn name(&self) -> &'static str {
            "a"
        }
        fn show_map(&self) -> bool {
            false
        }
        fn start(&mut self, ctx: &mut GameContext) -> Flow {
            bump(ctx, "a_start");
            Flow::Continue
        }
        fn take_input(&mut self, ctx: &mut GameContext, _event: InputEvent) -> Flow {
            ctx.transitions.change("b");
            Flow::Continue
        }
        fn end(&mut self, ctx: &mut GameContext) {
            bump(ctx, "a_end");
        }
    }

    /// Passive; counts starts and begins.
    struct StateB;
    impl State for StateB {
        fn name(&self) -> &'static str {
            "b"
        }
        fn show_map(&self) -> bool {
            false
        }
        fn start(&mut self, ctx: &mut GameContext) -> Flow {
            bump(ctx, "b_start");
            Flow::Continue
        }
        fn begin(&mut self, ctx: &mut GameContext) -> Flow {
            bump(ctx, "b_begin");
            Flow::Continue
        }
    }

    /// Fully inert.
    struct StateC;
    impl State for StateC {
        fn name(&self) -> &'static str {
            "c"
        }
        fn show_map(&self) -> bool {
            false
        }
    }

    fn machine() -> (StateMachine, GameContext, Surface) {
        let mut machine = StateMachine::new();
        machine.register("a", || Box::new(StateA));
        machine.register("b", || Box::new(StateB));
        machine.register("c", || Box::new(StateC));
        let ctx = GameContext::new(Arc::new(Database::default()));
        (machine, ctx, Surface::new())
    }

    #[test]
    fn deferred_change_applies_at_frame_end() {
        let (mut machine, mut ctx, mut surface) = machine();
        ctx.transitions.change("a");
        // Empty stack: flush pushes A and requests a repeat.
        assert!(machine.update(&mut ctx, None, &mut surface));
        assert_eq!(machine.top_name(), Some("a"));

        // A's take_input queues B; the switch happens after the frame.
        machine.update(&mut ctx, None, &mut surface);
        assert_eq!(machine.top_name(), Some("b"));
        assert_eq!(count(&ctx, "a_end"), 1);
        assert_eq!(count(&ctx, "b_start"), 0);

        // Next frame B starts and begins exactly once.
        machine.update(&mut ctx, None, &mut surface);
        assert_eq!(count(&ctx, "b_start"), 1);
        assert_eq!(count(&ctx, "b_begin"), 1);
        assert_eq!(count(&ctx, "a_start"), 1);
    }

    #[test]
    fn clear_then_change_lands_on_fresh_state() {
        let (mut machine, mut ctx, mut surface) = machine();
        ctx.transitions.change("c");
        machine.update(&mut ctx, None, &mut surface);

        ctx.transitions.clear();
        ctx.transitions.change("b");
        machine.update(&mut ctx, None, &mut surface);
        assert_eq!(machine.depth(), 1);
        assert_eq!(machine.top_name(), Some("b"));

        machine.update(&mut ctx, None, &mut surface);
        assert_eq!(count(&ctx, "b_start"), 1);
        assert_eq!(count(&ctx, "b_begin"), 1);
    }

    #[test]
    fn back_on_empty_stack_is_a_noop() {
        let (mut machine, mut ctx, mut surface) = machine();
        ctx.transitions.back();
        assert!(!machine.update(&mut ctx, None, &mut surface));
        assert_eq!(machine.depth(), 0);
    }

    #[test]
    fn unknown_state_is_ignored() {
        let (mut machine, mut ctx, mut surface) = machine();
        ctx.transitions.change("nonsense");
        machine.update(&mut ctx, None, &mut surface);
        assert_eq!(machine.depth(), 0);
    }

    #[test]
    fn seed_stack_restores_names() {
        let (mut machine, _ctx, _surface) = machine();
        machine.seed_stack(&["a".to_owned(), "b".to_owned()]);
        assert_eq!(machine.stack_names(), vec!["a", "b"]);
    }
}
