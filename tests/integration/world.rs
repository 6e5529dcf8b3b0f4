//! A small simulated host: one kitchen that turns a grub into a stew.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use autarch_foundation::{
    Entity, EntityId, Error, GameStateSnapshot, Result, Slot, SnapshotClock, Station,
};
use autarch_runtime::{Action, EngineConfig, Orchestrator, SnapshotProvider};
use autarch_scheduler::{ActionSink, Tick};

pub const RULES: &str = r#"
    [[goals]]
    name = "feed"
    completion = { type = "memory", memory = "meals", compare = ">= 2" }

    [[goals.rules]]
    name = "cook"
    station = "kitchen"

    [goals.rules.slots.main]
    element = "grub"
"#;

/// Ticks a recipe runs for.
const COOK_TICKS: u32 = 2;

#[derive(Debug, Default)]
pub struct World {
    pub table: BTreeMap<EntityId, Entity>,
    pub slotted: Option<Entity>,
    pub remaining: Option<u32>,
    pub output: Option<Entity>,
    pub meals: i64,
    pub next_id: u64,
    pub refuse_start: bool,
    pub kitchen_present: bool,
    pub log: Vec<String>,
}

impl World {
    pub fn with_grubs(count: u64) -> Self {
        let table = (1..=count)
            .map(|n| (EntityId(n), Entity::new(EntityId(n), "grub")))
            .collect();
        Self {
            table,
            next_id: 100,
            kitchen_present: true,
            ..Self::default()
        }
    }

    /// Host time passes: a running recipe counts down and finishes.
    fn advance(&mut self) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.remaining = None;
                self.slotted = None;
                self.output = Some(Entity::new(EntityId(self.next_id), "stew"));
                self.next_id += 1;
            }
        }
    }

    fn snapshot(&self, tick: u64, clock: &mut SnapshotClock) -> GameStateSnapshot {
        let mut builder = GameStateSnapshot::builder(tick)
            .entities(self.table.values().cloned())
            .memory("meals", self.meals);
        if self.kitchen_present {
            let slot = match &self.slotted {
                Some(entity) => Slot::filled("main", entity.clone()),
                None => Slot::empty("main"),
            };
            let mut kitchen = Station::idle("kitchen").with_slot(slot);
            if let Some(remaining) = self.remaining {
                kitchen = kitchen.running("stew", remaining as f32);
            }
            if let Some(output) = &self.output {
                kitchen = kitchen.with_output(output.clone());
            }
            builder = builder.station(kitchen);
        }
        builder.build(clock)
    }

    fn apply(&mut self, action: &Action) -> Result<()> {
        self.log.push(action.to_string());
        match action {
            Action::Slot { entity, .. } => {
                let entity = self
                    .table
                    .remove(entity)
                    .ok_or_else(|| Error::entity_not_found(*entity))?;
                self.slotted = Some(entity);
            }
            Action::Start { .. } => {
                if self.refuse_start {
                    return Err(Error::action_failed("kitchen has no fuel"));
                }
                if self.slotted.is_none() {
                    return Err(Error::action_failed("nothing slotted"));
                }
                self.remaining = Some(COOK_TICKS);
            }
            Action::CollectOutput { .. } => {
                if let Some(stew) = self.output.take() {
                    self.table.insert(stew.id, stew);
                    self.meals += 1;
                }
            }
            Action::Close { .. } => {
                if let Some(entity) = self.slotted.take() {
                    self.table.insert(entity.id, entity);
                }
            }
        }
        Ok(())
    }
}

pub fn provider(world: &Rc<RefCell<World>>) -> impl SnapshotProvider + use<> {
    let world = Rc::clone(world);
    let mut clock = SnapshotClock::new();
    move |tick: &Tick| -> Result<GameStateSnapshot> {
        let mut world = world.borrow_mut();
        world.advance();
        Ok(world.snapshot(tick.number, &mut clock))
    }
}

pub fn sink(world: &Rc<RefCell<World>>) -> impl ActionSink<Action> + use<> {
    let world = Rc::clone(world);
    move |action: &Action| -> Result<()> { world.borrow_mut().apply(action) }
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
        .with_action_delay(Duration::ZERO)
        .with_trace(true)
}

pub fn tick(number: u64) -> Tick {
    Tick::every(number, Duration::from_millis(100))
}

/// Ticks until `done` holds, failing the test after `limit` ticks.
pub fn run_until<P, K>(
    orchestrator: &mut Orchestrator<P, K>,
    limit: u64,
    mut done: impl FnMut(&Orchestrator<P, K>) -> bool,
) -> u64
where
    P: SnapshotProvider,
    K: ActionSink<Action>,
{
    for number in 0..limit {
        orchestrator.tick(tick(number)).unwrap();
        if done(orchestrator) {
            return number;
        }
    }
    panic!("not done after {limit} ticks");
}
