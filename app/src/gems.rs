//! A tiny headless take on falling gems: gems spawn at the top of a column, fall one row per step
//! and stack up at the bottom. A state machine paces the round.

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use gem_engine::{
    ecs::{
        Aspect, Entity, Registry, System,
        entity::{Definitions, Template},
    },
    hsm::{Machine, StateId},
};
use gem_macros::Component;
use log::{info, warn};

pub const COLUMNS: i32 = 4;
pub const ROWS: i32 = 6;

#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gem {
    Red,
    Green,
    Blue,
}

impl Gem {
    fn nth(n: u32) -> Self {
        match n % 3 {
            0 => Gem::Red,
            1 => Gem::Green,
            _ => Gem::Blue,
        }
    }

    fn glyph(&self) -> char {
        match self {
            Gem::Red => 'R',
            Gem::Green => 'G',
            Gem::Blue => 'B',
        }
    }
}

/// Present while a gem is still moving.
#[derive(Component, Debug, Default)]
pub struct Falling;

pub fn definitions() -> Definitions {
    let mut definitions = Definitions::new();
    definitions.define("gem", Template::new().with::<Cell>().with::<Falling>());
    definitions
}

/// Number of gems the director should drop this round.
pub struct Spawn(pub u32);

#[derive(Debug, Default)]
pub struct Round {
    dropped: u32,
}

/// Paces the round: a short intro, a drop phase, then a wait for the last gem to land.
pub struct Director {
    machine: Machine<Round>,
    definitions: Definitions,
    to_drop: u32,
    stop: Arc<AtomicBool>,
}

impl Director {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        let mut machine = Machine::new("round");
        let root = machine.root();
        let intro = machine.add_state(root, "intro");
        machine.add_state(root, "drop");
        machine.add_state(root, "settle");

        machine.on_process(intro, |machine: &mut Machine<Round>, state| {
            if machine.tick(state) >= 3 {
                machine.set_state(StateId::ROOT, "drop", Round::default());
            }
        });
        machine.on_enter(intro, |_, _| info!("get ready"));

        machine.set_state(root, "intro", Round::default());
        Self {
            machine,
            definitions: definitions(),
            to_drop: 8,
            stop,
        }
    }

    fn drop_gem(&mut self, registry: &mut Registry, drop: StateId) {
        let n = self.machine.data(drop).dropped;
        let Ok(Some(entity)) = self.definitions.spawn("gem", registry) else {
            warn!("could not spawn gem {n}");
            return;
        };
        if let Some(cell) = registry.get_mut::<Cell>(entity) {
            *cell = Cell {
                col: n as i32 % COLUMNS,
                row: ROWS,
            };
        }
        if let Err(error) = registry.attach(entity, Gem::nth(n)) {
            warn!("{error}");
        }
        self.machine.data_mut(drop).dropped += 1;
    }
}

impl System for Director {
    fn process_entities(&mut self, registry: &mut Registry, _entities: &[Entity]) {
        let root = self.machine.root();
        self.machine.process(root);

        let Some(current) = self.machine.current(root) else {
            return;
        };
        let name = self.machine.name(current).to_string();
        match name.as_str() {
            "drop" if self.machine.tick(current) % 4 == 1 => {
                self.drop_gem(registry, current);
                if self.machine.data(current).dropped >= self.to_drop {
                    self.machine.set_state(root, "settle", Round::default());
                }
            }
            "settle" if self.machine.tick(current) > ROWS as u64 + 1 => {
                info!("round over");
                self.stop.store(true, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn on_event(&mut self, _registry: &mut Registry, event: &dyn Any) {
        if let Some(Spawn(count)) = event.downcast_ref::<Spawn>() {
            self.to_drop = *count;
        }
    }
}

/// Moves falling gems down until they rest on the floor or on another gem.
#[derive(Default)]
pub struct Gravity {
    heights: HashMap<i32, i32>,
}

impl System for Gravity {
    fn aspect(&self, registry: &Registry) -> Aspect {
        registry.aspect_for_all::<(Cell, Falling)>()
    }

    fn process_entities(&mut self, registry: &mut Registry, entities: &[Entity]) {
        for &entity in entities {
            let Some(cell) = registry.get_mut::<Cell>(entity) else {
                continue;
            };
            let floor = self.heights.get(&cell.col).copied().unwrap_or(0);
            if cell.row > floor {
                cell.row -= 1;
                continue;
            }
            let col = cell.col;
            if registry.has::<Falling>(entity) {
                self.heights.insert(col, floor + 1);
                if let Err(error) = registry.detach::<Falling>(entity) {
                    warn!("{error}");
                }
            }
        }
    }
}

/// Draws the settled gems whenever a new one lands.
#[derive(Default)]
pub struct Board {
    drawn: usize,
}

impl System for Board {
    fn aspect(&self, registry: &Registry) -> Aspect {
        registry
            .aspect_for_all::<(Cell, Gem)>()
            .exclude([registry.kind::<Falling>()])
    }

    fn inserted(&mut self, registry: &Registry, entity: Entity) {
        if let (Some(cell), Some(gem)) = (
            registry.get::<Cell>(entity),
            registry.get::<Gem>(entity),
        ) {
            info!("{gem:?} gem landed at ({}, {})", cell.col, cell.row);
        }
    }

    fn render(&mut self, registry: &Registry, entities: &[Entity]) {
        if entities.len() == self.drawn {
            return;
        }
        self.drawn = entities.len();

        let mut rows = vec![vec!['.'; COLUMNS as usize]; ROWS as usize];
        for &entity in entities {
            if let (Some(cell), Some(gem)) = (
                registry.get::<Cell>(entity),
                registry.get::<Gem>(entity),
            ) && (0..COLUMNS).contains(&cell.col)
                && (0..ROWS).contains(&cell.row)
            {
                rows[cell.row as usize][cell.col as usize] = gem.glyph();
            }
        }
        for row in rows.iter().rev() {
            info!("|{}|", row.iter().collect::<String>());
        }
    }
}
