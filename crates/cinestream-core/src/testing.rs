//! Instrumented engine doubles for exercising the playback controller

use crate::{
    engine::{AdaptiveEngine, EngineEvent, EngineFactory, LevelSelection},
    EngineConfig, Error, Result,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Counters shared by every engine a [`FakeEngineFactory`] builds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    pub created: usize,
    pub loaded: Vec<String>,
    pub attached: usize,
    pub detached: usize,
    pub destroyed: usize,
    pub level_requests: Vec<LevelSelection>,
}

impl EngineStats {
    /// Engines built and not yet destroyed
    pub fn live(&self) -> usize {
        self.created - self.destroyed
    }
}

#[derive(Default)]
struct Shared {
    stats: EngineStats,
    /// Event queue of the most recently created engine
    queue: Option<Rc<RefCell<VecDeque<EngineEvent>>>>,
}

/// Test-side view of a [`FakeEngineFactory`]
#[derive(Clone)]
pub struct FakeEngineProbe {
    shared: Rc<RefCell<Shared>>,
}

impl FakeEngineProbe {
    pub fn stats(&self) -> EngineStats {
        self.shared.borrow().stats.clone()
    }

    /// Queue an event on the most recently created engine
    pub fn emit(&self, event: EngineEvent) {
        if let Some(queue) = &self.shared.borrow().queue {
            queue.borrow_mut().push_back(event);
        }
    }
}

/// Factory producing [`FakeEngine`]s
pub struct FakeEngineFactory {
    supported: bool,
    fail_load: bool,
    shared: Rc<RefCell<Shared>>,
}

impl FakeEngineFactory {
    pub fn new() -> (Self, FakeEngineProbe) {
        let shared = Rc::new(RefCell::new(Shared::default()));
        let factory = Self {
            supported: true,
            fail_load: false,
            shared: shared.clone(),
        };
        (factory, FakeEngineProbe { shared })
    }

    /// A factory whose runtime has no adaptive playback
    pub fn unsupported() -> (Self, FakeEngineProbe) {
        let (mut factory, probe) = Self::new();
        factory.supported = false;
        (factory, probe)
    }

    /// Engines fail in `load_source`
    pub fn failing_load() -> (Self, FakeEngineProbe) {
        let (mut factory, probe) = Self::new();
        factory.fail_load = true;
        (factory, probe)
    }
}

impl<S> EngineFactory<S> for FakeEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&mut self, _config: &EngineConfig) -> Result<Box<dyn AdaptiveEngine<S>>> {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        {
            let mut shared = self.shared.borrow_mut();
            shared.stats.created += 1;
            shared.queue = Some(queue.clone());
        }

        Ok(Box::new(FakeEngine {
            shared: self.shared.clone(),
            queue,
            fail_load: self.fail_load,
            level: LevelSelection::Auto,
            last_index: 0,
            destroyed: false,
        }))
    }
}

/// Engine that records calls and replays queued events
pub struct FakeEngine {
    shared: Rc<RefCell<Shared>>,
    queue: Rc<RefCell<VecDeque<EngineEvent>>>,
    fail_load: bool,
    level: LevelSelection,
    last_index: usize,
    destroyed: bool,
}

impl<S> AdaptiveEngine<S> for FakeEngine {
    fn load_source(&mut self, url: &str) -> Result<()> {
        self.shared.borrow_mut().stats.loaded.push(url.to_string());
        if self.fail_load {
            return Err(Error::Engine(format!("cannot load {}", url)));
        }
        Ok(())
    }

    fn attach_media(&mut self, _surface: &mut S) -> Result<()> {
        self.shared.borrow_mut().stats.attached += 1;
        Ok(())
    }

    fn detach_media(&mut self) {
        self.shared.borrow_mut().stats.detached += 1;
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.queue.borrow_mut().clear();
        self.shared.borrow_mut().stats.destroyed += 1;
    }

    fn current_level(&self) -> LevelSelection {
        self.level
    }

    fn set_current_level(&mut self, level: LevelSelection) {
        self.shared.borrow_mut().stats.level_requests.push(level);
        self.level = level;

        let event = match level {
            LevelSelection::Index(index) => {
                self.last_index = index;
                EngineEvent::LevelSwitched { level: index, auto: false }
            }
            LevelSelection::Auto => EngineEvent::LevelSwitched {
                level: self.last_index,
                auto: true,
            },
        };
        self.queue.borrow_mut().push_back(event);
    }

    fn poll_event(&mut self, _surface: &mut S) -> Option<EngineEvent> {
        self.queue.borrow_mut().pop_front()
    }
}
