mod capability;
mod view;

pub use capability::{
    BoxError, Healthchecker, Initializer, PhaseFn, PhaseResult, Runner, Shutdowner,
};
pub use view::PhaseView;

use crate::context::PhaseContext;
use crate::phase_register::{Phase, PhaseRegister, PhaseState};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Identity of a registered component, stable for the life of the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

/// Per-phase states of one component, `None` for unsupported phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseStates {
    pub healthcheck: Option<PhaseState>,
    pub init: Option<PhaseState>,
    pub run: Option<PhaseState>,
    pub shutdown: Option<PhaseState>,
}

impl PhaseStates {
    pub fn get(&self, phase: Phase) -> Option<PhaseState> {
        match phase {
            Phase::Healthcheck => self.healthcheck,
            Phase::Init => self.init,
            Phase::Run => self.run,
            Phase::Shutdown => self.shutdown,
        }
    }
}

struct ComponentInner {
    name: String,
    register: PhaseRegister,
    healthchecker: Option<Arc<dyn Healthchecker>>,
    initializer: Option<Arc<dyn Initializer>>,
    runner: Option<Arc<dyn Runner>>,
    shutdowner: Option<Arc<dyn Shutdowner>>,
}

/// A named unit of work plus its phase register.
///
/// Cloning is cheap and yields the same component: clones share identity
/// and state.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    pub fn builder(name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> ComponentId {
        ComponentId(Arc::as_ptr(&self.inner) as usize)
    }

    /// True when at least one phase is supported
    pub fn is_valid(&self) -> bool {
        self.inner.register.get() != 0
    }

    pub fn supports(&self, phase: Phase) -> bool {
        self.inner.register.is_applicable(phase)
    }

    pub fn is_healthchecker(&self) -> bool {
        self.supports(Phase::Healthcheck)
    }

    pub fn is_initializer(&self) -> bool {
        self.supports(Phase::Init)
    }

    pub fn is_runner(&self) -> bool {
        self.supports(Phase::Run)
    }

    pub fn is_shutdowner(&self) -> bool {
        self.supports(Phase::Shutdown)
    }

    pub fn healthchecker(&self) -> PhaseView<'_, dyn Healthchecker> {
        PhaseView::new(
            &self.inner.register,
            Phase::Healthcheck,
            self.inner.healthchecker.as_ref(),
        )
    }

    pub fn initializer(&self) -> PhaseView<'_, dyn Initializer> {
        PhaseView::new(&self.inner.register, Phase::Init, self.inner.initializer.as_ref())
    }

    pub fn runner(&self) -> PhaseView<'_, dyn Runner> {
        PhaseView::new(&self.inner.register, Phase::Run, self.inner.runner.as_ref())
    }

    pub fn shutdowner(&self) -> PhaseView<'_, dyn Shutdowner> {
        PhaseView::new(
            &self.inner.register,
            Phase::Shutdown,
            self.inner.shutdowner.as_ref(),
        )
    }

    pub fn states(&self) -> PhaseStates {
        let register = &self.inner.register;
        PhaseStates {
            healthcheck: register.state(Phase::Healthcheck),
            init: register.state(Phase::Init),
            run: register.state(Phase::Run),
            shutdown: register.state(Phase::Shutdown),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("states", &self.states())
            .finish()
    }
}

/// Explicit registration of the phases a component provides.
///
/// Only the phases handed to the builder are seeded `Ready`; everything else
/// stays empty for the life of the component.
pub struct ComponentBuilder {
    name: String,
    healthchecker: Option<Arc<dyn Healthchecker>>,
    initializer: Option<Arc<dyn Initializer>>,
    runner: Option<Arc<dyn Runner>>,
    shutdowner: Option<Arc<dyn Shutdowner>>,
}

impl ComponentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthchecker: None,
            initializer: None,
            runner: None,
            shutdowner: None,
        }
    }

    pub fn with_healthchecker(mut self, healthchecker: Arc<dyn Healthchecker>) -> Self {
        self.healthchecker = Some(healthchecker);
        self
    }

    pub fn with_initializer(mut self, initializer: Arc<dyn Initializer>) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn Runner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn with_shutdowner(mut self, shutdowner: Arc<dyn Shutdowner>) -> Self {
        self.shutdowner = Some(shutdowner);
        self
    }

    pub fn healthcheck_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PhaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PhaseResult> + Send + 'static,
    {
        self.with_healthchecker(Arc::new(PhaseFn::new(f)))
    }

    pub fn init_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PhaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PhaseResult> + Send + 'static,
    {
        self.with_initializer(Arc::new(PhaseFn::new(f)))
    }

    pub fn run_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PhaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PhaseResult> + Send + 'static,
    {
        self.with_runner(Arc::new(PhaseFn::new(f)))
    }

    pub fn shutdown_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PhaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PhaseResult> + Send + 'static,
    {
        self.with_shutdowner(Arc::new(PhaseFn::new(f)))
    }

    pub fn build(self) -> Component {
        let register = PhaseRegister::new();
        if self.healthchecker.is_some() {
            register.seed(Phase::Healthcheck);
        }
        if self.initializer.is_some() {
            register.seed(Phase::Init);
        }
        if self.runner.is_some() {
            register.seed(Phase::Run);
        }
        if self.shutdowner.is_some() {
            register.seed(Phase::Shutdown);
        }

        Component {
            inner: Arc::new(ComponentInner {
                name: self.name,
                register,
                healthchecker: self.healthchecker,
                initializer: self.initializer,
                runner: self.runner,
                shutdowner: self.shutdowner,
            }),
        }
    }
}
