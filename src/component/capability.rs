use crate::context::PhaseContext;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;

/// Error type returned by phase implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type PhaseResult = std::result::Result<(), BoxError>;

#[async_trait]
pub trait Healthchecker: Send + Sync {
    async fn healthcheck(&self, ctx: PhaseContext) -> PhaseResult;
}

#[async_trait]
pub trait Initializer: Send + Sync {
    async fn init(&self, ctx: PhaseContext) -> PhaseResult;
}

/// Long-running phase. Implementations should return once
/// `ctx.cancelled()` fires.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, ctx: PhaseContext) -> PhaseResult;
}

#[async_trait]
pub trait Shutdowner: Send + Sync {
    async fn shutdown(&self, ctx: PhaseContext) -> PhaseResult;
}

/// Adapts an async closure to any of the phase traits
pub struct PhaseFn<F> {
    f: F,
}

impl<F> PhaseFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for PhaseFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PhaseFn")
    }
}

#[async_trait]
impl<F, Fut> Healthchecker for PhaseFn<F>
where
    F: Fn(PhaseContext) -> Fut + Send + Sync,
    Fut: Future<Output = PhaseResult> + Send + 'static,
{
    async fn healthcheck(&self, ctx: PhaseContext) -> PhaseResult {
        (self.f)(ctx).await
    }
}

#[async_trait]
impl<F, Fut> Initializer for PhaseFn<F>
where
    F: Fn(PhaseContext) -> Fut + Send + Sync,
    Fut: Future<Output = PhaseResult> + Send + 'static,
{
    async fn init(&self, ctx: PhaseContext) -> PhaseResult {
        (self.f)(ctx).await
    }
}

#[async_trait]
impl<F, Fut> Runner for PhaseFn<F>
where
    F: Fn(PhaseContext) -> Fut + Send + Sync,
    Fut: Future<Output = PhaseResult> + Send + 'static,
{
    async fn run(&self, ctx: PhaseContext) -> PhaseResult {
        (self.f)(ctx).await
    }
}

#[async_trait]
impl<F, Fut> Shutdowner for PhaseFn<F>
where
    F: Fn(PhaseContext) -> Fut + Send + Sync,
    Fut: Future<Output = PhaseResult> + Send + 'static,
{
    async fn shutdown(&self, ctx: PhaseContext) -> PhaseResult {
        (self.f)(ctx).await
    }
}
