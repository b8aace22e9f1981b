//! # Runnable abstraction and the registry publishing convention.
//!
//! This module defines the [`Runnable`] trait (async, cancelable), a
//! function-backed implementation [`RunnableFn`], and [`RunnableService`] —
//! the wrapper a provider publishes into the registry under the
//! [`RUNNABLE_CAPABILITY`] type to have the scheduler pick it up.
//!
//! A runnable receives a [`CancellationToken`] and should periodically check
//! it to stop cooperatively during unschedule/shutdown.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Capability type the scheduler watches for.
///
/// Capabilities published under this type with an `id` and a `period`/`at`
/// property become scheduled tasks.
pub const RUNNABLE_CAPABILITY: &str = "runnable";

/// Shared reference to a runnable (`Arc<dyn Runnable>`).
pub type RunnableRef = Arc<dyn Runnable>;

/// # Asynchronous, cancelable task body.
///
/// Implementors should regularly check cancellation and exit promptly when
/// the task is unscheduled or the scheduler shuts down.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use capvisor::{Runnable, TaskError};
///
/// struct Compact;
///
/// #[async_trait]
/// impl Runnable for Compact {
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    /// Executes one fire of the task.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}

/// Function-backed runnable.
///
/// Wraps a closure that *creates* a new future per fire, so there is no
/// hidden shared mutable state between fires; share state explicitly with
/// `Arc` inside the closure when needed.
///
/// ## Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use capvisor::{RunnableFn, RunnableRef, TaskError};
///
/// let body: RunnableRef = RunnableFn::arc(|_ctx: CancellationToken| async {
///     Ok::<_, TaskError>(())
/// });
/// # let _ = body;
/// ```
pub struct RunnableFn<F> {
    f: F,
}

impl<F> RunnableFn<F> {
    /// Creates a new function-backed runnable.
    ///
    /// Prefer [`RunnableFn::arc`] when you immediately need a [`RunnableRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the runnable and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Runnable for RunnableFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}

/// Concrete wrapper published into the registry.
///
/// The registry stores service objects type-erased; the scheduler watcher
/// recovers the runnable by downcasting to this type.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use capvisor::{
///     Config, Properties, PropertyValue, RunnableFn, RunnableService,
///     ServiceRegistry, TaskError, RUNNABLE_CAPABILITY,
/// };
///
/// let registry = ServiceRegistry::new(&Config::default());
/// let body = RunnableFn::arc(|_ctx: CancellationToken| async {
///     Ok::<_, TaskError>(())
/// });
///
/// let mut props = Properties::new();
/// props.insert("id".into(), PropertyValue::from("flush"));
/// props.insert("period".into(), PropertyValue::from("5s"));
///
/// let _handle = registry
///     .publish(&[RUNNABLE_CAPABILITY], props, RunnableService::new(body))
///     .unwrap();
/// ```
pub struct RunnableService {
    runnable: RunnableRef,
}

impl RunnableService {
    /// Wraps a runnable for publication.
    pub fn new(runnable: RunnableRef) -> Arc<Self> {
        Arc::new(Self { runnable })
    }

    /// Returns the wrapped runnable.
    pub fn runnable(&self) -> &RunnableRef {
        &self.runnable
    }
}
