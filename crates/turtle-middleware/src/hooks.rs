//! Post hooks and hook-list helpers.
//!
//! Post hooks run after the main chain has produced a response. They observe
//! the response (and the context it was produced under) but cannot change
//! it. Like [`Next`](crate::middleware::Next), the post chain is assembled once
//! at build time.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, BoxedMiddleware, Middleware};
use crate::types::Response;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased post hook.
pub type BoxedPostHook = Arc<dyn PostHook>;

/// A hook that runs once the response is known.
///
/// Implementations call [`AfterNext::run`] to hand over to the next post
/// hook. Not calling it skips the remaining post hooks.
pub trait PostHook: Send + Sync + 'static {
    /// Returns the name of this hook.
    fn name(&self) -> &'static str;

    /// Observes the response.
    fn process<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        response: &'a Response,
        next: &'a AfterNext,
    ) -> BoxFuture<'a, ()>;
}

/// The remainder of a post-hook chain. An empty chain does nothing.
#[derive(Default)]
pub struct AfterNext {
    inner: Option<(BoxedPostHook, Box<AfterNext>)>,
}

impl AfterNext {
    /// Creates the terminal, no-op link.
    #[must_use]
    pub fn end() -> Self {
        Self { inner: None }
    }

    /// Creates a link that runs `hook` before `next`.
    #[must_use]
    pub fn new(hook: BoxedPostHook, next: AfterNext) -> Self {
        Self {
            inner: Some((hook, Box::new(next))),
        }
    }

    /// Folds `hooks` into a chain; the first element runs first.
    #[must_use]
    pub fn fold<I>(hooks: I) -> Self
    where
        I: IntoIterator<Item = BoxedPostHook>,
        I::IntoIter: DoubleEndedIterator,
    {
        hooks
            .into_iter()
            .rev()
            .fold(Self::end(), |next, hook| Self::new(hook, next))
    }

    /// Runs the next post hook, if any.
    pub fn run<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        response: &'a Response,
    ) -> BoxFuture<'a, ()> {
        match &self.inner {
            Some((hook, next)) => hook.process(ctx, response, next),
            None => Box::pin(async {}),
        }
    }

    /// Returns the hook names from this link to the end.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut cursor = self;
        while let Some((hook, next)) = &cursor.inner {
            names.push(hook.name());
            cursor = next;
        }
        names
    }
}

impl fmt::Debug for AfterNext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterNext")
            .field("hooks", &self.names())
            .finish()
    }
}

/// A post hook built from a closure.
///
/// # Example
///
/// ```
/// use turtle_middleware::FnPostHook;
///
/// let audit = FnPostHook::new("audit", |ctx, response| {
///     tracing::info!(
///         request_id = %ctx.request_id(),
///         status = response.status().as_u16(),
///         "audited"
///     );
/// });
/// ```
pub struct FnPostHook<F> {
    name: &'static str,
    func: F,
}

impl<F> FnPostHook<F>
where
    F: Fn(&MiddlewareContext, &Response) + Send + Sync + 'static,
{
    /// Creates a new function-based post hook.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> PostHook for FnPostHook<F>
where
    F: Fn(&MiddlewareContext, &Response) + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        response: &'a Response,
        next: &'a AfterNext,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            (self.func)(ctx, response);
            next.run(ctx, response).await;
        })
    }
}

/// Turns an ordered list of pre hooks into the form [`Options::before`] takes.
///
/// [`Options::before`]: crate::options::Options::before
pub fn wrap_slice<I, M>(hooks: I) -> Vec<BoxedMiddleware>
where
    I: IntoIterator<Item = M>,
    M: Middleware,
{
    hooks
        .into_iter()
        .map(|hook| Arc::new(hook) as BoxedMiddleware)
        .collect()
}

/// Turns an ordered list of post hooks into the form [`Options::after`] takes.
///
/// [`Options::after`]: crate::options::Options::after
pub fn after_slice<I, H>(hooks: I) -> Vec<BoxedPostHook>
where
    I: IntoIterator<Item = H>,
    H: PostHook,
{
    hooks
        .into_iter()
        .map(|hook| Arc::new(hook) as BoxedPostHook)
        .collect()
}
