//! Property merge engine
//!
//! Combines an Original property (the placed instance) with a Parent
//! property (the template it was placed from) and an optional dataset row
//! into one effective tree. A merge runs in two phases:
//!
//! 1. plan: pair items, groups, and fields, pick winners, bind links to their
//!    row context (pure, no I/O);
//! 2. resolve: one batched pass over every link chain of the plan, then each
//!    field reads its value from the pass memo.
//!
//! Nothing is cached across merges and the inputs are never modified.

mod merged;
mod plan;

pub use merged::{FieldSource, MergedField, MergedGroup, MergedGroupList, MergedItem, MergedProperty};
pub use plan::MergePlan;

use std::time::Duration;

use crate::cancel::{CancelToken, Cancelled};
use crate::config::EngineConfig;
use crate::error::ErrorCode;
use crate::ids::{DatasetId, SchemaId};
use crate::link::{BatchResolver, ResolveError, Resolver, DEFAULT_MAX_LINK_DEPTH};
use crate::property::Property;
use crate::schema::Schema;

/// Errors that abort a property merge. No partial tree is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    LinkResolutionFailed(#[from] ResolveError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("Schema mismatch: expected '{expected}', found '{found}'")]
    SchemaMismatch { expected: SchemaId, found: SchemaId },
}

impl MergeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MergeError::LinkResolutionFailed(_) => ErrorCode::LinkResolutionFailed,
            MergeError::Cancelled(_) => ErrorCode::Cancelled,
            MergeError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
        }
    }
}

/// What to merge
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeInput<'a> {
    pub original: Option<&'a Property>,
    pub parent: Option<&'a Property>,
    /// Row the merged property is bound to (a layer created from a dataset)
    pub context: Option<&'a DatasetId>,
    /// Enables schema-default fallback for unset fields
    pub schema: Option<&'a Schema>,
}

impl<'a> MergeInput<'a> {
    pub fn new(original: Option<&'a Property>, parent: Option<&'a Property>) -> Self {
        Self {
            original,
            parent,
            context: None,
            schema: None,
        }
    }

    pub fn with_context(mut self, context: Option<&'a DatasetId>) -> Self {
        self.context = context;
        self
    }

    pub fn with_schema(mut self, schema: Option<&'a Schema>) -> Self {
        self.schema = schema;
        self
    }
}

/// Runs merges against one resolver
#[derive(Debug)]
pub struct MergeEngine<'a, R: Resolver + ?Sized> {
    resolver: &'a R,
    workers: usize,
    max_depth: usize,
    timeout: Option<Duration>,
}

impl<'a, R: Resolver + ?Sized> MergeEngine<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            workers: 1,
            max_depth: DEFAULT_MAX_LINK_DEPTH,
            timeout: None,
        }
    }

    /// Engine tuned by the effective configuration
    pub fn from_config(resolver: &'a R, config: &EngineConfig) -> Self {
        Self {
            resolver,
            workers: config.worker_threads,
            max_depth: config.max_link_depth,
            timeout: config.resolve_timeout(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn resolver(&self) -> &'a R {
        self.resolver
    }

    /// Batch driver configured like this engine
    pub fn batch(&self) -> BatchResolver<'a, R> {
        BatchResolver::new(self.resolver)
            .with_workers(self.workers)
            .with_max_depth(self.max_depth)
    }

    /// Token for one pass: the caller's flag, with the engine timeout unless
    /// the caller already set a deadline
    pub fn pass_token(&self, cancel: &CancelToken) -> CancelToken {
        match (cancel.remaining(), self.timeout) {
            (None, Some(timeout)) => cancel.child(Some(timeout)),
            _ => cancel.clone(),
        }
    }

    /// Merge one property. `Ok(None)` when both inputs are absent.
    pub fn merge(&self, input: MergeInput<'_>, cancel: &CancelToken) -> Result<Option<MergedProperty>, MergeError> {
        let token = self.pass_token(cancel);
        token.check()?;
        let Some(plan) = MergePlan::new(&input)? else {
            return Ok(None);
        };
        let memo = self.batch().prefetch(&plan.chains(), &token).map_err(|reason| {
            tracing::warn!(%reason, "merge pass cancelled");
            MergeError::Cancelled(reason)
        })?;
        plan.resolve(&memo, input.schema).map(Some)
    }
}
