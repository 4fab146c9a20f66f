//! Stages: one registry and one compiled pipeline per operation kind.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::compiler::compile;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::registry::Registry;
use crate::statement::Statement;
use crate::step::{Action, Anchor, Condition, DuplicateStep, Step};

/// The operation kinds a database runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Create,
    Query,
    Update,
    Delete,
    Row,
    Raw,
}

impl StageKind {
    pub const ALL: [Self; 6] = [
        Self::Create,
        Self::Query,
        Self::Update,
        Self::Delete,
        Self::Row,
        Self::Raw,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Query => "query",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Row => "row",
            Self::Raw => "raw",
        }
    }

    /// Clause names the stage renders by default.
    fn clauses(self, config: &Config) -> Vec<String> {
        match self {
            Self::Create => config.create_clauses.clone(),
            Self::Query | Self::Row => config.query_clauses.clone(),
            Self::Update => config.update_clauses.clone(),
            Self::Delete => config.delete_clauses.clone(),
            Self::Raw => Vec::new(),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pipeline of steps for one operation kind.
///
/// Every registry mutation recompiles immediately. When compilation fails the
/// mutation is kept, the error is returned, and the stage refuses to execute
/// until a later mutation compiles again.
pub struct Stage {
    kind: StageKind,
    config: Arc<Config>,
    logger: Arc<dyn Logger>,
    pub(crate) clauses: Vec<String>,
    registry: Registry,
    pub(crate) compiled: Option<Arc<[Action]>>,
    order: Vec<String>,
    duplicates: Vec<DuplicateStep>,
    /// Duplicates already logged, so recompiles stay quiet about them.
    warned: Vec<DuplicateStep>,
}

impl Stage {
    pub(crate) fn new(kind: StageKind, config: Arc<Config>, logger: Arc<dyn Logger>) -> Self {
        Self {
            kind,
            clauses: kind.clauses(&config),
            config,
            logger,
            registry: Registry::default(),
            compiled: Some(Arc::from(Vec::new())),
            order: Vec::new(),
            duplicates: Vec::new(),
            warned: Vec::new(),
        }
    }

    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    /// Clause names adopted by statements that set none.
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    /// Every registry entry, tombstones and superseded entries included.
    pub fn steps(&self) -> &[Step] {
        self.registry.steps()
    }

    /// Step names in execution order, or `None` while the stage is stale.
    pub fn compiled_order(&self) -> Option<&[String]> {
        self.compiled.as_ref().map(|_| self.order.as_slice())
    }

    /// Duplicate-name warnings of the last successful compilation.
    pub fn duplicates(&self) -> &[DuplicateStep] {
        &self.duplicates
    }

    /// Whether the last compilation failed.
    pub const fn is_stale(&self) -> bool {
        self.compiled.is_none()
    }

    /// Returns the newest live action registered as `name`.
    pub fn lookup(&self, name: &str) -> Option<Action> {
        self.registry.lookup(name)
    }

    /// Starts a step definition constrained to run before `anchor`.
    pub fn before(&mut self, anchor: impl Into<Anchor>) -> StepBuilder<'_> {
        StepBuilder::new(self).before(anchor)
    }

    /// Starts a step definition constrained to run after `anchor`.
    pub fn after(&mut self, anchor: impl Into<Anchor>) -> StepBuilder<'_> {
        StepBuilder::new(self).after(anchor)
    }

    /// Starts a step definition included only while `condition` holds.
    pub fn when(
        &mut self,
        condition: impl Fn(&Config) -> bool + Send + Sync + 'static,
    ) -> StepBuilder<'_> {
        StepBuilder::new(self).when(condition)
    }

    #[track_caller]
    pub fn register(
        &mut self,
        name: &str,
        action: impl Fn(&mut Statement<'_>) + Send + Sync + 'static,
    ) -> Result<()> {
        StepBuilder::new(self).register(name, action)
    }

    #[track_caller]
    pub fn register_before(
        &mut self,
        name: &str,
        anchor: impl Into<Anchor>,
        action: impl Fn(&mut Statement<'_>) + Send + Sync + 'static,
    ) -> Result<()> {
        self.before(anchor).register(name, action)
    }

    #[track_caller]
    pub fn register_after(
        &mut self,
        name: &str,
        anchor: impl Into<Anchor>,
        action: impl Fn(&mut Statement<'_>) + Send + Sync + 'static,
    ) -> Result<()> {
        self.after(anchor).register(name, action)
    }

    /// Supersedes every earlier step named `name`.
    #[track_caller]
    pub fn replace(
        &mut self,
        name: &str,
        action: impl Fn(&mut Statement<'_>) + Send + Sync + 'static,
    ) -> Result<()> {
        StepBuilder::new(self).replace(name, action)
    }

    /// Suppresses every step named `name` until it is replaced.
    #[track_caller]
    pub fn remove(&mut self, name: &str) -> Result<()> {
        StepBuilder::new(self).remove(name)
    }

    fn push(&mut self, step: Step) -> Result<()> {
        self.registry.push(step);
        self.compile()
    }

    fn compile(&mut self) -> Result<()> {
        match compile(self.registry.candidates(&self.config)) {
            Ok(compiled) => {
                for duplicate in &compiled.duplicates {
                    if !self.warned.contains(duplicate) {
                        self.logger
                            .warn(&format!("{} callbacks: {duplicate}", self.kind));
                        self.warned.push(duplicate.clone());
                    }
                }
                self.compiled = Some(Arc::from(compiled.actions));
                self.order = compiled.order;
                self.duplicates = compiled.duplicates;
                Ok(())
            }
            Err(conflict) => {
                self.logger
                    .error(&format!("{} callbacks: {conflict}", self.kind));
                self.compiled = None;
                self.order.clear();
                self.duplicates.clear();
                Err(Error::Conflict(conflict))
            }
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind)
            .field("clauses", &self.clauses)
            .field("steps", &self.registry.steps())
            .field("order", &self.compiled_order())
            .finish_non_exhaustive()
    }
}

/// Fluent step definition: combine constraints and a condition, then
/// register, replace or remove.
///
/// ```rust
/// # use oxide_callbacks::{Config, Database};
/// # fn demo(db: &mut Database) -> oxide_callbacks::Result<()> {
/// db.callbacks_mut()
///     .create_mut()
///     .after("oxide:before_create")
///     .before("oxide:create")
///     .when(|config: &Config| !config.dry_run)
///     .register("audit:stamp", |stmt| {
///         stmt.skip_hooks = false;
///     })?;
/// # Ok(())
/// # }
/// ```
#[must_use = "a step builder does nothing until registered"]
pub struct StepBuilder<'s> {
    stage: &'s mut Stage,
    before: Option<Anchor>,
    after: Option<Anchor>,
    condition: Option<Condition>,
}

impl<'s> StepBuilder<'s> {
    fn new(stage: &'s mut Stage) -> Self {
        Self {
            stage,
            before: None,
            after: None,
            condition: None,
        }
    }

    pub fn before(mut self, anchor: impl Into<Anchor>) -> Self {
        self.before = Some(anchor.into());
        self
    }

    pub fn after(mut self, anchor: impl Into<Anchor>) -> Self {
        self.after = Some(anchor.into());
        self
    }

    pub fn when(mut self, condition: impl Fn(&Config) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Arc::new(condition));
        self
    }

    #[track_caller]
    fn step(self, name: &str, action: Option<Action>) -> (&'s mut Stage, Step) {
        let step = Step {
            name: name.to_string(),
            before: self.before,
            after: self.after,
            condition: self.condition,
            action,
            tombstoned: false,
            replacing: false,
            location: Location::caller(),
        };
        (self.stage, step)
    }

    #[track_caller]
    pub fn register(
        self,
        name: &str,
        action: impl Fn(&mut Statement<'_>) + Send + Sync + 'static,
    ) -> Result<()> {
        let (stage, step) = self.step(name, Some(Arc::new(action)));
        stage.push(step)
    }

    #[track_caller]
    pub fn replace(
        self,
        name: &str,
        action: impl Fn(&mut Statement<'_>) + Send + Sync + 'static,
    ) -> Result<()> {
        let (stage, mut step) = self.step(name, Some(Arc::new(action)));
        step.replacing = true;
        stage
            .logger
            .info(&format!("replacing callback `{name}` from {}", step.location));
        stage.push(step)
    }

    #[track_caller]
    pub fn remove(self, name: &str) -> Result<()> {
        let (stage, mut step) = self.step(name, None);
        step.tombstoned = true;
        stage
            .logger
            .warn(&format!("removing callback `{name}` from {}", step.location));
        stage.push(step)
    }
}
