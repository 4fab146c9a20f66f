//! The set of stages owned by a database handle.

use std::sync::Arc;

use crate::config::Config;
use crate::logger::Logger;
use crate::stage::{Stage, StageKind};

/// One [`Stage`] per [`StageKind`].
#[derive(Debug)]
pub struct Callbacks {
    create: Stage,
    query: Stage,
    update: Stage,
    delete: Stage,
    row: Stage,
    raw: Stage,
}

impl Callbacks {
    pub(crate) fn new(config: &Arc<Config>, logger: &Arc<dyn Logger>) -> Self {
        let stage = |kind| Stage::new(kind, Arc::clone(config), Arc::clone(logger));
        Self {
            create: stage(StageKind::Create),
            query: stage(StageKind::Query),
            update: stage(StageKind::Update),
            delete: stage(StageKind::Delete),
            row: stage(StageKind::Row),
            raw: stage(StageKind::Raw),
        }
    }

    pub const fn stage(&self, kind: StageKind) -> &Stage {
        match kind {
            StageKind::Create => &self.create,
            StageKind::Query => &self.query,
            StageKind::Update => &self.update,
            StageKind::Delete => &self.delete,
            StageKind::Row => &self.row,
            StageKind::Raw => &self.raw,
        }
    }

    pub fn stage_mut(&mut self, kind: StageKind) -> &mut Stage {
        match kind {
            StageKind::Create => &mut self.create,
            StageKind::Query => &mut self.query,
            StageKind::Update => &mut self.update,
            StageKind::Delete => &mut self.delete,
            StageKind::Row => &mut self.row,
            StageKind::Raw => &mut self.raw,
        }
    }

    pub const fn create(&self) -> &Stage {
        &self.create
    }

    pub fn create_mut(&mut self) -> &mut Stage {
        &mut self.create
    }

    pub const fn query(&self) -> &Stage {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Stage {
        &mut self.query
    }

    pub const fn update(&self) -> &Stage {
        &self.update
    }

    pub fn update_mut(&mut self) -> &mut Stage {
        &mut self.update
    }

    pub const fn delete(&self) -> &Stage {
        &self.delete
    }

    pub fn delete_mut(&mut self) -> &mut Stage {
        &mut self.delete
    }

    pub const fn row(&self) -> &Stage {
        &self.row
    }

    pub fn row_mut(&mut self) -> &mut Stage {
        &mut self.row
    }

    pub const fn raw(&self) -> &Stage {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut Stage {
        &mut self.raw
    }
}
