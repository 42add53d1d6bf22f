//! Chain links: the source stage plus one stage per transform.
//!
//! A stage's identity is its position in the chain, which the
//! [`Pipeline`](crate::pipeline::Pipeline) owns as a vector; predecessor
//! and successor are index relationships, never owning references. Each
//! stage holds its own output raster, published whole on every
//! successful recompute and discarded whole when superseded.

use crate::filter::Filter;
use crate::raster::Raster;

/// Validity of a stage's published output.
///
/// A freshly created stage has no output yet and starts `Invalid`; the
/// only way to become `Valid` is to publish a raster (or, for the
/// source, to republish the one it already holds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// The output raster reflects the current upstream state.
    Valid,
    /// The output raster (if any) is stale and awaiting recompute.
    Invalid,
}

/// What a stage contributes to the chain.
#[derive(Debug, Clone)]
pub enum StageKind {
    /// Holds the externally supplied image. Always first, never filters.
    Source,
    /// Applies one filter to its predecessor's output.
    Transform(Filter),
}

/// One link in the pipeline chain.
#[derive(Debug, Clone)]
pub struct Stage {
    kind: StageKind,
    output: Option<Raster>,
    validity: Validity,
    /// Bumped on every invalidation; scheduled recompute tasks carry the
    /// epoch they were created under and are dropped if it has moved on.
    epoch: u64,
}

impl Stage {
    pub(crate) const fn source() -> Self {
        Self {
            kind: StageKind::Source,
            output: None,
            validity: Validity::Invalid,
            epoch: 0,
        }
    }

    pub(crate) const fn transform(filter: Filter) -> Self {
        Self {
            kind: StageKind::Transform(filter),
            output: None,
            validity: Validity::Invalid,
            epoch: 0,
        }
    }

    /// Whether this is the source stage.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self.kind, StageKind::Source)
    }

    /// What this stage contributes to the chain.
    #[must_use]
    pub const fn kind(&self) -> &StageKind {
        &self.kind
    }

    /// Current validity flag.
    #[must_use]
    pub const fn validity(&self) -> Validity {
        self.validity
    }

    /// Whether the published output reflects the current upstream state.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    /// The most recently published output raster, if any.
    ///
    /// May be stale; check [`validity`](Self::validity) before relying
    /// on it.
    #[must_use]
    pub const fn output(&self) -> Option<&Raster> {
        self.output.as_ref()
    }

    /// This stage's filter, or `None` for the source stage.
    #[must_use]
    pub const fn filter(&self) -> Option<&Filter> {
        match &self.kind {
            StageKind::Source => None,
            StageKind::Transform(filter) => Some(filter),
        }
    }

    pub(crate) const fn filter_mut(&mut self) -> Option<&mut Filter> {
        match &mut self.kind {
            StageKind::Source => None,
            StageKind::Transform(filter) => Some(filter),
        }
    }

    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Flag flip only: mark stale and supersede any pending recompute.
    pub(crate) const fn invalidate(&mut self) {
        self.validity = Validity::Invalid;
        self.epoch += 1;
    }

    /// Replace the output wholesale and mark it current.
    pub(crate) fn publish(&mut self, raster: Raster) {
        self.output = Some(raster);
        self.validity = Validity::Valid;
    }

    /// Mark the existing output current again without replacing it.
    ///
    /// Only meaningful for the source stage, whose raster is supplied
    /// externally rather than recomputed.
    pub(crate) const fn revalidate(&mut self) {
        self.validity = Validity::Valid;
    }
}
