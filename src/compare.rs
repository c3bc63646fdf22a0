//! Block comparison strategies for the disparity search.
//!
//! A strategy scores how different two `block x block` windows are; lower is
//! more similar. Swapping the strategy changes only the ranking of candidates,
//! never the search range or the tie-break rule.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::geometry::RigGeometry;
use crate::intensity::IntensityView;

/// Name of the comparer a session uses unless told otherwise.
pub const DEFAULT_COMPARER: &str = "sad";

/// Top-left pixel of a comparison window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockOrigin {
    pub x: usize,
    pub y: usize,
}

impl BlockOrigin {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Pluggable window comparison.
///
/// Both views are full frames; implementations index them with the frame
/// width as row stride. Callers guarantee both windows lie inside the frame.
pub trait BlockComparer {
    /// Identifier used in configuration and logs.
    fn name(&self) -> &str;

    /// Dissimilarity of the window at `reference_origin` in `reference` and the
    /// window at `candidate_origin` in `candidate`.
    fn score(
        &self,
        rig: &RigGeometry,
        reference: &IntensityView<'_>,
        candidate: &IntensityView<'_>,
        reference_origin: BlockOrigin,
        candidate_origin: BlockOrigin,
        block_size: usize,
    ) -> u32;
}

impl<T: BlockComparer + ?Sized> BlockComparer for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(
        &self,
        rig: &RigGeometry,
        reference: &IntensityView<'_>,
        candidate: &IntensityView<'_>,
        reference_origin: BlockOrigin,
        candidate_origin: BlockOrigin,
        block_size: usize,
    ) -> u32 {
        (**self).score(
            rig,
            reference,
            candidate,
            reference_origin,
            candidate_origin,
            block_size,
        )
    }
}

/// Sum of absolute per-pixel intensity differences.
#[derive(Clone, Copy, Debug, Default)]
pub struct SumOfAbsoluteDifferences;

impl BlockComparer for SumOfAbsoluteDifferences {
    fn name(&self) -> &str {
        "sad"
    }

    fn score(
        &self,
        _rig: &RigGeometry,
        reference: &IntensityView<'_>,
        candidate: &IntensityView<'_>,
        reference_origin: BlockOrigin,
        candidate_origin: BlockOrigin,
        block_size: usize,
    ) -> u32 {
        let mut sad: u32 = 0;
        for y in 0..block_size {
            for x in 0..block_size {
                let a = reference.sample(reference_origin.x + x, reference_origin.y + y);
                let b = candidate.sample(candidate_origin.x + x, candidate_origin.y + y);
                // 65535 * 255 * 255 still fits in u32.
                sad += u32::from(a.abs_diff(b));
            }
        }
        sad
    }
}

/// Sum of squared per-pixel intensity differences, saturating at `u32::MAX`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SumOfSquaredDifferences;

impl BlockComparer for SumOfSquaredDifferences {
    fn name(&self) -> &str {
        "ssd"
    }

    fn score(
        &self,
        _rig: &RigGeometry,
        reference: &IntensityView<'_>,
        candidate: &IntensityView<'_>,
        reference_origin: BlockOrigin,
        candidate_origin: BlockOrigin,
        block_size: usize,
    ) -> u32 {
        let mut ssd: u64 = 0;
        for y in 0..block_size {
            for x in 0..block_size {
                let a = reference.sample(reference_origin.x + x, reference_origin.y + y);
                let b = candidate.sample(candidate_origin.x + x, candidate_origin.y + y);
                let diff = u64::from(a.abs_diff(b));
                ssd = ssd.saturating_add(diff * diff);
            }
        }
        u32::try_from(ssd).unwrap_or(u32::MAX)
    }
}

/// Named comparison strategies.
///
/// The first registered comparer becomes the default.
pub struct ComparerRegistry {
    comparers: HashMap<String, Arc<dyn BlockComparer + Send + Sync>>,
    default_name: Option<String>,
}

impl ComparerRegistry {
    pub fn new() -> Self {
        Self {
            comparers: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry holding `sad` (default) and `ssd`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SumOfAbsoluteDifferences);
        registry.register(SumOfSquaredDifferences);
        registry
    }

    pub fn register<C: BlockComparer + Send + Sync + 'static>(&mut self, comparer: C) {
        let name = comparer.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.comparers.insert(name, Arc::new(comparer));
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.comparers.contains_key(name) {
            return Err(anyhow!("comparer '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BlockComparer + Send + Sync>> {
        self.comparers.get(name).cloned()
    }

    /// Like `get`, but an unknown name is an error listing what is available.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn BlockComparer + Send + Sync>> {
        self.get(name).ok_or_else(|| {
            anyhow!(
                "unknown comparer '{}' (available: {})",
                name,
                self.list().join(", ")
            )
        })
    }

    pub fn default_comparer(&self) -> Option<Arc<dyn BlockComparer + Send + Sync>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.comparers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ComparerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
