//! Override materials for draw items.
//!
//! Each draw item is drawn with a program that keeps its vertex transformation
//! (morphing, skinning, instancing, culling) and outputs a flat color. Programs
//! are cached per [`FeatureSignature`], so the cache holds at most
//! [`FeatureSignature::CARDINALITY`] entries and never evicts.

use crate::backend::PickBackend;
use crate::draw_item::DrawItem;
use crate::options::PickerOptions;
use crate::signature::FeatureSignature;

/// Override programs keyed by feature signature.
#[derive(Debug)]
pub struct OverrideMaterialCache<P> {
    entries: [Option<P>; FeatureSignature::CARDINALITY],
}

impl<P> OverrideMaterialCache<P> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: std::array::from_fn(|_| None),
        }
    }

    /// Returns the program for a signature, if already built.
    #[must_use]
    pub fn get(&self, signature: FeatureSignature) -> Option<&P> {
        self.entries[signature.index()].as_ref()
    }

    /// Returns the program for a signature, building it on first use.
    pub fn get_or_insert_with(
        &mut self,
        signature: FeatureSignature,
        build: impl FnOnce() -> P,
    ) -> &P {
        self.entries[signature.index()].get_or_insert_with(build)
    }

    /// Number of programs built so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Signatures that have a program.
    pub fn signatures(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_some())
            .filter_map(|(index, _)| u8::try_from(index).ok())
    }
}

impl<P> Default for OverrideMaterialCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects the override program for each draw item.
#[derive(Debug)]
pub struct DrawItemAdapter<P> {
    cache: OverrideMaterialCache<P>,
}

impl<P: Clone> DrawItemAdapter<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: OverrideMaterialCache::new(),
        }
    }

    /// Returns the program to draw `item` with.
    ///
    /// A program supplied by the item itself wins and bypasses the cache.
    /// Otherwise the cached program for the item's signature is used, built
    /// by `backend` on a miss.
    pub fn material_for<B>(
        &mut self,
        backend: &mut B,
        item: &B::Item,
        options: &PickerOptions,
    ) -> P
    where
        B: PickBackend<Program = P>,
    {
        if let Some(program) = item.pick_program() {
            return program.clone();
        }

        let signature = FeatureSignature::of(item);
        self.cache
            .get_or_insert_with(signature, || {
                log::debug!(
                    "building pick override program for signature {:#08b}",
                    signature.bits()
                );
                backend.build_override_program(signature, options)
            })
            .clone()
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> &OverrideMaterialCache<P> {
        &self.cache
    }
}

impl<P: Clone> Default for DrawItemAdapter<P> {
    fn default() -> Self {
        Self::new()
    }
}
