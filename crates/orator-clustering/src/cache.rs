//! Memoized symmetric distance table.
//!
//! Distances are expensive (a DTW table per node pair), so every pair is
//! measured at most once and mirrored into both rows. Elements are kept in
//! insertion order; every scan walks that order, which makes tie-breaking
//! deterministic: the first minimum wins.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

use orator_core::errors::OratorResult;

use crate::measure::Measurable;

struct CacheEntry<T: Measurable> {
    element: T,
    row: FxHashMap<T::Id, f64>,
}

/// Symmetric, lazily filled distance cache over any [`Measurable`] type.
pub struct DistanceCache<T: Measurable> {
    order: Vec<T::Id>,
    entries: FxHashMap<T::Id, CacheEntry<T>>,
}

impl<T: Measurable> Default for DistanceCache<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: FxHashMap::default(),
        }
    }
}

impl<T: Measurable> std::fmt::Debug for DistanceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceCache")
            .field("elements", &self.order)
            .field("cached_pairs", &self.cached_pairs())
            .finish()
    }
}

/// Number of elements `nearest_fraction` returns out of `n` candidates.
pub fn fraction_len(n: usize, ratio: f64) -> usize {
    let share = (n as f64 * ratio).round().max(0.0) as usize;
    share.max(n.min(2)).min(n)
}

impl<T: Measurable> DistanceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.entries.get(id).map(|entry| &entry.element)
    }

    /// Mutable access that keeps memoized distances.
    ///
    /// Only for changes that cannot affect distances; use
    /// [`update_with`](Self::update_with) otherwise.
    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.entries.get_mut(id).map(|entry| &mut entry.element)
    }

    /// Registered elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| &entry.element))
    }

    /// Register an element with an empty row. Returns `false` if its id is
    /// already present, in which case the stored element is kept.
    pub fn register(&mut self, element: T) -> bool {
        let id = element.id().clone();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.order.push(id.clone());
        self.entries.insert(
            id,
            CacheEntry {
                element,
                row: FxHashMap::default(),
            },
        );
        true
    }

    /// Mutate an element in place, then drop its memoized distances.
    pub fn update_with<R>(&mut self, id: &T::Id, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = f(&mut self.entries.get_mut(id)?.element);
        self.invalidate(id);
        Some(result)
    }

    /// Forget every distance involving `id`, keeping the element registered.
    fn invalidate(&mut self, id: &T::Id) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let partners: Vec<T::Id> = entry.row.drain().map(|(partner, _)| partner).collect();
        for partner in partners {
            if let Some(other) = self.entries.get_mut(&partner) {
                other.row.remove(id);
            }
        }
    }

    /// Remove an element and scrub it from every other row.
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|existing| existing != id);
        for other in self.entries.values_mut() {
            other.row.remove(id);
        }
        Some(entry.element)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    /// Previously memoized distance, without computing anything.
    pub fn cached_distance(&self, a: &T::Id, b: &T::Id) -> Option<f64> {
        self.entries.get(a)?.row.get(b).copied()
    }

    /// Number of unordered pairs with a memoized distance.
    pub fn cached_pairs(&self) -> usize {
        self.entries.values().map(|entry| entry.row.len()).sum::<usize>() / 2
    }

    /// Distance between two registered elements.
    ///
    /// An id that is not registered is treated as infinitely far away.
    pub fn distance_by_id(
        &mut self,
        a: &T::Id,
        b: &T::Id,
        context: &mut T::Context,
    ) -> OratorResult<f64> {
        if a == b {
            return Ok(0.0);
        }

        let distance = {
            let (Some(left), Some(right)) = (self.entries.get(a), self.entries.get(b)) else {
                return Ok(f64::INFINITY);
            };
            if let Some(&cached) = left.row.get(b) {
                return Ok(cached);
            }
            left.element.measure(&right.element, context)?
        };

        if let Some(left) = self.entries.get_mut(a) {
            left.row.insert(b.clone(), distance);
        }
        if let Some(right) = self.entries.get_mut(b) {
            right.row.insert(a.clone(), distance);
        }
        Ok(distance)
    }

    /// Closest registered element to `target`, skipping `target` itself and
    /// everything in `excluding`. Infinitely distant elements never qualify.
    pub fn closest(
        &mut self,
        target: &T::Id,
        excluding: &FxHashSet<T::Id>,
        context: &mut T::Context,
    ) -> OratorResult<Option<T::Id>> {
        let mut minimum = f64::INFINITY;
        let mut closest = None;

        for index in 0..self.order.len() {
            let candidate = self.order[index].clone();
            if candidate == *target || excluding.contains(&candidate) {
                continue;
            }
            let distance = self.distance_by_id(target, &candidate, context)?;
            if distance < minimum {
                minimum = distance;
                closest = Some(candidate);
            }
        }
        Ok(closest)
    }

    /// `closest(target)`, but only when `target` is in turn closest to it.
    pub fn mutual_nearest(
        &mut self,
        target: &T::Id,
        context: &mut T::Context,
    ) -> OratorResult<Option<T::Id>> {
        let nobody = FxHashSet::default();
        let Some(candidate) = self.closest(target, &nobody, context)? else {
            return Ok(None);
        };
        let look_back = self.closest(&candidate, &nobody, context)?;
        Ok((look_back.as_ref() == Some(target)).then_some(candidate))
    }

    /// The closest `max(round(N * ratio), min(2, N))` elements, ascending by
    /// distance, where N counts every registered element except `target`.
    pub fn nearest_fraction_by_id(
        &mut self,
        target: &T::Id,
        ratio: f64,
        context: &mut T::Context,
    ) -> OratorResult<Vec<T::Id>> {
        let mut ranked = Vec::with_capacity(self.order.len());
        for index in 0..self.order.len() {
            let candidate = self.order[index].clone();
            if candidate == *target {
                continue;
            }
            let distance = self.distance_by_id(target, &candidate, context)?;
            ranked.push((distance, candidate));
        }
        // Stable: equal distances keep insertion order.
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let keep = fraction_len(ranked.len(), ratio);
        Ok(ranked.into_iter().take(keep).map(|(_, id)| id).collect())
    }

    /// Uniformly random registered element outside `except`.
    pub fn random_element<R: Rng + ?Sized>(
        &self,
        except: &FxHashSet<T::Id>,
        rng: &mut R,
    ) -> Option<T::Id> {
        let pool: Vec<&T::Id> = self.order.iter().filter(|id| !except.contains(*id)).collect();
        pool.choose(rng).map(|id| (*id).clone())
    }
}

impl<T: Measurable + Clone> DistanceCache<T> {
    /// Distance between two elements, registering either one if needed.
    pub fn distance(&mut self, a: &T, b: &T, context: &mut T::Context) -> OratorResult<f64> {
        self.register(a.clone());
        self.register(b.clone());
        self.distance_by_id(a.id(), b.id(), context)
    }

    /// [`nearest_fraction_by_id`](Self::nearest_fraction_by_id), registering
    /// `target` first if needed.
    pub fn nearest_fraction(
        &mut self,
        target: &T,
        ratio: f64,
        context: &mut T::Context,
    ) -> OratorResult<Vec<T::Id>> {
        self.register(target.clone());
        self.nearest_fraction_by_id(target.id(), ratio, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// 1-D point whose metric counts invocations in its context.
    #[derive(Debug, Clone)]
    struct Point {
        id: u32,
        x: f64,
    }

    impl Measurable for Point {
        type Id = u32;
        type Context = usize;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn measure(&self, other: &Self, calls: &mut usize) -> OratorResult<f64> {
            *calls += 1;
            Ok((self.x - other.x).abs())
        }
    }

    fn p(id: u32, x: f64) -> Point {
        Point { id, x }
    }

    #[test]
    fn distance_is_symmetric_and_memoized() {
        let mut cache = DistanceCache::new();
        let mut calls = 0;
        let (a, b) = (p(1, 0.0), p(2, 3.0));

        assert_eq!(cache.distance(&a, &b, &mut calls).unwrap(), 3.0);
        assert_eq!(cache.distance(&b, &a, &mut calls).unwrap(), 3.0);
        assert_eq!(cache.distance(&a, &b, &mut calls).unwrap(), 3.0);
        assert_eq!(calls, 1);
        assert_eq!(cache.cached_distance(&2, &1), Some(3.0));
    }

    #[test]
    fn querying_registers_both_elements() {
        let mut cache = DistanceCache::new();
        cache.distance(&p(1, 0.0), &p(2, 1.0), &mut 0).unwrap();
        assert!(cache.contains(&1) && cache.contains(&2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn closest_breaks_ties_by_insertion_order() {
        let mut cache = DistanceCache::new();
        cache.register(p(1, 0.0));
        cache.register(p(2, 2.0));
        cache.register(p(3, -2.0));
        let closest = cache.closest(&1, &FxHashSet::default(), &mut 0).unwrap();
        assert_eq!(closest, Some(2));

        let skip_two: FxHashSet<u32> = [2].into_iter().collect();
        let closest = cache.closest(&1, &skip_two, &mut 0).unwrap();
        assert_eq!(closest, Some(3));
    }

    #[test]
    fn remove_scrubs_every_row() {
        let mut cache = DistanceCache::new();
        let mut calls = 0;
        for i in 0..4 {
            cache.register(p(i, f64::from(i)));
        }
        for a in 0..4 {
            for b in 0..4 {
                cache.distance_by_id(&a, &b, &mut calls).unwrap();
            }
        }
        assert_eq!(cache.cached_pairs(), 6);

        let removed = cache.remove(&2).unwrap();
        assert_eq!(removed.x, 2.0);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.cached_pairs(), 3);
        assert_eq!(cache.cached_distance(&0, &2), None);
        assert!(cache.distance_by_id(&0, &2, &mut calls).unwrap().is_infinite());
    }

    #[test]
    fn update_with_invalidates_both_directions() {
        let mut cache = DistanceCache::new();
        let mut calls = 0;
        cache.register(p(1, 0.0));
        cache.register(p(2, 1.0));
        cache.distance_by_id(&1, &2, &mut calls).unwrap();

        cache.update_with(&2, |point| point.x = 5.0);
        assert_eq!(cache.cached_distance(&1, &2), None);
        assert_eq!(cache.distance_by_id(&1, &2, &mut calls).unwrap(), 5.0);
        assert_eq!(calls, 2);
    }

    #[test]
    fn mutual_nearest_requires_look_back() {
        // 1 and 2 are mutually nearest; 3 and 4 look toward someone who looks away.
        let mut cache = DistanceCache::new();
        for (id, x) in [(1, 0.0), (2, 1.0), (3, 3.5), (4, 6.0)] {
            cache.register(p(id, x));
        }
        assert_eq!(cache.mutual_nearest(&1, &mut 0).unwrap(), Some(2));
        assert_eq!(cache.mutual_nearest(&2, &mut 0).unwrap(), Some(1));
        assert_eq!(cache.mutual_nearest(&3, &mut 0).unwrap(), None);
        assert_eq!(cache.mutual_nearest(&4, &mut 0).unwrap(), None);
    }

    #[test]
    fn nearest_fraction_rounds_and_keeps_at_least_two() {
        let mut cache = DistanceCache::new();
        for i in 0..11 {
            cache.register(p(i, f64::from(i)));
        }
        // N = 10 others, 10 * 0.3 = 3.
        let near = cache.nearest_fraction_by_id(&0, 0.3, &mut 0).unwrap();
        assert_eq!(near, vec![1, 2, 3]);
        // 10 * 0.05 rounds to 1, floor of two applies.
        let near = cache.nearest_fraction_by_id(&0, 0.05, &mut 0).unwrap();
        assert_eq!(near, vec![1, 2]);
    }

    #[test]
    fn fraction_len_edges() {
        assert_eq!(fraction_len(0, 0.3), 0);
        assert_eq!(fraction_len(1, 0.3), 1);
        assert_eq!(fraction_len(5, 0.3), 2);
        assert_eq!(fraction_len(5, 0.5), 3);
        assert_eq!(fraction_len(4, 1.0), 4);
    }

    #[test]
    fn random_element_respects_exclusions() {
        let mut cache = DistanceCache::new();
        for i in 0..3 {
            cache.register(p(i, 0.0));
        }
        let mut rng = SmallRng::seed_from_u64(7);
        let except: FxHashSet<u32> = [0, 2].into_iter().collect();
        for _ in 0..20 {
            assert_eq!(cache.random_element(&except, &mut rng), Some(1));
        }
        let everyone: FxHashSet<u32> = [0, 1, 2].into_iter().collect();
        assert_eq!(cache.random_element(&everyone, &mut rng), None);
    }
}
