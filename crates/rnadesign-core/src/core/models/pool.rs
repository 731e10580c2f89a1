use super::ids::VariantId;
use super::sequence::Sequence;
use super::variant::Variant;
use slotmap::SlotMap;

/// Accepted variants in acceptance order.
///
/// The pool owns every variant; groups and other consumers hold [`VariantId`]s.
/// Insertion order is significant because the non-repetitiveness filter gives
/// earlier variants priority.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    variants: SlotMap<VariantId, Variant>,
    order: Vec<VariantId>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            variants: SlotMap::with_capacity_and_key(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, variant: Variant) -> VariantId {
        let id = self.variants.insert(variant);
        self.order.push(id);
        id
    }

    pub fn get(&self, id: VariantId) -> Option<&Variant> {
        self.variants.get(id)
    }

    pub fn contains(&self, id: VariantId) -> bool {
        self.variants.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in acceptance order.
    pub fn ids(&self) -> &[VariantId] {
        &self.order
    }

    pub fn id_at(&self, position: usize) -> Option<VariantId> {
        self.order.get(position).copied()
    }

    pub fn position_of(&self, id: VariantId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariantId, &Variant)> + '_ {
        self.order.iter().map(|&id| (id, &self.variants[id]))
    }

    pub fn variants(&self) -> impl Iterator<Item = &Variant> + '_ {
        self.order.iter().map(|&id| &self.variants[id])
    }

    pub fn sequences(&self) -> Vec<&Sequence> {
        self.variants().map(|v| &v.sequence).collect()
    }

    /// Consumes the pool, yielding variants in acceptance order.
    pub fn into_variants(mut self) -> Vec<Variant> {
        self.order
            .iter()
            .filter_map(|&id| self.variants.remove(id))
            .collect()
    }
}

impl FromIterator<Variant> for CandidatePool {
    fn from_iter<I: IntoIterator<Item = Variant>>(iter: I) -> Self {
        let mut pool = CandidatePool::new();
        pool.extend(iter);
        pool
    }
}

impl Extend<Variant> for CandidatePool {
    fn extend<I: IntoIterator<Item = Variant>>(&mut self, iter: I) {
        for variant in iter {
            self.push(variant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::variant_from;

    #[test]
    fn push_preserves_acceptance_order() {
        let mut pool = CandidatePool::new();
        let a = pool.push(variant_from("GGGAAACCC"));
        let b = pool.push(variant_from("GCGAAAGCC"));
        assert_eq!(pool.ids(), &[a, b]);
        assert_eq!(pool.position_of(b), Some(1));
        let seqs: Vec<String> = pool.sequences().iter().map(|s| s.to_string()).collect();
        assert_eq!(seqs, vec!["GGGAAACCC", "GCGAAAGCC"]);
    }

    #[test]
    fn into_variants_returns_variants_in_order() {
        let pool: CandidatePool = ["AAAACCCC", "CCCCAAAA", "GGGGUUUU"]
            .into_iter()
            .map(variant_from)
            .collect();
        let seqs: Vec<String> = pool
            .into_variants()
            .into_iter()
            .map(|v| v.sequence.to_string())
            .collect();
        assert_eq!(seqs, vec!["AAAACCCC", "CCCCAAAA", "GGGGUUUU"]);
    }

    #[test]
    fn get_returns_none_for_foreign_ids() {
        let mut first = CandidatePool::new();
        let mut second = CandidatePool::new();
        second.push(variant_from("ACGU"));
        let id = second.push(variant_from("UGCA"));
        first.push(variant_from("AAAA"));
        assert!(first.get(id).is_none());
        assert!(second.contains(id));
    }
}
