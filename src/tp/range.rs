/// A half-open byte range `[start, end)` covered by a received TP segment,
/// with a `merge` that combines touching or overlapping ranges. Grounded on
/// the teacher's `SectionRange`, adapted to half-open bounds so adjacency is
/// `a.end >= b.start` rather than an inclusive touch.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct TpRange {
    pub start: u32,
    pub end: u32,
}

impl TpRange {
    pub fn new(start: u32, end: u32) -> TpRange {
        TpRange { start, end }
    }

    fn overlaps_or_touches(&self, other: &TpRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn merge(&self, other: TpRange) -> Option<TpRange> {
        if self.overlaps_or_touches(&other) {
            Some(TpRange {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            })
        } else {
            None
        }
    }

    /// True if this range's bytes are already entirely contained in `other`.
    pub fn is_subset_of(&self, other: &TpRange) -> bool {
        other.start <= self.start && self.end <= other.end
    }
}

/// Tracks the union of received byte ranges as a sorted list of disjoint,
/// non-touching `TpRange`s. Coverage is complete when the list collapses to
/// a single range spanning `[0, total_length)` (spec §4.4 invariant).
#[derive(Debug, Default, Clone)]
pub struct Coverage {
    ranges: Vec<TpRange>,
}

impl Coverage {
    pub fn new() -> Coverage {
        Coverage { ranges: Vec::new() }
    }

    /// True if `range` is already fully covered (used to detect duplicate
    /// segments for idempotent insertion, spec §4.4 step 3).
    pub fn contains(&self, range: TpRange) -> bool {
        self.ranges.iter().any(|r| range.is_subset_of(r))
    }

    pub fn insert(&mut self, range: TpRange) {
        let mut merged = range;
        let mut remaining = Vec::with_capacity(self.ranges.len());
        for existing in self.ranges.drain(..) {
            match merged.merge(existing) {
                Some(combined) => merged = combined,
                None => remaining.push(existing),
            }
        }
        remaining.push(merged);
        remaining.sort_by_key(|r| r.start);
        self.ranges = remaining;
    }

    pub fn is_complete(&self, total_length: u32) -> bool {
        matches!(self.ranges.as_slice(), [r] if r.start == 0 && r.end == total_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adjacent_and_overlapping() {
        let a = TpRange::new(0, 16);
        let b = TpRange::new(16, 32);
        assert_eq!(Some(TpRange::new(0, 32)), a.merge(b));

        let c = TpRange::new(8, 24);
        assert_eq!(Some(TpRange::new(0, 24)), a.merge(c));
    }

    #[test]
    fn merge_disjoint_is_none() {
        let a = TpRange::new(0, 16);
        let b = TpRange::new(32, 48);
        assert_eq!(None, a.merge(b));
    }

    #[test]
    fn coverage_completes_out_of_order() {
        let mut coverage = Coverage::new();
        assert!(!coverage.is_complete(48));
        coverage.insert(TpRange::new(32, 48));
        assert!(!coverage.is_complete(48));
        coverage.insert(TpRange::new(0, 16));
        assert!(!coverage.is_complete(48));
        coverage.insert(TpRange::new(16, 32));
        assert!(coverage.is_complete(48));
    }

    #[test]
    fn duplicate_segment_is_detected_as_already_covered() {
        let mut coverage = Coverage::new();
        coverage.insert(TpRange::new(0, 16));
        assert!(coverage.contains(TpRange::new(4, 12)));
        assert!(!coverage.contains(TpRange::new(8, 24)));
    }
}
