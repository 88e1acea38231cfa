//! Static/dynamic template embeddings and fused keypoint visibility.

use crate::tracker::keypoints::NUM_KEYPOINTS;

/// OR-accumulate `incoming` into `fused`. A keypoint once seen visible stays visible.
pub fn fuse_visibility(
    fused: &[bool; NUM_KEYPOINTS],
    incoming: &[bool; NUM_KEYPOINTS],
) -> [bool; NUM_KEYPOINTS] {
    std::array::from_fn(|i| fused[i] || incoming[i])
}

/// Appearance templates of the tracked object.
///
/// The static embedding is captured once at initialization. The dynamic one is
/// replaced whenever the caller supplies corrected keypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateBank<E> {
    static_embedding: E,
    dynamic_embedding: E,
    fused_visibility: [bool; NUM_KEYPOINTS],
}

impl<E: Clone> TemplateBank<E> {
    /// Both templates start as copies of the initial embedding.
    pub fn new(embedding: E, visibility: [bool; NUM_KEYPOINTS]) -> Self {
        Self {
            dynamic_embedding: embedding.clone(),
            static_embedding: embedding,
            fused_visibility: visibility,
        }
    }

    /// Bank with `embedding` as the dynamic template and `incoming` fused into
    /// the visibility record. The static template is carried over.
    pub fn refreshed(&self, embedding: E, incoming: &[bool; NUM_KEYPOINTS]) -> Self {
        Self {
            static_embedding: self.static_embedding.clone(),
            dynamic_embedding: embedding,
            fused_visibility: fuse_visibility(&self.fused_visibility, incoming),
        }
    }

    pub fn static_embedding(&self) -> &E {
        &self.static_embedding
    }

    pub fn dynamic_embedding(&self) -> &E {
        &self.dynamic_embedding
    }

    pub fn fused_visibility(&self) -> &[bool; NUM_KEYPOINTS] {
        &self.fused_visibility
    }

    /// Zero the confidence of every keypoint that has never been visible.
    pub fn suppress(&self, confidences: &[f32; NUM_KEYPOINTS]) -> [f32; NUM_KEYPOINTS] {
        std::array::from_fn(|i| {
            if self.fused_visibility[i] {
                confidences[i]
            } else {
                0.0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(bits: &[u8]) -> [bool; NUM_KEYPOINTS] {
        std::array::from_fn(|i| bits.get(i).copied().unwrap_or(0) == 1)
    }

    #[test]
    fn test_new_bank_has_identical_templates() {
        let bank = TemplateBank::new(vec![1.0f32, 2.0], flags(&[1, 0, 1]));
        assert_eq!(bank.static_embedding(), bank.dynamic_embedding());
        assert_eq!(bank.fused_visibility(), &flags(&[1, 0, 1]));
    }

    #[test]
    fn test_refresh_replaces_dynamic_only() {
        let bank = TemplateBank::new("init", flags(&[1]));
        let bank = bank.refreshed("second", &flags(&[0, 1]));
        let bank = bank.refreshed("third", &flags(&[]));

        assert_eq!(*bank.static_embedding(), "init");
        assert_eq!(*bank.dynamic_embedding(), "third");
        assert_eq!(bank.fused_visibility(), &flags(&[1, 1]));
    }

    #[test]
    fn test_fused_visibility_is_monotonic() {
        let sequence = [
            flags(&[1, 0, 0, 1]),
            flags(&[0, 0, 0, 0]),
            flags(&[0, 1, 0, 0]),
            flags(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
            flags(&[]),
        ];
        let mut fused = [false; NUM_KEYPOINTS];
        for incoming in &sequence {
            let next = fuse_visibility(&fused, incoming);
            for i in 0..NUM_KEYPOINTS {
                assert!(!fused[i] || next[i], "keypoint {i} was cleared");
            }
            fused = next;
        }
        assert_eq!(fused, flags(&[1, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1]));
    }

    #[test]
    fn test_suppress_never_seen_keypoints() {
        let bank = TemplateBank::new((), flags(&[1, 0, 1]));
        let mut raw = [0.99f32; NUM_KEYPOINTS];
        raw[0] = 0.9;
        raw[1] = 0.3;
        let effective = bank.suppress(&raw);
        assert_eq!(effective[0], 0.9);
        assert_eq!(effective[1], 0.0);
        assert_eq!(effective[2], 0.99);
        assert_eq!(effective[3], 0.0);
    }
}
