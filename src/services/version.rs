use sha2::{Digest, Sha256};

use crate::models::RotationEntry;

/// Derive the content version for a rotation.
///
/// Serializes each entry as its resolved content reference plus display
/// order, in rotation order, and truncates a SHA-256 digest to 16 hex
/// characters. Entries without a content reference do not contribute (they
/// are not renderable and never reach capture either). Collisions at this
/// width only cost a wasted regeneration, never a correctness failure.
pub fn rotation_version(entries: &[RotationEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        if let Some(content_ref) = entry.content_ref() {
            hasher.update(content_ref.as_bytes());
            hasher.update(b"@");
            hasher.update(entry.display_order.to_string().as_bytes());
            hasher.update(b";");
        }
    }
    let digest = hasher.finalize();
    format!("{:x}", digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn entry(template_id: Option<i32>, canvas_id: Option<i32>, order: i32) -> RotationEntry {
        let ts = NaiveDateTime::default();
        RotationEntry {
            id: order,
            screen_id: 1,
            template_id,
            canvas_template_id: canvas_id,
            display_order: order,
            display_duration: 8,
            transition_effect: "fade".to_string(),
            transition_duration: 500,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn identical_rotations_hash_identically() {
        let a = vec![entry(Some(10), None, 0), entry(Some(20), None, 1)];
        let b = vec![entry(Some(10), None, 0), entry(Some(20), None, 1)];
        assert_eq!(rotation_version(&a), rotation_version(&b));
        assert_eq!(rotation_version(&a).len(), 16);
    }

    #[test]
    fn reordering_changes_the_version() {
        let original = vec![entry(Some(10), None, 0), entry(Some(20), None, 1)];
        let reordered = vec![entry(Some(20), None, 0), entry(Some(10), None, 1)];
        assert_ne!(rotation_version(&original), rotation_version(&reordered));
    }

    #[test]
    fn retargeting_an_entry_changes_the_version() {
        let a = vec![entry(Some(10), None, 0), entry(Some(20), None, 1)];
        let b = vec![entry(Some(10), None, 0), entry(Some(21), None, 1)];
        assert_ne!(rotation_version(&a), rotation_version(&b));
    }

    #[test]
    fn canvas_and_block_templates_never_collide() {
        // template 7 and canvas 7 are different content sources
        let block = vec![entry(Some(7), None, 0)];
        let canvas = vec![entry(None, Some(7), 0)];
        assert_ne!(rotation_version(&block), rotation_version(&canvas));
    }

    #[test]
    fn adjacent_digits_do_not_merge_across_fields() {
        // (t1, order 23) must not hash like (t12, order 3)
        let a = vec![entry(Some(1), None, 23)];
        let b = vec![entry(Some(12), None, 3)];
        assert_ne!(rotation_version(&a), rotation_version(&b));
    }
}
