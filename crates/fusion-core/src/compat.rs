//! # Compatibility Rule
//!
//! Decides whether a soul may be equipped on a node. Two gates, both must
//! pass:
//!
//! 1. Rarity: a soul fits nodes of its own tier or lower
//!    (Legendary → any, Rare → Common/Rare, Common → Common).
//! 2. Tag: a Wildcard node accepts any soul; otherwise the soul must carry
//!    the node's tag or Wildcard.

use crate::catalog::NodeDef;
use crate::{Rarity, Soul, Tag};

/// Rarity gate. Fails closed.
#[must_use]
pub fn rarity_allows(soul: Rarity, node: Rarity) -> bool {
    match soul {
        Rarity::Legendary => true,
        Rarity::Rare => matches!(node, Rarity::Common | Rarity::Rare),
        Rarity::Common => node == Rarity::Common,
    }
}

/// Tag gate.
#[must_use]
pub fn tags_allow(soul_tags: &[Tag], node: Tag) -> bool {
    node == Tag::Wildcard || soul_tags.contains(&node) || soul_tags.contains(&Tag::Wildcard)
}

/// Check if `soul` may be equipped on `node`.
#[must_use]
pub fn can_equip(node: &NodeDef, soul: &Soul) -> bool {
    rarity_allows(soul.rarity, node.rarity) && tags_allow(&soul.tags, node.tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(rarity: Rarity, tag: Tag) -> NodeDef {
        NodeDef::new(1, rarity, tag, &[])
    }

    #[test]
    fn common_attack_soul_fits_only_common_attack_or_wildcard_nodes() {
        let soul = Soul::new("Wolf Spirit", Rarity::Common, vec![Tag::Attack]);

        assert!(can_equip(&node(Rarity::Common, Tag::Attack), &soul));
        assert!(can_equip(&node(Rarity::Common, Tag::Wildcard), &soul));
        assert!(!can_equip(&node(Rarity::Common, Tag::Defense), &soul));
        for tag in Tag::ALL {
            assert!(!can_equip(&node(Rarity::Rare, tag), &soul));
            assert!(!can_equip(&node(Rarity::Legendary, tag), &soul));
        }
    }

    #[test]
    fn rare_soul_fits_up_to_rare_nodes() {
        assert!(rarity_allows(Rarity::Rare, Rarity::Common));
        assert!(rarity_allows(Rarity::Rare, Rarity::Rare));
        assert!(!rarity_allows(Rarity::Rare, Rarity::Legendary));
    }

    #[test]
    fn legendary_soul_fits_any_rarity() {
        for rarity in Rarity::ALL {
            assert!(rarity_allows(Rarity::Legendary, rarity));
        }
    }

    #[test]
    fn wildcard_soul_passes_tag_gate() {
        let soul = Soul::new("Divine Light", Rarity::Legendary, vec![Tag::Wildcard]);
        for tag in Tag::ALL {
            assert!(can_equip(&node(Rarity::Legendary, tag), &soul));
        }
    }

    #[test]
    fn multi_tag_soul_matches_any_listed_tag() {
        let soul = Soul::new("Hybrid", Rarity::Rare, vec![Tag::Defense, Tag::PvP]);

        assert!(can_equip(&node(Rarity::Rare, Tag::PvP), &soul));
        assert!(can_equip(&node(Rarity::Common, Tag::Defense), &soul));
        assert!(!can_equip(&node(Rarity::Common, Tag::Utility), &soul));
    }
}
