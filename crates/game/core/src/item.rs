//! Live item instances.
//!
//! Items are owned by the central map on [`crate::GameContext`] and
//! referenced everywhere else by [`ItemUid`]. An instance carries its own
//! component map so spent uses and editor overrides survive persistence
//! without consulting the database.

use std::fmt;

use crate::common::Nid;
use crate::data::{Components, ItemPrefab, component_keys};

/// Index of a live item in the central items map.
///
/// Allocation is a deterministic counter on the game context; uids are
/// never reused within a playthrough.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemUid(pub u32);

impl fmt::Display for ItemUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// A live item: prefab data denormalized plus mutable uses and ownership.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub uid: ItemUid,
    pub nid: Nid,
    pub name: String,
    pub icon: Nid,
    /// Remaining uses; `None` for unbreakable items.
    pub uses: Option<i32>,
    pub max_uses: Option<i32>,
    pub droppable: bool,
    /// Unit nid holding this item; `None` for convoy items.
    pub owner: Option<Nid>,
    pub components: Components,
}

impl Item {
    /// Instantiates a prefab. Starting uses come from the `uses` component.
    pub fn from_prefab(uid: ItemUid, prefab: &ItemPrefab) -> Self {
        let max_uses = prefab.components.uses();
        Self {
            uid,
            nid: prefab.nid.clone(),
            name: prefab.name.clone(),
            icon: prefab.icon.clone(),
            uses: max_uses,
            max_uses,
            droppable: prefab.components.is_droppable(),
            owner: None,
            components: prefab.components.clone(),
        }
    }

    pub fn is_weapon(&self) -> bool {
        self.components.is_weapon()
    }

    pub fn weapon_type(&self) -> Option<Nid> {
        self.components.weapon_type()
    }

    pub fn is_heal(&self) -> bool {
        self.components.heal().is_some()
    }

    /// Whether the weapon reaches a target `distance` tiles away.
    pub fn in_range(&self, distance: i32) -> bool {
        distance >= self.components.min_range() && distance <= self.components.max_range()
    }

    /// Spends one use. Returns `true` when the item broke.
    pub fn expend(&mut self) -> bool {
        match self.uses.as_mut() {
            Some(uses) => {
                *uses -= 1;
                *uses <= 0
            }
            None => false,
        }
    }

    /// Restores one previously spent use (turnwheel rewind path).
    pub fn restore_use(&mut self) {
        if let (Some(uses), Some(max)) = (self.uses.as_mut(), self.max_uses) {
            *uses = (*uses + 1).min(max);
        }
    }
}

/// A live skill: prefab nid plus persistent per-unit mutable data.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skill {
    pub nid: Nid,
    pub name: String,
    pub icon: Nid,
    pub components: Components,
    /// Persistent per-unit state, e.g. cooldowns or charges.
    pub data: std::collections::BTreeMap<String, crate::common::Value>,
}

impl Skill {
    pub fn from_prefab(prefab: &crate::data::SkillPrefab) -> Self {
        Self {
            nid: prefab.nid.clone(),
            name: prefab.name.clone(),
            icon: prefab.icon.clone(),
            components: prefab.components.clone(),
            data: Default::default(),
        }
    }

    pub fn sight_bonus(&self) -> i32 {
        self.components.int(component_keys::SIGHT).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;

    fn potion_prefab() -> ItemPrefab {
        ItemPrefab {
            nid: Nid::new("vulnerary"),
            name: "Vulnerary".into(),
            icon: Nid::new("icon_vulnerary"),
            components: Components::new()
                .with(component_keys::HEAL, Value::Int(10))
                .with(component_keys::USES, Value::Int(3)),
        }
    }

    #[test]
    fn expend_breaks_at_zero() {
        let mut item = Item::from_prefab(ItemUid(1), &potion_prefab());
        assert_eq!(item.uses, Some(3));
        assert!(!item.expend());
        assert!(!item.expend());
        assert!(item.expend());
        assert_eq!(item.uses, Some(0));
    }

    #[test]
    fn restore_use_clamps_to_max() {
        let mut item = Item::from_prefab(ItemUid(1), &potion_prefab());
        item.restore_use();
        assert_eq!(item.uses, Some(3));
        item.expend();
        item.restore_use();
        assert_eq!(item.uses, Some(3));
    }

    #[test]
    fn unbreakable_items_never_break() {
        let prefab = ItemPrefab {
            nid: Nid::new("blessed_sword"),
            name: "Blessed Sword".into(),
            icon: Nid::default(),
            components: Components::new().with(component_keys::WEAPON, Value::from("sword")),
        };
        let mut item = Item::from_prefab(ItemUid(2), &prefab);
        assert_eq!(item.uses, None);
        assert!(!item.expend());
    }
}
