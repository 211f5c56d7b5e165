//! Component maps, the polymorphism mechanism for items and skills.
//!
//! A component map is a closed set of known keys with validated accessors
//! plus opaque pass-through for unknown keys, so data written by a newer
//! editor survives a save/load round trip unchanged.

use std::collections::BTreeMap;

use crate::common::{Nid, Value};

/// Known component keys. Unknown keys are preserved verbatim.
pub mod keys {
    pub const WEAPON: &str = "weapon";
    pub const DAMAGE: &str = "damage";
    pub const HIT: &str = "hit";
    pub const CRIT: &str = "crit";
    pub const WEIGHT: &str = "weight";
    pub const MIN_RANGE: &str = "min_range";
    pub const MAX_RANGE: &str = "max_range";
    pub const MAGIC: &str = "magic";
    pub const BRAVE: &str = "brave";
    pub const HEAL: &str = "heal";
    pub const USES: &str = "uses";
    pub const DROPPABLE: &str = "droppable";
    pub const CANTO: &str = "canto";
    pub const SIGHT: &str = "sight";
    pub const REGEN: &str = "regen";
    pub const POISON: &str = "poison";
    pub const DURATION: &str = "duration";
}

/// String-keyed component store with typed accessors.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Components {
    map: BTreeMap<String, Value>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.map.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Marker component with no payload (`magic`, `brave`, `droppable`, ...).
    pub fn with_flag(self, key: impl Into<String>) -> Self {
        self.with(key, Value::Bool(true))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        self.map.get(key).and_then(|v| v.as_int()).map(|n| n as i32)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.map.get(key).map(Value::truthy).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    // ------------------------------------------------------------------
    // Validated accessors for the weapon component family
    // ------------------------------------------------------------------

    /// Weapon type nid if this is a weapon.
    pub fn weapon_type(&self) -> Option<Nid> {
        match self.map.get(keys::WEAPON)? {
            Value::Str(s) => Some(Nid::new(s.clone())),
            _ => None,
        }
    }

    pub fn is_weapon(&self) -> bool {
        self.map.contains_key(keys::WEAPON)
    }

    pub fn damage(&self) -> i32 {
        self.int(keys::DAMAGE).unwrap_or(0)
    }

    pub fn hit(&self) -> i32 {
        self.int(keys::HIT).unwrap_or(0)
    }

    pub fn crit(&self) -> i32 {
        self.int(keys::CRIT).unwrap_or(0)
    }

    pub fn weight(&self) -> i32 {
        self.int(keys::WEIGHT).unwrap_or(0)
    }

    pub fn min_range(&self) -> i32 {
        self.int(keys::MIN_RANGE).unwrap_or(1)
    }

    pub fn max_range(&self) -> i32 {
        self.int(keys::MAX_RANGE).unwrap_or(self.min_range())
    }

    pub fn is_magic(&self) -> bool {
        self.flag(keys::MAGIC)
    }

    pub fn is_brave(&self) -> bool {
        self.flag(keys::BRAVE)
    }

    pub fn heal(&self) -> Option<i32> {
        self.int(keys::HEAL)
    }

    pub fn uses(&self) -> Option<i32> {
        self.int(keys::USES)
    }

    pub fn is_droppable(&self) -> bool {
        self.flag(keys::DROPPABLE)
    }
}

impl FromIterator<(String, Value)> for Components {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iron_sword() -> Components {
        Components::new()
            .with(keys::WEAPON, Value::from("sword"))
            .with(keys::DAMAGE, Value::Int(5))
            .with(keys::HIT, Value::Int(90))
            .with(keys::USES, Value::Int(40))
    }

    #[test]
    fn weapon_accessors() {
        let c = iron_sword();
        assert!(c.is_weapon());
        assert_eq!(c.weapon_type().unwrap(), "sword");
        assert_eq!(c.damage(), 5);
        assert_eq!(c.hit(), 90);
        assert_eq!(c.crit(), 0);
        assert_eq!(c.min_range(), 1);
        assert_eq!(c.max_range(), 1);
        assert!(!c.is_magic());
    }

    #[test]
    fn unknown_components_pass_through() {
        let mut c = iron_sword();
        c.insert("editor_note", Value::from("keep"));
        assert_eq!(c.get("editor_note"), Some(&Value::from("keep")));
    }

    #[test]
    fn max_range_defaults_to_min_range() {
        let c = Components::new().with(keys::MIN_RANGE, Value::Int(2));
        assert_eq!(c.max_range(), 2);
    }
}
