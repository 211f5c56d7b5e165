//! Parties: shared money, bonus experience, and the convoy.

use crate::common::Nid;
use crate::item::ItemUid;

/// A group of units sharing a convoy, money, and a bonus-exp pool.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Party {
    pub nid: Nid,
    pub name: String,
    pub leader: Nid,
    pub money: i32,
    pub bexp: i32,
    /// Convoy items have no unit owner.
    pub convoy: Vec<ItemUid>,
}

impl Party {
    pub fn new(nid: impl Into<Nid>, name: impl Into<String>, leader: impl Into<Nid>) -> Self {
        Self {
            nid: nid.into(),
            name: name.into(),
            leader: leader.into(),
            money: 0,
            bexp: 0,
            convoy: Vec::new(),
        }
    }
}
