//! Static item catalog: scavenge locations with their loot tables, the
//! secret-item pool, and the handful of items with special semantics.
//!
//! Everything here is compile-time data. The transaction engine consults the
//! catalog to validate locations, roll loot, and decide whether an item is a
//! gadget, a protective gadget, the restricted item, or the retrieval item.

/// Unique item obtainable only via the secret roll at Pumice Castle.
/// It can never be traded or given away, regardless of ownership.
pub const RESTRICTED_ITEM: &str = "Settler's Apparatus 4 codeline";

/// Unique item that reverses the most recent theft suffered by its owner.
pub const RETRIEVAL_ITEM: &str = "Calidus Pulmenti Fumo Sized Dragon";

/// Gadget that strips all protective gadgets from its target.
pub const DISRUPTOR_ITEM: &str = "EMP Grenade";

/// Gadget that triggers a theft attempt against its target.
pub const HACKING_ITEM: &str = "Hacking Device";

/// Items that block (and are consumed by) exactly one theft attempt.
pub const PROTECTIVE_GADGETS: [&str; 2] = ["Energy Shield", "Cloaking Device"];

/// Secret items found on a 1-in-20 scavenge roll. The restricted item is
/// exclusive to Pumice Castle and excluded from the general pool.
pub const SECRET_ITEMS: [&str; 4] = [
    "Settler's Delightful Cheese Egg Recipe",
    "Settler's Cheesy Eggsandvich Recipe",
    "Deorbited satellite remains",
    RESTRICTED_ITEM,
];

/// Location key whose scavenges additionally trigger a theft attempt
/// against a random other member.
pub const THEFT_LOCATION: &str = "eclipse";

/// Location key whose secret roll always yields [`RESTRICTED_ITEM`].
pub const SECRET_LOCATION: &str = "pumice";

/// A scavengeable location and its loot table.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    /// Short key users type into the scavenge command.
    pub key: &'static str,
    /// Display name used in scavenge result messages.
    pub display: &'static str,
    /// Items a scavenge can turn up here, picked uniformly.
    pub loot: &'static [&'static str],
}

/// All scavengeable locations.
pub static LOCATIONS: [Location; 5] = [
    Location {
        key: "eden",
        display: "Eden-227",
        loot: &[
            "Handgun",
            "Rifle Parts",
            "Box of Ammunition",
            "Combat Knife",
            "Damaged Decimator",
        ],
    },
    Location {
        key: "saffron",
        display: "Saffron Fields",
        loot: &[
            "Bag of Seeds",
            "Watering Can",
            "Sack of Fertilizer",
            "Farming Drone",
            "Rusty Hoe",
        ],
    },
    Location {
        key: "eclipse",
        display: "Eclipse-Industrial-Systems",
        // Gadgets only; also the theft-prone location.
        loot: &[
            "EMP Grenade",
            "Hacking Device",
            "Energy Shield",
            "Cloaking Device",
            "Nanobot Swarm",
        ],
    },
    Location {
        key: "pumice",
        display: "Pumice Castle",
        loot: &[
            "Ancient Relic",
            "Stone Tablet",
            "Enchanted Cloak",
            "Siver Crown",
            "Mystic Orb",
            "Calidus Pulmenti Fumo Sized Dragon",
        ],
    },
    Location {
        key: "kahns",
        display: "Kahns Garage of Wonders",
        loot: &[
            "Turbocharger",
            "Prototype Engine",
            "Exotic Fuel Cell",
            "Reinforced Chassis",
            "Holographic Dashboard",
        ],
    },
];

/// Look up a location by key (case-insensitive). Returns `None` for unknown keys.
pub fn location(key: &str) -> Option<&'static Location> {
    let key = key.to_ascii_lowercase();
    LOCATIONS.iter().find(|loc| loc.key == key)
}

/// Comma-separated location keys for the invalid-location error message.
pub fn location_keys() -> String {
    LOCATIONS
        .iter()
        .map(|loc| loc.key)
        .collect::<Vec<_>>()
        .join(", ")
}

/// True if `item` is in the gadget set (the Eclipse loot table).
pub fn is_gadget(item: &str) -> bool {
    LOCATIONS
        .iter()
        .find(|loc| loc.key == THEFT_LOCATION)
        .map(|loc| loc.loot.contains(&item))
        .unwrap_or(false)
}

/// True if `item` blocks theft attempts.
pub fn is_protective(item: &str) -> bool {
    PROTECTIVE_GADGETS.contains(&item)
}

/// Secret pool for locations other than Pumice Castle: every secret item
/// except the restricted one.
pub fn general_secret_pool() -> Vec<&'static str> {
    SECRET_ITEMS
        .iter()
        .copied()
        .filter(|&item| item != RESTRICTED_ITEM)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_lookup_is_case_insensitive() {
        assert_eq!(location("eden").unwrap().display, "Eden-227");
        assert_eq!(location("EDEN").unwrap().display, "Eden-227");
        assert!(location("atlantis").is_none());
    }

    #[test]
    fn restricted_item_is_a_secret_item_but_not_in_general_pool() {
        assert!(SECRET_ITEMS.contains(&RESTRICTED_ITEM));
        let pool = general_secret_pool();
        assert_eq!(pool.len(), SECRET_ITEMS.len() - 1);
        assert!(!pool.contains(&RESTRICTED_ITEM));
    }

    #[test]
    fn gadget_set_is_the_eclipse_loot_table() {
        assert!(is_gadget(DISRUPTOR_ITEM));
        assert!(is_gadget(HACKING_ITEM));
        assert!(is_gadget("Nanobot Swarm"));
        assert!(!is_gadget("Handgun"));
        assert!(!is_gadget(RETRIEVAL_ITEM));
    }

    #[test]
    fn protective_gadgets_are_gadgets() {
        for gadget in PROTECTIVE_GADGETS {
            assert!(is_gadget(gadget));
            assert!(is_protective(gadget));
        }
        assert!(!is_protective("EMP Grenade"));
    }

    #[test]
    fn theft_and_secret_locations_exist() {
        assert!(location(THEFT_LOCATION).is_some());
        assert!(location(SECRET_LOCATION).is_some());
    }
}
