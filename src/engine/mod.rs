//! Inventory/theft transaction engine.
//!
//! Every operation here is one logical transaction: the whole sequence of
//! store and ledger reads/writes runs inside a single SQL transaction via
//! [`Store::with_tx`], so concurrent commands touching the same users never
//! observe partial state and a stolen instance can never be taken twice.
//! Any error aborts with no mutation visible.
//!
//! Follow-on thefts (scavenging Eclipse, using the Hacking Device) run as
//! separate transactions after the outer one commits. Their failure is
//! logged and swallowed so the outer operation still succeeds.
//!
//! Conservation: an item instance moves between owners; it is created only
//! by scavenge finds and the privileged give command, and destroyed only by
//! use-consumption and theft-blocking gadget burns.

pub mod slots;

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::catalog;
use crate::store::{self, Store, StoreError, UserId};

/// Domain errors, rendered verbatim as a private notice to the invoker.
#[derive(Debug, Error)]
pub enum GameError {
    /// Caller is not on the allow-list for the command.
    #[error("You don't have permission to use this command!")]
    Unauthorized,

    /// Unknown scavenge location key.
    #[error("Invalid location! Choose from: {0}.")]
    InvalidLocation(String),

    /// Trade recipient is the initiator.
    #[error("You can't trade with yourself!")]
    SelfTrade,

    /// The restricted item is exempt from every transfer path.
    #[error("You cannot trade or give away **{0}**!")]
    Restricted(String),

    /// The caller does not hold the item.
    #[error("You don't have **{0}** in your inventory!")]
    NotOwned(String),

    /// The item needs a target user.
    #[error("You must specify a target user to use **{0}**!")]
    TargetRequired(String),

    /// The item is neither the retrieval item nor in the gadget set.
    #[error("**{0}** is not a gadget and cannot be used!")]
    NotAGadget(String),

    /// Soft/informational: no stolen record to reverse. Nothing is mutated,
    /// the retrieval item is not consumed.
    #[error("No items were stolen from you by <@{0}>!")]
    NothingToRetrieve(UserId),

    /// Unexpected storage failure; the bot layer logs this and tells the
    /// user to retry without exposing detail.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolution of a theft attempt. Carries both parties so the bot layer can
/// deliver direct notifications.
#[derive(Debug, Clone)]
pub enum TheftOutcome {
    /// The victim held a protective gadget; it was consumed, nothing else
    /// moved, and no ledger record was produced.
    Blocked {
        attacker: UserId,
        victim: UserId,
        gadget: String,
    },
    /// One random item moved victim → attacker and was recorded.
    Stolen {
        attacker: UserId,
        victim: UserId,
        item: String,
    },
    /// The victim had nothing to take.
    Whiffed { attacker: UserId, victim: UserId },
}

/// What a scavenge turned up.
#[derive(Debug, Clone)]
pub enum ScavengeFind {
    /// An ordinary pick from the location's loot table.
    Loot {
        location: &'static str,
        item: String,
    },
    /// The 1-in-20 secret roll hit.
    Secret { item: String },
}

impl ScavengeFind {
    /// Name of the found item regardless of variant.
    pub fn item(&self) -> &str {
        match self {
            ScavengeFind::Loot { item, .. } | ScavengeFind::Secret { item } => item,
        }
    }
}

/// Result of a scavenge, including the follow-on theft at Eclipse (if one
/// ran and however it resolved).
#[derive(Debug, Clone)]
pub struct ScavengeOutcome {
    pub find: ScavengeFind,
    pub theft: Option<TheftOutcome>,
}

/// Effect of a successful `use`.
#[derive(Debug, Clone)]
pub enum UseOutcome {
    /// The retrieval item reversed the most recent theft by `target`.
    Retrieved { target: UserId, item: String },
    /// The EMP Grenade stripped `removed` protective-gadget entries.
    Disrupted { target: UserId, removed: usize },
    /// The Hacking Device fired; `theft` is how the attempt resolved, or
    /// `None` if the follow-on failed internally.
    Hacked {
        target: UserId,
        theft: Option<TheftOutcome>,
    },
    /// A gadget with no extra effect was consumed against `target`.
    Consumed { target: UserId },
}

/// The transaction engine. Cheap to clone via the shared store handle.
pub struct Engine {
    store: Arc<Store>,
    give_user: UserId,
}

impl Engine {
    /// Build an engine over `store`. `give_user` is the sole user permitted
    /// to mint items with [`Engine::give`].
    pub fn new(store: Arc<Store>, give_user: UserId) -> Self {
        Self { store, give_user }
    }

    /// The underlying store (inventory listings, status reports).
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Search `location_key` for an item. `candidates` are the other users
    /// in the invoker's group, eligible as theft victims at Eclipse; the
    /// invoker is filtered out here regardless.
    pub fn scavenge(
        &self,
        user: UserId,
        location_key: &str,
        candidates: &[UserId],
    ) -> Result<ScavengeOutcome, GameError> {
        let secret = rand::thread_rng().gen_range(1..=20) == 1;
        self.scavenge_rolled(user, location_key, candidates, secret)
    }

    /// Scavenge with the secret roll already decided. Split out so tests can
    /// force either branch.
    pub(crate) fn scavenge_rolled(
        &self,
        user: UserId,
        location_key: &str,
        candidates: &[UserId],
        secret: bool,
    ) -> Result<ScavengeOutcome, GameError> {
        let loc = catalog::location(location_key)
            .ok_or_else(|| GameError::InvalidLocation(catalog::location_keys()))?;

        let find = if secret {
            let item = if loc.key == catalog::SECRET_LOCATION {
                // Pumice Castle's secret roll is fixed to the restricted item.
                catalog::RESTRICTED_ITEM.to_string()
            } else {
                let pool = catalog::general_secret_pool();
                pool.choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or(catalog::SECRET_ITEMS[0])
                    .to_string()
            };
            ScavengeFind::Secret { item }
        } else {
            let item = loc
                .loot
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(loc.loot[0])
                .to_string();
            ScavengeFind::Loot {
                location: loc.display,
                item,
            }
        };

        self.store
            .with_tx(|tx| store::add_item(tx, user, find.item()))?;

        // Scavenging the theft-prone location also triggers a theft attempt
        // against a random other member, as its own transaction after the
        // scavenge commit. No eligible victim or an internal failure must
        // not fail the scavenge.
        let theft = if loc.key == catalog::THEFT_LOCATION {
            let pool: Vec<UserId> = candidates.iter().copied().filter(|&c| c != user).collect();
            match pool.choose(&mut rand::thread_rng()) {
                Some(&victim) => match self.theft(user, victim) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        log::warn!("follow-on theft after scavenge by {} failed: {}", user, e);
                        None
                    }
                },
                None => None,
            }
        } else {
            None
        };

        Ok(ScavengeOutcome { find, theft })
    }

    /// Move exactly one instance of `item` from `initiator` to `recipient`.
    pub fn trade(
        &self,
        initiator: UserId,
        recipient: UserId,
        item: &str,
    ) -> Result<(), GameError> {
        if recipient == initiator {
            return Err(GameError::SelfTrade);
        }
        if item == catalog::RESTRICTED_ITEM {
            return Err(GameError::Restricted(item.to_string()));
        }
        self.store.with_tx(|tx| {
            if !store::remove_one(tx, initiator, item)? {
                return Err(GameError::NotOwned(item.to_string()));
            }
            store::add_item(tx, recipient, item)?;
            Ok(())
        })
    }

    /// Mint one instance of `item` into `recipient`'s inventory. Only the
    /// configured privileged user may do this, and never for the restricted
    /// item. Nothing is removed from anyone: give is a creation path.
    pub fn give(
        &self,
        caller: UserId,
        recipient: UserId,
        item: &str,
    ) -> Result<(), GameError> {
        if caller != self.give_user {
            return Err(GameError::Unauthorized);
        }
        if item == catalog::RESTRICTED_ITEM {
            return Err(GameError::Restricted(item.to_string()));
        }
        self.store.add_item(recipient, item)?;
        Ok(())
    }

    /// Use an item from `user`'s inventory. Every non-error branch consumes
    /// exactly one instance of `item` within the same transaction as its
    /// effect.
    pub fn use_item(
        &self,
        user: UserId,
        item: &str,
        target: Option<UserId>,
    ) -> Result<UseOutcome, GameError> {
        let (mut outcome, hack_target) = self.store.with_tx(|tx| {
            if store::count_item(tx, user, item)? == 0 {
                return Err(GameError::NotOwned(item.to_string()));
            }

            if item == catalog::RETRIEVAL_ITEM {
                let target =
                    target.ok_or_else(|| GameError::TargetRequired(item.to_string()))?;
                let stolen = store::most_recent_theft(tx, target, user)?
                    .ok_or(GameError::NothingToRetrieve(target))?;
                store::add_item(tx, user, &stolen)?;
                store::remove_one(tx, target, &stolen)?;
                store::consume_theft_record(tx, target, user, &stolen)?;
                store::remove_one(tx, user, item)?;
                return Ok((UseOutcome::Retrieved { target, item: stolen }, None));
            }

            if !catalog::is_gadget(item) {
                return Err(GameError::NotAGadget(item.to_string()));
            }
            let target = target.ok_or_else(|| GameError::TargetRequired(item.to_string()))?;
            store::remove_one(tx, user, item)?;
            if item == catalog::DISRUPTOR_ITEM {
                let removed = store::remove_all_protective(tx, target)?;
                Ok((UseOutcome::Disrupted { target, removed }, None))
            } else if item == catalog::HACKING_ITEM {
                Ok((UseOutcome::Hacked { target, theft: None }, Some(target)))
            } else {
                Ok((UseOutcome::Consumed { target }, None))
            }
        })?;

        // The Hacking Device's theft is a follow-on sub-transaction, isolated
        // like the Eclipse one: the device stays consumed either way.
        if let Some(victim) = hack_target {
            match self.theft(user, victim) {
                Ok(resolution) => {
                    if let UseOutcome::Hacked { theft, .. } = &mut outcome {
                        *theft = Some(resolution);
                    }
                }
                Err(e) => log::warn!("hacking-device theft against {} failed: {}", victim, e),
            }
        }
        Ok(outcome)
    }

    /// Resolve a theft attempt. Internal: reached via Eclipse scavenges and
    /// the Hacking Device, never as a user command.
    ///
    /// If the victim holds a protective gadget, exactly one is consumed and
    /// nothing else happens (Energy Shield is checked before Cloaking Device
    /// when both are held). Otherwise a uniformly random victim item moves
    /// to the attacker and a ledger record is appended.
    pub fn theft(&self, attacker: UserId, victim: UserId) -> Result<TheftOutcome, GameError> {
        self.store.with_tx(|tx| {
            for gadget in catalog::PROTECTIVE_GADGETS {
                if store::remove_one(tx, victim, gadget)? {
                    return Ok(TheftOutcome::Blocked {
                        attacker,
                        victim,
                        gadget: gadget.to_string(),
                    });
                }
            }
            match store::pick_random(tx, victim)? {
                None => Ok(TheftOutcome::Whiffed { attacker, victim }),
                Some(item) => {
                    store::remove_one(tx, victim, &item)?;
                    store::add_item(tx, attacker, &item)?;
                    store::record_theft(tx, attacker, victim, &item)?;
                    Ok(TheftOutcome::Stolen {
                        attacker,
                        victim,
                        item,
                    })
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIVER: UserId = 99;

    fn engine() -> Engine {
        Engine::new(Arc::new(Store::open_in_memory().unwrap()), GIVER)
    }

    #[test]
    fn pumice_secret_roll_is_always_the_restricted_item() {
        let engine = engine();
        for _ in 0..10 {
            let out = engine.scavenge_rolled(1, "pumice", &[], true).unwrap();
            match out.find {
                ScavengeFind::Secret { ref item } => {
                    assert_eq!(item, catalog::RESTRICTED_ITEM)
                }
                ref other => panic!("expected secret find, got {:?}", other),
            }
        }
    }

    #[test]
    fn general_secret_roll_excludes_the_restricted_item() {
        let engine = engine();
        for _ in 0..40 {
            let out = engine.scavenge_rolled(1, "eden", &[], true).unwrap();
            let item = out.find.item().to_string();
            assert!(catalog::SECRET_ITEMS.contains(&item.as_str()));
            assert_ne!(item, catalog::RESTRICTED_ITEM);
        }
    }

    #[test]
    fn scavenge_loot_comes_from_the_location_table() {
        let engine = engine();
        let out = engine.scavenge_rolled(1, "eden", &[], false).unwrap();
        match out.find {
            ScavengeFind::Loot { location, ref item } => {
                assert_eq!(location, "Eden-227");
                assert!(catalog::location("eden").unwrap().loot.contains(&item.as_str()));
                assert_eq!(engine.store().count_item(1, item).unwrap(), 1);
            }
            ref other => panic!("expected loot find, got {:?}", other),
        }
        assert!(out.theft.is_none());
    }

    #[test]
    fn scavenge_rejects_unknown_locations() {
        let engine = engine();
        let err = engine.scavenge(1, "atlantis", &[]).unwrap_err();
        assert!(matches!(err, GameError::InvalidLocation(_)));
        assert!(engine.store().list_items(1).unwrap().is_empty());
    }

    #[test]
    fn eclipse_scavenge_with_no_candidates_still_succeeds() {
        let engine = engine();
        // Only the scavenger themselves in the candidate list.
        let out = engine.scavenge_rolled(1, "eclipse", &[1], false).unwrap();
        assert!(out.theft.is_none());
        assert_eq!(engine.store().list_items(1).unwrap().len(), 1);
    }

    #[test]
    fn eclipse_scavenge_triggers_a_follow_on_theft() {
        let engine = engine();
        engine.store().add_item(2, "Stone Tablet").unwrap();
        let out = engine.scavenge_rolled(1, "eclipse", &[1, 2], false).unwrap();
        match out.theft {
            Some(TheftOutcome::Stolen { attacker, victim, ref item }) => {
                assert_eq!((attacker, victim), (1, 2));
                assert_eq!(item, "Stone Tablet");
                assert_eq!(engine.store().count_item(1, "Stone Tablet").unwrap(), 1);
            }
            ref other => panic!("expected a stolen outcome, got {:?}", other),
        }
    }

    #[test]
    fn theft_prefers_energy_shield_when_both_gadgets_held() {
        let engine = engine();
        engine.store().add_item(2, "Cloaking Device").unwrap();
        engine.store().add_item(2, "Energy Shield").unwrap();
        let out = engine.theft(1, 2).unwrap();
        match out {
            TheftOutcome::Blocked { ref gadget, .. } => assert_eq!(gadget, "Energy Shield"),
            ref other => panic!("expected blocked, got {:?}", other),
        }
        // The other gadget survives; no ledger record was produced.
        assert_eq!(engine.store().count_item(2, "Cloaking Device").unwrap(), 1);
        assert!(engine.store().stolen_records(1, 2).unwrap().is_empty());
    }

    #[test]
    fn retrieval_without_target_is_rejected() {
        let engine = engine();
        engine.store().add_item(1, catalog::RETRIEVAL_ITEM).unwrap();
        let err = engine.use_item(1, catalog::RETRIEVAL_ITEM, None).unwrap_err();
        assert!(matches!(err, GameError::TargetRequired(_)));
        // Nothing consumed on the error path.
        assert_eq!(engine.store().count_item(1, catalog::RETRIEVAL_ITEM).unwrap(), 1);
    }

    #[test]
    fn using_a_non_gadget_is_rejected_without_consumption() {
        let engine = engine();
        engine.store().add_item(1, "Handgun").unwrap();
        let err = engine.use_item(1, "Handgun", Some(2)).unwrap_err();
        assert!(matches!(err, GameError::NotAGadget(_)));
        assert_eq!(engine.store().count_item(1, "Handgun").unwrap(), 1);
    }

    #[test]
    fn give_is_limited_to_the_privileged_user() {
        let engine = engine();
        let err = engine.give(1, 2, "Handgun").unwrap_err();
        assert!(matches!(err, GameError::Unauthorized));
        engine.give(GIVER, 2, "Handgun").unwrap();
        assert_eq!(engine.store().count_item(2, "Handgun").unwrap(), 1);
        // Minting: nothing was removed from the giver.
        assert!(engine.store().list_items(GIVER).unwrap().is_empty());
    }
}
