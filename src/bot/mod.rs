//! Command surface and response routing.
//!
//! The chat platform itself (gateway connection, slash-command registration,
//! rendering widgets) lives outside this crate. An adapter feeds parsed
//! [`Command`]s into [`Bot::handle`] and drains the [`Outgoing`] queue; the
//! adapter also supplies a [`Roster`] so the engine can pick theft victims
//! from the invoker's group.
//!
//! Error policy: every domain error is rendered as a private notice to the
//! invoker. Unexpected store failures are logged with context and surfaced
//! as a generic retry message; nothing internal leaks to users and nothing
//! propagates as an unhandled fault.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::catalog;
use crate::engine::{
    slots, Engine, GameError, ScavengeFind, ScavengeOutcome, TheftOutcome, UseOutcome,
};
use crate::store::UserId;

/// Items shown per inventory page.
pub const INV_PAGE_SIZE: usize = 5;

/// A parsed inbound command.
#[derive(Debug, Clone)]
pub enum Command {
    /// Echo a message to the channel (allow-listed users only).
    Tell { message: String },
    /// Spin the slot machine.
    Slots,
    /// Search a location for items.
    Scavenge { location: String },
    /// Trade an item to another player.
    Trade { recipient: UserId, item: String },
    /// Use a gadget or the retrieval item, optionally against a target.
    Use { item: String, target: Option<UserId> },
    /// Mint an item into another player's inventory (privileged).
    Give { recipient: UserId, item: String },
    /// Show the invoker's inventory.
    Inv,
}

/// Messages the platform adapter delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Response to the invoking command. `private` responses are visible to
    /// the invoker only (the platform's ephemeral reply).
    Reply {
        user: UserId,
        text: String,
        private: bool,
    },
    /// Broadcast to the channel with no attribution (the `tell` command).
    Channel { text: String },
    /// Direct notification to an arbitrary user (theft outcomes).
    Dm { user: UserId, text: String },
}

/// Resolves the candidate users in the invoker's group. The adapter excludes
/// bot accounts; the engine excludes the invoker.
pub trait Roster: Send + Sync {
    fn members(&self) -> Vec<UserId>;
}

/// A fixed member list, handy for tests and the console adapter.
pub struct StaticRoster(pub Vec<UserId>);

impl Roster for StaticRoster {
    fn members(&self) -> Vec<UserId> {
        self.0.clone()
    }
}

/// Command handler: owns the engine, the allow-list, and the outgoing queue.
pub struct Bot {
    engine: Arc<Engine>,
    authorized_users: Vec<UserId>,
    roster: Arc<dyn Roster>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

impl Bot {
    pub fn new(
        engine: Arc<Engine>,
        authorized_users: Vec<UserId>,
        roster: Arc<dyn Roster>,
        outgoing: mpsc::UnboundedSender<Outgoing>,
    ) -> Self {
        Self {
            engine,
            authorized_users,
            roster,
            outgoing,
        }
    }

    /// Handle one inbound command from `invoker`, emitting every response
    /// and notification through the outgoing queue. Never fails: all errors
    /// end up as user-facing notices per the policy above.
    pub fn handle(&self, invoker: UserId, command: Command) {
        match command {
            Command::Tell { message } => self.tell(invoker, &message),
            Command::Slots => self.slots(invoker),
            Command::Scavenge { location } => self.scavenge(invoker, &location),
            Command::Trade { recipient, item } => self.trade(invoker, recipient, &item),
            Command::Use { item, target } => self.use_item(invoker, &item, target),
            Command::Give { recipient, item } => self.give(invoker, recipient, &item),
            Command::Inv => self.inventory(invoker),
        }
    }

    fn tell(&self, invoker: UserId, message: &str) {
        if !self.authorized_users.contains(&invoker) {
            self.fail(invoker, "tell", GameError::Unauthorized);
            return;
        }
        self.send(Outgoing::Channel {
            text: message.to_string(),
        });
        self.reply(invoker, "Message sent!", true);
    }

    fn slots(&self, invoker: UserId) {
        let out = slots::spin();
        let verdict = if out.jackpot {
            "JACKPOT! 🎉 You won!"
        } else {
            "Better luck next time!"
        };
        self.reply(invoker, &format!("🎰 {} 🎰\n{}", out.line(), verdict), false);
    }

    fn scavenge(&self, invoker: UserId, location: &str) {
        let candidates = self.roster.members();
        match self.engine.scavenge(invoker, location, &candidates) {
            Ok(ScavengeOutcome { find, theft }) => {
                let text = match find {
                    ScavengeFind::Secret { .. } => "You got a secret item!".to_string(),
                    ScavengeFind::Loot { location, item } => {
                        format!("You scavenge {} and find a **{}**!", location, item)
                    }
                };
                self.reply(invoker, &text, false);
                if let Some(theft) = theft {
                    self.notify_theft(&theft);
                }
            }
            Err(e) => self.fail(invoker, "scavenge", e),
        }
    }

    fn trade(&self, invoker: UserId, recipient: UserId, item: &str) {
        match self.engine.trade(invoker, recipient, item) {
            Ok(()) => self.reply(
                invoker,
                &format!(
                    "Trade successful! You gave **{}** to <@{}>.",
                    item, recipient
                ),
                false,
            ),
            Err(e) => self.fail(invoker, "trade", e),
        }
    }

    fn use_item(&self, invoker: UserId, item: &str, target: Option<UserId>) {
        match self.engine.use_item(invoker, item, target) {
            Ok(UseOutcome::Retrieved { target, item }) => self.reply(
                invoker,
                &format!(
                    "Your **{}** retrieved **{}** from <@{}>!",
                    catalog::RETRIEVAL_ITEM,
                    item,
                    target
                ),
                false,
            ),
            Ok(UseOutcome::Disrupted { target, .. }) => self.reply(
                invoker,
                &format!(
                    "You used **{}** on <@{}>, disabling their protective gadgets!",
                    catalog::DISRUPTOR_ITEM,
                    target
                ),
                false,
            ),
            Ok(UseOutcome::Hacked { target, theft }) => {
                self.reply(
                    invoker,
                    &format!("You used **{}** on <@{}>!", catalog::HACKING_ITEM, target),
                    false,
                );
                if let Some(theft) = theft {
                    self.notify_theft(&theft);
                }
            }
            Ok(UseOutcome::Consumed { target }) => self.reply(
                invoker,
                &format!("You used **{}** on <@{}>!", item, target),
                false,
            ),
            Err(e) => self.fail(invoker, "use", e),
        }
    }

    fn give(&self, invoker: UserId, recipient: UserId, item: &str) {
        match self.engine.give(invoker, recipient, item) {
            Ok(()) => self.reply(
                invoker,
                &format!("Gave **{}** to <@{}>!", item, recipient),
                false,
            ),
            Err(e) => self.fail(invoker, "give", e),
        }
    }

    fn inventory(&self, invoker: UserId) {
        match self.engine.store().list_items(invoker) {
            Ok(items) if items.is_empty() => {
                self.reply(invoker, "Your inventory is empty.", true)
            }
            Ok(items) => {
                let text = format_inventory_page(&items, 0);
                self.reply(invoker, &text, false);
            }
            Err(e) => self.fail(invoker, "inv", GameError::Store(e)),
        }
    }

    /// DM both parties about how a theft attempt resolved.
    fn notify_theft(&self, theft: &TheftOutcome) {
        match theft {
            TheftOutcome::Blocked {
                attacker,
                victim,
                gadget,
            } => {
                self.dm(
                    *attacker,
                    &format!(
                        "Your theft attempt was blocked by <@{}>'s **{}**! The **{}** has been consumed.",
                        victim, gadget, gadget
                    ),
                );
                self.dm(
                    *victim,
                    &format!(
                        "Your **{}** blocked a theft attempt from <@{}>! The **{}** has been consumed.",
                        gadget, attacker, gadget
                    ),
                );
            }
            TheftOutcome::Stolen {
                attacker,
                victim,
                item,
            } => {
                self.dm(
                    *attacker,
                    &format!("You stole **{}** from <@{}>!", item, victim),
                );
                self.dm(
                    *victim,
                    &format!("**{}** was stolen from you by <@{}>!", item, attacker),
                );
            }
            TheftOutcome::Whiffed { attacker, victim } => {
                self.dm(
                    *attacker,
                    &format!(
                        "You tried to steal from <@{}>, but they have no items to steal!",
                        victim
                    ),
                );
            }
        }
    }

    /// Render a failed command. Domain errors carry their own user-facing
    /// text; storage failures get logged and replaced by a retry notice.
    fn fail(&self, invoker: UserId, command: &str, err: GameError) {
        let text = match err {
            GameError::Store(e) => {
                log::error!("error in {} command for {}: {}", command, invoker, e);
                "An error occurred while processing your request. Please try again later."
                    .to_string()
            }
            other => other.to_string(),
        };
        self.reply(invoker, &text, true);
    }

    fn reply(&self, user: UserId, text: &str, private: bool) {
        self.send(Outgoing::Reply {
            user,
            text: text.to_string(),
            private,
        });
    }

    fn dm(&self, user: UserId, text: &str) {
        self.send(Outgoing::Dm {
            user,
            text: text.to_string(),
        });
    }

    fn send(&self, msg: Outgoing) {
        if self.outgoing.send(msg).is_err() {
            log::warn!("outgoing channel closed; dropping message");
        }
    }
}

/// Page arithmetic for inventory listings.
pub fn page_count(total: usize) -> usize {
    if total == 0 {
        0
    } else {
        (total - 1) / INV_PAGE_SIZE + 1
    }
}

/// Format one inventory page (`page` is zero-based and clamped).
pub fn format_inventory_page(items: &[String], page: usize) -> String {
    let pages = page_count(items.len()).max(1);
    let page = page.min(pages - 1);
    let start = page * INV_PAGE_SIZE;
    let end = (start + INV_PAGE_SIZE).min(items.len());
    let mut text = format!("**Your Inventory (Page {}/{}):**\n", page + 1, pages);
    text.push_str(
        &items[start..end]
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(5), 1);
        assert_eq!(page_count(6), 2);
        assert_eq!(page_count(11), 3);
    }

    #[test]
    fn inventory_page_lists_five_items() {
        let items: Vec<String> = (1..=7).map(|i| format!("Item {}", i)).collect();
        let first = format_inventory_page(&items, 0);
        assert!(first.starts_with("**Your Inventory (Page 1/2):**"));
        assert!(first.contains("- Item 1"));
        assert!(first.contains("- Item 5"));
        assert!(!first.contains("- Item 6"));

        let second = format_inventory_page(&items, 1);
        assert!(second.contains("- Item 6"));
        assert!(second.contains("- Item 7"));
        assert!(!second.contains("- Item 5\n"));

        // Out-of-range pages clamp to the last one.
        let clamped = format_inventory_page(&items, 9);
        assert_eq!(clamped, second);
    }
}
