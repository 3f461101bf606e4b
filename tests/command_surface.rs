//! Integration tests for the bot command surface: authorization checks,
//! response routing (public replies, private notices, DMs), and inventory
//! page formatting.

use std::sync::Arc;

use settlerbot::bot::{Bot, Command, Outgoing, StaticRoster};
use settlerbot::engine::Engine;
use settlerbot::store::Store;
use tokio::sync::mpsc;

const GIVER: i64 = 1000;
const ALICE: i64 = 1;
const BOB: i64 = 2;

fn setup(
    authorized: Vec<i64>,
    roster: Vec<i64>,
) -> (Bot, mpsc::UnboundedReceiver<Outgoing>, Arc<Engine>) {
    let engine = Arc::new(Engine::new(
        Arc::new(Store::open_in_memory().unwrap()),
        GIVER,
    ));
    let (tx, rx) = mpsc::unbounded_channel();
    let bot = Bot::new(
        engine.clone(),
        authorized,
        Arc::new(StaticRoster(roster)),
        tx,
    );
    (bot, rx, engine)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Outgoing>) -> Vec<Outgoing> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

#[test]
fn tell_requires_the_allow_list() {
    let (bot, mut rx, _) = setup(vec![BOB], vec![]);
    bot.handle(
        ALICE,
        Command::Tell {
            message: "hi all".to_string(),
        },
    );
    let messages = drain(&mut rx);
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        Outgoing::Reply { user, text, private } => {
            assert_eq!(*user, ALICE);
            assert!(*private);
            assert!(text.contains("permission"));
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn tell_echoes_to_the_channel_for_authorized_users() {
    let (bot, mut rx, _) = setup(vec![ALICE], vec![]);
    bot.handle(
        ALICE,
        Command::Tell {
            message: "hi all".to_string(),
        },
    );
    let messages = drain(&mut rx);
    assert_eq!(
        messages[0],
        Outgoing::Channel {
            text: "hi all".to_string()
        }
    );
    assert_eq!(
        messages[1],
        Outgoing::Reply {
            user: ALICE,
            text: "Message sent!".to_string(),
            private: true,
        }
    );
}

#[test]
fn slots_replies_publicly_with_three_reels() {
    let (bot, mut rx, _) = setup(vec![], vec![]);
    bot.handle(ALICE, Command::Slots);
    let messages = drain(&mut rx);
    match &messages[0] {
        Outgoing::Reply { text, private, .. } => {
            assert!(!private);
            assert!(text.starts_with("🎰 "));
            assert_eq!(text.matches(" | ").count(), 2);
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn empty_inventory_gets_a_private_notice() {
    let (bot, mut rx, _) = setup(vec![], vec![]);
    bot.handle(ALICE, Command::Inv);
    match &drain(&mut rx)[0] {
        Outgoing::Reply { text, private, .. } => {
            assert!(*private);
            assert_eq!(text, "Your inventory is empty.");
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn inventory_lists_five_items_per_page() {
    let (bot, mut rx, engine) = setup(vec![], vec![]);
    for i in 1..=6 {
        engine.store().add_item(ALICE, &format!("Item {}", i)).unwrap();
    }
    bot.handle(ALICE, Command::Inv);
    match &drain(&mut rx)[0] {
        Outgoing::Reply { text, .. } => {
            assert!(text.contains("(Page 1/2)"));
            assert!(text.contains("- Item 5"));
            assert!(!text.contains("- Item 6"));
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn domain_errors_are_rendered_privately() {
    let (bot, mut rx, _) = setup(vec![], vec![]);
    bot.handle(
        ALICE,
        Command::Trade {
            recipient: ALICE,
            item: "Handgun".to_string(),
        },
    );
    match &drain(&mut rx)[0] {
        Outgoing::Reply { text, private, .. } => {
            assert!(*private);
            assert!(text.contains("yourself"));
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn invalid_location_lists_the_choices() {
    let (bot, mut rx, _) = setup(vec![], vec![]);
    bot.handle(
        ALICE,
        Command::Scavenge {
            location: "atlantis".to_string(),
        },
    );
    match &drain(&mut rx)[0] {
        Outgoing::Reply { text, private, .. } => {
            assert!(*private);
            assert!(text.contains("Invalid location"));
            assert!(text.contains("eden"));
            assert!(text.contains("kahns"));
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn eclipse_scavenge_notifies_both_theft_parties() {
    let (bot, mut rx, engine) = setup(vec![], vec![ALICE, BOB]);
    // The only eligible victim holds a protective gadget, so the follow-on
    // theft deterministically resolves as blocked.
    engine.store().add_item(BOB, "Cloaking Device").unwrap();
    bot.handle(
        ALICE,
        Command::Scavenge {
            location: "eclipse".to_string(),
        },
    );
    let messages = drain(&mut rx);
    assert!(matches!(messages[0], Outgoing::Reply { private: false, .. }));
    let dms: Vec<_> = messages
        .iter()
        .filter_map(|msg| match msg {
            Outgoing::Dm { user, text } => Some((*user, text.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(dms.len(), 2);
    assert!(dms.iter().any(|(user, text)| *user == ALICE && text.contains("blocked")));
    assert!(dms.iter().any(|(user, text)| *user == BOB && text.contains("Cloaking Device")));
    // Block consumed the gadget without any transfer or record.
    assert!(engine.store().list_items(BOB).unwrap().is_empty());
    assert!(engine.store().stolen_records(ALICE, BOB).unwrap().is_empty());
}

#[tokio::test]
async fn give_confirmation_flows_through_the_queue() {
    let (bot, mut rx, engine) = setup(vec![], vec![]);
    bot.handle(
        GIVER,
        Command::Give {
            recipient: BOB,
            item: "Watering Can".to_string(),
        },
    );
    match rx.recv().await.unwrap() {
        Outgoing::Reply { user, text, private } => {
            assert_eq!(user, GIVER);
            assert!(!private);
            assert!(text.contains("Watering Can"));
        }
        other => panic!("unexpected message: {:?}", other),
    }
    assert_eq!(engine.store().count_item(BOB, "Watering Can").unwrap(), 1);
}
