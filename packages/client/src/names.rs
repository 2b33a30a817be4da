//! Random display names, room ids and client ids.

use rand::Rng;
use rand::seq::SliceRandom;

const ADJECTIVES: [&str; 32] = [
    "Happy", "Clever", "Bright", "Swift", "Calm", "Bold", "Wise", "Kind", "Brave", "Cool",
    "Smart", "Quick", "Gentle", "Noble", "Proud", "Keen", "Witty", "Sunny", "Merry", "Jolly",
    "Lively", "Eager", "Zesty", "Peppy", "Daring", "Mighty", "Trusty", "Loyal", "Honest", "Fair",
    "True", "Pure",
];

const NOUNS: [&str; 32] = [
    "Panda", "Tiger", "Eagle", "Dolphin", "Fox", "Wolf", "Bear", "Hawk", "Lion", "Falcon",
    "Otter", "Lynx", "Raven", "Phoenix", "Dragon", "Owl", "Jaguar", "Cheetah", "Panther", "Cobra",
    "Shark", "Whale", "Penguin", "Koala", "Leopard", "Gazelle", "Stallion", "Mustang", "Bison",
    "Moose", "Elk", "Deer",
];

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ROOM_ID_LEN: usize = 22;
const CLIENT_ID_SUFFIX_LEN: usize = 9;

/// "Adjective Noun", e.g. "Happy Panda"
pub fn random_display_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Happy");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Panda");
    format!("{adjective} {noun}")
}

/// Hard-to-guess room id of lowercase base36 characters
pub fn random_room_id() -> String {
    random_base36(ROOM_ID_LEN)
}

/// Participant id: the current time in milliseconds followed by a random suffix
pub fn generate_client_id(now_millis: i64) -> String {
    format!("{}{}", now_millis, random_base36(CLIENT_ID_SUFFIX_LEN))
}

/// Room id from either a bare id or an invite link such as `https://host/room/<id>?x=1`
pub fn extract_room_id(input: &str) -> String {
    let input = input.trim();
    match input.split_once("/room/") {
        Some((_, rest)) => rest
            .split(['?', '#'])
            .next()
            .unwrap_or(rest)
            .trim_end_matches('/')
            .to_string(),
        None => input.to_string(),
    }
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect()
}
