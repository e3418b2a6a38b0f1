use rand::Rng;

use crate::storage::JsonStorage;

pub const USER_ID_KEY: &str = "user_id";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

fn generate(prefix: &str, now_ms: i64) -> String {
    format!("{}_{}_{}", prefix, now_ms, random_suffix(&mut rand::thread_rng()))
}

/// Per page load, never persisted.
pub fn generate_session_id(now_ms: i64) -> String {
    generate("session", now_ms)
}

pub fn generate_user_id(now_ms: i64) -> String {
    generate("user", now_ms)
}

/// Returns the persisted user id, creating and storing one on first use.
/// If storage refuses the write the id still lives for this page load.
pub fn load_or_create_user_id(storage: &JsonStorage, now_ms: i64) -> String {
    if let Some(existing) = storage
        .get::<String>(USER_ID_KEY)
        .filter(|id| !id.is_empty())
    {
        return existing;
    }
    let user_id = generate_user_id(now_ms);
    storage.set(USER_ID_KEY, &user_id);
    user_id
}

pub fn clear_user_id(storage: &JsonStorage) -> bool {
    storage.remove(USER_ID_KEY)
}
