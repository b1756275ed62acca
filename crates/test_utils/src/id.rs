//! Test utilities associated with ids.

use guildfetch_api::UserId;
use rand::Rng;

/// Create a random user id.
pub fn random_user_id() -> UserId {
    // keep clear of the small ids tests pick by hand
    UserId(rand::thread_rng().gen_range(1 << 20..u64::MAX))
}

/// Create `count` distinct random user ids.
pub fn create_user_id_list(count: usize) -> Vec<UserId> {
    let mut out = std::collections::HashSet::with_capacity(count);
    while out.len() < count {
        out.insert(random_user_id());
    }
    out.into_iter().collect()
}
