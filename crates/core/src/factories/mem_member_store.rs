//! A memory-based member store.

use guildfetch_api::{builder, config::Config, *};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A memory-based member store factory.
///
/// This stores member records in an in-memory hash map keyed by guild
/// and user id. Writes are last-write-wins.
#[derive(Debug)]
pub struct MemMemberStoreFactory {}

impl MemMemberStoreFactory {
    /// Construct a new MemMemberStoreFactory.
    pub fn create() -> DynMemberStoreFactory {
        let out: DynMemberStoreFactory = Arc::new(Self {});
        out
    }
}

impl MemberStoreFactory for MemMemberStoreFactory {
    fn default_config(&self, _config: &mut Config) -> GfResult<()> {
        Ok(())
    }

    fn validate_config(&self, _config: &Config) -> GfResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, GfResult<DynMemberStore>> {
        Box::pin(async move {
            let out: DynMemberStore = Arc::new(MemMemberStore::default());
            Ok(out)
        })
    }
}

#[derive(Default)]
struct MemMemberStore(Mutex<HashMap<(GuildId, UserId), Member>>);

impl std::fmt::Debug for MemMemberStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemMemberStore").finish()
    }
}

impl MemberStore for MemMemberStore {
    fn get(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> BoxFut<'_, GfResult<Option<Member>>> {
        let out = self.0.lock().unwrap().get(&(guild_id, user_id)).cloned();
        Box::pin(async move { Ok(out) })
    }

    fn put(&self, member: Member) -> BoxFut<'_, GfResult<Member>> {
        self.0
            .lock()
            .unwrap()
            .insert((member.guild_id, member.id), member.clone());
        Box::pin(async move { Ok(member) })
    }

    fn count(&self, guild_id: GuildId) -> BoxFut<'_, GfResult<usize>> {
        let out = self
            .0
            .lock()
            .unwrap()
            .keys()
            .filter(|(g, _)| *g == guild_id)
            .count();
        Box::pin(async move { Ok(out) })
    }

    fn list(&self, guild_id: GuildId) -> BoxFut<'_, GfResult<MemberMap>> {
        let out = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|((g, _), _)| *g == guild_id)
            .map(|((_, u), m)| (*u, m.clone()))
            .collect::<MemberMap>();
        Box::pin(async move { Ok(out) })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use guildfetch_test_utils::member::test_member;

    #[tokio::test]
    async fn last_write_wins() {
        let store = MemMemberStore::default();
        let mut m = test_member(GuildId(1), UserId(2), "ferris");

        assert_eq!(None, store.get(GuildId(1), UserId(2)).await.unwrap());

        store.put(m.clone()).await.unwrap();
        m.nickname = Some("crab".into());
        store.put(m.clone()).await.unwrap();

        assert_eq!(Some(m), store.get(GuildId(1), UserId(2)).await.unwrap());
        assert_eq!(1, store.count(GuildId(1)).await.unwrap());
        assert_eq!(0, store.count(GuildId(9)).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_per_guild() {
        let store = MemMemberStore::default();
        store.put(test_member(GuildId(1), UserId(2), "a")).await.unwrap();
        store.put(test_member(GuildId(1), UserId(3), "b")).await.unwrap();
        store.put(test_member(GuildId(4), UserId(2), "c")).await.unwrap();

        let listed = store.list(GuildId(1)).await.unwrap();
        assert_eq!(2, listed.len());
        assert_eq!("a", listed[&UserId(2)].username);
        assert!(store.list(GuildId(9)).await.unwrap().is_empty());
    }
}
