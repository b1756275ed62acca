//! Full directory strategy selection.

use super::CoreRetrieval;
use guildfetch_api::*;

impl CoreRetrieval {
    /// Fetch every member of the guild with the best available path.
    pub(super) async fn fetch_directory(
        &self,
        options: &FetchOptions,
    ) -> GfResult<Fetched> {
        let member_count = self.member_count();

        if self.guild.can_manage_members {
            if let Some(channel_id) = self.guild.list_channel {
                return self.windowed_directory(channel_id, options).await;
            }
            tracing::debug!(
                "no member list channel known, cannot use windowed listing"
            );
        }

        if member_count < self.config.safe_listing_threshold {
            return self.list_via_rest().await.map(Fetched::Many);
        }

        tracing::warn!(
            member_count,
            threshold = self.config.safe_listing_threshold,
            "no bulk member path available, falling back to brute force; \
             this is slow and the result may be incomplete"
        );

        self.bruteforce(BruteforceOptions::default())
            .await
            .map(Fetched::BestEffort)
    }

    /// Walk the member list window by window, until a window adds no
    /// member or the known member count is reached. List updates refresh
    /// the count while walking, and a count of 0 is unknown.
    async fn windowed_directory(
        &self,
        channel_id: ChannelId,
        options: &FetchOptions,
    ) -> GfResult<Fetched> {
        let size = self.config.windowed_range_size;
        let mut out = MemberMap::new();
        let mut offset = 0_u32;

        loop {
            let window = self
                .windowed_list(WindowedListOptions {
                    channel_id,
                    offset,
                    double_range: offset > 0,
                    max_retries: None,
                    timeout: options.timeout,
                })
                .await?;

            let before = out.len();
            out.extend(window);
            if out.len() == before {
                tracing::debug!(offset, "empty member list window, stopping");
                break;
            }

            offset = match offset.checked_add(size) {
                Some(offset) => offset,
                None => break,
            };

            let member_count = self.member_count();
            if member_count > 0 && offset as u64 >= member_count {
                break;
            }
        }

        if self.member_count() > self.config.windowed_approximate_above {
            Ok(Fetched::BestEffort(out))
        } else {
            Ok(Fetched::Many(out))
        }
    }

    /// Page through the REST member listing, ordered by user id.
    async fn list_via_rest(&self) -> GfResult<MemberMap> {
        let page_size = self.config.rest_page_size;
        let mut out = MemberMap::new();
        let mut after = None;

        loop {
            let page = self
                .rest
                .list_members(self.guild_id(), after, page_size)
                .await?;
            let len = page.len();
            tracing::trace!(?after, len, "rest member page");

            after = page.iter().map(|m| m.id).max().or(after);
            for member in page {
                let member = self.store.put(member).await?;
                out.insert(member.id, member);
            }

            if len < page_size as usize {
                break;
            }
        }

        Ok(out)
    }
}
