//! Windowed member list subscription.
//!
//! A subscription names up to two index ranges of a channel scoped member
//! list. The server answers with list updates addressed by guild and
//! channel rather than by nonce, so the request is tracked under a token
//! derived from both, and there can only be one windowed request per
//! channel at a time.

use super::registry::*;
use super::CoreRetrieval;
use guildfetch_api::*;

/// Complete on the sync of the expected range. Invalidation of any
/// subscribed range resends the subscription.
pub(super) struct WindowedPolicy {
    expected: ListRange,
    subscribed: Vec<ListRange>,
    message: PushMessage,
}

impl RequestPolicy for WindowedPolicy {
    fn is_complete(&mut self, _: &MemberMap, meta: &ChunkMeta) -> bool {
        matches!(
            meta,
            ChunkMeta::List { range: Some(range), synced: true }
                if *range == self.expected
        )
    }

    fn on_invalidate(&mut self, range: ListRange) -> InvalidateAction {
        if self.subscribed.contains(&range) {
            InvalidateAction::Resend(self.message.clone())
        } else {
            InvalidateAction::Ignore
        }
    }
}

impl CoreRetrieval {
    /// Subscribe to one window of a channel member list and collect it.
    pub(super) async fn windowed_list(
        &self,
        options: WindowedListOptions,
    ) -> GfResult<MemberMap> {
        options.validate()?;

        let size = self.config.windowed_range_size;
        let expected = ListRange::window(options.offset, size);
        let ranges = if options.double_range && options.offset > 0 {
            vec![ListRange::window(0, size), expected]
        } else {
            vec![expected]
        };

        let member_count = self.member_count();
        if member_count > self.config.windowed_approximate_above {
            tracing::warn!(
                member_count,
                threshold = self.config.windowed_approximate_above,
                "member lists of guilds this large are approximate, \
                 the result may be incomplete"
            );
        }

        let message = PushMessage::SubscribeRanges(SubscribeRanges {
            guild_id: self.guild_id(),
            channel_id: options.channel_id,
            ranges: ranges.clone(),
        });
        let token = Token::for_member_list(self.guild_id(), options.channel_id);
        let spec = RequestSpec {
            guild_id: self.guild_id(),
            kind: RequestKind::WindowedList,
            policy: Box::new(WindowedPolicy {
                expected,
                subscribed: ranges,
                message: message.clone(),
            }),
            timeout: options
                .timeout
                .unwrap_or_else(|| self.config.windowed_timeout()),
            mode: DeadlineMode::Sliding,
            max_retries: options
                .max_retries
                .unwrap_or(self.config.windowed_max_retries),
        };

        self.dispatcher
            .request(token, spec, message)
            .await?
            .outcome()
            .await
    }
}
