pub mod message;
pub mod voice_state;

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use tracing::warn;

use crate::voice::discord::DiscordGateway;
use crate::voice::{bootstrap, state};
use crate::{Data, Error};

pub async fn handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::GuildCreate { guild, .. } => {
            let gateway = DiscordGateway::new(ctx);
            if let Err(e) = bootstrap::attach_guild(
                &gateway,
                &data.voice_manager,
                &data.voice_config,
                guild.id,
            )
            .await
            {
                warn!("길드 attach 실패 ({}): {e}", guild.id);
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            bootstrap::detach_guild(&data.voice_manager, incomplete.id).await;
        }
        serenity::FullEvent::ChannelDelete { channel, .. } => {
            // 외부에서 지워진 통화방 감지. 추적 대상이 아니면 아무 일도 없다.
            state::untrack(&data.voice_manager, channel.guild_id, channel.id).await;
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            let gateway = Arc::new(DiscordGateway::new(ctx));
            voice_state::handle(ctx, &gateway, old, new, data).await?;
        }
        serenity::FullEvent::Message { new_message } => {
            message::handle(ctx, new_message, data).await?;
        }
        _ => {}
    }
    Ok(())
}
