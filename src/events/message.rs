use poise::serenity_prelude as serenity;
use tracing::warn;

use crate::levels::{self, MESSAGE_COOLDOWN};
use crate::{Data, Error};

/// 메시지 XP 적립. 쿨다운 안의 연속 메시지는 무시한다.
pub async fn handle(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    if !levels::check_cooldown(&data.cooldowns, guild_id, msg.author.id, MESSAGE_COOLDOWN).await {
        return Ok(());
    }

    let xp = levels::message_xp();
    let total = match data.level_db.add_message_xp(
        &guild_id.to_string(),
        &msg.author.id.to_string(),
        xp,
    ) {
        Ok(total) => total,
        Err(e) => {
            warn!("메시지 XP 적립 실패: {e}");
            return Ok(());
        }
    };

    // 이번 적립으로 레벨 경계를 넘었으면 알림
    let before = levels::level_from_xp(total - xp);
    let after = levels::level_from_xp(total);
    if after > before {
        let notice = format!("🎉 <@{}> 님이 **레벨 {after}** 달성!", msg.author.id);
        if let Err(e) = msg.channel_id.say(&ctx.http, notice).await {
            warn!("레벨업 알림 전송 실패: {e}");
        }
    }

    Ok(())
}
