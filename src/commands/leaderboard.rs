use poise::CreateReply;

use crate::utils::embed;
use crate::{Context, Error};

async fn leaderboard_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("서버에서만 사용할 수 있습니다")?;
    let rows = ctx.data().level_db.top(&guild_id.to_string(), 10);
    ctx.send(CreateReply::default().embed(embed::leaderboard(&rows)))
        .await?;
    Ok(())
}

/// 서버 XP 상위 10명을 보여줍니다
#[poise::command(slash_command, guild_only)]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    leaderboard_impl(ctx).await
}

/// 서버 XP 상위 10명을 보여줍니다 (/leaderboard 단축)
#[poise::command(slash_command, guild_only)]
pub async fn lb(ctx: Context<'_>) -> Result<(), Error> {
    leaderboard_impl(ctx).await
}
