use poise::serenity_prelude as serenity;
use poise::CreateReply;

use crate::levels::db::LevelRow;
use crate::utils::embed;
use crate::{Context, Error};

async fn rank_impl(ctx: Context<'_>, member: Option<serenity::User>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("서버에서만 사용할 수 있습니다")?;
    let user = member.unwrap_or_else(|| ctx.author().clone());

    let guild_key = guild_id.to_string();
    let user_key = user.id.to_string();

    let row = ctx
        .data()
        .level_db
        .get(&guild_key, &user_key)
        .unwrap_or(LevelRow {
            user_id: user_key.clone(),
            xp: 0,
            messages: 0,
            voice_seconds: 0,
        });
    let rank = ctx.data().level_db.rank_of(&guild_key, &user_key);

    ctx.send(CreateReply::default().embed(embed::rank_card(user.id.get(), &row, rank)))
        .await?;
    Ok(())
}

/// 레벨과 순위를 확인합니다
#[poise::command(slash_command, guild_only)]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "조회할 멤버 (생략 시 본인)"] member: Option<serenity::User>,
) -> Result<(), Error> {
    rank_impl(ctx, member).await
}

/// 레벨과 순위를 확인합니다 (/rank 단축)
#[poise::command(slash_command, guild_only)]
pub async fn lv(
    ctx: Context<'_>,
    #[description = "조회할 멤버 (생략 시 본인)"] member: Option<serenity::User>,
) -> Result<(), Error> {
    rank_impl(ctx, member).await
}
