mod help;
mod leaderboard;
mod rank;

use crate::{Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        rank::rank(),
        rank::lv(),
        leaderboard::leaderboard(),
        leaderboard::lb(),
    ]
}
