//! Fake data for development databases.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use sea_orm::DatabaseConnection;

use crate::{
    error::ServerError,
    models::{snippet, user},
    week::{week_of, IsoWeek},
};

pub const PASSWORD: &str = "p@ssw0rd";
pub const USER_COUNT: usize = 20;
pub const SNIPPET_COUNT: usize = 1000;

/// How far back fake snippets go.
const HISTORY_DAYS: i64 = 10 * 365;

const NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Dennis", "Donald", "Edsger", "Frances", "Grace", "Guido",
    "John", "Ken", "Leslie", "Linus", "Margaret", "Niklaus", "Radia", "Robin", "Sophie", "Tony",
];

const WORDS: &[&str] = &[
    "fixed", "reviewed", "deployed", "refactored", "tested", "designed", "the", "parser",
    "release", "dashboard", "migration", "pipeline", "onboarding", "docs", "cache", "bug",
    "feature", "meeting", "with", "team", "for", "new", "old", "service", "client",
];

const TAGS: &[&str] = &["backend", "frontend", "ops", "meetings", "hiring", "docs"];

fn fake_text<R: Rng>(rng: &mut R) -> String {
    let lines = rng.gen_range(1..=4);
    (0..lines)
        .map(|_| {
            let length = rng.gen_range(3..=10);
            let words: Vec<&str> = (0..length)
                .filter_map(|_| WORDS.choose(rng).copied())
                .collect();
            format!("- {}", words.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill the database with [`USER_COUNT`] confirmed users, all with password
/// [`PASSWORD`], and [`SNIPPET_COUNT`] snippets on past weeks, never two for
/// the same user and week.
pub async fn fill_db(db: &DatabaseConnection) -> Result<(), ServerError> {
    tracing::info!("Filling dev database with fake data...");

    let mut users = Vec::with_capacity(USER_COUNT);
    for (i, name) in NAMES.iter().take(USER_COUNT).enumerate() {
        let email = format!("{}{}@example.com", name.to_lowercase(), i);
        let user = match user::find_by_email(db, &email).await? {
            Some(user) => user,
            None => user::create(db, &email, name, PASSWORD, true).await?,
        };
        users.push((user, HashSet::<IsoWeek>::new()));
    }
    tracing::info!("Created {} users.", users.len());

    let today = Utc::now().date_naive();
    let mut created = 0;
    while created < SNIPPET_COUNT {
        let (week, user_id, text, tags) = {
            let mut rng = rand::thread_rng();
            let (user, weeks) = &mut users[rng.gen_range(0..USER_COUNT)];
            let week = week_of(today - Duration::days(rng.gen_range(0..HISTORY_DAYS)));
            if !weeks.insert(week) {
                continue;
            }
            let tag_count = rng.gen_range(0..=2);
            let tags: Vec<&str> = TAGS
                .choose_multiple(&mut rng, tag_count)
                .copied()
                .collect();
            (week, user.id, fake_text(&mut rng), tags)
        };
        if snippet::get_by_week(db, user_id, week).await?.is_some() {
            continue;
        }
        snippet::update(db, user_id, week, &text, &tags).await?;
        created += 1;
    }
    tracing::info!("Created {} snippets.", created);
    Ok(())
}
