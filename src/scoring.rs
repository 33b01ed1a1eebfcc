//! Scoring and interests lookups called by the dispatcher.

use std::time::Duration;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::store::Store;

/// How long a computed score stays cached.
pub const SCORE_TTL: Duration = Duration::from_secs(60 * 60);

/// Labels used when the store holds no interests for a client.
pub const INTERESTS: &[&str] = &[
    "cars", "pets", "travel", "hi-tech", "sport", "music", "books", "tv", "cinema", "geek", "otus",
];

/// Computes the score for a client profile.
///
/// Scores are cached per name/phone/birthday combination.
pub fn get_score(
    store: &dyn Store,
    phone: Option<&str>,
    email: Option<&str>,
    birthday: Option<NaiveDate>,
    gender: Option<i64>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> f64 {
    let key = score_key(first_name, last_name, phone, birthday);
    if let Some(cached) = store.cache_get(&key).and_then(|v| v.parse::<f64>().ok()) {
        return cached;
    }

    let mut score = 0.0;
    if phone.is_some() {
        score += 1.5;
    }
    if email.is_some() {
        score += 1.5;
    }
    // Gender 0 means "unknown" and does not count.
    if birthday.is_some() && gender.is_some_and(|g| g != 0) {
        score += 1.5;
    }
    if first_name.is_some() && last_name.is_some() {
        score += 0.5;
    }

    store.cache_set(&key, score.to_string(), SCORE_TTL);
    score
}

fn score_key(
    first_name: Option<&str>,
    last_name: Option<&str>,
    phone: Option<&str>,
    birthday: Option<NaiveDate>,
) -> String {
    let birthday = birthday
        .map(|d| d.format("%Y%m%d").to_string())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    for part in [
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default(),
        phone.unwrap_or_default(),
        birthday.as_str(),
    ] {
        hasher.update(part.as_bytes());
    }
    format!("uid:{}", hex::encode(hasher.finalize()))
}

/// Looks up the interests of one client.
///
/// Reads the JSON list stored under `i:<id>`; clients without an entry get
/// two labels from [`INTERESTS`] picked by id.
///
/// # Errors
///
/// Returns an error if the stored entry is not a JSON list of strings.
pub fn get_interests(store: &dyn Store, client_id: i128) -> Result<Vec<String>, serde_json::Error> {
    if let Some(raw) = store.get(&format!("i:{}", client_id)) {
        return serde_json::from_str(&raw);
    }

    let n = INTERESTS.len() as i128;
    let first = client_id.rem_euclid(n);
    let second = (first + 1 + client_id.rem_euclid(n - 1)) % n;
    Ok(vec![
        INTERESTS[first as usize].to_string(),
        INTERESTS[second as usize].to_string(),
    ])
}
