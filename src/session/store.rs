//! Persistence of users' exercise rotation, results and live comments
//!
//! Components:
//! - `SessionStore`: what the session driver needs from storage
//! - `MemoryStore`: user records kept in an `FxHashMap`
//! - `JsonFileStore`: the same records, written to a JSON file after every change

use crate::error::{Error, Result};
use crate::exercise::ExerciseKind;
use crate::session::feedback::Notice;
use crate::session::results::ExerciseResult;
use crate::tracking::Handedness;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage operations used by a session
pub trait SessionStore {
    /// Current position in the user's exercise rotation; a new user starts at 0
    fn exercise_index(&mut self, user: &str) -> Result<u32>;

    /// Which hand the user exercises, if recorded
    fn paralysed_hand(&self, user: &str) -> Result<Option<Handedness>>;

    /// Move to the next exercise. With `next_session` set the day is over:
    /// the rotation is cleared and the next session is scheduled.
    fn advance_exercise(&mut self, user: &str, next_session: Option<DateTime<Utc>>)
        -> Result<()>;

    fn record_result(
        &mut self,
        user: &str,
        day: NaiveDate,
        exercise: ExerciseKind,
        result: &ExerciseResult,
    ) -> Result<()>;

    fn record_postpone(&mut self, user: &str) -> Result<()>;

    /// Replace the day's live comment
    fn post_live_comment(&mut self, user: &str, day: NaiveDate, notice: &Notice) -> Result<()>;
}

/// Everything recorded for one day
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_comment: Option<Notice>,
    /// Keyed by exercise result key (`wristSideToSide`, ...)
    #[serde(default)]
    pub results: BTreeMap<String, ExerciseResult>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub exercise: Option<u32>,
    pub paralysed_hand: Option<Handedness>,
    pub next_session: Option<DateTime<Utc>>,
    pub postponed: u32,
    /// Keyed by ISO date
    pub days: BTreeMap<String, DayRecord>,
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// In-memory user records
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    users: FxHashMap<String, UserRecord>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a user, if any
    pub fn user(&self, user: &str) -> Option<&UserRecord> {
        self.users.get(user)
    }

    fn user_mut(&mut self, user: &str) -> &mut UserRecord {
        self.users.entry(user.to_string()).or_default()
    }

    /// Record which hand the user exercises
    pub fn set_paralysed_hand(&mut self, user: &str, hand: Handedness) {
        self.user_mut(user).paralysed_hand = Some(hand);
    }

    /// Record for one user and day
    pub fn day(&self, user: &str, day: NaiveDate) -> Option<&DayRecord> {
        self.user(user)?.days.get(&day_key(day))
    }

    /// Number of known users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn exercise_index(&mut self, user: &str) -> Result<u32> {
        Ok(*self.user_mut(user).exercise.get_or_insert(0))
    }

    fn paralysed_hand(&self, user: &str) -> Result<Option<Handedness>> {
        Ok(self.user(user).and_then(|record| record.paralysed_hand))
    }

    fn advance_exercise(
        &mut self,
        user: &str,
        next_session: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let record = self.user_mut(user);
        match next_session {
            Some(at) => {
                record.exercise = None;
                record.next_session = Some(at);
            }
            None => record.exercise = Some(record.exercise.unwrap_or(0) + 1),
        }
        Ok(())
    }

    fn record_result(
        &mut self,
        user: &str,
        day: NaiveDate,
        exercise: ExerciseKind,
        result: &ExerciseResult,
    ) -> Result<()> {
        self.user_mut(user)
            .days
            .entry(day_key(day))
            .or_default()
            .results
            .insert(exercise.result_key().to_string(), *result);
        Ok(())
    }

    fn record_postpone(&mut self, user: &str) -> Result<()> {
        self.user_mut(user).postponed += 1;
        Ok(())
    }

    fn post_live_comment(&mut self, user: &str, day: NaiveDate, notice: &Notice) -> Result<()> {
        self.user_mut(user)
            .days
            .entry(day_key(day))
            .or_default()
            .live_comment = Some(notice.clone());
        Ok(())
    }
}

/// User records persisted as one JSON document
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: MemoryStore,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Store(format!("{}: {}", path.display(), e)))?
        } else {
            MemoryStore::new()
        };
        debug!("opened store {} ({} users)", path.display(), records.len());
        Ok(JsonFileStore { path, records })
    }

    /// Records as currently held in memory
    pub fn records(&self) -> &MemoryStore {
        &self.records
    }

    /// File the records are written to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record which hand the user exercises and save
    pub fn set_paralysed_hand(&mut self, user: &str, hand: Handedness) -> Result<()> {
        self.records.set_paralysed_hand(user, hand);
        self.save()
    }

    /// Write all records, creating the parent directory if needed
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.records)?)?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn exercise_index(&mut self, user: &str) -> Result<u32> {
        let known = self.records.user(user).and_then(|r| r.exercise).is_some();
        let index = self.records.exercise_index(user)?;
        if !known {
            self.save()?;
        }
        Ok(index)
    }

    fn paralysed_hand(&self, user: &str) -> Result<Option<Handedness>> {
        self.records.paralysed_hand(user)
    }

    fn advance_exercise(
        &mut self,
        user: &str,
        next_session: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.records.advance_exercise(user, next_session)?;
        self.save()
    }

    fn record_result(
        &mut self,
        user: &str,
        day: NaiveDate,
        exercise: ExerciseKind,
        result: &ExerciseResult,
    ) -> Result<()> {
        self.records.record_result(user, day, exercise, result)?;
        self.save()
    }

    fn record_postpone(&mut self, user: &str) -> Result<()> {
        self.records.record_postpone(user)?;
        self.save()
    }

    fn post_live_comment(&mut self, user: &str, day: NaiveDate, notice: &Notice) -> Result<()> {
        self.records.post_live_comment(user, day, notice)?;
        self.save()
    }
}
