use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::question::NewQuestion;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub created_by: String,
    /// Inclusive start of the availability window.
    pub available_from: DateTime<Utc>,
    /// Exclusive end of the availability window.
    pub available_to: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    NotYetOpen,
    Open,
    Closed,
}

impl Quiz {
    pub fn window_state(&self, now: DateTime<Utc>) -> WindowState {
        if now < self.available_from {
            WindowState::NotYetOpen
        } else if now >= self.available_to {
            WindowState::Closed
        } else {
            WindowState::Open
        }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.window_state(now) == WindowState::Open
    }
}

/// A quiz and its questions, written in one unit by the store.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub subject: String,
    pub created_by: String,
    pub available_from: DateTime<Utc>,
    pub available_to: DateTime<Utc>,
    pub questions: Vec<NewQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn quiz(from: DateTime<Utc>, to: DateTime<Utc>) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Algebra".into(),
            subject: "Maths".into(),
            created_by: "edu".into(),
            available_from: from,
            available_to: to,
            created_at: from,
        }
    }

    #[test]
    fn window_is_inclusive_exclusive() {
        let from = Utc::now();
        let to = from + Duration::hours(1);
        let q = quiz(from, to);

        assert_eq!(q.window_state(from - Duration::seconds(1)), WindowState::NotYetOpen);
        assert_eq!(q.window_state(from), WindowState::Open);
        assert_eq!(q.window_state(to - Duration::seconds(1)), WindowState::Open);
        assert_eq!(q.window_state(to), WindowState::Closed);
        assert!(!q.is_open_at(to));
    }
}
