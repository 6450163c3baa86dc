//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DailyQuest, Difficulty, StreakRecord};
use crate::logic::SubmissionOutcome;
use crate::quest::{CompletionOutcome, QuestDetail};
use crate::util::date_key;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SubmitAnswer {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "puzzleId")]
        puzzle_id: String,
        answer: String,
        #[serde(rename = "timeSpentSecs")]
        time_spent_secs: u32,
        #[serde(default)]
        skipped: bool,
        #[serde(default)]
        timezone: Option<String>,
    },
    DailyQuest {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        timezone: Option<String>,
    },
    QuestStatus {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        timezone: Option<String>,
    },
    CompleteQuest {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        timezone: Option<String>,
    },
    UpdateStreak {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        timezone: Option<String>,
    },
    GetStreak {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    AnswerResult {
        result: SubmitAnswerOut,
    },
    Quest {
        quest: QuestOut,
    },
    QuestStatus {
        status: QuestStatusOut,
    },
    QuestCompleted {
        result: CompleteQuestOut,
    },
    Streak {
        streak: StreakOut,
    },
    Error {
        message: String,
        retryable: bool,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "puzzleId")]
    pub puzzle_id: String,
    pub answer: String,
    #[serde(rename = "timeSpentSecs")]
    pub time_spent_secs: u32,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerOut {
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    #[serde(rename = "pointsEarned")]
    pub points_earned: u32,
    #[serde(rename = "newXp")]
    pub new_xp: u64,
    #[serde(rename = "newLevel")]
    pub new_level: u32,
    #[serde(rename = "puzzlesCompleted")]
    pub puzzles_completed: u64,
}

#[derive(Debug, Deserialize)]
pub struct QuestQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteQuestIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStreakIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreakQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// One puzzle inside a quest view, with the caller's completion flag.
#[derive(Debug, Serialize)]
pub struct QuestPuzzleOut {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(rename = "categoryId")]
    pub category_id: String,
    pub points: u32,
    #[serde(rename = "timeLimitSecs")]
    pub time_limit_secs: u32,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct QuestOut {
    pub id: String,
    #[serde(rename = "questDate")]
    pub quest_date: String,
    #[serde(rename = "totalQuestions")]
    pub total_questions: u32,
    #[serde(rename = "completedQuestions")]
    pub completed_questions: u32,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
    #[serde(rename = "pointsEarned")]
    pub points_earned: u32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
    pub puzzles: Vec<QuestPuzzleOut>,
}

/// Read-only status; `exists == false` means no quest was generated today.
#[derive(Debug, Serialize)]
pub struct QuestStatusOut {
    #[serde(rename = "questDate")]
    pub quest_date: String,
    pub exists: bool,
    #[serde(rename = "totalQuestions")]
    pub total_questions: u32,
    #[serde(rename = "completedQuestions")]
    pub completed_questions: u32,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct CompleteQuestOut {
    #[serde(rename = "alreadyCompleted")]
    pub already_completed: bool,
    #[serde(rename = "bonusXp")]
    pub bonus_xp: u32,
    #[serde(rename = "totalPoints")]
    pub total_points: u32,
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
    /// Absent when the post-completion streak update failed; the quest is
    /// still complete in that case.
    pub streak: Option<StreakOut>,
}

#[derive(Debug, Serialize)]
pub struct StreakOut {
    #[serde(rename = "currentStreak")]
    pub current_streak: u32,
    #[serde(rename = "longestStreak")]
    pub longest_streak: u32,
    #[serde(rename = "lastActiveDate")]
    pub last_active_date: Option<String>,
    #[serde(rename = "lastMilestoneReached")]
    pub last_milestone_reached: Option<u32>,
    #[serde(rename = "streakDates")]
    pub streak_dates: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

//
// Internal -> DTO converters
//

pub fn to_answer_out(o: SubmissionOutcome) -> SubmitAnswerOut {
    SubmitAnswerOut {
        is_correct: o.is_correct,
        points_earned: o.points_earned,
        new_xp: o.new_xp,
        new_level: o.new_level,
        puzzles_completed: o.puzzles_completed,
    }
}

pub fn to_quest_out(detail: &QuestDetail) -> QuestOut {
    QuestOut {
        id: detail.quest.id.clone(),
        quest_date: date_key(detail.quest.quest_date),
        total_questions: detail.quest.total_questions,
        completed_questions: detail.quest.completed_questions,
        is_completed: detail.quest.is_completed,
        points_earned: detail.quest.points_earned,
        created_at: detail.quest.created_at,
        completed_at: detail.quest.completed_at,
        puzzles: detail
            .puzzles
            .iter()
            .map(|(p, done)| QuestPuzzleOut {
                id: p.id.clone(),
                question: p.question.clone(),
                options: p.options.clone(),
                difficulty: p.difficulty,
                category_id: p.category_id.clone(),
                points: p.base_points,
                time_limit_secs: p.time_limit_secs,
                is_completed: *done,
            })
            .collect(),
    }
}

pub fn to_quest_status_out(date: NaiveDate, quest: Option<&DailyQuest>) -> QuestStatusOut {
    match quest {
        Some(q) => QuestStatusOut {
            quest_date: date_key(date),
            exists: true,
            total_questions: q.total_questions,
            completed_questions: q.completed_questions,
            is_completed: q.is_completed,
        },
        None => QuestStatusOut {
            quest_date: date_key(date),
            exists: false,
            total_questions: 0,
            completed_questions: 0,
            is_completed: false,
        },
    }
}

pub fn to_complete_out(o: &CompletionOutcome) -> CompleteQuestOut {
    CompleteQuestOut {
        already_completed: o.already_completed,
        bonus_xp: o.bonus_xp,
        total_points: o.total_points,
        completed_at: o.completed_at,
        streak: o.streak.as_ref().map(to_streak_out),
    }
}

pub fn to_streak_out(rec: &StreakRecord) -> StreakOut {
    StreakOut {
        current_streak: rec.current_streak,
        longest_streak: rec.longest_streak,
        last_active_date: Some(date_key(rec.last_active_date)),
        last_milestone_reached: rec.last_milestone_reached,
        streak_dates: rec.streak_dates.clone(),
    }
}

/// Zeroed view for users with no qualifying activity yet.
pub fn empty_streak_out() -> StreakOut {
    StreakOut {
        current_streak: 0,
        longest_streak: 0,
        last_active_date: None,
        last_milestone_reached: None,
        streak_dates: Vec::new(),
    }
}
