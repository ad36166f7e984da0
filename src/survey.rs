//! Post-session questionnaire answers.

use crate::clock::Clock;
use crate::core::format::{SEPARATOR, SURVEY_LOG};
use crate::sink::LogSink;
use std::fmt;
use std::io;

/// Highest value of the mood and fatigue scales (lowest is 0).
pub const MAX_RATING: u8 = 4;

/// Subjective ratings collected after a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyAnswers {
    pub watching_tv: bool,
    pub mood: u8,
    pub fatigue: u8,
}

/// Errors that can occur while recording survey answers.
#[derive(Debug)]
pub enum SurveyError {
    RatingOutOfRange { question: &'static str, value: u8 },
    /// Participant numbers start at 1
    InvalidParticipant(u32),
    Io(io::Error),
}

impl fmt::Display for SurveyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveyError::RatingOutOfRange { question, value } => {
                write!(f, "{question} rating {value} is outside 0..={MAX_RATING}")
            }
            SurveyError::InvalidParticipant(id) => {
                write!(f, "Invalid participant number {id}: numbers start at 1")
            }
            SurveyError::Io(e) => write!(f, "Failed to write survey answers: {e}"),
        }
    }
}

impl std::error::Error for SurveyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SurveyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl SurveyAnswers {
    pub fn new(watching_tv: bool, mood: u8, fatigue: u8) -> Result<Self, SurveyError> {
        for (question, value) in [("mood", mood), ("fatigue", fatigue)] {
            if value > MAX_RATING {
                return Err(SurveyError::RatingOutOfRange { question, value });
            }
        }
        Ok(Self {
            watching_tv,
            mood,
            fatigue,
        })
    }

    pub fn encode(&self, timestamp: i64, user_id: u32, record_id: u32) -> String {
        [
            timestamp.to_string(),
            user_id.to_string(),
            record_id.to_string(),
            self.watching_tv.to_string(),
            self.mood.to_string(),
            self.fatigue.to_string(),
        ]
        .join(SEPARATOR)
    }

    /// Append the answers for a session to the survey log.
    pub fn append(
        &self,
        sink: &dyn LogSink,
        clock: &dyn Clock,
        user_id: u32,
        record_id: u32,
    ) -> Result<(), SurveyError> {
        if user_id == 0 {
            return Err(SurveyError::InvalidParticipant(user_id));
        }
        let line = self.encode(clock.monotonic_nanos(), user_id, record_id);
        sink.append(SURVEY_LOG, &[line]).map_err(SurveyError::Io)?;
        tracing::info!(user_id, record_id, "survey answers saved");
        Ok(())
    }
}
