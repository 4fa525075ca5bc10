use tracing::info;

use super::DomainStore;
use crate::error::{CoreError, EntityKind, Result};
use crate::events::Event;
use crate::training::{BlockCompletion, NewSession, TrainingSession};

impl DomainStore {
    pub fn create_session(&mut self, new: NewSession) -> Result<String> {
        new.validate()?;
        let session = new.build(None);
        let id = session.id.clone();

        let mut next = self.draft();
        next.sessions.push(session);
        self.publish(next, Event::SessionCreated { session_id: id.clone() });
        Ok(id)
    }

    pub fn remove_session(&mut self, session_id: &str) -> Result<()> {
        let mut next = self.draft();
        let index = next
            .sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Session, session_id))?;
        next.sessions.remove(index);
        self.publish(
            next,
            Event::SessionRemoved {
                session_id: session_id.to_string(),
            },
        );
        Ok(())
    }

    /// Complete a block with an optional 0..=100 score and roll the result
    /// into experience, training time and achievements.
    pub fn complete_block(
        &mut self,
        session_id: &str,
        block_id: &str,
        score: Option<u8>,
    ) -> Result<BlockCompletion> {
        self.finish_block(session_id, block_id, |session| {
            session.complete_block(block_id, score)
        })
    }

    /// Answer a block by option id: the correct option scores 100, any other
    /// scores 0.
    pub fn answer_block(
        &mut self,
        session_id: &str,
        block_id: &str,
        option_id: &str,
    ) -> Result<BlockCompletion> {
        self.finish_block(session_id, block_id, |session| {
            session.answer_block(block_id, option_id)
        })
    }

    fn finish_block(
        &mut self,
        session_id: &str,
        block_id: &str,
        complete: impl FnOnce(&mut TrainingSession) -> Result<BlockCompletion>,
    ) -> Result<BlockCompletion> {
        let mut next = self.draft();
        let session = next
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Session, session_id))?;
        let completion = complete(session)?;

        let training = &self.config.training;
        let progress = &mut next.progress;
        progress.total_training_time += u64::from(completion.minutes);
        if completion.session_completed {
            progress.sessions_completed += 1;
        }

        let experience_gained =
            u64::from(completion.score.unwrap_or(0)) * training.experience_per_score_point;
        let gain = progress.gain_experience(experience_gained, training.threshold_growth);
        if gain.levels_gained > 0 {
            info!(level = progress.level, levels_gained = gain.levels_gained, "level up");
        }
        for title in &gain.unlocked {
            info!(achievement = %title, "achievement unlocked");
        }

        let level = progress.level;
        self.publish(
            next,
            Event::BlockCompleted {
                session_id: session_id.to_string(),
                block_id: block_id.to_string(),
                score: completion.score,
                progress_pct: completion.progress_pct,
                session_completed: completion.session_completed,
                experience_gained,
                level,
                levels_gained: gain.levels_gained,
                unlocked: gain.unlocked,
            },
        );
        Ok(completion)
    }
}
