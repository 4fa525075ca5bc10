//! Mode switching, the sleep hint cycle, and the conversation.
//!
//! While sleep mode is active one hint cycle runs: every
//! `sleep_message_interval_ms` a hint is drawn and shown, then hidden again
//! after `sleep_message_display_ms`. Any mode change cancels both timers
//! before anything else happens, so at most one cycle is ever scheduled.

use tracing::{debug, info};

use super::{DomainStore, TimerTask};
use crate::chat::{canned_reply, validate_message, ChatMessage, Role};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::mode::{pick_sleep_message, Mode, ModeSlice};

impl DomainStore {
    /// Switch the global mode. Returns `false` when `mode` is already
    /// active, in which case nothing happens.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        let from = self.state.mode.mode;
        if from == mode {
            return false;
        }

        self.cancel_sleep_cycle();
        if mode == Mode::Sleep {
            self.cancel_replies();
            self.arm_sleep_cycle();
        }

        let mut next = self.draft();
        next.mode = ModeSlice {
            mode,
            floating_message: None,
            show_floating_message: false,
        };
        info!(from = from.as_str(), to = mode.as_str(), "mode changed");
        self.publish(next, Event::ModeChanged { from, to: mode });
        true
    }

    fn cancel_sleep_cycle(&mut self) {
        if let Some(handle) = self.owners.sleep_cycle.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = self.owners.sleep_hide.take() {
            self.timers.cancel(handle);
        }
    }

    fn cancel_replies(&mut self) {
        for (_, handle) in self.owners.replies.drain() {
            self.timers.cancel(handle);
        }
    }

    pub(super) fn arm_sleep_cycle(&mut self) {
        if let Some(previous) = self.owners.sleep_cycle.take() {
            self.timers.cancel(previous);
        }
        let handle = self.timers.schedule(
            self.config.mode.sleep_message_interval_ms.max(1),
            TimerTask::SleepCycle,
        );
        self.owners.sleep_cycle = Some(handle);
    }

    pub(super) fn on_sleep_cycle(&mut self) {
        if self.state.mode.mode != Mode::Sleep {
            return;
        }
        let message = pick_sleep_message(&mut self.rng).to_string();

        if let Some(previous) = self.owners.sleep_hide.take() {
            self.timers.cancel(previous);
        }
        let hide = self
            .timers
            .schedule(self.config.mode.sleep_message_display_ms, TimerTask::SleepHide);
        self.owners.sleep_hide = Some(hide);
        self.arm_sleep_cycle();

        let mut next = self.draft();
        next.mode.floating_message = Some(message.clone());
        next.mode.show_floating_message = true;
        self.publish(next, Event::FloatingMessageShown { message });
    }

    pub(super) fn on_sleep_hide(&mut self) {
        if !self.state.mode.show_floating_message {
            return;
        }
        let mut next = self.draft();
        next.mode.show_floating_message = false;
        self.publish(next, Event::FloatingMessageHidden);
    }

    /// Post a user message and schedule the assistant's reply.
    pub fn send_message(&mut self, text: &str) -> Result<String> {
        if !self.mode_effects().is_input_enabled {
            return Err(ValidationError::InputDisabled.into());
        }
        validate_message(text)?;

        let message = ChatMessage::new(Role::User, text.trim(), self.state.mode.mode);
        let id = message.id.clone();

        self.arm_reply(&id);

        let mut next = self.draft();
        next.messages.push(message);
        self.publish(next, Event::MessageSent { message_id: id.clone() });
        Ok(id)
    }

    pub(super) fn arm_reply(&mut self, message_id: &str) {
        let handle = self.timers.schedule(
            self.config.chat.reply_delay_ms,
            TimerTask::AssistantReply {
                in_reply_to: message_id.to_string(),
            },
        );
        self.owners.replies.insert(message_id.to_string(), handle);
    }

    pub(super) fn on_assistant_reply(&mut self, in_reply_to: &str) {
        let Some(question) = self.state.messages.iter().find(|m| m.id == in_reply_to) else {
            debug!(in_reply_to, "reply target gone");
            return;
        };
        let mode = self.state.mode.mode;
        let reply = ChatMessage::new(Role::Assistant, canned_reply(mode, &question.text), mode)
            .replying_to(in_reply_to);
        let message_id = reply.id.clone();

        let mut next = self.draft();
        next.messages.push(reply);
        self.publish(
            next,
            Event::ReplyReceived {
                message_id,
                in_reply_to: in_reply_to.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::super::{Collaborators, DomainStore};
    use crate::chat::Role;
    use crate::error::{CoreError, ValidationError};
    use crate::events::Event;
    use crate::mode::{Mode, SLEEP_MESSAGES};
    use crate::storage::Config;

    const INTERVAL: u64 = 15_000;
    const DISPLAY: u64 = 5_000;
    const REPLY: u64 = 1_200;

    fn store() -> DomainStore {
        let mut config = Config::default();
        config.mode.rng_seed = Some(7);
        DomainStore::new(config, Collaborators::in_memory())
    }

    fn count_shown(store: &mut DomainStore) -> Rc<RefCell<usize>> {
        let shown = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&shown);
        store.subscribe(move |event, _| {
            if matches!(event, Event::FloatingMessageShown { .. }) {
                *counter.borrow_mut() += 1;
            }
        });
        shown
    }

    #[test]
    fn sleep_cycle_shows_then_hides() {
        let mut store = store();
        store.set_mode(Mode::Sleep);
        assert!(!store.mode_effects().is_input_enabled);
        assert!(!store.mode_effects().show_floating_message);

        store.advance(INTERVAL);
        let effects = store.mode_effects();
        assert!(effects.show_floating_message);
        let message = effects.floating_message.unwrap();
        assert!(SLEEP_MESSAGES.contains(&message.as_str()));

        store.advance(DISPLAY);
        assert!(!store.mode_effects().show_floating_message);

        store.advance(INTERVAL - DISPLAY);
        assert!(store.mode_effects().show_floating_message);
    }

    #[test]
    fn rapid_toggling_keeps_a_single_cycle() {
        let mut store = store();
        let shown = count_shown(&mut store);

        for _ in 0..10 {
            store.set_mode(Mode::Sleep);
            store.advance(1_000);
            store.set_mode(Mode::Normal);
        }
        store.set_mode(Mode::Sleep);
        assert_eq!(store.pending_timers(), 1);

        store.advance(INTERVAL * 4);
        assert_eq!(*shown.borrow(), 4);
        assert!(store.pending_timers() <= 2);
    }

    #[test]
    fn leaving_sleep_stops_the_cycle() {
        let mut store = store();
        let shown = count_shown(&mut store);
        store.set_mode(Mode::Sleep);
        store.advance(INTERVAL);
        assert_eq!(*shown.borrow(), 1);

        store.set_mode(Mode::Focus);
        assert_eq!(store.pending_timers(), 0);
        assert!(!store.mode_effects().show_floating_message);
        assert!(store.mode_effects().is_focus_mode);

        store.advance(INTERVAL * 10);
        assert_eq!(*shown.borrow(), 1);
    }

    #[test]
    fn zero_interval_still_advances() {
        let mut config = Config::default();
        config.mode.sleep_message_interval_ms = 0;
        config.mode.sleep_message_display_ms = 0;
        let mut store = DomainStore::new(config, Collaborators::in_memory());
        let shown = count_shown(&mut store);

        store.set_mode(Mode::Sleep);
        store.advance(10);
        assert_eq!(*shown.borrow(), 10);
        assert_eq!(store.now_ms(), 10);
    }

    #[test]
    fn same_mode_is_a_no_op() {
        let mut store = store();
        let events = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&events);
        store.subscribe(move |_, _| *counter.borrow_mut() += 1);

        assert!(!store.set_mode(Mode::Normal));
        assert!(store.set_mode(Mode::Sleep));
        assert!(!store.set_mode(Mode::Sleep));
        assert_eq!(*events.borrow(), 1);
        assert_eq!(store.pending_timers(), 1);
    }

    #[test]
    fn reply_depends_on_mode() {
        let mut store = store();
        store.set_mode(Mode::Focus);
        let id = store.send_message("  spaced repetition  ").unwrap();
        assert_eq!(store.state().messages.len(), 1);
        assert_eq!(store.state().messages[0].text, "spaced repetition");

        store.advance(REPLY);
        let messages = &store.state().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].mode, Mode::Focus);
        assert!(messages[1].text.contains("spaced repetition"));
        assert_ne!(messages[1].id, id);
        assert_eq!(messages[1].in_reply_to.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn sleep_disables_input_and_cancels_replies() {
        let mut store = store();
        store.send_message("hello").unwrap();
        store.set_mode(Mode::Sleep);

        assert!(matches!(
            store.send_message("still there?"),
            Err(CoreError::Validation(ValidationError::InputDisabled))
        ));
        store.advance(REPLY * 10);
        assert_eq!(store.state().messages.len(), 1);
    }

    #[test]
    fn switching_between_awake_modes_keeps_replies() {
        let mut store = store();
        store.send_message("hello").unwrap();
        store.set_mode(Mode::Productivity);
        store.advance(REPLY);
        assert_eq!(store.state().messages.len(), 2);
    }

    #[test]
    fn blank_messages_are_rejected() {
        let mut store = store();
        assert!(store.send_message("   ").is_err());
        assert!(store.state().messages.is_empty());
        assert_eq!(store.pending_timers(), 0);
    }
}
