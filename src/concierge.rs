//! Mock concierge for the conversations page
//!
//! Replies come from keyword templates after a fake delay. Only one reply is
//! ever in flight: asking again, or leaving the page, cancels the pending one
//! so replies can never land out of order.

use std::time::{Duration, Instant};

use crate::config::ConciergeConfig;
use crate::tour::timer::{TimerId, TimerQueue};

/// Condition name the conversations page reports when the concierge answered
/// the latest question on its own
pub const AUTO_ANSWERED: &str = "conversation-auto-answered";

const TEMPLATES: &[(&[&str], &str)] = &[
    (
        &["park", "parking"],
        "There is free parking behind the venue. Follow the signs from the main gate.",
    ),
    (
        &["dress", "attire", "wear"],
        "The dress code is cocktail attire. Comfortable shoes recommended for the lawn.",
    ),
    (
        &["rsvp", "reply", "attend"],
        "You can RSVP by replying YES or NO to this number, or on the wedding website.",
    ),
    (
        &["hotel", "stay", "room"],
        "A room block is held at the Harbor Inn until a month before the wedding.",
    ),
    (
        &["time", "when", "start"],
        "The ceremony starts at 4pm. Please arrive 20 minutes early.",
    ),
];

const ESCALATED: &str = "Good question! I've passed it on to the couple and they'll get back to you.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Guest,
    Concierge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
    /// Concierge lines only: answered from a template rather than escalated
    pub automatic: bool,
}

#[derive(Debug)]
struct PendingReply {
    text: String,
    automatic: bool,
}

#[derive(Debug)]
pub struct MockConcierge {
    delay: Duration,
    timers: TimerQueue<PendingReply>,
    pending: Option<TimerId>,
    transcript: Vec<ChatLine>,
}

/// Template reply for `question`, or `None` when it needs a human
pub fn template_reply(question: &str) -> Option<&'static str> {
    let lower = question.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    TEMPLATES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| words.contains(k)))
        .map(|(_, reply)| *reply)
}

impl MockConcierge {
    pub fn new(config: &ConciergeConfig) -> Self {
        Self {
            delay: config.reply_delay(),
            timers: TimerQueue::new(),
            pending: None,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    pub fn is_typing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Post a guest question. Supersedes any reply still pending.
    pub fn ask(&mut self, question: &str, now: Instant) {
        if self.cancel() {
            tracing::debug!("superseded pending concierge reply");
        }
        self.transcript.push(ChatLine {
            speaker: Speaker::Guest,
            text: question.to_string(),
            automatic: false,
        });
        let reply = match template_reply(question) {
            Some(text) => PendingReply {
                text: text.to_string(),
                automatic: true,
            },
            None => PendingReply {
                text: ESCALATED.to_string(),
                automatic: false,
            },
        };
        self.pending = Some(self.timers.schedule(now, self.delay, reply));
    }

    /// Deliver the pending reply if its delay has passed.
    /// Returns true if the transcript changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = self.timers.drain_due(now);
        if due.is_empty() {
            return false;
        }
        self.pending = None;
        for reply in due {
            self.transcript.push(ChatLine {
                speaker: Speaker::Concierge,
                text: reply.text,
                automatic: reply.automatic,
            });
        }
        true
    }

    /// Drop the pending reply (page left). Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(id) => self.timers.cancel(id),
            None => false,
        }
    }

    /// Whether the latest guest question has an automatic answer
    pub fn auto_answered(&self) -> bool {
        matches!(
            self.transcript.last(),
            Some(ChatLine {
                speaker: Speaker::Concierge,
                automatic: true,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concierge() -> MockConcierge {
        MockConcierge::new(&ConciergeConfig { reply_delay_ms: 500 })
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_template_matching() {
        assert!(template_reply("Where do we PARK?").unwrap().contains("parking"));
        assert!(template_reply("what should I wear").unwrap().contains("cocktail"));
        assert_eq!(template_reply("can I bring my dog"), None);
        // Whole words only
        assert_eq!(template_reply("sparkling wine?"), None);
    }

    #[test]
    fn test_reply_arrives_after_delay() {
        let t0 = Instant::now();
        let mut c = concierge();
        c.ask("Is there parking?", t0);
        assert!(c.is_typing());
        assert!(!c.tick(t0 + ms(499)));
        assert!(c.tick(t0 + ms(500)));
        assert!(!c.is_typing());
        assert_eq!(c.transcript().len(), 2);
        assert!(c.auto_answered());
    }

    #[test]
    fn test_new_question_supersedes_pending_reply() {
        let t0 = Instant::now();
        let mut c = concierge();
        c.ask("Is there parking?", t0);
        c.ask("Can I bring my dog?", t0 + ms(300));
        c.tick(t0 + ms(2000));

        let speakers: Vec<Speaker> = c.transcript().iter().map(|l| l.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::Guest, Speaker::Guest, Speaker::Concierge]
        );
        assert_eq!(c.transcript()[2].text, ESCALATED);
        assert!(!c.auto_answered());
    }

    #[test]
    fn test_cancel_on_navigation() {
        let t0 = Instant::now();
        let mut c = concierge();
        c.ask("when does it start", t0);
        assert!(c.cancel());
        assert!(!c.cancel());
        assert!(!c.tick(t0 + ms(1000)));
        assert_eq!(c.transcript().len(), 1);
        assert_eq!(c.next_deadline(), None);
    }
}
