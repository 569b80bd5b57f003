//! # Moderation & Visibility Engine
//!
//! Decides whether content is publicly visible and whether a topic is open
//! for replies. Every public listing, both feeds and the reply gate go
//! through [`Visibility`]; storage receives the same [`StateFilter`] that
//! [`Visibility::is_published`] evaluates in memory.

use std::fmt;

use crate::models::{Stateful, Topic};
use crate::state::{ContentState, StateConfig};

/// Which states a query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    /// No restriction (administrative views)
    Any,
    /// Exactly this state
    Only(ContentState),
}

impl StateFilter {
    pub fn matches(&self, state: &ContentState) -> bool {
        match self {
            StateFilter::Any => true,
            StateFilter::Only(wanted) => wanted == state,
        }
    }
}

/// Why a topic refuses new posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Locked,
    NotPublished,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Locked => "locked",
            DenyReason::NotPublished => "not published",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the reply gate. A denial is a normal answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostGate {
    Allow,
    Denied(DenyReason),
}

impl PostGate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PostGate::Allow)
    }
}

#[derive(Debug, Clone)]
pub struct Visibility {
    states: StateConfig,
}

impl Visibility {
    pub fn new(states: StateConfig) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &StateConfig {
        &self.states
    }

    /// The filter applied to every public listing and feed.
    pub fn public_filter(&self) -> StateFilter {
        StateFilter::Only(self.states.published().clone())
    }

    pub fn is_published<T: Stateful + ?Sized>(&self, item: &T) -> bool {
        self.public_filter().matches(item.state())
    }

    /// First matching rule wins: locked, then unpublished.
    pub fn can_accept_new_post(&self, topic: &Topic) -> PostGate {
        if topic.locked {
            return PostGate::Denied(DenyReason::Locked);
        }
        if !self.is_published(topic) {
            return PostGate::Denied(DenyReason::NotPublished);
        }
        PostGate::Allow
    }

    /// State given to newly created topics and posts.
    pub fn initial_state(&self) -> ContentState {
        self.states.default_state().clone()
    }
}
