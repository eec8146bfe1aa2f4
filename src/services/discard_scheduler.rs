//! Discard Scheduler.
//!
//! Per-tab state machine deciding when a background tab's surface is torn
//! down to save memory:
//!
//! ```text
//! NoTimer ──arm──▶ Armed ──deadline──▶ MediaCheck ──media──▶ Armed (short delay)
//!                                           └──no media / no answer──▶ Discarded (entry removed)
//! ```
//!
//! A media check that gets no answer within the media recheck delay (the page
//! navigated while the script ran, say) counts as "no media".
//!
//! Timers are plain deadlines; the host asks [`DiscardScheduler::next_deadline`]
//! and calls [`DiscardScheduler::take_due`] when it passes. Removing an entry is
//! the cancellation, so a cleared timer can never fire.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::types::settings::DiscardSettings;
use crate::types::surface::ScriptRequest;

pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_MEDIA_RECHECK_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscardPolicy {
    /// Inactivity before the first media check.
    pub idle_delay: Duration,
    /// Delay before re-checking a tab that was playing media.
    pub media_recheck_delay: Duration,
}

impl Default for DiscardPolicy {
    fn default() -> Self {
        Self {
            idle_delay: DEFAULT_IDLE_DELAY,
            media_recheck_delay: DEFAULT_MEDIA_RECHECK_DELAY,
        }
    }
}

impl From<&DiscardSettings> for DiscardPolicy {
    fn from(settings: &DiscardSettings) -> Self {
        Self {
            idle_delay: Duration::from_secs(settings.idle_timeout_secs),
            media_recheck_delay: Duration::from_secs(settings.media_recheck_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardPhase {
    /// Waiting for `deadline`. `recheck` marks a short media re-arm.
    Armed { deadline: Instant, recheck: bool },
    /// Deadline passed; waiting for the media check. `request` is `None`
    /// until the check script has been injected. The check is given up at
    /// `deadline`.
    MediaCheck {
        request: Option<ScriptRequest>,
        deadline: Instant,
    },
}

/// Result of feeding a media check answer back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCheckOutcome {
    /// Media is playing; the tab was re-armed with the short delay.
    Rearmed,
    /// Nothing is playing; the caller must discard the surface.
    Discard,
    /// The answer does not belong to a pending check and was ignored.
    Stale,
}

#[derive(Debug, Default)]
pub struct DiscardScheduler {
    policy: DiscardPolicy,
    timers: HashMap<String, DiscardPhase>,
}

impl DiscardScheduler {
    pub fn new(policy: DiscardPolicy) -> Self {
        Self {
            policy,
            timers: HashMap::new(),
        }
    }

    pub fn policy(&self) -> DiscardPolicy {
        self.policy
    }

    /// Arms the idle timer unless the tab already has any discard state.
    pub fn arm(&mut self, tab_id: &str, now: Instant) -> bool {
        if self.timers.contains_key(tab_id) {
            return false;
        }
        let deadline = now + self.policy.idle_delay;
        self.timers.insert(
            tab_id.to_string(),
            DiscardPhase::Armed {
                deadline,
                recheck: false,
            },
        );
        debug!(tab_id, "Discard timer armed");
        true
    }

    /// Cancels whatever state `tab_id` is in.
    pub fn clear(&mut self, tab_id: &str) -> bool {
        let cleared = self.timers.remove(tab_id).is_some();
        if cleared {
            debug!(tab_id, "Discard timer cleared");
        }
        cleared
    }

    pub fn clear_all(&mut self) {
        self.timers.clear();
    }

    /// Drops timers for the active tab and for tabs without a surface, then
    /// arms every other surface-backed tab that has none.
    pub fn refresh(&mut self, surface_tabs: &HashSet<String>, active: Option<&str>, now: Instant) {
        self.timers
            .retain(|tab_id, _| surface_tabs.contains(tab_id) && active != Some(tab_id.as_str()));
        for tab_id in surface_tabs {
            if active != Some(tab_id.as_str()) {
                self.arm(tab_id, now);
            }
        }
    }

    /// Earliest deadline of an armed timer or a pending media check, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .values()
            .map(|phase| match phase {
                DiscardPhase::Armed { deadline, .. } | DiscardPhase::MediaCheck { deadline, .. } => {
                    *deadline
                }
            })
            .min()
    }

    /// Moves every tab whose deadline has passed into `MediaCheck` and
    /// returns their ids, sorted.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let check_deadline = now + self.policy.media_recheck_delay;
        let mut due: Vec<String> = self
            .timers
            .iter_mut()
            .filter_map(|(tab_id, phase)| match phase {
                DiscardPhase::Armed { deadline, .. } if *deadline <= now => {
                    *phase = DiscardPhase::MediaCheck {
                        request: None,
                        deadline: check_deadline,
                    };
                    Some(tab_id.clone())
                }
                _ => None,
            })
            .collect();
        due.sort();
        due
    }

    /// Removes every media check whose answer is overdue and returns the tab ids,
    /// sorted. The caller treats them as "no media".
    pub fn take_expired_checks(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<String> = self
            .timers
            .iter()
            .filter_map(|(tab_id, phase)| match phase {
                DiscardPhase::MediaCheck { deadline, .. } if *deadline <= now => Some(tab_id.clone()),
                _ => None,
            })
            .collect();
        for tab_id in &expired {
            self.timers.remove(tab_id);
            debug!(tab_id = %tab_id, "Media check got no answer");
        }
        expired.sort();
        expired
    }

    /// Re-arms `tab_id` with the short media recheck delay.
    pub fn rearm_for_media(&mut self, tab_id: &str, now: Instant) {
        let deadline = now + self.policy.media_recheck_delay;
        self.timers.insert(
            tab_id.to_string(),
            DiscardPhase::Armed {
                deadline,
                recheck: true,
            },
        );
        debug!(tab_id, "Media playing, discard postponed");
    }

    /// Records the check script injected for a tab in `MediaCheck`.
    pub fn await_media(&mut self, tab_id: &str, request: ScriptRequest) -> bool {
        match self.timers.get_mut(tab_id) {
            Some(DiscardPhase::MediaCheck { request: slot, .. }) => {
                *slot = Some(request);
                true
            }
            _ => false,
        }
    }

    /// Feeds the media check answer for `request` back in.
    pub fn complete_media_check(
        &mut self,
        tab_id: &str,
        request: ScriptRequest,
        keep: bool,
        now: Instant,
    ) -> MediaCheckOutcome {
        match self.timers.get(tab_id) {
            Some(DiscardPhase::MediaCheck {
                request: Some(pending),
                ..
            }) if *pending == request => {}
            _ => return MediaCheckOutcome::Stale,
        }

        if keep {
            self.rearm_for_media(tab_id, now);
            MediaCheckOutcome::Rearmed
        } else {
            self.timers.remove(tab_id);
            MediaCheckOutcome::Discard
        }
    }

    /// Finds the tab waiting on `request`.
    pub fn tab_for_request(&self, request: ScriptRequest) -> Option<&str> {
        self.timers.iter().find_map(|(tab_id, phase)| match phase {
            DiscardPhase::MediaCheck {
                request: Some(pending),
                ..
            } if *pending == request => Some(tab_id.as_str()),
            _ => None,
        })
    }

    pub fn phase(&self, tab_id: &str) -> Option<DiscardPhase> {
        self.timers.get(tab_id).copied()
    }

    pub fn has_timer(&self, tab_id: &str) -> bool {
        self.timers.contains_key(tab_id)
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn tab_ids(&self) -> Vec<String> {
        self.timers.keys().cloned().collect()
    }
}
