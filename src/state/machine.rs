//! Lifecycle transitions.
//!
//! `transition` is pure: it maps the current status and an incoming event to
//! the next status plus the effects the bus has to run. Events a status does
//! not accept return `None` and leave the bus untouched.

use crate::error::BusFault;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusStatus {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Backgrounded,
    Suspended,
    Error,
}

impl BusStatus {
    /// Statuses in which the poller is allowed to run.
    pub fn is_polling(self) -> bool {
        matches!(self, BusStatus::Ready | BusStatus::Backgrounded)
    }

    /// Statuses that count as connected for late `on_connect` registrations.
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            BusStatus::Ready | BusStatus::Backgrounded | BusStatus::Suspended
        )
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BusStatus::Uninitialized => "uninitialized",
            BusStatus::Initializing => "initializing",
            BusStatus::Ready => "ready",
            BusStatus::Backgrounded => "backgrounded",
            BusStatus::Suspended => "suspended",
            BusStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Events accepted by the bus.
#[derive(Clone, Debug)]
pub enum BusEvent {
    Init,
    Ready,
    Background,
    Suspend,
    Resume,
    /// Enter the error state. `None` is reported as an unknown fault.
    Error(Option<BusFault>),
}

impl BusEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::Init => "init",
            BusEvent::Ready => "ready",
            BusEvent::Background => "background",
            BusEvent::Suspend => "suspend",
            BusEvent::Resume => "resume",
            BusEvent::Error(_) => "error",
        }
    }
}

/// Side effect requested by a transition, applied in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Store the event's fault payload.
    RecordFault,
    /// Drop the stored fault and the cursor.
    ClearSession,
    /// Spawn the async setup that seeds the cursor.
    BeginSetup,
    ResetPoll,
    StopPoll,
    EmitConnect,
    EmitError,
}

/// Outcome of an accepted event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: BusStatus,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: BusStatus, effects: &[Effect]) -> Option<Self> {
        Some(Self {
            next,
            effects: effects.to_vec(),
        })
    }
}

/// Compute the transition for `event` in `status`.
pub fn transition(status: BusStatus, event: &BusEvent) -> Option<Transition> {
    use BusEvent as E;
    use BusStatus as S;
    use Effect::*;

    match (status, event) {
        (S::Uninitialized, E::Init) => Transition::to(S::Initializing, &[BeginSetup]),

        (S::Initializing, E::Ready) => Transition::to(S::Ready, &[ResetPoll, EmitConnect]),
        (S::Initializing, E::Background) => {
            Transition::to(S::Backgrounded, &[ResetPoll, EmitConnect])
        }
        (S::Initializing, E::Suspend) => Transition::to(S::Suspended, &[]),
        (S::Initializing, E::Error(_)) => Transition::to(S::Error, &[RecordFault, EmitError]),

        (S::Ready, E::Background) => Transition::to(S::Backgrounded, &[ResetPoll]),
        (S::Ready, E::Suspend) => Transition::to(S::Suspended, &[StopPoll]),
        (S::Ready, E::Error(_)) => Transition::to(S::Error, &[RecordFault, StopPoll, EmitError]),

        (S::Backgrounded, E::Resume) => Transition::to(S::Ready, &[ResetPoll]),
        (S::Backgrounded, E::Suspend) => Transition::to(S::Suspended, &[StopPoll]),
        (S::Backgrounded, E::Error(_)) => {
            Transition::to(S::Error, &[RecordFault, StopPoll, EmitError])
        }

        (S::Suspended, E::Resume) => Transition::to(S::Ready, &[ResetPoll]),
        (S::Suspended, E::Background) => Transition::to(S::Backgrounded, &[ResetPoll]),
        (S::Suspended, E::Error(_)) => {
            Transition::to(S::Error, &[RecordFault, StopPoll, EmitError])
        }

        (S::Error, E::Resume | E::Init) => {
            Transition::to(S::Initializing, &[ClearSession, BeginSetup, EmitConnect])
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [BusStatus; 6] = [
        BusStatus::Uninitialized,
        BusStatus::Initializing,
        BusStatus::Ready,
        BusStatus::Backgrounded,
        BusStatus::Suspended,
        BusStatus::Error,
    ];

    fn all_events() -> Vec<BusEvent> {
        vec![
            BusEvent::Init,
            BusEvent::Ready,
            BusEvent::Background,
            BusEvent::Suspend,
            BusEvent::Resume,
            BusEvent::Error(None),
        ]
    }

    fn next(status: BusStatus, event: BusEvent) -> Option<BusStatus> {
        transition(status, &event).map(|t| t.next)
    }

    #[test]
    fn test_full_table() {
        use BusStatus::*;

        let expected: &[(BusStatus, &str, Option<BusStatus>)] = &[
            (Uninitialized, "init", Some(Initializing)),
            (Initializing, "ready", Some(Ready)),
            (Initializing, "background", Some(Backgrounded)),
            (Initializing, "suspend", Some(Suspended)),
            (Initializing, "error", Some(Error)),
            (Ready, "background", Some(Backgrounded)),
            (Ready, "suspend", Some(Suspended)),
            (Ready, "error", Some(Error)),
            (Backgrounded, "resume", Some(Ready)),
            (Backgrounded, "suspend", Some(Suspended)),
            (Backgrounded, "error", Some(Error)),
            (Suspended, "resume", Some(Ready)),
            (Suspended, "background", Some(Backgrounded)),
            (Suspended, "error", Some(Error)),
            (Error, "resume", Some(Initializing)),
            (Error, "init", Some(Initializing)),
        ];

        for status in ALL_STATUSES {
            for event in all_events() {
                let want = expected
                    .iter()
                    .find(|(s, e, _)| *s == status && *e == event.name())
                    .and_then(|(_, _, next)| *next);
                assert_eq!(
                    next(status, event.clone()),
                    want,
                    "{} + {}",
                    status,
                    event.name()
                );
            }
        }
    }

    #[test]
    fn test_connect_effects() {
        let ready = transition(BusStatus::Initializing, &BusEvent::Ready).unwrap();
        assert_eq!(ready.effects, vec![Effect::ResetPoll, Effect::EmitConnect]);

        // Resuming from suspension does not announce a new connection
        let resumed = transition(BusStatus::Suspended, &BusEvent::Resume).unwrap();
        assert_eq!(resumed.effects, vec![Effect::ResetPoll]);
    }

    #[test]
    fn test_error_recovery_clears_session_first() {
        let t = transition(BusStatus::Error, &BusEvent::Resume).unwrap();
        assert_eq!(t.next, BusStatus::Initializing);
        assert_eq!(
            t.effects,
            vec![Effect::ClearSession, Effect::BeginSetup, Effect::EmitConnect]
        );
    }

    #[test]
    fn test_suspend_while_initializing_never_polls() {
        let t = transition(BusStatus::Initializing, &BusEvent::Suspend).unwrap();
        assert!(t.effects.is_empty());
        assert!(!t.next.is_polling());
    }

    #[test]
    fn test_errors_stop_polling() {
        for status in [BusStatus::Ready, BusStatus::Backgrounded, BusStatus::Suspended] {
            let t = transition(status, &BusEvent::Error(None)).unwrap();
            assert!(t.effects.contains(&Effect::StopPoll));
            assert!(t.effects.contains(&Effect::EmitError));
        }
    }
}
