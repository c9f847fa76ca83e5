//! Which channels one request attempts.
//!
//! | channel  | requested | prior (WhatsApp) outcome | attempt |
//! |----------|-----------|--------------------------|---------|
//! | WhatsApp | yes       | n/a                      | yes     |
//! | SMS      | yes       | not requested            | yes     |
//! | SMS      | yes       | skipped                  | yes     |
//! | SMS      | yes       | failed                   | yes     |
//! | SMS      | yes       | succeeded                | no      |
//! | Email    | yes       | any                      | yes     |
//! | any      | no        | any                      | no      |

use crate::channel::Channel;

/// What happened to the WhatsApp leg before SMS is considered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PriorOutcome {
    NotRequested,
    /// Requested but its template could not be prepared.
    Skipped,
    Failed,
    Succeeded,
}

#[must_use]
pub const fn should_attempt(channel: Channel, requested: bool, whatsapp: PriorOutcome) -> bool {
    if !requested {
        return false;
    }
    match channel {
        Channel::WhatsApp | Channel::Email => true,
        Channel::Sms => !matches!(whatsapp, PriorOutcome::Succeeded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTCOMES: [PriorOutcome; 4] = [
        PriorOutcome::NotRequested,
        PriorOutcome::Skipped,
        PriorOutcome::Failed,
        PriorOutcome::Succeeded,
    ];

    #[test]
    fn test_sms_is_suppressed_only_by_whatsapp_success() {
        assert!(should_attempt(Channel::Sms, true, PriorOutcome::NotRequested));
        assert!(should_attempt(Channel::Sms, true, PriorOutcome::Skipped));
        assert!(should_attempt(Channel::Sms, true, PriorOutcome::Failed));
        assert!(!should_attempt(Channel::Sms, true, PriorOutcome::Succeeded));
    }

    #[test]
    fn test_unrequested_channels_are_never_attempted() {
        for channel in Channel::DISPATCH_ORDER {
            for outcome in OUTCOMES {
                assert!(!should_attempt(channel, false, outcome));
            }
        }
    }

    #[test]
    fn test_email_and_whatsapp_ignore_prior_outcome() {
        for outcome in OUTCOMES {
            assert!(should_attempt(Channel::Email, true, outcome));
            assert!(should_attempt(Channel::WhatsApp, true, outcome));
        }
    }
}
