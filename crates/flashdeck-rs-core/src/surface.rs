//! Caller-side state of the integration form: open/closed, in-flight
//! ticket, and a transient notice.

use crate::error::FlashdeckError;
use flashdeck_rs_config::SurfaceConfig;
use flashdeck_rs_protocol::Card;
use log::debug;
use std::time::{Duration, Instant};

/// Identifies one integration attempt started from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Message shown until it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    expires_at: Instant,
}

/// What `finish` did with a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The result belonged to the current attempt and updated the surface.
    Applied,
    /// The surface was dismissed or a newer attempt started.
    Discarded,
}

#[derive(Debug)]
pub struct IntegrationSurface {
    open: bool,
    next_ticket: u64,
    pending: Option<IntegrationTicket>,
    notice: Option<Notice>,
    success_ttl: Duration,
    error_ttl: Duration,
}

impl IntegrationSurface {
    pub fn new(success_ttl: Duration, error_ttl: Duration) -> Self {
        Self {
            open: false,
            next_ticket: 0,
            pending: None,
            notice: None,
            success_ttl,
            error_ttl,
        }
    }

    pub fn from_config(config: &SurfaceConfig) -> Self {
        Self::new(config.success_notice(), config.error_notice())
    }

    pub fn open(&mut self) {
        self.open = true;
        self.notice = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Start an attempt. Any earlier pending attempt becomes stale.
    pub fn begin(&mut self) -> IntegrationTicket {
        self.open = true;
        self.next_ticket += 1;
        let ticket = IntegrationTicket(self.next_ticket);
        self.pending = Some(ticket);
        self.notice = None;
        ticket
    }

    /// Record the result of an attempt.
    ///
    /// Success shows a short notice and closes the surface once it expires.
    /// Failure shows a longer notice and keeps the surface open for a retry.
    pub fn finish(
        &mut self,
        ticket: IntegrationTicket,
        result: &Result<Card, FlashdeckError>,
        now: Instant,
    ) -> Outcome {
        if !self.open || self.pending != Some(ticket) {
            debug!("discarding stale integration result (ticket={})", ticket.0);
            return Outcome::Discarded;
        }
        self.pending = None;
        self.notice = Some(match result {
            Ok(_) => Notice {
                kind: NoticeKind::Success,
                text: "Card updated".to_string(),
                expires_at: now + self.success_ttl,
            },
            Err(err) => Notice {
                kind: NoticeKind::Error,
                text: err.to_string(),
                expires_at: now + self.error_ttl,
            },
        });
        Outcome::Applied
    }

    /// Close the surface. In-flight results arriving later are discarded.
    pub fn dismiss(&mut self) {
        self.open = false;
        self.pending = None;
        self.notice = None;
    }

    /// Expire notices; an expired success notice also closes the surface.
    pub fn tick(&mut self, now: Instant) {
        let Some(notice) = &self.notice else {
            return;
        };
        if now < notice.expires_at {
            return;
        }
        if notice.kind == NoticeKind::Success {
            self.open = false;
        }
        self.notice = None;
    }

    /// Current notice after expiring anything stale.
    pub fn notice(&mut self, now: Instant) -> Option<&Notice> {
        self.tick(now);
        self.notice.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{IntegrationSurface, NoticeKind, Outcome};
    use crate::error::FlashdeckError;
    use flashdeck_rs_protocol::Card;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    fn surface() -> IntegrationSurface {
        IntegrationSurface::new(Duration::from_millis(1500), Duration::from_millis(3000))
    }

    #[test]
    fn success_notice_closes_after_expiry() {
        let mut surface = surface();
        surface.open();
        let ticket = surface.begin();
        let now = Instant::now();
        assert_eq!(surface.finish(ticket, &Ok(Card::new("a", "b")), now), Outcome::Applied);
        assert_eq!(
            surface.notice(now).map(|notice| notice.kind),
            Some(NoticeKind::Success)
        );
        assert!(surface.is_open());

        assert!(surface.notice(now + Duration::from_millis(1500)).is_none());
        assert!(!surface.is_open());
    }

    #[test]
    fn error_notice_keeps_form_open() {
        let mut surface = surface();
        let ticket = surface.begin();
        let now = Instant::now();
        let result = Err(FlashdeckError::Network("offline".to_string()));
        surface.finish(ticket, &result, now);

        assert!(surface.notice(now + Duration::from_millis(2999)).is_some());
        assert!(surface.notice(now + Duration::from_millis(3000)).is_none());
        assert!(surface.is_open());
        assert!(!surface.is_busy());
    }

    #[test]
    fn late_results_are_discarded() {
        let mut surface = surface();
        let first = surface.begin();
        let second = surface.begin();
        let now = Instant::now();
        assert_eq!(
            surface.finish(first, &Ok(Card::new("a", "b")), now),
            Outcome::Discarded
        );

        surface.dismiss();
        assert_eq!(
            surface.finish(second, &Ok(Card::new("a", "b")), now),
            Outcome::Discarded
        );
        assert!(surface.notice(now).is_none());
    }
}
