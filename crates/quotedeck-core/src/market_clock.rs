//! Trading-hours gate for the reference equity exchange.
//!
//! The gate uses a fixed UTC offset; daylight-saving transitions are not
//! handled, a documented limitation carried over from the source system.
//! Crypto markets trade around the clock and never consult this gate.

use time::{UtcOffset, Weekday};

use crate::domain::UtcDateTime;
use crate::ValidationError;

/// Fixed weekly trading calendar for the reference exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketCalendar {
    offset: UtcOffset,
    open_minute: u16,
    close_minute: u16,
    weekdays_only: bool,
}

impl Default for MarketCalendar {
    /// Reference market: UTC+8, Monday to Friday, 09:30 to 16:00 local.
    fn default() -> Self {
        Self {
            offset: UtcOffset::from_hms(8, 0, 0).expect("static offset is in range"),
            open_minute: 9 * 60 + 30,
            close_minute: 16 * 60,
            weekdays_only: true,
        }
    }
}

impl MarketCalendar {
    pub fn with_fixed_offset(hours: i8) -> Result<Self, ValidationError> {
        let offset = UtcOffset::from_hms(hours, 0, 0)
            .map_err(|_| ValidationError::OffsetOutOfRange { hours })?;
        Ok(Self {
            offset,
            ..Self::default()
        })
    }

    /// Calendar for venues that never close.
    pub fn always_open() -> Self {
        Self {
            open_minute: 0,
            close_minute: 24 * 60,
            weekdays_only: false,
            ..Self::default()
        }
    }

    /// Calendar with an empty session window.
    pub fn always_closed() -> Self {
        Self {
            open_minute: 0,
            close_minute: 0,
            ..Self::default()
        }
    }

    /// Whether the reference market is open at `now`. Pure and total:
    /// the same instant always produces the same answer.
    pub fn is_open(&self, now: UtcDateTime) -> bool {
        let local = now.to_local(self.offset);

        let weekend = matches!(local.weekday(), Weekday::Saturday | Weekday::Sunday);
        if self.weekdays_only && weekend {
            return false;
        }

        let minute_of_day = u16::from(local.hour()) * 60 + u16::from(local.minute());
        minute_of_day >= self.open_minute && minute_of_day < self.close_minute
    }
}
