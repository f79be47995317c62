use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("work calendar requires at least one working day")]
    NoWorkingDays,
    #[error("working day {days} after {from} is beyond the supported date range")]
    OutOfRange { from: NaiveDate, days: i64 },
}

/// Working days and holidays used to project analysis offsets (working days
/// from project start) onto calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WorkCalendarConfig", into = "WorkCalendarConfig")]
pub struct WorkCalendar {
    working_days: [bool; 7],
    /// US federal holidays of every year, computed on demand.
    us_holidays: bool,
    holidays: BTreeSet<NaiveDate>,
}

/// Serialized form of [`WorkCalendar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    pub working_days: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub us_holidays: bool,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::us_federal()
    }
}

impl WorkCalendar {
    /// Monday to Friday, closed on US federal holidays of any year.
    pub fn us_federal() -> Self {
        Self {
            working_days: [true, true, true, true, true, false, false],
            us_holidays: true,
            holidays: BTreeSet::new(),
        }
    }

    /// Every day is a working day. Offsets then map one-to-one onto dates.
    pub fn continuous() -> Self {
        Self {
            working_days: [true; 7],
            us_holidays: false,
            holidays: BTreeSet::new(),
        }
    }

    pub fn custom<I, J>(working_days: I, holidays: J) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut days = [false; 7];
        for day in working_days {
            days[day.num_days_from_monday() as usize] = true;
        }
        if !days.contains(&true) {
            return Err(CalendarError::NoWorkingDays);
        }
        Ok(Self {
            working_days: days,
            us_holidays: false,
            holidays: holidays.into_iter().collect(),
        })
    }

    pub fn with_us_holidays(mut self, enabled: bool) -> Self {
        self.us_holidays = enabled;
        self
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Explicit holidays; US federal holidays are not listed.
    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }

    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.is_working_weekday(date) && !self.is_holiday(date)
    }

    fn is_working_weekday(&self, date: NaiveDate) -> bool {
        self.working_days[date.weekday().num_days_from_monday() as usize]
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date) || (self.us_holidays && us_holidays(date.year()).contains(&date))
    }

    fn working_days_per_week(&self) -> i64 {
        self.working_days.iter().filter(|open| **open).count() as i64
    }

    /// First available date on or after `from`.
    pub fn first_available(&self, from: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let mut current = from;
        while !self.is_available(current) {
            current = current
                .succ_opt()
                .ok_or(CalendarError::OutOfRange { from, days: 0 })?;
        }
        Ok(current)
    }

    /// First available date strictly after `from`.
    pub fn next_available(&self, from: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let next = from
            .succ_opt()
            .ok_or(CalendarError::OutOfRange { from, days: 1 })?;
        self.first_available(next)
    }

    /// Date of working day `offset` (fractional part dropped) counted from
    /// the first available day on or after `start`.
    pub fn offset_to_date(&self, start: NaiveDate, offset_days: f64) -> Result<NaiveDate, CalendarError> {
        let whole = offset_days.max(0.0).floor();
        let horizon = NaiveDate::MAX.signed_duration_since(start).num_days();
        if whole > horizon as f64 {
            return Err(CalendarError::OutOfRange {
                from: start,
                days: whole as i64,
            });
        }

        let mut remaining = whole as i64;
        let mut current = self.first_available(start)?;
        let per_week = self.working_days_per_week();
        while remaining > 0 {
            let weeks = remaining / per_week;
            if weeks == 0 {
                current = self.next_available(current)?;
                remaining -= 1;
                continue;
            }
            // whole weeks hold `per_week` working days minus the holidays in them
            let out_of_range = CalendarError::OutOfRange {
                from: start,
                days: whole as i64,
            };
            let first = current.succ_opt().ok_or(out_of_range.clone())?;
            let target = current
                .checked_add_signed(Duration::days(weeks * 7))
                .ok_or(out_of_range)?;
            remaining -= weeks * per_week - self.holidays_between(first, target);
            current = target;
        }
        Ok(current)
    }

    /// Working days from `start` up to, not including, `date`. Zero when
    /// `date` is on or before `start`.
    pub fn date_to_offset(&self, start: NaiveDate, date: NaiveDate) -> i64 {
        match date.pred_opt() {
            Some(end) if date > start => self.count_available_days(start, end),
            _ => 0,
        }
    }

    /// Available days in the inclusive range.
    pub fn count_available_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return 0;
        }
        let span = end.signed_duration_since(start).num_days() + 1;
        let first = start.weekday().num_days_from_monday() as i64;
        let tail = (0..span % 7)
            .filter(|i| self.working_days[((first + i) % 7) as usize])
            .count() as i64;
        span / 7 * self.working_days_per_week() + tail - self.holidays_between(start, end)
    }

    /// Holidays in the inclusive range that fall on a working weekday.
    fn holidays_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let explicit = self
            .holidays
            .range(start..=end)
            .filter(|date| self.is_working_weekday(**date))
            .count();
        let federal = if self.us_holidays {
            (start.year()..=end.year())
                .flat_map(us_holidays)
                .filter(|date| {
                    (start..=end).contains(date)
                        && self.is_working_weekday(*date)
                        && !self.holidays.contains(date)
                })
                .count()
        } else {
            0
        };
        (explicit + federal) as i64
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self.clone())
    }
}

/// US federal holidays of `year`, unshifted.
fn us_holidays(year: i32) -> Vec<NaiveDate> {
    let fixed = [(1, 1), (7, 4), (11, 11), (12, 25)];
    let mut dates: Vec<NaiveDate> = fixed
        .iter()
        .filter_map(|&(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .collect();

    // MLK, Presidents', Labor, Columbus, Thanksgiving
    let floating = [
        (1, Weekday::Mon, 3),
        (2, Weekday::Mon, 3),
        (9, Weekday::Mon, 1),
        (10, Weekday::Mon, 2),
        (11, Weekday::Thu, 4),
    ];
    dates.extend(
        floating
            .iter()
            .filter_map(|&(month, weekday, n)| NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)),
    );

    // Memorial Day
    dates.extend(last_weekday(year, 5, Weekday::Mon));
    dates
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    (1..=5)
        .rev()
        .find_map(|n| NaiveDate::from_weekday_of_month_opt(year, month, weekday, n))
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl From<WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: WorkCalendar) -> Self {
        Self {
            working_days: WEEK
                .iter()
                .copied()
                .filter(|day| calendar.working_days[day.num_days_from_monday() as usize])
                .collect(),
            us_holidays: calendar.us_holidays,
            holidays: calendar.holidays.into_iter().collect(),
        }
    }
}

impl TryFrom<WorkCalendarConfig> for WorkCalendar {
    type Error = CalendarError;

    fn try_from(config: WorkCalendarConfig) -> Result<Self, Self::Error> {
        Ok(WorkCalendar::custom(config.working_days, config.holidays)?.with_us_holidays(config.us_holidays))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn us_holidays_are_unavailable() {
        let cal = WorkCalendar::us_federal();
        assert!(!cal.is_available(d(2026, 1, 1)));
        assert!(!cal.is_available(d(2026, 1, 19))); // MLK
        assert!(!cal.is_available(d(2026, 5, 25))); // Memorial Day
        assert!(!cal.is_available(d(2026, 11, 26))); // Thanksgiving
        assert!(cal.is_available(d(2026, 1, 20)));
        assert!(!cal.is_available(d(2026, 1, 10))); // Saturday
    }

    #[test]
    fn us_holidays_cover_distant_years() {
        let cal = WorkCalendar::us_federal();
        assert!(!cal.is_available(d(2031, 12, 25)));
        assert!(!cal.is_available(d(2040, 9, 3))); // Labor Day
        assert!(cal.is_available(d(2040, 9, 4)));
    }

    #[test]
    fn offsets_skip_weekends_and_holidays() {
        let cal = WorkCalendar::us_federal();
        // Fri Jan 16; Mon Jan 19 is MLK day
        let start = d(2026, 1, 16);
        assert_eq!(cal.offset_to_date(start, 0.0).unwrap(), start);
        assert_eq!(cal.offset_to_date(start, 1.0).unwrap(), d(2026, 1, 20));
        assert_eq!(cal.offset_to_date(start, 1.9).unwrap(), d(2026, 1, 20));
        assert_eq!(cal.date_to_offset(start, d(2026, 1, 20)), 1);
        assert_eq!(cal.date_to_offset(start, start), 0);
    }

    #[test]
    fn week_jumps_match_stepping_day_by_day() {
        let mut cal = WorkCalendar::us_federal();
        cal.add_holiday(d(2026, 12, 24));
        cal.add_holiday(d(2026, 12, 25)); // also a federal holiday
        cal.add_holiday(d(2027, 3, 6)); // Saturday
        let start = d(2026, 11, 20);

        let mut stepped = cal.first_available(start).unwrap();
        for offset in 0..700 {
            assert_eq!(cal.offset_to_date(start, offset as f64).unwrap(), stepped, "offset {offset}");
            assert_eq!(cal.date_to_offset(start, stepped), offset);
            stepped = cal.next_available(stepped).unwrap();
        }
    }

    #[test]
    fn offsets_past_the_last_date_are_errors() {
        let cal = WorkCalendar::continuous();
        let start = d(2026, 1, 5);
        assert!(matches!(
            cal.offset_to_date(start, 2.0e8),
            Err(CalendarError::OutOfRange { days: 200_000_000, .. })
        ));
        assert!(cal.offset_to_date(start, f64::INFINITY).is_err());
        assert!(cal.next_available(NaiveDate::MAX).is_err());
        assert_eq!(cal.offset_to_date(start, f64::NAN).unwrap(), start);

        let far = WorkCalendar::us_federal().offset_to_date(start, 1.0e7).unwrap();
        assert!(far.year() > 40_000);
    }

    #[test]
    fn custom_calendar_requires_a_working_day() {
        assert_eq!(
            WorkCalendar::custom(Vec::<Weekday>::new(), Vec::new()),
            Err(CalendarError::NoWorkingDays)
        );
        let six_day = WorkCalendar::custom(WEEK[..6].iter().copied(), [d(2026, 2, 14)]).unwrap();
        assert!(six_day.is_available(d(2026, 2, 7)));
        assert!(!six_day.is_available(d(2026, 2, 14)));
        assert!(six_day.is_available(d(2026, 1, 1)));
    }

    #[test]
    fn serializes_through_config() {
        let cal = WorkCalendar::custom([Weekday::Mon, Weekday::Wed], [d(2026, 3, 2)]).unwrap();
        let json = serde_json::to_string(&cal).unwrap();
        assert!(!json.contains("us_holidays"));
        let back: WorkCalendar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cal);
        assert!(serde_json::from_str::<WorkCalendar>(r#"{"working_days": []}"#).is_err());

        let json = serde_json::to_string(&WorkCalendar::us_federal()).unwrap();
        assert!(json.contains(r#""us_holidays":true"#));
        let federal: WorkCalendar = serde_json::from_str(&json).unwrap();
        assert_eq!(federal, WorkCalendar::us_federal());
    }
}
