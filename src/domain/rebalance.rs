//! Rebalance-date scheduling over the trading calendar.

use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalancePeriod {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl FromStr for RebalancePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D" => Ok(RebalancePeriod::Daily),
            "W" => Ok(RebalancePeriod::Weekly),
            "M" => Ok(RebalancePeriod::Monthly),
            "Q" => Ok(RebalancePeriod::Quarterly),
            other => Err(format!("unknown rebalance period '{other}' (use D, W, M or Q)")),
        }
    }
}

/// Select rebalance dates from an ascending list of trading dates.
///
/// Weekly keeps the last trading date of each ISO week, Monthly the last of
/// each month, Quarterly every third month-close (so the first quarterly date
/// falls on the third month-close present in the input).
pub fn rebalance_dates(dates: &[NaiveDate], period: RebalancePeriod) -> Vec<NaiveDate> {
    match period {
        RebalancePeriod::Daily => dates.to_vec(),
        RebalancePeriod::Weekly => period_closes(dates, |d| {
            let week = d.iso_week();
            (week.year(), week.week())
        }),
        RebalancePeriod::Monthly => period_closes(dates, |d| (d.year(), d.month())),
        RebalancePeriod::Quarterly => {
            let closes = period_closes(dates, |d| (d.year(), d.month()));
            closes.into_iter().skip(2).step_by(3).collect()
        }
    }
}

/// Keep each date whose successor belongs to a different bucket.
fn period_closes<K: PartialEq>(dates: &[NaiveDate], bucket: impl Fn(&NaiveDate) -> K) -> Vec<NaiveDate> {
    let mut closes = Vec::new();
    for (i, date) in dates.iter().enumerate() {
        let is_close = match dates.get(i + 1) {
            Some(next) => bucket(date) != bucket(next),
            None => true,
        };
        if is_close {
            closes.push(*date);
        }
    }
    closes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Weekdays from Mon 2016-10-03 through Fri 2016-12-30.
    fn q4_weekdays() -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = d(2016, 10, 3);
        while date <= d(2016, 12, 30) {
            if date.weekday().number_from_monday() <= 5 {
                dates.push(date);
            }
            date = date.succ_opt().unwrap();
        }
        dates
    }

    #[test]
    fn parse_periods() {
        assert_eq!("D".parse::<RebalancePeriod>().unwrap(), RebalancePeriod::Daily);
        assert_eq!("w".parse::<RebalancePeriod>().unwrap(), RebalancePeriod::Weekly);
        assert_eq!(" M ".parse::<RebalancePeriod>().unwrap(), RebalancePeriod::Monthly);
        assert_eq!("q".parse::<RebalancePeriod>().unwrap(), RebalancePeriod::Quarterly);
        assert!("X".parse::<RebalancePeriod>().is_err());
    }

    #[test]
    fn daily_keeps_everything() {
        let dates = q4_weekdays();
        assert_eq!(rebalance_dates(&dates, RebalancePeriod::Daily), dates);
    }

    #[test]
    fn weekly_keeps_fridays_of_full_weeks() {
        let dates = q4_weekdays();
        let weekly = rebalance_dates(&dates, RebalancePeriod::Weekly);
        // First week of October 2016: Mon 3rd .. Fri 7th.
        assert_eq!(weekly[0], d(2016, 10, 7));
        assert_eq!(weekly[1], d(2016, 10, 14));
        // The final date always closes its week.
        assert_eq!(*weekly.last().unwrap(), d(2016, 12, 30));
    }

    #[test]
    fn monthly_keeps_month_closes() {
        let dates = q4_weekdays();
        let monthly = rebalance_dates(&dates, RebalancePeriod::Monthly);
        assert_eq!(
            monthly,
            vec![d(2016, 10, 31), d(2016, 11, 30), d(2016, 12, 30)]
        );
    }

    #[test]
    fn monthly_with_gap_over_month_boundary() {
        // A missing month-end still yields the last trading date in the month.
        let dates = vec![d(2016, 10, 3), d(2016, 10, 21), d(2016, 11, 1)];
        let monthly = rebalance_dates(&dates, RebalancePeriod::Monthly);
        assert_eq!(monthly, vec![d(2016, 10, 21), d(2016, 11, 1)]);
    }

    #[test]
    fn quarterly_takes_every_third_month_close() {
        let dates = q4_weekdays();
        let quarterly = rebalance_dates(&dates, RebalancePeriod::Quarterly);
        assert_eq!(quarterly, vec![d(2016, 12, 30)]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(rebalance_dates(&[], RebalancePeriod::Monthly).is_empty());
    }
}
