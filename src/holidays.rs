//! Japanese public holiday calendar.
//!
//! Implements the rules of the Public Holiday Act (国民の祝日に関する法律)
//! as they apply from 2000 on:
//!
//! - fixed-date holidays, with the dates they moved to over the years
//! - "Happy Monday" holidays (n-th Monday of a month)
//! - vernal and autumnal equinox days, computed with the usual
//!   approximation that holds for 1980–2099
//! - the one-off dates of the 2019 imperial succession and the holidays
//!   moved for the Tokyo 2020 Olympics (held in 2021)
//! - substitute holidays (振替休日) and citizens' holidays (国民の休日)
//!
//! Years before 2000 get the 2000 rules for Happy Monday holidays.
//! Substitute and citizens' holidays follow the rules in force for the year:
//! no substitutes before 1973, only the Monday after a Sunday holiday before
//! 2007, and no citizens' holidays before 1986.

use chrono::{Datelike, NaiveDate, Weekday};

/// Whether `date` is a weekend day or a public holiday.
pub fn is_day_off(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || is_holiday(date)
}

/// Whether `date` is a public holiday, including substitute and citizens' holidays.
pub fn is_holiday(date: NaiveDate) -> bool {
    holiday_name(date).is_some()
}

/// The name of the holiday on `date`, if any.
pub fn holiday_name(date: NaiveDate) -> Option<&'static str> {
    named_holiday(date)
        .or_else(|| is_substitute_holiday(date).then_some("振替休日"))
        .or_else(|| is_citizens_holiday(date).then_some("国民の休日"))
}

fn nth_monday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, n)
}

fn equinox_day(year: i32, base: f64) -> u32 {
    let y = f64::from(year - 1980);
    (base + 0.242194 * y - (y / 4.0).floor()).floor() as u32
}

/// Day of March of the vernal equinox.
pub fn vernal_equinox(year: i32) -> u32 {
    equinox_day(year, 20.8431)
}

/// Day of September of the autumnal equinox.
pub fn autumnal_equinox(year: i32) -> u32 {
    equinox_day(year, 23.2488)
}

/// Holidays defined by the act itself, without substitute and citizens' days.
fn named_holiday(date: NaiveDate) -> Option<&'static str> {
    let (y, m, d) = (date.year(), date.month(), date.day());
    let is_nth_monday = |month: u32, n: u8| m == month && nth_monday(y, month, n) == Some(date);

    match (m, d) {
        (1, 1) => return Some("元日"),
        (2, 11) => return Some("建国記念の日"),
        (2, 23) if y >= 2020 => return Some("天皇誕生日"),
        (4, 29) if y >= 2007 => return Some("昭和の日"),
        (4, 29) if y >= 1989 => return Some("みどりの日"),
        (4, 29) => return Some("天皇誕生日"),
        (5, 1) if y == 2019 => return Some("天皇の即位の日"),
        (5, 3) => return Some("憲法記念日"),
        (5, 4) if y >= 2007 => return Some("みどりの日"),
        (5, 5) => return Some("こどもの日"),
        (10, 22) if y == 2019 => return Some("即位礼正殿の儀の行われる日"),
        (11, 3) => return Some("文化の日"),
        (11, 23) => return Some("勤労感謝の日"),
        (12, 23) if (1989..=2018).contains(&y) => return Some("天皇誕生日"),
        _ => {}
    }

    if m == 3 && d == vernal_equinox(y) {
        return Some("春分の日");
    }
    if m == 9 && d == autumnal_equinox(y) {
        return Some("秋分の日");
    }

    if is_nth_monday(1, 2) {
        return Some("成人の日");
    }

    let marine_day = match y {
        2020 => m == 7 && d == 23,
        2021 => m == 7 && d == 22,
        y if y >= 2003 => is_nth_monday(7, 3),
        y if y >= 1996 => m == 7 && d == 20,
        _ => false,
    };
    if marine_day {
        return Some("海の日");
    }

    let mountain_day = match y {
        2020 => m == 8 && d == 10,
        2021 => m == 8 && d == 8,
        y if y >= 2016 => m == 8 && d == 11,
        _ => false,
    };
    if mountain_day {
        return Some("山の日");
    }

    let respect_for_aged = if y >= 2003 {
        is_nth_monday(9, 3)
    } else {
        m == 9 && d == 15
    };
    if respect_for_aged {
        return Some("敬老の日");
    }

    let sports_day = match y {
        2020 => m == 7 && d == 24,
        2021 => m == 7 && d == 23,
        _ => is_nth_monday(10, 2),
    };
    if sports_day {
        return Some(if y >= 2020 { "スポーツの日" } else { "体育の日" });
    }

    None
}

/// A holiday falling on a Sunday moves to the next day that is not a holiday.
fn is_substitute_holiday(date: NaiveDate) -> bool {
    if date.year() < 1973 || named_holiday(date).is_some() {
        return false;
    }
    if date.year() < 2007 {
        return date.weekday() == Weekday::Mon
            && date.pred_opt().and_then(named_holiday).is_some();
    }
    let mut prev = date.pred_opt();
    while let Some(day) = prev {
        if named_holiday(day).is_none() {
            return false;
        }
        if day.weekday() == Weekday::Sun {
            return true;
        }
        prev = day.pred_opt();
    }
    false
}

/// A weekday squeezed between two holidays is a holiday too.
fn is_citizens_holiday(date: NaiveDate) -> bool {
    if date.year() < 1986 || date.weekday() == Weekday::Sun || named_holiday(date).is_some() {
        return false;
    }
    match (date.pred_opt(), date.succ_opt()) {
        (Some(prev), Some(next)) => named_holiday(prev).is_some() && named_holiday(next).is_some(),
        _ => false,
    }
}
