//! Weekday acceptance per entity kind

use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::EntityKind;

/// Weekday of `date` and whether the entity kind receives visitors on it
///
/// City offices accept Monday to Friday; heads of departments only Tuesday
/// and Thursday.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, Weekday};
/// use rezerwacje::models::EntityKind;
/// use rezerwacje::scanner::validation::validate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 5, 22).unwrap();
/// assert_eq!(validate(EntityKind::City, date), (Weekday::Wed, true));
/// assert_eq!(validate(EntityKind::Department, date), (Weekday::Wed, false));
/// ```
pub fn validate(kind: EntityKind, date: NaiveDate) -> (Weekday, bool) {
    let weekday = date.weekday();
    let accepted = match kind {
        EntityKind::City => !matches!(weekday, Weekday::Sat | Weekday::Sun),
        EntityKind::Department => matches!(weekday, Weekday::Tue | Weekday::Thu),
    };
    (weekday, accepted)
}
