//! Text shown for records in the list and detail views.

use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::record::Record;

/// Describes how long ago something happened, e.g. `"3 days ago"`.
pub fn relative_age(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - then;

    if elapsed < Duration::MINUTE {
        return "just now".to_owned();
    }

    let (count, unit) = if elapsed < Duration::HOUR {
        (elapsed.whole_minutes(), "minute")
    } else if elapsed < Duration::DAY {
        (elapsed.whole_hours(), "hour")
    } else if elapsed < Duration::days(30) {
        (elapsed.whole_days(), "day")
    } else if elapsed < Duration::days(365) {
        (elapsed.whole_days() / 30, "month")
    } else {
        (elapsed.whole_days() / 365, "year")
    };

    format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
}

/// Formats a timestamp the way the detail view shows it, e.g.
/// `"March 1, 2024 at 9:30 AM"`.
pub fn long_date(at: OffsetDateTime) -> String {
    let format = format_description!(
        "[month repr:long] [day padding:none], [year] at [hour repr:12 padding:none]:[minute] [period]"
    );

    at.format(&format).unwrap_or_else(|_| "Unknown date".to_owned())
}

/// A one-line summary of a record for the list view.
pub fn summary(record: &Record, now: OffsetDateTime) -> String {
    let fields = record.fields();
    let mut line = record.name().to_owned();

    if let Some(brand) = fields.brand.as_deref().filter(|b| !b.is_empty()) {
        line.push_str(" by ");
        line.push_str(brand);
    }

    if let Some(origin) = fields.origin.as_deref() {
        line.push_str(&format!(" ({})", origin));
    }

    let flavor = record.flavor_profile();
    line.push_str(&format!(
        " · umami {} sweet {} bitter {} · {}",
        flavor.umami.value(),
        flavor.sweetness.value(),
        flavor.bitterness.value(),
        relative_age(record.created_at(), now)
    ));

    line
}

/// The brewing ratio as shown in the detail view, e.g.
/// `"2g powder · 70ml water · 100ml milk"`.
pub fn brewing_ratio(record: &Record) -> String {
    let fields = record.fields();
    let mut parts = vec![format!("{}g powder", fields.powder_grams)];

    if let Some(water) = fields.water_ml {
        parts.push(format!("{}ml water", water));
    }

    if let Some(milk) = fields.milk_ml {
        parts.push(format!("{}ml milk", milk));
    }

    parts.join(" · ")
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use time::macros::datetime;

    use super::*;
    use crate::record::{Amount, RecordId, RecordInput};

    #[test]
    fn ages_are_described_in_the_largest_unit() {
        let now = datetime!(2024-06-01 12:00 UTC);

        assert_eq!(relative_age(now, now), "just now");
        assert_eq!(relative_age(now + Duration::minutes(5), now), "just now");
        assert_eq!(relative_age(now - Duration::seconds(61), now), "1 minute ago");
        assert_eq!(relative_age(now - Duration::minutes(59), now), "59 minutes ago");
        assert_eq!(relative_age(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(relative_age(now - Duration::days(1), now), "1 day ago");
        assert_eq!(relative_age(now - Duration::days(65), now), "2 months ago");
        assert_eq!(relative_age(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn long_dates_use_a_twelve_hour_clock() {
        assert_eq!(long_date(datetime!(2024-03-01 09:30 UTC)), "March 1, 2024 at 9:30 AM");
        assert_eq!(long_date(datetime!(2024-12-25 18:05 UTC)), "December 25, 2024 at 6:05 PM");
    }

    #[test]
    fn ratios_skip_missing_liquids() {
        let mut input = RecordInput::new("Daily", Amount::try_from(1.5).unwrap());
        input.milk_ml = Some(Amount::try_from(100.0).unwrap());
        let record = Record::new(RecordId::from("r"), datetime!(2024-03-01 09:30 UTC), input);

        assert_eq!(brewing_ratio(&record), "1.5g powder · 100ml milk");
    }

    #[test]
    fn summaries_skip_blank_brands() {
        let mut input = RecordInput::new("Daily", Amount::try_from(2.0).unwrap());
        input.brand = Some(String::new());
        input.origin = Some("Uji".to_owned());
        let created_at = datetime!(2024-03-01 09:30 UTC);
        let record = Record::new(RecordId::from("r"), created_at, input);

        assert_eq!(
            summary(&record, created_at + Duration::days(2)),
            "Daily (Uji) · umami 3 sweet 3 bitter 3 · 2 days ago"
        );
    }
}
