use chrono::Days;
use ics::{
    components::Parameter,
    escape_text,
    properties::{DtEnd, DtStart, Summary},
};

use crate::{ConflictIndex, Entry};

impl ConflictIndex {
    /// Renders every taken date as an all-day event.
    #[must_use]
    pub fn to_ics<'a>(&'a self, name: &'a str) -> ics::ICalendar<'a> {
        let mut icalendar = ics::ICalendar::new("2.0", name);

        for entry in self.iter() {
            icalendar.add_event(entry.to_ics(name));
        }

        icalendar
    }
}

impl Entry {
    #[must_use]
    pub fn to_ics(&self, calendar: &str) -> ics::Event<'_> {
        let start = self.date.format("%Y%m%d").to_string();
        let end = self
            .date
            .checked_add_days(Days::new(1))
            .unwrap_or(self.date)
            .format("%Y%m%d")
            .to_string();

        let id = format!("{start}_{}", calendar.replace(' ', "-"));

        let mut ics_event = ics::Event::new(id, format!("{start}T000000Z"));

        let mut dtstart = DtStart::new(start);
        dtstart.add(Parameter::new("VALUE", "DATE"));
        let mut dtend = DtEnd::new(end);
        dtend.add(Parameter::new("VALUE", "DATE"));

        ics_event.push(dtstart);
        ics_event.push(dtend);
        ics_event.push(Summary::new(escape_text(self.description.trim())));

        ics_event
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::ConflictIndex;

    #[test]
    fn all_day_events() {
        let index: ConflictIndex = [(
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            "Staff Farewell Lunch".to_string(),
        )]
        .into_iter()
        .collect();

        let calendar = index.to_ics("School Calendar").to_string();

        assert!(calendar.contains("BEGIN:VCALENDAR"));
        assert!(calendar.contains("UID:20241231_School-Calendar"));
        assert!(calendar.contains("DTSTART;VALUE=DATE:20241231"));
        assert!(calendar.contains("DTEND;VALUE=DATE:20250101"));
        assert!(calendar.contains("SUMMARY:Staff Farewell Lunch"));
    }
}
