use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// How often a script is meant to recur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// A single run on `date`.
    Once,
    /// Every day at `time`.
    Daily,
    /// On each of `days` at `time`.
    Weekly,
    /// On the day-of-month of `date` at `time`.
    Monthly,
    /// Free-form `cronExpression`.
    Custom,
}

impl Frequency {
    /// Wire tag, e.g. `"weekly"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            other => Err(format!("unknown frequency {other:?}")),
        }
    }
}

/// Day of the week, serialized by its English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    /// Monday.
    Monday,
    /// Tuesday.
    Tuesday,
    /// Wednesday.
    Wednesday,
    /// Thursday.
    Thursday,
    /// Friday.
    Friday,
    /// Saturday.
    Saturday,
    /// Sunday.
    Sunday,
}

impl Weekday {
    /// Monday through Sunday.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// English name, e.g. `"Monday"`.
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl FromStr for Weekday {
    type Err = String;

    /// Accepts the full name or its three-letter prefix, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|d| {
                let name = d.name().to_ascii_lowercase();
                name == needle || (needle.len() == 3 && name.starts_with(&needle))
            })
            .ok_or_else(|| format!("unknown weekday {s:?}"))
    }
}

/// Stored recurrence configuration.
///
/// Descriptive only: nothing compares it against the clock or fires a run.
/// Only the fields relevant to `frequency` are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Recurrence kind.
    pub frequency: Frequency,
    /// Time of day, `"HH:MM"` on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hhmm")]
    pub time: Option<NaiveTime>,
    /// Calendar date for once/monthly, `"YYYY-MM-DD"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Weekdays for weekly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<Weekday>>,
    /// Free text for custom; never parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

impl Schedule {
    /// Build a schedule keeping only what `frequency` uses.
    ///
    /// `time` is kept for every frequency, `date` for once/monthly, `days`
    /// for weekly and `cron` for custom. Everything else is dropped.
    pub fn new(
        frequency: Frequency,
        time: Option<NaiveTime>,
        date: Option<NaiveDate>,
        days: Vec<Weekday>,
        cron: Option<String>,
    ) -> Self {
        let mut sched = Schedule { frequency, time, date: None, days: None, cron_expression: None };
        match frequency {
            Frequency::Once | Frequency::Monthly => sched.date = date,
            Frequency::Weekly => {
                let mut days = days;
                days.sort();
                days.dedup();
                sched.days = Some(days);
            }
            Frequency::Custom => sched.cron_expression = Some(cron.unwrap_or_default()),
            Frequency::Daily => {}
        }
        sched
    }

    /// One-line human description, e.g. `"weekly on Monday, Friday at 09:30"`.
    pub fn describe(&self) -> String {
        let mut out = self.frequency.to_string();
        if let Some(days) = &self.days {
            let names: Vec<&str> = days.iter().map(|d| d.name()).collect();
            out.push_str(&format!(" on {}", names.join(", ")));
        }
        if let Some(date) = &self.date {
            let word = if self.frequency == Frequency::Once { "on" } else { "from" };
            out.push_str(&format!(" {word} {date}"));
        }
        if let Some(cron) = &self.cron_expression {
            out.push_str(&format!(" ({cron})"));
        }
        if let Some(time) = &self.time {
            out.push_str(&format!(" at {}", time.format("%H:%M")));
        }
        out
    }
}

/// Parse `"HH:MM"` (or `"HH:MM:SS"`) into a time of day.
pub fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, "%H:%M").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| super::parse_time(&s).map_err(serde::de::Error::custom)).transpose()
    }
}
