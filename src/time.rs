//! RFC 3339 date/time values in the four shapes TOML allows.

use std::fmt;

/// A calendar date.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// A UTC offset suffix.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TimeOffset {
    /// A suffix which, when applied to a time, denotes a UTC offset of
    /// 00:00; often spoken "Zulu" from the ICAO phonetic alphabet
    /// representation of the letter "Z". RFC 3339 section 2.
    Z,
    /// Offset between local time and UTC in minutes. `-00:00` is stored as
    /// zero, so it prints back as `+00:00`.
    Custom { minutes: i16 },
}

/// A wall-clock time.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
    /// Number of digits in the original fractional seconds; 0 if none were
    /// written. Preserved so `0.10` and `0.1` round-trip distinctly.
    pub subsec_digits: u8,
    /// Whether seconds were explicitly present in the input. `HH:MM` forms
    /// leave this false (accepted only in v1.1 mode).
    pub has_seconds: bool,
}

/// Which of the four TOML datetime shapes a value is.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DatetimeKind {
    /// Date, time, and offset.
    Full,
    /// Date and time without an offset.
    Local,
    /// Date only.
    Date,
    /// Time only.
    Time,
}

/// A TOML datetime: some combination of [`Date`], [`Time`], and
/// [`TimeOffset`].
///
/// The combinations the parser produces are exactly the four shapes of
/// [`DatetimeKind`]; an offset never appears without a date and time.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Datetime {
    pub date: Option<Date>,
    pub time: Option<Time>,
    pub offset: Option<TimeOffset>,
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    const DAYS: [u8; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[month as usize]
    }
}

impl Datetime {
    /// Which of the four accepted shapes this value has.
    pub fn kind(&self) -> DatetimeKind {
        if self.offset.is_some() {
            DatetimeKind::Full
        } else if self.date.is_some() && self.time.is_some() {
            DatetimeKind::Local
        } else if self.date.is_some() {
            DatetimeKind::Date
        } else {
            DatetimeKind::Time
        }
    }

    /// Parses a datetime that must span the whole of `input`.
    pub fn parse(input: &str) -> Option<Datetime> {
        match Self::munch(input.as_bytes()) {
            Some((consumed, value)) if consumed == input.len() => Some(value),
            _ => None,
        }
    }

    /// Consumes the longest datetime prefix of `input`, returning how many
    /// bytes were eaten and the parsed value. A single forward pass; shape
    /// is decided from the first few bytes (`NN:` is a time, `NNNN-` a
    /// date).
    pub(crate) fn munch(input: &[u8]) -> Option<(usize, Datetime)> {
        enum State {
            Year,
            Month,
            Day,
            Hour,
            Minute,
            Second,
            Frac,
            OffHour,
            OffMin,
        }
        let mut state = match input {
            [_, _, b':', _, _, ..] => State::Hour,
            [_, _, _, _, b'-', _, _, b'-', ..] => State::Year,
            _ => return None,
        };

        let mut date: Option<Date> = None;
        let mut time: Option<Time> = None;
        let mut offset: Option<TimeOffset> = None;

        let mut year = 0u16;
        let mut month = 0u8;
        let mut hour = 0u8;

        let mut current = 0u32;
        let mut len = 0u32;
        let mut off_sign: i16 = 1;
        let mut off_hour: u8 = 0;
        let mut i = 0usize;
        let mut valid = false;

        'outer: loop {
            let byte = input.get(i).copied().unwrap_or(0);
            if byte.is_ascii_digit() {
                len += 1;
                if len <= 9 {
                    current = current * 10 + (byte - b'0') as u32;
                }
                i += 1;
                continue;
            }
            'next: {
                match state {
                    State::Year => {
                        if len != 4 || byte != b'-' {
                            break 'outer;
                        }
                        year = current as u16;
                        state = State::Month;
                        break 'next;
                    }
                    State::Month => {
                        let m = current as u8;
                        if len != 2 || byte != b'-' || m < 1 || m > 12 {
                            break 'outer;
                        }
                        month = m;
                        state = State::Day;
                        break 'next;
                    }
                    State::Day => {
                        let d = current as u8;
                        if len != 2 || d < 1 || d > days_in_month(year, month) {
                            break 'outer;
                        }
                        date = Some(Date { year, month, day: d });
                        if byte == b'T' || byte == b't' {
                            state = State::Hour;
                            break 'next;
                        } else if byte == b' '
                            && input.get(i + 1).is_some_and(|b| b.is_ascii_digit())
                        {
                            state = State::Hour;
                            break 'next;
                        } else {
                            valid = true;
                            break 'outer;
                        }
                    }
                    State::Hour => {
                        let h = current as u8;
                        if len != 2 || byte != b':' || h > 23 {
                            break 'outer;
                        }
                        hour = h;
                        state = State::Minute;
                        break 'next;
                    }
                    State::Minute => {
                        let m = current as u8;
                        if len != 2 || m > 59 {
                            break 'outer;
                        }
                        time = Some(Time {
                            hour,
                            minute: m,
                            second: 0,
                            nanosecond: 0,
                            subsec_digits: 0,
                            has_seconds: false,
                        });
                        if byte == b':' {
                            state = State::Second;
                            break 'next;
                        }
                        // No seconds; fall through to the offset check.
                    }
                    State::Second => {
                        let s = current as u8;
                        // 60 is allowed for leap seconds.
                        if len != 2 || s > 60 {
                            break 'outer;
                        }
                        let t = time.as_mut().expect("minute state ran first");
                        t.second = s;
                        t.has_seconds = true;
                        if byte == b'.' {
                            state = State::Frac;
                            break 'next;
                        }
                        // Fall through to the offset check.
                    }
                    State::Frac => {
                        if len == 0 {
                            break 'outer;
                        }
                        let nd = if len > 9 { 9u8 } else { len as u8 };
                        let mut nanos = current;
                        for _ in nd..9 {
                            nanos *= 10;
                        }
                        let t = time.as_mut().expect("second state ran first");
                        t.nanosecond = nanos;
                        t.subsec_digits = nd;
                        // Fall through to the offset check.
                    }
                    State::OffHour => {
                        let h = current as u8;
                        if len != 2 || byte != b':' || h > 23 {
                            break 'outer;
                        }
                        off_hour = h;
                        state = State::OffMin;
                        break 'next;
                    }
                    State::OffMin => {
                        if len != 2 || current > 59 {
                            break 'outer;
                        }
                        offset = Some(TimeOffset::Custom {
                            minutes: off_sign * (off_hour as i16 * 60 + current as i16),
                        });
                        valid = true;
                        break 'outer;
                    }
                }
                match byte {
                    b'Z' | b'z' => {
                        offset = Some(TimeOffset::Z);
                        i += 1;
                        valid = true;
                        break 'outer;
                    }
                    b'+' => {
                        off_sign = 1;
                        state = State::OffHour;
                    }
                    b'-' => {
                        off_sign = -1;
                        state = State::OffHour;
                    }
                    _ => {
                        valid = true;
                        break 'outer;
                    }
                }
            }
            i += 1;
            current = 0;
            len = 0;
        }
        if !valid || (date.is_none() && offset.is_some()) {
            return None;
        }
        Some((i, Datetime { date, time, offset }))
    }
}

impl fmt::Display for Datetime {
    /// Canonical rendering: `T` separator, seconds always written, the
    /// original sub-second digit count preserved, `Z` for a Zulu offset.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(d) = self.date {
            write!(f, "{:04}-{:02}-{:02}", d.year, d.month, d.day)?;
            if self.time.is_some() {
                f.write_str("T")?;
            }
        }
        if let Some(t) = self.time {
            write!(f, "{:02}:{:02}:{:02}", t.hour, t.minute, t.second)?;
            if t.subsec_digits > 0 {
                let nd = t.subsec_digits.min(9) as u32;
                let frac = t.nanosecond / 10u32.pow(9 - nd);
                write!(f, ".{:0>width$}", frac, width = nd as usize)?;
            }
        }
        match self.offset {
            None => Ok(()),
            Some(TimeOffset::Z) => f.write_str("Z"),
            Some(TimeOffset::Custom { minutes }) => {
                let sign = if minutes < 0 { '-' } else { '+' };
                let abs = minutes.unsigned_abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
            }
        }
    }
}
