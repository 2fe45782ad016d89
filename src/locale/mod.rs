// Day and month names for drawn dates

use chrono::Weekday;

/// Display language
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    Dutch,
    German,
}

const DAYS_SHORT: [[&str; 7]; 3] = [
    ["SU", "MO", "TU", "WE", "TH", "FR", "SA"],
    ["ZO", "MA", "DI", "WO", "DO", "VR", "ZA"],
    ["SO", "MO", "DI", "MI", "DO", "FR", "SA"],
];

const DAYS: [[&str; 7]; 3] = [
    ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"],
    ["zondag", "maandag", "dinsdag", "woensdag", "donderdag", "vrijdag", "zaterdag"],
    ["Sonntag", "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag"],
];

const MONTHS: [[&str; 12]; 3] = [
    [
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
    ],
    [
        "januari", "februari", "maart", "april", "mei", "juni", "juli", "augustus",
        "september", "oktober", "november", "december",
    ],
    [
        "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
        "Oktober", "November", "Dezember",
    ],
];

impl Language {
    /// Unsupported indices fall back to English
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Language::Dutch,
            2 => Language::German,
            _ => Language::English,
        }
    }

    fn idx(self) -> usize {
        match self {
            Language::English => 0,
            Language::Dutch => 1,
            Language::German => 2,
        }
    }

    pub fn day_short(self, day: Weekday) -> &'static str {
        DAYS_SHORT[self.idx()][day.num_days_from_sunday() as usize]
    }

    pub fn day_name(self, day: Weekday) -> &'static str {
        DAYS[self.idx()][day.num_days_from_sunday() as usize]
    }

    /// `month0` is zero-based
    pub fn month_name(self, month0: u32) -> &'static str {
        MONTHS[self.idx()][(month0 % 12) as usize]
    }
}
