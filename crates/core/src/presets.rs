//! Static lookup tables: prompt value types, type aliases, date/time presets.

use serde::{Deserialize, Serialize};

use crate::config::DateTimeSettings;

/// Kind of value a prompt collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Text,
    Numeric,
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
    List,
    #[serde(rename = "multilist")]
    MultiList,
}

impl ValueType {
    pub const ALL: [ValueType; 7] = [
        ValueType::Text,
        ValueType::Numeric,
        ValueType::Date,
        ValueType::Time,
        ValueType::DateTime,
        ValueType::List,
        ValueType::MultiList,
    ];

    /// Canonical keyword as written in prompt syntax.
    pub fn keyword(self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Numeric => "numeric",
            ValueType::Date => "date",
            ValueType::Time => "time",
            ValueType::DateTime => "datetime",
            ValueType::List => "list",
            ValueType::MultiList => "multilist",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ValueType::Text => "Free text",
            ValueType::Numeric => "A number",
            ValueType::Date => "A calendar date",
            ValueType::Time => "A time of day",
            ValueType::DateTime => "A date and a time",
            ValueType::List => "One option from a fixed list",
            ValueType::MultiList => "Several options from a fixed list",
        }
    }

    pub fn example(self) -> &'static str {
        match self {
            ValueType::Text => "{% Title %}",
            ValueType::Numeric => "{% Pages:number %}",
            ValueType::Date => "{% Due:date:ISO %}",
            ValueType::Time => "{% Start:time:24-hour %}",
            ValueType::DateTime => "{% When:datetime:ISO,12-hour %}",
            ValueType::List => "{% Status:list:Open,Done %}",
            ValueType::MultiList => "{% Tags:multilist:Work,Home %}",
        }
    }

    /// Resolve a type keyword or alias, case-insensitively.
    pub fn from_alias(name: &str) -> Option<ValueType> {
        let lower = name.trim().to_ascii_lowercase();
        TYPE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, ty)| *ty)
    }

    pub fn has_date(self) -> bool {
        matches!(self, ValueType::Date | ValueType::DateTime)
    }

    pub fn has_time(self) -> bool {
        matches!(self, ValueType::Time | ValueType::DateTime)
    }

    pub fn is_list(self) -> bool {
        matches!(self, ValueType::List | ValueType::MultiList)
    }

    /// Types whose values come from pickers or fixed options rather than free text.
    pub fn is_constrained(self) -> bool {
        self.has_date() || self.has_time() || self.is_list()
    }
}

static TYPE_ALIASES: &[(&str, ValueType)] = &[
    ("text", ValueType::Text),
    ("string", ValueType::Text),
    ("str", ValueType::Text),
    ("numeric", ValueType::Numeric),
    ("number", ValueType::Numeric),
    ("num", ValueType::Numeric),
    ("int", ValueType::Numeric),
    ("integer", ValueType::Numeric),
    ("float", ValueType::Numeric),
    ("date", ValueType::Date),
    ("time", ValueType::Time),
    ("datetime", ValueType::DateTime),
    ("date-time", ValueType::DateTime),
    ("date_time", ValueType::DateTime),
    ("list", ValueType::List),
    ("select", ValueType::List),
    ("choice", ValueType::List),
    ("multilist", ValueType::MultiList),
    ("multi-list", ValueType::MultiList),
    ("multiselect", ValueType::MultiList),
    ("multi-select", ValueType::MultiList),
];

/// A named shortcut for a format string. `format` is `None` for the preset
/// that defers to the configured default.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub format: Option<&'static str>,
    pub description: &'static str,
}

pub const DEFAULT_PRESET: &str = "default";

pub static DATE_PRESETS: &[Preset] = &[
    Preset {
        name: DEFAULT_PRESET,
        format: None,
        description: "Configured date format",
    },
    Preset {
        name: "ISO",
        format: Some("YYYY-MM-DD"),
        description: "ISO 8601 date",
    },
    Preset {
        name: "compact",
        format: Some("YYYYMMDD"),
        description: "Digits only",
    },
    Preset {
        name: "US",
        format: Some("MM-DD-YYYY"),
        description: "Month first",
    },
    Preset {
        name: "EU",
        format: Some("DD-MM-YYYY"),
        description: "Day first",
    },
    Preset {
        name: "short-month",
        format: Some("MMM DD, YYYY"),
        description: "Abbreviated month name",
    },
    Preset {
        name: "long-month",
        format: Some("MMMM DD, YYYY"),
        description: "Full month name",
    },
];

pub static TIME_PRESETS: &[Preset] = &[
    Preset {
        name: DEFAULT_PRESET,
        format: None,
        description: "Configured time format",
    },
    Preset {
        name: "ISO",
        format: Some("HH:mm:ss"),
        description: "ISO 8601 time",
    },
    Preset {
        name: "24-hour",
        format: Some("HH:mm"),
        description: "24-hour clock",
    },
    Preset {
        name: "12-hour",
        format: Some("hh:mm A"),
        description: "12-hour clock with AM/PM",
    },
];

/// Which preset table to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKind {
    Date,
    Time,
}

impl PresetKind {
    pub fn presets(self) -> &'static [Preset] {
        match self {
            PresetKind::Date => DATE_PRESETS,
            PresetKind::Time => TIME_PRESETS,
        }
    }

    /// Case-insensitive preset lookup.
    pub fn find(self, name: &str) -> Option<&'static Preset> {
        let name = name.trim();
        self.presets()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Format string for `preset`, resolving `default` and unknown names
    /// through `settings`.
    pub fn resolve<'a>(self, preset: &str, settings: &'a DateTimeSettings) -> &'a str {
        match self.find(preset).and_then(|p| p.format) {
            Some(format) => format,
            None => match self {
                PresetKind::Date => &settings.date_format,
                PresetKind::Time => &settings.time_format,
            },
        }
    }
}
