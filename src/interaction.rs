use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Overview,
    Students,
    Teachers,
    Sessions,
    Attendance,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Overview,
        Tab::Students,
        Tab::Teachers,
        Tab::Sessions,
        Tab::Attendance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Students => "students",
            Tab::Teachers => "teachers",
            Tab::Sessions => "sessions",
            Tab::Attendance => "attendance",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "📊 نظرة عامة",
            Tab::Students => "👨‍🎓 الطلاب",
            Tab::Teachers => "👨‍🏫 الدكاترة",
            Tab::Sessions => "📚 المحاضرات",
            Tab::Attendance => "✅ سجل الحضور",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTab(pub String);

impl fmt::Display for UnknownTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown view '{}'", self.0)
    }
}

impl std::error::Error for UnknownTab {}

impl FromStr for Tab {
    type Err = UnknownTab;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|tab| tab.as_str() == name)
            .ok_or_else(|| UnknownTab(name.to_string()))
    }
}

/// Exactly one view is active at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewSwitcher {
    active: Tab,
}

impl ViewSwitcher {
    pub fn new(active: Tab) -> Self {
        Self { active }
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    pub fn activate(&mut self, tab: Tab) {
        self.active = tab;
    }

    /// Activates a view by name; the current view stays active on error.
    pub fn switch_to(&mut self, name: &str) -> Result<Tab, UnknownTab> {
        let tab = name.parse()?;
        self.activate(tab);
        Ok(tab)
    }

    pub fn is_active(&self, tab: Tab) -> bool {
        self.active == tab
    }

    pub fn states(&self) -> [(Tab, bool); 5] {
        Tab::ALL.map(|tab| (tab, self.is_active(tab)))
    }
}

pub trait Searchable {
    /// The item's full visible text.
    fn search_text(&self) -> String;
}

pub fn matches(text: &str, query: &str) -> bool {
    text.to_lowercase().contains(&query.to_lowercase())
}

/// Visibility flag per item, in order. Nothing is removed; an empty query shows all.
pub fn filter_visibility<T: Searchable>(items: &[T], query: &str) -> Vec<bool> {
    items
        .iter()
        .map(|item| matches(&item.search_text(), query))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct Filtered<'a, T> {
    #[serde(flatten)]
    pub item: &'a T,
    pub visible: bool,
}

pub fn filter_items<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<Filtered<'a, T>> {
    items
        .iter()
        .zip(filter_visibility(items, query))
        .map(|(item, visible)| Filtered { item, visible })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Theme::Dark => "🌙",
            Theme::Light => "☀️",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Dark => "الوضع الداكن",
            Theme::Light => "الوضع الفاتح",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}
