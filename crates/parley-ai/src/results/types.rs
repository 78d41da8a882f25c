//! Typed tool results, one variant per known tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolResult {
    Calculator(CalculatorResult),
    Weather(WeatherResult),
    Calendar(CalendarResult),
    Reminders(RemindersResult),
    WebSearch(WebSearchResult),
    Timer(TimerResult),
    /// Result of a parser registered at runtime for a tool the core does
    /// not know about.
    Custom { name: String, value: Value },
}

impl ToolResult {
    pub fn tool_name(&self) -> &str {
        match self {
            ToolResult::Calculator(_) => "calculator",
            ToolResult::Weather(_) => "weather",
            ToolResult::Calendar(_) => "calendar",
            ToolResult::Reminders(_) => "reminders",
            ToolResult::WebSearch(_) => "web_search",
            ToolResult::Timer(_) => "timer",
            ToolResult::Custom { name, .. } => name,
        }
    }

    /// One-line description for compact display.
    pub fn summary(&self) -> String {
        match self {
            ToolResult::Calculator(r) => format!("{} = {}", r.expression, format_number(r.result)),
            ToolResult::Weather(r) => {
                let mut line = format!("{}: {}°", r.location, format_number(r.temperature));
                if let Some(ref unit) = r.unit {
                    line.push_str(unit);
                }
                if let Some(ref condition) = r.condition {
                    line.push_str(", ");
                    line.push_str(condition);
                }
                line
            }
            ToolResult::Calendar(r) => match r.events.len() {
                0 => "No events".to_string(),
                1 => format!("{} at {}", r.events[0].title, r.events[0].start),
                n => format!("{n} events"),
            },
            ToolResult::Reminders(r) => {
                let open = r.reminders.iter().filter(|rem| !rem.completed).count();
                format!("{open} open of {} reminders", r.reminders.len())
            }
            ToolResult::WebSearch(r) => {
                format!("{} results for \"{}\"", r.results.len(), r.query)
            }
            ToolResult::Timer(r) => {
                let secs = format_number(r.duration_seconds);
                match r.label {
                    Some(ref label) => format!("{label}: {secs}s"),
                    None => format!("Timer: {secs}s"),
                }
            }
            ToolResult::Custom { name, .. } => format!("{name} result"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorResult {
    pub expression: String,
    pub result: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub location: String,
    pub temperature: f64,
    pub unit: Option<String>,
    pub condition: Option<String>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: String,
    pub high: f64,
    pub low: f64,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarResult {
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub location: Option<String>,
    pub all_day: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindersResult {
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub title: String,
    pub due: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerResult {
    pub label: Option<String>,
    pub duration_seconds: f64,
    pub fires_at: Option<String>,
}

/// Integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
