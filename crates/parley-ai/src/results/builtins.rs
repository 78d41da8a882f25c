//! Parsers for the built-in tools' JSON contracts.
//!
//! Required fields missing or mistyped make the whole parse return
//! `None`. Individual list entries that are malformed are skipped.

use serde_json::{Map, Value};

use super::fields::{array, boolean, number, object, string};
use super::types::*;
use super::ToolResultRegistry;

pub(super) fn install(registry: &mut ToolResultRegistry) {
    registry.register("calculator", parse_calculator);
    registry.register("weather", parse_weather);
    registry.register("calendar", parse_calendar);
    registry.register("reminders", parse_reminders);
    registry.register("web_search", parse_web_search);
    registry.register("timer", parse_timer);
}

pub(super) fn parse_calculator(value: &Value) -> Option<ToolResult> {
    let obj = object(value)?;
    Some(ToolResult::Calculator(CalculatorResult {
        expression: string(obj, &["expression", "input"])?,
        result: number(obj, &["result", "value"])?,
    }))
}

pub(super) fn parse_weather(value: &Value) -> Option<ToolResult> {
    let obj = object(value)?;
    let forecast = array(obj, &["forecast", "daily"])
        .map(|days| days.iter().filter_map(parse_forecast_day).collect())
        .unwrap_or_default();

    Some(ToolResult::Weather(WeatherResult {
        location: string(obj, &["location", "city"])?,
        temperature: number(obj, &["temperature", "temp"])?,
        unit: string(obj, &["unit", "units"]),
        condition: string(obj, &["condition", "description", "summary"]),
        humidity: number(obj, &["humidity"]),
        wind_speed: number(obj, &["wind_speed", "windSpeed"]),
        forecast,
    }))
}

fn parse_forecast_day(value: &Value) -> Option<ForecastDay> {
    let obj = object(value)?;
    Some(ForecastDay {
        day: string(obj, &["day", "date"])?,
        high: number(obj, &["high", "max"])?,
        low: number(obj, &["low", "min"])?,
        condition: string(obj, &["condition", "description"]),
    })
}

/// Accepts either an `events` list or a single created `event`.
pub(super) fn parse_calendar(value: &Value) -> Option<ToolResult> {
    let obj = object(value)?;
    let events = if let Some(list) = array(obj, &["events"]) {
        list.iter().filter_map(parse_calendar_event).collect()
    } else {
        vec![parse_calendar_event(obj.get("event")?)?]
    };
    Some(ToolResult::Calendar(CalendarResult { events }))
}

fn parse_calendar_event(value: &Value) -> Option<CalendarEvent> {
    let obj = object(value)?;
    Some(CalendarEvent {
        title: string(obj, &["title", "summary"])?,
        start: string(obj, &["start", "start_time", "startDate"])?,
        end: string(obj, &["end", "end_time", "endDate"]),
        location: string(obj, &["location"]),
        all_day: boolean(obj, "all_day")
            .or_else(|| boolean(obj, "isAllDay"))
            .unwrap_or(false),
    })
}

pub(super) fn parse_reminders(value: &Value) -> Option<ToolResult> {
    let obj = object(value)?;
    let reminders = if let Some(list) = array(obj, &["reminders", "items"]) {
        list.iter().filter_map(parse_reminder).collect()
    } else {
        vec![parse_reminder(obj.get("reminder")?)?]
    };
    Some(ToolResult::Reminders(RemindersResult { reminders }))
}

fn parse_reminder(value: &Value) -> Option<Reminder> {
    let obj = object(value)?;
    Some(Reminder {
        title: string(obj, &["title", "text"])?,
        due: string(obj, &["due", "due_date", "dueDate"]),
        completed: boolean(obj, "completed").unwrap_or(false),
    })
}

pub(super) fn parse_web_search(value: &Value) -> Option<ToolResult> {
    let obj = object(value)?;
    let results = array(obj, &["results", "items"])?
        .iter()
        .filter_map(parse_search_hit)
        .collect();
    Some(ToolResult::WebSearch(WebSearchResult {
        query: string(obj, &["query", "q"])?,
        results,
    }))
}

fn parse_search_hit(value: &Value) -> Option<SearchHit> {
    let obj: &Map<String, Value> = object(value)?;
    Some(SearchHit {
        title: string(obj, &["title"])?,
        url: string(obj, &["url", "link"])?,
        snippet: string(obj, &["snippet", "description"]),
    })
}

pub(super) fn parse_timer(value: &Value) -> Option<ToolResult> {
    let obj = object(value)?;
    let duration_seconds = number(obj, &["duration_seconds", "duration", "seconds"])?;
    if duration_seconds < 0.0 {
        return None;
    }
    Some(ToolResult::Timer(TimerResult {
        label: string(obj, &["label", "name"]),
        duration_seconds,
        fires_at: string(obj, &["fires_at", "fireDate", "end_time"]),
    }))
}
