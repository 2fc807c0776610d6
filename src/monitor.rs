//! Raw Wiener Linien monitor API payloads.
//!
//! The API answers in one of two envelope shapes:
//! `{ "data": { "monitors": [...] } }` or
//! `{ "message": { "value": { "monitors": [...] } } }`. Both are accepted;
//! the `data` variant wins when both fields are present. Everything
//! downstream operates on the normalized [`Monitor`] tree only.

use serde::Deserialize;

/// Tagged union over the two known response schemas.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MonitorEnvelope {
    Data { data: MonitorData },
    Message { message: MessageEnvelope },
}

#[derive(Debug, Deserialize)]
pub struct MonitorData {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
}

#[derive(Debug, Deserialize)]
pub struct MessageEnvelope {
    pub value: MessageValue,
}

#[derive(Debug, Deserialize)]
pub struct MessageValue {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
}

impl MonitorEnvelope {
    /// Extracts the monitor list regardless of which schema variant arrived.
    pub fn into_monitors(self) -> Vec<Monitor> {
        match self {
            MonitorEnvelope::Data { data } => data.monitors,
            MonitorEnvelope::Message { message } => message.value.monitors,
        }
    }

    /// Parses a raw payload, yielding an empty monitor list for any shape
    /// that matches neither schema variant. The caller already treats a
    /// missing payload as a soft failure; an unrecognized one degrades the
    /// same way instead of aborting the whole load.
    pub fn monitors_from_value(value: serde_json::Value) -> Vec<Monitor> {
        serde_json::from_value::<MonitorEnvelope>(value)
            .map(MonitorEnvelope::into_monitors)
            .unwrap_or_default()
    }
}

/// All lines currently tracked at one physical platform.
#[derive(Debug, Deserialize)]
pub struct Monitor {
    #[serde(default)]
    pub lines: Vec<MonitorLine>,
}

#[derive(Debug, Deserialize)]
pub struct MonitorLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub towards: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(rename = "type", default)]
    pub line_type: Option<String>,
    #[serde(default)]
    pub departures: Option<DepartureList>,
}

#[derive(Debug, Deserialize)]
pub struct DepartureList {
    #[serde(default)]
    pub departure: Vec<RawDeparture>,
}

#[derive(Debug, Deserialize)]
pub struct RawDeparture {
    #[serde(rename = "departureTime", default)]
    pub departure_time: Option<DepartureTime>,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
}

/// `timeReal` is present only when the vehicle is actively tracked; its
/// absence means the planned time is unconfirmed schedule data.
#[derive(Debug, Deserialize)]
pub struct DepartureTime {
    #[serde(default)]
    pub countdown: Option<i64>,
    #[serde(rename = "timePlanned", default)]
    pub time_planned: Option<String>,
    #[serde(rename = "timeReal", default)]
    pub time_real: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub towards: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub destination: Option<String>,
}

/// The vehicle direction arrives either as a bare string or as an object
/// carrying a `value` label, depending on the upstream data source.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Direction {
    Labeled { value: Option<String> },
    Plain(String),
}

impl Direction {
    pub fn label(&self) -> Option<&str> {
        match self {
            Direction::Labeled { value } => value.as_deref(),
            Direction::Plain(s) => Some(s.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_variant() {
        let payload = json!({
            "data": {
                "monitors": [
                    { "lines": [ { "name": "U1", "towards": "Leopoldau" } ] }
                ]
            }
        });
        let monitors = MonitorEnvelope::monitors_from_value(payload);
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].lines[0].name, "U1");
    }

    #[test]
    fn test_message_variant() {
        let payload = json!({
            "message": {
                "value": {
                    "monitors": [ { "lines": [] }, { "lines": [] } ]
                }
            }
        });
        let monitors = MonitorEnvelope::monitors_from_value(payload);
        assert_eq!(monitors.len(), 2);
    }

    #[test]
    fn test_data_variant_preferred_when_both_present() {
        let payload = json!({
            "data": { "monitors": [ { "lines": [ { "name": "from-data" } ] } ] },
            "message": { "value": { "monitors": [] } }
        });
        let monitors = MonitorEnvelope::monitors_from_value(payload);
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].lines[0].name, "from-data");
    }

    #[test]
    fn test_unknown_shape_yields_empty() {
        assert!(MonitorEnvelope::monitors_from_value(json!({ "unexpected": true })).is_empty());
        assert!(MonitorEnvelope::monitors_from_value(json!(null)).is_empty());
        assert!(MonitorEnvelope::monitors_from_value(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_missing_monitors_field_defaults_empty() {
        let monitors = MonitorEnvelope::monitors_from_value(json!({ "data": {} }));
        assert!(monitors.is_empty());
    }

    #[test]
    fn test_departure_fields_all_optional() {
        let payload = json!({
            "data": {
                "monitors": [{
                    "lines": [{
                        "name": "26",
                        "type": "ptTramwayLine",
                        "departures": { "departure": [ {} ] }
                    }]
                }]
            }
        });
        let monitors = MonitorEnvelope::monitors_from_value(payload);
        let dep = &monitors[0].lines[0].departures.as_ref().unwrap().departure[0];
        assert!(dep.departure_time.is_none());
        assert!(dep.vehicle.is_none());
    }

    #[test]
    fn test_direction_both_shapes() {
        let labeled: Direction = serde_json::from_value(json!({ "value": "Oper" })).unwrap();
        assert_eq!(labeled.label(), Some("Oper"));

        let plain: Direction = serde_json::from_value(json!("R")).unwrap();
        assert_eq!(plain.label(), Some("R"));
    }
}
