//! NASA JPL Small-Body Database (SBDB) asteroid source.
//!
//! Looks an asteroid up by name or designation and normalizes diameter,
//! velocity, mass, spectral class, orbit and close approaches. Parsing is a
//! pure function over the JSON body so it can be tested without a network.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SourceError, SourceResult};
use crate::traits::sources::AsteroidSource;
use crate::types::facts::{AsteroidPhysicalData, CloseApproach, Composition, OrbitalElements};

/// Source id recorded on facts from this adapter.
pub const SBDB_SOURCE_ID: &str = "nasa_jpl_sbdb";

pub const SBDB_BASE_URL: &str = "https://ssd-api.jpl.nasa.gov/sbdb.api";

/// Default request timeout.
pub const SBDB_TIMEOUT: Duration = Duration::from_secs(30);

/// Close approaches kept per asteroid.
const MAX_CLOSE_APPROACHES: usize = 5;

/// Asteroid source backed by the JPL SBDB API.
///
/// # Example
///
/// ```rust,ignore
/// use impact_extraction::sources::JplSbdbSource;
///
/// let source = JplSbdbSource::new()?;
/// let apophis = source.fetch_asteroid("Apophis").await?;
/// ```
pub struct JplSbdbSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl JplSbdbSource {
    /// Create a source with a 30 second client timeout.
    pub fn new() -> SourceResult<Self> {
        Self::with_timeout(SBDB_TIMEOUT)
    }

    /// Create a source whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Http {
                data_source: SBDB_SOURCE_ID.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client, timeout))
    }

    /// Use a custom HTTP client built with the given request timeout.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            base_url: SBDB_BASE_URL.to_string(),
            timeout,
        }
    }

    /// Request timeout reported on [`SourceError::Timeout`].
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Point at a different endpoint (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lookup URL for an asteroid.
    pub fn lookup_url(&self, name: &str) -> SourceResult<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[("sstr", name), ("phys-par", "1"), ("ca-data", "1")],
        )
        .map_err(|e| SourceError::InvalidValue {
            data_source: SBDB_SOURCE_ID.to_string(),
            field: "base_url".to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl AsteroidSource for JplSbdbSource {
    fn source_id(&self) -> &str {
        SBDB_SOURCE_ID
    }

    async fn fetch_asteroid(&self, name: &str) -> SourceResult<AsteroidPhysicalData> {
        let url = self.lookup_url(name)?;
        debug!(url = %url, "SBDB lookup starting");

        let http_error = |message: String| SourceError::Http {
            data_source: SBDB_SOURCE_ID.to_string(),
            message,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(asteroid = %name, error = %e, "SBDB request failed");
            if e.is_timeout() {
                SourceError::Timeout {
                    data_source: SBDB_SOURCE_ID.to_string(),
                    timeout: self.timeout,
                }
            } else {
                http_error(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http_error(e.to_string()))?;

        if !status.is_success() {
            // SBDB explains lookup failures in a JSON `message`.
            if let Ok(json) = serde_json::from_str::<Value>(&body) {
                if json.get("message").is_some() {
                    return parse_sbdb_response(&json, name);
                }
            }
            return Err(http_error(format!("HTTP {}", status)));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| SourceError::Parse {
            data_source: SBDB_SOURCE_ID.to_string(),
            message: e.to_string(),
        })?;

        let asteroid = parse_sbdb_response(&json, name)?;
        info!(
            asteroid = %name,
            diameter_m = asteroid.diameter_m,
            velocity_ms = asteroid.velocity_ms,
            "SBDB lookup complete"
        );
        Ok(asteroid)
    }
}

/// Normalize an SBDB response body.
///
/// `phys_par` may be an array of `{name, value}` entries or a flat object.
/// Diameter is converted from km to m, velocity (first close approach
/// `v_rel`) from km/s to m/s.
pub fn parse_sbdb_response(json: &Value, name: &str) -> SourceResult<AsteroidPhysicalData> {
    if let Some(message) = json.get("message").and_then(Value::as_str) {
        debug!(asteroid = %name, reason = message, "SBDB reported no match");
        return Err(SourceError::NotFound {
            data_source: SBDB_SOURCE_ID.to_string(),
            query: name.to_string(),
        });
    }
    if json.get("list").is_some() && json.get("object").is_none() {
        // Ambiguous designation: SBDB returns candidates instead of an object.
        return Err(SourceError::NotFound {
            data_source: SBDB_SOURCE_ID.to_string(),
            query: name.to_string(),
        });
    }

    let object = json
        .get("object")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::missing(SBDB_SOURCE_ID, "object"))?;

    let phys = physical_parameters(json.get("phys_par"));
    let approaches = json
        .get("ca_data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let diameter_km = number_field(&phys, "diameter", "phys_par.diameter")?
        .ok_or_else(|| SourceError::missing(SBDB_SOURCE_ID, "phys_par.diameter"))?;
    if diameter_km <= 0.0 {
        return Err(SourceError::InvalidValue {
            data_source: SBDB_SOURCE_ID.to_string(),
            field: "phys_par.diameter".to_string(),
            message: format!("diameter must be positive, got {}", diameter_km),
        });
    }

    let velocity_km_s = approaches
        .first()
        .and_then(|ca| ca.get("v_rel"))
        .and_then(as_number)
        .ok_or_else(|| SourceError::missing(SBDB_SOURCE_ID, "ca_data[0].v_rel"))?;
    if velocity_km_s <= 0.0 {
        return Err(SourceError::InvalidValue {
            data_source: SBDB_SOURCE_ID.to_string(),
            field: "ca_data[0].v_rel".to_string(),
            message: format!("velocity must be positive, got {}", velocity_km_s),
        });
    }

    let catalog_id = object
        .get("des")
        .or_else(|| object.get("fullname"))
        .and_then(Value::as_str)
        .unwrap_or(name);

    let mut asteroid = AsteroidPhysicalData::new(
        name,
        catalog_id,
        diameter_km * 1000.0,
        velocity_km_s * 1000.0,
        SBDB_SOURCE_ID,
    );

    asteroid.mass_kg = number_field(&phys, "mass", "phys_par.mass").unwrap_or_else(|e| {
        warn!(asteroid = %name, error = %e, "ignoring unparsable mass");
        None
    });
    asteroid.composition = ["spec_B", "spec_T"]
        .iter()
        .filter_map(|key| phys.get(*key).and_then(Value::as_str))
        .find_map(Composition::from_spectral_class);
    asteroid.orbital = Some(orbital_elements(json, object));
    asteroid.close_approaches = approaches
        .iter()
        .take(MAX_CLOSE_APPROACHES)
        .map(close_approach)
        .collect();
    asteroid.is_potentially_hazardous = match object.get("pha") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.eq_ignore_ascii_case("Y"),
        _ => false,
    };

    Ok(asteroid)
}

/// Flatten `phys_par` into a name → value map.
fn physical_parameters(phys_par: Option<&Value>) -> Map<String, Value> {
    match phys_par {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                let key = entry.get("name")?.as_str()?;
                let value = entry.get("value")?.clone();
                Some((key.to_string(), value))
            })
            .collect(),
        _ => Map::new(),
    }
}

/// SBDB encodes most numbers as strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `Ok(None)` when absent or null; `Err` when present but not a number.
fn number_field(map: &Map<String, Value>, key: &str, field: &str) -> SourceResult<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_number(value).map(Some).ok_or_else(|| SourceError::InvalidValue {
            data_source: SBDB_SOURCE_ID.to_string(),
            field: field.to_string(),
            message: format!("not a number: {}", value),
        }),
    }
}

fn orbital_elements(json: &Value, object: &Map<String, Value>) -> OrbitalElements {
    // Newer responses nest elements under orbit.elements as {name, value}.
    let elements = physical_parameters(json.get("orbit").and_then(|o| o.get("elements")));
    let get = |key: &str| {
        elements
            .get(key)
            .or_else(|| object.get(key))
            .and_then(as_number)
    };

    OrbitalElements {
        semi_major_axis_au: get("a"),
        eccentricity: get("e"),
        inclination_deg: get("i"),
        ascending_node_deg: get("om"),
        perihelion_argument_deg: get("w"),
        mean_anomaly_deg: get("ma"),
        period_days: get("per"),
    }
}

fn close_approach(ca: &Value) -> CloseApproach {
    CloseApproach {
        date: ca
            .get("cd")
            .or_else(|| ca.get("date"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        distance_au: ca.get("dist").and_then(as_number),
        velocity_km_s: ca.get("v_rel").and_then(as_number),
        body: ca.get("body").and_then(Value::as_str).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apophis() -> Value {
        json!({
            "signature": {"version": "1.3", "source": "NASA/JPL Small-Body Database"},
            "object": {"des": "99942", "fullname": "99942 Apophis (2004 MN4)", "pha": true},
            "orbit": {"elements": [
                {"name": "e", "value": ".1911"},
                {"name": "a", "value": ".9224"},
                {"name": "i", "value": "3.339"}
            ]},
            "phys_par": [
                {"name": "diameter", "value": "0.34"},
                {"name": "spec_B", "value": "Sq"},
                {"name": "H", "value": "19.09"}
            ],
            "ca_data": [
                {"cd": "2029-Apr-13 21:46", "dist": "0.000254", "v_rel": "7.42", "body": "Earth"},
                {"cd": "2036-Mar-27 10:12", "dist": "0.3", "v_rel": "5.1", "body": "Earth"}
            ]
        })
    }

    #[test]
    fn test_parse_array_phys_par() {
        let asteroid = parse_sbdb_response(&apophis(), "Apophis").unwrap();
        assert_eq!(asteroid.catalog_id, "99942");
        assert!((asteroid.diameter_m - 340.0).abs() < 1e-9);
        assert!((asteroid.velocity_ms - 7420.0).abs() < 1e-9);
        assert_eq!(asteroid.composition, Some(Composition::Stony));
        assert!(asteroid.is_potentially_hazardous);
        assert_eq!(asteroid.close_approaches.len(), 2);
        assert_eq!(asteroid.close_approaches[0].date, "2029-Apr-13 21:46");
        let orbit = asteroid.orbital.unwrap();
        assert_eq!(orbit.eccentricity, Some(0.1911));
        assert!(asteroid.mass_kg.is_none());
        assert_eq!(asteroid.source, SBDB_SOURCE_ID);
    }

    #[test]
    fn test_parse_object_phys_par() {
        let body = json!({
            "object": {"des": "101955", "pha": "Y", "a": "1.126", "e": "0.2037"},
            "phys_par": {"diameter": 0.49, "mass": "7.329e10", "spec_B": "B"},
            "ca_data": [{"date": "2135-Sep-25", "dist": "0.0013", "v_rel": "6.1", "body": "Earth"}]
        });
        let asteroid = parse_sbdb_response(&body, "Bennu").unwrap();
        assert!((asteroid.diameter_m - 490.0).abs() < 1e-9);
        assert_eq!(asteroid.mass_kg, Some(7.329e10));
        assert_eq!(asteroid.composition, Some(Composition::Carbonaceous));
        assert!(asteroid.is_potentially_hazardous);
        assert_eq!(asteroid.orbital.unwrap().semi_major_axis_au, Some(1.126));
    }

    #[test]
    fn test_close_approaches_truncated() {
        let mut body = apophis();
        body["ca_data"] = Value::Array(
            (0..8)
                .map(|i| json!({"cd": format!("20{}0", i), "v_rel": "5.0"}))
                .collect(),
        );
        let asteroid = parse_sbdb_response(&body, "Apophis").unwrap();
        assert_eq!(asteroid.close_approaches.len(), 5);
    }

    #[test]
    fn test_missing_diameter() {
        let mut body = apophis();
        body["phys_par"] = json!([{"name": "H", "value": "19.09"}]);
        let err = parse_sbdb_response(&body, "Apophis").unwrap_err();
        assert!(matches!(err, SourceError::MissingField { ref field, .. } if field == "phys_par.diameter"));
        assert_eq!(err.data_source(), SBDB_SOURCE_ID);
    }

    #[test]
    fn test_missing_velocity() {
        let mut body = apophis();
        body["ca_data"] = json!([]);
        let err = parse_sbdb_response(&body, "Apophis").unwrap_err();
        assert!(matches!(err, SourceError::MissingField { ref field, .. } if field == "ca_data[0].v_rel"));
    }

    #[test]
    fn test_missing_object() {
        let err = parse_sbdb_response(&json!({"phys_par": {}}), "X").unwrap_err();
        assert!(matches!(err, SourceError::MissingField { ref field, .. } if field == "object"));
    }

    #[test]
    fn test_not_found_message() {
        let body = json!({"message": "specified object was not found", "code": "200"});
        let err = parse_sbdb_response(&body, "Nonexistent").unwrap_err();
        assert!(matches!(err, SourceError::NotFound { ref query, .. } if query == "Nonexistent"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_lookup_url_encodes_name() {
        let source = JplSbdbSource::with_client(reqwest::Client::new(), SBDB_TIMEOUT);
        let url = source.lookup_url("2004 MN4").unwrap();
        assert_eq!(url.host_str(), Some("ssd-api.jpl.nasa.gov"));
        let query = url.query().unwrap();
        assert!(query.contains("sstr=2004+MN4"));
        assert!(query.contains("phys-par=1"));
        assert!(query.contains("ca-data=1"));
    }

    #[tokio::test]
    async fn test_timeout_reports_configured_duration() {
        // Accept connections and never answer.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let source = JplSbdbSource::with_timeout(Duration::from_millis(100))
            .unwrap()
            .with_base_url(format!("http://{}/sbdb.api", addr));
        assert_eq!(source.timeout(), Duration::from_millis(100));

        let err = source.fetch_asteroid("Apophis").await.unwrap_err();
        match err {
            SourceError::Timeout { data_source, timeout } => {
                assert_eq!(data_source, SBDB_SOURCE_ID);
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
