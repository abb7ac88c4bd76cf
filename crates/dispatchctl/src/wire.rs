//! Response normalization for the dispatch service endpoints.
//!
//! Each endpoint has one canonical schema here. Historical shapes
//! (positional arrays, records serialized into a string) are converted to
//! named fields at this boundary. Anything else is a ParseFailure.

use dispatch_shared::{
    Attributes, Coord, DispatchError, DispatchResult, Facility, FacilityLookup, Incident,
    Responder, ResponderLookup, RoutePath, Zone,
};
use serde::Deserialize;
use serde_json::Value;

const LATITUDE_KEYS: &[&str] = &["latitude", "Latitude", "lat"];
const LONGITUDE_KEYS: &[&str] = &["longitude", "Longitude", "lon", "lng"];

/// Positional ambulance record: `[id, longitude, latitude, ...rest]`.
const AMBULANCE_ID_IDX: usize = 0;
const AMBULANCE_LON_IDX: usize = 1;
const AMBULANCE_LAT_IDX: usize = 2;

/// Positional hospital record: `[name, _, _, latitude, longitude, ...rest]`.
const HOSPITAL_NAME_IDX: usize = 0;
const HOSPITAL_LAT_IDX: usize = 3;
const HOSPITAL_LON_IDX: usize = 4;

fn parse_err(msg: impl Into<String>) -> DispatchError {
    DispatchError::ParseFailure(msg.into())
}

/// Numbers may arrive as JSON numbers or numeric strings (CSV exports).
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field<'a, 'k>(obj: &'a Attributes, keys: &[&'k str]) -> Option<(&'k str, &'a Value)> {
    keys.iter().find_map(|k| obj.get(*k).map(|v| (*k, v)))
}

/// Pull a named coordinate out of `obj`, leaving other fields as attributes.
fn take_coord(obj: &Attributes, what: &str) -> DispatchResult<(Coord, Attributes)> {
    let (lat_key, lat) = field(obj, LATITUDE_KEYS)
        .ok_or_else(|| parse_err(format!("{} record has no latitude", what)))?;
    let (lon_key, lon) = field(obj, LONGITUDE_KEYS)
        .ok_or_else(|| parse_err(format!("{} record has no longitude", what)))?;
    let lat = as_f64(lat).ok_or_else(|| parse_err(format!("{} latitude is not a number", what)))?;
    let lon = as_f64(lon).ok_or_else(|| parse_err(format!("{} longitude is not a number", what)))?;

    let coord = Coord::new(lat, lon);
    if !coord.is_valid() {
        return Err(parse_err(format!("{} coordinate out of range: {}", what, coord)));
    }

    let mut rest = obj.clone();
    rest.remove(lat_key);
    rest.remove(lon_key);
    Ok((coord, rest))
}

fn positional_rest(items: &[Value], skip: &[usize]) -> Attributes {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| !skip.contains(i))
        .map(|(i, v)| (format!("field_{}", i), v.clone()))
        .collect()
}

/// True for the shapes the service uses to say "nothing here".
fn is_empty_record(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ============================================================================
// /get_event_data
// ============================================================================

pub fn parse_incidents(body: &Value) -> DispatchResult<Vec<Incident>> {
    let items = body
        .as_array()
        .ok_or_else(|| parse_err("incident list is not an array"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let obj = item
                .as_object()
                .ok_or_else(|| parse_err(format!("incident {} is not an object", i)))?;
            let (position, attributes) = take_coord(obj, "incident")?;
            Ok(Incident {
                position,
                attributes,
            })
        })
        .collect()
}

// ============================================================================
// /classify_zone
// ============================================================================

#[derive(Debug, Deserialize)]
struct ZoneBody {
    zone_type: Option<Value>,
}

pub fn parse_zone(body: &Value) -> DispatchResult<Zone> {
    if !body.is_object() {
        return Err(parse_err("zone response is not an object"));
    }
    let zone: ZoneBody = serde_json::from_value(body.clone())?;
    zone.zone_type
        .as_ref()
        .and_then(as_label)
        .map(Zone::new)
        .ok_or_else(|| parse_err("zone_type missing or empty"))
}

// ============================================================================
// /get_ambulance_data
// ============================================================================

pub fn parse_responder_lookup(body: &Value) -> DispatchResult<ResponderLookup> {
    let obj = match body {
        // Older services answer with the bare record and no radius.
        Value::Array(_) => return bare_responder(body),
        Value::Object(obj) => obj,
        _ => return Err(parse_err("ambulance response is neither an object nor an array")),
    };

    let radius_km = match obj.get("radius") {
        None | Some(Value::Null) => None,
        Some(v) => Some(as_f64(v).ok_or_else(|| parse_err("radius is not a number"))?),
    };

    let raw = obj
        .get("ambulance_data")
        .ok_or_else(|| parse_err("ambulance_data missing"))?;

    // The record is usually serialized into a string.
    let record = match raw {
        Value::String(s) if !s.trim().is_empty() => serde_json::from_str::<Value>(s)
            .map_err(|e| parse_err(format!("ambulance_data is not valid JSON: {}", e)))?,
        other => other.clone(),
    };

    if is_empty_record(&record) {
        return Ok(ResponderLookup::NotFound { radius_km });
    }

    Ok(ResponderLookup::Found {
        responder: parse_responder(&record)?,
        radius_km,
    })
}

fn bare_responder(record: &Value) -> DispatchResult<ResponderLookup> {
    if is_empty_record(record) {
        return Ok(ResponderLookup::NotFound { radius_km: None });
    }
    Ok(ResponderLookup::Found {
        responder: parse_responder(record)?,
        radius_km: None,
    })
}

fn parse_responder(record: &Value) -> DispatchResult<Responder> {
    match record {
        Value::Array(items) => {
            if items.len() <= AMBULANCE_LAT_IDX {
                return Err(parse_err(format!(
                    "ambulance record has {} fields, need id, longitude and latitude",
                    items.len()
                )));
            }
            let id = as_label(&items[AMBULANCE_ID_IDX])
                .ok_or_else(|| parse_err("ambulance id is empty"))?;
            let lon = as_f64(&items[AMBULANCE_LON_IDX])
                .ok_or_else(|| parse_err("ambulance longitude is not a number"))?;
            let lat = as_f64(&items[AMBULANCE_LAT_IDX])
                .ok_or_else(|| parse_err("ambulance latitude is not a number"))?;
            let position = Coord::new(lat, lon);
            if !position.is_valid() {
                return Err(parse_err(format!("ambulance coordinate out of range: {}", position)));
            }
            Ok(Responder {
                id,
                position,
                attributes: positional_rest(
                    items,
                    &[AMBULANCE_ID_IDX, AMBULANCE_LON_IDX, AMBULANCE_LAT_IDX],
                ),
            })
        }
        Value::Object(obj) => {
            let (id_key, id) = field(obj, &["id", "ID", "ambulance_id"])
                .ok_or_else(|| parse_err("ambulance record has no id"))?;
            let id = as_label(id).ok_or_else(|| parse_err("ambulance id is empty"))?;
            let (position, mut attributes) = take_coord(obj, "ambulance")?;
            attributes.remove(id_key);
            Ok(Responder {
                id,
                position,
                attributes,
            })
        }
        _ => Err(parse_err("ambulance record is neither an array nor an object")),
    }
}

// ============================================================================
// /get_hospital_data
// ============================================================================

pub fn parse_facility_lookup(body: &Value) -> DispatchResult<FacilityLookup> {
    if is_empty_record(body) {
        return Ok(FacilityLookup::NotFound);
    }

    let facility = match body {
        Value::Array(items) => {
            if items.len() <= HOSPITAL_LON_IDX {
                return Err(parse_err(format!(
                    "hospital record has {} fields, need name, latitude and longitude",
                    items.len()
                )));
            }
            let name = as_label(&items[HOSPITAL_NAME_IDX])
                .ok_or_else(|| parse_err("hospital name is empty"))?;
            let lat = as_f64(&items[HOSPITAL_LAT_IDX])
                .ok_or_else(|| parse_err("hospital latitude is not a number"))?;
            let lon = as_f64(&items[HOSPITAL_LON_IDX])
                .ok_or_else(|| parse_err("hospital longitude is not a number"))?;
            let position = Coord::new(lat, lon);
            if !position.is_valid() {
                return Err(parse_err(format!("hospital coordinate out of range: {}", position)));
            }
            Facility {
                name,
                position,
                attributes: positional_rest(
                    items,
                    &[HOSPITAL_NAME_IDX, HOSPITAL_LAT_IDX, HOSPITAL_LON_IDX],
                ),
            }
        }
        Value::Object(obj) => {
            let (name_key, name) = field(obj, &["name", "Name", "hospital_name"])
                .ok_or_else(|| parse_err("hospital record has no name"))?;
            let name = as_label(name).ok_or_else(|| parse_err("hospital name is empty"))?;
            let (position, mut attributes) = take_coord(obj, "hospital")?;
            attributes.remove(name_key);
            Facility {
                name,
                position,
                attributes,
            }
        }
        _ => return Err(parse_err("hospital record is neither an array nor an object")),
    };

    Ok(FacilityLookup::Found(facility))
}

// ============================================================================
// /get_shortest_path
// ============================================================================

#[derive(Debug, Deserialize)]
struct RouteBody {
    #[serde(rename = "shortestPathCoordinates")]
    coordinates: Option<Vec<[f64; 2]>>,
    distance: Option<f64>,
}

/// Parse a route. An absent or empty path means the router found none.
pub fn parse_route(body: &Value) -> DispatchResult<RoutePath> {
    if !body.is_object() {
        return Err(parse_err("route response is not an object"));
    }
    let route: RouteBody = serde_json::from_value(body.clone())?;
    let coordinates = route
        .coordinates
        .ok_or_else(|| DispatchError::RoutingUnavailable("no path between points".to_string()))?;
    let distance = route
        .distance
        .ok_or_else(|| DispatchError::RoutingUnavailable("no distance for path".to_string()))?;

    let waypoints: Vec<Coord> = coordinates.into_iter().map(Coord::from).collect();
    if let Some(bad) = waypoints.iter().find(|c| !c.is_valid()) {
        return Err(parse_err(format!("waypoint out of range: {}", bad)));
    }
    RoutePath::new(waypoints, distance)
}
