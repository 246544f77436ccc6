//! CSV ingestion.
//!
//! Four files describe a CVRPTW run: locations with `HH:MM` loading windows,
//! orders, trucks and the travel matrix. A TSP run needs the travel matrix
//! only; its locations are the codes in order of first appearance.

use crate::error::{Result, RoutingError};
use crate::instance::{
    Location, Order, RoutingInstance, ServiceTimes, TravelCost, TravelMatrix, Vehicle,
};
use chrono::{NaiveTime, Timelike};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LocationRow {
    location_code: String,
    #[serde(rename = "location_loading_unloading_window_start")]
    window_start: Option<String>,
    #[serde(rename = "location_loading_unloading_window_end")]
    window_end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    #[serde(rename = "Destination Code")]
    destination: String,
    #[serde(rename = "Total Weight")]
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct TruckRow {
    truck_id: String,
    truck_max_weight: f64,
}

#[derive(Debug, Deserialize)]
struct TravelRow {
    source_location_code: String,
    destination_location_code: String,
    travel_distance_in_km: f64,
    travel_time_in_min: Option<f64>,
}

fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        log::error!("Cannot open {}: {}", path.display(), e);
        RoutingError::Io(e)
    })
}

/// Convert an `HH:MM` clock time to minutes since midnight
pub fn parse_clock(value: &str) -> Result<f64> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| RoutingError::Config(format!("invalid time '{}': {}", value, e)))?;
    Ok((time.hour() * 60 + time.minute()) as f64)
}

pub fn read_locations<R: Read>(reader: R) -> Result<Vec<Location>> {
    let mut locations = Vec::new();
    for row in read_rows::<LocationRow, _>(reader)? {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        let location = if blank(&row.window_start) && blank(&row.window_end) {
            Location::new(row.location_code)
        } else {
            let start = parse_clock(row.window_start.as_deref().unwrap_or_default())?;
            let end = parse_clock(row.window_end.as_deref().unwrap_or_default())?;
            Location::with_window(row.location_code, start, end)
        };
        locations.push(location);
    }
    Ok(locations)
}

pub fn read_orders<R: Read>(reader: R) -> Result<Vec<Order>> {
    Ok(read_rows::<OrderRow, _>(reader)?
        .into_iter()
        .map(|row| Order { destination: row.destination, weight: row.weight })
        .collect())
}

pub fn read_trucks<R: Read>(reader: R) -> Result<Vec<Vehicle>> {
    Ok(read_rows::<TruckRow, _>(reader)?
        .into_iter()
        .map(|row| Vehicle::new(row.truck_id, row.truck_max_weight))
        .collect())
}

/// Read the travel matrix rows against known location codes.
///
/// Rows naming unknown codes are rejected, and so are rows with a blank
/// travel time: time windows are checked against it. Missing pairs stay absent.
pub fn read_travel_matrix<R: Read>(reader: R, locations: &[Location]) -> Result<TravelMatrix> {
    let index: HashMap<&str, usize> = locations
        .iter()
        .enumerate()
        .map(|(i, l)| (l.code.as_str(), i))
        .collect();
    let lookup = |code: &str| {
        index
            .get(code)
            .copied()
            .ok_or_else(|| RoutingError::UnknownLocation(code.to_string()))
    };
    let mut matrix = TravelMatrix::new(locations.len());
    for row in read_rows::<TravelRow, _>(reader)? {
        let from = lookup(&row.source_location_code)?;
        let to = lookup(&row.destination_location_code)?;
        let time = row.travel_time_in_min.ok_or_else(|| {
            log::error!(
                "No travel time from {} to {}",
                row.source_location_code,
                row.destination_location_code
            );
            RoutingError::MissingTravelEntry {
                from: row.source_location_code.clone(),
                to: row.destination_location_code.clone(),
            }
        })?;
        matrix.insert(from, to, TravelCost::new(row.travel_distance_in_km, time));
    }
    Ok(matrix)
}

/// Build a TSP instance from a travel matrix alone.
///
/// The travel time column is optional here: a blank time takes the distance,
/// as the TSP objective and arrivals only need a consistent cumulative metric.
pub fn read_tsp<R: Read>(name: &str, reader: R, depot: Option<&str>) -> Result<RoutingInstance> {
    let rows = read_rows::<TravelRow, _>(reader)?;
    let mut locations: Vec<Location> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in &rows {
        for code in [&row.source_location_code, &row.destination_location_code] {
            if !index.contains_key(code) {
                index.insert(code.clone(), locations.len());
                locations.push(Location::new(code.clone()));
            }
        }
    }

    let mut matrix = TravelMatrix::new(locations.len());
    for row in &rows {
        let time = row.travel_time_in_min.unwrap_or(row.travel_distance_in_km);
        matrix.insert(
            index[&row.source_location_code],
            index[&row.destination_location_code],
            TravelCost::new(row.travel_distance_in_km, time),
        );
    }

    let depot = match depot {
        Some(code) => *index
            .get(code)
            .ok_or_else(|| RoutingError::UnknownLocation(code.to_string()))?,
        None => 0,
    };
    Ok(RoutingInstance::new(name, locations, depot, matrix))
}

/// Paths of the CSV files describing a CVRPTW run
#[derive(Debug, Clone)]
pub struct CvrptwFiles<'a> {
    pub locations: &'a Path,
    pub orders: &'a Path,
    pub trucks: &'a Path,
    pub matrix: &'a Path,
}

/// Load a CVRPTW instance. The depot defaults to the last listed location.
pub fn load_cvrptw(
    name: &str,
    files: &CvrptwFiles<'_>,
    depot: Option<&str>,
    service: ServiceTimes,
) -> Result<RoutingInstance> {
    let locations = read_locations(open(files.locations)?)?;
    if locations.is_empty() {
        return Err(RoutingError::Config(format!(
            "no locations in {}",
            files.locations.display()
        )));
    }
    let orders = read_orders(open(files.orders)?)?;
    let trucks = read_trucks(open(files.trucks)?)?;
    let travel = read_travel_matrix(open(files.matrix)?, &locations)?;

    let depot = match depot {
        Some(code) => locations
            .iter()
            .position(|l| l.code == code)
            .ok_or_else(|| RoutingError::UnknownLocation(code.to_string()))?,
        None => locations.len() - 1,
    };

    let instance = RoutingInstance::new(name, locations, depot, travel)
        .with_vehicles(trucks)
        .with_service_times(service)
        .with_orders(&orders)?;
    log::info!(
        "Loaded {}: {} locations, {} orders, {} trucks",
        instance.name,
        instance.dimension(),
        orders.len(),
        instance.vehicles.len()
    );
    Ok(instance)
}

pub fn load_tsp<P: AsRef<Path>>(path: P, depot: Option<&str>) -> Result<RoutingInstance> {
    let path = path.as_ref();
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("tsp");
    let instance = read_tsp(name, open(path)?, depot)?;
    log::info!("Loaded {}: {} locations", instance.name, instance.dimension());
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCATIONS: &str = "\
location_code,location_loading_unloading_window_start,location_loading_unloading_window_end
C1,08:00,09:30
C2,10:15,12:00
A123,06:00,20:00
";

    const HEADER: &str =
        "source_location_code,destination_location_code,travel_distance_in_km,travel_time_in_min";

    const MATRIX: &str = "\
source_location_code,destination_location_code,travel_distance_in_km,travel_time_in_min
C1,C2,12.5,20
C2,C1,12.5,22
C1,A123,30,45
A123,C1,30,45
C2,A123,18,25
A123,C2,18,25
";

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("08:00").unwrap(), 480.0);
        assert_eq!(parse_clock(" 23:59 ").unwrap(), 1439.0);
        assert!(matches!(parse_clock("25:00"), Err(RoutingError::Config(_))));
    }

    #[test]
    fn test_read_locations_with_windows() {
        let locations = read_locations(LOCATIONS.as_bytes()).unwrap();
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].code, "C1");
        let window = locations[1].window.unwrap();
        assert_eq!((window.start, window.end), (615.0, 720.0));
    }

    #[test]
    fn test_read_matrix_against_locations() {
        let locations = read_locations(LOCATIONS.as_bytes()).unwrap();
        let matrix = read_travel_matrix(MATRIX.as_bytes(), &locations).unwrap();
        assert_eq!(matrix.get(0, 1), Some(TravelCost::new(12.5, 20.0)));
        assert_eq!(matrix.get(1, 0), Some(TravelCost::new(12.5, 22.0)));
        assert_eq!(matrix.get(0, 0), None);

        let unknown = format!("{}\nC1,ZZ,1,1\n", HEADER);
        assert!(matches!(
            read_travel_matrix(unknown.as_bytes(), &locations),
            Err(RoutingError::UnknownLocation(code)) if code == "ZZ"
        ));
    }

    #[test]
    fn test_orders_and_trucks() {
        let orders = "Destination Code,Total Weight\nC1,120.5\nC1,30\nC2,80\n";
        let orders = read_orders(orders.as_bytes()).unwrap();
        assert_eq!(orders.len(), 3);
        let trucks = "truck_id,truck_max_weight\nT1,500\nT2,1000\n";
        let trucks = read_trucks(trucks.as_bytes()).unwrap();
        assert_eq!(trucks[1].id, "T2");
        assert_eq!(trucks[1].capacity, 1000.0);

        let locations = read_locations(LOCATIONS.as_bytes()).unwrap();
        let travel = read_travel_matrix(MATRIX.as_bytes(), &locations).unwrap();
        let inst = RoutingInstance::new("csv", locations, 2, travel)
            .with_vehicles(trucks)
            .with_orders(&orders)
            .unwrap();
        assert_eq!(inst.demands, vec![150.5, 80.0, 0.0]);
        assert!(inst.validate().is_ok());
        assert!(inst.validate_fleet().is_ok());
    }

    #[test]
    fn test_tsp_from_matrix_only() {
        let distances = "source_location_code,destination_location_code,travel_distance_in_km
P,Q,3
Q,P,3
P,R,4
R,P,4
Q,R,5
R,Q,5
";
        let inst = read_tsp("triangle", distances.as_bytes(), Some("Q")).unwrap();
        assert_eq!(inst.dimension(), 3);
        assert_eq!(inst.depot, 1);
        assert_eq!(inst.travel(2, 1).unwrap(), TravelCost::new(5.0, 5.0));
        assert!(inst.validate().is_ok());
        assert!(matches!(
            read_tsp("t", distances.as_bytes(), Some("X")),
            Err(RoutingError::UnknownLocation(_))
        ));

        // a blank time cell falls back to the distance
        let blank = format!("{}\nP,Q,3,\nQ,P,3,4\n", HEADER);
        let inst = read_tsp("pair", blank.as_bytes(), None).unwrap();
        assert_eq!(inst.travel(0, 1).unwrap(), TravelCost::new(3.0, 3.0));
        assert_eq!(inst.travel(1, 0).unwrap(), TravelCost::new(3.0, 4.0));
    }

    #[test]
    fn test_blank_travel_time_is_rejected_for_cvrptw() {
        let locations = read_locations(LOCATIONS.as_bytes()).unwrap();
        let matrix = format!("{}\nC2,C1,12.5,22\nC1,C2,120,\n", HEADER);
        let err = read_travel_matrix(matrix.as_bytes(), &locations).unwrap_err();
        assert!(matches!(
            err,
            RoutingError::MissingTravelEntry { ref from, ref to } if from == "C1" && to == "C2"
        ));
    }
}
