// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::normalize;
use crate::model::EventType;

#[test]
fn circuits_maps_fields_and_tolerates_missing_optionals() {
    let body = json!([
        {"CircuitID": 1, "PowerProduction": 120.0, "PowerConsumed": 80.5, "FuseTriggered": true},
        {"CircuitID": 2}
    ]);
    let out = normalize(EventType::Circuits, &[body]).expect("normalize");
    let list = out.as_array().expect("list");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], 1);
    assert_eq!(list[0]["powerConsumption"], 80.5);
    assert_eq!(list[0]["fuseTriggered"], true);
    assert_eq!(list[1]["powerProduction"], 0.0);
}

#[test]
fn circuits_rejects_non_list_body() {
    let err = normalize(EventType::Circuits, &[json!({"CircuitID": 1})]).unwrap_err();
    assert!(err.to_string().contains("circuits"));
}

#[test]
fn generator_stats_aggregates_by_class() {
    let body = json!([
        {"ClassName": "Coal", "BaseProd": 75.0, "CurrentPotential": 1.0, "FuelAmount": 10.0},
        {"ClassName": "Coal", "BaseProd": 75.0, "CurrentPotential": 0.5, "FuelAmount": 5.0},
        {"ClassName": "Biomass", "BaseProd": 30.0}
    ]);
    let out = normalize(EventType::GeneratorStats, &[body]).expect("normalize");
    let list = out.as_array().expect("list");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["generatorType"], "Biomass");
    assert_eq!(list[1]["generatorType"], "Coal");
    assert_eq!(list[1]["count"], 2);
    assert_eq!(list[1]["powerProduction"], 75.0 + 37.5);
}

#[test]
fn factory_stats_counts_producing_and_idle() {
    let body = json!([
        {"ClassName": "Smelter", "IsProducing": true, "Productivity": 1.0},
        {"ClassName": "Smelter", "IsProducing": false, "Productivity": 0.0},
        {"ClassName": "Constructor", "IsProducing": true, "Productivity": 0.5}
    ]);
    let out = normalize(EventType::FactoryStats, &[body]).expect("normalize");
    let list = out.as_array().expect("list");
    let smelter = list
        .iter()
        .find(|s| s["machineClass"] == "Smelter")
        .expect("smelter entry");
    assert_eq!(smelter["count"], 2);
    assert_eq!(smelter["producing"], 1);
    assert_eq!(smelter["idle"], 1);
    assert_eq!(smelter["averageEfficiency"], 0.5);
}

#[test]
fn machines_join_power_by_actor_id() {
    let machines = json!([
        {"ID": 7, "ClassName": "Assembler", "IsProducing": true},
        {"ID": 8, "ClassName": "Assembler"}
    ]);
    let power = json!([
        {"ID": 7, "PowerConsumed": 15.0, "MaxPowerConsumed": 16.0}
    ]);
    let out = normalize(EventType::Machines, &[machines, power]).expect("normalize");
    let list = out.as_array().expect("list");
    assert_eq!(list[0]["powerConsumption"], 15.0);
    // Missing power sample falls back to zero rather than failing the tick.
    assert_eq!(list[1]["powerConsumption"], 0.0);
}

#[test]
fn machines_requires_both_parts() {
    let err = normalize(EventType::Machines, &[json!([])]).unwrap_err();
    assert!(err.to_string().contains("expected 2"));
}

#[test]
fn vehicles_join_fuel_by_actor_id() {
    let vehicles = json!([
        {"ID": 1, "Name": "Truck", "ForwardSpeed": 42.0, "AutoPilot": true}
    ]);
    let fuel = json!([
        {"ID": 1, "FuelType": "Coal", "FuelAmount": 12.0}
    ]);
    let out = normalize(EventType::Vehicles, &[vehicles, fuel]).expect("normalize");
    let list = out.as_array().expect("list");
    assert_eq!(list[0]["vehicleType"], "Truck");
    assert_eq!(list[0]["fuelType"], "Coal");
    assert_eq!(list[0]["speed"], 42.0);
}

#[test]
fn status_is_a_single_object() {
    let body = json!({"IsGameRunning": true, "TechTier": 4, "GamePhase": "Phase 2"});
    let out = normalize(EventType::Status, &[body]).expect("normalize");
    assert_eq!(out["isGameRunning"], true);
    assert_eq!(out["techTier"], 4);
    assert_eq!(out["isGamePaused"], false);
}

#[test]
fn storages_map_inventories() {
    let body = json!([
        {"ID": 3, "Name": "Container", "Inventory": [{"Name": "Iron Plate", "Amount": 100}]}
    ]);
    let out = normalize(EventType::Storages, &[body]).expect("normalize");
    assert_eq!(out[0]["inventory"][0]["itemName"], "Iron Plate");
    assert_eq!(out[0]["inventory"][0]["amount"], 100);
}

#[test]
fn internal_types_are_not_normalized() {
    assert!(normalize(EventType::ApiStatus, &[json!({})]).is_err());
    assert!(normalize(EventType::SessionUpdate, &[json!({})]).is_err());
}
