// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Moving and stateful actors: players, machines, vehicles, storages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{raw_list, to_value, ItemStack, Location, RawItemStack};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub health: f64,
    pub location: Location,
    pub is_online: bool,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "PlayerHP", default)]
    player_hp: f64,
    #[serde(default)]
    location: Location,
    #[serde(rename = "Online", default)]
    online: bool,
}

pub fn players(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawPlayer> = raw_list("players", body)?;
    let canonical: Vec<Player> = raw
        .into_iter()
        .map(|p| Player {
            id: p.id,
            name: p.name,
            health: p.player_hp,
            location: p.location,
            is_online: p.online,
        })
        .collect();
    to_value(canonical)
}

/// A production building, joined with its power sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: i64,
    pub class_name: String,
    pub name: String,
    pub location: Location,
    pub is_producing: bool,
    pub efficiency: f64,
    pub power_consumption: f64,
    pub max_power_consumption: f64,
}

#[derive(Debug, Deserialize)]
struct RawMachine {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "ClassName", default)]
    class_name: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(default)]
    location: Location,
    #[serde(rename = "IsProducing", default)]
    is_producing: bool,
    #[serde(rename = "Productivity", default)]
    productivity: f64,
}

#[derive(Debug, Deserialize)]
struct RawMachinePower {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "PowerConsumed", default)]
    power_consumed: f64,
    #[serde(rename = "MaxPowerConsumed", default)]
    max_power_consumed: f64,
}

/// Composite: the machine list joined with the power sample by actor id.
/// Machines missing from the power body keep zeroed power fields.
pub fn machines(machine_body: &Value, power_body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawMachine> = raw_list("machines", machine_body)?;
    let power: Vec<RawMachinePower> = raw_list("machines", power_body)?;
    let by_id: HashMap<i64, &RawMachinePower> = power.iter().map(|p| (p.id, p)).collect();
    let canonical: Vec<Machine> = raw
        .into_iter()
        .map(|m| {
            let sample = by_id.get(&m.id);
            Machine {
                id: m.id,
                class_name: m.class_name,
                name: m.name,
                location: m.location,
                is_producing: m.is_producing,
                efficiency: m.productivity,
                power_consumption: sample.map_or(0.0, |s| s.power_consumed),
                max_power_consumption: sample.map_or(0.0, |s| s.max_power_consumed),
            }
        })
        .collect();
    to_value(canonical)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i64,
    pub vehicle_type: String,
    pub location: Location,
    pub speed: f64,
    pub autopilot: bool,
    pub fuel_type: String,
    pub fuel_amount: f64,
}

#[derive(Debug, Deserialize)]
struct RawVehicle {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(default)]
    location: Location,
    #[serde(rename = "ForwardSpeed", default)]
    forward_speed: f64,
    #[serde(rename = "AutoPilot", default)]
    autopilot: bool,
}

#[derive(Debug, Deserialize)]
struct RawVehicleFuel {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "FuelType", default)]
    fuel_type: String,
    #[serde(rename = "FuelAmount", default)]
    fuel_amount: f64,
}

/// Composite: the vehicle list joined with the fuel sample by actor id.
pub fn vehicles(vehicle_body: &Value, fuel_body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawVehicle> = raw_list("vehicles", vehicle_body)?;
    let fuel: Vec<RawVehicleFuel> = raw_list("vehicles", fuel_body)?;
    let by_id: HashMap<i64, &RawVehicleFuel> = fuel.iter().map(|f| (f.id, f)).collect();
    let canonical: Vec<Vehicle> = raw
        .into_iter()
        .map(|v| {
            let sample = by_id.get(&v.id);
            Vehicle {
                id: v.id,
                vehicle_type: v.name,
                location: v.location,
                speed: v.forward_speed,
                autopilot: v.autopilot,
                fuel_type: sample.map_or_else(String::new, |s| s.fuel_type.clone()),
                fuel_amount: sample.map_or(0.0, |s| s.fuel_amount),
            }
        })
        .collect();
    to_value(canonical)
}

/// Single-endpoint wheeled vehicles (tractors, explorers) share the
/// vehicle shape without the fuel join.
pub fn wheeled(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawVehicle> = raw_list("vehicles", body)?;
    let canonical: Vec<Vehicle> = raw
        .into_iter()
        .map(|v| Vehicle {
            id: v.id,
            vehicle_type: v.name,
            location: v.location,
            speed: v.forward_speed,
            autopilot: v.autopilot,
            fuel_type: String::new(),
            fuel_amount: 0.0,
        })
        .collect();
    to_value(canonical)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStation {
    pub id: i64,
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Deserialize)]
struct RawVehicleStation {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(default)]
    location: Location,
}

pub fn vehicle_stations(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawVehicleStation> = raw_list("vehicleStations", body)?;
    let canonical: Vec<VehicleStation> = raw
        .into_iter()
        .map(|s| VehicleStation { id: s.id, name: s.name, location: s.location })
        .collect();
    to_value(canonical)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    pub id: i64,
    pub name: String,
    pub location: Location,
    pub inventory: Vec<ItemStack>,
}

#[derive(Debug, Deserialize)]
struct RawStorage {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(default)]
    location: Location,
    #[serde(rename = "Inventory", default)]
    inventory: Vec<RawItemStack>,
}

pub fn storages(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawStorage> = raw_list("storages", body)?;
    let canonical: Vec<Storage> = raw
        .into_iter()
        .map(|s| Storage {
            id: s.id,
            name: s.name,
            location: s.location,
            inventory: s.inventory.into_iter().map(ItemStack::from).collect(),
        })
        .collect();
    to_value(canonical)
}
