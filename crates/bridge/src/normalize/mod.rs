// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalization of raw upstream telemetry into the canonical event model.
//!
//! One pure function per event type. Each takes the JSON bodies of the
//! endpoint group that feeds the type (composite types receive several
//! parts) and returns the canonical payload, or an error that skips the
//! publish for that tick.

mod actors;
mod power;
mod production;
mod status;
mod world;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::EventType;

/// World position as reported by the upstream map API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub rotation: f64,
}

/// An item quantity inside an inventory-like container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStack {
    pub item_name: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawItemStack {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Amount", default)]
    pub amount: i64,
}

impl From<RawItemStack> for ItemStack {
    fn from(raw: RawItemStack) -> Self {
        Self { item_name: raw.name, amount: raw.amount }
    }
}

/// Dispatch to the per-type normalizer. `parts` carries one body per
/// endpoint in the type's group, in schedule order.
pub fn normalize(ty: EventType, parts: &[Value]) -> anyhow::Result<Value> {
    let canonical = match ty {
        EventType::Status => status::status(one(ty, parts)?)?,
        EventType::Circuits => power::circuits(one(ty, parts)?)?,
        EventType::GeneratorStats => power::generator_stats(one(ty, parts)?)?,
        EventType::FactoryStats => production::factory_stats(one(ty, parts)?)?,
        EventType::ProdStats => production::prod_stats(one(ty, parts)?)?,
        EventType::SinkStats => production::sink_stats(one(ty, parts)?)?,
        EventType::Players => actors::players(one(ty, parts)?)?,
        EventType::Machines => {
            let [m, p] = two(ty, parts)?;
            actors::machines(m, p)?
        }
        EventType::Vehicles => {
            let [v, f] = two(ty, parts)?;
            actors::vehicles(v, f)?
        }
        EventType::VehicleStations => actors::vehicle_stations(one(ty, parts)?)?,
        EventType::Tractors => actors::wheeled(one(ty, parts)?)?,
        EventType::Explorers => actors::wheeled(one(ty, parts)?)?,
        EventType::Storages => actors::storages(one(ty, parts)?)?,
        EventType::Belts => world::spline_segments(one(ty, parts)?)?,
        EventType::Pipes => world::spline_segments(one(ty, parts)?)?,
        EventType::Hypertubes => world::spline_segments(one(ty, parts)?)?,
        EventType::TrainRails => world::spline_segments(one(ty, parts)?)?,
        EventType::Cables => world::spline_segments(one(ty, parts)?)?,
        EventType::VehiclePaths => world::vehicle_paths(one(ty, parts)?)?,
        EventType::ResourceNodes => world::resource_nodes(one(ty, parts)?)?,
        EventType::RadarTowers => world::radar_towers(one(ty, parts)?)?,
        EventType::Schematics => world::schematics(one(ty, parts)?)?,
        EventType::SpaceElevator => world::space_elevator(one(ty, parts)?)?,
        EventType::Hub => world::hub(one(ty, parts)?)?,
        EventType::SessionUpdate | EventType::ApiStatus => {
            bail!("{ty} is produced internally, not normalized from upstream")
        }
    };
    Ok(canonical)
}

fn one<'a>(ty: EventType, parts: &'a [Value]) -> anyhow::Result<&'a Value> {
    match parts {
        [single] => Ok(single),
        _ => bail!("{ty}: expected 1 endpoint body, got {}", parts.len()),
    }
}

fn two<'a>(ty: EventType, parts: &'a [Value]) -> anyhow::Result<[&'a Value; 2]> {
    match parts {
        [a, b] => Ok([a, b]),
        _ => bail!("{ty}: expected 2 endpoint bodies, got {}", parts.len()),
    }
}

/// Deserialize a raw list body, with context naming the event type.
pub(crate) fn raw_list<T: serde::de::DeserializeOwned>(
    ty: &'static str,
    body: &Value,
) -> anyhow::Result<Vec<T>> {
    serde_json::from_value(body.clone()).with_context(|| format!("{ty}: malformed upstream list"))
}

pub(crate) fn to_value<T: Serialize>(records: T) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(records)?)
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
