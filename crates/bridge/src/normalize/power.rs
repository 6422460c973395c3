// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Power-grid telemetry: circuits and generator output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{raw_list, to_value};

/// One power circuit with production, consumption, and battery state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub id: i64,
    pub power_production: f64,
    pub power_consumption: f64,
    pub power_capacity: f64,
    pub battery_capacity: f64,
    pub battery_percent: f64,
    pub battery_time_empty: f64,
    pub fuse_triggered: bool,
}

#[derive(Debug, Deserialize)]
struct RawCircuit {
    #[serde(rename = "CircuitID")]
    id: i64,
    #[serde(rename = "PowerProduction", default)]
    power_production: f64,
    #[serde(rename = "PowerConsumed", default)]
    power_consumed: f64,
    #[serde(rename = "PowerCapacity", default)]
    power_capacity: f64,
    #[serde(rename = "BatteryCapacity", default)]
    battery_capacity: f64,
    #[serde(rename = "BatteryPercent", default)]
    battery_percent: f64,
    #[serde(rename = "BatteryTimeEmpty", default)]
    battery_time_empty: f64,
    #[serde(rename = "FuseTriggered", default)]
    fuse_triggered: bool,
}

pub fn circuits(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawCircuit> = raw_list("circuits", body)?;
    let canonical: Vec<Circuit> = raw
        .into_iter()
        .map(|c| Circuit {
            id: c.id,
            power_production: c.power_production,
            power_consumption: c.power_consumed,
            power_capacity: c.power_capacity,
            battery_capacity: c.battery_capacity,
            battery_percent: c.battery_percent,
            battery_time_empty: c.battery_time_empty,
            fuse_triggered: c.fuse_triggered,
        })
        .collect();
    to_value(canonical)
}

/// Aggregate output for one generator class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorGroup {
    pub generator_type: String,
    pub count: i64,
    pub power_production: f64,
    pub fuel_amount: f64,
}

#[derive(Debug, Deserialize)]
struct RawGenerator {
    #[serde(rename = "ClassName")]
    class_name: String,
    #[serde(rename = "BaseProd", default)]
    base_prod: f64,
    #[serde(rename = "CurrentPotential", default)]
    current_potential: f64,
    #[serde(rename = "FuelAmount", default)]
    fuel_amount: f64,
}

/// Collapse the per-building generator list into per-class aggregates.
pub fn generator_stats(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawGenerator> = raw_list("generatorStats", body)?;
    let mut groups: Vec<GeneratorGroup> = Vec::new();
    for gen in raw {
        let produced = gen.base_prod * if gen.current_potential > 0.0 {
            gen.current_potential
        } else {
            1.0
        };
        match groups.iter_mut().find(|g| g.generator_type == gen.class_name) {
            Some(group) => {
                group.count += 1;
                group.power_production += produced;
                group.fuel_amount += gen.fuel_amount;
            }
            None => groups.push(GeneratorGroup {
                generator_type: gen.class_name,
                count: 1,
                power_production: produced,
                fuel_amount: gen.fuel_amount,
            }),
        }
    }
    groups.sort_by(|a, b| a.generator_type.cmp(&b.generator_type));
    to_value(groups)
}
