// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Production telemetry: per-item rates, factory aggregates, sink points.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{raw_list, to_value};

/// Production/consumption rates for one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProdStat {
    pub item_name: String,
    pub produced_per_min: f64,
    pub consumed_per_min: f64,
    pub production_efficiency: f64,
    pub consumption_efficiency: f64,
}

#[derive(Debug, Deserialize)]
struct RawProdStat {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "CurrentProd", default)]
    current_prod: f64,
    #[serde(rename = "CurrentConsumed", default)]
    current_consumed: f64,
    #[serde(rename = "ProdPercent", default)]
    prod_percent: f64,
    #[serde(rename = "ConsPercent", default)]
    cons_percent: f64,
}

pub fn prod_stats(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawProdStat> = raw_list("prodStats", body)?;
    let canonical: Vec<ProdStat> = raw
        .into_iter()
        .map(|p| ProdStat {
            item_name: p.name,
            produced_per_min: p.current_prod,
            consumed_per_min: p.current_consumed,
            production_efficiency: p.prod_percent,
            consumption_efficiency: p.cons_percent,
        })
        .collect();
    to_value(canonical)
}

/// Aggregate state of one machine class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryStat {
    pub machine_class: String,
    pub count: i64,
    pub producing: i64,
    pub idle: i64,
    pub average_efficiency: f64,
}

#[derive(Debug, Deserialize)]
struct RawFactoryMachine {
    #[serde(rename = "ClassName")]
    class_name: String,
    #[serde(rename = "IsProducing", default)]
    is_producing: bool,
    #[serde(rename = "Productivity", default)]
    productivity: f64,
}

/// Collapse the per-building factory list into per-class aggregates.
pub fn factory_stats(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawFactoryMachine> = raw_list("factoryStats", body)?;
    let mut stats: Vec<(FactoryStat, f64)> = Vec::new();
    for machine in raw {
        let idx = match stats.iter().position(|(s, _)| s.machine_class == machine.class_name) {
            Some(i) => i,
            None => {
                stats.push((
                    FactoryStat { machine_class: machine.class_name.clone(), ..Default::default() },
                    0.0,
                ));
                stats.len() - 1
            }
        };
        let entry = &mut stats[idx];
        entry.0.count += 1;
        if machine.is_producing {
            entry.0.producing += 1;
        } else {
            entry.0.idle += 1;
        }
        entry.1 += machine.productivity;
    }
    let canonical: Vec<FactoryStat> = stats
        .into_iter()
        .map(|(mut stat, total_productivity)| {
            stat.average_efficiency = total_productivity / stat.count as f64;
            stat
        })
        .collect();
    to_value(canonical)
}

/// Awesome-sink ledger for one sink building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkStat {
    pub total_points: i64,
    pub points_per_min: f64,
    pub coupons_claimed: i64,
    pub next_coupon_progress: f64,
}

#[derive(Debug, Deserialize)]
struct RawSink {
    #[serde(rename = "TotalPoints", default)]
    total_points: i64,
    #[serde(rename = "PointsPerMinute", default)]
    points_per_minute: f64,
    #[serde(rename = "NumCoupon", default)]
    num_coupon: i64,
    #[serde(rename = "Percent", default)]
    percent: f64,
}

pub fn sink_stats(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawSink> = raw_list("sinkStats", body)?;
    let canonical: Vec<SinkStat> = raw
        .into_iter()
        .map(|s| SinkStat {
            total_points: s.total_points,
            points_per_min: s.points_per_minute,
            coupons_claimed: s.num_coupon,
            next_coupon_progress: s.percent,
        })
        .collect();
    to_value(canonical)
}
