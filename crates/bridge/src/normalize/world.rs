// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semi-static world geometry and progression records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{raw_list, to_value, ItemStack, Location, RawItemStack};

/// A spline-laid connector: belt, pipe, hypertube, rail, or cable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplineSegment {
    pub id: i64,
    pub name: String,
    pub start: Location,
    pub end: Location,
    pub length: f64,
}

#[derive(Debug, Deserialize)]
struct RawSplineSegment {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(default)]
    location0: Location,
    #[serde(default)]
    location1: Location,
    #[serde(rename = "Length", default)]
    length: f64,
}

pub fn spline_segments(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawSplineSegment> = raw_list("splines", body)?;
    let canonical: Vec<SplineSegment> = raw
        .into_iter()
        .map(|s| SplineSegment {
            id: s.id,
            name: s.name,
            start: s.location0,
            end: s.location1,
            length: s.length,
        })
        .collect();
    to_value(canonical)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePath {
    pub id: i64,
    pub path_name: String,
    pub points: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct RawVehiclePath {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "PathPoints", default)]
    path_points: Vec<Location>,
}

pub fn vehicle_paths(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawVehiclePath> = raw_list("vehiclePaths", body)?;
    let canonical: Vec<VehiclePath> = raw
        .into_iter()
        .map(|p| VehiclePath { id: p.id, path_name: p.name, points: p.path_points })
        .collect();
    to_value(canonical)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: i64,
    pub resource: String,
    pub purity: String,
    pub location: Location,
    pub occupied: bool,
}

#[derive(Debug, Deserialize)]
struct RawResourceNode {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Purity", default)]
    purity: String,
    #[serde(default)]
    location: Location,
    #[serde(rename = "Exploited", default)]
    exploited: bool,
}

pub fn resource_nodes(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawResourceNode> = raw_list("resourceNodes", body)?;
    let canonical: Vec<ResourceNode> = raw
        .into_iter()
        .map(|n| ResourceNode {
            id: n.id,
            resource: n.name,
            purity: n.purity,
            location: n.location,
            occupied: n.exploited,
        })
        .collect();
    to_value(canonical)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarTower {
    pub id: i64,
    pub name: String,
    pub location: Location,
    pub reveal_radius: f64,
}

#[derive(Debug, Deserialize)]
struct RawRadarTower {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(default)]
    location: Location,
    #[serde(rename = "RevealRadius", default)]
    reveal_radius: f64,
}

pub fn radar_towers(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawRadarTower> = raw_list("radarTowers", body)?;
    let canonical: Vec<RadarTower> = raw
        .into_iter()
        .map(|t| RadarTower {
            id: t.id,
            name: t.name,
            location: t.location,
            reveal_radius: t.reveal_radius,
        })
        .collect();
    to_value(canonical)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schematic {
    pub class_name: String,
    pub name: String,
    pub tech_tier: i64,
    pub purchased: bool,
}

#[derive(Debug, Deserialize)]
struct RawSchematic {
    #[serde(rename = "ClassName")]
    class_name: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "TechTier", default)]
    tech_tier: i64,
    #[serde(rename = "Purchased", default)]
    purchased: bool,
}

pub fn schematics(body: &Value) -> anyhow::Result<Value> {
    let raw: Vec<RawSchematic> = raw_list("schematics", body)?;
    let canonical: Vec<Schematic> = raw
        .into_iter()
        .map(|s| Schematic {
            class_name: s.class_name,
            name: s.name,
            tech_tier: s.tech_tier,
            purchased: s.purchased,
        })
        .collect();
    to_value(canonical)
}

/// Space-elevator progression (single object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceElevator {
    pub phase: i64,
    pub fully_upgraded: bool,
    pub upgrade_ready: bool,
    pub required: Vec<ItemStack>,
}

#[derive(Debug, Deserialize)]
struct RawSpaceElevator {
    #[serde(rename = "CurrentPhase", default)]
    current_phase: i64,
    #[serde(rename = "FullyUpgraded", default)]
    fully_upgraded: bool,
    #[serde(rename = "UpgradeReady", default)]
    upgrade_ready: bool,
    #[serde(rename = "CurrentPhaseItems", default)]
    current_phase_items: Vec<RawItemStack>,
}

pub fn space_elevator(body: &Value) -> anyhow::Result<Value> {
    let raw: RawSpaceElevator = serde_json::from_value(body.clone())
        .map_err(|e| anyhow::anyhow!("spaceElevator: malformed upstream body: {e}"))?;
    to_value(SpaceElevator {
        phase: raw.current_phase,
        fully_upgraded: raw.fully_upgraded,
        upgrade_ready: raw.upgrade_ready,
        required: raw.current_phase_items.into_iter().map(ItemStack::from).collect(),
    })
}

/// HUB milestone progression (single object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hub {
    pub active_milestone: String,
    pub completion: f64,
    pub required: Vec<ItemStack>,
}

#[derive(Debug, Deserialize)]
struct RawHub {
    #[serde(rename = "ActiveMilestone", default)]
    active_milestone: String,
    #[serde(rename = "Completion", default)]
    completion: f64,
    #[serde(rename = "MilestoneItems", default)]
    milestone_items: Vec<RawItemStack>,
}

pub fn hub(body: &Value) -> anyhow::Result<Value> {
    let raw: RawHub = serde_json::from_value(body.clone())
        .map_err(|e| anyhow::anyhow!("hub: malformed upstream body: {e}"))?;
    to_value(Hub {
        active_milestone: raw.active_milestone,
        completion: raw.completion,
        required: raw.milestone_items.into_iter().map(ItemStack::from).collect(),
    })
}
