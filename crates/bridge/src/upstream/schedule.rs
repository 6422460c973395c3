// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadenced endpoint schedule.
//!
//! Each entry maps one event type to the upstream endpoints that feed it
//! and a default polling period. Two tiers: dynamic types tick every few
//! seconds, semi-static world geometry every few minutes. Periods are
//! overridable per deployment, never per session.

use std::time::Duration;

use crate::model::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Dynamic,
    SemiStatic,
}

pub struct ScheduleEntry {
    pub event_type: EventType,
    /// Endpoint group. Multi-endpoint entries are fetched concurrently
    /// and emit one event once every part succeeds.
    pub endpoints: &'static [&'static str],
    pub tier: Tier,
    pub default_ms: u64,
}

pub const SCHEDULE: [ScheduleEntry; 24] = [
    ScheduleEntry {
        event_type: EventType::Status,
        endpoints: &[STATUS_ENDPOINT],
        tier: Tier::Dynamic,
        default_ms: 1_000,
    },
    ScheduleEntry {
        event_type: EventType::Circuits,
        endpoints: &["/getCircuits"],
        tier: Tier::Dynamic,
        default_ms: 2_000,
    },
    ScheduleEntry {
        event_type: EventType::FactoryStats,
        endpoints: &["/getFactory"],
        tier: Tier::Dynamic,
        default_ms: 2_000,
    },
    ScheduleEntry {
        event_type: EventType::ProdStats,
        endpoints: &["/getProdStats"],
        tier: Tier::Dynamic,
        default_ms: 5_000,
    },
    ScheduleEntry {
        event_type: EventType::GeneratorStats,
        endpoints: &["/getGenerators"],
        tier: Tier::Dynamic,
        default_ms: 5_000,
    },
    ScheduleEntry {
        event_type: EventType::SinkStats,
        endpoints: &["/getResourceSink"],
        tier: Tier::Dynamic,
        default_ms: 5_000,
    },
    ScheduleEntry {
        event_type: EventType::Players,
        endpoints: &["/getPlayer"],
        tier: Tier::Dynamic,
        default_ms: 2_000,
    },
    ScheduleEntry {
        event_type: EventType::Machines,
        endpoints: &["/getMachines", "/getMachinePower"],
        tier: Tier::Dynamic,
        default_ms: 5_000,
    },
    ScheduleEntry {
        event_type: EventType::Vehicles,
        endpoints: &["/getVehicles", "/getVehicleFuel"],
        tier: Tier::Dynamic,
        default_ms: 2_000,
    },
    ScheduleEntry {
        event_type: EventType::VehicleStations,
        endpoints: &["/getTruckStation"],
        tier: Tier::Dynamic,
        default_ms: 5_000,
    },
    ScheduleEntry {
        event_type: EventType::Belts,
        endpoints: &["/getBelts"],
        tier: Tier::SemiStatic,
        default_ms: 120_000,
    },
    ScheduleEntry {
        event_type: EventType::Pipes,
        endpoints: &["/getPipes"],
        tier: Tier::SemiStatic,
        default_ms: 120_000,
    },
    ScheduleEntry {
        event_type: EventType::Hypertubes,
        endpoints: &["/getHypertubes"],
        tier: Tier::SemiStatic,
        default_ms: 300_000,
    },
    ScheduleEntry {
        event_type: EventType::TrainRails,
        endpoints: &["/getTrainRails"],
        tier: Tier::SemiStatic,
        default_ms: 300_000,
    },
    ScheduleEntry {
        event_type: EventType::Cables,
        endpoints: &["/getCables"],
        tier: Tier::SemiStatic,
        default_ms: 300_000,
    },
    ScheduleEntry {
        event_type: EventType::Storages,
        endpoints: &["/getStorageInv"],
        tier: Tier::SemiStatic,
        default_ms: 60_000,
    },
    ScheduleEntry {
        event_type: EventType::Tractors,
        endpoints: &["/getTractor"],
        tier: Tier::SemiStatic,
        default_ms: 120_000,
    },
    ScheduleEntry {
        event_type: EventType::Explorers,
        endpoints: &["/getExplorer"],
        tier: Tier::SemiStatic,
        default_ms: 120_000,
    },
    ScheduleEntry {
        event_type: EventType::VehiclePaths,
        endpoints: &["/getVehiclePaths"],
        tier: Tier::SemiStatic,
        default_ms: 300_000,
    },
    ScheduleEntry {
        event_type: EventType::SpaceElevator,
        endpoints: &["/getSpaceElevator"],
        tier: Tier::SemiStatic,
        default_ms: 120_000,
    },
    ScheduleEntry {
        event_type: EventType::Hub,
        endpoints: &["/getHUBTerminal"],
        tier: Tier::SemiStatic,
        default_ms: 60_000,
    },
    ScheduleEntry {
        event_type: EventType::RadarTowers,
        endpoints: &["/getRadarTower"],
        tier: Tier::SemiStatic,
        default_ms: 300_000,
    },
    ScheduleEntry {
        event_type: EventType::ResourceNodes,
        endpoints: &["/getResourceNode"],
        tier: Tier::SemiStatic,
        default_ms: 600_000,
    },
    ScheduleEntry {
        event_type: EventType::Schematics,
        endpoints: &["/getSchematics"],
        tier: Tier::SemiStatic,
        default_ms: 300_000,
    },
];

/// Session-info probe endpoint, polled by the per-publisher monitor
/// rather than the cadence table.
pub const SESSION_INFO_ENDPOINT: &str = "/getSessionInfo";

/// Status endpoint, also polled alone while a session is disconnected.
pub const STATUS_ENDPOINT: &str = "/getStatus";

/// Baked-in default period for one event type. Types outside the
/// schedule (internal ones) fall back to the dynamic default.
pub fn default_cadence(ty: EventType) -> Duration {
    SCHEDULE
        .iter()
        .find(|e| e.event_type == ty)
        .map_or(Duration::from_millis(1_000), |e| Duration::from_millis(e.default_ms))
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
