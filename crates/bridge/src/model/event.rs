// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical event model fanned out to dashboard clients.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of canonical event types.
///
/// Wire names are camelCase and double as the `{eventType}` segment of
/// cache and history keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Status,
    Circuits,
    FactoryStats,
    ProdStats,
    GeneratorStats,
    SinkStats,
    Players,
    Machines,
    Vehicles,
    VehicleStations,
    Belts,
    Pipes,
    Hypertubes,
    TrainRails,
    Cables,
    Storages,
    Tractors,
    Explorers,
    VehiclePaths,
    SpaceElevator,
    Hub,
    RadarTowers,
    ResourceNodes,
    Schematics,
    SessionUpdate,
    ApiStatus,
}

impl EventType {
    /// Every event type, in a stable order.
    pub const ALL: [EventType; 26] = [
        EventType::Status,
        EventType::Circuits,
        EventType::FactoryStats,
        EventType::ProdStats,
        EventType::GeneratorStats,
        EventType::SinkStats,
        EventType::Players,
        EventType::Machines,
        EventType::Vehicles,
        EventType::VehicleStations,
        EventType::Belts,
        EventType::Pipes,
        EventType::Hypertubes,
        EventType::TrainRails,
        EventType::Cables,
        EventType::Storages,
        EventType::Tractors,
        EventType::Explorers,
        EventType::VehiclePaths,
        EventType::SpaceElevator,
        EventType::Hub,
        EventType::RadarTowers,
        EventType::ResourceNodes,
        EventType::Schematics,
        EventType::SessionUpdate,
        EventType::ApiStatus,
    ];

    /// camelCase wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Circuits => "circuits",
            Self::FactoryStats => "factoryStats",
            Self::ProdStats => "prodStats",
            Self::GeneratorStats => "generatorStats",
            Self::SinkStats => "sinkStats",
            Self::Players => "players",
            Self::Machines => "machines",
            Self::Vehicles => "vehicles",
            Self::VehicleStations => "vehicleStations",
            Self::Belts => "belts",
            Self::Pipes => "pipes",
            Self::Hypertubes => "hypertubes",
            Self::TrainRails => "trainRails",
            Self::Cables => "cables",
            Self::Storages => "storages",
            Self::Tractors => "tractors",
            Self::Explorers => "explorers",
            Self::VehiclePaths => "vehiclePaths",
            Self::SpaceElevator => "spaceElevator",
            Self::Hub => "hub",
            Self::RadarTowers => "radarTowers",
            Self::ResourceNodes => "resourceNodes",
            Self::Schematics => "schematics",
            Self::SessionUpdate => "sessionUpdate",
            Self::ApiStatus => "apiStatus",
        }
    }

    /// Parse a camelCase wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().find(|t| t.as_str() == s).copied()
    }

    /// Whether points of this type are indexed by game time for
    /// time-series queries.
    pub fn history_enabled(&self) -> bool {
        matches!(
            self,
            Self::Circuits
                | Self::GeneratorStats
                | Self::ProdStats
                | Self::FactoryStats
                | Self::SinkStats
        )
    }

    /// Whether the latest payload of this type is cached per save.
    /// `sessionUpdate` is fan-out only.
    pub fn cacheable(&self) -> bool {
        !matches!(self, Self::SessionUpdate)
    }

    /// Empty-value shape for the aggregated state endpoint: a handful of
    /// types carry a single object, the rest carry record lists.
    pub fn object_shaped(&self) -> bool {
        matches!(
            self,
            Self::Status | Self::ApiStatus | Self::Hub | Self::SpaceElevator
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One canonical event as published on `events:{sessionId}` and framed to
/// SSE subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: serde_json::Value,
    /// Set only for history-enabled types once a game time is known.
    #[serde(rename = "gameTimeId", skip_serializing_if = "Option::is_none")]
    pub game_time_id: Option<i64>,
}

impl Event {
    pub fn new(event_type: EventType, data: serde_json::Value) -> Self {
        Self { event_type, data, game_time_id: None }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
