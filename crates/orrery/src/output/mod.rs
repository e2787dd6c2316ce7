//! Records published at output boundaries and the sinks that receive them

use crate::config::OutputConfig;
use crate::events::AffairRecord;
use crate::physics::body::{BodyGroupList, BodyId, BodyType, Component, Designations};
use crate::physics::body_data::{BodyData, integral};
use crate::physics::math::{STATE_STRIDE, Scalar};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod binary;
pub mod log;
pub mod text;

pub use crate::error::OutputError;
pub use binary::BinarySink;
pub use log::RunLog;
pub use text::TextSink;

/// Encoding of the result files.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Tab-separated ASCII
    #[default]
    Text,
    /// Little-endian fixed-layout records
    Binary,
}

/// Whether a sink starts fresh files or appends to those of an earlier run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    #[default]
    Create,
    Append,
}

/// Per-body state at an output boundary. Removed bodies appear with their
/// negated id and an all-zero state so that slot order is preserved.
/// Dormant bodies also carry a negated id, with the state they will start
/// from.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasesRecord {
    pub time: Scalar,
    pub active_count: usize,
    pub bodies: Vec<(BodyId, [Scalar; STATE_STRIDE])>,
}

impl PhasesRecord {
    pub fn snapshot(bodies: &BodyData) -> Self {
        let records = (0..bodies.len())
            .map(|i| {
                if bodies.is_active(i) {
                    (bodies.id[i], bodies.phase(i))
                } else if bodies.is_dormant(i) {
                    (-bodies.id[i], bodies.phase(i))
                } else {
                    (-bodies.id[i], [0.0; STATE_STRIDE])
                }
            })
            .collect();

        Self {
            time: bodies.time,
            active_count: bodies.active_count(),
            bodies: records,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegralsRecord {
    pub time: Scalar,
    pub values: [Scalar; integral::COUNT],
}

impl IntegralsRecord {
    /// Takes the integrals as last computed; callers refresh them first.
    pub fn snapshot(bodies: &BodyData) -> Self {
        Self {
            time: bodies.time,
            values: bodies.integrals,
        }
    }
}

/// Fields of a body that never change during a run, written once.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantProperties {
    pub id: BodyId,
    pub name: String,
    pub body_type: BodyType,
    pub designations: Designations,
    pub absolute_magnitude: Option<Scalar>,
    pub components: Vec<Component>,
}

impl ConstantProperties {
    pub fn from_groups(groups: &BodyGroupList) -> Vec<Self> {
        groups
            .bodies()
            .map(|body| {
                let characteristics = body.characteristics.as_ref();
                Self {
                    id: body.id,
                    name: body.name.clone(),
                    body_type: body.body_type,
                    designations: body.designations.clone(),
                    absolute_magnitude: characteristics.and_then(|c| c.absolute_magnitude),
                    components: characteristics.map(|c| c.components.clone()).unwrap_or_default(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableProperties {
    pub id: BodyId,
    pub mass: Scalar,
    pub radius: Scalar,
    pub density: Scalar,
}

impl VariableProperties {
    /// Mass, radius and density of the active bodies.
    pub fn snapshot(bodies: &BodyData) -> Vec<Self> {
        bodies
            .active_indices()
            .map(|i| Self {
                id: bodies.id[i],
                mass: bodies.mass[i],
                radius: bodies.radius[i],
                density: bodies.density[i],
            })
            .collect()
    }
}

/// Wall-clock cost of the integration up to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedRecord {
    pub time: Scalar,
    pub accepted_steps: usize,
    /// Since the previous snapshot
    pub interval: Duration,
    /// Since the start of the run
    pub total: Duration,
}

/// Where an interrupted run left off, read back from its output files.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub phases: PhasesRecord,
    /// Id of the last recorded affair, 0 when there was none
    pub last_affair_id: u64,
}

/// Opens the sink selected by `config.output_type`.
pub fn create_sink(config: &OutputConfig, mode: OpenMode) -> Result<Box<dyn OutputSink>, OutputError> {
    Ok(match config.output_type {
        OutputType::Text => Box::new(TextSink::open(config, mode)?),
        OutputType::Binary => Box::new(BinarySink::open(config, mode)?),
    })
}

/// Reads the last phases record and affair id written by an earlier run.
pub fn read_checkpoint(config: &OutputConfig) -> Result<Checkpoint, OutputError> {
    match config.output_type {
        OutputType::Text => text::read_checkpoint(config),
        OutputType::Binary => binary::read_checkpoint(config),
    }
}

/// Receiver of everything a run publishes.
pub trait OutputSink {
    fn write_constant_properties(&mut self, properties: &[ConstantProperties]) -> Result<(), OutputError>;

    fn write_phases(&mut self, record: &PhasesRecord) -> Result<(), OutputError>;

    fn write_integrals(&mut self, record: &IntegralsRecord) -> Result<(), OutputError>;

    fn write_affair(&mut self, record: &AffairRecord) -> Result<(), OutputError>;

    fn write_variable_properties(
        &mut self,
        time: Scalar,
        properties: &[VariableProperties],
    ) -> Result<(), OutputError>;

    fn write_elapsed(&mut self, record: &ElapsedRecord) -> Result<(), OutputError>;

    fn flush(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub constant_properties: Vec<ConstantProperties>,
    pub phases: Vec<PhasesRecord>,
    pub integrals: Vec<IntegralsRecord>,
    pub affairs: Vec<AffairRecord>,
    pub variable_properties: Vec<(Scalar, Vec<VariableProperties>)>,
    pub elapsed: Vec<ElapsedRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_phases(&self) -> Option<&PhasesRecord> {
        self.phases.last()
    }
}

impl OutputSink for MemorySink {
    fn write_constant_properties(&mut self, properties: &[ConstantProperties]) -> Result<(), OutputError> {
        self.constant_properties.extend_from_slice(properties);
        Ok(())
    }

    fn write_phases(&mut self, record: &PhasesRecord) -> Result<(), OutputError> {
        self.phases.push(record.clone());
        Ok(())
    }

    fn write_integrals(&mut self, record: &IntegralsRecord) -> Result<(), OutputError> {
        self.integrals.push(record.clone());
        Ok(())
    }

    fn write_affair(&mut self, record: &AffairRecord) -> Result<(), OutputError> {
        self.affairs.push(record.clone());
        Ok(())
    }

    fn write_variable_properties(
        &mut self,
        time: Scalar,
        properties: &[VariableProperties],
    ) -> Result<(), OutputError> {
        self.variable_properties.push((time, properties.to_vec()));
        Ok(())
    }

    fn write_elapsed(&mut self, record: &ElapsedRecord) -> Result<(), OutputError> {
        self.elapsed.push(*record);
        Ok(())
    }
}
