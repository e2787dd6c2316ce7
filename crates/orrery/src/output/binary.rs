//! Little-endian record files
//!
//! Every record kind goes to the configured file name with a `.dat`
//! extension. The files carry no header, so a continued run appends to them
//! directly. Record layouts:
//!
//! - phases: `time f64, active u32, count u32`, then `count` times
//!   `id i64, x y z vx vy vz f64`
//! - integrals: `time f64`, then 16 `f64`
//! - two-body affairs, 132 bytes: `id u64, kind u32, body1 i64, body2 i64`,
//!   both phases as 12 `f64`, `time f64`
//! - variable properties: `time f64, count u32`, then `count` times
//!   `id i64, mass f64, radius f64, density f64`
//! - constant properties: `id i64`, strings for name, type, designation,
//!   provisional designation, reference, opposition, MPC orbit type and
//!   Lagrange point, `absolute magnitude f64` (NaN when unknown),
//!   `components u32`, then per component a name string and `ratio f64`.
//!   Strings are a `u32` byte length followed by UTF-8; missing ones are
//!   empty.
//! - elapsed times: `accepted steps u64, time f64, interval µs u64,
//!   total µs u64`

use super::{
    Checkpoint, ConstantProperties, ElapsedRecord, IntegralsRecord, OpenMode, OutputError, OutputSink,
    PhasesRecord, VariableProperties,
};
use crate::config::OutputConfig;
use crate::events::{AffairRecord, EventKind};
use crate::physics::math::{STATE_STRIDE, Scalar};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const AFFAIR_RECORD_SIZE: usize = 8 + 4 + 8 + 8 + 2 * STATE_STRIDE * 8 + 8;

const PHASE_ENTRY_SIZE: usize = 8 + STATE_STRIDE * 8;

pub fn binary_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(Path::new(name).with_extension("dat"))
}

fn kind_code(kind: EventKind) -> u32 {
    EventKind::ORDER.iter().position(|k| *k == kind).unwrap_or_default() as u32
}

/// Accumulates one record before it is written in a single call.
#[derive(Default)]
struct RecordBuffer {
    bytes: Vec<u8>,
}

impl RecordBuffer {
    fn f64(&mut self, value: Scalar) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn f64s(&mut self, values: &[Scalar]) -> &mut Self {
        for value in values {
            self.f64(*value);
        }
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u64(&mut self, value: u64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn i64(&mut self, value: i64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn string(&mut self, value: &str) -> &mut Self {
        self.u32(value.len() as u32);
        self.bytes.extend_from_slice(value.as_bytes());
        self
    }

    fn write_to(&mut self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_all(&self.bytes)?;
        self.bytes.clear();
        Ok(())
    }
}

/// Reads fixed-width little-endian fields from a byte slice.
struct RecordReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> RecordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn is_empty(&self) -> bool {
        self.position >= self.bytes.len()
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], OutputError> {
        let end = self.position + N;
        let slice = self.bytes.get(self.position..end).ok_or_else(|| {
            OutputError::Corrupt(format!("record truncated at byte {}", self.position))
        })?;
        self.position = end;
        let mut out = [0; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn f64(&mut self) -> Result<Scalar, OutputError> {
        Ok(Scalar::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32, OutputError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64, OutputError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn i64(&mut self) -> Result<i64, OutputError> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    fn phases(&mut self) -> Result<PhasesRecord, OutputError> {
        let time = self.f64()?;
        let active_count = self.u32()? as usize;
        let count = self.u32()? as usize;
        if self.bytes.len() - self.position < count * PHASE_ENTRY_SIZE {
            return Err(OutputError::Corrupt(format!(
                "phases record at byte {} claims {count} bodies",
                self.position
            )));
        }

        let mut bodies = Vec::with_capacity(count);
        for _ in 0..count {
            let id = self.i64()?;
            let mut phase = [0.0; STATE_STRIDE];
            for value in &mut phase {
                *value = self.f64()?;
            }
            bodies.push((id, phase));
        }
        Ok(PhasesRecord {
            time,
            active_count,
            bodies,
        })
    }
}

/// Writes every record kind as packed little-endian fields.
pub struct BinarySink {
    phases: BufWriter<File>,
    integrals: BufWriter<File>,
    constant_properties: BufWriter<File>,
    variable_properties: BufWriter<File>,
    affairs: BufWriter<File>,
    elapsed_times: BufWriter<File>,
    buffer: RecordBuffer,
}

impl BinarySink {
    pub fn open(config: &OutputConfig, mode: OpenMode) -> Result<Self, OutputError> {
        let directory = PathBuf::from(&config.directory);
        fs::create_dir_all(&directory)?;

        let open = |name: &str| -> Result<BufWriter<File>, OutputError> {
            let path = binary_path(&directory, name);
            let file = match mode {
                OpenMode::Create => File::create(path)?,
                OpenMode::Append => OpenOptions::new().create(true).append(true).open(path)?,
            };
            Ok(BufWriter::new(file))
        };

        Ok(Self {
            phases: open(&config.phases)?,
            integrals: open(&config.integrals)?,
            constant_properties: open(&config.constant_properties)?,
            variable_properties: open(&config.variable_properties)?,
            affairs: open(&config.two_body_affairs)?,
            elapsed_times: open(&config.elapsed_times)?,
            buffer: RecordBuffer::default(),
        })
    }
}

impl OutputSink for BinarySink {
    fn write_constant_properties(&mut self, properties: &[ConstantProperties]) -> Result<(), OutputError> {
        for property in properties {
            let designations = &property.designations;
            let lagrange = designations
                .lagrange_point
                .map(|point| format!("{point:?}"))
                .unwrap_or_default();

            self.buffer
                .i64(property.id)
                .string(&property.name)
                .string(property.body_type.as_str())
                .string(designations.designation.as_deref().unwrap_or_default())
                .string(designations.provisional_designation.as_deref().unwrap_or_default())
                .string(designations.reference.as_deref().unwrap_or_default())
                .string(designations.opposition.as_deref().unwrap_or_default())
                .string(designations.mpc_orbit_type.as_deref().unwrap_or_default())
                .string(&lagrange)
                .f64(property.absolute_magnitude.unwrap_or(Scalar::NAN))
                .u32(property.components.len() as u32);
            for component in &property.components {
                self.buffer.string(&component.name).f64(component.ratio);
            }
            self.buffer.write_to(&mut self.constant_properties)?;
        }
        Ok(())
    }

    fn write_phases(&mut self, record: &PhasesRecord) -> Result<(), OutputError> {
        self.buffer
            .f64(record.time)
            .u32(record.active_count as u32)
            .u32(record.bodies.len() as u32);
        for (id, phase) in &record.bodies {
            self.buffer.i64(*id).f64s(phase);
        }
        self.buffer.write_to(&mut self.phases)?;
        Ok(())
    }

    fn write_integrals(&mut self, record: &IntegralsRecord) -> Result<(), OutputError> {
        self.buffer.f64(record.time).f64s(&record.values);
        self.buffer.write_to(&mut self.integrals)?;
        Ok(())
    }

    fn write_affair(&mut self, record: &AffairRecord) -> Result<(), OutputError> {
        self.buffer
            .u64(record.id)
            .u32(kind_code(record.kind))
            .i64(record.body1_id)
            .i64(record.body2_id)
            .f64s(&record.body1_phase)
            .f64s(&record.body2_phase)
            .f64(record.time);
        self.buffer.write_to(&mut self.affairs)?;
        Ok(())
    }

    fn write_variable_properties(
        &mut self,
        time: Scalar,
        properties: &[VariableProperties],
    ) -> Result<(), OutputError> {
        self.buffer.f64(time).u32(properties.len() as u32);
        for property in properties {
            self.buffer
                .i64(property.id)
                .f64(property.mass)
                .f64(property.radius)
                .f64(property.density);
        }
        self.buffer.write_to(&mut self.variable_properties)?;
        Ok(())
    }

    fn write_elapsed(&mut self, record: &ElapsedRecord) -> Result<(), OutputError> {
        self.buffer
            .u64(record.accepted_steps as u64)
            .f64(record.time)
            .u64(record.interval.as_micros() as u64)
            .u64(record.total.as_micros() as u64);
        self.buffer.write_to(&mut self.elapsed_times)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        for writer in [
            &mut self.phases,
            &mut self.integrals,
            &mut self.constant_properties,
            &mut self.variable_properties,
            &mut self.affairs,
            &mut self.elapsed_times,
        ] {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Decodes every phases record in `bytes`.
pub fn read_phases(bytes: &[u8]) -> Result<Vec<PhasesRecord>, OutputError> {
    let mut reader = RecordReader::new(bytes);
    let mut records = Vec::new();
    while !reader.is_empty() {
        records.push(reader.phases()?);
    }
    Ok(records)
}

/// Decodes every affair record in `bytes`.
pub fn read_affairs(bytes: &[u8]) -> Result<Vec<AffairRecord>, OutputError> {
    if bytes.len() % AFFAIR_RECORD_SIZE != 0 {
        return Err(OutputError::Corrupt(format!(
            "affair file of {} bytes is not a whole number of records",
            bytes.len()
        )));
    }

    let mut reader = RecordReader::new(bytes);
    let mut records = Vec::with_capacity(bytes.len() / AFFAIR_RECORD_SIZE);
    while !reader.is_empty() {
        let id = reader.u64()?;
        let code = reader.u32()?;
        let kind = *EventKind::ORDER
            .get(code as usize)
            .ok_or_else(|| OutputError::Corrupt(format!("unknown affair kind {code}")))?;
        let body1_id = reader.i64()?;
        let body2_id = reader.i64()?;
        let mut body1_phase = [0.0; STATE_STRIDE];
        for value in &mut body1_phase {
            *value = reader.f64()?;
        }
        let mut body2_phase = [0.0; STATE_STRIDE];
        for value in &mut body2_phase {
            *value = reader.f64()?;
        }
        let time = reader.f64()?;
        records.push(AffairRecord {
            id,
            kind,
            body1_id,
            body2_id,
            body1_phase,
            body2_phase,
            time,
        });
    }
    Ok(records)
}

fn read_existing(path: &Path) -> Result<Vec<u8>, OutputError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(error) => Err(error.into()),
    }
}

/// Last snapshot and affair id of an earlier binary run.
pub fn read_checkpoint(config: &OutputConfig) -> Result<Checkpoint, OutputError> {
    let directory = Path::new(&config.directory);
    let phases_path = binary_path(directory, &config.phases);
    let phases = read_phases(&fs::read(&phases_path)?)?
        .pop()
        .ok_or_else(|| OutputError::Corrupt(format!("{} holds no snapshot", phases_path.display())))?;

    let affairs = read_affairs(&read_existing(&binary_path(directory, &config.two_body_affairs))?)?;

    Ok(Checkpoint {
        phases,
        last_affair_id: affairs.last().map_or(0, |affair| affair.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::{BodyType, Component, Designations};
    use std::time::Duration;

    fn scratch_config(name: &str) -> OutputConfig {
        let directory = std::env::temp_dir().join(format!("orrery-{name}-{}", std::process::id()));
        OutputConfig {
            directory: directory.to_string_lossy().into_owned(),
            output_type: crate::output::OutputType::Binary,
            ..Default::default()
        }
    }

    fn affair(id: u64, kind: EventKind) -> AffairRecord {
        AffairRecord {
            id,
            kind,
            body1_id: 4,
            body2_id: 9,
            body1_phase: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            body2_phase: [-1.0; 6],
            time: 365.25,
        }
    }

    #[test]
    fn test_record_sizes() {
        let config = scratch_config("binary-sizes");
        let mut sink = BinarySink::open(&config, OpenMode::Create).unwrap();
        sink.write_phases(&PhasesRecord {
            time: 0.0,
            active_count: 2,
            bodies: vec![(1, [0.0; 6]), (2, [1.0; 6]), (-3, [0.0; 6])],
        })
        .unwrap();
        sink.write_integrals(&IntegralsRecord {
            time: 0.0,
            values: [0.5; crate::physics::body_data::integral::COUNT],
        })
        .unwrap();
        sink.write_affair(&affair(1, EventKind::WeakCapture)).unwrap();
        sink.write_elapsed(&ElapsedRecord {
            time: 1.0,
            accepted_steps: 3,
            interval: Duration::from_micros(10),
            total: Duration::from_micros(20),
        })
        .unwrap();
        sink.write_constant_properties(&[ConstantProperties {
            id: 2,
            name: "ceres".to_string(),
            body_type: BodyType::ProtoPlanet,
            designations: Designations::default(),
            absolute_magnitude: None,
            components: vec![Component {
                name: "ice".to_string(),
                ratio: 25.0,
            }],
        }])
        .unwrap();
        sink.flush().unwrap();
        drop(sink);

        let directory = Path::new(&config.directory);
        let size = |name: &str| fs::metadata(binary_path(directory, name)).unwrap().len() as usize;
        assert_eq!(size(&config.phases), 16 + 3 * PHASE_ENTRY_SIZE);
        assert_eq!(size(&config.integrals), 8 * 17);
        assert_eq!(size(&config.two_body_affairs), 132);
        assert_eq!(size(&config.elapsed_times), 32);
        // id, 8 string lengths, "ceres" and "proto_planet", magnitude,
        // component count, then "ice" with its ratio
        assert_eq!(size(&config.constant_properties), 8 + 8 * 4 + 5 + 12 + 8 + 4 + 4 + 3 + 8);

        let bytes = fs::read(binary_path(directory, &config.two_body_affairs)).unwrap();
        assert_eq!(read_affairs(&bytes).unwrap(), vec![affair(1, EventKind::WeakCapture)]);

        fs::remove_dir_all(directory).ok();
    }

    #[test]
    fn test_checkpoint_after_append() {
        let config = scratch_config("binary-append");
        let snapshot = |time: Scalar| PhasesRecord {
            time,
            active_count: 1,
            bodies: vec![(1, [0.0; 6]), (-2, [time, 0.1, 0.2, 0.3, 0.4, 0.5])],
        };

        let mut sink = BinarySink::open(&config, OpenMode::Create).unwrap();
        sink.write_phases(&snapshot(1.0)).unwrap();
        sink.write_affair(&affair(1, EventKind::Ejection)).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut sink = BinarySink::open(&config, OpenMode::Append).unwrap();
        sink.write_phases(&snapshot(2.0)).unwrap();
        sink.write_affair(&affair(2, EventKind::Collision)).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let checkpoint = read_checkpoint(&config).unwrap();
        assert_eq!(checkpoint.phases, snapshot(2.0));
        assert_eq!(checkpoint.last_affair_id, 2);

        let directory = Path::new(&config.directory);
        let all = read_phases(&fs::read(binary_path(directory, &config.phases)).unwrap()).unwrap();
        assert_eq!(all.len(), 2);

        fs::remove_dir_all(directory).ok();
    }

    #[test]
    fn test_truncated_records_are_rejected() {
        let mut buffer = RecordBuffer::default();
        buffer.f64(1.0).u32(1).u32(2).i64(1).f64s(&[0.0; 6]);
        assert!(matches!(read_phases(&buffer.bytes), Err(OutputError::Corrupt(_))));
        assert!(matches!(read_affairs(&[0; 100]), Err(OutputError::Corrupt(_))));
    }
}
