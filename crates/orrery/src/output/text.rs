//! Tab-separated text files, one per record kind

use super::{
    Checkpoint, ConstantProperties, ElapsedRecord, IntegralsRecord, OpenMode, OutputError, OutputSink,
    PhasesRecord, VariableProperties,
};
use crate::config::OutputConfig;
use crate::events::AffairRecord;
use crate::physics::math::{STATE_STRIDE, Scalar};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const MISSING: &str = "-";

/// Writes every record kind to its own file in the output directory. Each
/// file starts with a header naming the build and the run start time; a
/// continued run appends below a header of its own and keeps numbering
/// rows where the earlier run stopped.
pub struct TextSink {
    phases: BufWriter<File>,
    integrals: BufWriter<File>,
    constant_properties: BufWriter<File>,
    variable_properties: BufWriter<File>,
    composition_properties: BufWriter<File>,
    affairs: BufWriter<File>,
    elapsed_times: BufWriter<File>,
    next_property_id: u64,
    next_composition_id: u64,
}

impl TextSink {
    pub fn create(config: &OutputConfig) -> Result<Self, OutputError> {
        Self::open(config, OpenMode::Create)
    }

    pub fn open(config: &OutputConfig, mode: OpenMode) -> Result<Self, OutputError> {
        let directory = PathBuf::from(&config.directory);
        fs::create_dir_all(&directory)?;

        let (next_property_id, next_composition_id) = match mode {
            OpenMode::Create => (1, 1),
            OpenMode::Append => {
                let properties = last_leading_id(&directory.join(&config.constant_properties))?
                    .max(last_leading_id(&directory.join(&config.variable_properties))?);
                let compositions = last_leading_id(&directory.join(&config.composition_properties))?;
                (properties + 1, compositions + 1)
            }
        };

        let started = Local::now().format("%Y-%m-%d %H:%M:%S %z");
        let header = match mode {
            OpenMode::Create => format!(
                "# orrery {} (built {}), run started {started}",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_DATE"),
            ),
            OpenMode::Append => format!("# orrery {}, run continued {started}", env!("CARGO_PKG_VERSION")),
        };
        let open = |name: &str, columns: &str| -> Result<BufWriter<File>, OutputError> {
            let path = directory.join(name);
            let file = match mode {
                OpenMode::Create => File::create(path)?,
                OpenMode::Append => OpenOptions::new().create(true).append(true).open(path)?,
            };
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{header}")?;
            if mode == OpenMode::Create {
                writeln!(writer, "# {columns}")?;
            }
            Ok(writer)
        };

        Ok(Self {
            phases: open(
                &config.phases,
                "time\tactive\t(id\tx\ty\tz\tvx\tvy\tvz)...",
            )?,
            integrals: open(&config.integrals, "time\tintegrals[16]")?,
            constant_properties: open(
                &config.constant_properties,
                "property_id\tbody_id\tname\ttype\tdesignation\tprovisional\treference\topposition\tmpc_orbit_type\tlagrange\tabsolute_magnitude",
            )?,
            variable_properties: open(
                &config.variable_properties,
                "property_id\ttime\tbody_id\tmass\tradius\tdensity",
            )?,
            composition_properties: open(
                &config.composition_properties,
                "composition_id\tproperty_id\tbody_id\tcomponent\tratio",
            )?,
            affairs: open(
                &config.two_body_affairs,
                "id\ttype\ttime\tbody1_id\tbody2_id\tbody1_phase[6]\tbody2_phase[6]",
            )?,
            elapsed_times: open(
                &config.elapsed_times,
                "accepted_steps\ttime\tinterval_us\ttotal_us",
            )?,
            next_property_id,
            next_composition_id,
        })
    }

    fn next_property_id(&mut self) -> u64 {
        let id = self.next_property_id;
        self.next_property_id += 1;
        id
    }
}

/// Rows of a result file, without header comments and blank lines.
fn data_lines(text: &str) -> impl DoubleEndedIterator<Item = &str> {
    text.lines().filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
}

fn read_existing(path: &Path) -> Result<String, OutputError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(error) => Err(error.into()),
    }
}

/// Leading id of the last row in `path`, 0 when the file is missing or has
/// no rows yet.
fn last_leading_id(path: &Path) -> Result<u64, OutputError> {
    let text = read_existing(path)?;
    let Some(line) = data_lines(&text).next_back() else {
        return Ok(0);
    };
    let field = line.split('\t').next().unwrap_or_default();
    field
        .parse()
        .map_err(|_| OutputError::Corrupt(format!("{}: bad leading id '{field}'", path.display())))
}

fn parse_phases(line: &str) -> Result<PhasesRecord, OutputError> {
    let corrupt = |what: &str| OutputError::Corrupt(format!("phases row: {what}"));
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 2 || (fields.len() - 2) % (STATE_STRIDE + 1) != 0 {
        return Err(corrupt("unexpected column count"));
    }

    let number = |text: &str| text.parse::<Scalar>().map_err(|_| corrupt(text));
    let time = number(fields[0])?;
    let active_count = fields[1].parse().map_err(|_| corrupt(fields[1]))?;

    let mut bodies = Vec::with_capacity((fields.len() - 2) / (STATE_STRIDE + 1));
    for chunk in fields[2..].chunks(STATE_STRIDE + 1) {
        let id = chunk[0].parse().map_err(|_| corrupt(chunk[0]))?;
        let mut phase = [0.0; STATE_STRIDE];
        for (value, text) in phase.iter_mut().zip(&chunk[1..]) {
            *value = number(text)?;
        }
        bodies.push((id, phase));
    }

    Ok(PhasesRecord {
        time,
        active_count,
        bodies,
    })
}

/// Last snapshot and affair id of an earlier text run in `config.directory`.
pub fn read_checkpoint(config: &OutputConfig) -> Result<Checkpoint, OutputError> {
    let directory = Path::new(&config.directory);
    let phases_path = directory.join(&config.phases);
    let text = fs::read_to_string(&phases_path)?;
    let line = data_lines(&text)
        .next_back()
        .ok_or_else(|| OutputError::Corrupt(format!("{} holds no snapshot", phases_path.display())))?;

    Ok(Checkpoint {
        phases: parse_phases(line)?,
        last_affair_id: last_leading_id(&directory.join(&config.two_body_affairs))?,
    })
}

fn write_values(writer: &mut impl Write, values: &[Scalar]) -> std::io::Result<()> {
    for value in values {
        write!(writer, "\t{value:.16e}")?;
    }
    Ok(())
}

impl OutputSink for TextSink {
    fn write_constant_properties(&mut self, properties: &[ConstantProperties]) -> Result<(), OutputError> {
        for property in properties {
            let property_id = self.next_property_id();
            let designations = &property.designations;
            let lagrange = designations
                .lagrange_point
                .map(|point| format!("{point:?}"))
                .unwrap_or_else(|| MISSING.to_string());
            let magnitude = property
                .absolute_magnitude
                .map(|h| h.to_string())
                .unwrap_or_else(|| MISSING.to_string());

            writeln!(
                self.constant_properties,
                "{property_id}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{lagrange}\t{magnitude}",
                property.id,
                property.name,
                property.body_type,
                designations.designation.as_deref().unwrap_or(MISSING),
                designations.provisional_designation.as_deref().unwrap_or(MISSING),
                designations.reference.as_deref().unwrap_or(MISSING),
                designations.opposition.as_deref().unwrap_or(MISSING),
                designations.mpc_orbit_type.as_deref().unwrap_or(MISSING),
            )?;

            for component in &property.components {
                let composition_id = self.next_composition_id;
                self.next_composition_id += 1;
                writeln!(
                    self.composition_properties,
                    "{composition_id}\t{property_id}\t{}\t{}\t{}",
                    property.id, component.name, component.ratio
                )?;
            }
        }
        Ok(())
    }

    fn write_phases(&mut self, record: &PhasesRecord) -> Result<(), OutputError> {
        write!(self.phases, "{:.16e}\t{}", record.time, record.active_count)?;
        for (id, phase) in &record.bodies {
            write!(self.phases, "\t{id}")?;
            write_values(&mut self.phases, phase)?;
        }
        writeln!(self.phases)?;
        Ok(())
    }

    fn write_integrals(&mut self, record: &IntegralsRecord) -> Result<(), OutputError> {
        write!(self.integrals, "{:.16e}", record.time)?;
        write_values(&mut self.integrals, &record.values)?;
        writeln!(self.integrals)?;
        Ok(())
    }

    fn write_affair(&mut self, record: &AffairRecord) -> Result<(), OutputError> {
        write!(
            self.affairs,
            "{}\t{}\t{:.16e}\t{}\t{}",
            record.id, record.kind, record.time, record.body1_id, record.body2_id
        )?;
        write_values(&mut self.affairs, &record.body1_phase)?;
        write_values(&mut self.affairs, &record.body2_phase)?;
        writeln!(self.affairs)?;
        Ok(())
    }

    fn write_variable_properties(
        &mut self,
        time: Scalar,
        properties: &[VariableProperties],
    ) -> Result<(), OutputError> {
        for property in properties {
            let property_id = self.next_property_id();
            write!(self.variable_properties, "{property_id}\t{time:.16e}\t{}", property.id)?;
            write_values(
                &mut self.variable_properties,
                &[property.mass, property.radius, property.density],
            )?;
            writeln!(self.variable_properties)?;
        }
        Ok(())
    }

    fn write_elapsed(&mut self, record: &ElapsedRecord) -> Result<(), OutputError> {
        writeln!(
            self.elapsed_times,
            "{}\t{:.16e}\t{}\t{}",
            record.accepted_steps,
            record.time,
            record.interval.as_micros(),
            record.total.as_micros()
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        for writer in [
            &mut self.phases,
            &mut self.integrals,
            &mut self.constant_properties,
            &mut self.variable_properties,
            &mut self.composition_properties,
            &mut self.affairs,
            &mut self.elapsed_times,
        ] {
            writer.flush()?;
        }
        Ok(())
    }
}
