// src/script.rs
//
// mumax3 script generation.
//
// A ScriptBuilder owns an append-only list of text fragments. Construction emits
// the setup block (table columns, solver settings, device, geometry, material);
// each field operation appends one more fragment. Nothing already emitted is
// ever rewritten, so building the same operations on the same config always
// yields byte-identical text.

use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::config::SimulationConfig;
use crate::error::{Result, ScripterError};
use crate::params::{fmt_num, fmt_sci};

/// Field axis of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// `vector(..)` expression with `value` on this axis and zero elsewhere.
    pub fn vector_expr(&self, value: &str) -> String {
        let mut c = ["0", "0", "0"];
        c[self.index()] = value;
        format!("vector({},{},{})", c[0], c[1], c[2])
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = ScripterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "x" | "X" => Ok(Axis::X),
            "y" | "Y" => Ok(Axis::Y),
            "z" | "Z" => Ok(Axis::Z),
            other => Err(ScripterError::InvalidAxis(other.to_string())),
        }
    }
}

/// Direction of a uniform starting magnetization: `x`, `-y`, `+z`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    pub axis: Axis,
    pub negative: bool,
}

impl Direction {
    pub fn uniform_expr(&self) -> String {
        let one = if self.negative { "-1" } else { "1" };
        let mut c = ["0", "0", "0"];
        c[self.axis.index()] = one;
        format!("uniform({},{},{})", c[0], c[1], c[2])
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.axis)
        } else {
            write!(f, "{}", self.axis)
        }
    }
}

impl FromStr for Direction {
    type Err = ScripterError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let axis = rest
            .parse::<Axis>()
            .map_err(|_| ScripterError::InvalidAxis(s.to_string()))?;
        Ok(Self { axis, negative })
    }
}

impl From<Axis> for Direction {
    fn from(axis: Axis) -> Self {
        Self {
            axis,
            negative: false,
        }
    }
}

/// How long a field is held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunMode {
    /// Minimise to equilibrium. No time information is recorded.
    Relax,
    /// Time-resolved run for a fixed duration (ns).
    Run { duration_ns: f64 },
}

/// Apply a static field, hold it, and optionally switch it off again.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticField {
    /// Field components in mT. Must have exactly three entries.
    pub field: Vec<f64>,
    pub mode: RunMode,
    pub remove_afterwards: bool,
    pub snapshots: bool,
    /// Periodic table/snapshot interval (ns) for timed runs. `None` or 0 disables it.
    pub autosave_ns: Option<f64>,
}

impl StaticField {
    pub fn new<V: Into<Vec<f64>>>(field: V) -> Self {
        Self {
            field: field.into(),
            mode: RunMode::Run { duration_ns: 2.0 },
            remove_afterwards: true,
            snapshots: true,
            autosave_ns: Some(0.05),
        }
    }

    /// Relax instead of a timed run. Disables autosave, which needs time information.
    pub fn relax(mut self) -> Self {
        self.mode = RunMode::Relax;
        self.autosave_ns = None;
        self
    }

    pub fn runtime(mut self, duration_ns: f64) -> Self {
        self.mode = RunMode::Run { duration_ns };
        self
    }

    pub fn autosave(mut self, interval_ns: Option<f64>) -> Self {
        self.autosave_ns = interval_ns;
        self
    }

    pub fn remove_afterwards(mut self, remove: bool) -> Self {
        self.remove_afterwards = remove;
        self
    }

    pub fn snapshots(mut self, on: bool) -> Self {
        self.snapshots = on;
        self
    }
}

/// Step the field along one axis from `start` to `end` (mT), relaxing at every step.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSweep {
    pub axis: Axis,
    /// Saturate the device along this direction (and relax) before sweeping.
    pub start_magnetization: Option<Direction>,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub snapshots: bool,
    /// Retrace from `end` back to `start` after the forward sweep.
    pub sweep_back: bool,
    /// After every field value: field off, relax, reset m, relax.
    /// Incompatible with `sweep_back`.
    pub relax_zero: bool,
}

impl FieldSweep {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            start_magnetization: None,
            start: 0.0,
            end: 50.0,
            step: 5.0,
            snapshots: true,
            sweep_back: true,
            relax_zero: false,
        }
    }

    pub fn range(mut self, start: f64, end: f64, step: f64) -> Self {
        self.start = start;
        self.end = end;
        self.step = step;
        self
    }

    pub fn start_magnetization(mut self, dir: Direction) -> Self {
        self.start_magnetization = Some(dir);
        self
    }

    pub fn sweep_back(mut self, on: bool) -> Self {
        self.sweep_back = on;
        self
    }

    pub fn relax_zero(mut self, on: bool) -> Self {
        self.relax_zero = on;
        self
    }

    pub fn snapshots(mut self, on: bool) -> Self {
        self.snapshots = on;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOperation {
    Static(StaticField),
    Sweep(FieldSweep),
}

/// Append-only mumax3 script for one simulation config.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    config: SimulationConfig,
    fragments: Vec<String>,
    autosave_enabled: bool,
}

impl ScriptBuilder {
    /// Start a script with the setup block for `config`.
    pub fn new(config: &SimulationConfig) -> Self {
        let mut builder = Self {
            config: config.clone(),
            fragments: Vec::new(),
            autosave_enabled: false,
        };
        let setup = builder.setup_block();
        builder.fragments.push(setup);
        builder
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Full script text.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    pub fn apply(&mut self, op: &FieldOperation) -> Result<()> {
        match op {
            FieldOperation::Static(s) => self.apply_static_field(s),
            FieldOperation::Sweep(s) => self.apply_field_sweep(s),
        }
    }

    pub fn apply_static_field(&mut self, op: &StaticField) -> Result<()> {
        if op.field.len() != 3 {
            warn!("field {:?} is not a valid vector.", op.field);
            return Err(ScripterError::InvalidVector(op.field.clone()));
        }
        if let RunMode::Run { duration_ns } = op.mode {
            if !(duration_ns.is_finite() && duration_ns > 0.0) {
                return Err(ScripterError::InvalidArgument(format!(
                    "run time must be positive, got {} ns",
                    duration_ns
                )));
            }
        }
        let autosave = op.autosave_ns.filter(|&a| a != 0.0);
        if let Some(a) = autosave {
            if op.mode == RunMode::Relax {
                return Err(ScripterError::InvalidArgument(
                    "autosave needs a timed run; relax() records no time".into(),
                ));
            }
            if !(a.is_finite() && a > 0.0) {
                return Err(ScripterError::InvalidArgument(format!(
                    "autosave interval must be positive, got {} ns",
                    a
                )));
            }
            if !self.autosave_enabled {
                self.fragments.push(format!(
                    "auto_save := {}e-9\nTableAutoSave(auto_save)\nAutoSnapshot(m,auto_save)\n",
                    fmt_num(a)
                ));
                self.autosave_enabled = true;
            }
        }

        let f = &op.field;
        let mut s = String::from("\n/* Static field */\n");
        s.push_str(&format!(
            "B_ext = vector({}/1000,{}/1000,{}/1000)\n",
            fmt_num(f[0]),
            fmt_num(f[1]),
            fmt_num(f[2])
        ));
        s.push_str(&self.hold(op.mode, op.snapshots, ""));

        if op.remove_afterwards {
            s.push_str("B_ext = vector(0,0,0)\n");
            s.push_str(&self.hold(op.mode, op.snapshots, ""));
        }

        self.fragments.push(s);
        Ok(())
    }

    pub fn apply_field_sweep(&mut self, op: &FieldSweep) -> Result<()> {
        if !(op.step.is_finite() && op.step > 0.0) {
            return Err(ScripterError::InvalidArgument(format!(
                "sweep step must be positive, got {} mT",
                op.step
            )));
        }
        if !(op.start.is_finite() && op.end.is_finite()) || op.start == op.end {
            return Err(ScripterError::InvalidArgument(format!(
                "sweep needs distinct finite bounds, got {} -> {} mT",
                op.start, op.end
            )));
        }

        let mut s = String::new();

        if let Some(dir) = op.start_magnetization {
            s.push_str(&format!(
                "\n/* Starting condition: fully magnetized in {}-direction */\n",
                dir
            ));
            if self.config.stray_fields {
                s.push_str(&format!("m.SetRegion(1, {})\n", dir.uniform_expr()));
            } else {
                s.push_str(&format!("m = {}\n", dir.uniform_expr()));
            }
            s.push_str(&self.hold(RunMode::Relax, op.snapshots, ""));
        }

        let ascending = op.end > op.start;
        let (cmp, inc) = if ascending { ("<=", "+=") } else { (">=", "-=") };

        s.push_str(&format!("\n/* Field sweep in {}-direction */\n", op.axis));
        s.push_str(&format!(
            "for B={}e-3; B{}{}e-3; B{}{}e-3{{\n",
            fmt_num(op.start),
            cmp,
            fmt_num(op.end),
            inc,
            fmt_num(op.step)
        ));
        s.push_str(&format!("    B_ext = {}\n", op.axis.vector_expr("B")));
        s.push_str(&self.hold(RunMode::Relax, op.snapshots, "    "));

        if op.relax_zero {
            s.push_str("    B_ext = vector(0,0,0)\n");
            s.push_str(&self.hold(RunMode::Relax, op.snapshots, "    "));
            s.push_str("    m = uniform(1,0,0)\n");
            s.push_str(&self.hold(RunMode::Relax, op.snapshots, "    "));
        }
        s.push_str("}\n");

        if op.sweep_back && op.relax_zero {
            warn!("relax_zero resets the state after every step; skipping the sweep back.");
        } else if op.sweep_back {
            // The offset B runs from one step to the full span, with the sign of the sweep.
            let first = if ascending { op.step } else { -op.step };
            s.push_str(&format!(
                "\nfor B={}e-3; B{}{}e-3; B{}{}e-3{{\n",
                fmt_num(first),
                cmp,
                fmt_num(op.end - op.start),
                inc,
                fmt_num(op.step)
            ));
            let value = format!("{}e-3-B", fmt_num(op.end));
            s.push_str(&format!("    B_ext = {}\n", op.axis.vector_expr(&value)));
            s.push_str(&self.hold(RunMode::Relax, op.snapshots, "    "));
            s.push_str("}\n");
        }

        self.fragments.push(s);
        Ok(())
    }

    /// relax()/run() followed by the save sequence.
    fn hold(&self, mode: RunMode, snapshots: bool, indent: &str) -> String {
        let mut s = match mode {
            RunMode::Relax => format!("{}relax()\n", indent),
            RunMode::Run { duration_ns } => format!("{}run({}e-9)\n", indent, fmt_num(duration_ns)),
        };
        if snapshots {
            s.push_str(&format!("{}snapshot(m)\n", indent));
        }
        s.push_str(&format!("{}save(m_full)\n", indent));
        if self.config.stray_fields {
            s.push_str(&format!("{}save(B_demag)\n", indent));
        }
        s.push_str(&format!("{}tablesave()\n", indent));
        s
    }

    fn setup_block(&self) -> String {
        let c = &self.config;
        let g = &c.geometry;
        let m = &c.material;
        let headroom = g.headroom_layers();

        let mut lines: Vec<String> = vec![
            "/* Simulation setup */".into(),
            "TableAdd(E_total)".into(),
            "TableAdd(E_exch)".into(),
            "TableAdd(E_demag)".into(),
            "TableAdd(E_Zeeman)".into(),
            "TableAdd(MaxTorque)".into(),
            "TableAdd(LastErr)".into(),
            "TableAdd(PeakErr)".into(),
            "TableAdd(B_ext)".into(),
            "FixDt = 5e-13".into(),
            "OutputFormat = OVF2_BINARY".into(),
            "EdgeSmooth = 0".into(),
            String::new(),
            "/* Device properties */".into(),
            format!("Height := {}", fmt_num(g.h)),
            format!("Diameter := {}", fmt_num(g.diameter)),
            format!("Axes_ratio := {}", fmt_num(g.axes_ratio)),
            format!("Nx := {}", g.nx),
            format!("Ny := {}", g.ny),
        ];
        if c.stray_fields {
            lines.push(format!(
                "Nz := {} // {} empty layers above the device",
                g.nz + headroom,
                headroom
            ));
        } else {
            lines.push(format!("Nz := {}", g.nz));
        }
        lines.extend([
            "SetGridsize(Nx,Ny,Nz)".to_string(),
            format!("cell_size := {}", fmt_num(g.cell_size)),
            "nm := 1e-9".to_string(),
            "SetCellsize(cell_size*nm,cell_size*nm,cell_size*nm)".to_string(),
        ]);

        if !c.extra.is_empty() {
            lines.push(String::new());
            lines.push("/* Extra parameters */".into());
            for (k, v) in &c.extra {
                lines.push(format!("{} := {}", k, v));
            }
        }

        lines.push(String::new());
        lines.push("/* Geometry */".into());
        match &c.mask {
            Some(mask) if c.contacts => {
                lines.push(format!("geometry := ImageShape(\"{}\")", escape_path(mask)));
            }
            _ => {
                lines.push(format!(
                    "geometry := Ellipse({}*nm,{}*nm)",
                    fmt_num(g.diameter),
                    (g.diameter / g.axes_ratio).trunc() as i64
                ));
            }
        }

        if c.stray_fields {
            lines.extend([
                "DefRegion(1,geometry)".to_string(),
                format!(
                    "DefRegion(2,Layers({},{})) // empty space",
                    g.nz + 1,
                    g.nz + headroom + 1
                ),
                String::new(),
                "/* Physical properties of material */".to_string(),
                format!("Msat.SetRegion(1, {}) // saturation magnetisation", fmt_sci(m.msat)),
                format!("Aex.SetRegion(1, {}) // exchange stiffness", fmt_sci(m.aex)),
                format!("alpha.SetRegion(1, {})", fmt_num(m.alpha)),
                String::new(),
                "/* Starting condition */".to_string(),
                "m.setRegion(1,RandomMag())".to_string(),
            ]);
        } else {
            lines.extend([
                "SetGeom(geometry)".to_string(),
                String::new(),
                "/* Physical properties of material */".to_string(),
                format!("Msat = {} // saturation magnetisation", fmt_sci(m.msat)),
                format!("Aex = {} // exchange stiffness", fmt_sci(m.aex)),
                format!("alpha = {}", fmt_num(m.alpha)),
                String::new(),
                "/* Starting condition */".to_string(),
                "m = RandomMag()".to_string(),
            ]);
        }
        lines.push("B := 0.0".into());

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

/// mumax3 reads string literals with escapes; double single backslashes of Windows paths.
fn escape_path(path: &std::path::Path) -> String {
    let s = path.display().to_string();
    if s.contains("\\\\") {
        s
    } else {
        s.replace('\\', "\\\\")
    }
}
