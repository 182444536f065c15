// src/params.rs
//
// Physical defaults and user overrides. Defaults describe a cobalt elliptical
// cylinder; every field of `ParamOverrides` replaces its default when set.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ALPHA: f64 = 0.5; // LL damping
pub const DEFAULT_EXCHANGE_LENGTH_NM: f64 = 5.0;
pub const DEFAULT_MSAT: f64 = 1440e3; // A/m
pub const DEFAULT_AEX: f64 = 31e-12; // J/m
pub const DEFAULT_HEIGHT_NM: f64 = 50.0;
pub const DEFAULT_DIAMETER_NM: f64 = 1000.0;
pub const DEFAULT_AXES_RATIO: f64 = 2.0;
pub const DEFAULT_CELL_SIZE_NM: f64 = 5.0;

/// Native long-axis diameter (nm) the reference contact mask was drawn for.
pub const REFERENCE_MASK_DIAMETER_NM: f64 = 800.0;
/// Reference contact mask, relative to the project directory.
pub const REFERENCE_MASK: &str = "Masks/Co(h60,d800,cx).png";

/// Vacuum headroom (nm) added above the device when stray fields are recorded.
pub const STRAY_FIELD_HEADROOM_NM: f64 = 50.0;

/// Passthrough value for parameters the resolver does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for ExtraValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtraValue::Bool(b) => write!(f, "{}", b),
            ExtraValue::Number(x) => write!(f, "{}", fmt_num(*x)),
            ExtraValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// User-supplied parameters. `None` means "use the default".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamOverrides {
    pub name: Option<String>,
    pub alpha: Option<f64>,
    pub exchange_length: Option<f64>,
    #[serde(rename = "Msat")]
    pub msat: Option<f64>,
    #[serde(rename = "Aex")]
    pub aex: Option<f64>,
    pub h: Option<f64>,
    #[serde(rename = "D")]
    pub diameter: Option<f64>,
    pub axes_ratio: Option<f64>,
    pub cell_size: Option<f64>,
    pub contacts: Option<bool>,
    pub custom_mask: Option<PathBuf>,
    pub stray_fields: Option<bool>,
    /// Any key not listed above; emitted verbatim into the script.
    #[serde(flatten)]
    pub extra: BTreeMap<String, ExtraValue>,
}

impl ParamOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn height(mut self, h: f64) -> Self {
        self.h = Some(h);
        self
    }

    pub fn diameter(mut self, d: f64) -> Self {
        self.diameter = Some(d);
        self
    }

    pub fn axes_ratio(mut self, r: f64) -> Self {
        self.axes_ratio = Some(r);
        self
    }

    pub fn cell_size(mut self, c: f64) -> Self {
        self.cell_size = Some(c);
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn contacts(mut self, on: bool) -> Self {
        self.contacts = Some(on);
        self
    }

    pub fn custom_mask<P: Into<PathBuf>>(mut self, mask: P) -> Self {
        self.custom_mask = Some(mask.into());
        self
    }

    pub fn stray_fields(mut self, on: bool) -> Self {
        self.stray_fields = Some(on);
        self
    }

    pub fn extra<S: Into<String>>(mut self, key: S, value: ExtraValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Format a number the way a person would type it into a script:
/// integral values without a fractional part, everything else in shortest form.
pub fn fmt_num(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// Exponent form for material constants (`1.44e6`, `3.1e-11`).
pub fn fmt_sci(x: f64) -> String {
    format!("{:e}", x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_format_like_handwritten_scripts() {
        assert_eq!(fmt_num(50.0), "50");
        assert_eq!(fmt_num(2.0), "2");
        assert_eq!(fmt_num(2.5), "2.5");
        assert_eq!(fmt_num(-10.0), "-10");
        assert_eq!(fmt_num(0.25), "0.25");
        assert_eq!(fmt_sci(1440e3), "1.44e6");
        assert_eq!(fmt_sci(31e-12), "3.1e-11");
    }

    #[test]
    fn overrides_parse_from_toml_with_extras() {
        let raw = r#"
            name = "disk"
            D = 800.0
            axes_ratio = 1.0
            stray_fields = true
            Ku1 = 4.5e5
            anisU = "vector(0,0,1)"
        "#;
        let o: ParamOverrides = toml::from_str(raw).expect("valid overrides");
        assert_eq!(o.name.as_deref(), Some("disk"));
        assert_eq!(o.diameter, Some(800.0));
        assert_eq!(o.stray_fields, Some(true));
        assert_eq!(o.h, None);
        assert_eq!(o.extra.get("Ku1"), Some(&ExtraValue::Number(4.5e5)));
        assert_eq!(
            o.extra.get("anisU"),
            Some(&ExtraValue::Text("vector(0,0,1)".into()))
        );
    }
}
