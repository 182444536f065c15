// src/log_params.rs
//
// Recover the device parameters from mumax3's `log.txt`, which echoes every
// script line. Three line shapes carry a value:
//
//   alpha.SetRegion(1, 0.5)          region assignment
//   geometry := Ellipse(1000*nm,500*nm)   function call
//   Height := 50   /   alpha = 0.5   constant or plain assignment
//
// The first matching line wins; trailing `//` comments are dropped first.

use std::path::{Path, PathBuf};

use log::info;
use regex::Regex;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Ellipse { a_nm: f64, b_nm: f64 },
    /// Mask image, as written in the script (relative to the project directory).
    ImageShape(PathBuf),
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogParams {
    pub height: Option<f64>,
    pub diameter: Option<f64>,
    pub axes_ratio: Option<f64>,
    pub cell_size: Option<f64>,
    pub alpha: Option<f64>,
    pub geometry: Option<Geometry>,
}

impl LogParams {
    /// z slice through the middle of the device, when height and cell size are known.
    pub fn mid_slice(&self) -> Option<usize> {
        match (self.height, self.cell_size) {
            (Some(h), Some(c)) if c > 0.0 => Some((h / c / 2.0).trunc() as usize),
            _ => None,
        }
    }

    /// Mask image referenced by an `ImageShape` geometry.
    pub fn mask_image(&self) -> Option<&Path> {
        match &self.geometry {
            Some(Geometry::ImageShape(p)) => Some(p),
            _ => None,
        }
    }
}

/// One compiled set of line shapes for a parameter name.
struct Shapes {
    region: Regex,
    call: Regex,
    assign: Regex,
}

impl Shapes {
    fn for_name(name: &str) -> Result<Self> {
        let n = regex::escape(name);
        Ok(Self {
            region: Regex::new(&format!(r"^{n}\.SetRegion\(\s*1\s*,\s*(.+?)\s*\)$"))?,
            call: Regex::new(&format!(r"^{n}\s*:?=\s*([A-Za-z_]\w*\(.*\))$"))?,
            assign: Regex::new(&format!(r"^{n}\s*:?=\s*(.+?)$"))?,
        })
    }

    /// Raw value text of the first shape that matches `line`.
    fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        [&self.region, &self.call, &self.assign]
            .into_iter()
            .find_map(|re| re.captures(line))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(p) => line[..p].trim(),
        None => line.trim(),
    }
}

/// First value captured for `name` over `lines`.
fn first_value<'a>(lines: &[&'a str], name: &str) -> Result<Option<&'a str>> {
    let shapes = Shapes::for_name(name)?;
    Ok(lines.iter().find_map(|l| shapes.capture(l)))
}

fn parse_geometry(raw: &str) -> Result<Geometry> {
    let call = Regex::new(r"^(\w+)\((.*)\)$")?;
    let Some(c) = call.captures(raw) else {
        return Ok(Geometry::Other(raw.to_string()));
    };
    let (func, args) = (&c[1], c[2].trim());
    let geometry = match func {
        "ImageShape" => Geometry::ImageShape(PathBuf::from(
            args.trim_matches('"').replace("\\\\", "\\"),
        )),
        "Ellipse" => {
            let nm = |s: &str| s.trim().trim_end_matches("*nm").trim().parse::<f64>().ok();
            match args.split_once(',') {
                Some((a, b)) => match (nm(a), nm(b)) {
                    (Some(a_nm), Some(b_nm)) => Geometry::Ellipse { a_nm, b_nm },
                    _ => Geometry::Other(raw.to_string()),
                },
                None => Geometry::Other(raw.to_string()),
            }
        }
        _ => Geometry::Other(raw.to_string()),
    };
    Ok(geometry)
}

pub fn parse_log(text: &str) -> Result<LogParams> {
    let lines: Vec<&str> = text.lines().map(strip_comment).collect();
    let num = |name: &str| -> Result<Option<f64>> {
        Ok(first_value(&lines, name)?.and_then(|v| v.parse::<f64>().ok()))
    };

    Ok(LogParams {
        height: num("Height")?,
        diameter: num("Diameter")?,
        axes_ratio: num("Axes_ratio")?,
        cell_size: num("cell_size")?,
        alpha: num("alpha")?,
        geometry: first_value(&lines, "geometry")?
            .map(parse_geometry)
            .transpose()?,
    })
}

pub fn read_log_params(path: &Path) -> Result<LogParams> {
    info!("Trying to read parameters from log file.");
    let text = std::fs::read_to_string(path)?;
    let params = parse_log(&text)?;
    info!("Found the following parameter values: {:?}", params);
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
//mumax 3.10 linux_amd64 go1.14
TableAdd(E_total)
Height := 50
Diameter := 1000 // long axis
Axes_ratio := 2
cell_size := 5
geometry := Ellipse(1000*nm,500*nm)
alpha = 0.5
";

    #[test]
    fn constants_calls_and_assignments() {
        let p = parse_log(LOG).unwrap();
        assert_eq!(p.height, Some(50.0));
        assert_eq!(p.diameter, Some(1000.0));
        assert_eq!(p.axes_ratio, Some(2.0));
        assert_eq!(p.cell_size, Some(5.0));
        assert_eq!(p.alpha, Some(0.5));
        assert_eq!(
            p.geometry,
            Some(Geometry::Ellipse {
                a_nm: 1000.0,
                b_nm: 500.0
            })
        );
        assert_eq!(p.mid_slice(), Some(5));
    }

    #[test]
    fn region_assignment_and_image_shape() {
        let log = "geometry := ImageShape(\"Masks\\\\Co(h60,d800,cx).png\")\n\
                   alpha.SetRegion(1, 0.02)\n\
                   alpha = 0.9\n";
        let p = parse_log(log).unwrap();
        // first matching line wins
        assert_eq!(p.alpha, Some(0.02));
        assert_eq!(
            p.mask_image(),
            Some(Path::new("Masks\\Co(h60,d800,cx).png"))
        );
        assert_eq!(p.height, None);
        assert_eq!(p.mid_slice(), None);
    }

    #[test]
    fn names_must_match_whole_identifiers() {
        // `Axes_ratio` must not be picked up by a longer name, nor alpha by `alphabet`
        let p = parse_log("alphabet := 3\nHeightmap := 1\n").unwrap();
        assert_eq!(p.alpha, None);
        assert_eq!(p.height, None);
    }

    #[test]
    fn unknown_geometry_is_kept_as_text() {
        let p = parse_log("geometry := Cuboid(100*nm,100*nm,10*nm)\n").unwrap();
        assert_eq!(
            p.geometry,
            Some(Geometry::Other("Cuboid(100*nm,100*nm,10*nm)".into()))
        );
    }
}
