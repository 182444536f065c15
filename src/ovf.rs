// src/ovf.rs
//
// OOMMF OVF 2.0 rectangular meshes, as written by mumax3 (OutputFormat = OVF2_BINARY).
//
// Reader: text header (`# key: value`) up to `# Begin: Data <kind>`, then the samples,
// x fastest, then y, then z, three components per cell. Binary data starts with a
// check value (1234567.0 for Binary 4, 123456789012345.0 for Binary 8), which is
// validated and skipped.
//
// Writer: Binary 4 with the same layout, used for fixtures and re-exports.

use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, ScripterError};
use crate::grid::Grid3D;
use crate::vector_field::VectorField3D;

pub const CHECK_VALUE_4: f32 = 1234567.0;
pub const CHECK_VALUE_8: f64 = 123456789012345.0;

#[derive(Clone, Debug, PartialEq)]
pub struct OvfHeader {
    pub title: String,
    pub xnodes: usize,
    pub ynodes: usize,
    pub znodes: usize,
    pub xbase: f64,
    pub ybase: f64,
    pub zbase: f64,
    /// Cell steps in mesh units (metres for mumax3).
    pub xstepsize: f64,
    pub ystepsize: f64,
    pub zstepsize: f64,
    pub valuedim: usize,
    pub valuemultiplier: f64,
}

impl OvfHeader {
    pub fn grid(&self) -> Grid3D {
        Grid3D::new(
            self.xnodes,
            self.ynodes,
            self.znodes,
            self.xstepsize,
            self.ystepsize,
            self.zstepsize,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DataKind {
    Binary4,
    Binary8,
    Text,
}

/// Decode one OVF2 file into an (nx, ny, nz, 3) field. Grid steps are kept in metres.
pub fn read_ovf(path: &Path) -> Result<(OvfHeader, VectorField3D)> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    let mut title = String::new();
    let mut nodes: [Option<usize>; 3] = [None; 3];
    let mut base = [0.0f64; 3];
    let mut step: [Option<f64>; 3] = [None; 3];
    let mut valuedim = 3usize;
    let mut valuemultiplier = 1.0f64;
    let kind;

    let mut line = Vec::new();
    loop {
        line.clear();
        if r.read_until(b'\n', &mut line)? == 0 {
            return Err(ScripterError::decode(path, "no '# Begin: Data' marker"));
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim().trim_start_matches('#').trim();

        if let Some(rest) = text.strip_prefix("Begin: Data") {
            kind = match rest.trim() {
                "Binary 4" => DataKind::Binary4,
                "Binary 8" => DataKind::Binary8,
                "Text" => DataKind::Text,
                other => {
                    return Err(ScripterError::decode(
                        path,
                        format!("unsupported data kind '{}'", other),
                    ))
                }
            };
            break;
        }

        let Some((key, value)) = text.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        let num = || {
            value
                .parse::<f64>()
                .map_err(|_| ScripterError::decode(path, format!("bad value for {}: '{}'", key, value)))
        };
        match key.as_str() {
            "title" => title = value.to_string(),
            "xnodes" => nodes[0] = Some(num()? as usize),
            "ynodes" => nodes[1] = Some(num()? as usize),
            "znodes" => nodes[2] = Some(num()? as usize),
            "xbase" => base[0] = num()?,
            "ybase" => base[1] = num()?,
            "zbase" => base[2] = num()?,
            "xstepsize" => step[0] = Some(num()?),
            "ystepsize" => step[1] = Some(num()?),
            "zstepsize" => step[2] = Some(num()?),
            "valuedim" => valuedim = num()? as usize,
            "valuemultiplier" => valuemultiplier = num()?,
            _ => {}
        }
    }

    let [Some(nx), Some(ny), Some(nz)] = nodes else {
        return Err(ScripterError::decode(path, "missing xnodes/ynodes/znodes"));
    };
    if valuedim != 3 {
        return Err(ScripterError::decode(
            path,
            format!("expected a vector field (valuedim 3), got valuedim {}", valuedim),
        ));
    }

    let header = OvfHeader {
        title,
        xnodes: nx,
        ynodes: ny,
        znodes: nz,
        xbase: base[0],
        ybase: base[1],
        zbase: base[2],
        xstepsize: step[0].unwrap_or(1.0),
        ystepsize: step[1].unwrap_or(1.0),
        zstepsize: step[2].unwrap_or(1.0),
        valuedim,
        valuemultiplier,
    };

    let grid = header.grid();
    let n = grid.n_cells() * 3;
    let samples = match kind {
        DataKind::Binary4 => read_binary4(&mut r, n, path)?,
        DataKind::Binary8 => read_binary8(&mut r, n, path)?,
        DataKind::Text => read_text(&mut r, n, path)?,
    };

    let mut field = VectorField3D::zeros(grid);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let s = 3 * grid.idx(i, j, k);
                field.set_vector(
                    i,
                    j,
                    k,
                    [
                        samples[s] * valuemultiplier,
                        samples[s + 1] * valuemultiplier,
                        samples[s + 2] * valuemultiplier,
                    ],
                );
            }
        }
    }
    Ok((header, field))
}

fn read_binary4<R: Read>(r: &mut R, n: usize, path: &Path) -> Result<Vec<f64>> {
    let mut buf = vec![0u8; 4 * (n + 1)];
    r.read_exact(&mut buf)
        .map_err(|_| ScripterError::decode(path, "data block is truncated"))?;
    let mut it = buf
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
    let check = it.next().unwrap_or(0.0);
    if check != CHECK_VALUE_4 {
        return Err(ScripterError::decode(
            path,
            format!("bad Binary 4 check value {} (expected {})", check, CHECK_VALUE_4),
        ));
    }
    Ok(it.map(f64::from).collect())
}

fn read_binary8<R: Read>(r: &mut R, n: usize, path: &Path) -> Result<Vec<f64>> {
    let mut buf = vec![0u8; 8 * (n + 1)];
    r.read_exact(&mut buf)
        .map_err(|_| ScripterError::decode(path, "data block is truncated"))?;
    let mut it = buf.chunks_exact(8).map(|c| {
        let mut b = [0u8; 8];
        b.copy_from_slice(c);
        f64::from_le_bytes(b)
    });
    let check = it.next().unwrap_or(0.0);
    if check != CHECK_VALUE_8 {
        return Err(ScripterError::decode(
            path,
            format!("bad Binary 8 check value {} (expected {})", check, CHECK_VALUE_8),
        ));
    }
    Ok(it.collect())
}

fn read_text<R: BufRead>(r: &mut R, n: usize, path: &Path) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(n);
    let mut line = String::new();
    while out.len() < n {
        line.clear();
        if r.read_line(&mut line)? == 0 {
            return Err(ScripterError::decode(path, "data block is truncated"));
        }
        let t = line.trim();
        if t.starts_with('#') {
            if t.contains("End: Data") {
                return Err(ScripterError::decode(path, "data block is truncated"));
            }
            continue;
        }
        for tok in t.split_whitespace() {
            let v = tok
                .parse::<f64>()
                .map_err(|_| ScripterError::decode(path, format!("bad sample '{}'", tok)))?;
            out.push(v);
        }
    }
    out.truncate(n);
    Ok(out)
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

/// Write `field` as OVF 2.0 Binary 4. Cell steps are taken from `field.grid` (metres).
pub fn write_ovf2_binary4(path: &Path, field: &VectorField3D, title: &str) -> Result<()> {
    ensure_parent_dir(path)?;

    let g = field.grid;
    let mut f = BufWriter::new(File::create(path)?);

    writeln!(f, "# OOMMF OVF 2.0")?;
    writeln!(f, "# Segment count: 1")?;
    writeln!(f, "# Begin: Segment")?;
    writeln!(f, "# Begin: Header")?;
    writeln!(f, "# Title: {}", title)?;
    writeln!(f, "# meshtype: rectangular")?;
    writeln!(f, "# meshunit: m")?;

    writeln!(f, "# xmin: 0")?;
    writeln!(f, "# ymin: 0")?;
    writeln!(f, "# zmin: 0")?;
    writeln!(f, "# xmax: {:.17e}", g.nx as f64 * g.dx)?;
    writeln!(f, "# ymax: {:.17e}", g.ny as f64 * g.dy)?;
    writeln!(f, "# zmax: {:.17e}", g.nz as f64 * g.dz)?;

    writeln!(f, "# valuedim: 3")?;
    writeln!(f, "# valuelabels: {t}_x {t}_y {t}_z", t = title)?;
    writeln!(f, "# valueunits: 1 1 1")?;

    writeln!(f, "# xbase: {:.17e}", 0.5 * g.dx)?;
    writeln!(f, "# ybase: {:.17e}", 0.5 * g.dy)?;
    writeln!(f, "# zbase: {:.17e}", 0.5 * g.dz)?;
    writeln!(f, "# xnodes: {}", g.nx)?;
    writeln!(f, "# ynodes: {}", g.ny)?;
    writeln!(f, "# znodes: {}", g.nz)?;
    writeln!(f, "# xstepsize: {:.17e}", g.dx)?;
    writeln!(f, "# ystepsize: {:.17e}", g.dy)?;
    writeln!(f, "# zstepsize: {:.17e}", g.dz)?;

    writeln!(f, "# End: Header")?;
    writeln!(f, "# Begin: Data Binary 4")?;

    f.write_all(&CHECK_VALUE_4.to_le_bytes())?;
    for k in 0..g.nz {
        for j in 0..g.ny {
            for i in 0..g.nx {
                for v in field.vector(i, j, k) {
                    f.write_all(&(v as f32).to_le_bytes())?;
                }
            }
        }
    }

    writeln!(f)?;
    writeln!(f, "# End: Data Binary 4")?;
    writeln!(f, "# End: Segment")?;
    f.flush()?;
    Ok(())
}
