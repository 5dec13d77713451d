//! Wavefront OBJ support for meshes carrying texture coordinates.
//!
//! Only the subset needed for UV work is understood: `v`, `vt` and `f`
//! records. Faces may use the `v`, `v/vt`, `v/vt/vn` or `v//vn` forms, and
//! indices may be negative (relative to the end of the list). Polygons are
//! fan-triangulated.
//!
//! OBJ attaches texture coordinates to face corners, while [`UVMap`] stores
//! one coordinate per vertex. When a vertex is referenced with different
//! `vt` indices the first one wins and a warning is logged.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::algo::parameterize::UVMap;
use crate::error::{MeshError, Result};
use crate::mesh::{build_from_triangles, to_face_vertex, HalfEdgeMesh, MeshIndex};

/// Load a mesh and its per-vertex texture coordinates from an OBJ file.
///
/// Vertices never referenced with a `vt` index get `(0, 0)`.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<(HalfEdgeMesh<I>, UVMap<I>)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read(BufReader::new(file)).map_err(|e| match e {
        MeshError::LoadError { message, .. } => MeshError::LoadError {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Save a mesh and its texture coordinates as OBJ, one `vt` per vertex.
pub fn save<P: AsRef<Path>, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    uv: &UVMap<I>,
    path: P,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, uv, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Parse OBJ data from any buffered reader.
///
/// Errors carry an empty path; [`load`] fills in the real one.
pub fn read<R: BufRead, I: MeshIndex>(reader: R) -> Result<(HalfEdgeMesh<I>, UVMap<I>)> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut tex_coords: Vec<Point2<f64>> = Vec::new();
    let mut corners: Vec<Vec<(usize, Option<usize>)>> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_no + 1;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => positions.push(Point3::from(parse_floats::<3>(tokens, line_no)?)),
            Some("vt") => tex_coords.push(Point2::from(parse_floats::<2>(tokens, line_no)?)),
            Some("f") => {
                let face = tokens
                    .map(|t| parse_corner(t, positions.len(), tex_coords.len(), line_no))
                    .collect::<Result<Vec<_>>>()?;
                if face.len() < 3 {
                    return Err(load_error(line_no, "face has fewer than 3 vertices"));
                }
                corners.push(face);
            }
            _ => {}
        }
    }

    if corners.is_empty() {
        return Err(load_error(0, "file contains no faces"));
    }

    let mut coords = vec![Point2::origin(); positions.len()];
    let mut assigned: Vec<Option<usize>> = vec![None; positions.len()];
    let mut conflicts = 0usize;
    let mut triangles = Vec::with_capacity(corners.len());

    for face in &corners {
        for &(v, vt) in face {
            let Some(vt) = vt else { continue };
            match assigned[v] {
                None => {
                    assigned[v] = Some(vt);
                    coords[v] = tex_coords[vt];
                }
                Some(prev) if prev != vt && tex_coords[prev] != tex_coords[vt] => conflicts += 1,
                Some(_) => {}
            }
        }
        for i in 1..face.len() - 1 {
            triangles.push([face[0].0, face[i].0, face[i + 1].0]);
        }
    }

    if conflicts > 0 {
        log::warn!(
            "{} face corners reference a texture coordinate that differs from their vertex's first one; seams are merged",
            conflicts
        );
    }

    let mesh = build_from_triangles(&positions, &triangles)?;
    Ok((mesh, UVMap::new(coords)))
}

/// Write OBJ data to any writer.
pub fn write<W: Write, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    uv: &UVMap<I>,
    writer: &mut W,
) -> Result<()> {
    if uv.len() < mesh.num_vertices() {
        return Err(MeshError::InvalidState(format!(
            "UV map has {} entries for {} vertices",
            uv.len(),
            mesh.num_vertices()
        )));
    }

    let (positions, faces) = to_face_vertex(mesh);

    writeln!(writer, "# convexuv")?;
    for p in &positions {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for t in &uv.as_slice()[..positions.len()] {
        writeln!(writer, "vt {} {}", t.x, t.y)?;
    }
    for [a, b, c] in &faces {
        writeln!(
            writer,
            "f {}/{} {}/{} {}/{}",
            a + 1,
            a + 1,
            b + 1,
            b + 1,
            c + 1,
            c + 1
        )?;
    }
    Ok(())
}

fn parse_floats<'a, const N: usize>(
    mut tokens: impl Iterator<Item = &'a str>,
    line_no: usize,
) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for slot in &mut out {
        let token = tokens
            .next()
            .ok_or_else(|| load_error(line_no, "missing coordinate"))?;
        *slot = token
            .parse()
            .map_err(|_| load_error(line_no, &format!("invalid number '{}'", token)))?;
    }
    Ok(out)
}

fn parse_corner(
    token: &str,
    num_positions: usize,
    num_tex_coords: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>)> {
    let mut parts = token.split('/');
    let v = parts
        .next()
        .ok_or_else(|| load_error(line_no, "empty face corner"))?;
    let v = resolve_index(v, num_positions, line_no)?;
    let vt = match parts.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, num_tex_coords, line_no)?),
        _ => None,
    };
    Ok((v, vt))
}

/// Convert a 1-based (or negative, end-relative) OBJ index to 0-based.
fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw: i64 = token
        .parse()
        .map_err(|_| load_error(line_no, &format!("invalid index '{}'", token)))?;
    let resolved = if raw > 0 {
        raw - 1
    } else {
        len as i64 + raw
    };
    if raw == 0 || resolved < 0 || resolved >= len as i64 {
        return Err(load_error(
            line_no,
            &format!("index {} out of range ({} defined)", raw, len),
        ));
    }
    Ok(resolved as usize)
}

fn load_error(line_no: usize, message: &str) -> MeshError {
    let message = if line_no == 0 {
        message.to_string()
    } else {
        format!("line {}: {}", line_no, message)
    };
    MeshError::LoadError {
        path: Default::default(),
        message,
    }
}
