//! Mesh file I/O.
//!
//! UV repair needs both geometry and texture coordinates, so loading
//! returns a mesh together with its [`UVMap`].
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | `v`, `vt` and `f` records |
//!
//! # Usage
//!
//! ```no_run
//! use convexuv::io::{load_with_uvs, save_with_uvs};
//! use convexuv::mesh::HalfEdgeMesh;
//!
//! let (mesh, uv): (HalfEdgeMesh, _) = load_with_uvs("patch.obj").unwrap();
//! save_with_uvs(&mesh, &uv, "copy.obj").unwrap();
//! ```

pub mod obj;

use std::path::Path;

use crate::algo::parameterize::UVMap;
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshIndex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh and its texture coordinates, detecting the format from the
/// file extension.
pub fn load_with_uvs<P: AsRef<Path>, I: MeshIndex>(
    path: P,
) -> Result<(HalfEdgeMesh<I>, UVMap<I>)> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
    }
}

/// Save a mesh and its texture coordinates, detecting the format from the
/// file extension.
pub fn save_with_uvs<P: AsRef<Path>, I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    uv: &UVMap<I>,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save(mesh, uv, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/patch.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("patch.stl"), None);
        assert_eq!(Format::from_path("patch"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_with_uvs::<_, u32>("patch.ply").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { ref extension } if extension == "ply"));

        let err = load_with_uvs::<_, u32>("patch").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { ref extension } if extension == "(none)"));
    }

    #[test]
    fn test_save_and_load_file() {
        let data = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";
        let (mesh, uv): (HalfEdgeMesh, _) = obj::read(std::io::Cursor::new(data)).unwrap();

        let path = std::env::temp_dir().join(format!("convexuv-io-{}.obj", std::process::id()));
        save_with_uvs(&mesh, &uv, &path).unwrap();
        let (loaded, loaded_uv): (HalfEdgeMesh, _) = load_with_uvs(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.num_faces(), 1);
        assert_eq!(loaded_uv, uv);
    }
}
