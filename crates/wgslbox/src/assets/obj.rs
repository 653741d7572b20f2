//! Wavefront OBJ parsing and face expansion
//!
//! The shader reads model geometry as two flat storage buffers — positions
//! and normals — with one entry per drawn vertex and no index buffer, so
//! faces are expanded here. Entries are 16 bytes (`vec3f` plus a zero
//! padding lane) to satisfy the std430 array stride.
//!
//! Supported lines: `v x y z`, `vn x y z`, and `f` with `a`, `a/b`,
//! `a/b/c` or `a//c` vertices. Polygons are fanned around their first
//! vertex. When the file carries no usable normals they are computed by
//! accumulating face cross products into each referenced vertex and
//! normalizing.

use std::fmt;

/// OBJ parse failure, with the 1-based source line
#[derive(Debug)]
pub struct ObjError {
    /// 1-based line number of the offending statement
    pub line: usize,
    /// What went wrong
    pub message: String,
}

impl fmt::Display for ObjError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ObjError {}

/// A parsed model, expanded to flat per-vertex data
#[derive(Debug, Clone)]
pub struct ObjMesh {
    /// One position per drawn vertex; fourth lane is zero padding
    pub positions: Vec<[f32; 4]>,
    /// One unit normal per drawn vertex; fourth lane is zero padding
    pub normals: Vec<[f32; 4]>,
}

impl ObjMesh {
    /// Number of vertices a draw call must issue for this model
    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Raw bytes of the positions buffer
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Raw bytes of the normals buffer
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }
}

/// One corner of a face: position index plus optional normal index, 0-based
#[derive(Debug, Clone, Copy)]
struct FaceVertex {
    position: usize,
    normal: Option<usize>,
}

fn parse_float(token: &str, line: usize, what: &str) -> Result<f32, ObjError> {
    token.parse().map_err(|_| ObjError {
        line,
        message: format!("invalid {what}: `{token}`"),
    })
}

fn parse_index(token: &str, line: usize, limit: usize, what: &str) -> Result<usize, ObjError> {
    let index: usize = token.parse().map_err(|_| ObjError {
        line,
        message: format!("invalid {what} index: `{token}`"),
    })?;
    if index == 0 || index > limit {
        return Err(ObjError {
            line,
            message: format!("{what} index {index} out of range (1..={limit})"),
        });
    }
    Ok(index - 1)
}

/// Parses OBJ text into expanded mesh buffers
pub fn parse_obj(text: &str) -> Result<ObjMesh, ObjError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut file_normals: Vec<[f32; 3]> = Vec::new();
    let mut faces: Vec<Vec<FaceVertex>> = Vec::new();

    for (number, raw_line) in text.lines().enumerate() {
        let line = number + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<&str> = tokens.collect();
                if coords.len() < 3 {
                    return Err(ObjError {
                        line,
                        message: "vertex needs three coordinates".to_string(),
                    });
                }
                positions.push([
                    parse_float(coords[0], line, "vertex x")?,
                    parse_float(coords[1], line, "vertex y")?,
                    parse_float(coords[2], line, "vertex z")?,
                ]);
            }
            Some("vn") => {
                let coords: Vec<&str> = tokens.collect();
                if coords.len() < 3 {
                    return Err(ObjError {
                        line,
                        message: "normal needs three coordinates".to_string(),
                    });
                }
                file_normals.push([
                    parse_float(coords[0], line, "normal x")?,
                    parse_float(coords[1], line, "normal y")?,
                    parse_float(coords[2], line, "normal z")?,
                ]);
            }
            Some("f") => {
                let mut face = Vec::new();
                for corner in tokens {
                    let mut parts = corner.split('/');
                    let position = parse_index(parts.next().unwrap_or(""), line, positions.len(), "position")?;
                    let _texcoord = parts.next();
                    let normal = match parts.next() {
                        Some(token) if !token.is_empty() => Some(parse_index(token, line, file_normals.len(), "normal")?),
                        _ => None,
                    };
                    face.push(FaceVertex { position, normal });
                }
                if face.len() < 3 {
                    return Err(ObjError {
                        line,
                        message: format!("face has {} vertices, needs at least 3", face.len()),
                    });
                }
                faces.push(face);
            }
            // vt, mtllib, usemtl, o, g, s: irrelevant to the engine
            _ => {}
        }
    }

    // Fall back to accumulated normals when the file provides none, or when
    // any face corner omits its normal reference.
    let needs_computed = file_normals.is_empty() || faces.iter().flatten().any(|v| v.normal.is_none());
    let computed = if needs_computed { compute_vertex_normals(&positions, &faces) } else { Vec::new() };

    let mut mesh = ObjMesh {
        positions: Vec::new(),
        normals: Vec::new(),
    };

    for face in &faces {
        // Fan: (0, i, i+1) triangles around the first corner.
        for i in 1..face.len() - 1 {
            for corner in [face[0], face[i], face[i + 1]] {
                let p = positions[corner.position];
                mesh.positions.push([p[0], p[1], p[2], 0.0]);

                let n = match corner.normal {
                    Some(index) if !needs_computed => file_normals[index],
                    _ => computed[corner.position],
                };
                mesh.normals.push([n[0], n[1], n[2], 0.0]);
            }
        }
    }

    Ok(mesh)
}

/// Computes smooth per-vertex normals by accumulating face cross products
fn compute_vertex_normals(positions: &[[f32; 3]], faces: &[Vec<FaceVertex>]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];

    for face in faces {
        for i in 1..face.len() - 1 {
            let i0 = face[0].position;
            let i1 = face[i].position;
            let i2 = face[i + 1].position;

            let v0 = positions[i0];
            let v1 = positions[i1];
            let v2 = positions[i2];

            let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
            let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
            let normal = [
                edge1[1] * edge2[2] - edge1[2] * edge2[1],
                edge1[2] * edge2[0] - edge1[0] * edge2[2],
                edge1[0] * edge2[1] - edge1[1] * edge2[0],
            ];

            for index in [i0, i1, i2] {
                normals[index][0] += normal[0];
                normals[index][1] += normal[1];
                normals[index][2] += normal[2];
            }
        }
    }

    for normal in &mut normals {
        let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > 0.0 {
            normal[0] /= length;
            normal[1] /= length;
            normal[2] /= length;
        }
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";

    #[test]
    fn test_triangle_expansion() {
        let mesh = parse_obj(TRIANGLE).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.positions[0], [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(mesh.positions[2], [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_computed_normal_faces_forward() {
        // Counter-clockwise triangle in the xy plane: normal is +z.
        let mesh = parse_obj(TRIANGLE).unwrap();
        for normal in &mesh.normals {
            assert_eq!(*normal, [0.0, 0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn test_quad_fans_into_two_triangles() {
        let mesh = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        // Fan around vertex 1: (1,2,3) then (1,3,4).
        assert_eq!(mesh.positions[3], [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(mesh.positions[4], [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(mesh.positions[5], [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_file_normals_are_used() {
        let mesh = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 1 0\nf 1//1 2//1 3//1\n",
        )
        .unwrap();
        assert_eq!(mesh.normals[0], [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_slash_forms() {
        let mesh = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1/1/1 2/1/1 3/1/1\n",
        )
        .unwrap();
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let error = parse_obj("v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert_eq!(error.line, 2);
    }

    #[test]
    fn test_comments_and_unknown_lines_are_skipped() {
        let mesh = parse_obj("# bunny\nmtllib bunny.mtl\no bunny\n").unwrap();
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_short_face_is_rejected() {
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").is_err());
    }

    #[test]
    fn test_buffer_bytes_are_sixteen_byte_stride() {
        let mesh = parse_obj(TRIANGLE).unwrap();
        assert_eq!(mesh.position_bytes().len(), 3 * 16);
        assert_eq!(mesh.normal_bytes().len(), 3 * 16);
    }
}
