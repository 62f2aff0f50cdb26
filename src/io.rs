//! Plain-text point sets and polyhedra.
//!
//! A point set is a count `n` followed by `n` coordinate triples. A polyhedron is a face count,
//! then for each face a vertex count followed by that many coordinate triples. All tokens are
//! separated by arbitrary whitespace.
//!
//! ```
//! use cheetah_hull::{io, ConvexHull3d};
//!
//! let input = "4\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n";
//! let points = io::read_points(input.as_bytes()).unwrap();
//! let hull = ConvexHull3d::try_from_points(&points, None).unwrap();
//!
//! let mut output = Vec::new();
//! io::write_polyhedron(&mut output, &hull.polygons()).unwrap();
//! let faces = io::read_polyhedron(output.as_slice()).unwrap();
//! assert_eq!(faces, hull.polygons());
//! ```

use std::io::{self, Read, Write};
use std::str::SplitWhitespace;

use glam::DVec3;
use thiserror::Error;

/// An error returned when reading a point set or polyhedron.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The underlying reader failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The input ended before all announced values were read.
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),
    /// A count is not a non-negative integer.
    #[error("invalid count `{0}`")]
    InvalidCount(String),
    /// A coordinate is not a finite number.
    #[error("invalid coordinate `{0}`")]
    InvalidNumber(String),
}

const MAX_RESERVED_POINTS: usize = 1 << 16;

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_whitespace(),
        }
    }

    fn count(&mut self, what: &'static str) -> Result<usize, ReadError> {
        let token = self.inner.next().ok_or(ReadError::UnexpectedEof(what))?;
        token
            .parse()
            .map_err(|_| ReadError::InvalidCount(token.to_owned()))
    }

    fn number(&mut self) -> Result<f64, ReadError> {
        let token = self
            .inner
            .next()
            .ok_or(ReadError::UnexpectedEof("coordinate"))?;
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ReadError::InvalidNumber(token.to_owned())),
        }
    }

    fn point(&mut self) -> Result<DVec3, ReadError> {
        Ok(DVec3::new(self.number()?, self.number()?, self.number()?))
    }

    fn points(&mut self, count: usize) -> Result<Vec<DVec3>, ReadError> {
        // The count is untrusted, so cap the up-front reservation.
        let mut points = Vec::with_capacity(count.min(MAX_RESERVED_POINTS));
        for _ in 0..count {
            points.push(self.point()?);
        }
        Ok(points)
    }
}

fn read_to_string(mut reader: impl Read) -> Result<String, ReadError> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    Ok(input)
}

/// Reads a point set: a count followed by that many `x y z` triples.
///
/// Anything after the last announced point is ignored.
///
/// # Errors
///
/// Returns a [`ReadError`] if reading fails, the input ends early, or a token is malformed.
pub fn read_points(reader: impl Read) -> Result<Vec<DVec3>, ReadError> {
    let input = read_to_string(reader)?;
    let mut tokens = Tokens::new(&input);
    let count = tokens.count("point count")?;
    tokens.points(count)
}

/// Writes a point set in the format read by [`read_points`].
///
/// Coordinates are written in their shortest exact representation, so reading them back
/// yields identical values.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_points(mut writer: impl Write, points: &[DVec3]) -> io::Result<()> {
    writeln!(writer, "{}", points.len())?;
    for point in points {
        writeln!(writer, "{} {} {}", point.x, point.y, point.z)?;
    }
    writer.flush()
}

/// Reads a polyhedron: a face count, then for each face a vertex count followed by that many
/// `x y z` triples.
///
/// # Errors
///
/// Returns a [`ReadError`] if reading fails, the input ends early, or a token is malformed.
pub fn read_polyhedron(reader: impl Read) -> Result<Vec<Vec<DVec3>>, ReadError> {
    let input = read_to_string(reader)?;
    let mut tokens = Tokens::new(&input);
    let num_faces = tokens.count("face count")?;

    let mut faces = Vec::new();
    for _ in 0..num_faces {
        let num_vertices = tokens.count("vertex count")?;
        faces.push(tokens.points(num_vertices)?);
    }
    Ok(faces)
}

/// Writes the faces of a polyhedron, such as [`ConvexHull3d::polygons`], in the format read by
/// [`read_polyhedron`].
///
/// [`ConvexHull3d::polygons`]: crate::ConvexHull3d::polygons
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_polyhedron(mut writer: impl Write, faces: &[Vec<DVec3>]) -> io::Result<()> {
    writeln!(writer, "{}", faces.len())?;
    for face in faces {
        writeln!(writer, "{}", face.len())?;
        for point in face {
            writeln!(writer, "{} {} {}", point.x, point.y, point.z)?;
        }
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_points_with_arbitrary_whitespace() {
        let input = "3   1 2 3\n\n-4.5\t5e-3 6\n0 0 0 trailing";
        let points = read_points(input.as_bytes()).unwrap();
        assert_eq!(
            points,
            vec![
                DVec3::new(1.0, 2.0, 3.0),
                DVec3::new(-4.5, 0.005, 6.0),
                DVec3::ZERO
            ]
        );
    }

    #[test]
    fn written_points_read_back_exactly() {
        let points = vec![
            DVec3::new(0.1, -1.0 / 3.0, 1e-300),
            DVec3::new(f64::MAX, f64::MIN_POSITIVE, -0.0),
        ];
        let mut output = Vec::new();
        write_points(&mut output, &points).unwrap();
        assert_eq!(read_points(output.as_slice()).unwrap(), points);
    }

    #[test]
    fn read_polyhedron_faces() {
        let input = "2\n3\n0 0 0\n1 0 0\n0 1 0\n1\n5 5 5\n";
        let faces = read_polyhedron(input.as_bytes()).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].len(), 3);
        assert_eq!(faces[1], vec![DVec3::splat(5.0)]);
    }

    #[test]
    fn empty_polyhedron() {
        let mut output = Vec::new();
        write_polyhedron(&mut output, &[]).unwrap();
        assert_eq!(output, b"0\n");
        assert!(read_polyhedron(output.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn truncated_input() {
        assert!(matches!(
            read_points("".as_bytes()),
            Err(ReadError::UnexpectedEof("point count"))
        ));
        assert!(matches!(
            read_points("2 1 2 3 4 5".as_bytes()),
            Err(ReadError::UnexpectedEof("coordinate"))
        ));
        assert!(matches!(
            read_polyhedron("1".as_bytes()),
            Err(ReadError::UnexpectedEof("vertex count"))
        ));
    }

    #[test]
    fn malformed_tokens() {
        assert!(matches!(
            read_points("-1".as_bytes()),
            Err(ReadError::InvalidCount(token)) if token == "-1"
        ));
        assert!(matches!(
            read_points("1 0 x 0".as_bytes()),
            Err(ReadError::InvalidNumber(token)) if token == "x"
        ));
        assert!(matches!(
            read_points("1 0 inf 0".as_bytes()),
            Err(ReadError::InvalidNumber(token)) if token == "inf"
        ));
    }
}
