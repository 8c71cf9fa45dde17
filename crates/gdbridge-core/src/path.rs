//! Drawing paths and their host encoding.
//!
//! On the host side a path is a flat array mixing command strings and coordinate objects:
//! `"moveto" c`, `"lineto" c`, `"curveto" c1 c2 c`, `"closepath"`. Any other string is passed
//! through verbatim as a raw command.

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::invocation::module_table;
use gdbridge_host::{Host, TableRef, Value};
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Reads the `x` / `y` fields of a host coordinate object.
    pub fn from_host(host: &dyn Host, table: TableRef) -> Result<Self> {
        let field = |name: &str| -> Result<f64> {
            host.get_field(table, name)?
                .as_number()
                .ok_or_else(|| Error::MissingField {
                    owner: "coordinate".to_string(),
                    field: name.to_string(),
                })
        };
        Ok(Self::new(field("x")?, field("y")?))
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Axis-aligned extent of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl BoundingBox {
    /// `None` for an empty point set.
    pub fn from_points(points: impl IntoIterator<Item = Coordinate>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut bb = BoundingBox {
            min: first,
            max: first,
        };
        for p in it {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.y = bb.min.y.min(p.y);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.y = bb.max.y.max(p.y);
        }
        Some(bb)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Move(Coordinate),
    Line(Coordinate),
    Curve(Coordinate, Coordinate, Coordinate),
    Close,
    /// A host command string without coordinates that the bridge does not interpret.
    Raw(String),
}

/// An edge or vertex path.
///
/// A fresh edge path is *unset*: nobody authored it, and synchronization replaces it by a
/// straight line between the end-point anchors. Any append, and [`Path::clear`], makes the path
/// explicit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<Segment>,
    unset: bool,
}

impl Path {
    /// An explicit, empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// A path that will be synthesized at synchronization time unless appended to.
    pub fn unset() -> Self {
        Self {
            segments: Vec::new(),
            unset: true,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.unset
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.unset = false;
    }

    pub fn push(&mut self, segment: Segment) {
        self.unset = false;
        self.segments.push(segment);
    }

    pub fn append_move(&mut self, x: f64, y: f64) {
        self.push(Segment::Move(Coordinate::new(x, y)));
    }

    pub fn append_line(&mut self, x: f64, y: f64) {
        self.push(Segment::Line(Coordinate::new(x, y)));
    }

    pub fn append_curve(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        self.push(Segment::Curve(
            Coordinate::new(x1, y1),
            Coordinate::new(x2, y2),
            Coordinate::new(x, y),
        ));
    }

    pub fn append_close(&mut self) {
        self.push(Segment::Close);
    }

    pub fn append_raw(&mut self, command: impl Into<String>) {
        self.push(Segment::Raw(command.into()));
    }

    /// Every coordinate of the path, in order.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.segments.iter().flat_map(|s| match s {
            Segment::Move(c) | Segment::Line(c) => vec![*c],
            Segment::Curve(a, b, c) => vec![*a, *b, *c],
            Segment::Close | Segment::Raw(_) => Vec::new(),
        })
    }

    /// Decodes a host path array.
    pub fn from_host(host: &dyn Host, table: TableRef) -> Result<Self> {
        let n = host.raw_len(table)?;
        let mut entries = Vec::with_capacity(n);
        for i in 1..=n {
            entries.push(host.get_index(table, i)?);
        }

        let mut path = Path::new();
        let mut i = 0;
        let take = |i: &mut usize, command: &str| -> Result<Coordinate> {
            *i += 1;
            match entries.get(*i) {
                Some(Value::Table(t)) => Coordinate::from_host(host, *t),
                _ => Err(Error::MalformedPath {
                    message: format!("'{command}' at entry {} lacks a coordinate", *i),
                }),
            }
        };
        while i < entries.len() {
            match &entries[i] {
                Value::String(command) => match command.as_str() {
                    "moveto" => path.push(Segment::Move(take(&mut i, command)?)),
                    "lineto" => path.push(Segment::Line(take(&mut i, command)?)),
                    "curveto" => {
                        let a = take(&mut i, command)?;
                        let b = take(&mut i, command)?;
                        let c = take(&mut i, command)?;
                        path.push(Segment::Curve(a, b, c));
                    }
                    "closepath" => path.push(Segment::Close),
                    _ => path.push(Segment::Raw(command.clone())),
                },
                Value::Table(_) => {
                    return Err(Error::MalformedPath {
                        message: format!("coordinate at entry {} follows no command", i + 1),
                    });
                }
                other => {
                    return Err(Error::MalformedPath {
                        message: format!("unexpected {} at entry {}", other.kind(), i + 1),
                    });
                }
            }
            i += 1;
        }
        Ok(path)
    }
}

/// Writes native paths back as fresh host path objects.
pub struct PathEncoder<'h> {
    host: &'h dyn Host,
    coordinate_new: Value,
    path_class: TableRef,
}

impl<'h> PathEncoder<'h> {
    pub fn new(host: &'h dyn Host, config: &BridgeConfig) -> Result<Self> {
        let coordinate_class = module_table(host, &config.modules.coordinate)?;
        let coordinate_new = host.get_field(coordinate_class, "new")?;
        let path_class = module_table(host, &config.modules.path)?;
        Ok(Self {
            host,
            coordinate_new,
            path_class,
        })
    }

    pub fn coordinate(&self, c: Coordinate) -> Result<Value> {
        Ok(self
            .host
            .call_one(&self.coordinate_new, &[Value::Number(c.x), Value::Number(c.y)])?)
    }

    pub fn encode(&self, path: &Path) -> Result<TableRef> {
        let host = self.host;
        let table = host.create_table()?;
        host.set_metatable(table, Some(self.path_class))?;
        let mut n = 0usize;
        let mut push = |value: Value| -> Result<()> {
            n += 1;
            host.set(table, n.into(), value)?;
            Ok(())
        };
        for segment in path.segments() {
            match segment {
                Segment::Move(c) => {
                    push(Value::from("moveto"))?;
                    push(self.coordinate(*c)?)?;
                }
                Segment::Line(c) => {
                    push(Value::from("lineto"))?;
                    push(self.coordinate(*c)?)?;
                }
                Segment::Curve(a, b, c) => {
                    push(Value::from("curveto"))?;
                    push(self.coordinate(*a)?)?;
                    push(self.coordinate(*b)?)?;
                    push(self.coordinate(*c)?)?;
                }
                Segment::Close => push(Value::from("closepath"))?,
                Segment::Raw(command) => push(Value::from(command.as_str()))?,
            }
        }
        Ok(table)
    }
}
