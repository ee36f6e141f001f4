/// Cumulative (CSR) offset arrays for levels → polygons → vertices.

use std::ops::Range;

use crate::error::{Result, ViewError};

/// Cumulative offsets with a leading 0: `[0, 3, 5]` describes two groups of
/// sizes 3 and 2.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Offsets(Vec<usize>);

impl Offsets {
    /// Validate a cumulative array. An empty array means no groups.
    pub fn new(offsets: Vec<usize>) -> Result<Self> {
        if offsets.is_empty() {
            return Ok(Self(vec![0]));
        }
        if offsets[0] != 0 {
            return Err(ViewError::InvalidArgument(format!(
                "offsets must start at 0, got {}",
                offsets[0]
            )));
        }
        if let Some(i) = offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(ViewError::InvalidArgument(format!(
                "offsets decrease at {} ({} > {})",
                i + 1,
                offsets[i],
                offsets[i + 1]
            )));
        }
        Ok(Self(offsets))
    }

    /// Offsets from per-group sizes
    pub fn from_sizes(sizes: &[usize]) -> Self {
        let mut v = Vec::with_capacity(sizes.len() + 1);
        v.push(0);
        let mut total = 0;
        for s in sizes {
            total += s;
            v.push(total);
        }
        Self(v)
    }

    pub fn groups(&self) -> usize {
        self.0.len() - 1
    }

    pub fn total(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }

    pub fn range(&self, group: usize) -> Option<Range<usize>> {
        Some(*self.0.get(group)?..*self.0.get(group + 1)?)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// Two-level ragged index: levels group polygons, polygons group vertices
#[derive(Debug, Clone, Copy)]
pub struct Ragged<'a> {
    levels: &'a Offsets,
    polygons: &'a Offsets,
}

impl<'a> Ragged<'a> {
    pub fn new(levels: &'a Offsets, polygons: &'a Offsets) -> Result<Self> {
        if levels.total() > polygons.groups() {
            return Err(ViewError::InvalidArgument(format!(
                "levels reference {} polygons but only {} exist",
                levels.total(),
                polygons.groups()
            )));
        }
        Ok(Self { levels, polygons })
    }

    pub fn level_count(&self) -> usize {
        self.levels.groups()
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons.total()
    }

    /// `(first_vertex, vertex_count)` per polygon of `level`
    pub fn draws(&self, level: usize) -> impl Iterator<Item = (usize, usize)> + 'a {
        let polygons = self.polygons;
        self.levels
            .range(level)
            .unwrap_or(0..0)
            .filter_map(move |p| polygons.range(p))
            .map(|r| (r.start, r.len()))
    }
}
