//! Batch spacing and sizing for multi-selections.
//!
//! On entering a selection of two or more fields a [`BatchSnapshot`] freezes
//! their geometry and clusters them into rows (similar vertical center) and
//! columns (similar horizontal center). Slider values are always applied to
//! that frozen baseline, never to the previous result, so repeated edits are
//! idempotent.

use fieldcanvas_core::{Field, FieldId, FieldKey, FieldPatch, LocalId};
use serde::{Deserialize, Serialize};

use crate::canvas::ImageSize;
use crate::geometry::{clamp_position, square_width_for_height};

/// Slider values in percent; 100 is the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchAdjust {
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
}

impl Default for BatchAdjust {
    fn default() -> Self {
        Self {
            horizontal_spacing: 100.0,
            vertical_spacing: 100.0,
            width: 100.0,
            height: 100.0,
            font_size: 100.0,
        }
    }
}

impl BatchAdjust {
    pub fn is_baseline(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_finite(&self) -> bool {
        [
            self.horizontal_spacing,
            self.vertical_spacing,
            self.width,
            self.height,
            self.font_size,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Rescales a baseline gap by `value` percent.
///
/// Overlapping (negative) gaps move relative to their magnitude, so raising
/// the slider still opens the layout up.
pub fn rescale_gap(gap: f64, value: f64) -> f64 {
    if gap < 0.0 {
        gap + gap.abs() * (value / 100.0 - 1.0)
    } else {
        gap * value / 100.0
    }
}

#[derive(Debug, Clone)]
struct Member {
    key: FieldKey,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    height_percent: f64,
    font_size: f64,
    boolean: bool,
}

impl Member {
    fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    fn center_y(&self) -> f64 {
        self.y + self.height_percent / 2.0
    }
}

/// Members of one row or column, sorted along its axis, with the edge gaps
/// between consecutive members.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<usize>,
    pub gaps: Vec<f64>,
}

/// Frozen baseline of a multi-selection.
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    members: Vec<Member>,
    rows: Vec<Cluster>,
    columns: Vec<Cluster>,
    image: ImageSize,
}

/// Greedy clustering against the running mean of each cluster.
fn cluster_by(centers: &[f64], tolerance: f64) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..centers.len()).collect();
    order.sort_by(|a, b| centers[*a].total_cmp(&centers[*b]));

    let mut clusters: Vec<(f64, Vec<usize>)> = Vec::new();
    for index in order {
        let center = centers[index];
        match clusters.last_mut() {
            Some((mean, members)) if (center - *mean).abs() <= tolerance => {
                members.push(index);
                *mean += (center - *mean) / members.len() as f64;
            }
            _ => clusters.push((center, vec![index])),
        }
    }
    clusters.into_iter().map(|(_, members)| members).collect()
}

impl BatchSnapshot {
    /// Captures the baseline. Returns `None` for fewer than two fields.
    pub fn capture<'a>(
        fields: impl IntoIterator<Item = &'a Field>,
        image: ImageSize,
    ) -> Option<Self> {
        let members: Vec<Member> = fields
            .into_iter()
            .map(|f| Member {
                key: f.key,
                x: f.x,
                y: f.y,
                width: f.width,
                height: f.height,
                height_percent: f.height_percent(image.height),
                font_size: f.font_size,
                boolean: f.field_type.is_boolean(),
            })
            .collect();
        if members.len() < 2 {
            return None;
        }

        let count = members.len() as f64;
        let avg_height = members.iter().map(|m| m.height_percent).sum::<f64>() / count;
        let avg_width = members.iter().map(|m| m.width).sum::<f64>() / count;

        let centers_y: Vec<f64> = members.iter().map(Member::center_y).collect();
        let centers_x: Vec<f64> = members.iter().map(Member::center_x).collect();

        let rows = cluster_by(&centers_y, avg_height * 0.5)
            .into_iter()
            .map(|mut indices| {
                indices.sort_by(|a, b| members[*a].x.total_cmp(&members[*b].x));
                let gaps = indices
                    .windows(2)
                    .map(|pair| {
                        let (a, b) = (&members[pair[0]], &members[pair[1]]);
                        b.x - (a.x + a.width)
                    })
                    .collect();
                Cluster {
                    members: indices,
                    gaps,
                }
            })
            .collect();

        let columns = cluster_by(&centers_x, avg_width * 0.5)
            .into_iter()
            .map(|mut indices| {
                indices.sort_by(|a, b| members[*a].y.total_cmp(&members[*b].y));
                let gaps = indices
                    .windows(2)
                    .map(|pair| {
                        let (a, b) = (&members[pair[0]], &members[pair[1]]);
                        b.y - (a.y + a.height_percent)
                    })
                    .collect();
                Cluster {
                    members: indices,
                    gaps,
                }
            })
            .collect();

        tracing::debug!("Captured batch snapshot of {} fields", members.len());
        Some(Self {
            members,
            rows,
            columns,
            image,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.members.iter().map(|m| m.key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.members.iter().any(|m| m.key == key)
    }

    pub fn rows(&self) -> &[Cluster] {
        &self.rows
    }

    pub fn columns(&self) -> &[Cluster] {
        &self.columns
    }

    pub fn rekey(&mut self, local: LocalId, id: FieldId) {
        let from = FieldKey::Local(local);
        for member in self.members.iter_mut().filter(|m| m.key == from) {
            member.key = FieldKey::Remote(id);
        }
    }

    /// Geometry of every member under `adjust`, as patches to apply.
    ///
    /// The baseline reproduces the snapshot exactly.
    pub fn apply(&self, adjust: &BatchAdjust) -> Vec<(FieldKey, FieldPatch)> {
        if adjust.is_baseline() || !adjust.is_finite() {
            return self
                .members
                .iter()
                .map(|m| (m.key, Self::patch(m.x, m.y, m.width, m.height, m.font_size)))
                .collect();
        }

        // Sizes scale each member's own baseline independently.
        let sizes: Vec<(f64, f64)> = self
            .members
            .iter()
            .map(|m| {
                if m.boolean {
                    let factor = if adjust.width != 100.0 {
                        adjust.width
                    } else {
                        adjust.height
                    };
                    let side = m.height * factor / 100.0;
                    (square_width_for_height(side, self.image), side)
                } else {
                    (m.width * adjust.width / 100.0, m.height * adjust.height / 100.0)
                }
            })
            .collect();
        let height_percent = |i: usize| {
            if self.image.height > 0.0 {
                sizes[i].1 / self.image.height * 100.0
            } else {
                0.0
            }
        };

        let mut positions: Vec<(f64, f64)> = self.members.iter().map(|m| (m.x, m.y)).collect();

        if adjust.horizontal_spacing != 100.0 {
            for row in self.rows.iter().filter(|r| r.members.len() > 1) {
                let anchor = row.members[0];
                let (anchor_x, anchor_y) = positions[anchor];
                let mut cursor = anchor_x + sizes[anchor].0;
                for (i, &index) in row.members.iter().enumerate().skip(1) {
                    let x = cursor + rescale_gap(row.gaps[i - 1], adjust.horizontal_spacing);
                    positions[index] = (x, anchor_y);
                    cursor = x + sizes[index].0;
                }
            }
        }

        if adjust.vertical_spacing != 100.0 {
            for column in self.columns.iter().filter(|c| c.members.len() > 1) {
                let anchor = column.members[0];
                let (anchor_x, anchor_y) = positions[anchor];
                let mut cursor = anchor_y + height_percent(anchor);
                for (i, &index) in column.members.iter().enumerate().skip(1) {
                    let y = cursor + rescale_gap(column.gaps[i - 1], adjust.vertical_spacing);
                    positions[index] = (anchor_x, y);
                    cursor = y + height_percent(index);
                }
            }
        }

        self.members
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let (width, height) = sizes[i];
                let width = width.min(100.0);
                let (x, y) = clamp_position(positions[i].0, positions[i].1, width, height_percent(i));
                let font_size = m.font_size * adjust.font_size / 100.0;
                (m.key, Self::patch(x, y, width, height, font_size))
            })
            .collect()
    }

    fn patch(x: f64, y: f64, width: f64, height: f64, font_size: f64) -> FieldPatch {
        FieldPatch {
            font_size: Some(font_size),
            ..FieldPatch::position(x, y).merged(FieldPatch::size(width, height))
        }
    }
}
