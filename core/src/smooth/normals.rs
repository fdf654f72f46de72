//! Smooth-normal computation.
//!
//! Vertices that share a position (bit for bit, see [`position_key`]) form a
//! group; every member of a group of two or more receives the normalized sum
//! of the group's normals. Vertices with a unique position keep their normal.

use std::collections::HashMap;
use std::time::Instant;

use crate::math::{Vec3, position_key, try_normalize};
use crate::profiling::{profile_function, profile_plot, profile_scope};

use super::error::SmoothError;

/// Partition of vertex indices by exact position.
///
/// Groups are numbered in order of their first vertex, and members within a
/// group are listed in ascending index order. Every index in
/// `0..vertex_count` belongs to exactly one group.
#[derive(Debug, Clone)]
pub struct PositionGroups {
    /// Group number of each vertex.
    group_of: Vec<usize>,
    /// `members[offsets[g]..offsets[g + 1]]` are the vertices of group `g`.
    offsets: Vec<usize>,
    members: Vec<usize>,
}

impl PositionGroups {
    /// Group `positions` by exact equality.
    pub fn build(positions: &[Vec3]) -> Self {
        profile_scope!("group_positions");

        let mut lookup: HashMap<[u32; 3], usize> = HashMap::with_capacity(positions.len());
        let mut group_of = Vec::with_capacity(positions.len());
        let mut counts: Vec<usize> = Vec::new();

        for p in positions {
            let next = counts.len();
            let group = *lookup.entry(position_key(p)).or_insert(next);
            if group == next {
                counts.push(0);
            }
            counts[group] += 1;
            group_of.push(group);
        }

        let mut offsets = Vec::with_capacity(counts.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for count in &counts {
            total += count;
            offsets.push(total);
        }

        let mut cursor: Vec<usize> = offsets[..counts.len()].to_vec();
        let mut members = vec![0usize; positions.len()];
        for (index, &group) in group_of.iter().enumerate() {
            let slot = &mut cursor[group];
            members[*slot] = index;
            *slot += 1;
        }

        Self {
            group_of,
            offsets,
            members,
        }
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Whether there are no groups (empty input).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of vertices that were grouped.
    pub fn vertex_count(&self) -> usize {
        self.group_of.len()
    }

    /// True when every position is distinct, so smoothing changes nothing.
    pub fn is_degenerate(&self) -> bool {
        self.len() == self.vertex_count()
    }

    /// Group number of vertex `index`.
    pub fn group_of(&self, index: usize) -> Option<usize> {
        self.group_of.get(index).copied()
    }

    /// Members of group `group`, or `None` if there is no such group.
    pub fn group(&self, group: usize) -> Option<&[usize]> {
        let start = *self.offsets.get(group)?;
        let end = *self.offsets.get(group + 1)?;
        Some(&self.members[start..end])
    }

    /// Iterate over groups as index slices.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.offsets
            .windows(2)
            .map(|bounds| &self.members[bounds[0]..bounds[1]])
    }
}

/// Compute smoothed normals for a vertex buffer.
///
/// Returns a buffer with the same length and indexing as `normals`.
///
/// If a group's normals cancel out (zero sum), every member receives the
/// original normal of the group's lowest-indexed vertex instead.
///
/// # Errors
///
/// [`SmoothError::LengthMismatch`] if the buffers differ in length.
///
/// # Example
///
/// ```
/// use meshsmooth_core::math::Vec3;
/// use meshsmooth_core::smooth::compute_smooth_normals;
///
/// let positions = [Vec3::zeros(), Vec3::zeros(), Vec3::x()];
/// let normals = [Vec3::x(), Vec3::y(), Vec3::z()];
///
/// let smoothed = compute_smooth_normals(&positions, &normals).unwrap();
/// let diagonal = Vec3::new(1.0, 1.0, 0.0).normalize();
/// assert!((smoothed[0] - diagonal).norm() < 1e-6);
/// assert_eq!(smoothed[0], smoothed[1]);
/// assert_eq!(smoothed[2], Vec3::z());
/// ```
pub fn compute_smooth_normals(
    positions: &[Vec3],
    normals: &[Vec3],
) -> Result<Vec<Vec3>, SmoothError> {
    profile_function!();

    if positions.len() != normals.len() {
        return Err(SmoothError::LengthMismatch {
            positions: positions.len(),
            normals: normals.len(),
        });
    }

    let start = Instant::now();
    let groups = PositionGroups::build(positions);
    let mut smoothed = normals.to_vec();

    if !groups.is_degenerate() {
        profile_scope!("average_groups");
        for members in groups.iter().filter(|m| m.len() > 1) {
            let sum: Vec3 = members.iter().map(|&i| normals[i]).sum();
            let value = try_normalize(&sum).unwrap_or(normals[members[0]]);
            for &i in members {
                smoothed[i] = value;
            }
        }
    }

    profile_plot!("smooth_vertex_count", positions.len());
    log::debug!(
        "smoothed {} normals in {:.3} ms across {} position groups",
        positions.len(),
        start.elapsed().as_secs_f64() * 1000.0,
        groups.len()
    );

    Ok(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn test_groups_example() {
        let positions = [Vec3::zeros(), Vec3::zeros(), Vec3::x()];
        let groups = PositionGroups::build(&positions);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.vertex_count(), 3);
        assert!(!groups.is_degenerate());
        assert_eq!(groups.group(0), Some(&[0, 1][..]));
        assert_eq!(groups.group(1), Some(&[2][..]));
        assert_eq!(groups.group(2), None);
        assert_eq!(groups.group_of(1), Some(0));
        assert_eq!(groups.group_of(3), None);
    }

    #[test]
    fn test_groups_interleaved_members_sorted() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-1.0, 0.5, 0.0);
        let positions = [a, b, a, b, b, a];
        let groups = PositionGroups::build(&positions);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.group(0), Some(&[0, 2, 5][..]));
        assert_eq!(groups.group(1), Some(&[1, 3, 4][..]));
    }

    #[test]
    fn test_groups_empty() {
        let groups = PositionGroups::build(&[]);
        assert!(groups.is_empty());
        assert!(groups.is_degenerate());
        assert_eq!(groups.iter().count(), 0);
        assert_eq!(groups.group(0), None);
    }

    #[test]
    fn test_two_shared_positions() {
        let positions = [Vec3::zeros(), Vec3::zeros(), Vec3::x()];
        let normals = [Vec3::x(), Vec3::y(), Vec3::z()];
        let out = compute_smooth_normals(&positions, &normals).unwrap();

        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!(approx_eq(&out[0], &expected, 1e-6));
        assert_eq!(out[0], out[1]);
        assert_eq!(out[2], Vec3::z());
    }

    #[test]
    fn test_all_distinct_is_copy() {
        let positions = [Vec3::x(), Vec3::y(), Vec3::z()];
        let normals = [
            Vec3::new(0.3, 0.4, 0.5),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(f32::NAN, 1.0, 0.0),
        ];
        let out = compute_smooth_normals(&positions, &normals).unwrap();

        assert_eq!(out.len(), 3);
        for (o, n) in out.iter().zip(normals.iter()) {
            for k in 0..3 {
                assert_eq!(o[k].to_bits(), n[k].to_bits());
            }
        }
    }

    #[test]
    fn test_length_mismatch() {
        let err = compute_smooth_normals(&[Vec3::zeros(); 3], &[Vec3::z(); 2]).unwrap_err();
        assert_eq!(
            err,
            SmoothError::LengthMismatch {
                positions: 3,
                normals: 2
            }
        );
    }

    #[test]
    fn test_cancelling_normals_fall_back_to_first_member() {
        let positions = [Vec3::zeros(); 2];
        let normals = [Vec3::x(), -Vec3::x()];
        let out = compute_smooth_normals(&positions, &normals).unwrap();

        assert_eq!(out, vec![Vec3::x(), Vec3::x()]);
        assert!(out.iter().all(|n| n.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_sum_is_not_averaged_before_normalizing() {
        // Three members: two along +y, one along +x. normalize(1, 2, 0).
        let positions = [Vec3::zeros(); 3];
        let normals = [Vec3::y(), Vec3::x(), Vec3::y()];
        let out = compute_smooth_normals(&positions, &normals).unwrap();

        let expected = Vec3::new(1.0, 2.0, 0.0).normalize();
        for n in &out {
            assert!(approx_eq(n, &expected, 1e-6));
        }
    }

    #[test]
    fn test_empty_input() {
        let out = compute_smooth_normals(&[], &[]).unwrap();
        assert!(out.is_empty());
    }
}
