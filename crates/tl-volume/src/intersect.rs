use tl_core::{Box3i, Error, Point3f};

use crate::ExplicitVolume;

/// Intersects two volumes of the same resolution.
///
/// The result is the smallest box containing voxels that are non-zero in
/// both inputs, placed in world space; each voxel holds the minimum of the
/// two corresponding values. Disjoint inputs give an empty volume, which is
/// not an error.
pub fn intersect<T>(
    a: &ExplicitVolume<T>,
    b: &ExplicitVolume<T>,
) -> Result<ExplicitVolume<T>, Error>
where
    T: Copy + Default + PartialEq + PartialOrd,
{
    if a.resolution() != b.resolution() {
        return Err(Error::InvalidInput(format!(
            "volume resolutions {:?} and {:?} differ",
            a.resolution(),
            b.resolution()
        )));
    }

    let background = T::default();
    let resolution = a.resolution();

    // discrete offset from a to b
    let delta = a.offset() - b.offset();
    let offset_ab = [
        (delta.x / resolution.x).round() as i64,
        (delta.y / resolution.y).round() as i64,
        (delta.z / resolution.z).round() as i64,
    ];

    let b_dbb = b.discrete_bounding_box();

    // discrete bounding box of the result, relative to a
    let mut c_dbb = Box3i::default();
    for z in 0..a.depth() {
        for y in 0..a.height() {
            for x in 0..a.width() {
                if a.value(x, y, z) == background {
                    continue;
                }

                let b_pos = [
                    x as i64 + offset_ab[0],
                    y as i64 + offset_ab[1],
                    z as i64 + offset_ab[2],
                ];
                if !b_dbb.contains(b_pos) {
                    continue;
                }
                if b.value(b_pos[0] as usize, b_pos[1] as usize, b_pos[2] as usize)
                    == background
                {
                    continue;
                }

                c_dbb.fit(Box3i::new(
                    [x as i64, y as i64, z as i64],
                    [x as i64 + 1, y as i64 + 1, z as i64 + 1],
                ));
            }
        }
    }

    let mut c = ExplicitVolume::default();
    c.set_resolution(resolution);

    if c_dbb.is_empty() {
        return Ok(c);
    }

    c.resize(
        c_dbb.width() as usize,
        c_dbb.height() as usize,
        c_dbb.depth() as usize,
    );
    c.set_offset(
        a.offset()
            + Point3f::new(
                c_dbb.min[0] as f32,
                c_dbb.min[1] as f32,
                c_dbb.min[2] as f32,
            ) * resolution,
    );

    for z in 0..c.depth() {
        for y in 0..c.height() {
            for x in 0..c.width() {
                let a_pos = [
                    x as i64 + c_dbb.min[0],
                    y as i64 + c_dbb.min[1],
                    z as i64 + c_dbb.min[2],
                ];
                let value_a = a.value(a_pos[0] as usize, a_pos[1] as usize, a_pos[2] as usize);
                if value_a == background {
                    continue;
                }

                let b_pos = [
                    a_pos[0] + offset_ab[0],
                    a_pos[1] + offset_ab[1],
                    a_pos[2] + offset_ab[2],
                ];
                if !b_dbb.contains(b_pos) {
                    continue;
                }
                let value_b =
                    b.value(b_pos[0] as usize, b_pos[1] as usize, b_pos[2] as usize);

                let value = if value_a < value_b { value_a } else { value_b };
                c.set_value(x, y, z, value);
            }
        }
    }

    Ok(c)
}

#[cfg(test)]
mod tests {
    use tl_core::Point3f;

    use super::intersect;
    use crate::ExplicitVolume;

    #[test]
    fn overlap_takes_the_minimum_value() {
        let mut a = ExplicitVolume::<u8>::new(3, 1, 1);
        a.set_value(0, 0, 0, 5);
        a.set_value(1, 0, 0, 5);

        // b overlaps a's voxel (1,0,0) only
        let mut b = ExplicitVolume::<u8>::new(3, 1, 1);
        b.set_offset(Point3f::new(1.0, 0.0, 0.0));
        b.set_value(0, 0, 0, 3);
        b.set_value(1, 0, 0, 3);

        let c = intersect(&a, &b).expect("matching resolutions");
        assert_eq!((c.width(), c.height(), c.depth()), (1, 1, 1));
        assert_eq!(c.offset(), Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(c.value(0, 0, 0), 3);
    }

    #[test]
    fn disjoint_volumes_intersect_to_empty() {
        let a = ExplicitVolume::<u8>::new_fill(2, 2, 2, 1);
        let mut b = ExplicitVolume::<u8>::new_fill(2, 2, 2, 1);
        b.set_offset(Point3f::splat(10.0));

        let c = intersect(&a, &b).expect("matching resolutions");
        assert!(c.is_empty());
    }

    #[test]
    fn mismatched_resolutions_are_rejected() {
        let a = ExplicitVolume::<u8>::new(2, 2, 2);
        let mut b = ExplicitVolume::<u8>::new(2, 2, 2);
        b.set_resolution(Point3f::new(2.0, 1.0, 1.0));
        assert!(intersect(&a, &b).is_err());
    }

    #[test]
    fn respects_the_world_offset_in_voxels() {
        let mut a = ExplicitVolume::<u8>::new_fill(4, 1, 1, 2);
        a.set_resolution(Point3f::new(0.5, 0.5, 0.5));

        let mut b = ExplicitVolume::<u8>::new_fill(4, 1, 1, 9);
        b.set_resolution(Point3f::new(0.5, 0.5, 0.5));
        b.set_offset(Point3f::new(1.0, 0.0, 0.0)); // two voxels to the right

        let c = intersect(&a, &b).expect("matching resolutions");
        assert_eq!(c.width(), 2);
        assert_eq!(c.offset(), Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(c.value(0, 0, 0), 2);
    }
}
