pub(crate) fn neighborhood_offsets(
    rank: usize,
    radius: usize,
    include_origin: bool,
) -> Vec<Vec<isize>> {
    fn recurse(
        rank: usize,
        radius: isize,
        axis: usize,
        current: &mut Vec<isize>,
        output: &mut Vec<Vec<isize>>,
        include_origin: bool,
    ) {
        if axis == rank {
            if include_origin || current.iter().any(|value| *value != 0) {
                output.push(current.clone());
            }
            return;
        }

        for offset in -radius..=radius {
            current.push(offset);
            recurse(rank, radius, axis + 1, current, output, include_origin);
            current.pop();
        }
    }

    let mut offsets = Vec::new();
    recurse(
        rank,
        radius as isize,
        0,
        &mut Vec::new(),
        &mut offsets,
        include_origin,
    );
    offsets
}
