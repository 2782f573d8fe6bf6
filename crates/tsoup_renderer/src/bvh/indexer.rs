//! Dense in-order node numbering.

use super::{BuildError, BvhNode, BvhResult, NodeKind, SENTINEL};

/// Renumber `nodes` so every node's id follows all ids of its negative
/// subtree and precedes all ids of its positive subtree, then permute the
/// arena so that position equals id.
///
/// Returns the permuted arena and the root's new id.
pub(super) fn assign_indices(nodes: Vec<BvhNode>, root: u32) -> BvhResult<(Vec<BvhNode>, u32)> {
    if nodes.len() >= SENTINEL as usize {
        return Err(BuildError::NodeIndexOverflow { count: nodes.len() });
    }

    let mut ids = vec![SENTINEL; nodes.len()];
    let mut next = 0;
    number(&nodes, root, &mut ids, &mut next)?;

    if next as usize != nodes.len() {
        return Err(BuildError::IndexMismatch(format!(
            "numbered {} of {} nodes",
            next,
            nodes.len()
        )));
    }

    let mut dense: Vec<Option<BvhNode>> = vec![None; nodes.len()];
    for (old, mut node) in nodes.into_iter().enumerate() {
        if let NodeKind::Internal {
            negative, positive, ..
        } = &mut node.kind
        {
            *negative = ids[*negative as usize];
            *positive = ids[*positive as usize];
        }
        let slot = &mut dense[ids[old] as usize];
        if slot.is_some() {
            return Err(BuildError::IndexMismatch(format!("id {} assigned twice", ids[old])));
        }
        *slot = Some(node);
    }

    let nodes = dense
        .into_iter()
        .enumerate()
        .map(|(id, node)| node.ok_or_else(|| BuildError::IndexMismatch(format!("id {} unused", id))))
        .collect::<BvhResult<Vec<_>>>()?;

    Ok((nodes, ids[root as usize]))
}

fn number(nodes: &[BvhNode], old: u32, ids: &mut [u32], next: &mut u32) -> BvhResult<()> {
    let slot = ids
        .get(old as usize)
        .copied()
        .ok_or_else(|| BuildError::IndexMismatch(format!("child {} outside the arena", old)))?;
    if slot != SENTINEL {
        return Err(BuildError::IndexMismatch(format!("node {} reached twice", old)));
    }

    let children = nodes[old as usize].children();
    if let Some([negative, _]) = children {
        number(nodes, negative, ids, next)?;
    }

    ids[old as usize] = *next;
    *next += 1;

    if let Some([_, positive]) = children {
        number(nodes, positive, ids, next)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsoup_math::{Aabb, Axis};

    fn leaf(start: u32) -> BvhNode {
        BvhNode {
            bounds: Aabb::EMPTY,
            start,
            count: 1,
            kind: NodeKind::Leaf,
        }
    }

    fn internal(negative: u32, positive: u32, start: u32, count: u32) -> BvhNode {
        BvhNode {
            bounds: Aabb::EMPTY,
            start,
            count,
            kind: NodeKind::Internal {
                negative,
                positive,
                axis: Axis::X,
                cost: 0.0,
            },
        }
    }

    #[test]
    fn test_in_order_numbering() {
        // Creation order: a, b, (a b), c, ((a b) c)
        let nodes = vec![
            leaf(0),
            leaf(1),
            internal(0, 1, 0, 2),
            leaf(2),
            internal(2, 3, 0, 3),
        ];

        let (dense, root) = assign_indices(nodes, 4).unwrap();

        // a=0, (a b)=1, b=2, root=3, c=4
        assert_eq!(root, 3);
        assert_eq!(dense[root as usize].children(), Some([1, 4]));
        assert_eq!(dense[1].children(), Some([0, 2]));
        assert_eq!(dense[0].start, 0);
        assert_eq!(dense[2].start, 1);
        assert_eq!(dense[4].start, 2);
    }

    #[test]
    fn test_unreachable_node_is_error() {
        let nodes = vec![leaf(0), leaf(1)];
        assert!(matches!(
            assign_indices(nodes, 0),
            Err(BuildError::IndexMismatch(_))
        ));
    }

    #[test]
    fn test_shared_child_is_error() {
        let nodes = vec![leaf(0), internal(0, 0, 0, 2)];
        assert!(matches!(
            assign_indices(nodes, 1),
            Err(BuildError::IndexMismatch(_))
        ));
    }
}
