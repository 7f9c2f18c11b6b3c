//! Graph algorithms over required-dependency edges.
//!
//! Edges point from a plugin to the plugins it requires. Edges to names that
//! are not in the graph are ignored here; missing dependencies are reported
//! separately.

use std::collections::{HashMap, HashSet, VecDeque};

pub type DependencyGraph = HashMap<String, Vec<String>>;

/// Depth-first search from `start` with a recursion stack.
///
/// Returns the cycle as a path that starts and ends on the same node.
pub fn find_cycle(graph: &DependencyGraph, start: &str) -> Option<Vec<String>> {
    let mut stack = Vec::new();
    let mut done = HashSet::new();
    visit(graph, start, &mut stack, &mut done)
}

fn visit<'g>(
    graph: &'g DependencyGraph,
    node: &'g str,
    stack: &mut Vec<&'g str>,
    done: &mut HashSet<&'g str>,
) -> Option<Vec<String>> {
    if let Some(pos) = stack.iter().position(|n| *n == node) {
        let mut cycle: Vec<String> = stack[pos..].iter().map(|n| n.to_string()).collect();
        cycle.push(node.to_string());
        return Some(cycle);
    }
    if done.contains(node) {
        return None;
    }

    stack.push(node);
    if let Some(deps) = graph.get(node) {
        for dep in deps.iter().filter(|d| graph.contains_key(d.as_str())) {
            if let Some(cycle) = visit(graph, dep, stack, done) {
                return Some(cycle);
            }
        }
    }
    stack.pop();
    done.insert(node);
    None
}

/// Order `roots` and everything they transitively require so that every
/// plugin comes after its dependencies (Kahn's algorithm).
///
/// Ties are broken by discovery order, so the result is deterministic.
/// On a cycle, returns the cycle path instead.
pub fn topological_order(graph: &DependencyGraph, roots: &[String]) -> Result<Vec<String>, Vec<String>> {
    // Discover the closure in a stable order.
    let mut nodes: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut pending: VecDeque<&str> = roots
        .iter()
        .map(String::as_str)
        .filter(|r| graph.contains_key(*r))
        .collect();
    while let Some(node) = pending.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        nodes.push(node);
        if let Some(deps) = graph.get(node) {
            pending.extend(
                deps.iter()
                    .map(String::as_str)
                    .filter(|d| graph.contains_key(*d)),
            );
        }
    }

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for &node in &nodes {
        let deps: HashSet<&str> = graph[node]
            .iter()
            .map(String::as_str)
            .filter(|d| seen.contains(d))
            .collect();
        in_degree.insert(node, deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(node);
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .copied()
        .filter(|n| in_degree[n] == 0)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        for &dependent in dependents.get(node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() == nodes.len() {
        return Ok(order);
    }

    let stuck = nodes
        .iter()
        .find(|n| in_degree[*n] > 0)
        .copied()
        .unwrap_or_default();
    Err(find_cycle(graph, stuck).unwrap_or_else(|| vec![stuck.to_string()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        edges
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"]), ("d", &["a"])]);
        assert_eq!(find_cycle(&g, "d"), Some(names(&["a", "b", "c", "a"])));

        let acyclic = graph(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(find_cycle(&acyclic, "a"), None);
    }

    #[test]
    fn test_missing_nodes_are_ignored() {
        let g = graph(&[("a", &["ghost"])]);
        assert_eq!(find_cycle(&g, "a"), None);
        assert_eq!(topological_order(&g, &names(&["a"])), Ok(names(&["a"])));
    }

    #[test]
    fn test_topological_order_dependencies_first() {
        let g = graph(&[
            ("app", &["db", "cache"]),
            ("cache", &["db"]),
            ("db", &[]),
            ("unrelated", &[]),
        ]);
        let order = topological_order(&g, &names(&["app"])).unwrap();
        assert_eq!(order, names(&["db", "cache", "app"]));
    }

    #[test]
    fn test_topological_order_reports_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        let cycle = topological_order(&g, &names(&["a"])).unwrap_err();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);
    }
}
